// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical accessory event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CompositeKey, DeviceId, ProtocolKind};

/// Protocol-specific addressing retained for traceability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EventAddress {
    /// Push-protocol accessory/characteristic instance ids.
    Characteristic {
        /// Accessory instance id.
        aid: u64,
        /// Characteristic instance id.
        iid: u64,
    },
    /// Poll-protocol endpoint/cluster/attribute triple.
    Attribute {
        /// Endpoint id.
        endpoint: u64,
        /// Cluster id.
        cluster: u32,
        /// Attribute id.
        attribute: u32,
    },
}

impl EventAddress {
    /// Returns the composite key this address maps to.
    #[must_use]
    pub fn composite_key(&self) -> CompositeKey {
        match *self {
            Self::Characteristic { aid, iid } => CompositeKey::new(aid, iid),
            Self::Attribute {
                endpoint,
                cluster,
                attribute,
            } => CompositeKey::attribute(endpoint, cluster, attribute),
        }
    }
}

/// A normalized state change, handed to the [`EventSink`](crate::external::EventSink).
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryEvent {
    /// Owning device.
    pub device_id: DeviceId,
    /// Device id, suffixed with the child index for bridged accessories.
    pub accessory_id: String,
    /// Display name of the component that changed.
    pub accessory_name: String,
    /// Resolved room, if any.
    pub room: Option<String>,
    /// Human label of the service type.
    pub service_type: String,
    /// Human label of the characteristic.
    pub characteristic: String,
    /// Previously observed value, if any.
    pub old_value: Option<String>,
    /// Newly observed value.
    pub new_value: String,
    /// Protocol family the event arrived through.
    pub protocol: ProtocolKind,
    /// Protocol-specific address.
    pub address: EventAddress,
    /// When the underlying notification was observed.
    pub observed_at: DateTime<Utc>,
}

impl AccessoryEvent {
    /// Returns true if the event reports a value transition rather than a first sighting.
    #[must_use]
    pub fn is_transition(&self) -> bool {
        self.old_value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> AccessoryEvent {
        AccessoryEvent {
            device_id: DeviceId::new("hub"),
            accessory_id: "hub:2".to_string(),
            accessory_name: "Washer · Switch".to_string(),
            room: Some("Laundry".to_string()),
            service_type: "Switch".to_string(),
            characteristic: "On".to_string(),
            old_value: Some("false".to_string()),
            new_value: "true".to_string(),
            protocol: ProtocolKind::Push,
            address: EventAddress::Characteristic { aid: 2, iid: 11 },
            observed_at: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(event()).unwrap();

        assert_eq!(json["accessoryId"], "hub:2");
        assert_eq!(json["oldValue"], "false");
        assert_eq!(json["protocol"], "push");
        assert_eq!(json["address"]["kind"], "characteristic");
        assert_eq!(json["address"]["aid"], 2);
    }

    #[test]
    fn address_maps_to_composite_key() {
        let address = EventAddress::Attribute {
            endpoint: 1,
            cluster: 6,
            attribute: 0,
        };
        assert_eq!(address.composite_key(), CompositeKey::attribute(1, 6, 0));
    }

    #[test]
    fn first_sighting_is_not_transition() {
        let mut e = event();
        assert!(e.is_transition());
        e.old_value = None;
        assert!(!e.is_transition());
    }
}
