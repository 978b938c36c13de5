// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device pairing records.
//!
//! A [`Pairing`] is owned by the external pairing store. Sessions only read
//! it, and re-read it through the
//! [`PairingDirectory`](crate::external::PairingDirectory) before every
//! reconnect attempt so that address changes are picked up.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DeviceId;

/// Accessory category code advertised by bridges.
pub const BRIDGE_CATEGORY: u16 = 2;

/// How state changes are obtained from a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    /// Subscription-style connection streaming change notifications.
    Push,
    /// State retrieved by periodically invoking an external query.
    Poll,
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => f.write_str("push"),
            Self::Poll => f.write_str("poll"),
        }
    }
}

/// How a device is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Transport {
    /// Network address and port.
    Ip {
        /// Host name or IP address.
        address: String,
        /// TCP port.
        port: u16,
    },
    /// A named transport (e.g. `ble`, `thread`) resolved by the external tool.
    Named {
        /// Transport name.
        name: String,
    },
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip { address, port } => write!(f, "{address}:{port}"),
            Self::Named { name } => f.write_str(name),
        }
    }
}

/// Long-lived credential blob. Opaque to this crate and never logged.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(String);

impl Credentials {
    /// Wraps a credential blob.
    #[must_use]
    pub fn new(blob: impl Into<String>) -> Self {
        Self(blob.into())
    }

    /// Returns the raw blob for handing to a protocol client.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

/// A paired device as recorded by the pairing store.
///
/// # Examples
///
/// ```
/// use accessory_watch::types::{Pairing, ProtocolKind};
///
/// let pairing = Pairing::push("hub-1", "Hallway Bridge", "192.168.1.40", 51826)
///     .with_category(2);
/// assert_eq!(pairing.protocol, ProtocolKind::Push);
/// assert!(pairing.is_bridge_category());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pairing {
    /// Device identifier.
    pub id: DeviceId,
    /// Protocol family.
    pub protocol: ProtocolKind,
    /// How the device is reached.
    pub transport: Transport,
    /// Credential blob.
    #[serde(default)]
    pub credentials: Credentials,
    /// Human name given at pairing time.
    pub name: String,
    /// When the device was paired.
    pub paired_at: DateTime<Utc>,
    /// Advertised accessory category, if known.
    #[serde(default)]
    pub category: Option<u16>,
    /// Node id for poll-protocol devices.
    #[serde(default)]
    pub node_id: Option<u64>,
}

impl Pairing {
    /// Creates a push-protocol pairing reached over IP.
    #[must_use]
    pub fn push(
        id: impl Into<DeviceId>,
        name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            id: id.into(),
            protocol: ProtocolKind::Push,
            transport: Transport::Ip {
                address: address.into(),
                port,
            },
            credentials: Credentials::default(),
            name: name.into(),
            paired_at: Utc::now(),
            category: None,
            node_id: None,
        }
    }

    /// Creates a poll-protocol pairing for the given node.
    #[must_use]
    pub fn poll(id: impl Into<DeviceId>, name: impl Into<String>, node_id: u64) -> Self {
        Self {
            id: id.into(),
            protocol: ProtocolKind::Poll,
            transport: Transport::Named {
                name: "ip".to_string(),
            },
            credentials: Credentials::default(),
            name: name.into(),
            paired_at: Utc::now(),
            category: None,
            node_id: Some(node_id),
        }
    }

    /// Sets the transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the credential blob.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the pairing timestamp.
    #[must_use]
    pub fn with_paired_at(mut self, paired_at: DateTime<Utc>) -> Self {
        self.paired_at = paired_at;
        self
    }

    /// Sets the advertised category.
    #[must_use]
    pub fn with_category(mut self, category: u16) -> Self {
        self.category = Some(category);
        self
    }

    /// Returns the IP address if the transport is IP-based.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        match &self.transport {
            Transport::Ip { address, .. } => Some(address),
            Transport::Named { .. } => None,
        }
    }

    /// Returns the port if the transport is IP-based.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        match &self.transport {
            Transport::Ip { port, .. } => Some(*port),
            Transport::Named { .. } => None,
        }
    }

    /// Returns the transport name (`ip` for IP transports).
    #[must_use]
    pub fn transport_name(&self) -> &str {
        match &self.transport {
            Transport::Ip { .. } => "ip",
            Transport::Named { name } => name,
        }
    }

    /// Returns true if the pairing advertises the bridge category.
    #[must_use]
    pub fn is_bridge_category(&self) -> bool {
        self.category == Some(BRIDGE_CATEGORY)
    }

    /// Returns true if `other` reaches the device through a different transport.
    #[must_use]
    pub fn transport_differs(&self, other: &Pairing) -> bool {
        self.transport != other.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pairing_has_ip_transport() {
        let pairing = Pairing::push("a", "Lamp", "10.0.0.2", 8080);
        assert_eq!(pairing.address(), Some("10.0.0.2"));
        assert_eq!(pairing.port(), Some(8080));
        assert_eq!(pairing.transport_name(), "ip");
        assert_eq!(pairing.transport.to_string(), "10.0.0.2:8080");
    }

    #[test]
    fn poll_pairing_carries_node_id() {
        let pairing = Pairing::poll("m", "Plug", 42).with_transport(Transport::Named {
            name: "thread".to_string(),
        });
        assert_eq!(pairing.node_id, Some(42));
        assert_eq!(pairing.address(), None);
        assert_eq!(pairing.transport_name(), "thread");
    }

    #[test]
    fn transport_differs_detects_address_change() {
        let old = Pairing::push("a", "Lamp", "10.0.0.2", 8080);
        let mut new = old.clone();
        assert!(!old.transport_differs(&new));

        new.transport = Transport::Ip {
            address: "10.0.0.9".to_string(),
            port: 8080,
        };
        assert!(old.transport_differs(&new));
    }

    #[test]
    fn credentials_are_redacted_in_debug() {
        let creds = Credentials::new("secret-ltpk");
        assert_eq!(format!("{creds:?}"), "Credentials(<redacted>)");
        assert_eq!(creds.expose(), "secret-ltpk");
    }

    #[test]
    fn deserializes_from_store_json() {
        let json = r#"{
            "id": "dev-1",
            "protocol": "push",
            "transport": {"kind": "ip", "address": "10.0.0.5", "port": 51826},
            "name": "Bridge",
            "pairedAt": "2024-05-01T10:00:00Z",
            "category": 2
        }"#;
        let pairing: Pairing = serde_json::from_str(json).unwrap();
        assert_eq!(pairing.id, DeviceId::new("dev-1"));
        assert!(pairing.is_bridge_category());
        assert_eq!(pairing.node_id, None);
    }
}
