// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Accessory tree snapshot exposed by push-protocol devices.
//!
//! The shape matches the `/accessories` document:
//!
//! ```json
//! {"accessories":[{"aid":1,"services":[{"iid":1,"type":"3E","characteristics":[
//!     {"iid":2,"type":"23","perms":["pr"],"format":"string","value":"Bridge"}
//! ]}]}]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParseError;

/// A full capability tree for one physical device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessoryTree {
    /// Logical accessories; more than one for bridges.
    #[serde(default)]
    pub accessories: Vec<Accessory>,
}

impl AccessoryTree {
    /// Parses a tree from its JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Json`] if the document is not a valid tree.
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Returns the accessory with the given instance id.
    #[must_use]
    pub fn accessory(&self, aid: u64) -> Option<&Accessory> {
        self.accessories.iter().find(|a| a.aid == aid)
    }
}

/// One logical accessory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accessory {
    /// Accessory instance id (1 for the root accessory).
    pub aid: u64,
    /// Services exposed by the accessory.
    #[serde(default)]
    pub services: Vec<Service>,
}

/// A service on an accessory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Instance id, unique within the accessory.
    pub iid: u64,
    /// Service type code (short hex or full UUID).
    #[serde(rename = "type")]
    pub service_type: String,
    /// Characteristics of the service.
    #[serde(default)]
    pub characteristics: Vec<Characteristic>,
}

impl Service {
    /// Returns the first characteristic whose normalized type equals `short_type`.
    #[must_use]
    pub fn characteristic(&self, short_type: &str) -> Option<&Characteristic> {
        self.characteristics
            .iter()
            .find(|c| crate::metadata::short_type(&c.characteristic_type) == short_type)
    }
}

/// A characteristic on a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Characteristic {
    /// Instance id, unique within the accessory.
    pub iid: u64,
    /// Characteristic type code (short hex or full UUID).
    #[serde(rename = "type")]
    pub characteristic_type: String,
    /// Permissions (`pr`, `pw`, `ev`, ...).
    #[serde(default)]
    pub perms: Vec<String>,
    /// Value format (`bool`, `uint8`, `float`, `string`, ...).
    #[serde(default)]
    pub format: Option<String>,
    /// Current value at snapshot time.
    #[serde(default)]
    pub value: Option<Value>,
    /// Manufacturer-supplied description.
    #[serde(default)]
    pub description: Option<String>,
}

impl Characteristic {
    /// Returns true if the characteristic can emit change notifications.
    ///
    /// Characteristics that advertise no permissions at all are assumed to
    /// notify; some firmware omits `perms` entirely.
    #[must_use]
    pub fn supports_events(&self) -> bool {
        self.perms.is_empty() || self.perms.iter().any(|p| p == "ev")
    }

    /// Returns the current value as a string, if it is one.
    #[must_use]
    pub fn string_value(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = r#"{"accessories":[
        {"aid":1,"services":[
            {"iid":1,"type":"3E","characteristics":[
                {"iid":2,"type":"23","perms":["pr"],"format":"string","value":"Bridge"}
            ]},
            {"iid":8,"type":"00000049-0000-1000-8000-0026BB765291","characteristics":[
                {"iid":9,"type":"25","perms":["pr","pw","ev"],"format":"bool","value":false}
            ]}
        ]}
    ]}"#;

    #[test]
    fn parses_tree_document() {
        let tree = AccessoryTree::from_json(TREE).unwrap();
        assert_eq!(tree.accessories.len(), 1);

        let root = tree.accessory(1).unwrap();
        assert_eq!(root.services.len(), 2);

        let info = &root.services[0];
        let name = info.characteristic("23").unwrap();
        assert_eq!(name.string_value(), Some("Bridge"));
    }

    #[test]
    fn supports_events_reads_perms() {
        let tree = AccessoryTree::from_json(TREE).unwrap();
        let root = tree.accessory(1).unwrap();

        assert!(!root.services[0].characteristics[0].supports_events());
        assert!(root.services[1].characteristics[0].supports_events());
    }

    #[test]
    fn missing_perms_defaults_to_notifying() {
        let json = r#"{"iid":3,"type":"25"}"#;
        let c: Characteristic = serde_json::from_str(json).unwrap();
        assert!(c.supports_events());
        assert!(c.value.is_none());
    }

    #[test]
    fn invalid_document_is_parse_error() {
        assert!(matches!(
            AccessoryTree::from_json("not json"),
            Err(ParseError::Json(_))
        ));
    }
}
