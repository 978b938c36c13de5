// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capability tree walking and name disambiguation.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::types::{Accessory, AccessoryTree, CompositeKey, DeviceId, Pairing};

use super::labels::{
    ACCESSORY_INFORMATION, DEFAULT_WATCHED_SERVICES, NAME, ON, characteristic_label,
    service_label, short_type,
};

/// Separator between a child name and its service label.
pub const COMPONENT_SEPARATOR: &str = " · ";

/// Resolved metadata for one characteristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicMeta {
    /// Human label of the owning service type.
    pub service_type: String,
    /// Human label of the characteristic.
    pub characteristic_name: String,
    /// Name of the physical child (accessory) exposing the characteristic.
    pub child_name: String,
    /// Display name, suffixed with the service label when the child exposes
    /// more than one watched service type.
    pub component_name: String,
    /// Device id, or `<deviceId>:<aid>` for bridged children.
    pub effective_accessory_id: String,
    /// Value format, used for value normalization.
    pub format: Option<String>,
    /// Whether the characteristic is subscribed/polled.
    pub watched: bool,
}

/// Composite-key map for one snapshot of a device's tree.
///
/// Rebuilt wholesale on every (re)connect and never mutated field by field.
#[derive(Debug, Clone, Default)]
pub struct MetadataMap {
    entries: HashMap<CompositeKey, CharacteristicMeta>,
    watch_set: Vec<CompositeKey>,
    bridge: bool,
}

impl MetadataMap {
    /// Returns the metadata for a key.
    #[must_use]
    pub fn get(&self, key: &CompositeKey) -> Option<&CharacteristicMeta> {
        self.entries.get(key)
    }

    /// Returns the keys that must be subscribed, in tree order.
    #[must_use]
    pub fn watch_set(&self) -> &[CompositeKey] {
        &self.watch_set
    }

    /// Returns true if the device was classified as a bridge.
    #[must_use]
    pub fn is_bridge(&self) -> bool {
        self.bridge
    }

    /// Returns the number of recorded characteristics, watched or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the snapshot recorded no characteristics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds a [`MetadataMap`] from an accessory tree.
///
/// # Examples
///
/// ```
/// use accessory_watch::metadata::MetadataResolver;
/// use accessory_watch::types::{AccessoryTree, CompositeKey, Pairing};
///
/// let tree = AccessoryTree::from_json(r#"{"accessories":[{"aid":1,"services":[
///     {"iid":10,"type":"49","characteristics":[{"iid":11,"type":"25","perms":["ev"],"format":"bool"}]}
/// ]}]}"#).unwrap();
/// let pairing = Pairing::push("plug-1", "Desk Plug", "10.0.0.3", 51826);
///
/// let map = MetadataResolver::new().resolve(&pairing, &tree);
/// let meta = map.get(&CompositeKey::new(1, 11)).unwrap();
/// assert_eq!(meta.component_name, "Desk Plug");
/// assert_eq!(map.watch_set(), &[CompositeKey::new(1, 11)]);
/// ```
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    watched_services: HashSet<String>,
}

impl MetadataResolver {
    /// Creates a resolver watching the default service types.
    #[must_use]
    pub fn new() -> Self {
        Self::with_watched_services(DEFAULT_WATCHED_SERVICES.iter().copied())
    }

    /// Creates a resolver watching the given service type codes.
    #[must_use]
    pub fn with_watched_services<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            watched_services: services
                .into_iter()
                .map(|s| short_type(s.as_ref()))
                .collect(),
        }
    }

    /// Returns true if the service type code is watched.
    #[must_use]
    pub fn is_watched_service(&self, code: &str) -> bool {
        self.watched_services.contains(&short_type(code))
    }

    /// Walks the tree and builds the composite-key map and watch set.
    #[must_use]
    pub fn resolve(&self, pairing: &Pairing, tree: &AccessoryTree) -> MetadataMap {
        let bridge = pairing.is_bridge_category() || tree.accessories.len() > 1;
        let mut map = MetadataMap {
            bridge,
            ..MetadataMap::default()
        };

        for accessory in &tree.accessories {
            self.resolve_accessory(pairing, accessory, bridge, &mut map);
        }

        tracing::debug!(
            device_id = %pairing.id,
            bridge,
            characteristics = map.len(),
            watched = map.watch_set.len(),
            "Resolved accessory metadata"
        );

        map
    }

    fn resolve_accessory(
        &self,
        pairing: &Pairing,
        accessory: &Accessory,
        bridge: bool,
        map: &mut MetadataMap,
    ) {
        let effective_id = effective_accessory_id(&pairing.id, accessory.aid, bridge);
        let child_name = accessory_name(accessory)
            .or_else(|| (accessory.aid == 1).then(|| pairing.name.clone()))
            .unwrap_or_else(|| format!("Accessory {}", accessory.aid));

        let watched_types = self.watched_service_types(accessory);
        let disambiguate = watched_types.len() > 1;

        for service in &accessory.services {
            let service_code = short_type(&service.service_type);
            let service_type = service_label(&service_code)
                .map_or_else(|| format!("Unknown ({service_code})"), str::to_string);
            let service_watched = self.watched_services.contains(&service_code);

            for characteristic in &service.characteristics {
                let code = short_type(&characteristic.characteristic_type);
                let characteristic_name = characteristic_label(&code)
                    .map(str::to_string)
                    .or_else(|| characteristic.description.clone())
                    .unwrap_or_else(|| format!("Unknown ({code})"));
                let watched = service_watched && code != NAME && characteristic.supports_events();

                let component_name = if watched && disambiguate {
                    format!("{child_name}{COMPONENT_SEPARATOR}{service_type}")
                } else {
                    child_name.clone()
                };

                let key = CompositeKey::new(accessory.aid, characteristic.iid);
                if map.entries.contains_key(&key) {
                    tracing::warn!(
                        device_id = %pairing.id,
                        %key,
                        "Duplicate characteristic instance in accessory tree"
                    );
                    continue;
                }

                map.entries.insert(
                    key,
                    CharacteristicMeta {
                        service_type: service_type.clone(),
                        characteristic_name,
                        child_name: child_name.clone(),
                        component_name,
                        effective_accessory_id: effective_id.clone(),
                        format: if code == ON {
                            // Some firmware omits the format and reports 0/1.
                            Some("bool".to_string())
                        } else {
                            characteristic.format.clone()
                        },
                        watched,
                    },
                );
                if watched {
                    map.watch_set.push(key);
                }
            }
        }
    }

    /// Distinct watched service types that have at least one watched characteristic.
    fn watched_service_types(&self, accessory: &Accessory) -> BTreeSet<String> {
        accessory
            .services
            .iter()
            .filter_map(|service| {
                let code = short_type(&service.service_type);
                let has_watched = self.watched_services.contains(&code)
                    && service.characteristics.iter().any(|c| {
                        short_type(&c.characteristic_type) != NAME && c.supports_events()
                    });
                has_watched.then_some(code)
            })
            .collect()
    }
}

impl Default for MetadataResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the effective accessory id for an accessory instance.
#[must_use]
pub fn effective_accessory_id(device_id: &DeviceId, index: u64, bridge: bool) -> String {
    if bridge && index > 1 {
        device_id.child(index)
    } else {
        device_id.to_string()
    }
}

/// Extracts the name from the accessory information service.
fn accessory_name(accessory: &Accessory) -> Option<String> {
    accessory
        .services
        .iter()
        .find(|s| short_type(&s.service_type) == ACCESSORY_INFORMATION)
        .and_then(|s| s.characteristic(NAME))
        .and_then(|c| c.string_value())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge_tree() -> AccessoryTree {
        AccessoryTree::from_json(
            r#"{"accessories":[
            {"aid":1,"services":[
                {"iid":1,"type":"3E","characteristics":[
                    {"iid":2,"type":"23","perms":["pr"],"value":"Hub"}]},
                {"iid":3,"type":"A2","characteristics":[
                    {"iid":4,"type":"37","perms":["pr"],"value":"1.1.0"}]}
            ]},
            {"aid":2,"services":[
                {"iid":1,"type":"3E","characteristics":[
                    {"iid":2,"type":"23","perms":["pr"],"value":"Washer"}]},
                {"iid":10,"type":"49","characteristics":[
                    {"iid":11,"type":"25","perms":["pr","pw","ev"],"format":"bool"},
                    {"iid":12,"type":"23","perms":["pr"],"value":"Power"}]},
                {"iid":20,"type":"80","characteristics":[
                    {"iid":21,"type":"6A","perms":["pr","ev"],"format":"uint8"}]}
            ]},
            {"aid":3,"services":[
                {"iid":1,"type":"3E","characteristics":[
                    {"iid":2,"type":"23","perms":["pr"],"value":"Lamp"}]},
                {"iid":10,"type":"49","characteristics":[
                    {"iid":11,"type":"25","perms":["pr","pw","ev"],"format":"bool"}]}
            ]}
        ]}"#,
        )
        .unwrap()
    }

    fn pairing() -> Pairing {
        Pairing::push("hub", "Configured Hub", "10.0.0.1", 51826).with_category(2)
    }

    #[test]
    fn multi_service_child_is_disambiguated() {
        let map = MetadataResolver::new().resolve(&pairing(), &bridge_tree());

        let switch = map.get(&CompositeKey::new(2, 11)).unwrap();
        assert_eq!(switch.component_name, "Washer · Switch");
        assert_eq!(switch.child_name, "Washer");
        assert_eq!(switch.characteristic_name, "On");

        let contact = map.get(&CompositeKey::new(2, 21)).unwrap();
        assert_eq!(contact.component_name, "Washer · Contact Sensor");
        assert_eq!(contact.service_type, "Contact Sensor");
    }

    #[test]
    fn single_service_child_keeps_plain_name() {
        let map = MetadataResolver::new().resolve(&pairing(), &bridge_tree());

        let lamp = map.get(&CompositeKey::new(3, 11)).unwrap();
        assert_eq!(lamp.component_name, "Lamp");
    }

    #[test]
    fn identical_iids_on_children_do_not_collide() {
        let map = MetadataResolver::new().resolve(&pairing(), &bridge_tree());

        assert_eq!(
            map.get(&CompositeKey::new(2, 11)).unwrap().effective_accessory_id,
            "hub:2"
        );
        assert_eq!(
            map.get(&CompositeKey::new(3, 11)).unwrap().effective_accessory_id,
            "hub:3"
        );
    }

    #[test]
    fn watch_set_excludes_unwatched_and_name_characteristics() {
        let map = MetadataResolver::new().resolve(&pairing(), &bridge_tree());

        assert_eq!(
            map.watch_set(),
            &[
                CompositeKey::new(2, 11),
                CompositeKey::new(2, 21),
                CompositeKey::new(3, 11)
            ]
        );

        // Unwatched characteristics are still recorded
        let name = map.get(&CompositeKey::new(2, 12)).unwrap();
        assert!(!name.watched);
        assert_eq!(name.component_name, "Washer");
        assert!(map.get(&CompositeKey::new(1, 4)).is_some());
    }

    #[test]
    fn root_falls_back_to_pairing_name() {
        let tree = AccessoryTree::from_json(
            r#"{"accessories":[
                {"aid":1,"services":[{"iid":10,"type":"47","characteristics":[
                    {"iid":11,"type":"25","perms":["ev"],"format":"bool"}]}]},
                {"aid":5,"services":[{"iid":10,"type":"47","characteristics":[
                    {"iid":11,"type":"25","perms":["ev"],"format":"bool"}]}]}
            ]}"#,
        )
        .unwrap();
        let map = MetadataResolver::new().resolve(&pairing(), &tree);

        assert_eq!(
            map.get(&CompositeKey::new(1, 11)).unwrap().child_name,
            "Configured Hub"
        );
        assert_eq!(
            map.get(&CompositeKey::new(5, 11)).unwrap().child_name,
            "Accessory 5"
        );
    }

    #[test]
    fn standalone_device_uses_device_id() {
        let tree = AccessoryTree::from_json(
            r#"{"accessories":[{"aid":1,"services":[{"iid":10,"type":"85","characteristics":[
                {"iid":11,"type":"22","perms":["ev"],"format":"bool"}]}]}]}"#,
        )
        .unwrap();
        let pairing = Pairing::push("sensor", "Hall Motion", "10.0.0.7", 80);
        let map = MetadataResolver::new().resolve(&pairing, &tree);

        assert!(!map.is_bridge());
        let meta = map.get(&CompositeKey::new(1, 11)).unwrap();
        assert_eq!(meta.effective_accessory_id, "sensor");
        assert_eq!(meta.component_name, "Hall Motion");
    }

    #[test]
    fn custom_watch_set_changes_disambiguation() {
        let resolver = MetadataResolver::with_watched_services(["49"]);
        let map = resolver.resolve(&pairing(), &bridge_tree());

        // Contact sensor no longer watched, so the washer has one watched type
        assert_eq!(
            map.get(&CompositeKey::new(2, 11)).unwrap().component_name,
            "Washer"
        );
        assert!(!map.get(&CompositeKey::new(2, 21)).unwrap().watched);
    }

    #[test]
    fn unknown_types_use_description() {
        let tree = AccessoryTree::from_json(
            r#"{"accessories":[{"aid":1,"services":[{"iid":10,"type":"49","characteristics":[
                {"iid":11,"type":"E863F10D-079E-48FF-8F27-9C2605A29F52","perms":["ev"],"description":"Consumption"}]}]}]}"#,
        )
        .unwrap();
        let pairing = Pairing::push("p", "Plug", "10.0.0.8", 80);
        let map = MetadataResolver::new().resolve(&pairing, &tree);

        assert_eq!(
            map.get(&CompositeKey::new(1, 11)).unwrap().characteristic_name,
            "Consumption"
        );
    }

    #[test]
    fn on_characteristic_without_format_is_boolean() {
        let tree = AccessoryTree::from_json(
            r#"{"accessories":[{"aid":1,"services":[{"iid":8,"type":"49","characteristics":[
                {"iid":10,"type":"25","perms":["ev"]},
                {"iid":11,"type":"E863F10D-079E-48FF-8F27-9C2605A29F52","perms":["ev"]}]}]}]}"#,
        )
        .unwrap();
        let pairing = Pairing::push("lr", "Run Leveling", "10.0.0.9", 80);
        let map = MetadataResolver::new().resolve(&pairing, &tree);

        assert_eq!(map.get(&CompositeKey::new(1, 10)).unwrap().format.as_deref(), Some("bool"));
        assert_eq!(map.get(&CompositeKey::new(1, 11)).unwrap().format, None);
    }
}
