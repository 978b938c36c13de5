// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Metadata resolution for accessory capability trees.
//!
//! On every (re)connect a push session fetches the device's accessory tree
//! and hands it to the [`MetadataResolver`], which produces a
//! [`MetadataMap`]: a composite-key map from `(aid, iid)` to the service,
//! characteristic, and display names of each characteristic, plus the set
//! of keys that must be subscribed.
//!
//! # Name disambiguation
//!
//! A physical child that exposes more than one *watched* service type (a
//! combined switch and contact sensor, for instance) gets the service label
//! appended to the display name of its watched characteristics:
//! `"Washer · Switch"` and `"Washer · Contact Sensor"`. Children with a
//! single watched service type keep their plain name.

mod labels;
mod resolver;

pub use labels::{
    ACCESSORY_INFORMATION, DEFAULT_WATCHED_SERVICES, NAME, ON, PROTOCOL_INFORMATION,
    attribute_label, characteristic_label, cluster_label, is_on_characteristic, service_label,
    short_type,
};
pub use resolver::{
    COMPONENT_SEPARATOR, CharacteristicMeta, MetadataMap, MetadataResolver,
    effective_accessory_id,
};
