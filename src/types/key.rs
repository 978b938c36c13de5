// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Composite addressing for characteristics.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::DeviceId;

/// Accessory-instance + characteristic-instance pair.
///
/// Characteristic ids are only unique within one accessory, and a bridge
/// exposes many accessories, so a characteristic is never addressed by its
/// id alone. Poll-protocol attributes are folded into the same shape with
/// [`CompositeKey::attribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeKey {
    /// Accessory instance id (or endpoint id).
    pub accessory: u64,
    /// Characteristic instance id (or packed cluster/attribute).
    pub characteristic: u64,
}

impl CompositeKey {
    /// Creates a key from accessory and characteristic instance ids.
    #[must_use]
    pub const fn new(accessory: u64, characteristic: u64) -> Self {
        Self {
            accessory,
            characteristic,
        }
    }

    /// Creates a key for a poll-protocol endpoint/cluster/attribute triple.
    #[must_use]
    pub const fn attribute(endpoint: u64, cluster: u32, attribute: u32) -> Self {
        Self {
            accessory: endpoint,
            characteristic: ((cluster as u64) << 32) | attribute as u64,
        }
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.accessory, self.characteristic)
    }
}

/// Key for the value cache and the debounce scheduler.
///
/// The effective accessory id embeds the device id, so entries of two
/// different devices can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Owning device.
    pub device_id: DeviceId,
    /// Device id, suffixed with the child index for bridged accessories.
    pub effective_accessory_id: String,
    /// Characteristic address within the device.
    pub key: CompositeKey,
}

impl CacheKey {
    /// Creates a cache key.
    #[must_use]
    pub fn new(
        device_id: DeviceId,
        effective_accessory_id: impl Into<String>,
        key: CompositeKey,
    ) -> Self {
        Self {
            device_id,
            effective_accessory_id: effective_accessory_id.into(),
            key,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.effective_accessory_id, self.key)
    }
}
