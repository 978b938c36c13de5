// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Last-observed value per watched characteristic.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::types::{CacheKey, DeviceId};

/// Outcome of [`ValueCache::record_and_check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheCheck {
    /// True if the new value equals the previously recorded one.
    pub is_duplicate: bool,
    /// The previously recorded value, if any.
    pub old_value: Option<String>,
}

/// Deduplication cache keyed by [`CacheKey`].
///
/// Protocols re-broadcast unchanged values on reconnect, so every value is
/// checked here before it reaches the debounce scheduler or the sink.
/// Entries live until the owning session is torn down and are never
/// persisted.
///
/// # Examples
///
/// ```
/// use accessory_watch::cache::ValueCache;
/// use accessory_watch::types::{CacheKey, CompositeKey, DeviceId};
///
/// let cache = ValueCache::new();
/// let key = CacheKey::new(DeviceId::new("dev"), "dev", CompositeKey::new(1, 10));
///
/// assert!(!cache.record_and_check(&key, "true").is_duplicate);
/// assert!(cache.record_and_check(&key, "true").is_duplicate);
/// ```
#[derive(Debug, Default)]
pub struct ValueCache {
    entries: Mutex<HashMap<CacheKey, String>>,
}

impl ValueCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `new_value` unconditionally and reports whether it repeats the
    /// previous value.
    pub fn record_and_check(&self, key: &CacheKey, new_value: &str) -> CacheCheck {
        let old_value = self
            .entries
            .lock()
            .insert(key.clone(), new_value.to_string());
        CacheCheck {
            is_duplicate: old_value.as_deref() == Some(new_value),
            old_value,
        }
    }

    /// Returns the last recorded value for a key.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Drops every entry owned by a device. Returns the number removed.
    pub fn evict_device(&self, device_id: &DeviceId) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| &key.device_id != device_id);
        before - entries.len()
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
