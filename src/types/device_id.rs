// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifier type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a paired device.
///
/// Ids are assigned by the external pairing store, so this is a thin
/// wrapper around the store's string key rather than a generated value.
///
/// # Examples
///
/// ```
/// use accessory_watch::types::DeviceId;
///
/// let id = DeviceId::new("AA:BB:CC:DD:EE:FF");
/// assert_eq!(id.child(3), "AA:BB:CC:DD:EE:FF:3");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a device identifier from the store's key.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the effective accessory id of a bridged child.
    #[must_use]
    pub fn child(&self, index: u64) -> String {
        format!("{}:{index}", self.0)
    }

    /// Returns true if `effective_id` is this device or one of its children.
    #[must_use]
    pub fn owns(&self, effective_id: &str) -> bool {
        effective_id == self.0
            || effective_id
                .strip_prefix(self.0.as_str())
                .is_some_and(|rest| rest.starts_with(':'))
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_appends_index() {
        let id = DeviceId::new("bridge-1");
        assert_eq!(id.child(7), "bridge-1:7");
    }

    #[test]
    fn owns_self_and_children_only() {
        let id = DeviceId::new("dev");
        assert!(id.owns("dev"));
        assert!(id.owns("dev:2"));
        assert!(!id.owns("device"));
        assert!(!id.owns("other:2"));
    }

    #[test]
    fn display_and_debug() {
        let id = DeviceId::new("abc");
        assert_eq!(id.to_string(), "abc");
        assert_eq!(format!("{id:?}"), "DeviceId(abc)");
    }

    #[test]
    fn serializes_transparently() {
        let id = DeviceId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }

    #[test]
    fn hashable() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(DeviceId::new("a"));
        assert!(set.contains(&DeviceId::from("a")));
    }
}
