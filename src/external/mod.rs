// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Contracts for collaborators outside the engine.
//!
//! Persistence, room assignment, and the pairing store live outside this
//! crate. Sessions reach them only through these traits:
//!
//! - [`EventSink`] - receives every emitted [`AccessoryEvent`]
//! - [`RoomDirectory`] - maps accessory/device ids to room names
//! - [`PairingDirectory`] - returns the current pairing record for a device

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::SinkError;
use crate::event::AccessoryEvent;
use crate::types::{DeviceId, Pairing};

/// Room names keyed by effective accessory id or device id.
pub type RoomMap = HashMap<String, String>;

/// Destination for normalized events.
///
/// Calls are fire-and-forget from the session's point of view: a failure is
/// logged and the event is lost, with no retry.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persists an event and returns its assigned id.
    async fn insert_event(&self, event: &AccessoryEvent) -> Result<i64, SinkError>;
}

/// Source of room assignments, read fresh before each normalization batch.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Loads the current room map.
    async fn load_rooms(&self) -> Result<RoomMap, SinkError>;
}

/// Source of the current pairing record for a device.
#[async_trait]
pub trait PairingDirectory: Send + Sync {
    /// Returns the current pairing, or `None` if the device is no longer paired.
    async fn current_pairing(&self, device_id: &DeviceId) -> Result<Option<Pairing>, SinkError>;
}

/// Resolves the room of an accessory.
///
/// A child-specific entry overrides the device-level entry.
///
/// # Examples
///
/// ```
/// use accessory_watch::external::{RoomMap, resolve_room};
/// use accessory_watch::types::DeviceId;
///
/// let mut rooms = RoomMap::new();
/// rooms.insert("hub".to_string(), "Hallway".to_string());
/// rooms.insert("hub:3".to_string(), "Kitchen".to_string());
///
/// let hub = DeviceId::new("hub");
/// assert_eq!(resolve_room(&rooms, "hub:3", &hub).as_deref(), Some("Kitchen"));
/// assert_eq!(resolve_room(&rooms, "hub:2", &hub).as_deref(), Some("Hallway"));
/// ```
#[must_use]
pub fn resolve_room(rooms: &RoomMap, effective_accessory_id: &str, device_id: &DeviceId) -> Option<String> {
    rooms
        .get(effective_accessory_id)
        .or_else(|| rooms.get(device_id.as_str()))
        .cloned()
}

/// Room directory with no assignments.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRooms;

#[async_trait]
impl RoomDirectory for NoRooms {
    async fn load_rooms(&self) -> Result<RoomMap, SinkError> {
        Ok(RoomMap::new())
    }
}

/// Room directory backed by a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticRooms(pub RoomMap);

#[async_trait]
impl RoomDirectory for StaticRooms {
    async fn load_rooms(&self) -> Result<RoomMap, SinkError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_level_room_applies_to_children() {
        let mut rooms = RoomMap::new();
        rooms.insert("dev".to_string(), "Office".to_string());

        let id = DeviceId::new("dev");
        assert_eq!(resolve_room(&rooms, "dev:4", &id).as_deref(), Some("Office"));
        assert_eq!(resolve_room(&rooms, "dev", &id).as_deref(), Some("Office"));
    }

    #[test]
    fn unknown_device_has_no_room() {
        let rooms = RoomMap::new();
        assert_eq!(resolve_room(&rooms, "x", &DeviceId::new("x")), None);
    }

    #[tokio::test]
    async fn static_rooms_returns_copy() {
        let mut map = RoomMap::new();
        map.insert("a".to_string(), "Garage".to_string());
        let rooms = StaticRooms(map);

        assert_eq!(rooms.load_rooms().await.unwrap().len(), 1);
        assert!(NoRooms.load_rooms().await.unwrap().is_empty());
    }
}
