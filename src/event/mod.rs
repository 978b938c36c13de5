// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical events and manager notifications.
//!
//! - [`AccessoryEvent`] is the normalized output of a session: what changed,
//!   on which component, in which room, from which value to which value.
//! - [`ManagerEvent`] notifications describe session lifecycle and are
//!   broadcast over the [`EventBus`] to any number of observers.
//!
//! # Examples
//!
//! ```
//! use accessory_watch::event::{EventBus, ManagerEvent};
//! use accessory_watch::session::SessionId;
//! use accessory_watch::types::DeviceId;
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(ManagerEvent::SessionStopped {
//!     device_id: DeviceId::new("dev"),
//!     session_id: SessionId::new(),
//! });
//! ```

mod accessory_event;
mod event_bus;
mod manager_event;

pub use accessory_event::{AccessoryEvent, EventAddress};
pub use event_bus::{DEFAULT_CHANNEL_CAPACITY, EventBus};
pub use manager_event::ManagerEvent;
