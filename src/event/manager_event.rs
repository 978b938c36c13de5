// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session manager notifications.

use crate::session::{SessionId, SessionState};
use crate::types::{DeviceId, ProtocolKind};

use super::AccessoryEvent;

/// Notifications published by the session manager.
///
/// These are for observers (dashboards, logs); the authoritative output of a
/// session is what it hands to the event sink.
///
/// # Examples
///
/// ```
/// use accessory_watch::event::ManagerEvent;
/// use accessory_watch::session::SessionId;
/// use accessory_watch::types::DeviceId;
///
/// let stopped = ManagerEvent::SessionStopped {
///     device_id: DeviceId::new("dev"),
///     session_id: SessionId::new(),
/// };
/// assert!(stopped.is_lifecycle());
/// ```
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    /// A session was started for a device.
    SessionStarted {
        /// The device.
        device_id: DeviceId,
        /// Identifier of this session run.
        session_id: SessionId,
        /// Protocol family of the session.
        protocol: ProtocolKind,
    },

    /// A session was torn down.
    SessionStopped {
        /// The device.
        device_id: DeviceId,
        /// Identifier of the session run that stopped.
        session_id: SessionId,
    },

    /// A session changed state.
    StateChanged {
        /// The device.
        device_id: DeviceId,
        /// The new state.
        state: SessionState,
        /// Last error, if the transition was caused by a failure.
        error: Option<String>,
    },

    /// An event was handed to the sink.
    EventRecorded {
        /// The event.
        event: Box<AccessoryEvent>,
        /// Id assigned by the sink, `None` if the sink rejected it.
        persisted_id: Option<i64>,
    },
}

impl ManagerEvent {
    /// Returns the device ID associated with this notification.
    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::SessionStarted { device_id, .. }
            | Self::SessionStopped { device_id, .. }
            | Self::StateChanged { device_id, .. } => device_id,
            Self::EventRecorded { event, .. } => &event.device_id,
        }
    }

    /// Returns `true` for session start/stop notifications.
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::SessionStarted { .. } | Self::SessionStopped { .. }
        )
    }

    /// Returns `true` for recorded accessory events.
    #[must_use]
    pub fn is_event(&self) -> bool {
        matches!(self, Self::EventRecorded { .. })
    }

    /// Creates a state change notification.
    #[must_use]
    pub fn state_changed(device_id: DeviceId, state: SessionState, error: Option<String>) -> Self {
        Self::StateChanged {
            device_id,
            state,
            error,
        }
    }
}
