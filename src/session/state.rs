// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session identity, state, and status snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{DeviceId, Pairing, ProtocolKind};

/// Identifier of one session run.
///
/// A new id is assigned every time a session is started, so log lines and
/// notifications from a replaced session can be told apart from its successor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a new random session id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of a device session.
///
/// ```text
/// push:  Connecting -> Subscribed <-> Disconnected
///            ^            |              |
///            +-- Backoff <+--------------+
/// poll:  Polling (fixed interval, no backoff)
/// both:  any -> Stopped (teardown only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Opening a connection and fetching the accessory tree.
    Connecting,
    /// Subscribed and receiving push notifications.
    Subscribed,
    /// Running the poll loop.
    Polling,
    /// The subscription dropped; resubscribing in place.
    Disconnected,
    /// Waiting before the next connection attempt.
    Backoff,
    /// Torn down. Terminal.
    Stopped,
}

impl SessionState {
    /// Returns true if the session is delivering events.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Subscribed | Self::Polling)
    }

    /// Returns the lowercase name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Subscribed => "subscribed",
            Self::Polling => "polling",
            Self::Disconnected => "disconnected",
            Self::Backoff => "backoff",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable status of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Device the session serves.
    pub device_id: DeviceId,
    /// Identifier of this session run.
    pub session_id: SessionId,
    /// Protocol family.
    pub protocol: ProtocolKind,
    /// False once the session has been stopped.
    pub active: bool,
    /// Current state.
    pub state: SessionState,
    /// Most recent failure, cleared by the next success.
    pub last_error: Option<String>,
    /// When the session last emitted an event.
    pub last_event_at: Option<DateTime<Utc>>,
    /// Current backoff delay while in [`SessionState::Backoff`].
    pub retry_delay_ms: Option<u64>,
    /// Number of events handed to the sink.
    pub events_emitted: u64,
    /// When the session was started.
    pub started_at: DateTime<Utc>,
    /// Transport address in use (`address:port` or transport name).
    pub address: String,
}

impl SessionStatus {
    pub(crate) fn new(session_id: SessionId, pairing: &Pairing) -> Self {
        let initial = match pairing.protocol {
            ProtocolKind::Push => SessionState::Connecting,
            ProtocolKind::Poll => SessionState::Polling,
        };
        Self {
            device_id: pairing.id.clone(),
            session_id,
            protocol: pairing.protocol,
            active: true,
            state: initial,
            last_error: None,
            last_event_at: None,
            retry_delay_ms: None,
            events_emitted: 0,
            started_at: Utc::now(),
            address: pairing.transport.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn live_states() {
        assert!(SessionState::Subscribed.is_live());
        assert!(SessionState::Polling.is_live());
        assert!(!SessionState::Backoff.is_live());
        assert!(!SessionState::Stopped.is_live());
    }

    #[test]
    fn initial_status_follows_protocol() {
        let push = SessionStatus::new(SessionId::new(), &Pairing::push("a", "A", "10.0.0.1", 80));
        assert_eq!(push.state, SessionState::Connecting);
        assert_eq!(push.address, "10.0.0.1:80");
        assert!(push.active);

        let poll = SessionStatus::new(SessionId::new(), &Pairing::poll("b", "B", 3));
        assert_eq!(poll.state, SessionState::Polling);
    }

    #[test]
    fn status_serializes_camel_case() {
        let status = SessionStatus::new(SessionId::new(), &Pairing::poll("b", "B", 3));
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["state"], "polling");
        assert_eq!(json["eventsEmitted"], 0);
        assert!(json["lastError"].is_null());
        assert_eq!(json["deviceId"], "b");
    }
}
