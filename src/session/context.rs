// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State shared between a session task and the manager.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::event::{EventBus, ManagerEvent};
use crate::types::{DeviceId, Pairing};

use super::state::{SessionId, SessionState, SessionStatus};

/// Handle to one session run.
///
/// The task owns a clone; the manager keeps another to stop it and to hand
/// out status receivers.
pub(crate) struct SessionContext {
    pub device_id: DeviceId,
    pub session_id: SessionId,
    pub token: CancellationToken,
    stopped: Arc<AtomicBool>,
    status: watch::Sender<SessionStatus>,
    bus: EventBus,
}

impl SessionContext {
    pub fn new(pairing: &Pairing, bus: EventBus) -> Self {
        let session_id = SessionId::new();
        let (status, _) = watch::channel(SessionStatus::new(session_id, pairing));
        Self {
            device_id: pairing.id.clone(),
            session_id,
            token: CancellationToken::new(),
            stopped: Arc::new(AtomicBool::new(false)),
            status,
            bus,
        }
    }

    /// Flag checked by timer callbacks before they act.
    pub fn stopped_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stopped)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// Moves to `state`, recording `error` if given. No-op once stopped.
    pub fn transition(&self, state: SessionState, error: Option<String>) {
        if self.is_stopped() {
            return;
        }
        self.status.send_modify(|s| {
            s.state = state;
            if state != SessionState::Backoff {
                s.retry_delay_ms = None;
            }
            if error.is_some() {
                s.last_error.clone_from(&error);
            }
        });

        match &error {
            Some(e) => tracing::warn!(
                device_id = %self.device_id,
                session_id = %self.session_id,
                state = %state,
                error = %e,
                "Session state changed"
            ),
            None => tracing::info!(
                device_id = %self.device_id,
                session_id = %self.session_id,
                state = %state,
                "Session state changed"
            ),
        }

        self.bus.publish(ManagerEvent::state_changed(
            self.device_id.clone(),
            state,
            error,
        ));
    }

    /// Enters backoff for `delay` after `error`.
    pub fn enter_backoff(&self, delay: Duration, error: String) {
        self.transition(SessionState::Backoff, Some(error));
        if self.is_stopped() {
            return;
        }
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.status.send_modify(|s| s.retry_delay_ms = Some(millis));
    }

    /// Records a failure without changing state.
    pub fn record_error(&self, error: String) {
        if self.is_stopped() {
            return;
        }
        self.status.send_modify(|s| s.last_error = Some(error));
    }

    pub fn clear_error(&self) {
        self.status.send_if_modified(|s| s.last_error.take().is_some());
    }

    pub fn record_event(&self, at: DateTime<Utc>) {
        self.status.send_modify(|s| {
            s.events_emitted += 1;
            s.last_event_at = Some(at);
        });
    }

    pub fn set_address(&self, address: String) {
        self.status.send_if_modified(|s| {
            if s.address == address {
                false
            } else {
                s.address = address;
                true
            }
        });
    }

    /// Stops the session: sets the flag, cancels the task and its timers,
    /// and marks the status inactive. Returns false if it was already stopped.
    pub fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        self.status.send_modify(|s| {
            s.active = false;
            s.state = SessionState::Stopped;
            s.retry_delay_ms = None;
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SessionContext {
        SessionContext::new(&Pairing::push("dev", "Dev", "10.0.0.1", 80), EventBus::new())
    }

    #[test]
    fn transition_publishes_and_updates_status() {
        let ctx = context();
        let mut rx = ctx.bus().subscribe();

        ctx.transition(SessionState::Subscribed, None);

        assert_eq!(ctx.status().state, SessionState::Subscribed);
        assert!(matches!(
            rx.try_recv().unwrap(),
            ManagerEvent::StateChanged { state: SessionState::Subscribed, .. }
        ));
    }

    #[test]
    fn backoff_records_delay_and_error() {
        let ctx = context();
        ctx.enter_backoff(Duration::from_secs(5), "refused".to_string());

        let status = ctx.status();
        assert_eq!(status.state, SessionState::Backoff);
        assert_eq!(status.retry_delay_ms, Some(5000));
        assert_eq!(status.last_error.as_deref(), Some("refused"));

        ctx.transition(SessionState::Connecting, None);
        assert_eq!(ctx.status().retry_delay_ms, None);
        assert_eq!(ctx.status().last_error.as_deref(), Some("refused"));
    }

    #[test]
    fn stop_is_terminal() {
        let ctx = context();
        assert!(ctx.stop());
        assert!(!ctx.stop());
        assert!(ctx.token.is_cancelled());

        ctx.transition(SessionState::Connecting, None);
        let status = ctx.status();
        assert_eq!(status.state, SessionState::Stopped);
        assert!(!status.active);
    }

    #[test]
    fn record_event_counts() {
        let ctx = context();
        let now = Utc::now();
        ctx.record_event(now);
        ctx.record_event(now);

        assert_eq!(ctx.status().events_emitted, 2);
        assert_eq!(ctx.status().last_event_at, Some(now));
    }
}
