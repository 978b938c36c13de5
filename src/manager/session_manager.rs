// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session registry and lifecycle.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, broadcast, watch};
use tokio::task::JoinHandle;

use crate::cache::{DebounceRule, DebounceScheduler, ValueCache};
use crate::error::{ConfigError, Error};
use crate::event::{EventBus, ManagerEvent};
use crate::external::{EventSink, NoRooms, PairingDirectory, RoomDirectory};
use crate::metadata::MetadataResolver;
use crate::protocol::{CommandRunner, ProcessRunner, PushConnector};
use crate::session::{
    EventPipeline, PipelineDeps, PollSession, PushSession, SessionContext, SessionId,
    SessionStatus,
};
use crate::types::{DeviceId, Pairing, ProtocolKind};

use super::commissioner::Commissioner;
use super::config::ManagerConfig;

/// Bound on waiting for a cancelled session task to finish.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

struct ActiveSession {
    context: Arc<SessionContext>,
    task: JoinHandle<()>,
}

/// Registry of per-device sessions.
///
/// Holds exactly one live session per device id. Starting a session for a
/// device that already has one tears the old one down first: its timers are
/// cancelled before its cache entries are dropped.
///
/// Starts and stops are serialized by a lifecycle lock. The registry lock is
/// only held to look up, insert or remove entries, never across a teardown,
/// so status reads stay responsive while a session is stopping.
///
/// The value cache and the debounce scheduler are owned here and shared by
/// every session; their keys embed the device id, so sessions never see each
/// other's entries.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use accessory_watch::manager::SessionManager;
/// use accessory_watch::types::{DeviceId, Pairing};
/// # use accessory_watch::external::EventSink;
///
/// # async fn example(sink: Arc<dyn EventSink>, connector: Arc<dyn accessory_watch::protocol::PushConnector>) -> accessory_watch::Result<()> {
/// let manager = SessionManager::builder()
///     .sink(sink)
///     .push_connector(connector)
///     .build()?;
///
/// let mut notices = manager.subscribe();
/// let pairing = Pairing::push("hub-1", "Hallway Bridge", "192.168.1.40", 51826);
/// manager.start_session(DeviceId::new("hub-1"), pairing).await?;
///
/// while let Ok(notice) = notices.recv().await {
///     println!("{notice:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct SessionManager {
    config: ManagerConfig,
    resolver: Arc<MetadataResolver>,
    rule: Arc<DebounceRule>,
    cache: Arc<ValueCache>,
    debounce: Arc<DebounceScheduler>,
    event_bus: EventBus,
    sink: Arc<dyn EventSink>,
    rooms: Arc<dyn RoomDirectory>,
    pairings: Option<Arc<dyn PairingDirectory>>,
    connector: Option<Arc<dyn PushConnector>>,
    runner: Arc<dyn CommandRunner>,
    sessions: RwLock<HashMap<DeviceId, ActiveSession>>,
    lifecycle: Mutex<()>,
}

impl SessionManager {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> SessionManagerBuilder {
        SessionManagerBuilder::new()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // =========================================================================
    // Subscription
    // =========================================================================

    /// Subscribes to manager notifications for every session.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.event_bus.subscribe()
    }

    /// Returns the number of active notification subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.event_bus.subscriber_count()
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Starts a session for a device, replacing any existing one.
    ///
    /// The pairing is stored under `device_id` regardless of its own `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the pairing's protocol cannot be served:
    /// a push pairing without a [`PushConnector`], or a poll pairing without
    /// a configured poll command. The existing session, if any, is kept.
    pub async fn start_session(&self, device_id: DeviceId, pairing: Pairing) -> Result<SessionId, Error> {
        let pairing = Pairing {
            id: device_id.clone(),
            ..pairing
        };
        self.check_supported(&pairing)?;

        let _lifecycle = self.lifecycle.lock().await;
        let previous = self.sessions.write().await.remove(&device_id);
        if let Some(previous) = previous {
            tracing::info!(
                device_id = %device_id,
                session_id = %previous.context.session_id,
                "Replacing existing session"
            );
            self.teardown(previous).await;
        }

        let context = Arc::new(SessionContext::new(&pairing, self.event_bus.clone()));
        let session_id = context.session_id;
        let protocol = pairing.protocol;
        let task = self.spawn(Arc::clone(&context), pairing)?;

        self.sessions
            .write()
            .await
            .insert(device_id.clone(), ActiveSession { context, task });

        tracing::info!(device_id = %device_id, session_id = %session_id, protocol = %protocol, "Session started");
        self.event_bus.publish(ManagerEvent::SessionStarted {
            device_id,
            session_id,
            protocol,
        });

        Ok(session_id)
    }

    /// Stops the session for a device.
    ///
    /// Returns false if no session existed.
    pub async fn stop_session(&self, device_id: &DeviceId) -> bool {
        let _lifecycle = self.lifecycle.lock().await;
        let removed = self.sessions.write().await.remove(device_id);
        match removed {
            Some(active) => {
                self.teardown(active).await;
                true
            }
            None => false,
        }
    }

    /// Stops every session.
    pub async fn shutdown(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        let drained: Vec<ActiveSession> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(_, active)| active).collect()
        };
        let count = drained.len();
        for active in drained {
            self.teardown(active).await;
        }
        tracing::info!(sessions = count, "Session manager shut down");
    }

    /// Returns the ids of devices with a live session, sorted.
    pub async fn active_sessions(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the current status of a device's session.
    pub async fn session_status(&self, device_id: &DeviceId) -> Option<SessionStatus> {
        self.sessions
            .read()
            .await
            .get(device_id)
            .map(|active| active.context.status())
    }

    /// Returns a receiver that tracks a device's session status.
    ///
    /// The receiver sees the final `Stopped` status when the session is torn
    /// down; a replacement session has its own channel.
    pub async fn watch_session(&self, device_id: &DeviceId) -> Option<watch::Receiver<SessionStatus>> {
        self.sessions
            .read()
            .await
            .get(device_id)
            .map(|active| active.context.watch())
    }

    /// Returns a commissioner using the configured commissioning command.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCollaborator`] if no commissioning
    /// command is configured.
    pub fn commissioner(&self) -> Result<Commissioner, ConfigError> {
        let template = self
            .config
            .commission_command
            .clone()
            .ok_or(ConfigError::MissingCollaborator("commissioning command"))?;
        Ok(Commissioner::new(
            template,
            Arc::clone(&self.runner),
            self.config.command_timeout,
        ))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn check_supported(&self, pairing: &Pairing) -> Result<(), ConfigError> {
        match pairing.protocol {
            ProtocolKind::Push if self.connector.is_none() => {
                Err(ConfigError::MissingCollaborator("push connector"))
            }
            ProtocolKind::Poll if self.config.poll_command.is_none() => Err(
                ConfigError::UnsupportedPairing(format!("{}: no poll command configured", pairing.id)),
            ),
            _ => Ok(()),
        }
    }

    fn spawn(&self, context: Arc<SessionContext>, pairing: Pairing) -> Result<JoinHandle<()>, ConfigError> {
        let deps = PipelineDeps {
            cache: Arc::clone(&self.cache),
            debounce: Arc::clone(&self.debounce),
            rule: Arc::clone(&self.rule),
            sink: Arc::clone(&self.sink),
            rooms: Arc::clone(&self.rooms),
        };
        let pipeline = EventPipeline::new(Arc::clone(&context), pairing.protocol, deps);

        let task = match pairing.protocol {
            ProtocolKind::Push => {
                let connector = self
                    .connector
                    .clone()
                    .ok_or(ConfigError::MissingCollaborator("push connector"))?;
                let session = PushSession {
                    context,
                    pipeline,
                    connector,
                    pairings: self.pairings.clone(),
                    resolver: Arc::clone(&self.resolver),
                    backoff: self.config.backoff,
                    request_timeout: self.config.request_timeout,
                };
                tokio::spawn(session.run(pairing))
            }
            ProtocolKind::Poll => {
                let template = self.config.poll_command.clone().ok_or_else(|| {
                    ConfigError::UnsupportedPairing(format!("{}: no poll command configured", pairing.id))
                })?;
                let session = PollSession {
                    context,
                    pipeline,
                    runner: Arc::clone(&self.runner),
                    template,
                    interval: self.config.poll_interval,
                    command_timeout: self.config.command_timeout,
                };
                tokio::spawn(session.run(pairing))
            }
        };
        Ok(task)
    }

    /// Stops a session: set the stopped flag and cancel its task and timers,
    /// wait for the task, then drop its timers and cache entries.
    async fn teardown(&self, active: ActiveSession) {
        let ActiveSession { context, task } = active;
        if !context.stop() {
            return;
        }

        let abort = task.abort_handle();
        match tokio::time::timeout(TEARDOWN_TIMEOUT, task).await {
            Ok(Err(e)) if e.is_panic() => {
                tracing::error!(device_id = %context.device_id, "Session task panicked");
            }
            Ok(_) => {}
            Err(_) => {
                tracing::warn!(device_id = %context.device_id, "Session task did not stop in time, aborting");
                abort.abort();
            }
        }

        let timers = self.debounce.purge_device(&context.device_id);
        let entries = self.cache.evict_device(&context.device_id);

        tracing::info!(
            device_id = %context.device_id,
            session_id = %context.session_id,
            timers,
            entries,
            "Session stopped"
        );
        self.event_bus.publish(ManagerEvent::SessionStopped {
            device_id: context.device_id.clone(),
            session_id: context.session_id,
        });
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        for active in self.sessions.get_mut().values() {
            active.context.stop();
        }
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("cached_values", &self.cache.len())
            .field("pending_timers", &self.debounce.len())
            .field("push", &self.connector.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`SessionManager`].
#[derive(Default)]
pub struct SessionManagerBuilder {
    config: ManagerConfig,
    sink: Option<Arc<dyn EventSink>>,
    rooms: Option<Arc<dyn RoomDirectory>>,
    pairings: Option<Arc<dyn PairingDirectory>>,
    connector: Option<Arc<dyn PushConnector>>,
    runner: Option<Arc<dyn CommandRunner>>,
}

impl SessionManagerBuilder {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the event sink. Required.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the room directory. Defaults to no rooms.
    #[must_use]
    pub fn rooms(mut self, rooms: Arc<dyn RoomDirectory>) -> Self {
        self.rooms = Some(rooms);
        self
    }

    /// Sets the pairing directory consulted before reconnect attempts.
    #[must_use]
    pub fn pairings(mut self, pairings: Arc<dyn PairingDirectory>) -> Self {
        self.pairings = Some(pairings);
        self
    }

    /// Sets the push connector. Required for push pairings.
    #[must_use]
    pub fn push_connector(mut self, connector: Arc<dyn PushConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Sets the command runner. Defaults to [`ProcessRunner`].
    #[must_use]
    pub fn command_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Builds the manager.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCollaborator`] if no sink was set.
    pub fn build(self) -> Result<SessionManager, ConfigError> {
        let sink = self
            .sink
            .ok_or(ConfigError::MissingCollaborator("event sink"))?;

        let resolver = match &self.config.watched_services {
            Some(services) => MetadataResolver::with_watched_services(services.iter().cloned()),
            None => MetadataResolver::new(),
        };

        Ok(SessionManager {
            resolver: Arc::new(resolver),
            rule: Arc::new(self.config.debounce.clone()),
            cache: Arc::new(ValueCache::new()),
            debounce: Arc::new(DebounceScheduler::new()),
            event_bus: EventBus::with_capacity(self.config.event_capacity),
            sink,
            rooms: self.rooms.unwrap_or_else(|| Arc::new(NoRooms)),
            pairings: self.pairings,
            connector: self.connector,
            runner: self.runner.unwrap_or_else(|| Arc::new(ProcessRunner)),
            sessions: RwLock::new(HashMap::new()),
            lifecycle: Mutex::new(()),
            config: self.config,
        })
    }
}
