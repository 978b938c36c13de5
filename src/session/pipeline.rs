// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normalization path shared by push and poll sessions.
//!
//! observation -> value normalization -> cache dedup -> debounce -> sink

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Utc;
use serde_json::Value;

use crate::cache::{DebounceRule, DebounceScheduler, Transition, ValueCache};
use crate::event::{AccessoryEvent, EventAddress, ManagerEvent};
use crate::external::{EventSink, RoomDirectory, RoomMap, resolve_room};
use crate::types::{CacheKey, ProtocolKind, normalize_value};

use super::context::SessionContext;

/// A raw value already matched to its component.
#[derive(Debug, Clone)]
pub(crate) struct Observation {
    pub effective_accessory_id: String,
    pub component_name: String,
    pub service_type: String,
    pub characteristic: String,
    pub format: Option<String>,
    pub address: EventAddress,
    pub value: Value,
}

/// Collaborators and shared maps a session feeds observations through.
#[derive(Clone)]
pub(crate) struct PipelineDeps {
    pub cache: Arc<ValueCache>,
    pub debounce: Arc<DebounceScheduler>,
    pub rule: Arc<DebounceRule>,
    pub sink: Arc<dyn EventSink>,
    pub rooms: Arc<dyn RoomDirectory>,
}

pub(crate) struct EventPipeline {
    context: Arc<SessionContext>,
    protocol: ProtocolKind,
    deps: PipelineDeps,
}

impl EventPipeline {
    pub fn new(context: Arc<SessionContext>, protocol: ProtocolKind, deps: PipelineDeps) -> Arc<Self> {
        Arc::new(Self {
            context,
            protocol,
            deps,
        })
    }

    /// Processes one batch in arrival order. Returns the number of events
    /// emitted immediately.
    pub async fn process(self: &Arc<Self>, batch: Vec<Observation>) -> usize {
        if batch.is_empty() || self.context.is_stopped() {
            return 0;
        }

        let rooms = match self.deps.rooms.load_rooms().await {
            Ok(rooms) => rooms,
            Err(e) => {
                tracing::warn!(device_id = %self.context.device_id, error = %e, "Failed to load rooms");
                RoomMap::new()
            }
        };

        let mut emitted = 0;
        for observation in batch {
            if self.handle(observation, &rooms).await {
                emitted += 1;
            }
        }
        emitted
    }

    async fn handle(self: &Arc<Self>, observation: Observation, rooms: &RoomMap) -> bool {
        let device_id = &self.context.device_id;
        let new_value = normalize_value(&observation.value, observation.format.as_deref());
        let key = CacheKey::new(
            device_id.clone(),
            observation.effective_accessory_id.as_str(),
            observation.address.composite_key(),
        );

        let check = self.deps.cache.record_and_check(&key, &new_value);
        if check.is_duplicate {
            tracing::debug!(%key, value = %new_value, "Suppressed duplicate value");
            return false;
        }

        let transition = self.deps.rule.classify(
            &observation.component_name,
            &observation.characteristic,
            check.old_value.as_deref(),
            &new_value,
        );

        let event = AccessoryEvent {
            device_id: device_id.clone(),
            room: resolve_room(rooms, &observation.effective_accessory_id, device_id),
            accessory_id: observation.effective_accessory_id,
            accessory_name: observation.component_name,
            service_type: observation.service_type,
            characteristic: observation.characteristic,
            old_value: check.old_value,
            new_value,
            protocol: self.protocol,
            address: observation.address,
            observed_at: Utc::now(),
        };

        match transition {
            Transition::Resetting => {
                self.hold(key, event);
                false
            }
            Transition::Rearming if self.deps.debounce.cancel(&key) => {
                tracing::debug!(%key, "Discarded pending reset, device re-armed");
                false
            }
            Transition::Rearming | Transition::Other => {
                self.emit(event).await;
                true
            }
        }
    }

    fn hold(self: &Arc<Self>, key: CacheKey, event: AccessoryEvent) {
        let pipeline = Arc::clone(self);
        let stopped = self.context.stopped_flag();
        self.deps
            .debounce
            .schedule(key, self.deps.rule.delay(), &self.context.token, move || async move {
                if stopped.load(Ordering::Acquire) {
                    return;
                }
                let mut event = event;
                event.observed_at = Utc::now();
                pipeline.emit(event).await;
            });
    }

    async fn emit(&self, event: AccessoryEvent) {
        if self.context.is_stopped() {
            return;
        }

        let persisted_id = match self.deps.sink.insert_event(&event).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(
                    device_id = %event.device_id,
                    characteristic = %event.characteristic,
                    error = %e,
                    "Event sink rejected event, dropping"
                );
                None
            }
        };

        tracing::debug!(
            device_id = %event.device_id,
            accessory = %event.accessory_name,
            characteristic = %event.characteristic,
            old = ?event.old_value,
            new = %event.new_value,
            "Emitted event"
        );

        self.context.record_event(event.observed_at);
        self.context.bus().publish(ManagerEvent::EventRecorded {
            event: Box::new(event),
            persisted_id,
        });
    }
}
