// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Push session: connect, subscribe, stream, reconnect with backoff.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::{ConnectionError, ProtocolError};
use crate::event::EventAddress;
use crate::external::PairingDirectory;
use crate::metadata::{MetadataMap, MetadataResolver};
use crate::protocol::{PushConnection, PushConnector, PushMessage, RawChange, bounded};
use crate::types::Pairing;

use super::backoff::{Backoff, BackoffPolicy};
use super::context::SessionContext;
use super::pipeline::{EventPipeline, Observation};
use super::state::SessionState;

/// Upper bound on closing a connection during teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) struct PushSession {
    pub context: Arc<SessionContext>,
    pub pipeline: Arc<EventPipeline>,
    pub connector: Arc<dyn PushConnector>,
    pub pairings: Option<Arc<dyn PairingDirectory>>,
    pub resolver: Arc<MetadataResolver>,
    pub backoff: BackoffPolicy,
    pub request_timeout: Duration,
}

impl PushSession {
    /// Runs until the session token is cancelled.
    pub async fn run(self, mut pairing: Pairing) {
        let token = self.context.token.clone();
        let mut backoff = Backoff::new(self.backoff);

        loop {
            self.context.transition(SessionState::Connecting, None);

            let error = match self.connect_and_serve(&pairing, &mut backoff).await {
                Ok(()) => break,
                Err(e) => e,
            };

            let delay = backoff.next_delay();
            self.context.enter_backoff(delay, error.to_string());

            tokio::select! {
                () = token.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }

            pairing = self.refresh_pairing(pairing).await;
        }

        tracing::debug!(
            device_id = %self.context.device_id,
            session_id = %self.context.session_id,
            "Push session loop exited"
        );
    }

    /// Returns `Ok(())` only when cancelled. An open connection is always
    /// closed before returning.
    async fn connect_and_serve(
        &self,
        pairing: &Pairing,
        backoff: &mut Backoff,
    ) -> Result<(), ConnectionError> {
        let token = self.context.token.clone();
        let connect = bounded(
            "connect",
            self.request_timeout,
            self.connector.connect(pairing),
        );
        let mut connection = tokio::select! {
            () = token.cancelled() => return Ok(()),
            connection = connect => connection?,
        };

        let result = tokio::select! {
            () = token.cancelled() => Ok(()),
            result = self.serve(connection.as_mut(), pairing, backoff) => result,
        };

        if tokio::time::timeout(CLOSE_TIMEOUT, connection.close())
            .await
            .is_err()
        {
            tracing::debug!(device_id = %self.context.device_id, "Timed out closing connection");
        }
        result
    }

    async fn serve(
        &self,
        connection: &mut dyn PushConnection,
        pairing: &Pairing,
        backoff: &mut Backoff,
    ) -> Result<(), ConnectionError> {
        let tree = bounded("accessory fetch", self.request_timeout, connection.accessories()).await?;
        let map = self.resolver.resolve(pairing, &tree);
        let mut rx = self.subscribe(connection, &map).await?;

        backoff.reset();
        self.context.clear_error();
        self.context.transition(SessionState::Subscribed, None);

        // Set after an in-place resubscribe until the new stream delivers.
        let mut resubscribed = false;
        loop {
            match rx.recv().await {
                Some(PushMessage::Changes(changes)) => {
                    resubscribed = false;
                    self.handle_changes(&map, changes).await;
                }
                Some(PushMessage::Disconnected) | None => {
                    self.context.transition(
                        SessionState::Disconnected,
                        Some(ConnectionError::Closed.to_string()),
                    );
                    if resubscribed {
                        return Err(ConnectionError::Closed);
                    }
                    rx = self.subscribe(connection, &map).await?;
                    resubscribed = true;
                    self.context.transition(SessionState::Subscribed, None);
                }
            }
        }
    }

    async fn subscribe(
        &self,
        connection: &mut dyn PushConnection,
        map: &MetadataMap,
    ) -> Result<mpsc::Receiver<PushMessage>, ConnectionError> {
        bounded(
            "subscribe",
            self.request_timeout,
            connection.subscribe(map.watch_set()),
        )
        .await
    }

    async fn handle_changes(&self, map: &MetadataMap, changes: Vec<RawChange>) {
        let mut batch = Vec::with_capacity(changes.len());
        for change in changes {
            let Some(meta) = map.get(&change.key).filter(|m| m.watched) else {
                let err = ProtocolError::UnknownCharacteristic {
                    accessory: change.key.accessory,
                    characteristic: change.key.characteristic,
                };
                tracing::debug!(device_id = %self.context.device_id, error = %err, "Dropping notification");
                continue;
            };
            batch.push(Observation {
                effective_accessory_id: meta.effective_accessory_id.clone(),
                component_name: meta.component_name.clone(),
                service_type: meta.service_type.clone(),
                characteristic: meta.characteristic_name.clone(),
                format: meta.format.clone(),
                address: EventAddress::Characteristic {
                    aid: change.key.accessory,
                    iid: change.key.characteristic,
                },
                value: change.value,
            });
        }
        self.pipeline.process(batch).await;
    }

    /// Picks up address changes made by external discovery.
    async fn refresh_pairing(&self, current: Pairing) -> Pairing {
        let Some(directory) = &self.pairings else {
            return current;
        };

        match directory.current_pairing(&current.id).await {
            Ok(Some(fresh)) if fresh.protocol != current.protocol => {
                tracing::warn!(
                    device_id = %current.id,
                    protocol = %fresh.protocol,
                    "Stored pairing changed protocol, keeping previous"
                );
                current
            }
            Ok(Some(fresh)) => {
                let fresh = Pairing {
                    id: current.id.clone(),
                    ..fresh
                };
                if fresh.transport_differs(&current) {
                    tracing::info!(
                        device_id = %current.id,
                        old = %current.transport,
                        new = %fresh.transport,
                        "Device address changed, retrying at new address"
                    );
                    self.context.set_address(fresh.transport.to_string());
                }
                fresh
            }
            Ok(None) => {
                tracing::debug!(device_id = %current.id, "No current pairing, keeping previous");
                current
            }
            Err(e) => {
                tracing::warn!(device_id = %current.id, error = %e, "Pairing lookup failed");
                current
            }
        }
    }
}
