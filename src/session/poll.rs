// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poll session: run the query command on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::error::Error;
use crate::event::EventAddress;
use crate::metadata::{
    COMPONENT_SEPARATOR, attribute_label, cluster_label, effective_accessory_id,
    is_on_characteristic,
};
use crate::protocol::{
    CommandRunner, CommandTemplate, PollRow, TemplateVars, parse_poll_output, run_bounded,
};
use crate::types::Pairing;

use super::context::SessionContext;
use super::pipeline::{EventPipeline, Observation};
use super::state::SessionState;

pub(crate) struct PollSession {
    pub context: Arc<SessionContext>,
    pub pipeline: Arc<EventPipeline>,
    pub runner: Arc<dyn CommandRunner>,
    pub template: CommandTemplate,
    pub interval: Duration,
    pub command_timeout: Duration,
}

impl PollSession {
    /// Runs until the session token is cancelled.
    ///
    /// A failed cycle is recorded as the last error; the next cycle runs on
    /// the regular interval.
    pub async fn run(self, pairing: Pairing) {
        let token = self.context.token.clone();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.context.transition(SessionState::Polling, None);

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                () = token.cancelled() => break,
                outcome = self.poll_once(&pairing) => outcome,
            };

            match outcome {
                Ok(rows) => {
                    tracing::trace!(device_id = %pairing.id, rows, "Poll cycle complete");
                    self.context.clear_error();
                }
                Err(e) => {
                    tracing::warn!(device_id = %pairing.id, error = %e, "Poll cycle failed");
                    self.context.record_error(e.to_string());
                }
            }
        }

        tracing::debug!(
            device_id = %self.context.device_id,
            session_id = %self.context.session_id,
            "Poll session loop exited"
        );
    }

    /// Runs one query and feeds its rows through the pipeline. Returns the
    /// number of rows parsed.
    async fn poll_once(&self, pairing: &Pairing) -> Result<usize, Error> {
        let argv = self.template.render(&TemplateVars::for_pairing(pairing))?;
        let output = run_bounded(self.runner.as_ref(), &argv, self.command_timeout).await?;
        let rows = parse_poll_output(&output.stdout)?;
        let count = rows.len();

        let batch = rows.into_iter().map(|row| observation(pairing, row)).collect();
        self.pipeline.process(batch).await;
        Ok(count)
    }
}

fn observation(pairing: &Pairing, row: PollRow) -> Observation {
    let component_name = if row.endpoint > 1 {
        format!("{}{COMPONENT_SEPARATOR}Endpoint {}", pairing.name, row.endpoint)
    } else {
        pairing.name.clone()
    };
    let service_type = row
        .cluster_name
        .or_else(|| cluster_label(row.cluster).map(str::to_string))
        .unwrap_or_else(|| format!("Cluster 0x{:04X}", row.cluster));
    let characteristic = row
        .attribute_name
        .or_else(|| attribute_label(row.cluster, row.attribute).map(str::to_string))
        .unwrap_or_else(|| format!("Attribute 0x{:04X}", row.attribute));

    // On/off attributes are reported as 0/1 by some firmware.
    let format = is_on_characteristic(&characteristic).then(|| "bool".to_string());

    Observation {
        effective_accessory_id: effective_accessory_id(&pairing.id, row.endpoint, true),
        component_name,
        service_type,
        characteristic,
        format,
        address: EventAddress::Attribute {
            endpoint: row.endpoint,
            cluster: row.cluster,
            attribute: row.attribute,
        },
        value: row.value,
    }
}
