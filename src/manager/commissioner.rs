// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Poll-device commissioning through an external command.

use std::sync::Arc;
use std::time::Duration;

use crate::error::CommandError;
use crate::protocol::{CommandOutput, CommandRunner, CommandTemplate, TemplateVars, run_bounded};
use crate::types::Transport;

/// Parameters for commissioning a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionRequest {
    /// Setup or pairing code printed on the device.
    pub code: String,
    /// Node id to assign.
    pub node_id: u64,
    /// Human name for the device.
    pub name: String,
    /// How the device is reached during commissioning.
    pub transport: Transport,
}

impl CommissionRequest {
    /// Creates a request for an IP-reachable device.
    #[must_use]
    pub fn new(code: impl Into<String>, node_id: u64, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            node_id,
            name: name.into(),
            transport: Transport::Named {
                name: "ip".to_string(),
            },
        }
    }

    /// Sets the transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    fn vars(&self) -> TemplateVars {
        let (address, port, transport) = match &self.transport {
            Transport::Ip { address, port } => (address.clone(), port.to_string(), "ip".to_string()),
            Transport::Named { name } => (String::new(), String::new(), name.clone()),
        };
        TemplateVars::new()
            .with("code", self.code.as_str())
            .with("nodeId", self.node_id.to_string())
            .with("name", self.name.as_str())
            .with("address", address)
            .with("port", port)
            .with("transport", transport)
    }
}

/// Runs the commissioning command.
///
/// Shares the templating and timeout handling of poll sessions but is not
/// part of the event path.
#[derive(Clone)]
pub struct Commissioner {
    template: CommandTemplate,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl Commissioner {
    /// Creates a commissioner.
    #[must_use]
    pub fn new(template: CommandTemplate, runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self {
            template,
            runner,
            timeout,
        }
    }

    /// Commissions a device.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] if the template cannot be rendered, the
    /// command cannot be started, times out, or exits with a failure status.
    pub async fn commission(&self, request: &CommissionRequest) -> Result<CommandOutput, CommandError> {
        let argv = self.template.render(&request.vars())?;

        tracing::info!(
            node_id = request.node_id,
            name = %request.name,
            transport = %request.transport,
            "Commissioning device"
        );

        match run_bounded(self.runner.as_ref(), &argv, self.timeout).await {
            Ok(output) => {
                tracing::info!(node_id = request.node_id, "Commissioning succeeded");
                Ok(output)
            }
            Err(e) => {
                tracing::warn!(node_id = request.node_id, error = %e, "Commissioning failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for Commissioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commissioner")
            .field("template", &self.template.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct CapturingRunner {
        calls: Mutex<Vec<(Vec<String>, Duration)>>,
        fail: bool,
    }

    #[async_trait]
    impl CommandRunner for CapturingRunner {
        async fn run(&self, argv: &[String], timeout: Duration) -> Result<CommandOutput, CommandError> {
            self.calls.lock().push((argv.to_vec(), timeout));
            if self.fail {
                return Err(CommandError::Timeout(10));
            }
            Ok(CommandOutput {
                stdout: "commissioned".to_string(),
                stderr: String::new(),
            })
        }
    }

    fn commissioner(runner: Arc<CapturingRunner>, line: &str) -> Commissioner {
        Commissioner::new(CommandTemplate::parse(line).unwrap(), runner, Duration::from_secs(90))
    }

    #[tokio::test]
    async fn renders_all_placeholders() {
        let runner = Arc::new(CapturingRunner::default());
        let c = commissioner(
            Arc::clone(&runner),
            "pair {transport} {nodeId} {code} --name \"{name}\" --at {address}:{port}",
        );
        let request = CommissionRequest::new("MT:Y.K90", 12, "Litter Box").with_transport(Transport::Ip {
            address: "10.0.0.7".to_string(),
            port: 5540,
        });

        let output = c.commission(&request).await.unwrap();
        assert_eq!(output.stdout, "commissioned");

        let calls = runner.calls.lock();
        assert_eq!(
            calls[0].0,
            ["pair", "ip", "12", "MT:Y.K90", "--name", "Litter Box", "--at", "10.0.0.7:5540"]
        );
        assert_eq!(calls[0].1, Duration::from_secs(90));
    }

    #[tokio::test]
    async fn named_transport_leaves_address_empty() {
        let runner = Arc::new(CapturingRunner::default());
        let c = commissioner(Arc::clone(&runner), "pair {transport} [{address}]");
        let request = CommissionRequest::new("1234", 1, "Sensor").with_transport(Transport::Named {
            name: "ble-thread".to_string(),
        });

        c.commission(&request).await.unwrap();
        assert_eq!(runner.calls.lock()[0].0, ["pair", "ble-thread", "[]"]);
    }

    #[tokio::test]
    async fn runner_failure_is_returned() {
        let runner = Arc::new(CapturingRunner {
            fail: true,
            ..CapturingRunner::default()
        });
        let c = commissioner(runner, "pair {code}");

        let err = c.commission(&CommissionRequest::new("1", 1, "x")).await.unwrap_err();
        assert!(matches!(err, CommandError::Timeout(10)));
    }

    #[tokio::test]
    async fn unknown_placeholder_never_runs() {
        let runner = Arc::new(CapturingRunner::default());
        let c = commissioner(Arc::clone(&runner), "pair {secret}");

        let err = c.commission(&CommissionRequest::new("1", 1, "x")).await.unwrap_err();
        assert!(matches!(err, CommandError::Template(_)));
        assert!(runner.calls.lock().is_empty());
    }
}
