// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session manager configuration.

use std::time::Duration;

use crate::cache::DebounceRule;
use crate::event::DEFAULT_CHANNEL_CAPACITY;
use crate::protocol::CommandTemplate;
use crate::session::BackoffPolicy;

/// Default bound on each push protocol call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default bound on external command execution.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration shared by every session of a manager.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use accessory_watch::manager::ManagerConfig;
/// use accessory_watch::protocol::CommandTemplate;
/// use accessory_watch::session::BackoffPolicy;
///
/// let config = ManagerConfig::new()
///     .with_poll_command(CommandTemplate::parse("chip-tool report {nodeId}").unwrap())
///     .with_poll_interval(Duration::from_secs(30))
///     .with_backoff(BackoffPolicy::new().with_max_delay(Duration::from_secs(120)));
///
/// assert!(config.poll_command.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Reconnect backoff for push sessions.
    pub backoff: BackoffPolicy,
    /// Bound on each push protocol call (connect, tree fetch, subscribe).
    pub request_timeout: Duration,
    /// Interval between poll cycles.
    pub poll_interval: Duration,
    /// Bound on each external command.
    pub command_timeout: Duration,
    /// Query command for poll sessions. Poll pairings are rejected without it.
    pub poll_command: Option<CommandTemplate>,
    /// Commissioning command.
    pub commission_command: Option<CommandTemplate>,
    /// Self-resetting switch rule.
    pub debounce: DebounceRule,
    /// Watched push service types. `None` uses the built-in set.
    pub watched_services: Option<Vec<String>>,
    /// Capacity of the manager notification bus.
    pub event_capacity: usize,
}

impl ManagerConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reconnect backoff policy.
    #[must_use]
    pub fn with_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = policy;
        self
    }

    /// Sets the bound on push protocol calls.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the bound on external commands.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the poll query command.
    #[must_use]
    pub fn with_poll_command(mut self, template: CommandTemplate) -> Self {
        self.poll_command = Some(template);
        self
    }

    /// Sets the commissioning command.
    #[must_use]
    pub fn with_commission_command(mut self, template: CommandTemplate) -> Self {
        self.commission_command = Some(template);
        self
    }

    /// Sets the self-resetting switch rule.
    #[must_use]
    pub fn with_debounce(mut self, rule: DebounceRule) -> Self {
        self.debounce = rule;
        self
    }

    /// Replaces the watched push service types (short or full type codes).
    #[must_use]
    pub fn with_watched_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watched_services = Some(services.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the notification bus capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            poll_command: None,
            commission_command: None,
            debounce: DebounceRule::default(),
            watched_services: None,
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}
