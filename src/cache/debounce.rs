// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Delayed emission for self-resetting switches.
//!
//! Some appliances expose a switch that turns itself back off at the end of
//! a short cycle ("Run Leveling", "Run Clean Cycle"). The `true -> false`
//! transition of such a switch is held for a configurable delay and only
//! emitted if the switch stays off; a `true` arriving first cancels it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use tokio_util::sync::CancellationToken;

use crate::error::ConfigError;
use crate::metadata::is_on_characteristic;
use crate::types::{CacheKey, DeviceId};

/// Default pattern identifying self-resetting switches.
pub const DEFAULT_DEBOUNCE_PATTERN: &str = r"run (leveling|clean cycle)";

/// Default hold time for a pending `off` emission.
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_secs(15 * 60);

/// How a value change relates to the debounce rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `true -> false` on a self-resetting switch: hold the emission.
    Resetting,
    /// `-> true` on a self-resetting switch: cancels a held emission.
    Rearming,
    /// Anything else: emit immediately.
    Other,
}

/// Rule identifying self-resetting switches.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use accessory_watch::cache::{DebounceRule, Transition};
///
/// let rule = DebounceRule::new("run leveling", Duration::from_secs(60)).unwrap();
/// let transition = rule.classify("Litter Box · Run Leveling", "On", Some("true"), "false");
/// assert_eq!(transition, Transition::Resetting);
/// ```
#[derive(Debug, Clone)]
pub struct DebounceRule {
    pattern: Regex,
    delay: Duration,
}

impl DebounceRule {
    /// Creates a rule from a case-insensitive pattern and hold delay.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if the pattern does not compile.
    pub fn new(pattern: &str, delay: Duration) -> Result<Self, ConfigError> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { pattern, delay })
    }

    /// Returns the hold delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Returns true if a component name denotes a self-resetting switch.
    #[must_use]
    pub fn matches(&self, component_name: &str) -> bool {
        self.pattern.is_match(component_name)
    }

    /// Classifies a value change for the given characteristic.
    #[must_use]
    pub fn classify(
        &self,
        component_name: &str,
        characteristic_name: &str,
        old_value: Option<&str>,
        new_value: &str,
    ) -> Transition {
        if !is_on_characteristic(characteristic_name) || !self.matches(component_name) {
            return Transition::Other;
        }
        match (old_value, new_value) {
            (Some("true"), "false") => Transition::Resetting,
            (_, "true") => Transition::Rearming,
            _ => Transition::Other,
        }
    }
}

impl Default for DebounceRule {
    fn default() -> Self {
        Self {
            pattern: RegexBuilder::new(DEFAULT_DEBOUNCE_PATTERN)
                .case_insensitive(true)
                .build()
                .unwrap_or_else(|_| unreachable!("default debounce pattern is valid")),
            delay: DEFAULT_DEBOUNCE_DELAY,
        }
    }
}

struct PendingEmit {
    ticket: u64,
    fire_at: DateTime<Utc>,
    token: CancellationToken,
}

/// Pending delayed emissions, keyed like the value cache.
///
/// At most one timer exists per key: scheduling a key cancels the previous
/// timer before the replacement is registered.
#[derive(Default)]
pub struct DebounceScheduler {
    pending: Arc<Mutex<HashMap<CacheKey, PendingEmit>>>,
    next_ticket: AtomicU64,
}

impl DebounceScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `on_fire` to run after `delay` unless cancelled.
    ///
    /// The timer is tied to `parent`: cancelling the owning session's token
    /// cancels every timer it scheduled. Must be called within a Tokio runtime.
    pub fn schedule<F, Fut>(
        &self,
        key: CacheKey,
        delay: Duration,
        parent: &CancellationToken,
        on_fire: F,
    ) where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let token = parent.child_token();
        let fire_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        {
            let mut pending = self.pending.lock();
            if let Some(previous) = pending.remove(&key) {
                previous.token.cancel();
            }
            pending.insert(
                key.clone(),
                PendingEmit {
                    ticket,
                    fire_at,
                    token: token.clone(),
                },
            );
        }

        tracing::debug!(%key, delay_secs = delay.as_secs(), "Scheduled debounced emission");

        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let current = {
                        let mut pending = pending.lock();
                        match pending.get(&key) {
                            Some(entry) if entry.ticket == ticket => {
                                pending.remove(&key);
                                true
                            }
                            _ => false,
                        }
                    };
                    if current {
                        on_fire().await;
                    }
                }
            }
        });
    }

    /// Cancels the pending timer for a key. Returns true if one existed.
    pub fn cancel(&self, key: &CacheKey) -> bool {
        match self.pending.lock().remove(key) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Returns when the pending timer for a key is due to fire.
    #[must_use]
    pub fn fire_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        self.pending.lock().get(key).map(|entry| entry.fire_at)
    }

    /// Cancels and drops every timer owned by a device. Returns the number removed.
    pub fn purge_device(&self, device_id: &DeviceId) -> usize {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|key, entry| {
            if &key.device_id == device_id {
                entry.token.cancel();
                false
            } else {
                true
            }
        });
        before - pending.len()
    }

    /// Returns the number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns true if no timer is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl std::fmt::Debug for DebounceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebounceScheduler")
            .field("pending", &self.len())
            .finish_non_exhaustive()
    }
}
