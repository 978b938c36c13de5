// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device health derived from event cadence.
//!
//! [`derive_health`] is a pure function over externally stored statistics:
//! when the device was last seen, when it was paired, and how often it
//! normally reports (its heartbeat, see [`estimate_heartbeat`]). Thresholds
//! adapt to the heartbeat when enough samples back it, and fall back to fixed
//! values otherwise.

mod heartbeat;

pub use heartbeat::{HeartbeatEstimate, estimate_heartbeat};

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum number of samples for a heartbeat to be trusted.
pub const MIN_HEARTBEAT_SAMPLES: u32 = 3;

/// Default stale threshold.
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_secs(12 * 60 * 60);

const MIN_HEARTBEAT_SECS: u64 = 60;
const MAX_HEARTBEAT_SECS: u64 = 7 * 24 * 60 * 60;
const MIN_STALE_SECS: u64 = 60;
const MAX_STALE_SECS: u64 = 30 * 24 * 60 * 60;
const MIN_ONLINE_SECS: u64 = 5 * 60;
const FALLBACK_ONLINE_SECS: u64 = 15 * 60;

/// Health classification of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Never reported and not yet overdue.
    Unknown,
    /// Reported within the online threshold.
    Online,
    /// Quiet for longer than the online threshold.
    Offline,
    /// Quiet for longer than the stale threshold.
    Stale,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Stale => "stale",
        })
    }
}

/// Result of [`derive_health`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    /// Classification.
    pub status: HealthStatus,
    /// Clamped heartbeat, only when backed by enough samples.
    pub heartbeat_seconds: Option<u64>,
    /// Quiet period still considered online.
    pub online_threshold_seconds: u64,
    /// Quiet period after which the device is stale.
    pub stale_threshold_seconds: u64,
    /// Time since the last event; `None` if the device never reported.
    pub offline_duration_seconds: Option<u64>,
    /// Heartbeats missed since the last event.
    pub missed_heartbeats: u64,
    /// Why the device is stale.
    pub stale_reason: Option<String>,
}

/// Classifies a device's health.
///
/// * `heartbeat_seconds`/`heartbeat_samples` - typical reporting interval and
///   the number of gaps it was computed from
/// * `stale_threshold` - configured stale threshold, `None` for the default;
///   clamped to 1 minute..30 days
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use accessory_watch::health::{HealthStatus, derive_health};
///
/// let now = Utc::now();
/// let snapshot = derive_health(
///     Some(now - Duration::hours(2)),
///     now - Duration::days(30),
///     Some(600),
///     12,
///     None,
///     now,
/// );
///
/// assert_eq!(snapshot.status, HealthStatus::Offline);
/// assert_eq!(snapshot.missed_heartbeats, 11);
/// ```
#[must_use]
pub fn derive_health(
    last_seen: Option<DateTime<Utc>>,
    paired_at: DateTime<Utc>,
    heartbeat_seconds: Option<u64>,
    heartbeat_samples: u32,
    stale_threshold: Option<Duration>,
    now: DateTime<Utc>,
) -> HealthSnapshot {
    let heartbeat = heartbeat_seconds
        .filter(|_| heartbeat_samples >= MIN_HEARTBEAT_SAMPLES)
        .map(|hb| hb.clamp(MIN_HEARTBEAT_SECS, MAX_HEARTBEAT_SECS));

    let configured_stale = stale_threshold
        .unwrap_or(DEFAULT_STALE_THRESHOLD)
        .as_secs()
        .clamp(MIN_STALE_SECS, MAX_STALE_SECS);

    let (online_threshold, stale_threshold) = match heartbeat {
        Some(hb) => (
            hb.saturating_mul(2).max(MIN_ONLINE_SECS),
            hb.saturating_mul(6).max(configured_stale),
        ),
        None => (FALLBACK_ONLINE_SECS, configured_stale),
    };

    let mut snapshot = HealthSnapshot {
        status: HealthStatus::Unknown,
        heartbeat_seconds: heartbeat,
        online_threshold_seconds: online_threshold,
        stale_threshold_seconds: stale_threshold,
        offline_duration_seconds: None,
        missed_heartbeats: 0,
        stale_reason: None,
    };

    let Some(last_seen) = last_seen else {
        let since_pairing = elapsed_secs(paired_at, now);
        if since_pairing >= stale_threshold {
            snapshot.status = HealthStatus::Stale;
            snapshot.stale_reason = Some(format!(
                "device has never produced events since pairing {} ago",
                human_duration(since_pairing)
            ));
        }
        return snapshot;
    };

    let offline = elapsed_secs(last_seen, now);
    snapshot.offline_duration_seconds = Some(offline);

    if offline <= online_threshold {
        snapshot.status = HealthStatus::Online;
        return snapshot;
    }

    if let Some(hb) = heartbeat {
        snapshot.missed_heartbeats = (offline / hb).saturating_sub(1);
    }

    if offline >= stale_threshold {
        snapshot.status = HealthStatus::Stale;
        snapshot.stale_reason = Some(format!(
            "no events for {} (stale after {})",
            human_duration(offline),
            human_duration(stale_threshold)
        ));
    } else {
        snapshot.status = HealthStatus::Offline;
    }
    snapshot
}

/// Whole seconds from `from` to `now`, zero if `from` is in the future.
fn elapsed_secs(from: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - from).num_seconds()).unwrap_or(0)
}

fn human_duration(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    match (days, hours, minutes) {
        (0, 0, 0) => format!("{secs}s"),
        (0, 0, m) => format!("{m}m"),
        (0, h, 0) => format!("{h}h"),
        (0, h, m) => format!("{h}h {m}m"),
        (d, 0, _) => format!("{d}d"),
        (d, h, _) => format!("{d}d {h}h"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn at(now: DateTime<Utc>, ago: ChronoDuration) -> DateTime<Utc> {
        now - ago
    }

    #[test]
    fn recent_event_with_reliable_heartbeat_is_online() {
        let now = Utc::now();
        let s = derive_health(
            Some(at(now, ChronoDuration::minutes(5))),
            at(now, ChronoDuration::days(10)),
            Some(300),
            10,
            None,
            now,
        );

        assert_eq!(s.status, HealthStatus::Online);
        assert_eq!(s.missed_heartbeats, 0);
        assert_eq!(s.heartbeat_seconds, Some(300));
        assert_eq!(s.online_threshold_seconds, 600);
        assert_eq!(s.offline_duration_seconds, Some(300));
    }

    #[test]
    fn two_hours_quiet_is_offline_with_missed_heartbeats() {
        let now = Utc::now();
        let s = derive_health(
            Some(at(now, ChronoDuration::hours(2))),
            at(now, ChronoDuration::days(10)),
            Some(600),
            12,
            None,
            now,
        );

        assert_eq!(s.status, HealthStatus::Offline);
        assert_eq!(s.offline_duration_seconds, Some(7200));
        assert_eq!(s.missed_heartbeats, 11);
        assert_eq!(s.stale_reason, None);
    }

    #[test]
    fn never_seen_past_threshold_is_stale() {
        let now = Utc::now();
        let s = derive_health(None, at(now, ChronoDuration::days(1)), None, 0, None, now);

        assert_eq!(s.status, HealthStatus::Stale);
        assert_eq!(s.stale_threshold_seconds, 12 * 3600);
        assert!(s.stale_reason.unwrap().contains("never produced events"));
        assert_eq!(s.offline_duration_seconds, None);
    }

    #[test]
    fn never_seen_recently_paired_is_unknown() {
        let now = Utc::now();
        let s = derive_health(None, at(now, ChronoDuration::hours(1)), None, 0, None, now);

        assert_eq!(s.status, HealthStatus::Unknown);
        assert_eq!(s.stale_reason, None);
    }

    #[test]
    fn unreliable_heartbeat_uses_fixed_thresholds() {
        let now = Utc::now();
        let s = derive_health(
            Some(at(now, ChronoDuration::minutes(14))),
            at(now, ChronoDuration::days(1)),
            Some(60),
            2,
            None,
            now,
        );

        assert_eq!(s.heartbeat_seconds, None);
        assert_eq!(s.online_threshold_seconds, 900);
        assert_eq!(s.status, HealthStatus::Online);
        assert_eq!(s.missed_heartbeats, 0);
    }

    #[test]
    fn heartbeat_is_clamped() {
        let now = Utc::now();
        let low = derive_health(Some(now), now, Some(1), 50, None, now);
        assert_eq!(low.heartbeat_seconds, Some(60));
        assert_eq!(low.online_threshold_seconds, 300);

        let high = derive_health(Some(now), now, Some(u64::MAX), 50, None, now);
        assert_eq!(high.heartbeat_seconds, Some(7 * 24 * 3600));
        assert_eq!(high.stale_threshold_seconds, 42 * 24 * 3600);
    }

    #[test]
    fn configured_stale_threshold_is_clamped() {
        let now = Utc::now();
        let tiny = derive_health(None, now, None, 0, Some(Duration::from_secs(1)), now);
        assert_eq!(tiny.stale_threshold_seconds, 60);

        let huge = derive_health(None, now, None, 0, Some(Duration::from_secs(365 * 86_400)), now);
        assert_eq!(huge.stale_threshold_seconds, 30 * 86_400);
    }

    #[test]
    fn long_silence_is_stale_with_reason() {
        let now = Utc::now();
        let s = derive_health(
            Some(at(now, ChronoDuration::hours(13))),
            at(now, ChronoDuration::days(3)),
            Some(600),
            12,
            None,
            now,
        );

        assert_eq!(s.status, HealthStatus::Stale);
        assert_eq!(s.missed_heartbeats, 77);
        assert_eq!(s.stale_reason.as_deref(), Some("no events for 13h (stale after 12h)"));
    }

    #[test]
    fn heartbeat_raises_stale_threshold_above_configured() {
        let now = Utc::now();
        let s = derive_health(
            Some(at(now, ChronoDuration::hours(13))),
            at(now, ChronoDuration::days(3)),
            Some(3 * 3600),
            5,
            None,
            now,
        );

        assert_eq!(s.stale_threshold_seconds, 18 * 3600);
        assert_eq!(s.status, HealthStatus::Offline);
        assert_eq!(s.missed_heartbeats, 3);
    }

    #[test]
    fn future_last_seen_counts_as_online() {
        let now = Utc::now();
        let s = derive_health(Some(now + ChronoDuration::minutes(3)), now, None, 0, None, now);
        assert_eq!(s.status, HealthStatus::Online);
        assert_eq!(s.offline_duration_seconds, Some(0));
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let now = Utc::now();
        let s = derive_health(None, now, None, 0, None, now);
        let json = serde_json::to_value(&s).unwrap();

        assert_eq!(json["status"], "unknown");
        assert_eq!(json["staleThresholdSeconds"], 43_200);
        assert!(json["heartbeatSeconds"].is_null());
    }

    #[test]
    fn human_duration_formats() {
        assert_eq!(human_duration(45), "45s");
        assert_eq!(human_duration(90), "1m");
        assert_eq!(human_duration(3 * 3600 + 120), "3h 2m");
        assert_eq!(human_duration(86_400 + 3600), "1d 1h");
    }
}
