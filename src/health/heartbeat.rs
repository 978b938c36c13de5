// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Heartbeat estimation from event history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Typical interval between a device's events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatEstimate {
    /// Median gap between consecutive events, rounded to whole seconds.
    pub seconds: u64,
    /// Number of gaps the median was taken over.
    pub samples: u32,
}

/// Estimates a heartbeat from event timestamps.
///
/// Timestamps may be in any order. Zero-length gaps (events in the same
/// instant) are ignored. Returns `None` when there is no positive gap.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use accessory_watch::health::estimate_heartbeat;
///
/// let start = Utc::now();
/// let seen: Vec<_> = [0, 300, 600, 900].iter().map(|s| start + Duration::seconds(*s)).collect();
///
/// let estimate = estimate_heartbeat(&seen).unwrap();
/// assert_eq!(estimate.seconds, 300);
/// assert_eq!(estimate.samples, 3);
/// ```
#[must_use]
pub fn estimate_heartbeat(timestamps: &[DateTime<Utc>]) -> Option<HeartbeatEstimate> {
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();

    let mut gaps: Vec<i64> = sorted
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds())
        .filter(|gap| *gap > 0)
        .collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort_unstable();

    let mid = gaps.len() / 2;
    let median_ms = if gaps.len() % 2 == 0 {
        gaps[mid - 1] / 2 + gaps[mid] / 2 + (gaps[mid - 1] % 2 + gaps[mid] % 2) / 2
    } else {
        gaps[mid]
    };

    Some(HeartbeatEstimate {
        seconds: u64::try_from((median_ms + 500) / 1000).unwrap_or(0),
        samples: u32::try_from(gaps.len()).unwrap_or(u32::MAX),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series(offsets: &[i64]) -> Vec<DateTime<Utc>> {
        let start = DateTime::<Utc>::UNIX_EPOCH;
        offsets.iter().map(|s| start + Duration::seconds(*s)).collect()
    }

    #[test]
    fn median_ignores_outliers() {
        let estimate = estimate_heartbeat(&series(&[0, 60, 120, 180, 3780])).unwrap();
        assert_eq!(estimate.seconds, 60);
        assert_eq!(estimate.samples, 4);
    }

    #[test]
    fn even_count_averages_middle_gaps() {
        let estimate = estimate_heartbeat(&series(&[0, 100, 300, 600, 1000])).unwrap();
        // gaps 100, 200, 300, 400
        assert_eq!(estimate.seconds, 250);
    }

    #[test]
    fn order_does_not_matter() {
        let estimate = estimate_heartbeat(&series(&[600, 0, 300])).unwrap();
        assert_eq!(estimate.seconds, 300);
        assert_eq!(estimate.samples, 2);
    }

    #[test]
    fn duplicates_are_ignored() {
        let estimate = estimate_heartbeat(&series(&[0, 0, 0, 120])).unwrap();
        assert_eq!(estimate.seconds, 120);
        assert_eq!(estimate.samples, 1);
    }

    #[test]
    fn too_few_events() {
        assert_eq!(estimate_heartbeat(&[]), None);
        assert_eq!(estimate_heartbeat(&series(&[5])), None);
        assert_eq!(estimate_heartbeat(&series(&[5, 5])), None);
    }
}
