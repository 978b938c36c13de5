// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Push-protocol connection contracts.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{ConnectionError, ProtocolError};
use crate::types::{AccessoryTree, CompositeKey, Pairing};

/// A single characteristic value change reported by a device.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChange {
    /// Characteristic address.
    pub key: CompositeKey,
    /// Raw value as sent by the device.
    pub value: Value,
}

impl RawChange {
    /// Creates a change for the characteristic `aid.iid`.
    #[must_use]
    pub fn new(aid: u64, iid: u64, value: Value) -> Self {
        Self {
            key: CompositeKey::new(aid, iid),
            value,
        }
    }
}

/// Messages delivered on a push subscription channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    /// One notification carrying one or more changes.
    Changes(Vec<RawChange>),
    /// The device dropped the subscription.
    Disconnected,
}

/// Opens connections to push-protocol devices.
#[async_trait]
pub trait PushConnector: Send + Sync {
    /// Connects to the device described by `pairing`.
    async fn connect(&self, pairing: &Pairing) -> Result<Box<dyn PushConnection>, ConnectionError>;
}

/// An open connection to a push-protocol device.
///
/// A closed receiver is treated the same as [`PushMessage::Disconnected`].
#[async_trait]
pub trait PushConnection: Send {
    /// Fetches the device's accessory tree.
    async fn accessories(&mut self) -> Result<AccessoryTree, ConnectionError>;

    /// Subscribes to change notifications for `keys`.
    ///
    /// Calling it again replaces the previous subscription.
    async fn subscribe(
        &mut self,
        keys: &[CompositeKey],
    ) -> Result<mpsc::Receiver<PushMessage>, ConnectionError>;

    /// Closes the connection. Errors are ignored.
    async fn close(&mut self);
}

/// Runs a protocol call with a bounded wait.
///
/// # Errors
///
/// Returns [`ConnectionError::Timeout`] if `limit` elapses first, otherwise
/// the call's own result.
pub async fn bounded<T, F>(operation: &'static str, limit: Duration, call: F) -> Result<T, ConnectionError>
where
    F: Future<Output = Result<T, ConnectionError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ConnectionError::Timeout {
            operation,
            millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[derive(Deserialize)]
struct EventBody {
    characteristics: Vec<EventEntry>,
}

#[derive(Deserialize)]
struct EventEntry {
    aid: u64,
    iid: u64,
    #[serde(default)]
    value: Value,
}

/// Parses a push-protocol event body into changes.
///
/// The body has the form
/// `{"characteristics":[{"aid":1,"iid":10,"value":true}]}`. Connector
/// implementations use this when they receive raw event frames.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if the body does not match that shape.
///
/// # Examples
///
/// ```
/// use accessory_watch::protocol::parse_event_payload;
///
/// let changes = parse_event_payload(r#"{"characteristics":[{"aid":2,"iid":9,"value":1}]}"#)
///     .unwrap();
/// assert_eq!(changes[0].key.accessory, 2);
/// ```
pub fn parse_event_payload(body: &str) -> Result<Vec<RawChange>, ProtocolError> {
    let parsed: EventBody =
        serde_json::from_str(body).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    Ok(parsed
        .characteristics
        .into_iter()
        .map(|entry| RawChange::new(entry.aid, entry.iid, entry.value))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_event_payload_multiple_entries() {
        let body = r#"{"characteristics":[
            {"aid":1,"iid":10,"value":true},
            {"aid":3,"iid":10,"value":21.5}
        ]}"#;

        let changes = parse_event_payload(body).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], RawChange::new(1, 10, json!(true)));
        assert_eq!(changes[1].key, CompositeKey::new(3, 10));
    }

    #[test]
    fn parse_event_payload_missing_value_is_null() {
        let changes = parse_event_payload(r#"{"characteristics":[{"aid":1,"iid":2}]}"#).unwrap();
        assert_eq!(changes[0].value, Value::Null);
    }

    #[test]
    fn parse_event_payload_rejects_garbage() {
        let err = parse_event_payload("EVENT/1.0 200 OK").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_times_out() {
        let result: Result<(), _> = bounded("fetch", Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert_eq!(
            result.unwrap_err(),
            ConnectionError::Timeout {
                operation: "fetch",
                millis: 1000
            }
        );
    }

    #[tokio::test]
    async fn bounded_passes_result_through() {
        let result = bounded("fetch", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
