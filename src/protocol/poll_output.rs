// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsing of poll query output.
//!
//! The query tool prints attribute reports in one of three shapes:
//!
//! ```text
//! [{"endpoint":1,"cluster":6,"attribute":0,"value":true}]
//! {"events":[{"endpoint":1,"cluster":6,"attribute":0,"value":true}]}
//! {"endpoint":1,"cluster":6,"attribute":0,"value":true}
//! {"endpoint":2,"cluster":1026,"attribute":0,"value":2150}
//! ```
//!
//! In the newline-delimited form, lines that are not JSON are log noise from
//! the tool and are skipped.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::types::CompositeKey;

/// One attribute report from a poll query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRow {
    /// Endpoint number.
    #[serde(alias = "endpointId")]
    pub endpoint: u64,
    /// Cluster id.
    #[serde(alias = "clusterId")]
    pub cluster: u32,
    /// Attribute id.
    #[serde(alias = "attributeId")]
    pub attribute: u32,
    /// Reported value.
    #[serde(default)]
    pub value: Value,
    /// Cluster name, if the tool supplied one.
    #[serde(default)]
    pub cluster_name: Option<String>,
    /// Attribute name, if the tool supplied one.
    #[serde(default)]
    pub attribute_name: Option<String>,
}

impl PollRow {
    /// Returns the packed composite key of this row.
    #[must_use]
    pub const fn key(&self) -> CompositeKey {
        CompositeKey::attribute(self.endpoint, self.cluster, self.attribute)
    }
}

/// Parses the stdout of a poll query into rows.
///
/// JSON values that are not attribute reports are skipped.
///
/// # Errors
///
/// Returns [`ParseError::UnexpectedFormat`] if the output is non-empty but
/// contains no JSON at all.
pub fn parse_poll_output(stdout: &str) -> Result<Vec<PollRow>, ParseError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(whole) = serde_json::from_str::<Value>(trimmed) {
        return Ok(rows_from_value(whole));
    }

    let mut rows = Vec::new();
    let mut saw_json = false;
    for line in trimmed.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => {
                saw_json = true;
                rows.extend(rows_from_value(value));
            }
            Err(_) => tracing::trace!(line = %line, "Skipping non-JSON output line"),
        }
    }

    if !saw_json {
        return Err(ParseError::UnexpectedFormat(preview(trimmed)));
    }
    Ok(rows)
}

fn rows_from_value(value: Value) -> Vec<PollRow> {
    match value {
        Value::Array(items) => items.into_iter().filter_map(row_from_value).collect(),
        Value::Object(mut map) => match map.remove("events") {
            Some(Value::Array(items)) => items.into_iter().filter_map(row_from_value).collect(),
            Some(_) => Vec::new(),
            None => row_from_value(Value::Object(map)).into_iter().collect(),
        },
        _ => Vec::new(),
    }
}

fn row_from_value(value: Value) -> Option<PollRow> {
    match serde_json::from_value(value) {
        Ok(row) => Some(row),
        Err(e) => {
            tracing::debug!(error = %e, "Skipping JSON value that is not an attribute report");
            None
        }
    }
}

fn preview(output: &str) -> String {
    const MAX: usize = 80;
    match output.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &output[..cut]),
        None => output.to_string(),
    }
}
