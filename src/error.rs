// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `accessory_watch` library.
//!
//! The hierarchy mirrors the failure taxonomy of a device session:
//! connection failures trigger backoff, protocol errors are dropped,
//! command errors are recorded and retried on the next poll tick, and
//! sink errors lose the event. None of them ever escape a session; the
//! top-level [`Error`] is only returned by manager operations.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Connecting to or subscribing on a device failed.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// A protocol payload was malformed or unexpected.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// An external command failed.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Output or payload parsing failed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// An external store collaborator failed.
    #[error("store error: {0}")]
    Sink(#[from] SinkError),

    /// The manager or a session is misconfigured.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No session exists for the requested device.
    #[error("no active session for device {0}")]
    SessionNotFound(String),
}

/// Errors raised while establishing or maintaining a push connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The device could not be reached.
    #[error("device unreachable at {address}: {message}")]
    Unreachable {
        /// Address that was dialled.
        address: String,
        /// Underlying failure description.
        message: String,
    },

    /// The accessory tree could not be fetched.
    #[error("failed to fetch accessory tree: {0}")]
    TreeFetch(String),

    /// Subscribing to characteristic notifications failed.
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// A protocol call exceeded its bounded wait.
    #[error("{operation} timed out after {millis} ms")]
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
        /// Configured bound in milliseconds.
        millis: u64,
    },

    /// The notification stream closed.
    #[error("connection closed")]
    Closed,
}

/// Errors related to protocol payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A notification referenced a characteristic not in the metadata map.
    #[error("unknown characteristic {accessory}.{characteristic}")]
    UnknownCharacteristic {
        /// Accessory (or endpoint) instance id.
        accessory: u64,
        /// Characteristic (or cluster/attribute) instance id.
        characteristic: u64,
    },

    /// A notification payload was malformed.
    #[error("malformed notification: {0}")]
    Malformed(String),
}

/// Errors raised by external command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command line was empty after templating.
    #[error("command line is empty")]
    Empty,

    /// The template referenced an unknown placeholder or was malformed.
    #[error("invalid command template: {0}")]
    Template(String),

    /// The process could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// I/O error from the OS.
        #[source]
        source: std::io::Error,
    },

    /// The process did not finish within the configured timeout.
    #[error("command timed out after {0} ms")]
    Timeout(u64),

    /// The process exited with a non-zero status.
    #[error("command exited with status {code:?}: {stderr}")]
    NonZeroExit {
        /// Exit code, `None` if killed by a signal.
        code: Option<i32>,
        /// Captured standard error (trimmed).
        stderr: String,
    },
}

/// Errors related to parsing payloads and command output.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing.
    #[error("missing field: {0}")]
    MissingField(String),

    /// Output did not match any supported format.
    #[error("unexpected output format: {0}")]
    UnexpectedFormat(String),
}

/// Errors returned by external store collaborators.
///
/// Covers the [`EventSink`](crate::external::EventSink), the
/// [`RoomDirectory`](crate::external::RoomDirectory), and the
/// [`PairingDirectory`](crate::external::PairingDirectory).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The store refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The backing store is unavailable.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Errors related to manager and session configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required collaborator was not supplied to the builder.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// A pairing cannot be served with the current configuration.
    #[error("unsupported pairing: {0}")]
    UnsupportedPairing(String),

    /// A regular expression failed to compile.
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler message.
        message: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
