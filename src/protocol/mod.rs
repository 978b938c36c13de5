// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Protocol seams for reaching accessories.
//!
//! Two device families are supported:
//!
//! - **Push**: a [`PushConnector`] opens a [`PushConnection`] that exposes the
//!   accessory tree and streams [`PushMessage`]s over a channel. The wire
//!   protocol itself (pairing, encryption) lives in the connector
//!   implementation supplied by the caller.
//! - **Poll**: an external query command is rendered from a
//!   [`CommandTemplate`], run by a [`CommandRunner`], and its stdout is parsed
//!   with [`parse_poll_output`].
//!
//! Every call here is bounded: push calls by [`bounded`], commands by
//! [`run_bounded`].

mod command;
mod poll_output;
mod push;

pub use command::{
    CommandOutput, CommandRunner, CommandTemplate, ProcessRunner, TemplateVars, run_bounded,
};
pub use poll_output::{PollRow, parse_poll_output};
pub use push::{
    PushConnection, PushConnector, PushMessage, RawChange, bounded, parse_event_payload,
};
