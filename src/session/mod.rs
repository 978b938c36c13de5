// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device sessions.
//!
//! Each session is one Tokio task owning its connection (push) or its poll
//! timer (poll). Both kinds feed the same normalization pipeline:
//! metadata lookup, value normalization, cache deduplication, the debounce
//! rule, and finally the event sink.
//!
//! Sessions never return errors to the caller. Failures are logged, stored
//! in [`SessionStatus::last_error`], and handled by the session itself:
//! push sessions back off and reconnect, poll sessions wait for the next
//! tick.
//!
//! Sessions are created through
//! [`SessionManager`](crate::manager::SessionManager); this module exposes
//! their observable state and the backoff policy.

mod backoff;
mod context;
mod pipeline;
mod poll;
mod push;
mod state;

pub use backoff::{Backoff, BackoffPolicy, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY};
pub use state::{SessionId, SessionState, SessionStatus};

pub(crate) use context::SessionContext;
pub(crate) use pipeline::{EventPipeline, PipelineDeps};
pub(crate) use poll::PollSession;
pub(crate) use push::PushSession;
