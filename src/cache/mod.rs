// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-process value cache and debounce scheduler.
//!
//! Both are plain key/value maps owned by the
//! [`SessionManager`](crate::manager::SessionManager) and handed to each
//! session explicitly. Keys embed the effective accessory id, so sessions of
//! different devices never see each other's entries; teardown of a session
//! purges its timers first and its cache entries second.

mod debounce;
mod value_cache;

pub use debounce::{
    DEFAULT_DEBOUNCE_DELAY, DEFAULT_DEBOUNCE_PATTERN, DebounceRule, DebounceScheduler, Transition,
};
pub use value_cache::{CacheCheck, ValueCache};
