// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session manager for watching many accessories at once.
//!
//! # Overview
//!
//! The [`SessionManager`] is the entry point for embedding applications. It
//! provides:
//!
//! - **One session per device**: start, replace, and stop push or poll sessions
//! - **Shared caches**: one value cache and one debounce scheduler, keyed per device
//! - **Observability**: per-session status via watch channels, plus a broadcast
//!   stream of lifecycle and event notifications
//! - **Commissioning**: the external commissioning command, via [`Commissioner`]
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use accessory_watch::manager::{ManagerConfig, SessionManager};
//! use accessory_watch::protocol::CommandTemplate;
//! use accessory_watch::types::{DeviceId, Pairing};
//! # use accessory_watch::external::EventSink;
//!
//! # async fn example(sink: Arc<dyn EventSink>) -> accessory_watch::Result<()> {
//! let config = ManagerConfig::new()
//!     .with_poll_command(CommandTemplate::parse("chip-tool report {nodeId}")?);
//!
//! let manager = SessionManager::builder().sink(sink).config(config).build()?;
//! manager
//!     .start_session(DeviceId::new("plug"), Pairing::poll("plug", "Desk Plug", 4))
//!     .await?;
//!
//! if let Some(status) = manager.session_status(&DeviceId::new("plug")).await {
//!     println!("{}: {}", status.device_id, status.state);
//! }
//! # Ok(())
//! # }
//! ```

mod commissioner;
mod config;
mod session_manager;

pub use commissioner::{CommissionRequest, Commissioner};
pub use config::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT, ManagerConfig,
};
pub use session_manager::{SessionManager, SessionManagerBuilder};
