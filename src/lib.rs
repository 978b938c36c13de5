// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `accessory_watch` - connectivity and event normalization for smart-home
//! accessories.
//!
//! The library keeps one long-running session per paired device, turns raw
//! protocol payloads into canonical [`AccessoryEvent`]s, suppresses noise,
//! and derives a health classification from event cadence.
//!
//! # Features
//!
//! - **Push sessions**: subscribe to a device's change stream, resubscribe in
//!   place on disconnect, reconnect with exponential backoff
//! - **Poll sessions**: run an external query command on a fixed interval and
//!   parse its output
//! - **Normalization**: composite addressing, bridge child ids, component name
//!   disambiguation, room resolution
//! - **Noise suppression**: per-characteristic deduplication and a debounce rule
//!   for self-resetting switches
//! - **Health**: online/offline/stale classification adapted to each device's
//!   heartbeat
//!
//! Storage, room assignment, and the pairing store are collaborators supplied
//! by the embedding application through the traits in [`external`]. The
//! push wire protocol is supplied through [`protocol::PushConnector`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use accessory_watch::{Pairing, SessionManager};
//! use accessory_watch::external::EventSink;
//! use accessory_watch::protocol::PushConnector;
//!
//! # async fn example(sink: Arc<dyn EventSink>, connector: Arc<dyn PushConnector>) -> accessory_watch::Result<()> {
//! let manager = SessionManager::builder()
//!     .sink(sink)
//!     .push_connector(connector)
//!     .build()?;
//!
//! let pairing = Pairing::push("bridge-1", "Hallway Bridge", "192.168.1.40", 51826);
//! manager.start_session(pairing.id.clone(), pairing).await?;
//!
//! // ... later
//! manager.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Health
//!
//! ```
//! use chrono::{Duration, Utc};
//! use accessory_watch::health::{HealthStatus, derive_health};
//!
//! let now = Utc::now();
//! let snapshot = derive_health(None, now - Duration::days(1), None, 0, None, now);
//! assert_eq!(snapshot.status, HealthStatus::Stale);
//! ```

pub mod cache;
pub mod error;
pub mod event;
pub mod external;
pub mod health;
pub mod manager;
pub mod metadata;
pub mod protocol;
pub mod session;
pub mod types;

pub use error::{
    CommandError, ConfigError, ConnectionError, Error, ParseError, ProtocolError, Result,
    SinkError,
};
pub use event::{AccessoryEvent, EventAddress, ManagerEvent};
pub use health::{HealthSnapshot, HealthStatus, derive_health, estimate_heartbeat};
pub use manager::{ManagerConfig, SessionManager};
pub use session::{SessionId, SessionState, SessionStatus};
pub use types::{DeviceId, Pairing, ProtocolKind, Transport};
