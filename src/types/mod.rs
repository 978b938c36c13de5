// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by the resolver, caches, and sessions.
//!
//! # Types
//!
//! - [`DeviceId`] - Identifier of a paired device, owned by the pairing store
//! - [`Pairing`] - Read-only pairing record (protocol, transport, name)
//! - [`AccessoryTree`] - Snapshot of a push device's accessory/service/characteristic tree
//! - [`CompositeKey`] - Accessory-instance + characteristic-instance address
//! - [`CacheKey`] - Composite key namespaced by the effective accessory id

mod accessory;
mod device_id;
mod key;
mod pairing;
mod value;

pub use accessory::{Accessory, AccessoryTree, Characteristic, Service};
pub use device_id::DeviceId;
pub use key::{CacheKey, CompositeKey};
pub use pairing::{BRIDGE_CATEGORY, Credentials, Pairing, ProtocolKind, Transport};
pub use value::normalize_value;
