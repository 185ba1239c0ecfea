// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Ledger world state. A flat key/value space held by a store actor, addressed through scoped
//! [`DataStore`] handles and typed [`Repository`] locations.

mod data_store;
mod in_mem;
mod keys;
mod messages;
mod persistable;
mod repository;
mod sled_store;

pub use data_store::*;
pub use in_mem::*;
pub use keys::IntoKey;
pub use messages::*;
pub use persistable::*;
pub use repository::*;
pub use sled_store::*;
