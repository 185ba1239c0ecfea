// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::{Actor, Addr};
use hefl_config::{FheConfig, FhePreset};
use hefl_data::{DataStore, InMemStore};
use tracing_subscriber::EnvFilter;

/// Fast parameters. Never use outside tests.
pub fn test_fhe_config() -> FheConfig {
    FheConfig {
        preset: FhePreset::Insecure2048,
        scale: 4096.0,
    }
}

/// Fresh logging in-memory store. Must be called inside an actix system.
pub fn in_mem_store() -> (DataStore, Addr<InMemStore>) {
    let addr = InMemStore::new(true).start();
    (DataStore::from(&addr), addr)
}

/// Route test logs through the test writer. `RUST_LOG` overrides the default level.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
