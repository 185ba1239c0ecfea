// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod models;
mod stub_service;
mod utils;

pub use models::*;
pub use stub_service::*;
pub use utils::*;
