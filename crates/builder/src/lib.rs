// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod federation;
mod federation_builder;
pub mod telemetry;

pub use federation::*;
pub use federation_builder::*;
