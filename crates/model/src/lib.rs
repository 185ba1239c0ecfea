// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod chunking;
mod codec;
mod error;
mod source;
mod templates;
mod tensor;

pub use chunking::*;
pub use codec::*;
pub use error::*;
pub use source::*;
pub use templates::*;
pub use tensor::*;
