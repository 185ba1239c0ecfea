// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! The only channel between the Gateway and the Defender.
//!
//! A call names an [`Operation`] and carries an ordered list of JSON encoded arguments. The
//! callee answers with a framed JSON payload which the caller unwraps with
//! [`extract_payload`]. Typed [`Call`]s and the service links turn this into ordinary async
//! method calls.

mod call;
mod error;
mod framing;
mod invoke;
mod links;
mod operation;
mod records;

pub use call::*;
pub use error::*;
pub use framing::*;
pub use invoke::*;
pub use links::*;
pub use operation::*;
pub use records::*;
