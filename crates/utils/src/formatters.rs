// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use core::fmt;

/// Largest string that is printed without abbreviation
const FULL_PRINT_LIMIT: usize = 100;
/// Number of characters kept when a string is abbreviated
const ABBREVIATED_LENGTH: usize = 24;

/// Hex formatter for byte blobs such as ciphertexts and key material
pub fn hexf(data: &[u8], f: &mut fmt::Formatter) -> fmt::Result {
    let encoded = hex::encode(data);
    if encoded.len() <= FULL_PRINT_LIMIT {
        return write!(f, "0x{}", encoded);
    }
    write!(
        f,
        "<bytes({}):0x{}>",
        data.len(),
        abbreviate(&encoded, ABBREVIATED_LENGTH)
    )
}

/// Keep the head and tail of a long identifier, eg. for digests in log lines
pub fn abbreviate(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }
    let head = limit / 2;
    let tail = limit - head;
    let start: String = s.chars().take(head).collect();
    let end: String = s
        .chars()
        .rev()
        .take(tail)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{start}..{end}")
}
