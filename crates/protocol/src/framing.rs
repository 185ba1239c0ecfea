// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::ProtocolError;
use serde::{de::DeserializeOwned, Serialize};

/// Status preamble the transaction layer puts in front of a successful response
const PREAMBLE: &str = "\u{8}\u{c8}\u{1}\u{1a}";

/// Wrap a JSON payload the way the transaction layer hands responses back to a caller
pub fn frame(payload: &str) -> String {
    format!("{PREAMBLE}{}:{payload}\u{0}", payload.len())
}

/// Serialize and frame a response value
pub fn respond<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(frame(&serde_json::to_string(value)?))
}

/// Slice out the outermost JSON object of a raw response, ignoring whatever framing
/// surrounds it
pub fn extract_payload(raw: &str) -> Result<&str, ProtocolError> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&raw[start..=end]),
        _ => Err(ProtocolError::MalformedPayload(format!(
            "no object in {} byte response",
            raw.len()
        ))),
    }
}

/// Extract and deserialize a framed response
pub fn decode_response<T: DeserializeOwned>(raw: &str) -> Result<T, ProtocolError> {
    let payload = extract_payload(raw)?;
    serde_json::from_str(payload).map_err(|e| ProtocolError::MalformedPayload(e.to_string()))
}
