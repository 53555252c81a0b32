// SPDX-FileCopyrightText: 2025 snapd-rs contributors
// SPDX-License-Identifier: MIT

//! JSON text sequences (RFC 7464), used by the logs endpoint.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

const RECORD_SEPARATOR: u8 = 0x1e;

/// Split a `application/json-seq` body into records and deserialize each.
///
/// Whitespace-only records are skipped.
pub fn parse_records<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>> {
    body.split(|b| *b == RECORD_SEPARATOR)
        .filter(|record| !record.iter().all(u8::is_ascii_whitespace))
        .map(|record| {
            serde_json::from_slice(record)
                .map_err(|e| Error::bad_response(format!("invalid JSON sequence record: {e}")))
        })
        .collect()
}
