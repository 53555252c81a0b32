//! The JSON envelope snapd wraps around every reply.
//!
//! ```json
//! {"type": "sync", "status-code": 200, "status": "OK", "result": [...]}
//! {"type": "async", "status-code": 202, "change": "42"}
//! {"type": "error", "status-code": 401, "result": {"kind": "login-required", "message": "..."}}
//! ```

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, ErrorKind, Result};
use crate::http::HttpResponse;
use crate::types::Maintenance;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    status_code: Option<u16>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    change: Option<String>,
    #[serde(default)]
    maintenance: Option<Maintenance>,
    #[serde(default)]
    suggested_currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResult {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    value: Option<Value>,
}

/// A `type: sync` reply. `result` is left as JSON for the request to interpret.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResponse {
    pub status_code: u16,
    pub result: Value,
    pub maintenance: Option<Maintenance>,
    pub suggested_currency: Option<String>,
}

impl SyncResponse {
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.result)
            .map_err(|e| Error::bad_response(format!("unexpected result: {e}")))
    }

    /// Like [`into_result`](Self::into_result) for list endpoints: a `null`
    /// result is an empty list.
    pub fn into_list<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        if self.result.is_null() {
            return Ok(Vec::new());
        }
        self.into_result()
    }
}

/// A `type: async` reply: the daemon accepted the work as a change.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncResponse {
    pub change: String,
    pub status_code: u16,
    pub maintenance: Option<Maintenance>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Sync(SyncResponse),
    Async(AsyncResponse),
}

impl Payload {
    pub fn maintenance(&self) -> Option<&Maintenance> {
        match self {
            Self::Sync(sync) => sync.maintenance.as_ref(),
            Self::Async(async_) => async_.maintenance.as_ref(),
        }
    }
}

/// Decode an envelope. Daemon errors come back as [`Error::Daemon`].
pub fn parse_envelope(content_type: Option<&str>, status_code: u16, body: &[u8]) -> Result<Payload> {
    match content_type {
        Some("application/json") => {}
        Some(other) => {
            return Err(Error::bad_response(format!(
                "expected application/json, got {other}"
            )));
        }
        None => return Err(Error::bad_response("response has no content type")),
    }

    let envelope: RawEnvelope = serde_json::from_slice(body)
        .map_err(|e| Error::bad_response(format!("invalid envelope: {e}")))?;
    let status_code = envelope.status_code.unwrap_or(status_code);

    match envelope.kind.as_str() {
        "sync" => Ok(Payload::Sync(SyncResponse {
            status_code,
            result: envelope.result,
            maintenance: envelope.maintenance,
            suggested_currency: envelope.suggested_currency,
        })),
        "async" => match envelope.change {
            Some(change) if !change.is_empty() => Ok(Payload::Async(AsyncResponse {
                change,
                status_code,
                maintenance: envelope.maintenance,
            })),
            _ => Err(Error::bad_response("async response without a change id")),
        },
        "error" => Err(daemon_error(status_code, envelope.result)),
        other => Err(Error::bad_response(format!("unknown response type {other:?}"))),
    }
}

/// Decode the envelope of a full HTTP response.
pub fn parse_response(response: &HttpResponse) -> Result<Payload> {
    parse_envelope(
        response.content_type().as_deref(),
        response.status_code,
        &response.body,
    )
}

/// Decode and insist on a sync reply.
pub fn expect_sync(response: &HttpResponse) -> Result<SyncResponse> {
    match parse_response(response)? {
        Payload::Sync(sync) => Ok(sync),
        Payload::Async(async_) => Err(Error::bad_response(format!(
            "expected a sync response, got change {}",
            async_.change
        ))),
    }
}

/// Decode and insist on an async reply.
pub fn expect_async(response: &HttpResponse) -> Result<AsyncResponse> {
    match parse_response(response)? {
        Payload::Async(async_) => Ok(async_),
        Payload::Sync(_) => Err(Error::bad_response(
            "expected an async response, got a sync one",
        )),
    }
}

fn daemon_error(status_code: u16, result: Value) -> Error {
    let parsed: ErrorResult = serde_json::from_value(result).unwrap_or(ErrorResult {
        kind: None,
        message: String::new(),
        value: None,
    });
    let kind = match parsed.kind.as_deref() {
        Some(kind) if !kind.is_empty() => ErrorKind::from_daemon_kind(kind),
        _ => ErrorKind::from_status_code(status_code),
    };
    Error::Daemon {
        kind,
        daemon_kind: parsed.kind.filter(|k| !k.is_empty()),
        message: parsed.message,
        status_code,
        value: parsed.value,
    }
}
