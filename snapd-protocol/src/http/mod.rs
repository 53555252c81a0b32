//! HTTP/1.1 framing as spoken by snapd over its unix socket.
//!
//! Requests are plain data ([`HttpRequest`]) that encode to a byte buffer in
//! one go. Responses are decoded incrementally by [`ResponseDecoder`] so the
//! transport can hand over whatever each socket read returned.

mod decoder;
mod read;

pub use decoder::{Headers, HttpResponse, ResponseDecoder};
pub use read::read_response;

use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::multipart::Multipart;
use crate::types::AuthData;

/// snapd ignores the host, but HTTP/1.1 requires the header.
pub const HOST_PLACEHOLDER: &str = "placeholder";

/// Everything except RFC 3986 unreserved characters gets escaped.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Method {
    #[display("GET")]
    Get,
    #[display("POST")]
    Post,
    #[display("PUT")]
    Put,
    #[display("DELETE")]
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Vec<u8>),
    Raw { content_type: String, data: Bytes },
    Multipart(Multipart),
}

/// Per-client settings that end up as headers on every request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_agent: Option<String>,
    pub allow_interaction: bool,
    pub auth: Option<AuthData>,
}

/// One logical operation against the daemon, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// Add a query parameter. Empty values are dropped rather than sent as `key=`.
    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.query.push((key.to_string(), value));
        }
        self
    }

    pub fn query_opt<V: Into<String>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Add a comma separated list parameter, skipped when the list is empty.
    pub fn query_list<S: AsRef<str>>(self, key: &str, values: &[S]) -> Self {
        let joined = values
            .iter()
            .map(AsRef::as_ref)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        self.query(key, joined)
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        let data = serde_json::to_vec(value)
            .map_err(|e| Error::bad_request(format!("failed to serialize request body: {e}")))?;
        self.body = Body::Json(data);
        Ok(self)
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// The request target: path plus percent-encoded query string.
    pub fn target(&self) -> String {
        let mut target = self.path.clone();
        for (i, (key, value)) in self.query.iter().enumerate() {
            target.push(if i == 0 { '?' } else { '&' });
            target.extend(utf8_percent_encode(key, QUERY_ENCODE_SET));
            target.push('=');
            target.extend(utf8_percent_encode(value, QUERY_ENCODE_SET));
        }
        target
    }

    /// Serialize the request line, headers and body.
    pub fn encode(&self, context: &RequestContext) -> Result<Vec<u8>> {
        if !self.path.starts_with('/') {
            return Err(Error::bad_request(format!(
                "request path must be absolute: {}",
                self.path
            )));
        }

        let (content_type, body) = match &self.body {
            Body::Empty => (None, Bytes::new()),
            Body::Json(data) => (
                Some("application/json".to_string()),
                Bytes::copy_from_slice(data),
            ),
            Body::Raw { content_type, data } => (Some(content_type.clone()), data.clone()),
            Body::Multipart(multipart) => {
                let (content_type, data) = multipart.encode();
                (Some(content_type), data)
            }
        };

        let mut headers: Vec<(&str, String)> = vec![("Host", HOST_PLACEHOLDER.to_string())];
        if let Some(user_agent) = &context.user_agent {
            headers.push(("User-Agent", user_agent.clone()));
        }
        headers.push(("Accept", "application/json".to_string()));
        if context.allow_interaction {
            headers.push(("X-Allow-Interaction", "true".to_string()));
        }
        if let Some(auth) = &context.auth {
            headers.push(("Authorization", authorization_header(auth)));
        }
        for (name, value) in &self.headers {
            headers.push((name.as_str(), value.clone()));
        }
        if let Some(content_type) = content_type {
            headers.push(("Content-Type", content_type));
        }
        if !body.is_empty() || self.method != Method::Get {
            headers.push(("Content-Length", body.len().to_string()));
        }

        let target = self.target();
        let mut out = Vec::with_capacity(256 + body.len());
        out.extend_from_slice(format!("{} {} HTTP/1.1\r\n", self.method, target).as_bytes());
        for (name, value) in headers {
            if value.contains(['\r', '\n']) || name.contains(['\r', '\n', ':']) {
                return Err(Error::bad_request(format!(
                    "header {name} contains a line break"
                )));
            }
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&body);
        Ok(out)
    }
}

/// `Macaroon root="...", discharge="..."` as expected by snapd.
pub fn authorization_header(auth: &AuthData) -> String {
    let mut value = format!("Macaroon root=\"{}\"", auth.macaroon);
    for discharge in &auth.discharges {
        value.push_str(&format!(", discharge=\"{discharge}\""));
    }
    value
}

/// Escape a value used as one path segment (snap names, change ids, ...).
pub fn path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, QUERY_ENCODE_SET).to_string()
}
