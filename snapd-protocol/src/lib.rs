// SPDX-FileCopyrightText: 2025 snapd-rs contributors
// SPDX-License-Identifier: MIT

//! snapd REST wire protocol.
//!
//! This crate holds everything needed to talk to snapd that does not touch a
//! socket: building HTTP/1.1 requests, incrementally decoding responses,
//! unwrapping the JSON envelope snapd puts around every reply and the value
//! types the envelope results deserialize into.
//!
//! **Architecture**: This is the Protocol Layer. The `snapd-client` crate adds
//! the transport, the request variants, change polling and the client facade
//! on top of it.
//!
//! # Key Features
//!
//! - Request encoding with macaroon authorization and multipart uploads
//! - Response decoding across partial reads (`Content-Length`, chunked and
//!   connection-close framing)
//! - Envelope parsing with daemon error kinds mapped onto [`ErrorKind`]
//! - Typed records for snaps, changes, notices, interfaces and friends

pub mod envelope;
pub mod error;
pub mod http;
pub mod json_seq;
pub mod multipart;
pub mod timestamp;
pub mod types;

pub use envelope::{AsyncResponse, Payload, SyncResponse, parse_envelope};
pub use error::{Error, ErrorKind, IoErrorContext, Result};
pub use http::{Body, HttpRequest, HttpResponse, Method, RequestContext, ResponseDecoder};
pub use types::AuthData;
