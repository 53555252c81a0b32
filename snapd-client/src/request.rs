//! The contract shared by every request variant.
//!
//! A request knows how to describe itself as an [`HttpRequest`] and how to
//! turn the daemon's reply into its output. The client drives the rest:
//! connecting, encoding, reading, envelope decoding and, for replies that
//! name a change, polling that change until it is done.

use serde::de::DeserializeOwned;
use snapd_protocol::envelope::parse_response;
use snapd_protocol::types::Change;
use snapd_protocol::{Error, HttpRequest, HttpResponse, Payload, Result, SyncResponse};

/// Which daemon socket a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Snapd,
    Snapctl,
}

/// What a request made of the daemon's reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Done(T),
    /// The daemon started a change; the output comes from [`Request::complete`].
    Change(String),
}

/// A decoded reply as handed to [`Request::parse_response`].
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// A JSON envelope.
    Payload(Payload),
    /// Anything that is not JSON: icons, assertions, log streams.
    Raw(HttpResponse),
}

impl Response {
    /// Decode the envelope when the body is JSON.
    ///
    /// Daemon error envelopes come back as [`Error::Daemon`].
    pub fn decode(response: HttpResponse) -> Result<Self> {
        if response.content_type().as_deref() == Some("application/json") {
            parse_response(&response).map(Self::Payload)
        } else {
            Ok(Self::Raw(response))
        }
    }

    pub fn into_sync(self) -> Result<SyncResponse> {
        match self {
            Self::Payload(Payload::Sync(sync)) => Ok(sync),
            Self::Payload(Payload::Async(response)) => Err(Error::bad_response(format!(
                "expected a sync response, got change {}",
                response.change
            ))),
            Self::Raw(raw) => Err(unexpected_raw(&raw)),
        }
    }

    /// The change id of an async reply.
    pub fn into_change(self) -> Result<String> {
        match self {
            Self::Payload(Payload::Async(response)) => Ok(response.change),
            Self::Payload(Payload::Sync(_)) => Err(Error::bad_response(
                "expected an async response, got a sync one",
            )),
            Self::Raw(raw) => Err(unexpected_raw(&raw)),
        }
    }

    pub fn into_raw(self) -> Result<HttpResponse> {
        match self {
            Self::Raw(raw) => Ok(raw),
            Self::Payload(_) => Err(Error::bad_response(
                "expected a raw response, got a JSON envelope",
            )),
        }
    }
}

fn unexpected_raw(raw: &HttpResponse) -> Error {
    Error::bad_response(format!(
        "expected application/json, got {}",
        raw.content_type().as_deref().unwrap_or("no content type")
    ))
}

/// One daemon operation.
pub trait Request: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Short label used in logs and metrics.
    const NAME: &'static str;

    fn endpoint(&self) -> Endpoint {
        Endpoint::Snapd
    }

    /// Build the wire request. Must not depend on anything but `self`.
    fn generate(&self) -> Result<HttpRequest>;

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>>;

    /// Produce the output once the change named in the reply is done.
    fn complete(&self, change: &Change) -> Result<Self::Output> {
        Err(Error::bad_response(format!(
            "{} does not expect an async reply (change {})",
            Self::NAME,
            change.id
        )))
    }

    /// A chance to turn a daemon error into a regular output.
    fn recover(&self, error: Error) -> Result<Self::Output> {
        Err(error)
    }
}

/// Deserialize a sync result.
pub fn sync_result<T: DeserializeOwned>(response: Response) -> Result<Reply<T>> {
    response.into_sync()?.into_result().map(Reply::Done)
}

/// Deserialize a sync list result; `null` is an empty list.
pub fn sync_list<T: DeserializeOwned>(response: Response) -> Result<Reply<Vec<T>>> {
    response.into_sync()?.into_list().map(Reply::Done)
}

/// A sync reply whose result carries nothing of interest.
pub fn sync_unit(response: Response) -> Result<Reply<()>> {
    response.into_sync().map(|_| Reply::Done(()))
}

/// An async reply: hand the change id to the poller.
pub fn async_change<T>(response: Response) -> Result<Reply<T>> {
    response.into_change().map(Reply::Change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use snapd_protocol::ErrorKind;
    use snapd_protocol::http::ResponseDecoder;

    fn response(content_type: &str, body: &str) -> HttpResponse {
        let raw = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        ResponseDecoder::new()
            .feed(raw.as_bytes())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn json_is_decoded_and_other_types_are_raw() {
        let json = Response::decode(response(
            "application/json",
            r#"{"type":"sync","status-code":200,"result":[1,2]}"#,
        ))
        .unwrap();
        let Reply::Done(numbers) = sync_list::<u32>(json).unwrap() else {
            panic!("expected a result");
        };
        assert_eq!(numbers, vec![1, 2]);

        let raw = Response::decode(response("image/png", "PNG")).unwrap();
        assert_eq!(raw.into_raw().unwrap().body, Bytes::from_static(b"PNG"));
    }

    #[test]
    fn shape_mismatches_are_bad_responses() {
        let raw = Response::decode(response("text/plain", "hi")).unwrap();
        assert_eq!(
            sync_unit(raw).unwrap_err().kind(),
            ErrorKind::BadResponse
        );

        let sync = Response::decode(response(
            "application/json",
            r#"{"type":"sync","status-code":200,"result":null}"#,
        ))
        .unwrap();
        assert_eq!(
            async_change::<()>(sync).unwrap_err().kind(),
            ErrorKind::BadResponse
        );
    }

    #[test]
    fn errors_surface_from_decode() {
        let err = Response::decode(response(
            "application/json",
            r#"{"type":"error","status-code":404,"result":{"kind":"snap-not-found","message":"snap not found"}}"#,
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
