use bytes::Bytes;
use snapd_protocol::http::path_segment;
use snapd_protocol::{Body, Error, HttpRequest, Result};

use crate::request::{Reply, Request, Response, sync_unit};

const ASSERTION_CONTENT_TYPE: &str = "application/x.ubuntu.assertion";

/// `GET /v2/assertions/{type}`; each assertion is returned as its signed text.
#[derive(Debug, Clone)]
pub struct GetAssertions {
    pub assertion_type: String,
    /// Header filters such as `("snap-id", "...")`.
    pub params: Vec<(String, String)>,
    /// Ask the store instead of the local database.
    pub remote: bool,
}

impl GetAssertions {
    pub fn new(assertion_type: impl Into<String>) -> Self {
        Self {
            assertion_type: assertion_type.into(),
            params: Vec::new(),
            remote: false,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

impl Request for GetAssertions {
    type Output = Vec<String>;
    const NAME: &'static str = "get-assertions";

    fn generate(&self) -> Result<HttpRequest> {
        let mut request = HttpRequest::get(format!(
            "/v2/assertions/{}",
            path_segment(&self.assertion_type)
        ));
        for (key, value) in &self.params {
            request = request.query(key, value.clone());
        }
        Ok(request.query_opt("remote", self.remote.then_some("true")))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        let raw = response.into_raw()?;
        match raw.content_type().as_deref() {
            Some(ASSERTION_CONTENT_TYPE) => split_assertions(&raw.body).map(Reply::Done),
            other => Err(Error::bad_response(format!(
                "expected {ASSERTION_CONTENT_TYPE}, got {}",
                other.unwrap_or("no content type")
            ))),
        }
    }
}

/// `POST /v2/assertions`
#[derive(Debug, Clone)]
pub struct AddAssertions {
    pub assertions: Vec<String>,
}

impl Request for AddAssertions {
    type Output = ();
    const NAME: &'static str = "add-assertions";

    fn generate(&self) -> Result<HttpRequest> {
        let data = self.assertions.join("\n\n");
        Ok(HttpRequest::post("/v2/assertions").body(Body::Raw {
            content_type: ASSERTION_CONTENT_TYPE.to_string(),
            data: Bytes::from(data),
        }))
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_unit(response)
    }
}

/// Split a stream of assertions.
///
/// An assertion is a header block, an optional body of `body-length` bytes
/// and a signature, separated by blank lines. Assertions follow each other
/// separated by another blank line.
pub fn split_assertions(data: &[u8]) -> Result<Vec<String>> {
    let mut assertions = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        if data[pos] == b'\n' {
            pos += 1;
            continue;
        }
        let headers_end = find_blank_line(data, pos)
            .ok_or_else(|| Error::bad_response("assertion without signature"))?;
        let body_length = body_length(&data[pos..headers_end])?;

        let wrong_length = || Error::bad_response("assertion body has wrong length");
        let mut cursor = headers_end + 2;
        if body_length > 0 {
            cursor = cursor.checked_add(body_length).ok_or_else(wrong_length)?;
            let separator_end = cursor.checked_add(2).ok_or_else(wrong_length)?;
            if data.get(cursor..separator_end) != Some(b"\n\n".as_slice()) {
                return Err(wrong_length());
            }
            cursor = separator_end;
        }
        let end = find_blank_line(data, cursor).unwrap_or(data.len());
        let text = std::str::from_utf8(&data[pos..end])
            .map_err(|_| Error::bad_response("assertion is not UTF-8"))?;
        assertions.push(text.trim_end_matches('\n').to_string());
        pos = end;
    }
    Ok(assertions)
}

fn find_blank_line(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(2)
        .position(|window| window == b"\n\n")
        .map(|offset| from + offset)
}

fn body_length(headers: &[u8]) -> Result<usize> {
    let headers = String::from_utf8_lossy(headers);
    for line in headers.lines() {
        if let Some(value) = line.strip_prefix("body-length:") {
            return value
                .trim()
                .parse()
                .map_err(|_| Error::bad_response(format!("invalid body-length {value:?}")));
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapd_protocol::ErrorKind;

    const ACCOUNT: &str = "type: account\naccount-id: abc\ndisplay-name: Example\n\nSIGNATURE-ONE";
    const WITH_BODY: &str =
        "type: snap-declaration\nbody-length: 10\nsnap-name: hello\n\nbody\n\nbody\n\nSIGNATURE-TWO";

    #[test]
    fn splits_consecutive_assertions() {
        let stream = format!("{ACCOUNT}\n\n{WITH_BODY}\n");
        let assertions = split_assertions(stream.as_bytes()).unwrap();
        assert_eq!(assertions, vec![ACCOUNT.to_string(), WITH_BODY.to_string()]);
    }

    #[test]
    fn empty_stream() {
        assert!(split_assertions(b"").unwrap().is_empty());
    }

    #[test]
    fn missing_signature_is_rejected() {
        assert!(split_assertions(b"type: account\n").is_err());
    }

    #[test]
    fn oversized_body_length_is_rejected() {
        let err = split_assertions(b"type: account\nbody-length: 18446744073709551615\n\nsig")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadResponse);
    }

    #[test]
    fn short_body_is_rejected() {
        assert!(split_assertions(b"type: account\nbody-length: 40\n\nbody\n\nsig").is_err());
    }

    #[test]
    fn request_carries_filters() {
        let request = GetAssertions::new("account")
            .param("account-id", "abc")
            .generate()
            .unwrap();
        assert_eq!(request.target(), "/v2/assertions/account?account-id=abc");
    }

    #[test]
    fn adding_joins_with_blank_lines() {
        let request = AddAssertions {
            assertions: vec!["a".into(), "b".into()],
        }
        .generate()
        .unwrap();
        let Body::Raw { content_type, data } = request.body else {
            panic!("expected a raw body");
        };
        assert_eq!(content_type, ASSERTION_CONTENT_TYPE);
        assert_eq!(&data[..], b"a\n\nb");
    }
}
