// SPDX-FileCopyrightText: 2025 snapd-rs contributors
// SPDX-License-Identifier: MIT

use bytes::{Buf, Bytes, BytesMut};
use memchr::memmem;

use crate::error::{Error, Result};

/// Upper bound for the status line plus headers.
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Case-insensitive header list, in wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, name: String, value: String) {
        self.0.push((name, value));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Media type of the body, lowercased and without parameters.
    pub fn content_type(&self) -> Option<String> {
        self.header("Content-Type").map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk {
    /// Waiting for a `<hex-size>[;ext]\r\n` line.
    Size,
    /// Inside chunk data with this many bytes left.
    Data(usize),
    /// Expecting the CRLF that closes a chunk.
    DataEnd,
    /// After the zero chunk, skipping trailers until an empty line.
    Trailers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StatusLine,
    Headers,
    Length(usize),
    Chunked(Chunk),
    UntilEof,
    Done,
}

/// Incremental HTTP/1.1 response parser.
///
/// Feed it whatever each read returned; it makes no assumption about where
/// reads split the stream. Call [`ResponseDecoder::finish`] on end of stream.
#[derive(Debug)]
pub struct ResponseDecoder {
    buffer: BytesMut,
    state: State,
    received: usize,
    status_code: u16,
    reason: String,
    headers: Headers,
    body: BytesMut,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            state: State::StatusLine,
            received: 0,
            status_code: 0,
            reason: String::new(),
            headers: Headers::default(),
            body: BytesMut::new(),
        }
    }

    /// True until the first byte arrives.
    pub fn is_pristine(&self) -> bool {
        self.received == 0
    }

    /// Append `data` and advance. Returns the response once it is complete.
    pub fn feed(&mut self, data: &[u8]) -> Result<Option<HttpResponse>> {
        if self.state == State::Done {
            return Ok(None);
        }
        self.received += data.len();
        self.buffer.extend_from_slice(data);

        loop {
            let progressed = match self.state {
                State::StatusLine => self.parse_status_line()?,
                State::Headers => self.parse_header_line()?,
                State::Length(remaining) => {
                    let take = remaining.min(self.buffer.len());
                    self.body.extend_from_slice(&self.buffer.split_to(take));
                    self.state = if remaining == take {
                        State::Done
                    } else {
                        State::Length(remaining - take)
                    };
                    take > 0
                }
                State::Chunked(chunk) => self.parse_chunked(chunk)?,
                State::UntilEof => {
                    let rest = self.buffer.split();
                    self.body.extend_from_slice(&rest);
                    false
                }
                State::Done => return Ok(Some(self.take_response())),
            };
            if !progressed {
                return Ok(None);
            }
        }
    }

    /// Signal end of stream.
    pub fn finish(mut self) -> Result<HttpResponse> {
        match self.state {
            State::Done | State::UntilEof => Ok(self.take_response()),
            State::StatusLine if self.received == 0 => Err(Error::ConnectionClosed),
            State::StatusLine | State::Headers => Err(Error::Truncated(
                "connection closed while reading headers".to_string(),
            )),
            State::Length(remaining) => Err(Error::Truncated(format!(
                "connection closed with {remaining} body bytes outstanding"
            ))),
            State::Chunked(_) => Err(Error::Truncated(
                "connection closed inside chunked body".to_string(),
            )),
        }
    }

    fn take_response(&mut self) -> HttpResponse {
        self.state = State::Done;
        HttpResponse {
            status_code: self.status_code,
            reason: std::mem::take(&mut self.reason),
            headers: std::mem::take(&mut self.headers),
            body: std::mem::take(&mut self.body).freeze(),
        }
    }

    fn next_line(&mut self) -> Result<Option<Bytes>> {
        match memmem::find(&self.buffer, b"\r\n") {
            Some(end) => {
                let line = self.buffer.split_to(end).freeze();
                self.buffer.advance(2);
                Ok(Some(line))
            }
            None if self.buffer.len() > MAX_HEAD_SIZE => {
                Err(Error::bad_response("response head too large"))
            }
            None => Ok(None),
        }
    }

    fn parse_status_line(&mut self) -> Result<bool> {
        let Some(line) = self.next_line()? else {
            return Ok(false);
        };
        let line = std::str::from_utf8(&line)
            .map_err(|_| Error::bad_response("status line is not UTF-8"))?;
        let mut parts = line.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("HTTP/1.") {
            return Err(Error::bad_response(format!("unexpected status line: {line}")));
        }
        self.status_code = parts
            .next()
            .and_then(|code| code.parse().ok())
            .ok_or_else(|| Error::bad_response(format!("invalid status code in: {line}")))?;
        self.reason = parts.next().unwrap_or_default().to_string();
        self.state = State::Headers;
        Ok(true)
    }

    fn parse_header_line(&mut self) -> Result<bool> {
        let Some(line) = self.next_line()? else {
            return Ok(false);
        };
        if line.is_empty() {
            self.state = self.body_state()?;
            return Ok(true);
        }
        let line =
            std::str::from_utf8(&line).map_err(|_| Error::bad_response("header is not UTF-8"))?;
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::bad_response(format!("malformed header: {line}")))?;
        self.headers
            .push(name.trim().to_string(), value.trim().to_string());
        Ok(true)
    }

    fn body_state(&self) -> Result<State> {
        if matches!(self.status_code, 100..=199 | 204 | 304) {
            return Ok(State::Done);
        }
        if let Some(encoding) = self.headers.get("Transfer-Encoding") {
            if encoding.to_ascii_lowercase().contains("chunked") {
                return Ok(State::Chunked(Chunk::Size));
            }
        }
        match self.headers.get("Content-Length") {
            Some(length) => {
                let length: usize = length
                    .parse()
                    .map_err(|_| Error::bad_response(format!("invalid Content-Length: {length}")))?;
                Ok(if length == 0 {
                    State::Done
                } else {
                    State::Length(length)
                })
            }
            None => Ok(State::UntilEof),
        }
    }

    fn parse_chunked(&mut self, chunk: Chunk) -> Result<bool> {
        match chunk {
            Chunk::Size => {
                let Some(line) = self.next_line()? else {
                    return Ok(false);
                };
                let line = std::str::from_utf8(&line)
                    .map_err(|_| Error::bad_response("chunk size is not UTF-8"))?;
                let size = line.split(';').next().unwrap_or_default().trim();
                let size = usize::from_str_radix(size, 16)
                    .map_err(|_| Error::bad_response(format!("invalid chunk size: {line}")))?;
                self.state = State::Chunked(if size == 0 {
                    Chunk::Trailers
                } else {
                    Chunk::Data(size)
                });
                Ok(true)
            }
            Chunk::Data(remaining) => {
                let take = remaining.min(self.buffer.len());
                if take == 0 {
                    return Ok(false);
                }
                self.body.extend_from_slice(&self.buffer.split_to(take));
                self.state = State::Chunked(if take == remaining {
                    Chunk::DataEnd
                } else {
                    Chunk::Data(remaining - take)
                });
                Ok(true)
            }
            Chunk::DataEnd => {
                if self.buffer.len() < 2 {
                    return Ok(false);
                }
                if &self.buffer[..2] != b"\r\n" {
                    return Err(Error::bad_response("chunk not terminated by CRLF"));
                }
                self.buffer.advance(2);
                self.state = State::Chunked(Chunk::Size);
                Ok(true)
            }
            Chunk::Trailers => {
                let Some(line) = self.next_line()? else {
                    return Ok(false);
                };
                if line.is_empty() {
                    self.state = State::Done;
                }
                Ok(true)
            }
        }
    }
}
