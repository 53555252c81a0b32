// SPDX-FileCopyrightText: 2025 snapd-rs contributors
// SPDX-License-Identifier: MIT

//! Test utilities for snapd-rs.
//!
//! [`MockDaemon`] stands in for snapd: it accepts connections on a unix
//! socket, records each request and answers with whatever the handler
//! returns for it. One request per connection, like snapd.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use percent_encoding::percent_decode_str;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A request as the mock daemon received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    /// Request target exactly as sent, query string included.
    pub target: String,
    /// Percent-decoded path.
    pub path: String,
    /// Percent-decoded query parameters, in order.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body parsed as JSON; `Null` when it is not JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status_code: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    /// Without `Content-Length` the body ends when the connection closes.
    pub content_length: bool,
    split_points: Vec<usize>,
    pause: Duration,
}

impl MockResponse {
    pub fn new(status_code: u16, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            content_type: content_type.map(str::to_string),
            body: body.into(),
            content_length: true,
            split_points: Vec::new(),
            pause: Duration::ZERO,
        }
    }

    pub fn json(status_code: u16, value: Value) -> Self {
        Self::new(status_code, Some("application/json"), value.to_string())
    }

    /// `{"type": "sync", ...}` around `result`.
    pub fn sync(result: Value) -> Self {
        Self::json(
            200,
            json!({"type": "sync", "status-code": 200, "status": "OK", "result": result}),
        )
    }

    /// `{"type": "async", "change": id}`
    pub fn async_change(id: &str) -> Self {
        Self::json(
            202,
            json!({"type": "async", "status-code": 202, "status": "Accepted", "change": id}),
        )
    }

    pub fn error(status_code: u16, kind: Option<&str>, message: &str) -> Self {
        let mut result = json!({ "message": message });
        if let Some(kind) = kind {
            result["kind"] = kind.into();
        }
        Self::json(
            status_code,
            json!({"type": "error", "status-code": status_code, "result": result}),
        )
    }

    pub fn without_content_length(mut self) -> Self {
        self.content_length = false;
        self
    }

    /// Write the encoded response in pieces cut at `points`, sleeping
    /// `pause` between writes.
    pub fn split_at(mut self, points: impl IntoIterator<Item = usize>, pause: Duration) -> Self {
        self.split_points = points.into_iter().collect();
        self.split_points.sort_unstable();
        self.pause = pause;
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status_code,
            reason(self.status_code)
        )
        .into_bytes();
        if let Some(content_type) = &self.content_type {
            out.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        if self.content_length {
            out.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }

    fn pieces(&self) -> Vec<Vec<u8>> {
        let encoded = self.encode();
        let mut pieces = Vec::new();
        let mut start = 0;
        for &point in &self.split_points {
            let point = point.min(encoded.len());
            if point > start {
                pieces.push(encoded[start..point].to_vec());
                start = point;
            }
        }
        pieces.push(encoded[start..].to_vec());
        pieces
    }
}

fn reason(status_code: u16) -> &'static str {
    match status_code {
        200 => "OK",
        202 => "Accepted",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

type Handler = dyn Fn(&RecordedRequest) -> MockResponse + Send + Sync;

/// A scripted snapd. Stops serving when dropped.
pub struct MockDaemon {
    address: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
    _dir: Option<TempDir>,
}

impl MockDaemon {
    /// Listen on a socket file in a fresh temporary directory.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(handler: F) -> io::Result<Self>
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("snapd.socket");
        let listener = UnixListener::bind(&path)?;
        Ok(Self::serve(
            listener,
            path.display().to_string(),
            Some(dir),
            Arc::new(handler),
        ))
    }

    /// Listen on `@name` in the abstract namespace.
    #[cfg(target_os = "linux")]
    pub fn start_abstract<F>(name: &str, handler: F) -> io::Result<Self>
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        use std::os::linux::net::SocketAddrExt;
        use std::os::unix::net::{SocketAddr, UnixListener as StdUnixListener};

        let address = SocketAddr::from_abstract_name(name.as_bytes())?;
        let listener = StdUnixListener::bind_addr(&address)?;
        listener.set_nonblocking(true)?;
        let listener = UnixListener::from_std(listener)?;
        Ok(Self::serve(
            listener,
            format!("@{name}"),
            None,
            Arc::new(handler),
        ))
    }

    fn serve(
        listener: UnixListener,
        address: String,
        dir: Option<TempDir>,
        handler: Arc<Handler>,
    ) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        let task = tokio::spawn(async move {
            loop {
                let stream = match listener.accept().await {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        warn!("mock daemon stopped accepting: {e}");
                        return;
                    }
                };
                let handler = handler.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, handler, recorded).await {
                        debug!("mock daemon connection error: {e}");
                    }
                });
            }
        });
        Self {
            address,
            requests,
            task,
            _dir: dir,
        }
    }

    /// What to put into the client's `socket_path`.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of requests received for `path`.
    pub fn requests_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|request| request.path == path)
            .count()
    }
}

impl Drop for MockDaemon {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    handler: Arc<Handler>,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) -> io::Result<()> {
    let Some(request) = read_request(&mut stream).await? else {
        return Ok(());
    };
    recorded
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(request.clone());
    let response = handler(&request);

    for (i, piece) in response.pieces().iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(response.pause).await;
        }
        stream.write_all(piece).await?;
        stream.flush().await?;
    }
    stream.shutdown().await
}

async fn read_request(stream: &mut UnixStream) -> io::Result<Option<RecordedRequest>> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = memchr::memmem::find(&buffer, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();

    let length = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buffer[header_end + 4..].to_vec();
    while body.len() < length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "request body truncated",
            ));
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(length);

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, parse_query(query)),
        None => (target.as_str(), Vec::new()),
    };
    Ok(Some(RecordedRequest {
        method,
        path: decode(path),
        query,
        headers,
        body,
        target: target.clone(),
    }))
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode(key), decode(value)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}
