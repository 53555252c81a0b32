// SPDX-FileCopyrightText: 2025 snapd-rs contributors
// SPDX-License-Identifier: MIT

//! Unix socket connections to snapd.
//!
//! Every request opens its own connection; snapd closes it after replying.
//! Addresses starting with `@` live in the Linux abstract namespace.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use snapd_protocol::http::read_response;
use snapd_protocol::{Error, HttpResponse, IoErrorContext, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// The main snapd socket.
pub const SNAPD_SOCKET: &str = "/run/snapd.socket";

/// The socket snapd exposes inside snap sandboxes for snapctl.
pub const SNAPD_SNAP_SOCKET: &str = "/run/snapd-snap.socket";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SocketAddress {
    Path(PathBuf),
    /// Name in the abstract namespace, without the leading `@`.
    Abstract(String),
}

impl SocketAddress {
    pub fn parse(address: &str) -> Self {
        match address.strip_prefix('@') {
            Some(name) => Self::Abstract(name.to_string()),
            None => Self::Path(PathBuf::from(address)),
        }
    }
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Abstract(name) => write!(f, "@{name}"),
        }
    }
}

impl From<&str> for SocketAddress {
    fn from(address: &str) -> Self {
        Self::parse(address)
    }
}

#[derive(Debug)]
pub struct Connection {
    stream: UnixStream,
}

impl Connection {
    /// Connect, giving up after `timeout` (if any) or when `cancel` fires.
    pub async fn connect(
        address: &SocketAddress,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let connect = async {
            match address {
                SocketAddress::Path(path) => {
                    UnixStream::connect(path)
                        .await
                        .map_err(|source| Error::ConnectionFailed {
                            address: address.to_string(),
                            source,
                        })
                }
                SocketAddress::Abstract(name) => connect_abstract(name).await,
            }
        };
        let connect = async {
            match timeout {
                Some(timeout) => tokio::time::timeout(timeout, connect)
                    .await
                    .map_err(|_| Error::ConnectionFailed {
                        address: address.to_string(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            "timed out connecting",
                        ),
                    })?,
                None => connect.await,
            }
        };

        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            stream = connect => stream?,
        };
        trace!(%address, "connected");
        Ok(Self { stream })
    }

    pub async fn send(&mut self, data: &[u8], cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            written = self.stream.write_all(data) => {
                written.write_context("failed to write request")
            }
        }
    }

    /// One read. `Ok(0)` means the daemon closed the connection.
    pub async fn receive(&mut self, buffer: &mut [u8], cancel: &CancellationToken) -> Result<usize> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            read = self.stream.read(buffer) => read.read_context("failed to read response"),
        }
    }

    /// Read a complete response, however many reads it takes.
    pub async fn read_response(&mut self, cancel: &CancellationToken) -> Result<HttpResponse> {
        read_response(&mut self.stream, cancel).await
    }
}

#[cfg(target_os = "linux")]
async fn connect_abstract(name: &str) -> Result<UnixStream> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    use socket2::{Domain, SockAddr, Socket, Type};

    let address = format!("@{name}");
    let failed = |source: std::io::Error| Error::ConnectionFailed {
        address: address.clone(),
        source,
    };

    let socket = Socket::new(Domain::UNIX, Type::STREAM, None).map_err(failed)?;
    socket.set_nonblocking(true).map_err(failed)?;
    let mut raw = Vec::with_capacity(name.len() + 1);
    raw.push(0u8);
    raw.extend_from_slice(name.as_bytes());
    let sockaddr = SockAddr::unix(OsStr::from_bytes(&raw)).map_err(failed)?;

    match socket.connect(&sockaddr) {
        Ok(()) => {}
        // EINPROGRESS (115 on Linux): `ErrorKind::InProgress` is unstable.
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.raw_os_error() == Some(115) => {}
        Err(e) => return Err(failed(e)),
    }

    let stream = UnixStream::from_std(socket.into()).map_err(failed)?;
    stream.writable().await.map_err(failed)?;
    if let Some(e) = stream.take_error().map_err(failed)? {
        return Err(failed(e));
    }
    Ok(stream)
}

#[cfg(not(target_os = "linux"))]
async fn connect_abstract(name: &str) -> Result<UnixStream> {
    Err(Error::UnsupportedPlatform(format!("@{name}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapd_protocol::ErrorKind;
    use std::path::Path;

    #[test]
    fn parses_addresses() {
        assert_eq!(
            SocketAddress::parse("/run/snapd.socket"),
            SocketAddress::Path(PathBuf::from("/run/snapd.socket"))
        );
        assert_eq!(
            SocketAddress::parse("@snapd-test"),
            SocketAddress::Abstract("snapd-test".into())
        );
        assert_eq!(SocketAddress::parse("@snapd-test").to_string(), "@snapd-test");
    }

    #[test_log::test(tokio::test)]
    async fn missing_socket_is_connection_failure() {
        let address = SocketAddress::Path(Path::new("/nonexistent/snapd.socket").to_path_buf());
        let err = Connection::connect(&address, None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
        assert!(err.to_string().contains("/nonexistent/snapd.socket"));
    }

    #[test_log::test(tokio::test)]
    async fn cancelled_before_connect() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let address = SocketAddress::parse("/nonexistent/snapd.socket");
        let err = Connection::connect(&address, None, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[cfg(target_os = "linux")]
    #[test_log::test(tokio::test)]
    async fn abstract_socket_round_trip() {
        use std::os::linux::net::SocketAddrExt;

        let name = format!("snapd-rs-transport-{}", std::process::id());
        let addr = std::os::unix::net::SocketAddr::from_abstract_name(name.as_bytes()).unwrap();
        let listener = std::os::unix::net::UnixListener::bind_addr(&addr).unwrap();
        listener.set_nonblocking(true).unwrap();
        let listener = tokio::net::UnixListener::from_std(listener).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).await.unwrap();
            stream.write_all(&buf).await.unwrap();
        });

        let cancel = CancellationToken::new();
        let mut connection = Connection::connect(
            &SocketAddress::parse(&format!("@{name}")),
            Some(Duration::from_secs(5)),
            &cancel,
        )
        .await
        .unwrap();
        connection.send(b"ping", &cancel).await.unwrap();
        let mut buf = [0u8; 4];
        let mut filled = 0;
        while filled < buf.len() {
            let n = connection.receive(&mut buf[filled..], &cancel).await.unwrap();
            assert_ne!(n, 0);
            filled += n;
        }
        assert_eq!(&buf, b"ping");
        server.await.unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test_log::test(tokio::test)]
    async fn unbound_abstract_socket_fails() {
        let address = SocketAddress::parse("@snapd-rs-nobody-listens-here");
        let err = Connection::connect(&address, None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    }
}
