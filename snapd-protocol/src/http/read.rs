use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{HttpResponse, ResponseDecoder};
use crate::error::{Error, IoErrorContext, Result};

const READ_BUFFER_SIZE: usize = 8192;

/// Read one response from `reader`, checking `cancel` before every read.
pub async fn read_response<R: AsyncRead + Unpin>(
    reader: &mut R,
    cancel: &CancellationToken,
) -> Result<HttpResponse> {
    let mut decoder = ResponseDecoder::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            read = reader.read(&mut buffer) => read,
        };
        let n = match read {
            Err(e) if decoder.is_pristine() && is_disconnect(&e) => {
                return Err(Error::ConnectionClosed);
            }
            other => other.read_context("failed to read response")?,
        };
        trace!(bytes = n, "read from daemon");

        if n == 0 {
            return decoder.finish();
        }
        if let Some(response) = decoder.feed(&buffer[..n])? {
            return Ok(response);
        }
    }
}

fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::time::Duration;

    #[test_log::test(tokio::test)]
    async fn reads_across_writes() {
        let mut mock = piecewise_reader(&[
            b"HTTP/1.1 200 OK\r\nContent-",
            b"Length: 5\r\n\r\nhel",
            b"lo",
        ]);
        let response = read_response(&mut mock, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(&response.body[..], b"hello");
    }

    #[test_log::test(tokio::test)]
    async fn reset_before_first_byte_is_connection_failure() {
        let (mut client, server) = tokio::io::duplex(64);
        drop(server);
        let err = read_response(&mut client, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    }

    #[test_log::test(tokio::test)]
    async fn cancellation_interrupts_a_pending_read() {
        let (mut client, _server) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let err = read_response(&mut client, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    /// A reader that hands out the given pieces one read at a time.
    fn piecewise_reader(pieces: &[&'static [u8]]) -> impl AsyncRead + Unpin {
        let (client, mut server) = tokio::io::duplex(1024);
        let pieces: Vec<&'static [u8]> = pieces.to_vec();
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            for piece in pieces {
                server.write_all(piece).await.unwrap();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        client
    }
}
