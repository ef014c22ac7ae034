//! Raw TCP console transport with telnet option filtering.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::channel::telnet::{TelnetFilter, escape};
use crate::error::TransportError;

const READ_CHUNK: usize = 4096;

/// Open the TCP connection within `timeout`.
pub(crate) async fn connect(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<TcpStream, TransportError> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
        .map_err(|source| TransportError::ConnectionFailed {
            host: host.to_string(),
            port,
            source,
        })?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Move bytes between the stream and the session until either side closes.
///
/// Inbound bytes pass through the telnet filter; negotiation replies are
/// written straight back. Closing the outbound queue shuts the stream down.
pub(crate) async fn pump<S>(
    stream: S,
    mut outbound: mpsc::Receiver<Bytes>,
    inbound: mpsc::UnboundedSender<Bytes>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut filter = TelnetFilter::new();
    let mut read_buf = BytesMut::with_capacity(READ_CHUNK);

    loop {
        tokio::select! {
            read = reader.read_buf(&mut read_buf) => {
                match read {
                    Ok(0) => {
                        debug!("Console closed by peer");
                        break;
                    }
                    Ok(n) => {
                        trace!("Read {} bytes", n);
                        let mut data = BytesMut::new();
                        let mut replies = BytesMut::new();
                        filter.feed(&read_buf, &mut data, &mut replies);
                        read_buf.clear();

                        if !replies.is_empty() && writer.write_all(&replies).await.is_err() {
                            break;
                        }
                        if !data.is_empty() && inbound.send(data.freeze()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("Console read failed: {}", e);
                        break;
                    }
                }
            }
            out = outbound.recv() => {
                match out {
                    Some(bytes) => {
                        if let Err(e) = writer.write_all(&escape(&bytes)).await {
                            debug!("Console write failed: {}", e);
                            break;
                        }
                    }
                    None => {
                        let _ = writer.shutdown().await;
                        break;
                    }
                }
            }
        }
    }
}
