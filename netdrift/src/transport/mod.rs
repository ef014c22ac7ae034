//! Byte transports to device shells.
//!
//! Every transport runs as a background pump task that owns the connection.
//! The session talks to it through two channels: outbound writes and
//! inbound chunks. "Draining" the device means taking every chunk the pump
//! has delivered so far.

pub mod config;
mod ssh;
mod telnet;

use std::time::Duration;

use bytes::Bytes;
use log::{debug, trace, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use config::{AuthMethod, Endpoint, HostKeyVerification, SshOptions, TransportKind};

use crate::error::TransportError;

/// Outbound queue depth; a full queue means the pump is stuck on a write.
const OUTBOUND_DEPTH: usize = 32;

/// Handle to a running byte pump.
pub struct Transport {
    peer: String,
    outbound: mpsc::Sender<Bytes>,
    inbound: mpsc::UnboundedReceiver<Bytes>,
    pump: JoinHandle<()>,
}

impl Transport {
    /// Connect to the endpoint and start its pump.
    pub async fn connect(
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_DEPTH);
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        let pump = match &endpoint.kind {
            TransportKind::Telnet => {
                let stream = telnet::connect(&endpoint.host, endpoint.port, timeout).await?;
                tokio::spawn(telnet::pump(stream, out_rx, in_tx))
            }
            TransportKind::Ssh(options) => {
                let shell = ssh::SshShell::connect(endpoint, options, timeout).await?;
                tokio::spawn(shell.pump(out_rx, in_tx))
            }
        };

        debug!("Transport to {} started", endpoint.socket_addr());

        Ok(Self {
            peer: endpoint.socket_addr(),
            outbound: out_tx,
            inbound: in_rx,
            pump,
        })
    }

    /// Queue bytes for the device, waiting at most `timeout` for room.
    pub async fn send(&self, data: &[u8], timeout: Duration) -> Result<(), TransportError> {
        trace!("Sending {} bytes to {}", data.len(), self.peer);
        match tokio::time::timeout(timeout, self.outbound.send(Bytes::copy_from_slice(data))).await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(TransportError::Disconnected),
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }

    /// Take everything the pump has delivered so far without waiting.
    pub fn drain(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Ok(chunk) = self.inbound.try_recv() {
            out.extend_from_slice(&chunk);
        }
        if !out.is_empty() {
            trace!("Drained {} bytes from {}", out.len(), self.peer);
        }
        out
    }

    /// Whether the pump is still running.
    pub fn is_alive(&self) -> bool {
        !self.pump.is_finished()
    }

    /// Peer address, for logs.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Stop the pump gracefully: close the outbound queue and wait for the
    /// pump to flush and shut the connection. Aborts after `timeout`.
    pub async fn close(self, timeout: Duration) {
        let Transport {
            peer,
            outbound,
            inbound,
            mut pump,
        } = self;
        drop(outbound);
        drop(inbound);

        if tokio::time::timeout(timeout, &mut pump).await.is_err() {
            warn!("Transport to {} did not stop within {:?}, aborting", peer, timeout);
            pump.abort();
        }
        debug!("Transport to {} closed", peer);
    }

    /// Stop the pump immediately.
    pub fn abort(self) {
        self.pump.abort();
    }
}
