//! SSH shell transport using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use log::{debug, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;
use tokio::sync::mpsc;

use super::config::{AuthMethod, Endpoint, HostKeyVerification, SshOptions};
use crate::error::TransportError;

/// An authenticated SSH connection with an interactive shell channel.
pub(crate) struct SshShell {
    session: Handle<SshHandler>,
    channel: Channel<Msg>,
}

impl SshShell {
    /// Connect, authenticate and open a PTY shell.
    pub(crate) async fn connect(
        endpoint: &Endpoint,
        options: &SshOptions,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: endpoint.host.clone(),
            port: endpoint.port,
            host_key_verification: options.host_key_verification.clone(),
            known_hosts_path: options.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        let mut session = tokio::time::timeout(
            timeout,
            client::connect(ssh_config, (endpoint.host.as_str(), endpoint.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
        .map_err(|e| {
            // Prefer the detailed host-key error over russh's generic one
            let stored = host_key_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            stored.unwrap_or(TransportError::Ssh(e))
        })?;

        authenticate(&mut session, options).await?;

        let channel = session.channel_open_session().await?;
        channel
            .request_pty(
                true,
                "vt100",
                options.terminal_width,
                options.terminal_height,
                0,
                0,
                &[],
            )
            .await?;
        channel.request_shell(true).await?;

        Ok(Self { session, channel })
    }

    /// Byte pump between the shell channel and the session queues.
    pub(crate) async fn pump(
        mut self,
        mut outbound: mpsc::Receiver<Bytes>,
        inbound: mpsc::UnboundedSender<Bytes>,
    ) {
        loop {
            tokio::select! {
                msg = self.channel.wait() => {
                    match msg {
                        Some(ChannelMsg::Data { data })
                        | Some(ChannelMsg::ExtendedData { data, .. }) => {
                            if inbound.send(Bytes::copy_from_slice(&data)).is_err() {
                                break;
                            }
                        }
                        Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                            debug!("SSH shell closed by peer");
                            break;
                        }
                        Some(_) => {}
                    }
                }
                out = outbound.recv() => {
                    match out {
                        Some(bytes) => {
                            if let Err(e) = self.channel.data(&bytes[..]).await {
                                debug!("SSH write failed: {}", e);
                                break;
                            }
                        }
                        None => {
                            let _ = self.channel.eof().await;
                            break;
                        }
                    }
                }
            }
        }

        if let Err(e) = self
            .session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
        {
            debug!("SSH disconnect failed: {}", e);
        }
    }
}

/// Authenticate with the server.
async fn authenticate(
    session: &mut Handle<SshHandler>,
    options: &SshOptions,
) -> Result<(), TransportError> {
    let success = match &options.auth {
        AuthMethod::None => session
            .authenticate_none(&options.username)
            .await?
            .success(),
        AuthMethod::Password(password) => session
            .authenticate_password(&options.username, password.expose_secret())
            .await?
            .success(),
        AuthMethod::PrivateKey { path, passphrase } => {
            let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                .map_err(|e| TransportError::Key(e.to_string()))?;

            // Get the best RSA hash algorithm supported by the server
            let hash_alg = session.best_supported_rsa_hash().await?.flatten();

            session
                .authenticate_publickey(
                    &options.username,
                    PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                )
                .await?
                .success()
        }
    };

    if !success {
        return Err(TransportError::AuthenticationFailed {
            user: options.username.clone(),
        });
    }

    Ok(())
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// `Ok(true)` if matched, `Ok(false)` if the host is unknown.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> Result<bool, TransportError> {
        let result = match &self.known_hosts_path {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, pubkey),
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    fn learn_host_key(&self, pubkey: &PublicKey) -> Result<(), TransportError> {
        let result = match &self.known_hosts_path {
            Some(path) => russh::keys::known_hosts::learn_known_hosts_path(
                &self.host, self.port, pubkey, path,
            ),
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey),
        };
        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        *self
            .host_key_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let accepted = match self.host_key_verification {
            HostKeyVerification::Disabled => true,
            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    true
                }
                Err(e) => self.reject(e),
            },
            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                }),
                Err(e) => self.reject(e),
            },
        };
        Ok(accepted)
    }
}
