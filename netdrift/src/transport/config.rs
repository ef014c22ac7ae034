//! Endpoint description for device connections.

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::SecretString;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For lab consoles only.
    Disabled,
}

/// Where a device's shell lives and how to reach it.
///
/// # Example
///
/// ```rust
/// use netdrift::Endpoint;
///
/// let console = Endpoint::telnet("192.168.56.10", 5001);
/// assert_eq!(console.socket_addr(), "192.168.56.10:5001");
/// ```
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Target host (hostname or IP address).
    pub host: String,

    /// TCP port of the console or SSH server.
    pub port: u16,

    /// Wire protocol spoken on the port.
    pub kind: TransportKind,
}

impl Endpoint {
    /// Raw TCP console with telnet option negotiation.
    pub fn telnet(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            kind: TransportKind::Telnet,
        }
    }

    /// SSH shell with the given options.
    pub fn ssh(host: impl Into<String>, port: u16, options: SshOptions) -> Self {
        Self {
            host: host.into(),
            port,
            kind: TransportKind::Ssh(Arc::new(options)),
        }
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Wire protocol of an endpoint.
#[derive(Debug, Clone)]
pub enum TransportKind {
    /// Unframed TCP stream; telnet IAC sequences are answered and stripped.
    Telnet,

    /// SSH PTY shell.
    Ssh(Arc<SshOptions>),
}

/// SSH-specific connection options.
#[derive(Debug)]
pub struct SshOptions {
    /// Username for authentication.
    pub username: String,

    /// Authentication method.
    pub auth: AuthMethod,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshOptions {
    /// Options with a 511 column terminal and accept-new host keys.
    pub fn new(username: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            username: username.into(),
            auth,
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Set the host key verification mode.
    pub fn with_host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a specific known_hosts file.
    pub fn with_known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }
}

/// Authentication method for SSH connections.
#[derive(Debug)]
pub enum AuthMethod {
    /// No authentication.
    None,

    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let endpoint = Endpoint::telnet("10.0.0.1", 5003);
        assert_eq!(endpoint.socket_addr(), "10.0.0.1:5003");
        assert!(matches!(endpoint.kind, TransportKind::Telnet));
    }

    #[test]
    fn test_ssh_endpoint_shares_options() {
        let options = SshOptions::new("admin", AuthMethod::Password("cisco".into()))
            .with_host_key_verification(HostKeyVerification::Disabled);
        let endpoint = Endpoint::ssh("r1.lab", 22, options);
        let copy = endpoint.clone();

        match (&endpoint.kind, &copy.kind) {
            (TransportKind::Ssh(a), TransportKind::Ssh(b)) => {
                assert!(Arc::ptr_eq(a, b));
                assert_eq!(a.username, "admin");
                assert_eq!(a.terminal_width, 511);
            }
            _ => panic!("expected ssh endpoints"),
        }
    }
}
