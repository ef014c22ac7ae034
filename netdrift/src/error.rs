//! Error types for netdrift.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::diff::{Category, ProblemType};

/// Main error type for netdrift operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level errors (TCP, telnet, SSH)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Baseline loading errors
    #[error("Baseline error: {0}")]
    Baseline(#[from] BaselineError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Transport layer errors (connection, authentication, byte pump).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key not present in known_hosts (strict checking)
    #[error("Unknown host key for {host}:{port}")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// The byte pump stopped; the peer closed the connection
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while loading a baseline snapshot.
#[derive(Error, Debug)]
pub enum BaselineError {
    /// The snapshot source could not produce a snapshot
    #[error("Snapshot source failed: {0}")]
    Source(String),

    /// I/O error while reading a snapshot
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid TOML for `DriftConfig`
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A command produced no usable output.
///
/// Returned by the session layer instead of an I/O error; collectors
/// treat it as "skip this category for this device".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionFailure {
    /// Output shorter than the minimum plausible length
    #[error("'{command}' returned {len} bytes (expected at least {min})")]
    ShortOutput {
        command: String,
        len: usize,
        min: usize,
    },

    /// The command could not be written to the device
    #[error("'{command}' could not be sent: {reason}")]
    Io { command: String, reason: String },

    /// The shell could not be brought back to a known mode
    #[error("session reset failed")]
    Reset,
}

/// Categorised failure surfaced to the operator.
///
/// These are values, not errors: one device's failure is recorded and the
/// run continues with the remaining devices and problems.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Endpoint unreachable or connect timeout; the device is skipped
    #[error("{device}: connection failed: {reason}")]
    Connection { device: String, reason: String },

    /// One category of checks was skipped for the device
    #[error("{device}: {category} checks skipped: {reason}")]
    Collection {
        device: String,
        category: Category,
        reason: String,
    },

    /// No deterministic fix exists for the problem
    #[error("{device}: {problem} requires manual intervention: {reason}")]
    FixRejected {
        device: String,
        problem: ProblemType,
        reason: String,
    },

    /// The device did not accept the fix commands
    #[error("{device}: failed to apply fix for {problem}")]
    FixApply { device: String, problem: ProblemType },

    /// A scan worker stopped abnormally
    #[error("{device}: scan worker failed: {reason}")]
    Worker { device: String, reason: String },

    /// The run was cancelled before the device was fully scanned
    #[error("{device}: scan interrupted")]
    Interrupted { device: String },
}

impl Failure {
    /// Name of the device the failure belongs to.
    pub fn device(&self) -> &str {
        match self {
            Failure::Connection { device, .. }
            | Failure::Collection { device, .. }
            | Failure::FixRejected { device, .. }
            | Failure::FixApply { device, .. }
            | Failure::Worker { device, .. }
            | Failure::Interrupted { device } => device,
        }
    }
}

/// Result type alias using netdrift's Error.
pub type Result<T> = std::result::Result<T, Error>;
