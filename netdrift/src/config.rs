//! Run configuration.
//!
//! Every threshold the scan depends on (settle times, timeouts, worker
//! count, debug windows, protocol defaults) is configuration. All sections
//! are optional in the TOML file; missing keys take the defaults below.
//!
//! ```toml
//! [session]
//! settle = "1s"
//! interface_settle = "1500ms"
//! enable_secret = "cisco"
//!
//! [scan]
//! max_workers = 6
//! ospf_debug_window = "10s"
//!
//! [defaults]
//! k_values = "0 1 0 1 0 0"
//!
//! [defaults.router_ids]
//! R4 = "4.4.4.4"
//!
//! [participation]
//! eigrp = ["R1", "R2", "R3"]
//! ospf = ["R4", "R5", "R6"]
//! ```

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::baseline::{KValues, RoutingProtocol};
use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub session: SessionPolicy,
    pub scan: ScanPolicy,
    pub defaults: ProtocolDefaults,
    pub participation: Participation,
}

impl DriftConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Timing and safety policy for one device session.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    /// TCP/SSH connect timeout; exceeding it skips the device.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Settle time for ordinary show commands.
    #[serde(with = "humantime_serde")]
    pub settle: Duration,

    /// Settle time for `show ip interface brief`.
    #[serde(with = "humantime_serde")]
    pub interface_settle: Duration,

    /// Settle time for per-interface protocol detail queries.
    #[serde(with = "humantime_serde")]
    pub detail_settle: Duration,

    /// Pause after each keystroke of the reset sequence.
    #[serde(with = "humantime_serde")]
    pub reset_settle: Duration,

    /// Pause after each configuration line.
    #[serde(with = "humantime_serde")]
    pub config_settle: Duration,

    /// Upper bound on reading `show running-config`.
    #[serde(with = "humantime_serde")]
    pub running_config_timeout: Duration,

    /// Bound on queueing a single write to the pump.
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,

    /// Bound on a graceful transport shutdown.
    #[serde(with = "humantime_serde")]
    pub close_timeout: Duration,

    /// Raw output shorter than this is treated as "no answer".
    pub min_output_len: usize,

    /// Send `persist_command` after every applied configuration.
    pub persist: bool,

    pub persist_command: String,

    /// Device replies that mark a configuration line as rejected.
    pub failed_when_contains: Vec<String>,

    /// Answer for an `enable` password prompt.
    #[serde(deserialize_with = "deserialize_secret")]
    pub enable_secret: Option<SecretString>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            settle: Duration::from_secs(1),
            interface_settle: Duration::from_millis(1500),
            detail_settle: Duration::from_secs(1),
            reset_settle: Duration::from_millis(100),
            config_settle: Duration::from_millis(300),
            running_config_timeout: Duration::from_secs(8),
            write_timeout: Duration::from_secs(5),
            close_timeout: Duration::from_secs(2),
            min_output_len: 50,
            persist: false,
            persist_command: "write memory".to_string(),
            failed_when_contains: vec![
                "% Invalid input".to_string(),
                "% Incomplete command".to_string(),
                "% Ambiguous command".to_string(),
            ],
            enable_secret: None,
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// Scan-wide policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanPolicy {
    /// Upper bound on concurrent device scans.
    pub max_workers: usize,

    #[serde(with = "humantime_serde")]
    pub eigrp_debug_window: Duration,

    #[serde(with = "humantime_serde")]
    pub ospf_debug_window: Duration,

    /// Pause between applying a fix and verifying it.
    #[serde(with = "humantime_serde")]
    pub verify_delay: Duration,

    pub check_interfaces: bool,
    pub check_eigrp: bool,
    pub check_ospf: bool,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            max_workers: 6,
            eigrp_debug_window: Duration::from_secs(5),
            ospf_debug_window: Duration::from_secs(10),
            verify_delay: Duration::from_secs(2),
            check_interfaces: true,
            check_eigrp: true,
            check_ospf: true,
        }
    }
}

/// Values assumed when a configuration line is absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProtocolDefaults {
    pub eigrp_hello: u32,
    pub eigrp_hold: u32,
    pub ospf_hello: u32,
    pub ospf_dead: u32,
    pub k_values: KValues,
    pub eigrp_as: u32,
    pub ospf_process: u32,
    /// Router id assumed for devices whose OSPF stanza has no `router-id`.
    pub router_ids: HashMap<String, Ipv4Addr>,
}

impl Default for ProtocolDefaults {
    fn default() -> Self {
        Self {
            eigrp_hello: 5,
            eigrp_hold: 15,
            ospf_hello: 10,
            ospf_dead: 40,
            k_values: KValues::default(),
            eigrp_as: 1,
            ospf_process: 10,
            router_ids: HashMap::new(),
        }
    }
}

impl ProtocolDefaults {
    /// Default router id for `device`, if one is configured.
    pub fn router_id(&self, device: &str) -> Option<Ipv4Addr> {
        self.router_ids
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(device))
            .map(|(_, id)| *id)
    }
}

/// Devices known to run a protocol even when their snapshot has no stanza.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Participation {
    pub eigrp: Vec<String>,
    pub ospf: Vec<String>,
}

impl Participation {
    /// Whether `device` is listed for `protocol`.
    pub fn lists(&self, protocol: RoutingProtocol, device: &str) -> bool {
        let devices = match protocol {
            RoutingProtocol::Eigrp => &self.eigrp,
            RoutingProtocol::Ospf => &self.ospf,
        };
        devices.iter().any(|d| d.eq_ignore_ascii_case(device))
    }
}
