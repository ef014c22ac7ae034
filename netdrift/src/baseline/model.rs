//! Structured known-good configuration of a device.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;

/// Routing protocols the checks understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingProtocol {
    Eigrp,
    Ospf,
}

impl RoutingProtocol {
    /// Upper-case label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            RoutingProtocol::Eigrp => "EIGRP",
            RoutingProtocol::Ospf => "OSPF",
        }
    }
}

impl fmt::Display for RoutingProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Known-good state of one device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    pub hostname: String,

    /// In configuration order.
    pub interfaces: IndexMap<String, InterfaceBaseline>,

    /// Present when the device participates in EIGRP.
    pub eigrp: Option<EigrpBaseline>,

    /// Present when the device participates in OSPF.
    pub ospf: Option<OspfBaseline>,
}

impl Baseline {
    /// A device with no recorded state. Every check passes against it.
    pub fn empty(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    /// Whether the device participates in `protocol`.
    pub fn runs(&self, protocol: RoutingProtocol) -> bool {
        match protocol {
            RoutingProtocol::Eigrp => self.eigrp.is_some(),
            RoutingProtocol::Ospf => self.ospf.is_some(),
        }
    }

    /// Look an interface up by name, accepting abbreviations.
    pub fn interface(&self, name: &str) -> Option<&InterfaceBaseline> {
        self.interfaces.get(name).or_else(|| {
            let key = canonical_interface(name);
            self.interfaces
                .values()
                .find(|i| canonical_interface(&i.name) == key)
        })
    }
}

/// Address and mask of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceAddress {
    pub ip: Ipv4Addr,
    pub mask: Ipv4Addr,
}

impl InterfaceAddress {
    pub fn new(ip: Ipv4Addr, mask: Ipv4Addr) -> Self {
        Self { ip, mask }
    }

    /// Prefix length of the mask (contiguous masks only).
    pub fn prefix_len(&self) -> u32 {
        u32::from(self.mask).leading_ones()
    }
}

impl fmt::Display for InterfaceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ip, self.mask)
    }
}

/// One interface stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceBaseline {
    pub name: String,
    pub address: Option<InterfaceAddress>,
    pub shutdown: bool,
    pub eigrp_hello: u32,
    pub eigrp_hold: u32,
    pub ospf_hello: u32,
    pub ospf_dead: u32,
}

impl InterfaceBaseline {
    /// Whether the interface is expected to be up: addressed and not shut.
    pub fn expected_up(&self) -> bool {
        self.address.is_some() && !self.shutdown
    }
}

/// EIGRP composite metric weights (`metric weights` line, TOS dropped).
///
/// # Example
///
/// ```rust
/// use netdrift::KValues;
///
/// let k: KValues = "0 1 0 1 0 0".parse().unwrap();
/// assert_eq!(k, KValues::default());
/// assert_eq!(k.to_string(), "0 1 0 1 0 0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct KValues(pub [u8; 6]);

impl Default for KValues {
    fn default() -> Self {
        Self([0, 1, 0, 1, 0, 0])
    }
}

impl fmt::Display for KValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{} {} {} {} {} {}", a, b, c, d, e, g)
    }
}

impl FromStr for KValues {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Vec<u8> = s
            .split_whitespace()
            .map(|v| v.parse::<u8>().map_err(|e| format!("invalid k-value '{}': {}", v, e)))
            .collect::<Result<_, _>>()?;
        let values: [u8; 6] = values
            .try_into()
            .map_err(|v: Vec<u8>| format!("expected 6 k-values, got {}", v.len()))?;
        Ok(Self(values))
    }
}

impl TryFrom<String> for KValues {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The `router eigrp` stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EigrpBaseline {
    pub as_number: u32,
    pub networks: Vec<Ipv4Addr>,
    pub passive_interfaces: Vec<String>,
    pub is_stub: bool,
    pub k_values: KValues,
}

impl EigrpBaseline {
    /// A stanza with no statements.
    pub fn new(as_number: u32) -> Self {
        Self {
            as_number,
            networks: Vec::new(),
            passive_interfaces: Vec::new(),
            is_stub: false,
            k_values: KValues::default(),
        }
    }
}

/// `network <address> <wildcard> area <area>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OspfNetwork {
    pub network: Ipv4Addr,
    pub wildcard: Ipv4Addr,
    pub area: String,
}

impl OspfNetwork {
    pub fn new(network: Ipv4Addr, wildcard: Ipv4Addr, area: impl Into<String>) -> Self {
        Self {
            network,
            wildcard,
            area: area.into(),
        }
    }

    /// Whether `ip` falls under this statement's wildcard.
    pub fn covers(&self, ip: Ipv4Addr) -> bool {
        let care = !u32::from(self.wildcard);
        u32::from(ip) & care == u32::from(self.network) & care
    }
}

impl fmt::Display for OspfNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} area {}", self.network, self.wildcard, self.area)
    }
}

/// The `router ospf` stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OspfBaseline {
    pub process_id: u32,
    pub networks: Vec<OspfNetwork>,
    pub passive_interfaces: Vec<String>,
    pub stub_areas: Vec<String>,
    pub router_id: Option<Ipv4Addr>,
}

impl OspfBaseline {
    pub fn new(process_id: u32) -> Self {
        Self {
            process_id,
            networks: Vec::new(),
            passive_interfaces: Vec::new(),
            stub_areas: Vec::new(),
            router_id: None,
        }
    }

    /// The network statement that enables OSPF on `ip`, if any.
    pub fn network_for(&self, ip: Ipv4Addr) -> Option<&OspfNetwork> {
        self.networks.iter().find(|n| n.covers(ip))
    }
}

const INTERFACE_TYPES: [&str; 9] = [
    "FastEthernet",
    "GigabitEthernet",
    "TenGigabitEthernet",
    "Ethernet",
    "Serial",
    "Loopback",
    "Tunnel",
    "Vlan",
    "Port-channel",
];

/// Expand an abbreviated interface name (`Gi0/1`, `Eth0/0`, `lo0`) to its
/// full form. Unknown prefixes are returned unchanged.
///
/// # Example
///
/// ```rust
/// use netdrift::baseline::canonical_interface;
///
/// assert_eq!(canonical_interface("Gi0/1"), "GigabitEthernet0/1");
/// assert_eq!(canonical_interface("Eth0/0"), "Ethernet0/0");
/// assert_eq!(canonical_interface("Serial1/0"), "Serial1/0");
/// ```
pub fn canonical_interface(name: &str) -> String {
    let split = name
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(name.len());
    let (prefix, rest) = name.split_at(split);
    if prefix.len() < 2 {
        return name.to_string();
    }
    let lower = prefix.to_ascii_lowercase();
    INTERFACE_TYPES
        .iter()
        .find(|full| full.to_ascii_lowercase().starts_with(&lower))
        .map(|full| format!("{}{}", full, rest))
        .unwrap_or_else(|| name.to_string())
}

/// Whether two interface names refer to the same interface.
pub fn same_interface(a: &str, b: &str) -> bool {
    a == b || canonical_interface(a) == canonical_interface(b)
}
