//! Structured snapshots of parsed command output.
//!
//! Parsers in this module never fail: unrecognised text yields empty
//! results and the checks downstream treat "nothing seen" as "nothing to
//! report".

mod debug;
mod detail;
mod interfaces;
mod neighbors;

use indexmap::IndexMap;
use std::net::Ipv4Addr;

pub use debug::{LogSignal, SignalLine, scan_log};
pub use detail::{
    InterfaceDetail, OspfInterfaceRow, parse_eigrp_interface_detail, parse_ospf_interface_brief,
    parse_ospf_interface_detail, parse_router_id,
};
pub use interfaces::{InterfaceStatus, LinkStatus, parse_interface_brief};
pub use neighbors::{Neighbor, NeighborFormat, NeighborTable};

use crate::baseline::{Baseline, InterfaceBaseline, RoutingProtocol};

/// Live configuration text and its parsed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningConfig {
    pub text: String,
    pub parsed: Baseline,
}

impl RunningConfig {
    pub fn new(text: String, parsed: Baseline) -> Self {
        Self { text, parsed }
    }

    /// The first configuration line starting with `statement`, trimmed.
    ///
    /// Used to quote the exact source line in a problem report.
    pub fn line(&self, statement: &str) -> Option<String> {
        self.text
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with(statement))
            .map(str::to_string)
    }

    /// The matching line, or `fallback` when the text has none.
    pub fn line_or(&self, statement: &str, fallback: impl Into<String>) -> String {
        self.line(statement).unwrap_or_else(|| fallback.into())
    }
}

/// What the interface collector saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceObservation {
    pub table: Vec<InterfaceStatus>,
    /// `show running-config interface <name>` for up interfaces, keyed by
    /// table name.
    pub configs: IndexMap<String, InterfaceBaseline>,
}

/// What a protocol collector saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolObservation {
    pub protocol: RoutingProtocol,
    pub running: RunningConfig,
    pub neighbors: NeighborTable,
    /// Per-interface detail keyed by baseline interface name. Interfaces
    /// the protocol does not run on are absent.
    pub interfaces: IndexMap<String, InterfaceDetail>,
    /// OSPF router id from `show ip ospf`.
    pub router_id: Option<Ipv4Addr>,
    /// OSPF participating interfaces; `None` when not queried.
    pub enabled_interfaces: Option<Vec<OspfInterfaceRow>>,
    /// Debug log captured by the zero-neighbor fallback.
    pub debug_log: Option<String>,
}

impl ProtocolObservation {
    /// An observation with only the running configuration filled in.
    pub fn new(protocol: RoutingProtocol, running: RunningConfig) -> Self {
        Self {
            protocol,
            running,
            neighbors: NeighborTable::default(),
            interfaces: IndexMap::new(),
            router_id: None,
            enabled_interfaces: None,
            debug_log: None,
        }
    }
}

/// One collector's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Interfaces(InterfaceObservation),
    Protocol(ProtocolObservation),
}
