//! Neighbor and adjacency tables.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

static EIGRP_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+\s+(\d+\.\d+\.\d+\.\d+)\s+(\S+)").expect("eigrp neighbor regex is valid")
});

static OSPF_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(\d+\.\d+\.\d+\.\d+)\s+\d+\s+([A-Z0-9-]+(?:/\s*[A-Z-]+)?)\s+\S+\s+(\d+\.\d+\.\d+\.\d+)\s+(\S+)",
    )
    .expect("ospf neighbor regex is valid")
});

/// Which table layout a command prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborFormat {
    /// `show ip eigrp neighbors`
    Eigrp,
    /// `show ip ospf neighbor`
    Ospf,
}

/// One neighbor or adjacency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    /// Peer address (EIGRP) or neighbor router id (OSPF).
    pub id: Ipv4Addr,
    /// Peer interface address; equal to `id` for EIGRP.
    pub address: Ipv4Addr,
    pub interface: String,
    /// OSPF adjacency state (`FULL/DR`, `INIT/DROTHER`); `None` for EIGRP.
    pub state: Option<String>,
}

impl Neighbor {
    /// OSPF adjacency stuck before two-way.
    pub fn is_stuck(&self) -> bool {
        self.state
            .as_deref()
            .is_some_and(|s| s.starts_with("INIT") || s.starts_with("DOWN"))
    }
}

/// Parsed neighbor table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborTable {
    pub neighbors: Vec<Neighbor>,
}

impl NeighborTable {
    pub fn parse(format: NeighborFormat, text: &str) -> Self {
        let neighbors = match format {
            NeighborFormat::Eigrp => text.lines().filter_map(parse_eigrp_row).collect(),
            NeighborFormat::Ospf => text.lines().filter_map(parse_ospf_row).collect(),
        };
        Self { neighbors }
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Neighbors stuck in INIT or DOWN.
    pub fn stuck(&self) -> impl Iterator<Item = &Neighbor> {
        self.neighbors.iter().filter(|n| n.is_stuck())
    }
}

fn parse_eigrp_row(line: &str) -> Option<Neighbor> {
    let caps = EIGRP_ROW.captures(line)?;
    let address: Ipv4Addr = caps[1].parse().ok()?;
    Some(Neighbor {
        id: address,
        address,
        interface: caps[2].to_string(),
        state: None,
    })
}

fn parse_ospf_row(line: &str) -> Option<Neighbor> {
    let caps = OSPF_ROW.captures(line)?;
    Some(Neighbor {
        id: caps[1].parse().ok()?,
        address: caps[3].parse().ok()?,
        interface: caps[4].to_string(),
        state: Some(caps[2].split_whitespace().collect()),
    })
}
