//! `show ip interface brief`.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

static INTERFACE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z-]*\d+(?:/\d+)*(?:\.\d+)?$").expect("interface name regex is valid")
});

/// Line state in the `Status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Up,
    Down,
    AdministrativelyDown,
}

/// One row of the interface table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceStatus {
    pub name: String,
    /// `None` for `unassigned`.
    pub address: Option<Ipv4Addr>,
    pub status: LinkStatus,
    pub protocol: String,
    /// The row as printed.
    pub line: String,
}

impl InterfaceStatus {
    pub fn is_admin_down(&self) -> bool {
        self.status == LinkStatus::AdministrativelyDown
    }

    /// `up/up`, `administratively down/down`, ...
    pub fn state_label(&self) -> String {
        let status = match self.status {
            LinkStatus::Up => "up",
            LinkStatus::Down => "down",
            LinkStatus::AdministrativelyDown => "administratively down",
        };
        format!("{}/{}", status, self.protocol)
    }
}

/// Parse the interface table. Header and unrelated lines are skipped.
///
/// ```text
/// Interface              IP-Address      OK? Method Status                Protocol
/// Ethernet0/0            10.1.1.1        YES NVRAM  up                    up
/// Ethernet0/1            unassigned      YES NVRAM  administratively down down
/// ```
pub fn parse_interface_brief(text: &str) -> Vec<InterfaceStatus> {
    text.lines().filter_map(parse_row).collect()
}

fn parse_row(line: &str) -> Option<InterfaceStatus> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 6 || !INTERFACE_NAME.is_match(fields[0]) {
        return None;
    }

    let (status, protocol) = match fields[4] {
        "administratively" if fields.get(5) == Some(&"down") => {
            (LinkStatus::AdministrativelyDown, fields.get(6).copied()?)
        }
        "up" => (LinkStatus::Up, fields[5]),
        "down" => (LinkStatus::Down, fields[5]),
        _ => return None,
    };

    Some(InterfaceStatus {
        name: fields[0].to_string(),
        address: fields[1].parse().ok(),
        status,
        protocol: protocol.to_string(),
        line: line.trim_end().to_string(),
    })
}
