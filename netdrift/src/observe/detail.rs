//! Per-interface protocol detail and process summaries.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

static EIGRP_HELLO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Hello[- ]interval[- ]is\s+(\d+)").expect("eigrp hello regex is valid")
});

static EIGRP_HOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Hold[- ]time[- ]is\s+(\d+)").expect("eigrp hold regex is valid")
});

static OSPF_HELLO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bHello\s+(\d+)").expect("ospf hello regex is valid"));

static OSPF_DEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bDead\s+(\d+)").expect("ospf dead regex is valid"));

static OSPF_AREA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bArea\s+(\d+(?:\.\d+){0,3})").expect("ospf area regex is valid"));

static ROUTER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Router ID|with ID)\s+(\d+\.\d+\.\d+\.\d+)").expect("router id regex is valid")
});

static OSPF_BRIEF_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\S+)\s+\d+\s+(\S+)\s+(\d+\.\d+\.\d+\.\d+)/\d+\s")
        .expect("ospf brief regex is valid")
});

/// Phrases meaning "the protocol does not run on this interface".
const NOT_RUNNING: [&str; 4] = ["not found", "not running", "not enabled", "Invalid input"];

/// Timers and area reported for one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDetail {
    pub hello: Option<u32>,
    /// EIGRP hold time or OSPF dead interval.
    pub hold: Option<u32>,
    pub area: Option<String>,
    /// The line the timers were read from.
    pub line: String,
}

impl InterfaceDetail {
    pub fn has_timers(&self) -> bool {
        self.hello.is_some() || self.hold.is_some()
    }
}

fn not_running(text: &str) -> bool {
    NOT_RUNNING.iter().any(|p| text.contains(p))
}

fn capture_u32(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text).and_then(|c| c[1].parse().ok())
}

fn timer_line(text: &str, re: &Regex) -> String {
    text.lines()
        .find(|l| re.is_match(l))
        .map(|l| l.trim().to_string())
        .unwrap_or_default()
}

/// `show ip eigrp interfaces detail <if>`; `None` when EIGRP does not run
/// on the interface.
pub fn parse_eigrp_interface_detail(text: &str) -> Option<InterfaceDetail> {
    if not_running(text) {
        return None;
    }
    let detail = InterfaceDetail {
        hello: capture_u32(&EIGRP_HELLO, text),
        hold: capture_u32(&EIGRP_HOLD, text),
        area: None,
        line: timer_line(text, &EIGRP_HELLO),
    };
    detail.has_timers().then_some(detail)
}

/// `show ip ospf interface <if>`; `None` when OSPF is not enabled on it.
pub fn parse_ospf_interface_detail(text: &str) -> Option<InterfaceDetail> {
    if not_running(text) {
        return None;
    }
    let detail = InterfaceDetail {
        hello: capture_u32(&OSPF_HELLO, text),
        hold: capture_u32(&OSPF_DEAD, text),
        area: OSPF_AREA.captures(text).map(|c| c[1].to_string()),
        line: timer_line(text, &OSPF_HELLO),
    };
    (detail.has_timers() || detail.area.is_some()).then_some(detail)
}

/// Router id from `show ip ospf`.
pub fn parse_router_id(text: &str) -> Option<Ipv4Addr> {
    ROUTER_ID.captures(text).and_then(|c| c[1].parse().ok())
}

/// One row of `show ip ospf interface brief`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OspfInterfaceRow {
    pub interface: String,
    pub area: String,
    pub address: Ipv4Addr,
}

/// Interfaces OSPF runs on, from `show ip ospf interface brief`.
pub fn parse_ospf_interface_brief(text: &str) -> Vec<OspfInterfaceRow> {
    text.lines()
        .filter_map(|line| {
            let caps = OSPF_BRIEF_ROW.captures(line)?;
            Some(OspfInterfaceRow {
                interface: caps[1].to_string(),
                area: caps[2].to_string(),
                address: caps[3].parse().ok()?,
            })
        })
        .collect()
}
