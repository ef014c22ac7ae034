//! Fallback signals scanned from protocol debug output in `show logging`.

use std::sync::LazyLock;

use regex::Regex;

use crate::baseline::RoutingProtocol;

static SUBNET_INTERFACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:on|for)\s+([A-Za-z][A-Za-z-]*\d+(?:/\d+)*(?:\.\d+)?)")
        .expect("subnet interface regex is valid")
});

/// What a log line says about a failing adjacency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSignal {
    /// EIGRP: K-value mismatch
    KValueMismatch,
    /// EIGRP: neighbor not on common subnet
    NotOnCommonSubnet { interface: Option<String> },
    /// Authentication failure or key mismatch
    Authentication,
    /// EIGRP: autonomous system mismatch
    AsMismatch,
    /// EIGRP: peer terminated because of stub configuration
    StubPeer,
    /// OSPF: hello interval mismatch
    HelloMismatch,
    /// OSPF: dead interval mismatch
    DeadMismatch,
    /// OSPF: area mismatch
    AreaMismatch,
    /// OSPF: netmask mismatch
    NetmaskMismatch,
    /// OSPF: duplicate router id
    DuplicateRouterId,
}

/// A signal and the log line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalLine {
    pub signal: LogSignal,
    pub line: String,
}

/// Scan log lines for known adjacency failure messages.
///
/// Each signal is reported once, at its first occurrence. Lines that match
/// nothing are ignored.
pub fn scan_log(protocol: RoutingProtocol, text: &str) -> Vec<SignalLine> {
    let mut found: Vec<SignalLine> = Vec::new();
    for line in text.lines() {
        let lower = line.to_lowercase();
        let signal = match protocol {
            RoutingProtocol::Eigrp => eigrp_signal(line, &lower),
            RoutingProtocol::Ospf => ospf_signal(&lower),
        };
        if let Some(signal) = signal {
            if !found.iter().any(|f| f.signal == signal) {
                found.push(SignalLine {
                    signal,
                    line: line.trim().to_string(),
                });
            }
        }
    }
    found
}

fn eigrp_signal(line: &str, lower: &str) -> Option<LogSignal> {
    if lower.contains("k-value mismatch") || lower.contains("k value mismatch") {
        Some(LogSignal::KValueMismatch)
    } else if lower.contains("not on common subnet") {
        let interface = SUBNET_INTERFACE.captures(line).map(|c| c[1].to_string());
        Some(LogSignal::NotOnCommonSubnet { interface })
    } else if lower.contains("authentication") && (lower.contains("fail") || lower.contains("mismatch"))
    {
        Some(LogSignal::Authentication)
    } else if lower.contains("as mismatch") || lower.contains("autonomous system") {
        Some(LogSignal::AsMismatch)
    } else if lower.contains("peer terminating") && lower.contains("stub") {
        Some(LogSignal::StubPeer)
    } else {
        None
    }
}

fn ospf_signal(lower: &str) -> Option<LogSignal> {
    if lower.contains("mismatched hello") || lower.contains("hello interval mismatch") {
        Some(LogSignal::HelloMismatch)
    } else if lower.contains("dead interval mismatch") || lower.contains("mismatched dead") {
        Some(LogSignal::DeadMismatch)
    } else if lower.contains("area mismatch") || lower.contains("mismatched area") {
        Some(LogSignal::AreaMismatch)
    } else if lower.contains("netmask mismatch") || lower.contains("mismatched netmask") {
        Some(LogSignal::NetmaskMismatch)
    } else if lower.contains("duplicate router") || lower.contains("duplicate rid") {
        Some(LogSignal::DuplicateRouterId)
    } else if lower.contains("authentication")
        && (lower.contains("mismatch") || lower.contains("fail"))
    {
        Some(LogSignal::Authentication)
    } else {
        None
    }
}
