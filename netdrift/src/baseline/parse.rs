//! Parsing configuration text into [`Baseline`]s.
//!
//! The same parser reads persisted snapshots and live `show running-config`
//! output, so a baseline and an observation are always compared field by
//! field with identical defaulting.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use indexmap::IndexMap;
use log::{debug, trace};
use regex::Regex;

use super::model::{
    Baseline, EigrpBaseline, InterfaceAddress, InterfaceBaseline, OspfBaseline, OspfNetwork,
};
use crate::config::ProtocolDefaults;

static DEVICE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DEVICE:\s+(\w+)").expect("device marker regex is valid"));

static IP_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ip address\s+(\d+\.\d+\.\d+\.\d+)\s+(\d+\.\d+\.\d+\.\d+)")
        .expect("ip address regex is valid")
});

static OSPF_NETWORK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^network\s+(\d+\.\d+\.\d+\.\d+)\s+(\d+\.\d+\.\d+\.\d+)\s+area\s+(\S+)")
        .expect("ospf network regex is valid")
});

static EIGRP_NETWORK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^network\s+(\d+\.\d+\.\d+\.\d+)").expect("eigrp network regex is valid")
});

static EIGRP_TIMER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ip (hello-interval|hold-time) eigrp\s+\d+\s+(\d+)")
        .expect("eigrp timer regex is valid")
});

static OSPF_TIMER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ip ospf (hello-interval|dead-interval)\s+(\d+)")
        .expect("ospf timer regex is valid")
});

static STUB_AREA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^area\s+(\S+)\s+stub\b").expect("stub area regex is valid"));

/// A top-level configuration statement and the lines under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stanza<'a> {
    pub header: &'a str,
    pub body: Vec<&'a str>,
}

/// Split configuration text into `interface` and `router` stanzas.
///
/// A stanza runs until a `!` line, the next `interface`/`router` header or
/// `end`. Body lines are returned trimmed.
pub fn stanzas(text: &str) -> Vec<Stanza<'_>> {
    let mut out = Vec::new();
    let mut current: Option<Stanza<'_>> = None;

    for line in text.lines() {
        let line = line.trim_end();
        let top_level = !line.starts_with(char::is_whitespace);

        if top_level && (line.starts_with("interface ") || line.starts_with("router ")) {
            out.extend(current.take());
            current = Some(Stanza {
                header: line,
                body: Vec::new(),
            });
            continue;
        }

        if top_level && (line.starts_with('!') || line == "end") {
            out.extend(current.take());
            continue;
        }

        if let Some(stanza) = current.as_mut() {
            let body = line.trim();
            if !body.is_empty() {
                stanza.body.push(body);
            }
        }
    }
    out.extend(current);
    out
}

/// Split a snapshot into `(device, config text)` blocks on `DEVICE:` markers.
pub fn split_devices(snapshot: &str) -> Vec<(String, &str)> {
    let markers: Vec<_> = DEVICE_MARKER.captures_iter(snapshot).collect();
    let mut out = Vec::with_capacity(markers.len());

    for (i, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(snapshot.len());
        out.push((name.as_str().to_string(), &snapshot[whole.end()..end]));
    }
    out
}

/// Parse one device's configuration text.
///
/// Absent values fall back to `defaults`. Protocol stanzas are only present
/// when the text contains them.
pub fn parse_config(hostname: &str, text: &str, defaults: &ProtocolDefaults) -> Baseline {
    let mut baseline = Baseline::empty(hostname);

    for stanza in stanzas(text) {
        let mut words = stanza.header.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("interface"), Some(name), _) => {
                let interface = parse_interface(name, &stanza.body, defaults);
                baseline.interfaces.insert(name.to_string(), interface);
            }
            (Some("router"), Some("eigrp"), Some(asn)) => match asn.parse() {
                Ok(as_number) => {
                    baseline.eigrp = Some(parse_eigrp(as_number, &stanza.body, defaults));
                }
                Err(_) => trace!("Ignoring named EIGRP stanza '{}'", stanza.header),
            },
            (Some("router"), Some("ospf"), Some(pid)) => match pid.parse() {
                Ok(process_id) => {
                    let mut ospf = parse_ospf(process_id, &stanza.body);
                    if ospf.router_id.is_none() {
                        ospf.router_id = defaults.router_id(hostname);
                    }
                    baseline.ospf = Some(ospf);
                }
                Err(_) => trace!("Ignoring OSPF stanza '{}'", stanza.header),
            },
            _ => {}
        }
    }

    debug!(
        "Parsed {}: {} interfaces, eigrp={}, ospf={}",
        hostname,
        baseline.interfaces.len(),
        baseline.eigrp.is_some(),
        baseline.ospf.is_some()
    );
    baseline
}

/// Parse the body of an `interface` stanza.
pub fn parse_interface(name: &str, body: &[&str], defaults: &ProtocolDefaults) -> InterfaceBaseline {
    let mut interface = InterfaceBaseline {
        name: name.to_string(),
        address: None,
        shutdown: false,
        eigrp_hello: defaults.eigrp_hello,
        eigrp_hold: defaults.eigrp_hold,
        ospf_hello: defaults.ospf_hello,
        ospf_dead: defaults.ospf_dead,
    };

    for line in body {
        if *line == "shutdown" {
            interface.shutdown = true;
        } else if let Some(caps) = IP_ADDRESS
            .captures(line)
            .filter(|_| !line.ends_with(" secondary"))
        {
            interface.address = match (caps[1].parse(), caps[2].parse()) {
                (Ok(ip), Ok(mask)) => Some(InterfaceAddress::new(ip, mask)),
                _ => interface.address,
            };
        } else if let Some(caps) = EIGRP_TIMER.captures(line) {
            if let Ok(value) = caps[2].parse() {
                match &caps[1] {
                    "hello-interval" => interface.eigrp_hello = value,
                    _ => interface.eigrp_hold = value,
                }
            }
        } else if let Some(caps) = OSPF_TIMER.captures(line) {
            if let Ok(value) = caps[2].parse() {
                match &caps[1] {
                    "hello-interval" => interface.ospf_hello = value,
                    _ => interface.ospf_dead = value,
                }
            }
        }
    }
    interface
}

fn parse_eigrp(as_number: u32, body: &[&str], defaults: &ProtocolDefaults) -> EigrpBaseline {
    let mut eigrp = EigrpBaseline::new(as_number);
    eigrp.k_values = defaults.k_values;

    for line in body {
        if let Some(caps) = EIGRP_NETWORK.captures(line) {
            if let Ok(network) = caps[1].parse::<Ipv4Addr>() {
                push_unique(&mut eigrp.networks, network);
            }
        } else if let Some(name) = line.strip_prefix("passive-interface ") {
            push_unique(&mut eigrp.passive_interfaces, name.trim().to_string());
        } else if line.starts_with("eigrp stub") {
            eigrp.is_stub = true;
        } else if let Some(weights) = line.strip_prefix("metric weights ") {
            // "metric weights <tos> k1 k2 k3 k4 k5" or the six-value form
            let values: Vec<&str> = weights.split_whitespace().collect();
            let k = match values.len() {
                6 => values.join(" ").parse().ok(),
                _ => None,
            };
            if let Some(k) = k {
                eigrp.k_values = k;
            }
        }
    }
    eigrp
}

fn parse_ospf(process_id: u32, body: &[&str]) -> OspfBaseline {
    let mut ospf = OspfBaseline::new(process_id);

    for line in body {
        if let Some(caps) = OSPF_NETWORK.captures(line) {
            if let (Ok(network), Ok(wildcard)) = (caps[1].parse(), caps[2].parse()) {
                push_unique(&mut ospf.networks, OspfNetwork::new(network, wildcard, &caps[3]));
            }
        } else if let Some(name) = line.strip_prefix("passive-interface ") {
            push_unique(&mut ospf.passive_interfaces, name.trim().to_string());
        } else if let Some(caps) = STUB_AREA.captures(line) {
            push_unique(&mut ospf.stub_areas, caps[1].to_string());
        } else if let Some(id) = line.strip_prefix("router-id ") {
            ospf.router_id = id.trim().parse().ok();
        }
    }
    ospf
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Parse every device block of a snapshot.
pub fn parse_snapshot(snapshot: &str, defaults: &ProtocolDefaults) -> IndexMap<String, Baseline> {
    split_devices(snapshot)
        .into_iter()
        .map(|(name, text)| {
            let baseline = parse_config(&name, text, defaults);
            (name, baseline)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::KValues;

    const R1: &str = "\
hostname R1
!
interface Ethernet0/0
 ip address 10.1.1.1 255.255.255.0
 ip hello-interval eigrp 1 10
 ip hold-time eigrp 1 30
!
interface Ethernet0/1
 no ip address
 shutdown
!
router eigrp 1
 network 10.1.1.0
 network 192.168.1.0 0.0.0.255
 passive-interface Ethernet0/2
 no passive-interface Ethernet0/3
 eigrp stub connected summary
 metric weights 0 1 1 1 0 0
!
end
";

    const R4: &str = "\
interface Ethernet0/0
 ip address 10.4.4.4 255.255.255.0
 ip ospf hello-interval 5
 ip ospf dead-interval 20
router ospf 10
 network 10.4.4.0 0.0.0.255 area 0
 network 172.16.0.0 0.0.255.255 area 1
 area 1 stub no-summary
 passive-interface Loopback0
";

    #[test]
    fn test_stanza_boundaries() {
        let found = stanzas(R1);
        let headers: Vec<_> = found.iter().map(|s| s.header).collect();
        assert_eq!(
            headers,
            vec!["interface Ethernet0/0", "interface Ethernet0/1", "router eigrp 1"]
        );
        assert_eq!(found[1].body, vec!["no ip address", "shutdown"]);
    }

    #[test]
    fn test_stanza_ends_at_next_header_without_bang() {
        let found = stanzas(R4);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].body.len(), 3);
        assert_eq!(found[1].header, "router ospf 10");
    }

    #[test]
    fn test_parse_interfaces() {
        let baseline = parse_config("R1", R1, &ProtocolDefaults::default());
        let e0 = &baseline.interfaces["Ethernet0/0"];
        assert_eq!(
            e0.address,
            Some(InterfaceAddress::new(
                Ipv4Addr::new(10, 1, 1, 1),
                Ipv4Addr::new(255, 255, 255, 0)
            ))
        );
        assert!(!e0.shutdown);
        assert_eq!((e0.eigrp_hello, e0.eigrp_hold), (10, 30));
        assert_eq!((e0.ospf_hello, e0.ospf_dead), (10, 40));

        let e1 = &baseline.interfaces["Ethernet0/1"];
        assert!(e1.address.is_none());
        assert!(e1.shutdown);
        assert!(!e1.expected_up());
    }

    #[test]
    fn test_parse_eigrp() {
        let baseline = parse_config("R1", R1, &ProtocolDefaults::default());
        let eigrp = baseline.eigrp.unwrap();
        assert_eq!(eigrp.as_number, 1);
        assert_eq!(
            eigrp.networks,
            vec![Ipv4Addr::new(10, 1, 1, 0), Ipv4Addr::new(192, 168, 1, 0)]
        );
        // "no passive-interface" is not a passive interface
        assert_eq!(eigrp.passive_interfaces, vec!["Ethernet0/2"]);
        assert!(eigrp.is_stub);
        assert_eq!(eigrp.k_values, "0 1 1 1 0 0".parse::<KValues>().unwrap());
        assert!(baseline.ospf.is_none());
    }

    #[test]
    fn test_parse_ospf_with_default_router_id() {
        let mut defaults = ProtocolDefaults::default();
        defaults
            .router_ids
            .insert("R4".to_string(), Ipv4Addr::new(4, 4, 4, 4));

        let baseline = parse_config("R4", R4, &defaults);
        let ospf = baseline.ospf.unwrap();
        assert_eq!(ospf.process_id, 10);
        assert_eq!(ospf.networks.len(), 2);
        assert_eq!(ospf.networks[1].area, "1");
        assert_eq!(ospf.stub_areas, vec!["1"]);
        assert_eq!(ospf.passive_interfaces, vec!["Loopback0"]);
        assert_eq!(ospf.router_id, Some(Ipv4Addr::new(4, 4, 4, 4)));

        let e0 = &baseline.interfaces["Ethernet0/0"];
        assert_eq!((e0.ospf_hello, e0.ospf_dead), (5, 20));
    }

    #[test]
    fn test_defaults_apply_when_absent() {
        let text = "router eigrp 100\n network 10.0.0.0\n";
        let mut defaults = ProtocolDefaults::default();
        defaults.k_values = "1 0 1 0 0 0".parse().unwrap();

        let eigrp = parse_config("R2", text, &defaults).eigrp.unwrap();
        assert_eq!(eigrp.as_number, 100);
        assert_eq!(eigrp.k_values, defaults.k_values);
        assert!(!eigrp.is_stub);
    }

    #[test]
    fn test_split_devices() {
        let snapshot = "Stable Configurations Timestamp: now\n====\nDEVICE: R1\n=====\nhostname R1\n\nDEVICE: R2\n=====\nhostname R2\n";
        let blocks = split_devices(snapshot);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].0, "R1");
        assert!(blocks[0].1.contains("hostname R1"));
        assert!(!blocks[0].1.contains("hostname R2"));
        assert_eq!(blocks[1].0, "R2");
    }

    #[test]
    fn test_garbage_yields_empty_baseline() {
        let baseline = parse_config("R9", "%% not a config\nrandom words", &ProtocolDefaults::default());
        assert_eq!(baseline, Baseline::empty("R9"));
    }
}
