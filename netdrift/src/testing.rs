//! Simulated devices for end-to-end tests.
//!
//! [`FakeDevice`] listens on a localhost port and speaks a small IOS-like
//! CLI: it echoes each line, prints a mode prompt, records every command and
//! keeps the configuration in a [`SimulatedDevice`] that show commands
//! render from. Configuration commands change that state, so a fix applied
//! over a session can be observed by the next scan.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::baseline::{
    Baseline, EigrpBaseline, InterfaceAddress, InterfaceBaseline, KValues, OspfBaseline,
    OspfNetwork, canonical_interface, parse_config, same_interface,
};
use crate::config::{ProtocolDefaults, ScanPolicy, SessionPolicy};
use crate::transport::Endpoint;

const INVALID_INPUT: &str = "         ^\n% Invalid input detected at '^' marker.";

/// Session timing for a localhost device that answers at once.
pub fn fast_policy() -> SessionPolicy {
    SessionPolicy {
        connect_timeout: Duration::from_millis(500),
        settle: Duration::from_millis(40),
        interface_settle: Duration::from_millis(40),
        detail_settle: Duration::from_millis(30),
        reset_settle: Duration::from_millis(20),
        config_settle: Duration::from_millis(25),
        running_config_timeout: Duration::from_millis(500),
        write_timeout: Duration::from_millis(500),
        close_timeout: Duration::from_millis(200),
        ..SessionPolicy::default()
    }
}

/// Scan policy with millisecond debug windows.
pub fn fast_scan_policy() -> ScanPolicy {
    ScanPolicy {
        eigrp_debug_window: Duration::from_millis(20),
        ospf_debug_window: Duration::from_millis(20),
        verify_delay: Duration::ZERO,
        ..ScanPolicy::default()
    }
}

#[derive(Debug, Clone)]
struct OspfPeer {
    id: Ipv4Addr,
    state: String,
    address: Ipv4Addr,
    interface: String,
}

/// Configuration and runtime state of one simulated router.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    config: Baseline,
    defaults: ProtocolDefaults,
    enable_secret: Option<String>,
    eigrp_neighbors: Vec<(Ipv4Addr, String)>,
    ospf_neighbors: Vec<OspfPeer>,
    /// Interface-level `ip ospf <pid> area <area>`, keyed by canonical name.
    ospf_areas: HashMap<String, String>,
    /// Interfaces OSPF skips although a network statement covers them.
    ospf_excluded: HashSet<String>,
    /// Router id the running OSPF process picked; `None` follows the config.
    ospf_router_id: Option<Ipv4Addr>,
    log: String,
}

impl SimulatedDevice {
    pub fn new(hostname: &str) -> Self {
        Self {
            config: Baseline::empty(hostname),
            defaults: ProtocolDefaults::default(),
            enable_secret: None,
            eigrp_neighbors: Vec::new(),
            ospf_neighbors: Vec::new(),
            ospf_areas: HashMap::new(),
            ospf_excluded: HashSet::new(),
            ospf_router_id: None,
            log: String::new(),
        }
    }

    pub fn with_config(mut self, text: &str) -> Self {
        self.config = parse_config(&self.config.hostname, text, &self.defaults);
        self.ospf_router_id = self.config.ospf.as_ref().map(|_| self.configured_router_id());
        self
    }

    pub fn with_enable_secret(mut self, secret: &str) -> Self {
        self.enable_secret = Some(secret.to_string());
        self
    }

    pub fn with_eigrp_neighbor(mut self, address: Ipv4Addr, interface: &str) -> Self {
        self.eigrp_neighbors.push((address, interface.to_string()));
        self
    }

    pub fn with_ospf_neighbor(
        mut self,
        id: Ipv4Addr,
        state: &str,
        address: Ipv4Addr,
        interface: &str,
    ) -> Self {
        self.ospf_neighbors.push(OspfPeer {
            id,
            state: state.to_string(),
            address,
            interface: interface.to_string(),
        });
        self
    }

    /// Put an interface in `area` regardless of network statements.
    pub fn with_area(mut self, interface: &str, area: &str) -> Self {
        self.ospf_areas
            .insert(canonical_interface(interface), area.to_string());
        self
    }

    /// Keep OSPF off an interface until `ip ospf <pid> area <a>` is set.
    pub fn with_ospf_excluded(mut self, interface: &str) -> Self {
        self.ospf_excluded.insert(canonical_interface(interface));
        self
    }

    pub fn with_log(mut self, log: &str) -> Self {
        self.log = log.to_string();
        self
    }

    pub fn hostname(&self) -> &str {
        &self.config.hostname
    }

    pub fn config(&self) -> &Baseline {
        &self.config
    }

    /// Router id the OSPF process is running with.
    pub fn active_router_id(&self) -> Ipv4Addr {
        self.router_id()
    }

    pub fn interface_shutdown(&self, name: &str) -> bool {
        self.config.interface(name).is_some_and(|i| i.shutdown)
    }

    fn interface_mut(&mut self, name: &str) -> Option<&mut InterfaceBaseline> {
        self.config
            .interfaces
            .values_mut()
            .find(|i| same_interface(&i.name, name))
    }

    /// Existing interface name, creating loopbacks on demand.
    fn ensure_interface(&mut self, name: &str) -> Option<String> {
        if let Some(existing) = self.config.interface(name) {
            return Some(existing.name.clone());
        }
        if !canonical_interface(name).starts_with("Loopback") {
            return None;
        }
        self.config.interfaces.insert(
            name.to_string(),
            InterfaceBaseline {
                name: name.to_string(),
                address: None,
                shutdown: false,
                eigrp_hello: self.defaults.eigrp_hello,
                eigrp_hold: self.defaults.eigrp_hold,
                ospf_hello: self.defaults.ospf_hello,
                ospf_dead: self.defaults.ospf_dead,
            },
        );
        Some(name.to_string())
    }

    fn active_address(&self, name: &str) -> Option<InterfaceAddress> {
        self.config
            .interface(name)
            .filter(|i| !i.shutdown)
            .and_then(|i| i.address)
    }

    fn eigrp_runs_on(&self, name: &str) -> bool {
        let (Some(eigrp), Some(address)) = (self.config.eigrp.as_ref(), self.active_address(name))
        else {
            return false;
        };
        eigrp.networks.iter().any(|n| classful_covers(*n, address.ip))
    }

    fn ospf_area(&self, name: &str) -> Option<String> {
        let ospf = self.config.ospf.as_ref()?;
        let address = self.active_address(name)?;
        let key = canonical_interface(name);
        if let Some(area) = self.ospf_areas.get(&key) {
            return Some(area.clone());
        }
        if self.ospf_excluded.contains(&key) {
            return None;
        }
        ospf.network_for(address.ip).map(|n| n.area.clone())
    }

    /// Router id `show ip ospf` reports.
    fn router_id(&self) -> Ipv4Addr {
        self.ospf_router_id
            .unwrap_or_else(|| self.configured_router_id())
    }

    fn configured_router_id(&self) -> Ipv4Addr {
        self.config
            .ospf
            .as_ref()
            .and_then(|o| o.router_id)
            .or_else(|| {
                self.config
                    .interfaces
                    .values()
                    .filter_map(|i| i.address.map(|a| a.ip))
                    .max()
            })
            .unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    fn running_config(&self) -> String {
        let text = self.config.to_config_text(&self.defaults);
        format!(
            "Building configuration...\n\nCurrent configuration : {} bytes\n!\n{}",
            text.len(),
            text
        )
    }

    fn interface_config(&self, name: &str) -> Option<String> {
        let interface = self.config.interface(name)?;
        let mut single = Baseline::empty(self.config.hostname.clone());
        single
            .interfaces
            .insert(interface.name.clone(), interface.clone());
        let text = single.to_config_text(&self.defaults);
        // Drop the hostname line and its separator
        let body: Vec<&str> = text.lines().skip(2).collect();
        Some(format!(
            "Building configuration...\n\nCurrent configuration : {} bytes\n!\n{}",
            text.len(),
            body.join("\n")
        ))
    }

    fn interface_brief(&self) -> String {
        let mut out = String::from(
            "Interface              IP-Address      OK? Method Status                Protocol\n",
        );
        for interface in self.config.interfaces.values() {
            let address = interface
                .address
                .map_or_else(|| "unassigned".to_string(), |a| a.ip.to_string());
            let (status, protocol) = if interface.shutdown {
                ("administratively down", "down")
            } else {
                ("up", "up")
            };
            let _ = writeln!(
                out,
                "{:<23}{:<16}YES NVRAM  {:<22}{}",
                interface.name, address, status, protocol
            );
        }
        out
    }

    fn eigrp_neighbor_table(&self) -> String {
        let Some(eigrp) = self.config.eigrp.as_ref() else {
            return String::new();
        };
        let mut out = format!(
            "EIGRP-IPv4 Neighbors for AS({})\n\
             H   Address                 Interface              Hold Uptime   SRTT   RTO  Q  Seq\n\
             \x20                                                  (sec)         (ms)       Cnt Num\n",
            eigrp.as_number
        );
        for (i, (address, interface)) in self.eigrp_neighbors.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:<4}{:<24}{:<23}13 00:10:09    9   200  0  11",
                i, address, interface
            );
        }
        out
    }

    fn eigrp_interface_detail(&self, name: &str) -> String {
        let Some(eigrp) = self.config.eigrp.as_ref() else {
            return String::new();
        };
        let mut out = format!("EIGRP-IPv4 Interfaces for AS({})\n", eigrp.as_number);
        let Some(interface) = self.config.interface(name).filter(|_| self.eigrp_runs_on(name))
        else {
            return out;
        };
        out.push_str(
            "                              Xmit Queue   PeerQ        Mean   Pacing Time   Multicast    Pending\n\
             Interface              Peers  Un/Reliable  Un/Reliable  SRTT   Un/Reliable   Flow Timer   Routes\n",
        );
        let _ = writeln!(
            out,
            "{:<23}  1        0/0       0/0          10       0/2           50           0",
            short_name(&interface.name)
        );
        let _ = writeln!(
            out,
            "  Hello-interval is {}, Hold-time is {}",
            interface.eigrp_hello, interface.eigrp_hold
        );
        out.push_str("  Split-horizon is enabled\n");
        out
    }

    fn ospf_neighbor_table(&self) -> String {
        if self.config.ospf.is_none() {
            return String::new();
        }
        let mut out = String::from(
            "Neighbor ID     Pri   State           Dead Time   Address         Interface\n",
        );
        for peer in &self.ospf_neighbors {
            let _ = writeln!(
                out,
                "{:<16}  1   {:<16}00:00:35    {:<16}{}",
                peer.id, peer.state, peer.address, peer.interface
            );
        }
        out
    }

    fn ospf_interface_detail(&self, name: &str) -> String {
        let (Some(ospf), Some(interface), Some(area)) = (
            self.config.ospf.as_ref(),
            self.config.interface(name),
            self.ospf_area(name),
        ) else {
            return format!("%OSPF: OSPF not enabled on {}", name);
        };
        let Some(address) = interface.address else {
            return format!("%OSPF: OSPF not enabled on {}", name);
        };
        format!(
            "{name} is up, line protocol is up\n\
             \x20 Internet Address {ip}/{len}, Area {area}, Attached via Network Statement\n\
             \x20 Process ID {pid}, Router ID {rid}, Network Type BROADCAST, Cost: 10\n\
             \x20 Transmit Delay is 1 sec, State DR, Priority 1\n\
             \x20 Timer intervals configured, Hello {hello}, Dead {dead}, Wait {dead}, Retransmit 5\n\
             \x20   Hello due in 00:00:03\n",
            name = interface.name,
            ip = address.ip,
            len = address.prefix_len(),
            area = area,
            pid = ospf.process_id,
            rid = self.router_id(),
            hello = interface.ospf_hello,
            dead = interface.ospf_dead,
        )
    }

    fn ospf_process(&self) -> String {
        let Some(ospf) = self.config.ospf.as_ref() else {
            return String::new();
        };
        format!(
            " Routing Process \"ospf {}\" with ID {}\n Start time: 00:00:10.123, Time elapsed: 01:02:03.456\n Supports only single TOS(TOS0) routes\n",
            ospf.process_id,
            self.router_id()
        )
    }

    fn ospf_interface_brief(&self) -> String {
        let Some(ospf) = self.config.ospf.as_ref() else {
            return String::new();
        };
        let mut out =
            String::from("Interface    PID   Area            IP Address/Mask    Cost  State Nbrs F/C\n");
        for interface in self.config.interfaces.values() {
            let (Some(area), Some(address)) = (self.ospf_area(&interface.name), interface.address)
            else {
                continue;
            };
            let _ = writeln!(
                out,
                "{:<13}{:<6}{:<16}{:<19}10    DR    0/0",
                short_name(&interface.name),
                ospf.process_id,
                area,
                format!("{}/{}", address.ip, address.prefix_len())
            );
        }
        out
    }

    fn logging(&self) -> String {
        format!(
            "Syslog logging: enabled (0 messages dropped, 0 messages rate-limited, 0 flushes, 0 overruns)\n\
             \x20   Console logging: level debugging, 42 messages logged\n\
             Log Buffer (8192 bytes):\n\n{}",
            self.log
        )
    }

    /// Interface submode commands. `None` means "not understood".
    fn configure_interface(&mut self, name: &str, words: &[&str]) -> Option<String> {
        let defaults = self.defaults.clone();
        let areas_key = canonical_interface(name);
        match words {
            ["ip", "ospf", _, "area", area] => {
                self.ospf_excluded.remove(&areas_key);
                self.ospf_areas.insert(areas_key, area.to_string());
                return Some(String::new());
            }
            ["no", "ip", "ospf", _, "area", _] => {
                self.ospf_areas.remove(&areas_key);
                return Some(String::new());
            }
            _ => {}
        }

        let interface = self.interface_mut(name)?;
        match words {
            ["shutdown"] => interface.shutdown = true,
            ["no", "shutdown"] => interface.shutdown = false,
            ["ip", "address", ip, mask] => {
                interface.address = Some(InterfaceAddress::new(ip.parse().ok()?, mask.parse().ok()?));
            }
            ["no", "ip", "address", ..] => interface.address = None,
            ["ip", "hello-interval", "eigrp", _, value] => interface.eigrp_hello = value.parse().ok()?,
            ["no", "ip", "hello-interval", "eigrp", ..] => interface.eigrp_hello = defaults.eigrp_hello,
            ["ip", "hold-time", "eigrp", _, value] => interface.eigrp_hold = value.parse().ok()?,
            ["no", "ip", "hold-time", "eigrp", ..] => interface.eigrp_hold = defaults.eigrp_hold,
            ["ip", "ospf", "hello-interval", value] => interface.ospf_hello = value.parse().ok()?,
            ["no", "ip", "ospf", "hello-interval", ..] => interface.ospf_hello = defaults.ospf_hello,
            ["ip", "ospf", "dead-interval", value] => interface.ospf_dead = value.parse().ok()?,
            ["no", "ip", "ospf", "dead-interval", ..] => interface.ospf_dead = defaults.ospf_dead,
            _ => return None,
        }
        Some(String::new())
    }

    fn configure_eigrp(&mut self, words: &[&str]) -> Option<String> {
        let default_k = self.defaults.k_values;
        let eigrp = self.config.eigrp.as_mut()?;
        match words {
            ["network", address, ..] => {
                let network: Ipv4Addr = address.parse().ok()?;
                if !eigrp.networks.contains(&network) {
                    eigrp.networks.push(network);
                }
            }
            ["no", "network", address, ..] => {
                let network: Ipv4Addr = address.parse().ok()?;
                eigrp.networks.retain(|n| *n != network);
            }
            ["passive-interface", name] => {
                if !eigrp.passive_interfaces.iter().any(|p| same_interface(p, name)) {
                    eigrp.passive_interfaces.push(name.to_string());
                }
            }
            ["no", "passive-interface", name] => {
                eigrp.passive_interfaces.retain(|p| !same_interface(p, name));
            }
            ["eigrp", "stub", ..] => eigrp.is_stub = true,
            ["no", "eigrp", "stub", ..] => eigrp.is_stub = false,
            ["metric", "weights", values @ ..] => {
                eigrp.k_values = values.join(" ").parse::<KValues>().ok()?;
            }
            ["no", "metric", "weights", ..] => eigrp.k_values = default_k,
            _ => return None,
        }
        Some(String::new())
    }

    fn configure_ospf(&mut self, words: &[&str]) -> Option<String> {
        let ospf = self.config.ospf.as_mut()?;
        match words {
            ["network", address, wildcard, "area", area] => {
                let network = OspfNetwork::new(address.parse().ok()?, wildcard.parse().ok()?, *area);
                if !ospf.networks.contains(&network) {
                    ospf.networks.push(network);
                }
            }
            ["no", "network", address, wildcard, "area", area] => {
                let network = OspfNetwork::new(address.parse().ok()?, wildcard.parse().ok()?, *area);
                ospf.networks.retain(|n| *n != network);
            }
            ["passive-interface", name] => {
                if !ospf.passive_interfaces.iter().any(|p| same_interface(p, name)) {
                    ospf.passive_interfaces.push(name.to_string());
                }
            }
            ["no", "passive-interface", name] => {
                ospf.passive_interfaces.retain(|p| !same_interface(p, name));
            }
            ["area", area, "stub", ..] => {
                if !ospf.stub_areas.iter().any(|a| a.as_str() == *area) {
                    ospf.stub_areas.push(area.to_string());
                }
            }
            ["no", "area", area, "stub", ..] => ospf.stub_areas.retain(|a| a.as_str() != *area),
            ["router-id", id] => {
                ospf.router_id = Some(id.parse().ok()?);
                if self.ospf_router_id.is_none() {
                    return Some(String::new());
                }
                return Some(
                    "% OSPF: Reload or use \"clear ip ospf process\" command, for this to take effect"
                        .to_string(),
                );
            }
            ["no", "router-id"] => ospf.router_id = None,
            _ => return None,
        }
        Some(String::new())
    }

    /// `clear ip ospf process` confirmed: the process restarts and picks
    /// up the configured router id.
    fn clear_ospf_process(&mut self) {
        if self.config.ospf.is_some() {
            self.ospf_router_id = Some(self.configured_router_id());
        }
    }
}

/// Classful network containing `network`, as `network <address>` implies.
fn classful_covers(network: Ipv4Addr, ip: Ipv4Addr) -> bool {
    let mask: u32 = match network.octets()[0] {
        0..=127 => 0xFF00_0000,
        128..=191 => 0xFFFF_0000,
        _ => 0xFFFF_FF00,
    };
    u32::from(network) & mask == u32::from(ip) & mask
}

/// Abbreviated interface name as IOS prints it in summary tables.
fn short_name(name: &str) -> String {
    let full = canonical_interface(name);
    for (long, short) in [
        ("GigabitEthernet", "Gi"),
        ("FastEthernet", "Fa"),
        ("Ethernet", "Et"),
        ("Loopback", "Lo"),
        ("Serial", "Se"),
    ] {
        if let Some(rest) = full.strip_prefix(long) {
            return format!("{}{}", short, rest);
        }
    }
    full
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleMode {
    User,
    Privileged,
    Global,
    Interface(String),
    RouterEigrp,
    RouterOspf,
}

/// Per-connection CLI state.
struct Console {
    mode: ConsoleMode,
    awaiting_password: bool,
    awaiting_clear: bool,
}

impl Console {
    fn new() -> Self {
        Self {
            mode: ConsoleMode::User,
            awaiting_password: false,
            awaiting_clear: false,
        }
    }

    fn prompt(&self, host: &str) -> String {
        match self.mode {
            ConsoleMode::User => format!("{}>", host),
            ConsoleMode::Privileged => format!("{}#", host),
            ConsoleMode::Global => format!("{}(config)#", host),
            ConsoleMode::Interface(_) => format!("{}(config-if)#", host),
            ConsoleMode::RouterEigrp | ConsoleMode::RouterOspf => {
                format!("{}(config-router)#", host)
            }
        }
    }

    /// Handle one input line; returns echo, reply and prompt.
    fn line(&mut self, text: &str, shared: &mut Shared) -> String {
        if self.awaiting_password {
            self.awaiting_password = false;
            let accepted = shared
                .device
                .enable_secret
                .as_deref()
                .is_some_and(|secret| secret == text.trim());
            let mut out = String::from("\r\n");
            if accepted {
                self.mode = ConsoleMode::Privileged;
            } else {
                out.push_str("% Bad secrets\r\n\r\n");
            }
            out.push_str(&self.prompt(shared.device.hostname()));
            return out;
        }

        if self.awaiting_clear {
            self.awaiting_clear = false;
            let answer = text.trim();
            shared.commands.push(answer.to_string());
            if matches!(answer, "y" | "yes") {
                shared.device.clear_ospf_process();
            }
            return format!("{}\r\n{}", text, self.prompt(shared.device.hostname()));
        }

        let mut out = format!("{}\r\n", text);
        let command = text.trim();
        if !command.is_empty() {
            shared.commands.push(command.to_string());
            let reply = self.dispatch(command, &mut shared.device);
            if self.awaiting_password {
                out.push_str("Password: ");
                return out;
            }
            if self.awaiting_clear {
                out.push_str(&reply);
                return out;
            }
            for line in reply.lines() {
                out.push_str(line);
                out.push_str("\r\n");
            }
        }
        out.push_str(&self.prompt(shared.device.hostname()));
        out
    }

    fn dispatch(&mut self, command: &str, device: &mut SimulatedDevice) -> String {
        match &self.mode {
            ConsoleMode::User | ConsoleMode::Privileged => self.exec(command, device),
            _ => self.configure(command, device),
        }
    }

    fn exec(&mut self, command: &str, device: &mut SimulatedDevice) -> String {
        let privileged = self.mode == ConsoleMode::Privileged;
        match command {
            "enable" => {
                if !privileged {
                    match device.enable_secret {
                        Some(_) => self.awaiting_password = true,
                        None => self.mode = ConsoleMode::Privileged,
                    }
                }
                String::new()
            }
            "end" | "exit" | "terminal length 0" => String::new(),
            "configure terminal" if privileged => {
                self.mode = ConsoleMode::Global;
                "Enter configuration commands, one per line.  End with CNTL/Z.".to_string()
            }
            "write memory" if privileged => "Building configuration...\n[OK]".to_string(),
            "debug eigrp packets" if privileged => {
                "EIGRP Packets debugging is on\n    (UPDATE, REQUEST, QUERY, REPLY, HELLO, ACK, STUB)"
                    .to_string()
            }
            "debug ip ospf adj" if privileged => "OSPF adjacency debugging is on".to_string(),
            "clear ip ospf process" if privileged => {
                self.awaiting_clear = true;
                "Reset ALL OSPF processes? [no]: ".to_string()
            }
            "no debug all" | "undebug all" if privileged => {
                "All possible debugging has been turned off".to_string()
            }
            "show ip interface brief" => device.interface_brief(),
            "show running-config" if privileged => device.running_config(),
            "show ip eigrp neighbors" => device.eigrp_neighbor_table(),
            "show ip ospf neighbor" => device.ospf_neighbor_table(),
            "show ip ospf" => device.ospf_process(),
            "show ip ospf interface brief" => device.ospf_interface_brief(),
            "show logging" => device.logging(),
            _ => {
                if let Some(name) = command.strip_prefix("show running-config interface ") {
                    if privileged {
                        if let Some(text) = device.interface_config(name.trim()) {
                            return text;
                        }
                    }
                } else if let Some(name) = command.strip_prefix("show ip eigrp interfaces detail ") {
                    return device.eigrp_interface_detail(name.trim());
                } else if let Some(name) = command.strip_prefix("show ip ospf interface ") {
                    return device.ospf_interface_detail(name.trim());
                }
                INVALID_INPUT.to_string()
            }
        }
    }

    fn configure(&mut self, command: &str, device: &mut SimulatedDevice) -> String {
        let words: Vec<&str> = command.split_whitespace().collect();
        match words.as_slice() {
            ["end"] => {
                self.mode = ConsoleMode::Privileged;
                return String::new();
            }
            ["exit"] => {
                self.mode = match self.mode {
                    ConsoleMode::Global => ConsoleMode::Privileged,
                    _ => ConsoleMode::Global,
                };
                return String::new();
            }
            _ => {}
        }

        let handled = match &self.mode {
            ConsoleMode::Interface(name) => {
                let name = name.clone();
                device.configure_interface(&name, &words)
            }
            ConsoleMode::RouterEigrp => device.configure_eigrp(&words),
            ConsoleMode::RouterOspf => device.configure_ospf(&words),
            _ => None,
        };
        if let Some(reply) = handled {
            return reply;
        }
        self.global(&words, device)
            .unwrap_or_else(|| INVALID_INPUT.to_string())
    }

    fn global(&mut self, words: &[&str], device: &mut SimulatedDevice) -> Option<String> {
        match words {
            ["interface", name] => {
                let name = device.ensure_interface(name)?;
                self.mode = ConsoleMode::Interface(name);
            }
            ["router", "eigrp", asn] => {
                let as_number: u32 = asn.parse().ok()?;
                if device.config.eigrp.as_ref().map(|e| e.as_number) != Some(as_number) {
                    device.config.eigrp = Some(EigrpBaseline {
                        k_values: device.defaults.k_values,
                        ..EigrpBaseline::new(as_number)
                    });
                }
                self.mode = ConsoleMode::RouterEigrp;
            }
            ["no", "router", "eigrp", asn] => {
                let as_number: u32 = asn.parse().ok()?;
                if device.config.eigrp.as_ref().map(|e| e.as_number) == Some(as_number) {
                    device.config.eigrp = None;
                }
            }
            ["router", "ospf", pid] => {
                let process_id: u32 = pid.parse().ok()?;
                if device.config.ospf.as_ref().map(|o| o.process_id) != Some(process_id) {
                    device.config.ospf = Some(OspfBaseline::new(process_id));
                    device.ospf_router_id = None;
                }
                self.mode = ConsoleMode::RouterOspf;
            }
            ["no", "router", "ospf", pid] => {
                let process_id: u32 = pid.parse().ok()?;
                if device.config.ospf.as_ref().map(|o| o.process_id) == Some(process_id) {
                    device.config.ospf = None;
                    device.ospf_router_id = None;
                }
            }
            ["hostname", name] => device.config.hostname = name.to_string(),
            _ => return None,
        }
        Some(String::new())
    }
}

struct Shared {
    device: SimulatedDevice,
    commands: Vec<String>,
    /// Connections the client has closed.
    disconnects: usize,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A simulated device listening on localhost.
pub struct FakeDevice {
    name: String,
    addr: SocketAddr,
    shared: Arc<Mutex<Shared>>,
    accept: JoinHandle<()>,
}

impl FakeDevice {
    pub async fn spawn(device: SimulatedDevice) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let name = device.hostname().to_string();
        let shared = Arc::new(Mutex::new(Shared {
            device,
            commands: Vec::new(),
            disconnects: 0,
        }));

        let accept = tokio::spawn({
            let shared = shared.clone();
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let shared = shared.clone();
                    tokio::spawn(async move {
                        serve(stream, shared.clone()).await;
                        lock(&shared).disconnects += 1;
                    });
                }
            }
        });

        Self {
            name,
            addr,
            shared,
            accept,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::telnet(self.addr.ip().to_string(), self.addr.port())
    }

    /// Every non-blank line received, in order, across connections.
    pub fn commands(&self) -> Vec<String> {
        lock(&self.shared).commands.clone()
    }

    pub fn disconnects(&self) -> usize {
        lock(&self.shared).disconnects
    }

    /// Current simulated state.
    pub fn state(&self) -> SimulatedDevice {
        lock(&self.shared).device.clone()
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.accept.abort();
    }
}

fn feed(console: &mut Console, line: &[u8], shared: &Mutex<Shared>) -> String {
    let text = String::from_utf8_lossy(line);
    console.line(&text, &mut lock(shared))
}

fn interrupt(console: &Console, shared: &Mutex<Shared>) -> String {
    format!("^C\r\n{}", console.prompt(lock(shared).device.hostname()))
}

async fn serve(mut stream: TcpStream, shared: Arc<Mutex<Shared>>) {
    let mut console = Console::new();
    let mut line = Vec::new();
    let mut buf = [0u8; 1024];

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        let mut out = String::new();
        for &byte in &buf[..n] {
            match byte {
                0x03 => {
                    line.clear();
                    out.push_str(&interrupt(&console, &shared));
                }
                b'\r' => {}
                b'\n' => {
                    out.push_str(&feed(&mut console, &line, &shared));
                    line.clear();
                }
                other => line.push(other),
            }
        }
        if !out.is_empty() && stream.write_all(out.as_bytes()).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_commands_change_state() {
        let mut device = SimulatedDevice::new("R1")
            .with_config("interface Ethernet0/0\n ip address 10.1.1.1 255.255.255.0\n shutdown\n");
        let mut console = Console {
            mode: ConsoleMode::Global,
            awaiting_password: false,
            awaiting_clear: false,
        };

        assert_eq!(console.dispatch("interface Ethernet0/0", &mut device), "");
        assert_eq!(console.dispatch("no shutdown", &mut device), "");
        assert!(!device.interface_shutdown("Ethernet0/0"));

        console.dispatch("router eigrp 1", &mut device);
        console.dispatch("metric weights 0 2 0 1 0 0", &mut device);
        assert_eq!(
            device.config().eigrp.as_ref().map(|e| e.k_values.to_string()),
            Some("0 2 0 1 0 0".to_string())
        );

        assert!(console.dispatch("frobnicate", &mut device).contains("% Invalid input"));
        assert!(console.dispatch("interface Ethernet9/9", &mut device).contains("% Invalid input"));
    }

    #[test]
    fn test_show_outputs_parse() {
        let device = SimulatedDevice::new("R4").with_config(
            "interface Ethernet0/0\n ip address 10.45.0.4 255.255.255.0\n!\nrouter ospf 10\n router-id 4.4.4.4\n network 10.45.0.0 0.0.0.255 area 0\n",
        );
        let rows = crate::observe::parse_interface_brief(&device.interface_brief());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state_label(), "up/up");

        let detail =
            crate::observe::parse_ospf_interface_detail(&device.ospf_interface_detail("Ethernet0/0"))
                .unwrap();
        assert_eq!((detail.hello, detail.hold), (Some(10), Some(40)));
        assert_eq!(detail.area.as_deref(), Some("0"));

        let brief = crate::observe::parse_ospf_interface_brief(&device.ospf_interface_brief());
        assert_eq!(brief[0].interface, "Et0/0");
        assert_eq!(
            crate::observe::parse_router_id(&device.ospf_process()),
            Some(Ipv4Addr::new(4, 4, 4, 4))
        );
    }

    #[test]
    fn test_router_id_waits_for_process_clear() {
        let mut shared = Shared {
            device: SimulatedDevice::new("R4").with_config(
                "interface Ethernet0/0\n ip address 10.45.0.4 255.255.255.0\n!\nrouter ospf 10\n router-id 9.9.9.9\n network 10.45.0.0 0.0.0.255 area 0\n",
            ),
            commands: Vec::new(),
            disconnects: 0,
        };
        let mut console = Console {
            mode: ConsoleMode::Global,
            awaiting_password: false,
            awaiting_clear: false,
        };
        let rid = |shared: &Shared| crate::observe::parse_router_id(&shared.device.ospf_process());

        console.line("router ospf 10", &mut shared);
        assert!(console.line("router-id 4.4.4.4", &mut shared).contains("clear ip ospf process"));
        console.line("end", &mut shared);
        assert_eq!(rid(&shared), Some(Ipv4Addr::new(9, 9, 9, 9)));

        assert!(console.line("clear ip ospf process", &mut shared).ends_with("[no]: "));
        console.line("no", &mut shared);
        assert_eq!(rid(&shared), Some(Ipv4Addr::new(9, 9, 9, 9)));

        console.line("clear ip ospf process", &mut shared);
        assert!(console.line("yes", &mut shared).ends_with("R4#"));
        assert_eq!(rid(&shared), Some(Ipv4Addr::new(4, 4, 4, 4)));
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("Ethernet0/1"), "Et0/1");
        assert_eq!(short_name("Gi0/0"), "Gi0/0");
        assert_eq!(short_name("Tunnel5"), "Tunnel5");
    }
}
