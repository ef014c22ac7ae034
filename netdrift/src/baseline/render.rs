//! Rendering baselines back to configuration text and snapshots.

use std::fmt::Write;

use super::model::Baseline;
use crate::config::ProtocolDefaults;

const HEADER_RULE: usize = 80;
const DEVICE_RULE: usize = 60;

impl Baseline {
    /// Render as IOS-style configuration text.
    ///
    /// Timer and k-value lines are only written when they differ from
    /// `defaults`, so parsing the text with the same defaults gives back an
    /// equal baseline.
    pub fn to_config_text(&self, defaults: &ProtocolDefaults) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "hostname {}", self.hostname);
        out.push_str("!\n");

        let eigrp_as = self
            .eigrp
            .as_ref()
            .map(|e| e.as_number)
            .unwrap_or(defaults.eigrp_as);

        for interface in self.interfaces.values() {
            let _ = writeln!(out, "interface {}", interface.name);
            match &interface.address {
                Some(address) => {
                    let _ = writeln!(out, " ip address {}", address);
                }
                None => out.push_str(" no ip address\n"),
            }
            if interface.eigrp_hello != defaults.eigrp_hello {
                let _ = writeln!(out, " ip hello-interval eigrp {} {}", eigrp_as, interface.eigrp_hello);
            }
            if interface.eigrp_hold != defaults.eigrp_hold {
                let _ = writeln!(out, " ip hold-time eigrp {} {}", eigrp_as, interface.eigrp_hold);
            }
            if interface.ospf_hello != defaults.ospf_hello {
                let _ = writeln!(out, " ip ospf hello-interval {}", interface.ospf_hello);
            }
            if interface.ospf_dead != defaults.ospf_dead {
                let _ = writeln!(out, " ip ospf dead-interval {}", interface.ospf_dead);
            }
            out.push_str(if interface.shutdown {
                " shutdown\n"
            } else {
                " no shutdown\n"
            });
            out.push_str("!\n");
        }

        if let Some(eigrp) = &self.eigrp {
            let _ = writeln!(out, "router eigrp {}", eigrp.as_number);
            for network in &eigrp.networks {
                let _ = writeln!(out, " network {}", network);
            }
            for name in &eigrp.passive_interfaces {
                let _ = writeln!(out, " passive-interface {}", name);
            }
            if eigrp.is_stub {
                out.push_str(" eigrp stub\n");
            }
            if eigrp.k_values != defaults.k_values {
                let _ = writeln!(out, " metric weights {}", eigrp.k_values);
            }
            out.push_str("!\n");
        }

        if let Some(ospf) = &self.ospf {
            let _ = writeln!(out, "router ospf {}", ospf.process_id);
            if let Some(router_id) = ospf.router_id {
                let _ = writeln!(out, " router-id {}", router_id);
            }
            for name in &ospf.passive_interfaces {
                let _ = writeln!(out, " passive-interface {}", name);
            }
            for network in &ospf.networks {
                let _ = writeln!(out, " network {}", network);
            }
            for area in &ospf.stub_areas {
                let _ = writeln!(out, " area {} stub", area);
            }
            out.push_str("!\n");
        }

        out.push_str("end\n");
        out
    }
}

/// Render a snapshot in the persisted format.
///
/// ```text
/// Stable Configurations Timestamp: 2026-01-01 10:00:00
/// ================================================================================
/// STABLE ROUTER CONFIGURATIONS
/// ================================================================================
///
/// DEVICE: R1
/// ============================================================
/// hostname R1
/// ...
/// ```
pub fn render_snapshot<N, T>(title: &str, timestamp: &str, devices: &[(N, T)]) -> String
where
    N: AsRef<str>,
    T: AsRef<str>,
{
    let mut out = String::new();
    let _ = writeln!(out, "{} Configurations Timestamp: {}", title, timestamp);
    let _ = writeln!(out, "{}", "=".repeat(HEADER_RULE));
    let _ = writeln!(out, "{} ROUTER CONFIGURATIONS", title.to_uppercase());
    let _ = writeln!(out, "{}", "=".repeat(HEADER_RULE));
    out.push('\n');

    for (name, config) in devices {
        let _ = writeln!(out, "DEVICE: {}", name.as_ref());
        let _ = writeln!(out, "{}", "=".repeat(DEVICE_RULE));
        out.push_str(config.as_ref().trim_end());
        out.push_str("\n\n");
    }
    out
}
