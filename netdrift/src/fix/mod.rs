//! Remediation: one deterministic command template per problem type.
//!
//! [`plan`] is pure. It never talks to a device and never asks the
//! operator; applying a plan is [`apply`]'s job and deciding whether to is
//! the orchestrator's.

mod apply;

use std::fmt;

pub use apply::{FixResult, apply, verify};

use crate::baseline::{Baseline, OspfBaseline, RoutingProtocol};
use crate::diff::{Problem, ProblemKind, SetDrift};

/// What to re-query after a fix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    pub protocol: Option<RoutingProtocol>,
    pub interface: Option<String>,
}

/// Configuration lines that resolve one problem, or the reason none exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixPlan {
    commands: Vec<String>,
    exec: Vec<String>,
    verification: Verification,
    manual: Option<String>,
}

impl FixPlan {
    fn new(commands: Vec<String>, verification: Verification) -> Self {
        Self {
            commands,
            exec: Vec::new(),
            verification,
            manual: None,
        }
    }

    /// A plan for a problem that needs an operator.
    pub fn manual(reason: impl Into<String>) -> Self {
        Self {
            commands: Vec::new(),
            exec: Vec::new(),
            verification: Verification::default(),
            manual: Some(reason.into()),
        }
    }

    /// Run `command` in privileged mode once the configuration is in,
    /// confirming it if the device asks.
    fn then_exec(mut self, command: impl Into<String>) -> Self {
        self.exec.push(command.into());
        self
    }

    /// Lines to send in configuration mode. Lines starting with `#` are
    /// notes for the operator and are not sent.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Privileged commands sent after configuration mode is left.
    pub fn exec_commands(&self) -> &[String] {
        &self.exec
    }

    pub fn verification(&self) -> &Verification {
        &self.verification
    }

    pub fn is_manual(&self) -> bool {
        self.manual.is_some()
    }

    pub fn manual_reason(&self) -> Option<&str> {
        self.manual.as_deref()
    }
}

impl fmt::Display for FixPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.manual {
            Some(reason) => write!(f, "manual intervention required: {}", reason),
            None => {
                f.write_str(&self.commands.join("\n"))?;
                for command in &self.exec {
                    write!(f, "\n{} (privileged, confirmed)", command)?;
                }
                Ok(())
            }
        }
    }
}

fn interface_plan(interface: &str, body: Vec<String>, protocol: Option<RoutingProtocol>) -> FixPlan {
    let mut commands = vec![format!("interface {}", interface)];
    commands.extend(body);
    commands.push("exit".to_string());
    FixPlan::new(
        commands,
        Verification {
            protocol,
            interface: Some(interface.to_string()),
        },
    )
}

fn router_plan(header: String, body: Vec<String>, protocol: RoutingProtocol) -> FixPlan {
    let mut commands = vec![header];
    commands.extend(body);
    commands.push("exit".to_string());
    FixPlan::new(
        commands,
        Verification {
            protocol: Some(protocol),
            interface: None,
        },
    )
}

/// Router stanza header for `protocol` as the baseline numbers it.
fn router_header(baseline: &Baseline, protocol: RoutingProtocol) -> Option<String> {
    match protocol {
        RoutingProtocol::Eigrp => baseline
            .eigrp
            .as_ref()
            .map(|e| format!("router eigrp {}", e.as_number)),
        RoutingProtocol::Ospf => baseline
            .ospf
            .as_ref()
            .map(|o| format!("router ospf {}", o.process_id)),
    }
}

fn no_baseline(protocol: RoutingProtocol) -> FixPlan {
    FixPlan::manual(format!("no {} baseline recorded for this device", protocol))
}

/// Full `router ospf` stanza rebuilt from the baseline, replacing `current`.
fn rebuild_ospf(current: u32, ospf: &OspfBaseline) -> Vec<String> {
    let mut commands = vec![
        format!("no router ospf {}", current),
        format!("router ospf {}", ospf.process_id),
    ];
    if let Some(router_id) = ospf.router_id {
        commands.push(format!("router-id {}", router_id));
    }
    commands.extend(
        ospf.passive_interfaces
            .iter()
            .map(|name| format!("passive-interface {}", name)),
    );
    commands.extend(ospf.networks.iter().map(|n| format!("network {}", n)));
    commands.extend(ospf.stub_areas.iter().map(|a| format!("area {} stub", a)));
    commands.push("exit".to_string());
    commands
}

/// The fix for one problem.
pub fn plan(problem: &Problem, baseline: &Baseline) -> FixPlan {
    let eigrp_as = baseline.eigrp.as_ref().map(|e| e.as_number);
    let ospf_pid = baseline.ospf.as_ref().map(|o| o.process_id);

    match problem.kind() {
        ProblemKind::InterfaceShutdown { interface } => {
            interface_plan(interface, vec!["no shutdown".to_string()], None)
        }
        ProblemKind::IpAddressMismatch {
            interface,
            expected,
            ..
        }
        | ProblemKind::MissingIpAddress {
            interface,
            expected,
        } => interface_plan(interface, vec![format!("ip address {}", expected)], None),

        ProblemKind::EigrpAsMismatch { .. } => FixPlan::manual(
            "changing the EIGRP AS number rebuilds the process and drops every adjacency",
        ),
        ProblemKind::EigrpStub { should_be_stub } => {
            let Some(header) = router_header(baseline, RoutingProtocol::Eigrp) else {
                return no_baseline(RoutingProtocol::Eigrp);
            };
            let line = if *should_be_stub {
                "eigrp stub"
            } else {
                "no eigrp stub"
            };
            router_plan(header, vec![line.to_string()], RoutingProtocol::Eigrp)
        }
        ProblemKind::PassiveInterface {
            protocol,
            interface,
            should_be_passive,
        } => {
            let Some(header) = router_header(baseline, *protocol) else {
                return no_baseline(*protocol);
            };
            let line = if *should_be_passive {
                format!("passive-interface {}", interface)
            } else {
                format!("no passive-interface {}", interface)
            };
            router_plan(header, vec![line], *protocol)
        }
        ProblemKind::KValueMismatch { expected, .. } => {
            let Some(header) = router_header(baseline, RoutingProtocol::Eigrp) else {
                return no_baseline(RoutingProtocol::Eigrp);
            };
            router_plan(
                header,
                vec![format!("metric weights {}", expected)],
                RoutingProtocol::Eigrp,
            )
        }
        ProblemKind::NetworkStatement { statement, drift } => {
            let protocol = statement.protocol();
            let Some(header) = router_header(baseline, protocol) else {
                return no_baseline(protocol);
            };
            let line = match drift {
                SetDrift::Missing => statement.to_string(),
                SetDrift::Extra => format!("no {}", statement),
            };
            router_plan(header, vec![line], protocol)
        }
        ProblemKind::EigrpTimerMismatch {
            interface,
            expected_hello,
            expected_hold,
            ..
        } => {
            let Some(as_number) = eigrp_as else {
                return no_baseline(RoutingProtocol::Eigrp);
            };
            interface_plan(
                interface,
                vec![
                    format!("ip hello-interval eigrp {} {}", as_number, expected_hello),
                    format!("ip hold-time eigrp {} {}", as_number, expected_hold),
                ],
                Some(RoutingProtocol::Eigrp),
            )
        }
        ProblemKind::WrongSubnet { interface } => FixPlan::manual(match interface {
            Some(interface) => format!(
                "neighbor on {} is not on a common subnet; check addressing on both ends",
                interface
            ),
            None => "a neighbor is not on a common subnet; check addressing on both ends"
                .to_string(),
        }),
        ProblemKind::AuthenticationMismatch { protocol } => FixPlan::manual(format!(
            "{} authentication keys must be aligned on both neighbors",
            protocol
        )),
        ProblemKind::EigrpStubNeighbor => {
            FixPlan::manual("a peer rejected the adjacency over its stub configuration")
        }

        ProblemKind::OspfProcessMismatch { current, .. } => match baseline.ospf.as_ref() {
            Some(ospf) => FixPlan::new(
                rebuild_ospf(*current, ospf),
                Verification {
                    protocol: Some(RoutingProtocol::Ospf),
                    interface: None,
                },
            ),
            None => no_baseline(RoutingProtocol::Ospf),
        },
        ProblemKind::OspfStubArea {
            area,
            should_be_stub,
        } => {
            let Some(header) = router_header(baseline, RoutingProtocol::Ospf) else {
                return no_baseline(RoutingProtocol::Ospf);
            };
            let line = if *should_be_stub {
                format!("area {} stub", area)
            } else {
                format!("no area {} stub", area)
            };
            router_plan(header, vec![line], RoutingProtocol::Ospf)
        }
        ProblemKind::InterfaceNotInOspf {
            interface,
            address,
            network,
        } => {
            let Some(pid) = ospf_pid else {
                return no_baseline(RoutingProtocol::Ospf);
            };
            interface_plan(
                interface,
                vec![
                    format!("# 'network {}' covers {} but OSPF is not running on it", network, address),
                    format!("ip ospf {} area {}", pid, network.area),
                ],
                Some(RoutingProtocol::Ospf),
            )
        }
        ProblemKind::OspfTimerMismatch {
            interface,
            expected_hello,
            expected_dead,
            ..
        } => interface_plan(
            interface,
            vec![
                format!("ip ospf hello-interval {}", expected_hello),
                format!("ip ospf dead-interval {}", expected_dead),
            ],
            Some(RoutingProtocol::Ospf),
        ),
        ProblemKind::RouterIdMismatch { expected, .. } => {
            let Some(header) = router_header(baseline, RoutingProtocol::Ospf) else {
                return no_baseline(RoutingProtocol::Ospf);
            };
            // The running process keeps its id until restarted
            router_plan(header, vec![format!("router-id {}", expected)], RoutingProtocol::Ospf)
                .then_exec("clear ip ospf process")
        }
        ProblemKind::DuplicateRouterId { .. } => FixPlan::manual(
            "router ids must be made unique across the OSPF domain",
        ),
        ProblemKind::AreaMismatch {
            interface,
            expected,
            ..
        } => {
            let Some(pid) = ospf_pid else {
                return no_baseline(RoutingProtocol::Ospf);
            };
            interface_plan(
                interface,
                vec![format!("ip ospf {} area {}", pid, expected)],
                Some(RoutingProtocol::Ospf),
            )
        }
        ProblemKind::OspfAdjacencyMismatch { .. } => FixPlan::manual(format!(
            "{}; the log does not name the interface",
            problem.kind()
        )),
    }
}
