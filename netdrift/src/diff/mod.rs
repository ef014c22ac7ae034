//! Comparing observations with the baseline.
//!
//! Every check is a pure function of one [`Observation`] and the device's
//! [`Baseline`]. Checks run in a fixed order per category and each problem
//! quotes the source line it was derived from.

mod eigrp;
mod interface;
mod ospf;
mod problem;

pub use problem::{
    AdjacencyParameter, Category, NetworkStatement, Problem, ProblemKind, ProblemType, SetDrift,
    Severity,
};

use crate::baseline::{Baseline, RoutingProtocol, same_interface};
use crate::observe::{LogSignal, Observation, ProtocolObservation, RunningConfig, scan_log};

/// All problems in one observation, in check order.
pub fn diff(observation: &Observation, baseline: &Baseline) -> Vec<Problem> {
    match observation {
        Observation::Interfaces(obs) => interface::check(obs, baseline),
        Observation::Protocol(obs) => {
            let mut problems = structural(obs, baseline);
            problems.extend(debug_signals(obs, baseline));
            problems
        }
    }
}

/// Protocol problems derivable without debug output.
///
/// Collectors use this to decide whether the debug fallback is needed.
pub fn structural(observation: &ProtocolObservation, baseline: &Baseline) -> Vec<Problem> {
    match observation.protocol {
        RoutingProtocol::Eigrp => eigrp::check(observation, baseline),
        RoutingProtocol::Ospf => ospf::check(observation, baseline),
    }
}

/// Problems named by captured debug output. First occurrence per signal.
fn debug_signals(observation: &ProtocolObservation, baseline: &Baseline) -> Vec<Problem> {
    let Some(log) = observation.debug_log.as_deref() else {
        return Vec::new();
    };
    let protocol = observation.protocol;

    scan_log(protocol, log)
        .into_iter()
        .filter_map(|found| {
            let kind = match found.signal {
                LogSignal::KValueMismatch => ProblemKind::KValueMismatch {
                    current: None,
                    expected: baseline.eigrp.as_ref()?.k_values,
                },
                LogSignal::AsMismatch => ProblemKind::EigrpAsMismatch {
                    current: None,
                    expected: baseline.eigrp.as_ref()?.as_number,
                },
                LogSignal::NotOnCommonSubnet { interface } => ProblemKind::WrongSubnet { interface },
                LogSignal::Authentication => ProblemKind::AuthenticationMismatch { protocol },
                LogSignal::StubPeer => ProblemKind::EigrpStubNeighbor,
                LogSignal::HelloMismatch => ProblemKind::OspfAdjacencyMismatch {
                    parameter: AdjacencyParameter::Hello,
                },
                LogSignal::DeadMismatch => ProblemKind::OspfAdjacencyMismatch {
                    parameter: AdjacencyParameter::Dead,
                },
                LogSignal::AreaMismatch => ProblemKind::OspfAdjacencyMismatch {
                    parameter: AdjacencyParameter::Area,
                },
                LogSignal::NetmaskMismatch => ProblemKind::OspfAdjacencyMismatch {
                    parameter: AdjacencyParameter::Netmask,
                },
                LogSignal::DuplicateRouterId => ProblemKind::DuplicateRouterId {
                    router_id: observation.router_id,
                },
            };
            Some(Problem::new(&baseline.hostname, kind, found.line))
        })
        .collect()
}

/// Passive-interface drift in both directions.
///
/// The baseline list is authoritative: an empty list expects no passive
/// interfaces.
fn passive_drift(
    device: &str,
    protocol: RoutingProtocol,
    expected: &[String],
    live: &[String],
    running: &RunningConfig,
) -> Vec<Problem> {
    let mut problems = Vec::new();
    for name in live {
        if !expected.iter().any(|e| same_interface(e, name)) {
            let statement = format!("passive-interface {}", name);
            problems.push(Problem::new(
                device,
                ProblemKind::PassiveInterface {
                    protocol,
                    interface: name.clone(),
                    should_be_passive: false,
                },
                running.line_or(&statement, statement.clone()),
            ));
        }
    }
    for name in expected {
        if !live.iter().any(|l| same_interface(l, name)) {
            problems.push(Problem::new(
                device,
                ProblemKind::PassiveInterface {
                    protocol,
                    interface: name.clone(),
                    should_be_passive: true,
                },
                format!("passive-interface {} not configured", name),
            ));
        }
    }
    problems
}

/// Network statement drift. An empty baseline set checks nothing.
fn network_drift<T: PartialEq>(
    device: &str,
    expected: &[T],
    live: &[T],
    running: &RunningConfig,
    wrap: impl Fn(&T) -> NetworkStatement,
) -> Vec<Problem> {
    if expected.is_empty() {
        return Vec::new();
    }
    let mut problems = Vec::new();
    for network in expected.iter().filter(|n| !live.contains(n)) {
        let statement = wrap(network);
        problems.push(Problem::new(
            device,
            ProblemKind::NetworkStatement {
                statement: statement.clone(),
                drift: SetDrift::Missing,
            },
            format!("{} not configured", statement),
        ));
    }
    for network in live.iter().filter(|n| !expected.contains(n)) {
        let statement = wrap(network);
        let text = statement.to_string();
        problems.push(Problem::new(
            device,
            ProblemKind::NetworkStatement {
                statement,
                drift: SetDrift::Extra,
            },
            running.line_or(&text, text.clone()),
        ));
    }
    problems
}
