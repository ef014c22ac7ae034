use std::borrow::Cow;
use std::net::Ipv4Addr;

use crate::baseline::{Baseline, OspfBaseline, RoutingProtocol, same_interface};
use crate::observe::ProtocolObservation;

use super::problem::{NetworkStatement, Problem, ProblemKind, SetDrift};
use super::{network_drift, passive_drift};

struct Context<'a> {
    device: &'a str,
    observation: &'a ProtocolObservation,
    baseline: &'a Baseline,
    expected: &'a OspfBaseline,
    /// The live stanza with the expected process id; `None` when it differs.
    live: Option<Cow<'a, OspfBaseline>>,
}

type Check = fn(&Context<'_>) -> Vec<Problem>;

const CHECKS: [Check; 9] = [
    process_id,
    passive,
    stub_areas,
    networks,
    participation,
    timers,
    router_id,
    duplicate_router_id,
    areas,
];

pub(super) fn check(observation: &ProtocolObservation, baseline: &Baseline) -> Vec<Problem> {
    let Some(expected) = baseline.ospf.as_ref() else {
        return Vec::new();
    };

    let live = match observation.running.parsed.ospf.as_ref() {
        Some(live) if live.process_id == expected.process_id => Some(Cow::Borrowed(live)),
        Some(_) => None,
        None => Some(Cow::Owned(OspfBaseline::new(expected.process_id))),
    };

    let ctx = Context {
        device: &baseline.hostname,
        observation,
        baseline,
        expected,
        live,
    };
    CHECKS.iter().flat_map(|check| check(&ctx)).collect()
}

/// Area ids compare equal in decimal and dotted form (`0` == `0.0.0.0`).
fn same_area(a: &str, b: &str) -> bool {
    fn id(area: &str) -> Option<u32> {
        area.parse::<u32>()
            .ok()
            .or_else(|| area.parse::<Ipv4Addr>().ok().map(u32::from))
    }
    a == b || matches!((id(a), id(b)), (Some(x), Some(y)) if x == y)
}

fn process_id(ctx: &Context<'_>) -> Vec<Problem> {
    let Some(live) = ctx.observation.running.parsed.ospf.as_ref() else {
        return Vec::new();
    };
    if live.process_id == ctx.expected.process_id {
        return Vec::new();
    }
    vec![Problem::new(
        ctx.device,
        ProblemKind::OspfProcessMismatch {
            current: live.process_id,
            expected: ctx.expected.process_id,
        },
        ctx.observation
            .running
            .line_or("router ospf", format!("router ospf {}", live.process_id)),
    )]
}

fn passive(ctx: &Context<'_>) -> Vec<Problem> {
    let Some(live) = ctx.live.as_deref() else {
        return Vec::new();
    };
    passive_drift(
        ctx.device,
        RoutingProtocol::Ospf,
        &ctx.expected.passive_interfaces,
        &live.passive_interfaces,
        &ctx.observation.running,
    )
}

fn stub_areas(ctx: &Context<'_>) -> Vec<Problem> {
    let Some(live) = ctx.live.as_deref() else {
        return Vec::new();
    };
    let mut problems = Vec::new();
    for area in &live.stub_areas {
        if !ctx.expected.stub_areas.iter().any(|e| same_area(e, area)) {
            let statement = format!("area {} stub", area);
            problems.push(Problem::new(
                ctx.device,
                ProblemKind::OspfStubArea {
                    area: area.clone(),
                    should_be_stub: false,
                },
                ctx.observation.running.line_or(&statement, statement.clone()),
            ));
        }
    }
    for area in &ctx.expected.stub_areas {
        if !live.stub_areas.iter().any(|l| same_area(l, area)) {
            problems.push(Problem::new(
                ctx.device,
                ProblemKind::OspfStubArea {
                    area: area.clone(),
                    should_be_stub: true,
                },
                format!("area {} stub not configured", area),
            ));
        }
    }
    problems
}

fn networks(ctx: &Context<'_>) -> Vec<Problem> {
    let Some(live) = ctx.live.as_deref() else {
        return Vec::new();
    };
    network_drift(
        ctx.device,
        &ctx.expected.networks,
        &live.networks,
        &ctx.observation.running,
        |n| NetworkStatement::Ospf(n.clone()),
    )
}

/// Interfaces a configured network should enable but OSPF does not list.
///
/// An interface whose covering statement is missing is left to the network
/// check.
fn participation(ctx: &Context<'_>) -> Vec<Problem> {
    let (Some(live), Some(rows)) = (
        ctx.live.as_deref(),
        ctx.observation.enabled_interfaces.as_ref(),
    ) else {
        return Vec::new();
    };

    let mut problems = Vec::new();
    for interface in ctx.baseline.interfaces.values() {
        let Some(address) = interface.address.filter(|_| interface.expected_up()) else {
            continue;
        };
        let Some(network) = ctx.expected.network_for(address.ip) else {
            continue;
        };
        if !live.networks.contains(network) {
            continue;
        }
        let listed = rows
            .iter()
            .any(|row| row.address == address.ip || same_interface(&row.interface, &interface.name));
        if !listed {
            problems.push(Problem::new(
                ctx.device,
                ProblemKind::InterfaceNotInOspf {
                    interface: interface.name.clone(),
                    address: address.ip,
                    network: network.clone(),
                },
                format!(
                    "{} ({}) not listed in show ip ospf interface brief",
                    interface.name, address.ip
                ),
            ));
        }
    }
    problems
}

fn timers(ctx: &Context<'_>) -> Vec<Problem> {
    let mut problems = Vec::new();
    for (name, detail) in &ctx.observation.interfaces {
        let Some(expected) = ctx.baseline.interface(name) else {
            continue;
        };
        let hello = detail.hello.unwrap_or(expected.ospf_hello);
        let dead = detail.hold.unwrap_or(expected.ospf_dead);
        if hello != expected.ospf_hello || dead != expected.ospf_dead {
            problems.push(Problem::new(
                ctx.device,
                ProblemKind::OspfTimerMismatch {
                    interface: expected.name.clone(),
                    current_hello: hello,
                    current_dead: dead,
                    expected_hello: expected.ospf_hello,
                    expected_dead: expected.ospf_dead,
                },
                detail.line.clone(),
            ));
        }
    }
    problems
}

fn router_id(ctx: &Context<'_>) -> Vec<Problem> {
    let (Some(current), Some(expected)) = (ctx.observation.router_id, ctx.expected.router_id)
    else {
        return Vec::new();
    };
    if current == expected {
        return Vec::new();
    }
    let process = ctx
        .observation
        .running
        .parsed
        .ospf
        .as_ref()
        .map_or(ctx.expected.process_id, |o| o.process_id);
    vec![Problem::new(
        ctx.device,
        ProblemKind::RouterIdMismatch { current, expected },
        format!("Routing Process \"ospf {}\" with ID {}", process, current),
    )]
}

fn duplicate_router_id(ctx: &Context<'_>) -> Vec<Problem> {
    let Some(stuck) = ctx.observation.neighbors.stuck().next() else {
        return Vec::new();
    };
    vec![Problem::new(
        ctx.device,
        ProblemKind::DuplicateRouterId {
            router_id: ctx.observation.router_id,
        },
        format!(
            "neighbor {} {} on {}",
            stuck.id,
            stuck.state.as_deref().unwrap_or("INIT"),
            stuck.interface
        ),
    )]
}

/// Interface area against the area of the baseline statement covering its
/// address. Interfaces no baseline statement covers are not checked.
fn areas(ctx: &Context<'_>) -> Vec<Problem> {
    let mut problems = Vec::new();
    for (name, detail) in &ctx.observation.interfaces {
        let Some(current) = detail.area.as_deref() else {
            continue;
        };
        let Some(interface) = ctx.baseline.interface(name) else {
            continue;
        };
        let Some(network) = interface
            .address
            .and_then(|a| ctx.expected.network_for(a.ip))
        else {
            continue;
        };
        if !same_area(current, &network.area) {
            problems.push(Problem::new(
                ctx.device,
                ProblemKind::AreaMismatch {
                    interface: interface.name.clone(),
                    current: current.to_string(),
                    expected: network.area.clone(),
                },
                detail.line.clone(),
            ));
        }
    }
    problems
}
