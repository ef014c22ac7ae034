use std::borrow::Cow;

use crate::baseline::{Baseline, EigrpBaseline, RoutingProtocol};
use crate::observe::ProtocolObservation;

use super::problem::{NetworkStatement, Problem, ProblemKind};
use super::{network_drift, passive_drift};

struct Context<'a> {
    device: &'a str,
    observation: &'a ProtocolObservation,
    baseline: &'a Baseline,
    expected: &'a EigrpBaseline,
    /// The live stanza with the expected AS; `None` when the AS differs.
    live: Option<Cow<'a, EigrpBaseline>>,
}

type Check = fn(&Context<'_>) -> Vec<Problem>;

const CHECKS: [Check; 6] = [as_number, passive, stub, k_values, networks, timers];

pub(super) fn check(observation: &ProtocolObservation, baseline: &Baseline) -> Vec<Problem> {
    let Some(expected) = baseline.eigrp.as_ref() else {
        return Vec::new();
    };

    let live = match observation.running.parsed.eigrp.as_ref() {
        Some(live) if live.as_number == expected.as_number => Some(Cow::Borrowed(live)),
        Some(_) => None,
        None => Some(Cow::Owned(EigrpBaseline {
            k_values: expected.k_values,
            ..EigrpBaseline::new(expected.as_number)
        })),
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

fn as_number(ctx: &Context<'_>) -> Vec<Problem> {
    let Some(live) = ctx.observation.running.parsed.eigrp.as_ref() else {
        return Vec::new();
    };
    if live.as_number == ctx.expected.as_number {
        return Vec::new();
    }
    vec![Problem::new(
        ctx.device,
        ProblemKind::EigrpAsMismatch {
            current: Some(live.as_number),
            expected: ctx.expected.as_number,
        },
        ctx.observation
            .running
            .line_or("router eigrp", format!("router eigrp {}", live.as_number)),
    )]
}

fn passive(ctx: &Context<'_>) -> Vec<Problem> {
    let Some(live) = ctx.live.as_deref() else {
        return Vec::new();
    };
    passive_drift(
        ctx.device,
        RoutingProtocol::Eigrp,
        &ctx.expected.passive_interfaces,
        &live.passive_interfaces,
        &ctx.observation.running,
    )
}

fn stub(ctx: &Context<'_>) -> Vec<Problem> {
    let Some(live) = ctx.live.as_deref() else {
        return Vec::new();
    };
    if live.is_stub == ctx.expected.is_stub {
        return Vec::new();
    }
    let evidence = if live.is_stub {
        ctx.observation.running.line_or("eigrp stub", "eigrp stub")
    } else {
        "eigrp stub not configured".to_string()
    };
    vec![Problem::new(
        ctx.device,
        ProblemKind::EigrpStub {
            should_be_stub: ctx.expected.is_stub,
        },
        evidence,
    )]
}

fn k_values(ctx: &Context<'_>) -> Vec<Problem> {
    let Some(live) = ctx.live.as_deref() else {
        return Vec::new();
    };
    if live.k_values == ctx.expected.k_values {
        return Vec::new();
    }
    vec![Problem::new(
        ctx.device,
        ProblemKind::KValueMismatch {
            current: Some(live.k_values),
            expected: ctx.expected.k_values,
        },
        ctx.observation.running.line_or(
            "metric weights",
            format!("metric weights {} (default)", live.k_values),
        ),
    )]
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
        |n| NetworkStatement::Eigrp(*n),
    )
}

fn timers(ctx: &Context<'_>) -> Vec<Problem> {
    let mut problems = Vec::new();
    for (name, detail) in &ctx.observation.interfaces {
        let Some(expected) = ctx.baseline.interface(name) else {
            continue;
        };
        let hello = detail.hello.unwrap_or(expected.eigrp_hello);
        let hold = detail.hold.unwrap_or(expected.eigrp_hold);
        if hello != expected.eigrp_hello || hold != expected.eigrp_hold {
            problems.push(Problem::new(
                ctx.device,
                ProblemKind::EigrpTimerMismatch {
                    interface: expected.name.clone(),
                    current_hello: hello,
                    current_hold: hold,
                    expected_hello: expected.eigrp_hello,
                    expected_hold: expected.eigrp_hold,
                },
                detail.line.clone(),
            ));
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::parse_config;
    use crate::config::ProtocolDefaults;
    use crate::diff::{ProblemType, SetDrift};
    use crate::observe::{
        InterfaceDetail, NeighborFormat, NeighborTable, RunningConfig,
        parse_eigrp_interface_detail,
    };
    use std::net::Ipv4Addr;

    const BASELINE: &str = "\
hostname R1
!
interface Ethernet0/0
 ip address 10.1.1.1 255.255.255.0
 no shutdown
!
interface Ethernet0/1
 ip address 10.1.2.1 255.255.255.0
 no shutdown
!
router eigrp 1
 network 10.1.1.0
 network 10.1.2.0
 passive-interface Loopback0
!
end
";

    fn observe(running: &str) -> ProtocolObservation {
        let parsed = parse_config("R1", running, &ProtocolDefaults::default());
        let mut obs = ProtocolObservation::new(
            RoutingProtocol::Eigrp,
            RunningConfig::new(running.to_string(), parsed),
        );
        obs.neighbors = NeighborTable::parse(
            NeighborFormat::Eigrp,
            "0   10.1.1.2                Et0/0                    13 00:10:09    9   200  0  11",
        );
        obs
    }

    fn baseline() -> Baseline {
        parse_config("R1", BASELINE, &ProtocolDefaults::default())
    }

    #[test]
    fn test_matching_config_has_no_problems() {
        let mut obs = observe(BASELINE);
        obs.interfaces.insert(
            "Ethernet0/0".to_string(),
            parse_eigrp_interface_detail("  Hello-interval is 5, Hold-time is 15").unwrap(),
        );
        assert!(check(&obs, &baseline()).is_empty());
    }

    #[test]
    fn test_stanza_drift() {
        let running = "\
router eigrp 1
 network 10.1.1.0
 network 10.9.9.0
 passive-interface Loopback0
 passive-interface Ethernet0/1
 eigrp stub connected summary
 metric weights 0 2 0 1 0 0
!
end
";
        let problems = check(&observe(running), &baseline());
        let types: Vec<_> = problems.iter().map(|p| p.problem_type()).collect();
        assert_eq!(
            types,
            vec![
                ProblemType::UnexpectedPassiveInterface,
                ProblemType::UnexpectedStub,
                ProblemType::KValueMismatch,
                ProblemType::MissingNetwork,
                ProblemType::ExtraNetwork,
            ]
        );
        assert_eq!(problems[1].evidence(), "eigrp stub connected summary");
        assert_eq!(problems[2].evidence(), "metric weights 0 2 0 1 0 0");
        assert_eq!(
            problems[3].kind(),
            &ProblemKind::NetworkStatement {
                statement: NetworkStatement::Eigrp(Ipv4Addr::new(10, 1, 2, 0)),
                drift: SetDrift::Missing,
            }
        );
        assert_eq!(problems[4].evidence(), "network 10.9.9.0");
    }

    #[test]
    fn test_as_mismatch_skips_statement_checks() {
        let running = "router eigrp 100\n network 10.1.1.0\n!\nend\n";
        let problems = check(&observe(running), &baseline());
        assert_eq!(problems.len(), 1);
        assert_eq!(
            problems[0].kind(),
            &ProblemKind::EigrpAsMismatch {
                current: Some(100),
                expected: 1
            }
        );
        assert_eq!(problems[0].evidence(), "router eigrp 100");
    }

    #[test]
    fn test_missing_process_reports_networks() {
        let problems = check(&observe("end\n"), &baseline());
        let types: Vec<_> = problems.iter().map(|p| p.problem_type()).collect();
        assert_eq!(
            types,
            vec![
                ProblemType::MissingPassiveInterface,
                ProblemType::MissingNetwork,
                ProblemType::MissingNetwork,
            ]
        );
    }

    #[test]
    fn test_timer_mismatch() {
        let mut obs = observe(BASELINE);
        obs.interfaces.insert(
            "Ethernet0/1".to_string(),
            InterfaceDetail {
                hello: Some(60),
                hold: Some(180),
                area: None,
                line: "Hello-interval is 60, Hold-time is 180".to_string(),
            },
        );
        let problems = check(&obs, &baseline());
        assert_eq!(problems.len(), 1);
        assert_eq!(
            problems[0].kind(),
            &ProblemKind::EigrpTimerMismatch {
                interface: "Ethernet0/1".to_string(),
                current_hello: 60,
                current_hold: 180,
                expected_hello: 5,
                expected_hold: 15,
            }
        );
    }

    #[test]
    fn test_not_participating() {
        let baseline = parse_config("R4", "router ospf 10\n!\nend\n", &ProtocolDefaults::default());
        assert!(check(&observe("router eigrp 1\n!\nend\n"), &baseline).is_empty());
    }
}
