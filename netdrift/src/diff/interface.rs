//! Interface state against the baseline.

use crate::baseline::Baseline;
use crate::observe::InterfaceObservation;

use super::problem::{Problem, ProblemKind};

/// Shutdown and addressing checks.
///
/// Only interfaces present in both the table and the baseline are looked
/// at. Admin-down interfaces are reported when the baseline expects them up
/// and are not checked further.
pub fn check(observation: &InterfaceObservation, baseline: &Baseline) -> Vec<Problem> {
    let device = baseline.hostname.as_str();
    let mut problems = Vec::new();

    for row in &observation.table {
        let Some(expected) = baseline.interface(&row.name) else {
            continue;
        };

        if row.is_admin_down() {
            if expected.expected_up() {
                problems.push(Problem::new(
                    device,
                    ProblemKind::InterfaceShutdown {
                        interface: expected.name.clone(),
                    },
                    row.line.clone(),
                ));
            }
            continue;
        }

        let Some(expected_address) = expected.address else {
            continue;
        };
        let Some(live) = observation.configs.get(&row.name) else {
            continue;
        };
        match live.address {
            Some(current) if current != expected_address => problems.push(Problem::new(
                device,
                ProblemKind::IpAddressMismatch {
                    interface: expected.name.clone(),
                    current,
                    expected: expected_address,
                },
                format!("ip address {}", current),
            )),
            None => problems.push(Problem::new(
                device,
                ProblemKind::MissingIpAddress {
                    interface: expected.name.clone(),
                    expected: expected_address,
                },
                "no ip address",
            )),
            Some(_) => {}
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::{InterfaceAddress, parse_config, parse_interface};
    use crate::config::ProtocolDefaults;
    use crate::diff::ProblemType;
    use crate::observe::parse_interface_brief;
    use std::net::Ipv4Addr;

    const BASELINE: &str = "\
interface Ethernet0/0
 ip address 10.1.1.1 255.255.255.0
 no shutdown
!
interface Ethernet0/1
 ip address 10.1.2.1 255.255.255.0
 no shutdown
!
interface Ethernet0/2
 no ip address
 shutdown
!
end
";

    fn observation(brief: &str, configs: &[(&str, &[&str])]) -> InterfaceObservation {
        let defaults = ProtocolDefaults::default();
        InterfaceObservation {
            table: parse_interface_brief(brief),
            configs: configs
                .iter()
                .map(|(name, body)| (name.to_string(), parse_interface(name, body, &defaults)))
                .collect(),
        }
    }

    #[test]
    fn test_shutdown_reported() {
        let baseline = parse_config("R1", BASELINE, &ProtocolDefaults::default());
        let obs = observation(
            "\
Interface              IP-Address      OK? Method Status                Protocol
Ethernet0/0            10.1.1.1        YES NVRAM  administratively down down
Ethernet0/1            10.1.2.1        YES NVRAM  up                    up
Ethernet0/2            unassigned      YES NVRAM  administratively down down",
            &[("Ethernet0/1", &["ip address 10.1.2.1 255.255.255.0"])],
        );

        let problems = check(&obs, &baseline);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].problem_type(), ProblemType::InterfaceShutdown);
        assert_eq!(problems[0].kind().interface(), Some("Ethernet0/0"));
        assert!(problems[0].evidence().contains("administratively down"));
    }

    #[test]
    fn test_address_mismatch_and_missing() {
        let baseline = parse_config("R1", BASELINE, &ProtocolDefaults::default());
        let obs = observation(
            "\
Interface              IP-Address      OK? Method Status                Protocol
Ethernet0/0            10.1.1.9        YES manual up                    up
Ethernet0/1            unassigned      YES manual up                    down",
            &[
                ("Ethernet0/0", &["ip address 10.1.1.9 255.255.255.0"]),
                ("Ethernet0/1", &["no ip address"]),
            ],
        );

        let problems = check(&obs, &baseline);
        assert_eq!(problems.len(), 2);
        assert_eq!(
            problems[0].kind(),
            &ProblemKind::IpAddressMismatch {
                interface: "Ethernet0/0".to_string(),
                current: InterfaceAddress::new(
                    Ipv4Addr::new(10, 1, 1, 9),
                    Ipv4Addr::new(255, 255, 255, 0)
                ),
                expected: InterfaceAddress::new(
                    Ipv4Addr::new(10, 1, 1, 1),
                    Ipv4Addr::new(255, 255, 255, 0)
                ),
            }
        );
        assert_eq!(problems[0].evidence(), "ip address 10.1.1.9 255.255.255.0");
        assert_eq!(problems[1].problem_type(), ProblemType::MissingIpAddress);
    }

    #[test]
    fn test_unknown_interfaces_ignored() {
        let baseline = parse_config("R1", BASELINE, &ProtocolDefaults::default());
        let obs = observation(
            "\
Interface              IP-Address      OK? Method Status                Protocol
Ethernet0/3            unassigned      YES NVRAM  administratively down down
Loopback0              1.1.1.1         YES NVRAM  up                    up",
            &[],
        );
        assert!(check(&obs, &baseline).is_empty());
    }
}
