//! Typed problems found by the checks.

use std::fmt;
use std::net::Ipv4Addr;

use crate::baseline::{InterfaceAddress, KValues, OspfNetwork, RoutingProtocol};

/// Which collector and check family a problem belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Interface,
    Eigrp,
    Ospf,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Interface, Category::Eigrp, Category::Ospf];

    pub fn name(self) -> &'static str {
        match self {
            Category::Interface => "interfaces",
            Category::Eigrp => "eigrp",
            Category::Ospf => "ospf",
        }
    }
}

impl From<RoutingProtocol> for Category {
    fn from(protocol: RoutingProtocol) -> Self {
        match protocol {
            RoutingProtocol::Eigrp => Category::Eigrp,
            RoutingProtocol::Ospf => Category::Ospf,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        })
    }
}

/// Direction of a set difference against the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetDrift {
    /// In the baseline, not on the device.
    Missing,
    /// On the device, not in the baseline.
    Extra,
}

/// A network statement of either protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NetworkStatement {
    Eigrp(Ipv4Addr),
    Ospf(OspfNetwork),
}

impl NetworkStatement {
    pub fn protocol(&self) -> RoutingProtocol {
        match self {
            NetworkStatement::Eigrp(_) => RoutingProtocol::Eigrp,
            NetworkStatement::Ospf(_) => RoutingProtocol::Ospf,
        }
    }
}

impl fmt::Display for NetworkStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkStatement::Eigrp(network) => write!(f, "network {}", network),
            NetworkStatement::Ospf(network) => write!(f, "network {}", network),
        }
    }
}

/// OSPF hello parameter named by a debug message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjacencyParameter {
    Hello,
    Dead,
    Area,
    Netmask,
}

/// What is wrong, with everything its fix needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProblemKind {
    InterfaceShutdown {
        interface: String,
    },
    IpAddressMismatch {
        interface: String,
        current: InterfaceAddress,
        expected: InterfaceAddress,
    },
    MissingIpAddress {
        interface: String,
        expected: InterfaceAddress,
    },
    EigrpAsMismatch {
        /// `None` when only a debug message reported it.
        current: Option<u32>,
        expected: u32,
    },
    EigrpStub {
        should_be_stub: bool,
    },
    PassiveInterface {
        protocol: RoutingProtocol,
        interface: String,
        should_be_passive: bool,
    },
    KValueMismatch {
        /// `None` when only a debug message reported it.
        current: Option<KValues>,
        expected: KValues,
    },
    NetworkStatement {
        statement: NetworkStatement,
        drift: SetDrift,
    },
    EigrpTimerMismatch {
        interface: String,
        current_hello: u32,
        current_hold: u32,
        expected_hello: u32,
        expected_hold: u32,
    },
    WrongSubnet {
        interface: Option<String>,
    },
    AuthenticationMismatch {
        protocol: RoutingProtocol,
    },
    EigrpStubNeighbor,
    OspfProcessMismatch {
        current: u32,
        expected: u32,
    },
    OspfStubArea {
        area: String,
        should_be_stub: bool,
    },
    InterfaceNotInOspf {
        interface: String,
        address: Ipv4Addr,
        network: OspfNetwork,
    },
    OspfTimerMismatch {
        interface: String,
        current_hello: u32,
        current_dead: u32,
        expected_hello: u32,
        expected_dead: u32,
    },
    RouterIdMismatch {
        current: Ipv4Addr,
        expected: Ipv4Addr,
    },
    DuplicateRouterId {
        router_id: Option<Ipv4Addr>,
    },
    AreaMismatch {
        interface: String,
        current: String,
        expected: String,
    },
    OspfAdjacencyMismatch {
        parameter: AdjacencyParameter,
    },
}

/// Fieldless problem type, for reports and tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemType {
    InterfaceShutdown,
    IpAddressMismatch,
    MissingIpAddress,
    AsMismatch,
    UnexpectedStub,
    MissingStub,
    UnexpectedPassiveInterface,
    MissingPassiveInterface,
    KValueMismatch,
    MissingNetwork,
    ExtraNetwork,
    EigrpTimerMismatch,
    WrongSubnet,
    AuthenticationMismatch,
    StubNeighborMismatch,
    ProcessIdMismatch,
    UnexpectedStubArea,
    MissingStubArea,
    InterfaceNotInOspf,
    OspfTimerMismatch,
    RouterIdMismatch,
    DuplicateRouterId,
    AreaMismatch,
    OspfHelloMismatch,
    OspfDeadMismatch,
    OspfAreaMismatch,
    NetmaskMismatch,
}

impl ProblemType {
    pub fn name(self) -> &'static str {
        match self {
            ProblemType::InterfaceShutdown => "interface shutdown",
            ProblemType::IpAddressMismatch => "ip address mismatch",
            ProblemType::MissingIpAddress => "missing ip address",
            ProblemType::AsMismatch => "as mismatch",
            ProblemType::UnexpectedStub => "stub configuration",
            ProblemType::MissingStub => "missing stub configuration",
            ProblemType::UnexpectedPassiveInterface => "passive interface",
            ProblemType::MissingPassiveInterface => "missing passive interface",
            ProblemType::KValueMismatch => "k-value mismatch",
            ProblemType::MissingNetwork => "missing network",
            ProblemType::ExtraNetwork => "extra network",
            ProblemType::EigrpTimerMismatch => "eigrp timer mismatch",
            ProblemType::WrongSubnet => "wrong subnet",
            ProblemType::AuthenticationMismatch => "authentication mismatch",
            ProblemType::StubNeighborMismatch => "stub neighbor mismatch",
            ProblemType::ProcessIdMismatch => "process id mismatch",
            ProblemType::UnexpectedStubArea => "unexpected stub area",
            ProblemType::MissingStubArea => "missing stub area",
            ProblemType::InterfaceNotInOspf => "interface not in ospf",
            ProblemType::OspfTimerMismatch => "ospf timer mismatch",
            ProblemType::RouterIdMismatch => "router id mismatch",
            ProblemType::DuplicateRouterId => "possible duplicate router id",
            ProblemType::AreaMismatch => "area mismatch",
            ProblemType::OspfHelloMismatch => "hello interval mismatch",
            ProblemType::OspfDeadMismatch => "dead interval mismatch",
            ProblemType::OspfAreaMismatch => "adjacency area mismatch",
            ProblemType::NetmaskMismatch => "netmask mismatch",
        }
    }

    /// Urgency within a severity, 10 most urgent. Types that break
    /// reachability outright rank above tuning drift.
    pub fn priority(self) -> u8 {
        match self {
            ProblemType::InterfaceShutdown | ProblemType::AsMismatch => 10,
            ProblemType::IpAddressMismatch
            | ProblemType::MissingIpAddress
            | ProblemType::NetmaskMismatch => 9,
            ProblemType::RouterIdMismatch | ProblemType::ProcessIdMismatch => 8,
            ProblemType::KValueMismatch
            | ProblemType::UnexpectedStub
            | ProblemType::MissingStub
            | ProblemType::UnexpectedStubArea
            | ProblemType::MissingStubArea
            | ProblemType::StubNeighborMismatch => 7,
            ProblemType::EigrpTimerMismatch
            | ProblemType::OspfTimerMismatch
            | ProblemType::OspfHelloMismatch
            | ProblemType::OspfDeadMismatch
            | ProblemType::MissingNetwork => 6,
            ProblemType::ExtraNetwork => 4,
            _ => 5,
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ProblemKind {
    pub fn problem_type(&self) -> ProblemType {
        match self {
            ProblemKind::InterfaceShutdown { .. } => ProblemType::InterfaceShutdown,
            ProblemKind::IpAddressMismatch { .. } => ProblemType::IpAddressMismatch,
            ProblemKind::MissingIpAddress { .. } => ProblemType::MissingIpAddress,
            ProblemKind::EigrpAsMismatch { .. } => ProblemType::AsMismatch,
            ProblemKind::EigrpStub { should_be_stub: true } => ProblemType::MissingStub,
            ProblemKind::EigrpStub { should_be_stub: false } => ProblemType::UnexpectedStub,
            ProblemKind::PassiveInterface {
                should_be_passive: true,
                ..
            } => ProblemType::MissingPassiveInterface,
            ProblemKind::PassiveInterface { .. } => ProblemType::UnexpectedPassiveInterface,
            ProblemKind::KValueMismatch { .. } => ProblemType::KValueMismatch,
            ProblemKind::NetworkStatement {
                drift: SetDrift::Missing,
                ..
            } => ProblemType::MissingNetwork,
            ProblemKind::NetworkStatement { .. } => ProblemType::ExtraNetwork,
            ProblemKind::EigrpTimerMismatch { .. } => ProblemType::EigrpTimerMismatch,
            ProblemKind::WrongSubnet { .. } => ProblemType::WrongSubnet,
            ProblemKind::AuthenticationMismatch { .. } => ProblemType::AuthenticationMismatch,
            ProblemKind::EigrpStubNeighbor => ProblemType::StubNeighborMismatch,
            ProblemKind::OspfProcessMismatch { .. } => ProblemType::ProcessIdMismatch,
            ProblemKind::OspfStubArea {
                should_be_stub: true,
                ..
            } => ProblemType::MissingStubArea,
            ProblemKind::OspfStubArea { .. } => ProblemType::UnexpectedStubArea,
            ProblemKind::InterfaceNotInOspf { .. } => ProblemType::InterfaceNotInOspf,
            ProblemKind::OspfTimerMismatch { .. } => ProblemType::OspfTimerMismatch,
            ProblemKind::RouterIdMismatch { .. } => ProblemType::RouterIdMismatch,
            ProblemKind::DuplicateRouterId { .. } => ProblemType::DuplicateRouterId,
            ProblemKind::AreaMismatch { .. } => ProblemType::AreaMismatch,
            ProblemKind::OspfAdjacencyMismatch { parameter } => match parameter {
                AdjacencyParameter::Hello => ProblemType::OspfHelloMismatch,
                AdjacencyParameter::Dead => ProblemType::OspfDeadMismatch,
                AdjacencyParameter::Area => ProblemType::OspfAreaMismatch,
                AdjacencyParameter::Netmask => ProblemType::NetmaskMismatch,
            },
        }
    }

    pub fn category(&self) -> Category {
        match self {
            ProblemKind::InterfaceShutdown { .. }
            | ProblemKind::IpAddressMismatch { .. }
            | ProblemKind::MissingIpAddress { .. } => Category::Interface,
            ProblemKind::EigrpAsMismatch { .. }
            | ProblemKind::EigrpStub { .. }
            | ProblemKind::KValueMismatch { .. }
            | ProblemKind::EigrpTimerMismatch { .. }
            | ProblemKind::WrongSubnet { .. }
            | ProblemKind::EigrpStubNeighbor => Category::Eigrp,
            ProblemKind::PassiveInterface { protocol, .. }
            | ProblemKind::AuthenticationMismatch { protocol } => (*protocol).into(),
            ProblemKind::NetworkStatement { statement, .. } => statement.protocol().into(),
            ProblemKind::OspfProcessMismatch { .. }
            | ProblemKind::OspfStubArea { .. }
            | ProblemKind::InterfaceNotInOspf { .. }
            | ProblemKind::OspfTimerMismatch { .. }
            | ProblemKind::RouterIdMismatch { .. }
            | ProblemKind::DuplicateRouterId { .. }
            | ProblemKind::AreaMismatch { .. }
            | ProblemKind::OspfAdjacencyMismatch { .. } => Category::Ospf,
        }
    }

    fn severity(&self) -> Severity {
        match self {
            ProblemKind::RouterIdMismatch { .. } => Severity::Low,
            ProblemKind::EigrpStub { .. }
            | ProblemKind::OspfStubArea { .. }
            | ProblemKind::PassiveInterface { .. }
            | ProblemKind::EigrpTimerMismatch { .. }
            | ProblemKind::OspfTimerMismatch { .. }
            | ProblemKind::EigrpStubNeighbor
            | ProblemKind::NetworkStatement {
                drift: SetDrift::Extra,
                ..
            } => Severity::Medium,
            _ => Severity::High,
        }
    }

    /// The interface the problem is about, if any.
    pub fn interface(&self) -> Option<&str> {
        match self {
            ProblemKind::InterfaceShutdown { interface }
            | ProblemKind::IpAddressMismatch { interface, .. }
            | ProblemKind::MissingIpAddress { interface, .. }
            | ProblemKind::PassiveInterface { interface, .. }
            | ProblemKind::EigrpTimerMismatch { interface, .. }
            | ProblemKind::InterfaceNotInOspf { interface, .. }
            | ProblemKind::OspfTimerMismatch { interface, .. }
            | ProblemKind::AreaMismatch { interface, .. } => Some(interface),
            ProblemKind::WrongSubnet { interface } => interface.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemKind::InterfaceShutdown { interface } => {
                write!(f, "{} is administratively down", interface)
            }
            ProblemKind::IpAddressMismatch {
                interface,
                current,
                expected,
            } => write!(f, "{} has {}, expected {}", interface, current, expected),
            ProblemKind::MissingIpAddress { interface, expected } => {
                write!(f, "{} has no address, expected {}", interface, expected)
            }
            ProblemKind::EigrpAsMismatch { current, expected } => match current {
                Some(current) => write!(f, "EIGRP AS {}, expected {}", current, expected),
                None => write!(f, "neighbor reports a different AS, expected {}", expected),
            },
            ProblemKind::EigrpStub { should_be_stub } => {
                if *should_be_stub {
                    f.write_str("EIGRP stub routing is not configured")
                } else {
                    f.write_str("EIGRP stub routing is configured but not expected")
                }
            }
            ProblemKind::PassiveInterface {
                protocol,
                interface,
                should_be_passive,
            } => {
                if *should_be_passive {
                    write!(f, "{} should be passive under {}", interface, protocol)
                } else {
                    write!(f, "{} is passive under {}", interface, protocol)
                }
            }
            ProblemKind::KValueMismatch { current, expected } => match current {
                Some(current) => write!(f, "K-values {}, expected {}", current, expected),
                None => write!(f, "neighbor reports K-value mismatch, expected {}", expected),
            },
            ProblemKind::NetworkStatement { statement, drift } => match drift {
                SetDrift::Missing => write!(f, "'{}' is missing", statement),
                SetDrift::Extra => write!(f, "'{}' is not in the baseline", statement),
            },
            ProblemKind::EigrpTimerMismatch {
                interface,
                current_hello,
                current_hold,
                expected_hello,
                expected_hold,
            } => write!(
                f,
                "{} hello/hold {}/{}, expected {}/{}",
                interface, current_hello, current_hold, expected_hello, expected_hold
            ),
            ProblemKind::WrongSubnet { interface } => match interface {
                Some(interface) => write!(f, "neighbor not on common subnet on {}", interface),
                None => f.write_str("neighbor not on common subnet"),
            },
            ProblemKind::AuthenticationMismatch { protocol } => {
                write!(f, "{} authentication mismatch", protocol)
            }
            ProblemKind::EigrpStubNeighbor => f.write_str("peer terminated over stub configuration"),
            ProblemKind::OspfProcessMismatch { current, expected } => {
                write!(f, "OSPF process {}, expected {}", current, expected)
            }
            ProblemKind::OspfStubArea {
                area,
                should_be_stub,
            } => {
                if *should_be_stub {
                    write!(f, "area {} should be stub", area)
                } else {
                    write!(f, "area {} is stub but not expected", area)
                }
            }
            ProblemKind::InterfaceNotInOspf {
                interface,
                address,
                network,
            } => write!(
                f,
                "{} ({}) is not running OSPF, expected via 'network {}'",
                interface, address, network
            ),
            ProblemKind::OspfTimerMismatch {
                interface,
                current_hello,
                current_dead,
                expected_hello,
                expected_dead,
            } => write!(
                f,
                "{} hello/dead {}/{}, expected {}/{}",
                interface, current_hello, current_dead, expected_hello, expected_dead
            ),
            ProblemKind::RouterIdMismatch { current, expected } => {
                write!(f, "router id {}, expected {}", current, expected)
            }
            ProblemKind::DuplicateRouterId { router_id } => match router_id {
                Some(id) => write!(f, "router id {} may be duplicated", id),
                None => f.write_str("duplicate router id reported"),
            },
            ProblemKind::AreaMismatch {
                interface,
                current,
                expected,
            } => write!(f, "{} in area {}, expected area {}", interface, current, expected),
            ProblemKind::OspfAdjacencyMismatch { parameter } => {
                let name = match parameter {
                    AdjacencyParameter::Hello => "hello interval",
                    AdjacencyParameter::Dead => "dead interval",
                    AdjacencyParameter::Area => "area",
                    AdjacencyParameter::Netmask => "netmask",
                };
                write!(f, "neighbor reports {} mismatch", name)
            }
        }
    }
}

/// One finding on one device. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    device: String,
    severity: Severity,
    evidence: String,
    kind: ProblemKind,
}

impl Problem {
    /// Build a problem; severity follows from the kind.
    pub fn new(device: impl Into<String>, kind: ProblemKind, evidence: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            severity: kind.severity(),
            evidence: evidence.into(),
            kind,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn kind(&self) -> &ProblemKind {
        &self.kind
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Sort key: severity first, then type priority. Greater is more urgent.
    pub fn rank(&self) -> (Severity, u8) {
        (self.severity, self.problem_type().priority())
    }

    /// The source line the problem was derived from.
    pub fn evidence(&self) -> &str {
        &self.evidence
    }

    pub fn problem_type(&self) -> ProblemType {
        self.kind.problem_type()
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.device,
            self.problem_type(),
            self.severity,
            self.kind
        )
    }
}
