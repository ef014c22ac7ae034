use std::cmp::Reverse;
use std::fmt;

use indexmap::IndexMap;

use crate::baseline::same_interface;
use crate::diff::{Category, Problem, ProblemType};
use crate::error::Failure;
use crate::fix::{FixPlan, FixResult};

/// Points a health score loses per problem.
const HEALTH_PENALTY: usize = 5;

/// Problems that take an interface out of service and so explain protocol
/// problems on the same device.
const ROOT_TYPES: [ProblemType; 3] = [
    ProblemType::InterfaceShutdown,
    ProblemType::IpAddressMismatch,
    ProblemType::MissingIpAddress,
];

fn health(problems: usize) -> u8 {
    100usize.saturating_sub(problems * HEALTH_PENALTY) as u8
}

/// Most urgent first; ties keep detection order.
fn prioritize<'a>(problems: impl Iterator<Item = &'a Problem>) -> Vec<&'a Problem> {
    let mut ordered: Vec<&Problem> = problems.collect();
    ordered.sort_by_key(|p| Reverse(p.rank()));
    ordered
}

/// Everything one device's scan produced.
#[derive(Debug, Clone, Default)]
pub struct DeviceScan {
    pub device: String,
    pub problems: Vec<Problem>,
    /// Connection, collection and worker failures. A device with a
    /// connection failure has no problems.
    pub failures: Vec<Failure>,
}

impl DeviceScan {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }

    /// Scanned completely and nothing drifted.
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty() && self.failures.is_empty()
    }

    /// Problems, most urgent first.
    pub fn prioritized(&self) -> Vec<&Problem> {
        prioritize(self.problems.iter())
    }

    /// 100 less 5 per problem, floored at 0. `None` when the device was
    /// never scanned, so an unreachable device does not read as healthy.
    pub fn health_score(&self) -> Option<u8> {
        let unscanned = self.failures.iter().any(|f| {
            matches!(
                f,
                Failure::Connection { .. } | Failure::Interrupted { .. } | Failure::Worker { .. }
            )
        });
        (!unscanned).then(|| health(self.problems.len()))
    }

    /// Protocol problems grouped under the interface problem most likely
    /// behind them.
    ///
    /// A protocol problem on the same interface, or one that names no
    /// interface, is related to every root on the device.
    pub fn correlations(&self) -> Vec<Correlation> {
        let roots = self
            .problems
            .iter()
            .filter(|p| ROOT_TYPES.contains(&p.problem_type()));

        let mut correlations = Vec::new();
        for root in roots {
            let interface = root.kind().interface();
            let related: Vec<Problem> = self
                .problems
                .iter()
                .filter(|p| p.category() != Category::Interface)
                .filter(|p| match p.kind().interface() {
                    Some(name) => interface.is_some_and(|i| same_interface(i, name)),
                    None => true,
                })
                .cloned()
                .collect();
            if !related.is_empty() {
                correlations.push(Correlation {
                    device: self.device.clone(),
                    root: root.clone(),
                    related,
                });
            }
        }
        correlations
    }
}

/// Protocol problems that likely follow from one interface problem.
#[derive(Debug, Clone)]
pub struct Correlation {
    pub device: String,
    pub root: Problem,
    pub related: Vec<Problem>,
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let related: Vec<String> = self
            .related
            .iter()
            .map(|p| p.problem_type().to_string())
            .collect();
        write!(
            f,
            "[{}] {} may explain: {}",
            self.device,
            self.root.kind(),
            related.join(", ")
        )
    }
}

/// Scan results keyed by device, in the order the devices were given.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    devices: IndexMap<String, DeviceScan>,
}

impl ScanReport {
    pub(crate) fn insert(&mut self, scan: DeviceScan) {
        self.devices.insert(scan.device.clone(), scan);
    }

    pub fn get(&self, device: &str) -> Option<&DeviceScan> {
        self.devices.get(device)
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceScan> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn problems(&self) -> impl Iterator<Item = &Problem> {
        self.devices.values().flat_map(|d| d.problems.iter())
    }

    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.devices.values().flat_map(|d| d.failures.iter())
    }

    pub fn problem_count(&self) -> usize {
        self.devices.values().map(|d| d.problems.len()).sum()
    }

    /// Every problem, most urgent first across devices.
    pub fn prioritized(&self) -> Vec<&Problem> {
        prioritize(self.problems())
    }

    pub fn correlations(&self) -> Vec<Correlation> {
        self.devices
            .values()
            .flat_map(DeviceScan::correlations)
            .collect()
    }

    /// Network-wide score: 100 less 5 per problem on any device.
    pub fn health_score(&self) -> u8 {
        health(self.problem_count())
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for scan in self.devices.values() {
            if scan.is_clean() {
                writeln!(f, "{}: no problems", scan.device)?;
                continue;
            }
            match scan.health_score() {
                Some(score) => writeln!(f, "{}: health {}/100", scan.device, score)?,
                None => writeln!(f, "{}: not scanned", scan.device)?,
            }
            for problem in scan.prioritized() {
                writeln!(f, "{}", problem)?;
                writeln!(f, "    evidence: {}", problem.evidence())?;
            }
            for failure in &scan.failures {
                writeln!(f, "{}", failure)?;
            }
        }
        for correlation in self.correlations() {
            writeln!(f, "{}", correlation)?;
        }
        write!(
            f,
            "{} problem(s) on {} device(s), health {}/100",
            self.problem_count(),
            self.devices.len(),
            self.health_score()
        )
    }
}

/// How one problem's fix ended.
#[derive(Debug, Clone)]
pub enum FixOutcome {
    /// Every line was accepted.
    Applied(FixResult),
    /// The device refused a line.
    Failed { result: FixResult, failure: Failure },
    /// No automatic fix exists.
    Manual(Failure),
    Declined,
    /// The operator skipped the device, or no session was open to it.
    Skipped,
}

impl FixOutcome {
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            FixOutcome::Failed { failure, .. } | FixOutcome::Manual(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, FixOutcome::Applied(_))
    }
}

/// One problem, the plan proposed for it and what happened.
#[derive(Debug, Clone)]
pub struct FixRecord {
    pub problem: Problem,
    pub plan: FixPlan,
    pub outcome: FixOutcome,
}

impl fmt::Display for FixRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            FixOutcome::Applied(result) => write!(
                f,
                "[{}] fixed {}: {}",
                result.device,
                self.problem.problem_type(),
                result.verification
            ),
            FixOutcome::Failed { failure, .. } | FixOutcome::Manual(failure) => {
                write!(f, "{}", failure)
            }
            FixOutcome::Declined => write!(
                f,
                "[{}] declined {}",
                self.problem.device(),
                self.problem.problem_type()
            ),
            FixOutcome::Skipped => write!(
                f,
                "[{}] skipped {}",
                self.problem.device(),
                self.problem.problem_type()
            ),
        }
    }
}

/// Scan results plus the fix records of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub scan: ScanReport,
    pub fixes: Vec<FixRecord>,
}
