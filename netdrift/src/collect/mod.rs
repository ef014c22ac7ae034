//! Collectors: command sequences that turn a session into observations.
//!
//! A collector issues show commands over a [`Session`] and parses what comes
//! back. It never judges the result; that is the diff engine's job.
//! Protocol differences live in [`ProtocolProfile`] data, so EIGRP and OSPF
//! share one command flow.

mod interface;
mod protocol;

use std::future::Future;
use std::sync::Arc;

use log::{debug, warn};

pub use interface::InterfaceCollector;
pub use protocol::{ProtocolCollector, ProtocolProfile};

use crate::baseline::{Baseline, RoutingProtocol};
use crate::config::{ProtocolDefaults, ScanPolicy};
use crate::diff::{Category, Problem, diff};
use crate::error::{CollectionFailure, Failure};
use crate::observe::Observation;
use crate::session::Session;

/// One category of state gathered from a device.
pub trait Collector: Send + Sync {
    fn category(&self) -> Category;

    /// Whether the collector has anything to check for this baseline.
    fn applies_to(&self, _baseline: &Baseline) -> bool {
        true
    }

    /// Gather the observation for one device.
    fn collect(
        &self,
        session: &mut Session,
        baseline: &Baseline,
    ) -> impl Future<Output = Result<Observation, CollectionFailure>> + Send;

    /// Collect, then compare with the baseline.
    fn scan(
        &self,
        session: &mut Session,
        baseline: &Baseline,
    ) -> impl Future<Output = Result<Vec<Problem>, CollectionFailure>> + Send {
        async move {
            let observation = self.collect(session, baseline).await?;
            Ok(diff(&observation, baseline))
        }
    }
}

/// Problems and skipped categories for one device.
#[derive(Debug, Default)]
pub struct Findings {
    pub problems: Vec<Problem>,
    pub failures: Vec<Failure>,
}

/// The collectors enabled for a run, in check order.
#[derive(Debug, Clone)]
pub struct CollectorSet {
    interfaces: Option<InterfaceCollector>,
    protocols: Vec<ProtocolCollector>,
}

impl CollectorSet {
    pub fn new(policy: &ScanPolicy, defaults: Arc<ProtocolDefaults>) -> Self {
        let interfaces = policy
            .check_interfaces
            .then(|| InterfaceCollector::new(defaults.clone()));

        let mut protocols = Vec::new();
        if policy.check_eigrp {
            protocols.push(ProtocolCollector::new(
                ProtocolProfile::eigrp(policy.eigrp_debug_window),
                defaults.clone(),
            ));
        }
        if policy.check_ospf {
            protocols.push(ProtocolCollector::new(
                ProtocolProfile::ospf(policy.ospf_debug_window),
                defaults,
            ));
        }
        Self {
            interfaces,
            protocols,
        }
    }

    /// The protocol collector for `protocol`, if enabled.
    pub fn protocol(&self, protocol: RoutingProtocol) -> Option<&ProtocolCollector> {
        self.protocols
            .iter()
            .find(|c| c.profile().protocol == protocol)
    }

    pub fn interfaces(&self) -> Option<&InterfaceCollector> {
        self.interfaces.as_ref()
    }

    /// Run every applicable collector against one device.
    ///
    /// A failing collector skips its category only; the others still run.
    pub async fn scan(&self, session: &mut Session, baseline: &Baseline) -> Findings {
        let mut findings = Findings::default();
        if let Some(collector) = &self.interfaces {
            run_one(collector, session, baseline, &mut findings).await;
        }
        for collector in &self.protocols {
            run_one(collector, session, baseline, &mut findings).await;
        }
        findings
    }
}

async fn run_one<C: Collector>(
    collector: &C,
    session: &mut Session,
    baseline: &Baseline,
    findings: &mut Findings,
) {
    let category = collector.category();
    if !collector.applies_to(baseline) {
        debug!("{}: no {} baseline, skipping", session.device(), category);
        return;
    }
    match collector.scan(session, baseline).await {
        Ok(problems) => {
            debug!(
                "{}: {} check found {} problem(s)",
                session.device(),
                category,
                problems.len()
            );
            findings.problems.extend(problems);
        }
        Err(e) => {
            warn!("{}: {} checks skipped: {}", session.device(), category, e);
            findings.failures.push(Failure::Collection {
                device: session.device().to_string(),
                category,
                reason: e.to_string(),
            });
        }
    }
}
