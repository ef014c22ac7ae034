//! Scanning many devices at once and fixing what was found.
//!
//! Scans run in parallel, one task and one [`Session`] per device, bounded
//! by `min(max_workers, devices)`. Workers append their results to one
//! shared map; a device that cannot be reached or whose worker dies is
//! reported as a [`Failure`] and never stops the others.
//!
//! Fixing is sequential. Each proposed plan goes through an [`Approval`]
//! and is applied over the session the scan left open. The orchestrator
//! owns those sessions and closes each of them exactly once.
//!
//! Cancelling [`Orchestrator::shutdown_token`] stops workers at their next
//! await point. A worker switches debugging off and hands its session back
//! before it ends, so an interrupted run still closes every session.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use netdrift::baseline::{BaselineStore, SnapshotFile};
//! use netdrift::orchestrator::{AutoApprove, DeviceTarget, Orchestrator};
//! use netdrift::{DriftConfig, Endpoint};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netdrift::Error> {
//!     let config = DriftConfig::from_path("netdrift.toml")?;
//!     let store = BaselineStore::new(config.defaults.clone(), config.participation.clone());
//!     store.load_from(&SnapshotFile("stable.txt".into()))?;
//!
//!     let targets = vec![DeviceTarget::new("R1", Endpoint::telnet("192.168.56.10", 5001))];
//!     let mut orchestrator = Orchestrator::new(config, Arc::new(store));
//!     if let Some(report) = orchestrator.run(&targets, &mut AutoApprove).await {
//!         println!("{}", report.scan);
//!     }
//!     Ok(())
//! }
//! ```

mod approval;
mod report;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use indexmap::IndexMap;
use log::{debug, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub use approval::{Approval, AutoApprove, Decision};
pub use report::{Correlation, DeviceScan, FixOutcome, FixRecord, RunReport, ScanReport};

use crate::baseline::{Baseline, BaselineStore, render_snapshot};
use crate::collect::CollectorSet;
use crate::config::{DriftConfig, ScanPolicy, SessionPolicy};
use crate::diff::Problem;
use crate::error::Failure;
use crate::fix::{self, FixPlan};
use crate::session::Session;
use crate::transport::Endpoint;

/// A device to scan and where to reach it.
#[derive(Debug, Clone)]
pub struct DeviceTarget {
    pub name: String,
    pub endpoint: Endpoint,
}

impl DeviceTarget {
    pub fn new(name: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            name: name.into(),
            endpoint,
        }
    }
}

/// Drives scans and fixes across a set of devices.
pub struct Orchestrator {
    session_policy: Arc<SessionPolicy>,
    scan_policy: ScanPolicy,
    collectors: Arc<CollectorSet>,
    store: Arc<BaselineStore>,
    sessions: IndexMap<String, Session>,
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(config: DriftConfig, store: Arc<BaselineStore>) -> Self {
        let collectors = CollectorSet::new(&config.scan, Arc::new(config.defaults));
        Self {
            session_policy: Arc::new(config.session),
            scan_policy: config.scan,
            collectors: Arc::new(collectors),
            store,
            sessions: IndexMap::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn store(&self) -> &BaselineStore {
        &self.store
    }

    /// Cancel this token to stop a scan or fix in progress.
    ///
    /// Scan workers stop at their next await point and report the device
    /// as [`Failure::Interrupted`]. Fixing stops before the next plan; a
    /// plan already being sent is finished. The token stays cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Devices with a session left open by a scan.
    pub fn open_sessions(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    /// Scan every target in parallel.
    ///
    /// The report lists devices in `targets` order. Sessions stay open for
    /// [`Orchestrator::fix`]; a device scanned again reuses its session.
    pub async fn scan(&mut self, targets: &[DeviceTarget]) -> ScanReport {
        let mut report = ScanReport::default();
        if targets.is_empty() {
            return report;
        }

        let workers = self.scan_policy.max_workers.max(1).min(targets.len());
        info!("Scanning {} device(s) with {} worker(s)", targets.len(), workers);
        let started = Instant::now();

        let permits = Arc::new(Semaphore::new(workers));
        let results: Arc<Mutex<IndexMap<String, DeviceScan>>> =
            Arc::new(Mutex::new(IndexMap::new()));
        let mut tasks = JoinSet::new();

        for target in targets {
            let worker = ScanWorker {
                target: target.clone(),
                session: self.sessions.shift_remove(&target.name),
                policy: self.session_policy.clone(),
                collectors: self.collectors.clone(),
                baseline: self.store.get(&target.name),
                shutdown: self.shutdown.clone(),
            };
            let permits = permits.clone();
            let results = results.clone();

            tasks.spawn(async move {
                let name = worker.target.name.clone();
                let permit = tokio::select! {
                    biased;
                    _ = worker.shutdown.cancelled() => None,
                    permit = permits.acquire_owned() => permit.ok(),
                };
                let Some(_permit) = permit else {
                    results
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(name.clone(), interrupted(&name));
                    return (name, worker.session);
                };
                let (scan, session) = match AssertUnwindSafe(worker.run()).catch_unwind().await {
                    Ok(done) => done,
                    Err(payload) => {
                        let reason = panic_reason(payload.as_ref());
                        warn!("{}: scan worker panicked: {}", name, reason);
                        let mut scan = DeviceScan::new(&name);
                        scan.failures.push(Failure::Worker {
                            device: name.clone(),
                            reason,
                        });
                        (scan, None)
                    }
                };
                results
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(name.clone(), scan);
                (name, session)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Some(session))) => {
                    self.sessions.insert(name, session);
                }
                Ok((_, None)) => {}
                Err(e) => warn!("Scan worker ended abnormally: {}", e),
            }
        }

        let mut results = results.lock().unwrap_or_else(PoisonError::into_inner);
        for target in targets {
            let scan = results.shift_remove(&target.name).unwrap_or_else(|| {
                let mut scan = DeviceScan::new(&target.name);
                scan.failures.push(Failure::Worker {
                    device: target.name.clone(),
                    reason: "worker did not report".to_string(),
                });
                scan
            });
            report.insert(scan);
        }

        info!(
            "Scan finished in {:?}: {} problem(s), {} failure(s)",
            started.elapsed(),
            report.problem_count(),
            report.failures().count()
        );
        report
    }

    /// Offer each problem's fix to `approval` and apply the accepted ones.
    ///
    /// Devices are handled in report order and each device's problems most
    /// urgent first, one at a time. Plans that need manual intervention are
    /// recorded without being offered.
    pub async fn fix<A: Approval>(&mut self, report: &ScanReport, approval: &mut A) -> Vec<FixRecord> {
        let verify_delay = self.scan_policy.verify_delay;
        let shutdown = self.shutdown.clone();
        let mut records = Vec::new();

        for scan in report.devices() {
            if scan.problems.is_empty() {
                continue;
            }
            let baseline = self.store.get(&scan.device);
            let mut session = self.sessions.get_mut(&scan.device);
            if session.is_none() {
                warn!("{}: no open session, fixes skipped", scan.device);
            }

            let mut skipping = false;
            for problem in scan.prioritized() {
                let plan = fix::plan(problem, &baseline);
                let outcome = match session.as_deref_mut() {
                    _ if plan.is_manual() => manual(problem, &plan),
                    _ if shutdown.is_cancelled() => FixOutcome::Skipped,
                    Some(session) if !skipping => {
                        match approval.decide(problem, &plan) {
                            Decision::Apply => {
                                apply_one(session, problem, &plan, verify_delay).await
                            }
                            Decision::Decline => FixOutcome::Declined,
                            Decision::SkipDevice => {
                                info!("{}: remaining fixes skipped", scan.device);
                                skipping = true;
                                FixOutcome::Skipped
                            }
                        }
                    }
                    _ => FixOutcome::Skipped,
                };
                records.push(FixRecord {
                    problem: problem.clone(),
                    plan,
                    outcome,
                });
            }
        }
        records
    }

    /// Running configuration of every device with an open session.
    pub async fn capture_running_configs(&mut self) -> Vec<(String, String)> {
        let mut configs = Vec::new();
        for (name, session) in self.sessions.iter_mut() {
            if !session.reset().await {
                warn!("{}: reset failed, running config not captured", name);
                continue;
            }
            match session.running_config().await {
                Ok(text) => configs.push((name.clone(), text)),
                Err(e) => warn!("{}: running config not captured: {}", name, e),
            }
        }
        configs
    }

    /// A stable snapshot of every open device, in the persisted format.
    pub async fn capture_snapshot(&mut self, timestamp: &str) -> String {
        let configs = self.capture_running_configs().await;
        info!("Captured running config of {} device(s)", configs.len());
        render_snapshot("Stable", timestamp, &configs)
    }

    /// Replace the baselines with a snapshot that has been persisted.
    pub fn refresh_baselines(&self, snapshot: &str) -> usize {
        self.store.reload(snapshot)
    }

    /// Scan, then fix with `approval`, then close every session.
    ///
    /// Returns `None` when interrupted with Ctrl-C; sessions are closed
    /// either way.
    pub async fn run<A: Approval>(
        &mut self,
        targets: &[DeviceTarget],
        approval: &mut A,
    ) -> Option<RunReport> {
        self.run_until(targets, approval, ctrl_c()).await
    }

    /// Like [`Orchestrator::run`], interrupted when `interrupt` completes.
    ///
    /// On interrupt the shutdown token is cancelled and the run waits for
    /// every worker to hand its session back before closing them all.
    pub async fn run_until<A, F>(
        &mut self,
        targets: &[DeviceTarget],
        approval: &mut A,
        interrupt: F,
    ) -> Option<RunReport>
    where
        A: Approval,
        F: Future<Output = ()>,
    {
        let shutdown = self.shutdown.clone();
        let report = {
            let work = self.scan_and_fix(targets, approval);
            tokio::pin!(work);
            let finished = tokio::select! {
                report = &mut work => Some(report),
                _ = interrupt => None,
            };
            match finished {
                Some(report) => report,
                None => {
                    warn!("Interrupted, waiting for workers to hand back their sessions");
                    shutdown.cancel();
                    work.await
                }
            }
        };
        self.close_all().await;
        (!shutdown.is_cancelled()).then_some(report)
    }

    async fn scan_and_fix<A: Approval>(
        &mut self,
        targets: &[DeviceTarget],
        approval: &mut A,
    ) -> RunReport {
        let scan = self.scan(targets).await;
        let fixes = self.fix(&scan, approval).await;
        RunReport { scan, fixes }
    }

    /// Close every open session.
    pub async fn close_all(&mut self) {
        let count = self.sessions.len();
        for (_, session) in self.sessions.drain(..) {
            session.close().await;
        }
        if count > 0 {
            debug!("Closed {} session(s)", count);
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if !self.sessions.is_empty() {
            warn!(
                "Orchestrator dropped with {} open session(s); call close_all()",
                self.sessions.len()
            );
        }
    }
}

/// Everything one scan task owns.
struct ScanWorker {
    target: DeviceTarget,
    session: Option<Session>,
    policy: Arc<SessionPolicy>,
    collectors: Arc<CollectorSet>,
    baseline: Arc<Baseline>,
    shutdown: CancellationToken,
}

impl ScanWorker {
    async fn run(self) -> (DeviceScan, Option<Session>) {
        let name = self.target.name;
        let mut scan = DeviceScan::new(&name);

        let existing = match self.session {
            Some(session) if session.is_alive() => Some(session),
            Some(session) => {
                session.close().await;
                None
            }
            None => None,
        };
        let mut session = match existing {
            Some(session) => session,
            None => {
                let opened = tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => None,
                    opened = Session::open(&name, &self.target.endpoint, self.policy) => Some(opened),
                };
                match opened {
                    Some(Ok(session)) => session,
                    Some(Err(e)) => {
                        warn!("{}: skipped: {}", name, e);
                        scan.failures.push(Failure::Connection {
                            device: name.clone(),
                            reason: e.to_string(),
                        });
                        return (scan, None);
                    }
                    None => return (interrupted(&name), None),
                }
            }
        };

        let findings = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            findings = self.collectors.scan(&mut session, &self.baseline) => Some(findings),
        };
        let Some(findings) = findings else {
            warn!("{}: scan interrupted, switching debugging off", name);
            session.disable_debugging().await;
            return (interrupted(&name), Some(session));
        };
        info!("{}: {} problem(s)", name, findings.problems.len());
        scan.problems = findings.problems;
        scan.failures = findings.failures;
        (scan, Some(session))
    }
}

fn interrupted(device: &str) -> DeviceScan {
    let mut scan = DeviceScan::new(device);
    scan.failures.push(Failure::Interrupted {
        device: device.to_string(),
    });
    scan
}

/// Completes on Ctrl-C. Never completes if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn manual(problem: &Problem, plan: &FixPlan) -> FixOutcome {
    let reason = plan.manual_reason().unwrap_or_default().to_string();
    info!("{}: {} needs manual intervention", problem.device(), problem.problem_type());
    FixOutcome::Manual(Failure::FixRejected {
        device: problem.device().to_string(),
        problem: problem.problem_type(),
        reason,
    })
}

async fn apply_one(
    session: &mut Session,
    problem: &Problem,
    plan: &FixPlan,
    verify_delay: Duration,
) -> FixOutcome {
    let result = fix::apply(session, plan, verify_delay).await;
    if result.success {
        info!("{}: fixed {}: {}", result.device, problem.problem_type(), result.verification);
        FixOutcome::Applied(result)
    } else {
        FixOutcome::Failed {
            failure: Failure::FixApply {
                device: result.device.clone(),
                problem: problem.problem_type(),
            },
            result,
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_string())
}
