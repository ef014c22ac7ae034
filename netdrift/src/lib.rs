//! # netdrift
//!
//! Async configuration-drift diagnosis and remediation for IOS-style routers
//! reached over unframed console shells.
//!
//! netdrift compares what a device is running against a known-good
//! baseline snapshot, reports each divergence as a typed [`Problem`] with
//! the source line it came from, and proposes a deterministic fix for it.
//!
//! ## Features
//!
//! - Telnet console and SSH transports over one byte-pump abstraction
//! - Settle-time command execution with mode tracking and session reset
//! - Baseline snapshots parsed into typed interface, EIGRP and OSPF records
//! - Interface, EIGRP and OSPF collectors with a debug-log fallback
//! - Pure diff and fix engines; fixes are applied only on approval
//! - Parallel scans over a bounded worker pool
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use netdrift::baseline::{BaselineStore, SnapshotFile};
//! use netdrift::orchestrator::{DeviceTarget, Orchestrator};
//! use netdrift::{DriftConfig, Endpoint};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netdrift::Error> {
//!     let config = DriftConfig::default();
//!     let store = BaselineStore::new(config.defaults.clone(), config.participation.clone());
//!     store.load_from(&SnapshotFile("stable.txt".into()))?;
//!
//!     let mut orchestrator = Orchestrator::new(config, Arc::new(store));
//!     let targets = [DeviceTarget::new("R1", Endpoint::telnet("192.168.56.10", 5001))];
//!
//!     let report = orchestrator.scan(&targets).await;
//!     println!("{}", report);
//!
//!     orchestrator.close_all().await;
//!     Ok(())
//! }
//! ```

pub mod baseline;
pub mod channel;
pub mod collect;
pub mod config;
pub mod diff;
pub mod error;
pub mod fix;
pub mod observe;
pub mod orchestrator;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use baseline::{Baseline, BaselineStore, KValues, RoutingProtocol};
pub use config::{DriftConfig, ProtocolDefaults, ScanPolicy, SessionPolicy};
pub use diff::{Problem, ProblemKind, ProblemType};
pub use error::{Error, Failure, Result};
pub use fix::{FixPlan, FixResult};
pub use orchestrator::{Approval, Decision, DeviceTarget, Orchestrator};
pub use session::{Mode, Session};
pub use transport::{AuthMethod, Endpoint};
