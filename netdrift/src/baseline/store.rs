//! Cached baselines for a run.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use log::{debug, info, warn};

use super::model::{Baseline, EigrpBaseline, OspfBaseline, RoutingProtocol};
use super::parse::parse_snapshot;
use crate::config::{Participation, ProtocolDefaults};
use crate::error::BaselineError;

/// Where snapshots come from. Persistence and versioning live elsewhere;
/// the store only asks for the newest snapshot text.
pub trait SnapshotSource: Send + Sync {
    /// The newest snapshot, or `None` if none has been taken yet.
    fn latest(&self) -> Result<Option<String>, BaselineError>;
}

/// An in-memory snapshot.
#[derive(Debug, Clone)]
pub struct StaticSnapshot(pub String);

impl SnapshotSource for StaticSnapshot {
    fn latest(&self) -> Result<Option<String>, BaselineError> {
        Ok(Some(self.0.clone()))
    }
}

/// A snapshot file on disk. A missing file means "no snapshot yet".
#[derive(Debug, Clone)]
pub struct SnapshotFile(pub PathBuf);

impl SnapshotSource for SnapshotFile {
    fn latest(&self) -> Result<Option<String>, BaselineError> {
        match std::fs::read_to_string(&self.0) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Parsed baselines, loaded once per run.
///
/// The store is passed explicitly to whoever needs it; there is no global
/// cache. It is only refreshed through [`BaselineStore::reload`], after a
/// new snapshot has been persisted.
#[derive(Debug)]
pub struct BaselineStore {
    defaults: ProtocolDefaults,
    participation: Participation,
    baselines: RwLock<IndexMap<String, Arc<Baseline>>>,
}

impl BaselineStore {
    pub fn new(defaults: ProtocolDefaults, participation: Participation) -> Self {
        Self {
            defaults,
            participation,
            baselines: RwLock::new(IndexMap::new()),
        }
    }

    /// Load the newest snapshot from `source`. Returns the device count.
    pub fn load_from(&self, source: &dyn SnapshotSource) -> Result<usize, BaselineError> {
        match source.latest()? {
            Some(text) => Ok(self.reload(&text)),
            None => {
                warn!("No baseline snapshot available; every device gets an empty baseline");
                Ok(0)
            }
        }
    }

    /// Replace the cache with the devices found in `snapshot`.
    pub fn reload(&self, snapshot: &str) -> usize {
        let parsed: IndexMap<String, Arc<Baseline>> = parse_snapshot(snapshot, &self.defaults)
            .into_iter()
            .map(|(name, mut baseline)| {
                self.apply_participation(&mut baseline);
                (name, Arc::new(baseline))
            })
            .collect();

        let count = parsed.len();
        *self
            .baselines
            .write()
            .unwrap_or_else(PoisonError::into_inner) = parsed;
        info!("Loaded baselines for {} devices", count);
        count
    }

    /// Baseline for `device`; an empty baseline when none was recorded.
    pub fn get(&self, device: &str) -> Arc<Baseline> {
        let baselines = self.baselines.read().unwrap_or_else(PoisonError::into_inner);
        let found = baselines.get(device).or_else(|| {
            baselines
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(device))
                .map(|(_, b)| b)
        });
        match found {
            Some(baseline) => baseline.clone(),
            None => {
                debug!("No baseline recorded for {}", device);
                Arc::new(Baseline::empty(device))
            }
        }
    }

    /// Device names in snapshot order.
    pub fn devices(&self) -> Vec<String> {
        self.baselines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    pub fn defaults(&self) -> &ProtocolDefaults {
        &self.defaults
    }

    /// Give listed devices a default stanza when their block has none.
    fn apply_participation(&self, baseline: &mut Baseline) {
        let device = baseline.hostname.clone();
        if baseline.eigrp.is_none() && self.participation.lists(RoutingProtocol::Eigrp, &device) {
            let mut eigrp = EigrpBaseline::new(self.defaults.eigrp_as);
            eigrp.k_values = self.defaults.k_values;
            baseline.eigrp = Some(eigrp);
        }
        if baseline.ospf.is_none() && self.participation.lists(RoutingProtocol::Ospf, &device) {
            let mut ospf = OspfBaseline::new(self.defaults.ospf_process);
            ospf.router_id = self.defaults.router_id(&device);
            baseline.ospf = Some(ospf);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::baseline::render_snapshot;

    fn snapshot() -> String {
        render_snapshot(
            "Stable",
            "2026-10-19 09:30:00",
            &[
                ("R1", "interface Ethernet0/0\n ip address 10.1.1.1 255.255.255.0\n!\nrouter eigrp 1\n network 10.1.1.0\n!\nend"),
                ("R4", "interface Ethernet0/0\n ip address 10.4.4.4 255.255.255.0\n!\nend"),
            ],
        )
    }

    fn store() -> BaselineStore {
        let mut defaults = ProtocolDefaults::default();
        defaults.router_ids.insert("R4".to_string(), Ipv4Addr::new(4, 4, 4, 4));
        let participation = Participation {
            eigrp: vec!["R1".to_string()],
            ospf: vec!["R4".to_string()],
        };
        BaselineStore::new(defaults, participation)
    }

    #[test]
    fn test_load_and_get() {
        let store = store();
        assert_eq!(store.load_from(&StaticSnapshot(snapshot())).unwrap(), 2);
        assert_eq!(store.devices(), vec!["R1", "R4"]);

        let r1 = store.get("R1");
        assert_eq!(r1.eigrp.as_ref().unwrap().networks.len(), 1);
        assert!(r1.ospf.is_none());
        assert!(Arc::ptr_eq(&r1, &store.get("r1")));
    }

    #[test]
    fn test_participation_adds_default_stanza() {
        let store = store();
        store.reload(&snapshot());

        let r4 = store.get("R4");
        let ospf = r4.ospf.as_ref().unwrap();
        assert_eq!(ospf.process_id, 10);
        assert!(ospf.networks.is_empty());
        assert_eq!(ospf.router_id, Some(Ipv4Addr::new(4, 4, 4, 4)));
        assert!(r4.eigrp.is_none());
    }

    #[test]
    fn test_missing_device_is_empty() {
        let store = store();
        store.reload(&snapshot());
        let r9 = store.get("R9");
        assert_eq!(*r9, Baseline::empty("R9"));
    }

    #[test]
    fn test_reload_replaces_cache() {
        let store = store();
        store.reload(&snapshot());
        let count = store.reload("DEVICE: R2\n====\nhostname R2\n");
        assert_eq!(count, 1);
        assert_eq!(store.devices(), vec!["R2"]);
        assert!(store.get("R1").interfaces.is_empty());
    }

    #[test]
    fn test_missing_snapshot_file() {
        let store = store();
        let source = SnapshotFile(PathBuf::from("/nonexistent/stable.txt"));
        assert_eq!(store.load_from(&source).unwrap(), 0);
        assert!(store.is_empty());
    }
}
