use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use super::Collector;
use crate::baseline::{Baseline, RoutingProtocol, parse_config};
use crate::config::ProtocolDefaults;
use crate::diff::{Category, structural};
use crate::error::CollectionFailure;
use crate::observe::{
    InterfaceDetail, NeighborFormat, NeighborTable, Observation, ProtocolObservation,
    RunningConfig, parse_eigrp_interface_detail, parse_ospf_interface_brief,
    parse_ospf_interface_detail, parse_router_id,
};
use crate::session::Session;

/// The commands and parsers that differ between routing protocols.
#[derive(Debug, Clone)]
pub struct ProtocolProfile {
    pub protocol: RoutingProtocol,
    pub neighbor_command: &'static str,
    pub neighbor_format: NeighborFormat,
    /// Per-interface detail; the interface name is appended.
    pub detail_command: &'static str,
    pub parse_detail: fn(&str) -> Option<InterfaceDetail>,
    /// Process summary carrying the router id.
    pub process_command: Option<&'static str>,
    /// Table of interfaces the protocol runs on.
    pub participation_command: Option<&'static str>,
    pub debug_command: &'static str,
    /// How long debug output is collected before `show logging`.
    pub debug_window: Duration,
}

impl ProtocolProfile {
    pub fn eigrp(debug_window: Duration) -> Self {
        Self {
            protocol: RoutingProtocol::Eigrp,
            neighbor_command: "show ip eigrp neighbors",
            neighbor_format: NeighborFormat::Eigrp,
            detail_command: "show ip eigrp interfaces detail",
            parse_detail: parse_eigrp_interface_detail,
            process_command: None,
            participation_command: None,
            debug_command: "debug eigrp packets",
            debug_window,
        }
    }

    pub fn ospf(debug_window: Duration) -> Self {
        Self {
            protocol: RoutingProtocol::Ospf,
            neighbor_command: "show ip ospf neighbor",
            neighbor_format: NeighborFormat::Ospf,
            detail_command: "show ip ospf interface",
            parse_detail: parse_ospf_interface_detail,
            process_command: Some("show ip ospf"),
            participation_command: Some("show ip ospf interface brief"),
            debug_command: "debug ip ospf adj",
            debug_window,
        }
    }
}

/// Routing protocol state: configuration, neighbors, per-interface detail
/// and, when the neighbor table is empty, a window of debug output.
#[derive(Debug, Clone)]
pub struct ProtocolCollector {
    profile: ProtocolProfile,
    defaults: Arc<ProtocolDefaults>,
}

impl ProtocolCollector {
    pub fn new(profile: ProtocolProfile, defaults: Arc<ProtocolDefaults>) -> Self {
        Self { profile, defaults }
    }

    pub fn profile(&self) -> &ProtocolProfile {
        &self.profile
    }

    /// Enable debugging, wait, read the log and switch debugging off.
    ///
    /// `no debug all` is sent whatever happened before it.
    async fn capture_debug(&self, session: &mut Session) -> Result<String, CollectionFailure> {
        let settle = session.policy().settle;
        info!(
            "{}: no {} neighbors, collecting debug output for {:?}",
            session.device(),
            self.profile.protocol,
            self.profile.debug_window
        );

        let log = match session
            .execute_expecting(self.profile.debug_command, settle, 0)
            .await
        {
            Ok(_) => {
                tokio::time::sleep(self.profile.debug_window).await;
                session.execute_expecting("show logging", settle, 0).await
            }
            Err(e) => Err(e),
        };

        session.disable_debugging().await;
        log.map(|output| output.text)
    }
}

impl Collector for ProtocolCollector {
    fn category(&self) -> Category {
        self.profile.protocol.into()
    }

    fn applies_to(&self, baseline: &Baseline) -> bool {
        baseline.runs(self.profile.protocol)
    }

    async fn collect(
        &self,
        session: &mut Session,
        baseline: &Baseline,
    ) -> Result<Observation, CollectionFailure> {
        let profile = &self.profile;
        let settle = session.policy().settle;
        let detail_settle = session.policy().detail_settle;

        if !session.reset().await {
            return Err(CollectionFailure::Reset);
        }

        let text = session.running_config().await?;
        let parsed = parse_config(&baseline.hostname, &text, &self.defaults);
        let mut observation =
            ProtocolObservation::new(profile.protocol, RunningConfig::new(text, parsed));

        // An empty table legitimately prints little more than the echo
        let neighbors = session
            .execute_expecting(profile.neighbor_command, settle, profile.neighbor_command.len())
            .await?;
        observation.neighbors = NeighborTable::parse(profile.neighbor_format, &neighbors.text);

        for interface in baseline.interfaces.values() {
            if interface.address.is_none() {
                continue;
            }
            let command = format!("{} {}", profile.detail_command, interface.name);
            let output = session.execute_expecting(&command, detail_settle, 0).await?;
            if let Some(detail) = (profile.parse_detail)(&output.text) {
                observation.interfaces.insert(interface.name.clone(), detail);
            }
        }

        if let Some(command) = profile.process_command {
            let output = session.execute_expecting(command, settle, 0).await?;
            observation.router_id = parse_router_id(&output.text);
        }
        if let Some(command) = profile.participation_command {
            let output = session.execute_expecting(command, settle, 0).await?;
            observation.enabled_interfaces = Some(parse_ospf_interface_brief(&output.text));
        }

        debug!(
            "{}: {} neighbors={} interfaces={}",
            session.device(),
            profile.protocol,
            observation.neighbors.len(),
            observation.interfaces.len()
        );

        if observation.neighbors.is_empty() && structural(&observation, baseline).is_empty() {
            observation.debug_log = Some(self.capture_debug(session).await?);
        }

        Ok(Observation::Protocol(observation))
    }
}
