use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;

use super::Collector;
use crate::baseline::{Baseline, parse_interface, stanzas};
use crate::config::ProtocolDefaults;
use crate::diff::Category;
use crate::error::CollectionFailure;
use crate::observe::{InterfaceObservation, Observation, parse_interface_brief};
use crate::session::Session;

const BRIEF_COMMAND: &str = "show ip interface brief";

/// Interface table plus the configuration of every up interface the
/// baseline addresses.
#[derive(Debug, Clone)]
pub struct InterfaceCollector {
    defaults: Arc<ProtocolDefaults>,
}

impl InterfaceCollector {
    pub fn new(defaults: Arc<ProtocolDefaults>) -> Self {
        Self { defaults }
    }
}

impl Collector for InterfaceCollector {
    fn category(&self) -> Category {
        Category::Interface
    }

    fn applies_to(&self, baseline: &Baseline) -> bool {
        !baseline.interfaces.is_empty()
    }

    async fn collect(
        &self,
        session: &mut Session,
        baseline: &Baseline,
    ) -> Result<Observation, CollectionFailure> {
        let settle = session.policy().settle;
        let interface_settle = session.policy().interface_settle;

        if !session.reset().await {
            return Err(CollectionFailure::Reset);
        }

        let brief = session.execute(BRIEF_COMMAND, interface_settle).await?;
        let table = parse_interface_brief(&brief.text);
        debug!("{}: {} interfaces in table", session.device(), table.len());

        let mut configs = IndexMap::new();
        for row in &table {
            if row.is_admin_down() {
                continue;
            }
            let addressed = baseline
                .interface(&row.name)
                .is_some_and(|i| i.address.is_some());
            if !addressed {
                continue;
            }

            let command = format!("show running-config interface {}", row.name);
            let output = session.execute_expecting(&command, settle, 0).await?;
            let stanza = stanzas(&output.text)
                .into_iter()
                .find(|s| s.header.starts_with("interface "));
            if let Some(stanza) = stanza {
                let config = parse_interface(&row.name, &stanza.body, &self.defaults);
                configs.insert(row.name.clone(), config);
            }
        }

        Ok(Observation::Interfaces(InterfaceObservation { table, configs }))
    }
}
