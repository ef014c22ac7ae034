use std::time::Duration;

use log::{debug, info, warn};

use super::{FixPlan, Verification};
use crate::baseline::{RoutingProtocol, same_interface};
use crate::collect::ProtocolProfile;
use crate::observe::{NeighborTable, parse_interface_brief};
use crate::session::Session;

/// Outcome of applying one plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixResult {
    pub device: String,
    /// Lines sent to the device, annotations excluded.
    pub commands_executed: Vec<String>,
    /// Post-fix state, for the operator to read.
    pub verification: String,
    /// The device accepted every line. Verification does not affect this.
    pub success: bool,
}

/// Send a plan's commands and report the state afterwards.
///
/// A fix counts as applied when every line was accepted. There is no
/// rollback: a line rejected halfway leaves the earlier lines in place.
pub async fn apply(session: &mut Session, plan: &FixPlan, verify_delay: Duration) -> FixResult {
    let device = session.device().to_string();
    if let Some(reason) = plan.manual_reason() {
        return FixResult {
            device,
            commands_executed: Vec::new(),
            verification: format!("not applied: {}", reason),
            success: false,
        };
    }

    let mut commands_executed: Vec<String> = plan
        .commands()
        .iter()
        .filter(|line| !line.trim_start().starts_with('#'))
        .cloned()
        .collect();

    info!("{}: applying {} line(s)", device, commands_executed.len());
    let mut success = session.execute_config(plan.commands()).await;
    for command in plan.exec_commands() {
        if !success {
            break;
        }
        commands_executed.push(command.clone());
        success = session.execute_confirmed(command, "yes").await;
    }
    if !success {
        warn!("{}: fix was not accepted", device);
        return FixResult {
            device,
            commands_executed,
            verification: "not verified: configuration was not accepted".to_string(),
            success,
        };
    }

    tokio::time::sleep(verify_delay).await;
    let verification = verify(session, plan.verification()).await;
    debug!("{}: {}", device, verification);

    FixResult {
        device,
        commands_executed,
        verification,
        success,
    }
}

/// Re-query interface and neighbor state into one readable line.
pub async fn verify(session: &mut Session, what: &Verification) -> String {
    let mut parts = Vec::new();
    session.reset().await;

    if let Some(interface) = &what.interface {
        let settle = session.policy().interface_settle;
        let part = match session.execute("show ip interface brief", settle).await {
            Ok(output) => parse_interface_brief(&output.text)
                .into_iter()
                .find(|row| same_interface(&row.name, interface))
                .map(|row| format!("{}: {}", interface, row.state_label()))
                .unwrap_or_else(|| format!("{}: not found", interface)),
            Err(e) => format!("{}: unverified ({})", interface, e),
        };
        parts.push(part);
    }

    if let Some(protocol) = what.protocol {
        parts.push(neighbor_summary(session, protocol).await);
    }

    if parts.is_empty() {
        "nothing to verify".to_string()
    } else {
        parts.join("; ")
    }
}

async fn neighbor_summary(session: &mut Session, protocol: RoutingProtocol) -> String {
    let profile = match protocol {
        RoutingProtocol::Eigrp => ProtocolProfile::eigrp(Duration::ZERO),
        RoutingProtocol::Ospf => ProtocolProfile::ospf(Duration::ZERO),
    };
    let settle = session.policy().settle;

    match session
        .execute_expecting(profile.neighbor_command, settle, 0)
        .await
    {
        Ok(output) => {
            let table = NeighborTable::parse(profile.neighbor_format, &output.text);
            if table.is_empty() {
                return format!("{}: no neighbors found", protocol);
            }
            let listed: Vec<String> = table
                .neighbors
                .iter()
                .map(|n| match &n.state {
                    Some(state) => format!("{} ({})", n.id, state),
                    None => n.address.to_string(),
                })
                .collect();
            format!("{} neighbors: {}", protocol, listed.join(", "))
        }
        Err(e) => format!("{}: unverified ({})", protocol, e),
    }
}
