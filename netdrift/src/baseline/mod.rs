//! Known-good device configuration.
//!
//! A snapshot is plain text with one `DEVICE: <name>` block per device. It
//! is parsed into [`Baseline`] records once per run and served from a
//! [`BaselineStore`].

mod model;
mod parse;
mod render;
mod store;

pub use model::{
    Baseline, EigrpBaseline, InterfaceAddress, InterfaceBaseline, KValues, OspfBaseline,
    OspfNetwork, RoutingProtocol, canonical_interface, same_interface,
};
pub use parse::{Stanza, parse_config, parse_interface, parse_snapshot, split_devices, stanzas};
pub use render::render_snapshot;
pub use store::{BaselineStore, SnapshotFile, SnapshotSource, StaticSnapshot};
