//! Application Ports (Driven)
//!
//! Interfaces for the network collaborators the services depend on.
//! - `PushTransport`: opens push connections that yield decoded events
//! - `SnapshotSource`: fetches market snapshots and insights on demand

mod push_transport_port;
mod snapshot_source_port;

pub use push_transport_port::{PushConnection, PushEvent, PushTransport, TransportError};
pub use snapshot_source_port::{SnapshotSource, SourceEndpoint, SourceError};
