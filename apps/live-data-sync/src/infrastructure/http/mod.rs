//! HTTP Adapters
//!
//! `reqwest` implementation of [`SnapshotSource`](crate::application::ports::SnapshotSource)
//! and an in-memory mock serving the demo fixtures.

mod mock;
mod source;

pub use mock::MockSnapshotSource;
pub use source::HttpSnapshotSource;
