//! FixtureGPT Replay
//!
//! Record/replay wrapper for expensive calls. A call is described by a name
//! and its arguments; depending on the mode it runs live, runs live and is
//! recorded, or is answered from a recorded fixture.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call;
pub mod engine;
pub mod error;
pub mod global;

pub use call::Call;
pub use engine::{Snapshotter, SnapshotterBuilder};
pub use error::ReplayMiss;
pub use global::{configure_cloud_sync, global, snapshot};
