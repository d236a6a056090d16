//! FixtureGPT Sync
//!
//! Routes fixture reads and writes between the local store and the hosted
//! fixture service according to the configured sync mode.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod remote;

pub use coordinator::{PersistReport, SyncCoordinator, WriteOutcome};
pub use remote::{HttpRemote, MemoryRemote, RemoteError, RemoteResult, RemoteTier};
