//! FixtureGPT Core Types
//!
//! Pure types and logic with no I/O: call fingerprints, the fixture record,
//! and snapshot configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod fixture;

// Re-exports
pub use config::{MissPolicy, Mode, SnapshotConfig, SyncConfig, SyncMode};
pub use error::{CoreError, CoreResult};
pub use fingerprint::{Fingerprint, canonical_form, canonicalize};
pub use fixture::{Fixture, Payload, Tier};
