//! FixtureGPT Storage
//!
//! Durable fixture persistence keyed by `(name, fingerprint)`, plus the
//! inspection queries a presentation layer needs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fs;
pub mod inspect;
pub mod key;
pub mod memory;
pub mod store;

pub use fs::FsFixtureStore;
pub use inspect::{FixtureStats, FixtureSummary, estimated_cost, fixtures_named};
pub use key::{FixtureKey, sanitize_name};
pub use memory::MemoryFixtureStore;
pub use store::{FixtureIter, FixtureStore, StoreError, StoreResult, StoredFixture};
