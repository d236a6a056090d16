//! Process-wide default engine, configured from the environment on first use.

use crate::call::Call;
use crate::engine::Snapshotter;
use crate::error::ReplayMiss;
use fixturegpt_core::{SnapshotConfig, SyncMode};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

static GLOBAL: Lazy<Snapshotter> = Lazy::new(|| {
    let config = SnapshotConfig::from_env().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "invalid FixtureGPT environment, using defaults");
        SnapshotConfig::default()
    });
    tracing::debug!(mode = %config.mode, sync_mode = %config.sync.sync_mode, "snapshot engine initialized");
    Snapshotter::new(config)
});

/// The process-wide engine
#[must_use]
pub fn global() -> &'static Snapshotter {
    &GLOBAL
}

/// Run `call` through the process-wide engine; see [`Snapshotter::snapshot`]
///
/// # Errors
///
/// Returns the error of `f`, or a [`ReplayMiss`] under the strict miss policy
pub fn snapshot<T, E, F>(call: &Call, f: F) -> Result<T, E>
where
    T: Serialize + DeserializeOwned + fmt::Debug,
    E: From<ReplayMiss>,
    F: FnOnce() -> Result<T, E>,
{
    global().snapshot(call, f)
}

/// Enable remote sync on the process-wide engine for subsequent calls
pub fn configure_cloud_sync(api_key: impl Into<String>, sync_mode: SyncMode, endpoint: Option<&str>) {
    global().configure_remote(api_key, sync_mode, endpoint);
}
