//! Snapshot configuration.
//!
//! Read once from `FIXTUREGPT_*` environment variables, then replaced as a
//! whole whenever it is reconfigured.

use crate::error::{CoreError, CoreResult};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default remote service origin
pub const DEFAULT_ENDPOINT: &str = "https://app.fixturegpt.com";
/// Default local fixture directory
pub const DEFAULT_FIXTURES_DIR: &str = "./fixtures";
/// Default cost weight of one avoided call, in USD
pub const DEFAULT_COST_PER_CALL: f64 = 0.002;
/// Default deadline for one remote operation
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(3);

/// Environment variable names
pub mod env {
    /// `record`, `replay`, or unset
    pub const MODE: &str = "FIXTUREGPT_MODE";
    /// `local`, `cloud`, or `both`
    pub const SYNC_MODE: &str = "FIXTUREGPT_SYNC_MODE";
    /// Remote tier secret
    pub const API_KEY: &str = "FIXTUREGPT_API_KEY";
    /// Remote tier origin
    pub const API_URL: &str = "FIXTUREGPT_API_URL";
    /// Local fixture directory
    pub const DIR: &str = "FIXTUREGPT_DIR";
    /// `record` or `fail`
    pub const MISS_POLICY: &str = "FIXTUREGPT_MISS_POLICY";
    /// Cost weight per recorded call
    pub const COST_PER_CALL: &str = "FIXTUREGPT_COST_PER_CALL";
    /// Remote deadline in milliseconds
    pub const REMOTE_TIMEOUT_MS: &str = "FIXTUREGPT_REMOTE_TIMEOUT_MS";
}

/// What a snapshot call does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Execute directly, no cache reads or writes
    #[default]
    Off,
    /// Execute live and persist the result
    Record,
    /// Prefer a persisted result
    Replay,
}

impl Mode {
    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Record => "record",
            Self::Replay => "replay",
        }
    }
}

impl FromStr for Mode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "off" | "unset" | "none" => Ok(Self::Off),
            "record" => Ok(Self::Record),
            "replay" => Ok(Self::Replay),
            _ => Err(CoreError::invalid_config(env::MODE, s)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which storage tiers take part in reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncMode {
    /// Local store only
    #[default]
    Local,
    /// Remote tier only
    Cloud,
    /// Local first, remote as fallback; writes go to both
    Both,
}

impl SyncMode {
    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
            Self::Both => "both",
        }
    }

    /// Whether the local store participates
    #[must_use]
    pub const fn uses_local(&self) -> bool {
        matches!(self, Self::Local | Self::Both)
    }

    /// Whether the remote tier participates
    #[must_use]
    pub const fn uses_remote(&self) -> bool {
        matches!(self, Self::Cloud | Self::Both)
    }
}

impl FromStr for SyncMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "cloud" => Ok(Self::Cloud),
            "both" => Ok(Self::Both),
            _ => Err(CoreError::invalid_config(env::SYNC_MODE, s)),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a replay does when no fixture is found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MissPolicy {
    /// Execute live and persist, as if recording
    #[default]
    RecordLive,
    /// Fail the call with a replay-miss error
    Fail,
}

impl FromStr for MissPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" | "live" => Ok(Self::RecordLive),
            "fail" | "strict" => Ok(Self::Fail),
            _ => Err(CoreError::invalid_config(env::MISS_POLICY, s)),
        }
    }
}

/// Storage topology and remote tier credentials
pub struct SyncConfig {
    /// Remote tier secret; the remote tier is disabled without one
    pub api_key: Option<SecretString>,
    /// Participating tiers
    pub sync_mode: SyncMode,
    /// Remote service origin
    pub endpoint: String,
    /// Deadline for one remote operation
    pub timeout: Duration,
}

impl SyncConfig {
    /// Local-only configuration
    #[must_use]
    pub fn local() -> Self {
        Self::default()
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    /// Set the sync mode
    #[must_use]
    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    /// Set the endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the remote deadline
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether an API key is configured
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// API key reduced to its first 8 characters, for display
    #[must_use]
    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| {
            let visible: String = key.expose_secret().chars().take(8).collect();
            format!("{visible}...")
        })
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            sync_mode: SyncMode::Local,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }
}

impl Clone for SyncConfig {
    fn clone(&self) -> Self {
        Self {
            api_key: self
                .api_key
                .as_ref()
                .map(|key| SecretString::from(key.expose_secret().to_owned())),
            sync_mode: self.sync_mode,
            endpoint: self.endpoint.clone(),
            timeout: self.timeout,
        }
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("sync_mode", &self.sync_mode)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Everything a snapshot engine needs to decide and persist
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Default mode for calls that do not override it
    pub mode: Mode,
    /// Storage topology
    pub sync: SyncConfig,
    /// Local fixture directory
    pub fixtures_dir: PathBuf,
    /// Replay-miss behavior
    pub miss_policy: MissPolicy,
    /// Cost weight of one recorded call, for statistics
    pub cost_per_call: f64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Off,
            sync: SyncConfig::default(),
            fixtures_dir: PathBuf::from(DEFAULT_FIXTURES_DIR),
            miss_policy: MissPolicy::RecordLive,
            cost_per_call: DEFAULT_COST_PER_CALL,
        }
    }
}

impl SnapshotConfig {
    /// Read configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an unrecognized value
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an unrecognized value
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(mode) = lookup(env::MODE) {
            config.mode = mode.parse()?;
        }
        if let Some(sync_mode) = lookup(env::SYNC_MODE) {
            config.sync.sync_mode = sync_mode.parse()?;
        }
        if let Some(key) = lookup(env::API_KEY).filter(|k| !k.trim().is_empty()) {
            config.sync.api_key = Some(SecretString::from(key));
        }
        if let Some(url) = lookup(env::API_URL).filter(|u| !u.trim().is_empty()) {
            config.sync.endpoint = url;
        }
        if let Some(dir) = lookup(env::DIR).filter(|d| !d.trim().is_empty()) {
            config.fixtures_dir = PathBuf::from(dir);
        }
        if let Some(policy) = lookup(env::MISS_POLICY) {
            config.miss_policy = policy.parse()?;
        }
        if let Some(cost) = lookup(env::COST_PER_CALL) {
            config.cost_per_call = cost
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|c| c.is_finite() && *c >= 0.0)
                .ok_or_else(|| CoreError::invalid_config(env::COST_PER_CALL, &cost))?;
        }
        if let Some(ms) = lookup(env::REMOTE_TIMEOUT_MS) {
            let millis = ms
                .trim()
                .parse::<u64>()
                .map_err(|_| CoreError::invalid_config(env::REMOTE_TIMEOUT_MS, &ms))?;
            config.sync.timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Set the default mode
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the storage topology
    #[must_use]
    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    /// Set the local fixture directory
    #[must_use]
    pub fn with_fixtures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixtures_dir = dir.into();
        self
    }

    /// Set the replay-miss behavior
    #[must_use]
    pub fn with_miss_policy(mut self, policy: MissPolicy) -> Self {
        self.miss_policy = policy;
        self
    }

    /// Set the per-call cost weight
    #[must_use]
    pub fn with_cost_per_call(mut self, cost: f64) -> Self {
        self.cost_per_call = cost;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = SnapshotConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.mode, Mode::Off);
        assert_eq!(config.sync.sync_mode, SyncMode::Local);
        assert_eq!(config.sync.endpoint, DEFAULT_ENDPOINT);
        assert!(!config.sync.has_api_key());
        assert_eq!(config.fixtures_dir, PathBuf::from(DEFAULT_FIXTURES_DIR));
        assert_eq!(config.miss_policy, MissPolicy::RecordLive);
        assert_eq!(config.sync.timeout, DEFAULT_REMOTE_TIMEOUT);
    }

    #[test]
    fn test_reads_all_variables() {
        let config = SnapshotConfig::from_lookup(lookup(&[
            (env::MODE, "REPLAY"),
            (env::SYNC_MODE, "both"),
            (env::API_KEY, "fgpt_live_0123456789"),
            (env::API_URL, "https://fixtures.internal"),
            (env::DIR, "/tmp/fx"),
            (env::MISS_POLICY, "fail"),
            (env::COST_PER_CALL, "0.01"),
            (env::REMOTE_TIMEOUT_MS, "250"),
        ]))
        .unwrap();

        assert_eq!(config.mode, Mode::Replay);
        assert_eq!(config.sync.sync_mode, SyncMode::Both);
        assert_eq!(
            config.sync.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("fgpt_live_0123456789".to_string())
        );
        assert_eq!(config.sync.endpoint, "https://fixtures.internal");
        assert_eq!(config.fixtures_dir, PathBuf::from("/tmp/fx"));
        assert_eq!(config.miss_policy, MissPolicy::Fail);
        assert!((config.cost_per_call - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.sync.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_unset_mode_spellings() {
        for spelling in ["", "unset", "OFF", " none "] {
            assert_eq!(spelling.parse::<Mode>().unwrap(), Mode::Off);
        }
    }

    #[test]
    fn test_rejects_unknown_values() {
        let err = SnapshotConfig::from_lookup(lookup(&[(env::MODE, "rewind")])).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidConfig {
                key: env::MODE.to_string(),
                value: "rewind".to_string(),
            }
        );
        assert!(SnapshotConfig::from_lookup(lookup(&[(env::SYNC_MODE, "mesh")])).is_err());
        assert!(SnapshotConfig::from_lookup(lookup(&[(env::COST_PER_CALL, "-1")])).is_err());
        assert!(SnapshotConfig::from_lookup(lookup(&[(env::REMOTE_TIMEOUT_MS, "soon")])).is_err());
    }

    #[test]
    fn test_sync_mode_tiers() {
        assert!(SyncMode::Local.uses_local() && !SyncMode::Local.uses_remote());
        assert!(!SyncMode::Cloud.uses_local() && SyncMode::Cloud.uses_remote());
        assert!(SyncMode::Both.uses_local() && SyncMode::Both.uses_remote());
    }

    #[test]
    fn test_api_key_never_printed() {
        let sync = SyncConfig::local().with_api_key("fgpt_secret_value");
        let debug = format!("{sync:?}");
        assert!(!debug.contains("fgpt_secret_value"));
        assert_eq!(sync.masked_api_key().as_deref(), Some("fgpt_sec..."));

        let cloned = sync.clone();
        assert_eq!(
            cloned.api_key.map(|k| k.expose_secret().to_string()),
            Some("fgpt_secret_value".to_string())
        );
    }
}
