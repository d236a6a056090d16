//! Remote fixture tier.
//!
//! The remote service is an unreliable collaborator: every call is bounded by
//! a deadline and every failure comes back as a [`RemoteError`] value for the
//! coordinator to absorb.

use fixturegpt_core::{Fingerprint, Fixture, SyncConfig, Tier};
use fixturegpt_storage::{FixtureStore, MemoryFixtureStore};
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Remote result type
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote tier errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// No API key configured
    #[error("Remote tier has no API key configured")]
    MissingApiKey,

    /// Endpoint is not a usable base URL
    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// Configured endpoint
        endpoint: String,
        /// Why it was rejected
        reason: String,
    },

    /// Client runtime could not be started
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Connection failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Credentials rejected
    #[error("Remote rejected credentials (status {0})")]
    Unauthorized(u16),

    /// Unexpected status
    #[error("Remote service error (status {0})")]
    Status(u16),

    /// Response body did not hold a matching fixture
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A storage tier reached over the network
pub trait RemoteTier: Send + Sync {
    /// Fetch a fixture; `Ok(None)` is a clean miss
    ///
    /// # Errors
    ///
    /// Returns error if the remote cannot answer
    fn get(&self, name: &str, fingerprint: &Fingerprint) -> RemoteResult<Option<Fixture>>;

    /// Store a fixture, replacing any at the same key
    ///
    /// # Errors
    ///
    /// Returns error if the remote does not accept the write
    fn put(&self, fixture: &Fixture) -> RemoteResult<()>;
}

/// HTTP client for the fixture service.
///
/// `GET`/`PUT {endpoint}/api/fixtures/{name}/{fingerprint}` with bearer
/// authentication and the fixture record as JSON body. Calls block the
/// current thread on a private runtime. Called from inside another tokio
/// runtime, the request is driven on a short-lived worker thread instead.
pub struct HttpRemote {
    client: reqwest::Client,
    // `None` only while dropping.
    runtime: Option<tokio::runtime::Runtime>,
    base: Url,
    api_key: SecretString,
    timeout: Duration,
}

impl HttpRemote {
    /// Build a client from sync configuration
    ///
    /// # Errors
    ///
    /// Returns error if no API key is set, the endpoint is unusable, or the
    /// client cannot be constructed
    pub fn new(config: &SyncConfig) -> RemoteResult<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .map(|key| SecretString::from(key.expose_secret().to_owned()))
            .ok_or(RemoteError::MissingApiKey)?;

        let invalid = |reason: String| RemoteError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            reason,
        };
        let base = Url::parse(&config.endpoint).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .user_agent(concat!("fixturegpt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Connection(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RemoteError::Runtime(e.to_string()))?;

        Ok(Self {
            client,
            runtime: Some(runtime),
            base,
            api_key,
            timeout: config.timeout,
        })
    }

    /// URL of one fixture on the service
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint cannot take path segments
    pub fn fixture_url(&self, name: &str, fingerprint: &Fingerprint) -> RemoteResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::InvalidEndpoint {
                endpoint: self.base.to_string(),
                reason: "not a base URL".to_string(),
            })?
            .pop_if_empty()
            .extend(["api", "fixtures", name, &fingerprint.to_hex()]);
        Ok(url)
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn transport_error(&self, err: &reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout(self.timeout_ms())
        } else {
            RemoteError::Connection(err.to_string())
        }
    }

    /// Drive a request to completion under the deadline
    fn block_on<F, T>(&self, request: F) -> RemoteResult<T>
    where
        F: Future<Output = RemoteResult<T>> + Send,
        T: Send,
    {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| RemoteError::Runtime("runtime shut down".to_string()))?;
        let deadline = async { tokio::time::timeout(self.timeout, request).await };

        let outcome = if tokio::runtime::Handle::try_current().is_ok() {
            // Blocking a runtime thread on another runtime panics.
            std::thread::scope(|scope| {
                scope
                    .spawn(|| runtime.block_on(deadline))
                    .join()
                    .map_err(|_| RemoteError::Runtime("remote worker panicked".to_string()))
            })?
        } else {
            runtime.block_on(deadline)
        };
        outcome.unwrap_or_else(|_| Err(RemoteError::Timeout(self.timeout_ms())))
    }
}

impl Drop for HttpRemote {
    fn drop(&mut self) {
        // Dropping a runtime inside an async context panics; this does not.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

fn status_error(status: StatusCode) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized(status.as_u16()),
        other => RemoteError::Status(other.as_u16()),
    }
}

impl RemoteTier for HttpRemote {
    fn get(&self, name: &str, fingerprint: &Fingerprint) -> RemoteResult<Option<Fixture>> {
        let url = self.fixture_url(name, fingerprint)?;
        let request = self
            .client
            .get(url)
            .bearer_auth(self.api_key.expose_secret());

        let fixture = self.block_on(async {
            let response = request
                .send()
                .await
                .map_err(|e| self.transport_error(&e))?;
            match response.status() {
                StatusCode::NOT_FOUND => Ok(None),
                status if status.is_success() => response
                    .json::<Fixture>()
                    .await
                    .map(Some)
                    .map_err(|e| RemoteError::InvalidResponse(e.to_string())),
                status => Err(status_error(status)),
            }
        })?;

        match fixture {
            Some(fixture) if !fixture.is_keyed(name, fingerprint) => {
                Err(RemoteError::InvalidResponse(format!(
                    "asked for {name}-{}, got {}-{}",
                    fingerprint.short(),
                    fixture.name,
                    fixture.fingerprint.short()
                )))
            }
            other => Ok(other.map(|f| f.with_source(Tier::Cloud))),
        }
    }

    fn put(&self, fixture: &Fixture) -> RemoteResult<()> {
        let url = self.fixture_url(&fixture.name, &fixture.fingerprint)?;
        let request = self
            .client
            .put(url)
            .bearer_auth(self.api_key.expose_secret())
            .json(fixture);

        self.block_on(async {
            let response = request
                .send()
                .await
                .map_err(|e| self.transport_error(&e))?;
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(status_error(status))
            }
        })
    }
}

/// In-process remote tier with a reachability switch.
///
/// Stands in for the service when embedding or testing the coordinator.
#[derive(Debug)]
pub struct MemoryRemote {
    store: MemoryFixtureStore,
    reachable: AtomicBool,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl MemoryRemote {
    /// Create an empty, reachable remote
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: MemoryFixtureStore::new(),
            reachable: AtomicBool::new(true),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        }
    }

    /// Create a remote that fails every call
    #[must_use]
    pub fn unreachable() -> Self {
        let remote = Self::new();
        remote.set_reachable(false);
        remote
    }

    /// Toggle reachability
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Fixtures held
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether nothing is held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Number of `get` calls received
    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `put` calls received
    #[must_use]
    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> RemoteResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Connection("remote unreachable".to_string()))
        }
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteTier for MemoryRemote {
    fn get(&self, name: &str, fingerprint: &Fingerprint) -> RemoteResult<Option<Fixture>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        match self.store.get(name, fingerprint) {
            Ok(fixture) => Ok(Some(fixture.with_source(Tier::Cloud))),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(RemoteError::InvalidResponse(err.to_string())),
        }
    }

    fn put(&self, fixture: &Fixture) -> RemoteResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        self.store
            .put(fixture)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}
