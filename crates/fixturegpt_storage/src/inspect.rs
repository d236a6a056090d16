//! Inspection: statistics and per-name detail for presentation layers.

use crate::store::{FixtureStore, StoreResult};
use chrono::{DateTime, Utc};
use fixturegpt_core::{Fingerprint, Fixture};
use serde::Serialize;

/// One line of a fixture listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureSummary {
    /// Call label
    pub name: String,
    /// Call fingerprint
    pub fingerprint: Fingerprint,
    /// Capture time
    pub timestamp: DateTime<Utc>,
    /// Stored record size
    pub size_bytes: u64,
    /// Whether the response was stored as a string fallback
    pub fallback: bool,
}

/// Aggregate view of a store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureStats {
    /// Number of fixtures
    pub count: usize,
    /// Sum of record sizes
    pub total_bytes: u64,
    /// Recorded calls times the per-call cost weight
    pub estimated_cost: f64,
    /// Per-fixture summaries, ordered by name then timestamp
    pub fixtures: Vec<FixtureSummary>,
}

impl FixtureStats {
    /// Scan a store once and aggregate it
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be scanned
    pub fn collect(store: &dyn FixtureStore, cost_per_call: f64) -> StoreResult<Self> {
        let mut fixtures: Vec<FixtureSummary> = store
            .enumerate()?
            .map(|stored| FixtureSummary {
                name: stored.fixture.name,
                fingerprint: stored.fixture.fingerprint,
                timestamp: stored.fixture.timestamp,
                size_bytes: stored.size_bytes,
                fallback: stored.fixture.response.is_fallback(),
            })
            .collect();
        fixtures.sort_by(|a, b| a.name.cmp(&b.name).then(a.timestamp.cmp(&b.timestamp)));

        let count = fixtures.len();
        let total_bytes = fixtures.iter().map(|f| f.size_bytes).sum();

        Ok(Self {
            count,
            total_bytes,
            estimated_cost: estimated_cost(count, cost_per_call),
            fixtures,
        })
    }

    /// Whether the store holds no fixtures
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Cumulative cost of `calls` recorded calls
#[must_use]
pub fn estimated_cost(calls: usize, cost_per_call: f64) -> f64 {
    calls as f64 * cost_per_call
}

/// All fixtures recorded under `name`, oldest first
///
/// # Errors
///
/// Returns error if the store cannot be scanned
pub fn fixtures_named(store: &dyn FixtureStore, name: &str) -> StoreResult<Vec<Fixture>> {
    let mut matching: Vec<Fixture> = store
        .enumerate()?
        .map(|stored| stored.fixture)
        .filter(|fixture| fixture.name == name)
        .collect();
    matching.sort_by_key(|fixture| fixture.timestamp);
    Ok(matching)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFixtureStore;
    use fixturegpt_core::Payload;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn fixture(name: &str, arg: i64, response: Payload) -> Fixture {
        Fixture::new(name, vec![json!(arg)], BTreeMap::new(), response)
    }

    #[test]
    fn test_stats_empty_store() {
        let store = MemoryFixtureStore::new();
        let stats = FixtureStats::collect(&store, 0.002).unwrap();
        assert!(stats.is_empty());
        assert_eq!(stats.total_bytes, 0);
        assert_eq!(stats.estimated_cost, 0.0);
    }

    #[test]
    fn test_stats_counts_and_cost() {
        let store = MemoryFixtureStore::new();
        store.put(&fixture("search", 1, Payload::Json(json!([1, 2])))).unwrap();
        store.put(&fixture("search", 2, Payload::Json(json!([3])))).unwrap();
        store
            .put(&fixture("chat", 1, Payload::StringFallback("Opaque".to_string())))
            .unwrap();

        let stats = FixtureStats::collect(&store, 0.5).unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.estimated_cost - 1.5).abs() < f64::EPSILON);
        assert!(stats.total_bytes > 0);
        assert_eq!(stats.fixtures[0].name, "chat");
        assert!(stats.fixtures[0].fallback);
        assert!(!stats.fixtures[1].fallback);
    }

    #[test]
    fn test_fixtures_named() {
        let store = MemoryFixtureStore::new();
        store.put(&fixture("search", 1, Payload::Json(json!(1)))).unwrap();
        store.put(&fixture("search", 2, Payload::Json(json!(2)))).unwrap();
        store.put(&fixture("chat", 1, Payload::Json(json!(3)))).unwrap();

        let found = fixtures_named(&store, "search").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|f| f.name == "search"));
        assert!(found[0].timestamp <= found[1].timestamp);
        assert!(fixtures_named(&store, "missing").unwrap().is_empty());
    }

    #[test]
    fn test_estimated_cost() {
        assert_eq!(estimated_cost(0, 0.002), 0.0);
        assert!((estimated_cost(10, 0.002) - 0.02).abs() < 1e-12);
    }
}
