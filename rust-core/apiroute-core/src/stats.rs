//! # Invocation Statistics
//!
//! Counts API invocations globally and per route, and sums execution time per
//! route. Routes are keyed by `METHOD pattern`, so the key space is bounded by
//! the route table rather than by client paths.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Per-route counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteStats {
    /// Successful invocations
    pub invocations: u64,
    /// Failed invocations
    pub failures: u64,
    /// Sum of execution times of successful invocations, in milliseconds
    pub total_millis: u64,
    /// Longest successful execution, in milliseconds
    pub max_millis: u64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSnapshot {
    /// Invocations started, including failed ones
    pub total_invocations: u64,
    /// Counters per route
    pub routes: BTreeMap<String, RouteStats>,
}

/// Thread-safe invocation statistics
#[derive(Debug, Default)]
pub struct InvocationStats {
    total: AtomicU64,
    routes: Mutex<BTreeMap<String, RouteStats>>,
}

impl InvocationStats {
    /// Create empty statistics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_start(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_success(&self, route: &str, elapsed: Duration) {
        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let entry = routes.entry(route.to_string()).or_default();
        entry.invocations += 1;
        entry.total_millis = entry.total_millis.saturating_add(millis);
        entry.max_millis = entry.max_millis.max(millis);
    }

    pub(crate) fn record_failure(&self, route: &str) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes.entry(route.to_string()).or_default().failures += 1;
    }

    /// Invocations started so far
    #[must_use]
    pub fn total_invocations(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Counters for one route key (`METHOD pattern`)
    #[must_use]
    pub fn route(&self, route: &str) -> Option<RouteStats> {
        let routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes.get(route).copied()
    }

    /// Copy all counters
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        StatsSnapshot {
            total_invocations: self.total_invocations(),
            routes: routes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_success_and_failure() {
        let stats = InvocationStats::new();
        stats.record_start();
        stats.record_success("GET /a", Duration::from_millis(5));
        stats.record_start();
        stats.record_success("GET /a", Duration::from_millis(15));
        stats.record_start();
        stats.record_failure("GET /a");

        assert_eq!(stats.total_invocations(), 3);
        let a = stats.route("GET /a").unwrap();
        assert_eq!(a.invocations, 2);
        assert_eq!(a.failures, 1);
        assert_eq!(a.total_millis, 20);
        assert_eq!(a.max_millis, 15);
        assert!(stats.route("GET /b").is_none());
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = InvocationStats::new();
        stats.record_start();
        stats.record_success("PUT /r2o/{version:regex=v[0-9]+}/invoice", Duration::ZERO);
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["total_invocations"], 1);
        assert_eq!(
            json["routes"]["PUT /r2o/{version:regex=v[0-9]+}/invoice"]["invocations"],
            1
        );
    }
}
