//! Per-method call timing and concurrency tracking

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

/// Timing record of one method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeStatistic {
    /// Completed calls
    pub count: u64,
    /// Fastest call in milliseconds
    pub min_time: u64,
    /// Slowest call in milliseconds
    pub max_time: u64,
    /// Sum of all call times in milliseconds
    pub total_time: u64,
}

impl Default for TimeStatistic {
    fn default() -> Self {
        Self {
            count: 0,
            min_time: u64::MAX,
            max_time: 0,
            total_time: 0,
        }
    }
}

impl TimeStatistic {
    fn record(&mut self, elapsed_ms: u64) {
        self.count += 1;
        self.total_time = self.total_time.saturating_add(elapsed_ms);
        self.min_time = self.min_time.min(elapsed_ms);
        self.max_time = self.max_time.max(elapsed_ms);
    }

    /// Mean call time in milliseconds
    #[must_use]
    pub fn average_time(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_time as f64 / self.count as f64
        }
    }
}

#[derive(Debug)]
struct Concurrency {
    current: u64,
    max: u64,
    last_reset: DateTime<Utc>,
}

/// Point-in-time copy of an [`InvocationStatistics`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// Calls currently in flight
    pub concurrent_calls: u64,
    /// High-water mark of concurrent calls since the last reset
    pub max_concurrent_calls: u64,
    /// Time of the last reset
    pub last_reset_time: DateTime<Utc>,
    /// Records by method name
    pub methods: BTreeMap<String, TimeStatistic>,
}

/// Call statistics of one container.
///
/// Records live in a concurrent map with a lock per record, so concurrent
/// updates of different methods never contend and updates of the same
/// method are never lost.
#[derive(Debug)]
pub struct InvocationStatistics {
    methods: DashMap<String, Arc<Mutex<TimeStatistic>>>,
    concurrency: Mutex<Concurrency>,
}

impl Default for InvocationStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl InvocationStatistics {
    /// Create empty statistics
    pub fn new() -> Self {
        Self {
            methods: DashMap::new(),
            concurrency: Mutex::new(Concurrency {
                current: 0,
                max: 0,
                last_reset: Utc::now(),
            }),
        }
    }

    /// Record one completed call of `method` that took `elapsed_ms`
    pub fn update_stats(&self, method: &str, elapsed_ms: u64) {
        let existing = self.methods.get(method).map(|record| Arc::clone(record.value()));
        let record = match existing {
            Some(record) => record,
            None => Arc::clone(
                self.methods
                    .entry(method.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(TimeStatistic::default())))
                    .value(),
            ),
        };
        record.lock().record(elapsed_ms);
    }

    /// Mark a call as started
    pub fn call_in(&self) {
        let mut concurrency = self.concurrency.lock();
        concurrency.current += 1;
        concurrency.max = concurrency.max.max(concurrency.current);
    }

    /// Mark a call as finished
    pub fn call_out(&self) {
        let mut concurrency = self.concurrency.lock();
        concurrency.current = concurrency.current.saturating_sub(1);
    }

    /// Start a call; the returned guard calls [`call_out`](Self::call_out)
    /// when dropped
    #[must_use]
    pub fn enter(&self) -> CallGuard<'_> {
        self.call_in();
        CallGuard { stats: self }
    }

    /// Drop all method records and the concurrency high-water mark
    pub fn reset_stats(&self) {
        self.methods.clear();
        let mut concurrency = self.concurrency.lock();
        concurrency.max = concurrency.current;
        concurrency.last_reset = Utc::now();
        tracing::info!(last_reset = %concurrency.last_reset, "Invocation statistics reset");
    }

    /// Record of `method`
    #[must_use]
    pub fn method_stats(&self, method: &str) -> Option<TimeStatistic> {
        self.methods.get(method).map(|record| *record.lock())
    }

    /// Calls currently in flight
    #[must_use]
    pub fn concurrent_calls(&self) -> u64 {
        self.concurrency.lock().current
    }

    /// High-water mark of concurrent calls
    #[must_use]
    pub fn max_concurrent_calls(&self) -> u64 {
        self.concurrency.lock().max
    }

    /// Time of the last reset
    #[must_use]
    pub fn last_reset_time(&self) -> DateTime<Utc> {
        self.concurrency.lock().last_reset
    }

    /// Consistent copy of every record
    #[must_use]
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let methods = self
            .methods
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value().lock()))
            .collect();
        let concurrency = self.concurrency.lock();
        StatisticsSnapshot {
            concurrent_calls: concurrency.current,
            max_concurrent_calls: concurrency.max,
            last_reset_time: concurrency.last_reset,
            methods,
        }
    }

    /// XML summary with methods sorted by name
    #[must_use]
    pub fn to_xml(&self) -> String {
        let snapshot = self.snapshot();
        let mut xml = format!(
            "<InvocationStatistics concurrentCalls='{}' maxConcurrentCalls='{}'>\n",
            snapshot.concurrent_calls, snapshot.max_concurrent_calls
        );
        for (name, stat) in &snapshot.methods {
            let _ = writeln!(
                xml,
                "  <method name='{}' count='{}' minTime='{}' maxTime='{}' totalTime='{}' />",
                escape_xml(name),
                stat.count,
                stat.min_time,
                stat.max_time,
                stat.total_time
            );
        }
        xml.push_str("</InvocationStatistics>");
        xml
    }
}

impl fmt::Display for InvocationStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        let calls: u64 = snapshot.methods.values().map(|s| s.count).sum();
        write!(
            f,
            "InvocationStatistics(methods={}, calls={}, concurrent={}, maxConcurrent={}, lastReset={})",
            snapshot.methods.len(),
            calls,
            snapshot.concurrent_calls,
            snapshot.max_concurrent_calls,
            snapshot.last_reset_time.to_rfc3339()
        )
    }
}

/// Scope of one in-flight call
#[must_use = "dropping the guard ends the call immediately"]
pub struct CallGuard<'a> {
    stats: &'a InvocationStatistics,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.stats.call_out();
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_update_tracks_min_max_total() {
        let stats = InvocationStatistics::new();
        stats.update_stats("getTotal", 5);
        stats.update_stats("getTotal", 2);
        stats.update_stats("getTotal", 9);

        let record = stats.method_stats("getTotal").unwrap();
        assert_eq!(record.count, 3);
        assert_eq!(record.min_time, 2);
        assert_eq!(record.max_time, 9);
        assert_eq!(record.total_time, 16);
        assert!(stats.method_stats("other").is_none());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let stats = Arc::new(InvocationStatistics::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for i in 0..500 {
                        stats.update_stats(if i % 2 == 0 { "a" } else { "b" }, t);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.method_stats("a").unwrap().count, 2000);
        assert_eq!(stats.method_stats("b").unwrap().count, 2000);
        assert_eq!(stats.method_stats("a").unwrap().max_time, 7);
    }

    #[test]
    fn test_concurrency_high_water_mark_and_reset() {
        let stats = InvocationStatistics::new();
        {
            let _a = stats.enter();
            let _b = stats.enter();
            assert_eq!(stats.concurrent_calls(), 2);
        }
        assert_eq!(stats.concurrent_calls(), 0);
        assert_eq!(stats.max_concurrent_calls(), 2);

        stats.update_stats("m", 1);
        let before = stats.last_reset_time();
        stats.reset_stats();
        assert_eq!(stats.max_concurrent_calls(), 0);
        assert!(stats.method_stats("m").is_none());
        assert!(stats.last_reset_time() >= before);
    }

    #[test]
    fn test_xml_is_sorted_and_escaped() {
        let stats = InvocationStatistics::new();
        stats.update_stats("zeta", 1);
        stats.update_stats("alpha<T>", 3);
        let xml = stats.to_xml();
        let alpha = xml.find("alpha&lt;T&gt;").unwrap();
        let zeta = xml.find("zeta").unwrap();
        assert!(alpha < zeta);
        assert!(xml.starts_with("<InvocationStatistics concurrentCalls='0' maxConcurrentCalls='0'>"));
        assert!(xml.contains("count='1' minTime='3' maxTime='3' totalTime='3'"));
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = InvocationStatistics::new();
        stats.update_stats("m", 4);
        let json = serde_json::to_string(&stats.snapshot()).unwrap();
        let back: StatisticsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.methods["m"].count, 1);
        assert!(stats.to_string().contains("calls=1"));
    }
}
