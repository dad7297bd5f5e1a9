//! In-process metrics registry.
//!
//! Counters and histograms are plain atomics stored in a `DashMap` keyed by
//! metric name. Registering a name twice fails. Histogram buckets are fixed
//! and counted in microseconds to keep the hot path integer-only; rendering
//! converts to seconds.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use routemetrics_core::error::{MetricsError, Result};
use routemetrics_core::{Counter, Histogram, MetricsBackend};

use super::Exposition;
use crate::config::schema::is_valid_metric_name;

/// Helper to escape help text.
fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

#[derive(Default)]
pub struct LocalCounter {
    value: AtomicU64,
}

impl Counter for LocalCounter {
    fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

// Fixed buckets in microseconds:
// 100us, 500us, 1ms, 5ms, 10ms, 50ms, 100ms, 500ms, 1s, 5s, 10s
const BUCKET_COUNT: usize = 11;
const BUCKETS_MICROS: [u64; BUCKET_COUNT] = [
    100, 500, 1_000, 5_000, 10_000, 50_000, 100_000, 500_000, 1_000_000, 5_000_000, 10_000_000,
];

pub struct LocalHistogram {
    count: AtomicU64,
    sum_micros: AtomicU64,
    buckets: [AtomicU64; BUCKET_COUNT],
}

impl Default for LocalHistogram {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_micros: AtomicU64::new(0),
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }
}

impl Histogram for LocalHistogram {
    /// Cumulative buckets: every bucket whose bound is >= the value.
    fn observe(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);

        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_micros.fetch_add(micros, Ordering::Relaxed);

        for (i, &b) in BUCKETS_MICROS.iter().enumerate() {
            if micros <= b {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn sample_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl LocalHistogram {
    fn render(&self, name: &str, out: &mut String) {
        for (i, &le) in BUCKETS_MICROS.iter().enumerate() {
            let count = self.buckets[i].load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{le=\"{}\"}} {}", name, micros_as_secs(le), count);
        }
        let count = self.count.load(Ordering::Relaxed);
        let _ = writeln!(out, "{}_bucket{{le=\"+Inf\"}} {}", name, count);

        let sum = self.sum_micros.load(Ordering::Relaxed);
        let _ = writeln!(out, "{}_sum {}", name, micros_as_secs(sum));
        let _ = writeln!(out, "{}_count {}", name, count);
    }
}

fn micros_as_secs(micros: u64) -> f64 {
    micros as f64 / 1_000_000.0
}

enum Registered {
    Counter(Arc<LocalCounter>),
    Histogram(Arc<LocalHistogram>),
}

struct Slot {
    help: String,
    metric: Registered,
}

/// Create-or-fail registry rendering the Prometheus text format.
#[derive(Default)]
pub struct LocalRegistry {
    metrics: DashMap<String, Slot>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Current value of a counter, if `name` is one.
    pub fn counter_value(&self, name: &str) -> Option<u64> {
        match &self.metrics.get(name)?.metric {
            Registered::Counter(c) => Some(c.get()),
            Registered::Histogram(_) => None,
        }
    }

    /// Observation count of a histogram, if `name` is one.
    pub fn histogram_count(&self, name: &str) -> Option<u64> {
        match &self.metrics.get(name)?.metric {
            Registered::Histogram(h) => Some(h.sample_count()),
            Registered::Counter(_) => None,
        }
    }

    fn insert(&self, name: &str, help: &str, metric: Registered) -> Result<()> {
        if !is_valid_metric_name(name) {
            return Err(MetricsError::InvalidName(name.to_string()));
        }
        match self.metrics.entry(name.to_string()) {
            Entry::Occupied(_) => Err(MetricsError::DuplicateName(name.to_string())),
            Entry::Vacant(e) => {
                e.insert(Slot {
                    help: help.to_string(),
                    metric,
                });
                Ok(())
            }
        }
    }
}

impl MetricsBackend for LocalRegistry {
    fn register_counter(&self, name: &str, help: &str) -> Result<Arc<dyn Counter>> {
        let c = Arc::new(LocalCounter::default());
        self.insert(name, help, Registered::Counter(Arc::clone(&c)))?;
        Ok(c)
    }

    fn register_histogram(&self, name: &str, help: &str) -> Result<Arc<dyn Histogram>> {
        let h = Arc::new(LocalHistogram::default());
        self.insert(name, help, Registered::Histogram(Arc::clone(&h)))?;
        Ok(h)
    }
}

impl Exposition for LocalRegistry {
    /// Render in Prometheus text exposition format, metrics sorted by name.
    fn render(&self) -> String {
        let mut names: Vec<String> = self.metrics.iter().map(|r| r.key().clone()).collect();
        names.sort();

        let mut out = String::new();
        for name in names {
            let Some(entry) = self.metrics.get(&name) else { continue };
            let _ = writeln!(out, "# HELP {} {}", name, escape_help(&entry.help));
            match &entry.metric {
                Registered::Counter(c) => {
                    let _ = writeln!(out, "# TYPE {} counter", name);
                    let _ = writeln!(out, "{} {}", name, c.get());
                }
                Registered::Histogram(h) => {
                    let _ = writeln!(out, "# TYPE {} histogram", name);
                    h.render(&name, &mut out);
                }
            }
        }
        out
    }
}
