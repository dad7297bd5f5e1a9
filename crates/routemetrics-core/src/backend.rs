//! Metrics backend seam.
//!
//! The backend owns counters and histograms and enforces unique names:
//! registering a name twice must fail with `MetricsError::DuplicateName`.
//! Everything above this module only talks to the handles defined here.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;

/// Monotonic counter owned by a backend.
pub trait Counter: Send + Sync {
    fn inc(&self);
    fn get(&self) -> u64;
}

/// Duration histogram owned by a backend.
pub trait Histogram: Send + Sync {
    fn observe(&self, elapsed: Duration);
    /// Number of observations so far.
    fn sample_count(&self) -> u64;
}

/// Create-or-fail registry.
pub trait MetricsBackend: Send + Sync {
    fn register_counter(&self, name: &str, help: &str) -> Result<Arc<dyn Counter>>;
    fn register_histogram(&self, name: &str, help: &str) -> Result<Arc<dyn Histogram>>;
}

/// Named counter handle.
#[derive(Clone)]
pub struct CounterHandle {
    name: Arc<str>,
    inner: Arc<dyn Counter>,
}

impl CounterHandle {
    pub fn register(backend: &dyn MetricsBackend, name: &str, help: &str) -> Result<Self> {
        let inner = backend.register_counter(name, help)?;
        Ok(Self {
            name: Arc::from(name),
            inner,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inc(&self) {
        self.inner.inc();
    }

    pub fn get(&self) -> u64 {
        self.inner.get()
    }
}

impl fmt::Debug for CounterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterHandle")
            .field("name", &self.name)
            .field("value", &self.get())
            .finish()
    }
}

/// Named histogram handle with a start/stop timer primitive.
#[derive(Clone)]
pub struct HistogramHandle {
    name: Arc<str>,
    inner: Arc<dyn Histogram>,
}

impl HistogramHandle {
    pub fn register(backend: &dyn MetricsBackend, name: &str, help: &str) -> Result<Self> {
        let inner = backend.register_histogram(name, help)?;
        Ok(Self {
            name: Arc::from(name),
            inner,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_count(&self) -> u64 {
        self.inner.sample_count()
    }

    pub fn start_timer(&self) -> Timer {
        Timer {
            histogram: Some(Arc::clone(&self.inner)),
            start: Instant::now(),
        }
    }

    /// True if both handles point at the same backend histogram.
    pub fn same_as(&self, other: &HistogramHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for HistogramHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistogramHandle")
            .field("name", &self.name)
            .field("samples", &self.sample_count())
            .finish()
    }
}

/// Running timer. Records into its histogram exactly once: on `stop`, or on
/// drop if it was never stopped.
#[must_use = "dropping a timer records immediately"]
pub struct Timer {
    histogram: Option<Arc<dyn Histogram>>,
    start: Instant,
}

impl Timer {
    /// Record the elapsed time and return it.
    pub fn stop(mut self) -> Duration {
        self.record()
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn record(&mut self) -> Duration {
        let elapsed = self.start.elapsed();
        if let Some(h) = self.histogram.take() {
            h.observe(elapsed);
        }
        elapsed
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.record();
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("elapsed", &self.elapsed())
            .field("stopped", &self.histogram.is_none())
            .finish()
    }
}
