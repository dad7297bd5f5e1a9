//! Backend over the `prometheus` crate.
//!
//! Metrics go into the backend's own `prometheus::Registry`, not the crate's
//! default registry, so several backends can coexist in one process.
//! `AlreadyReg` maps to `MetricsError::DuplicateName`.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

use routemetrics_core::error::{MetricsError, Result};
use routemetrics_core::{Counter, Histogram, MetricsBackend};

use super::Exposition;

struct PromCounter(IntCounter);

impl Counter for PromCounter {
    fn inc(&self) {
        self.0.inc();
    }

    fn get(&self) -> u64 {
        self.0.get()
    }
}

struct PromHistogram(prometheus::Histogram);

impl Histogram for PromHistogram {
    fn observe(&self, elapsed: Duration) {
        self.0.observe(elapsed.as_secs_f64());
    }

    fn sample_count(&self) -> u64 {
        self.0.get_sample_count()
    }
}

pub struct PrometheusBackend {
    registry: Registry,
    buckets: Vec<f64>,
}

impl Default for PrometheusBackend {
    fn default() -> Self {
        Self::new(Registry::new())
    }
}

impl PrometheusBackend {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            buckets: prometheus::DEFAULT_BUCKETS.to_vec(),
        }
    }

    /// Override histogram buckets (seconds).
    pub fn with_buckets(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = buckets;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

fn map_err(name: &str, e: prometheus::Error) -> MetricsError {
    match e {
        prometheus::Error::AlreadyReg => MetricsError::DuplicateName(name.to_string()),
        prometheus::Error::Msg(msg) => MetricsError::InvalidName(format!("{name}: {msg}")),
        other => MetricsError::Backend(format!("{name}: {other}")),
    }
}

impl MetricsBackend for PrometheusBackend {
    fn register_counter(&self, name: &str, help: &str) -> Result<Arc<dyn Counter>> {
        let c = IntCounter::with_opts(Opts::new(name, help)).map_err(|e| map_err(name, e))?;
        self.registry
            .register(Box::new(c.clone()))
            .map_err(|e| map_err(name, e))?;
        Ok(Arc::new(PromCounter(c)))
    }

    fn register_histogram(&self, name: &str, help: &str) -> Result<Arc<dyn Histogram>> {
        let opts = HistogramOpts::new(name, help).buckets(self.buckets.clone());
        let h = prometheus::Histogram::with_opts(opts).map_err(|e| map_err(name, e))?;
        self.registry
            .register(Box::new(h.clone()))
            .map_err(|e| map_err(name, e))?;
        Ok(Arc::new(PromHistogram(h)))
    }
}

impl Exposition for PrometheusBackend {
    fn render(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            tracing::error!(error = %e, "prometheus text encoding failed");
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
