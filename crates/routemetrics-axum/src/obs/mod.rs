//! Metrics backends and the text exposition seam.
//!
//! `metrics` is the in-process registry (atomics, no exporter dependency);
//! `prom` wraps a `prometheus::Registry`. Both enforce unique names.

pub mod metrics;
pub mod prom;

use routemetrics_core::MetricsBackend;

pub use self::metrics::LocalRegistry;
pub use self::prom::PrometheusBackend;

/// A backend that can render everything it owns as Prometheus text.
pub trait Exposition: MetricsBackend {
    fn render(&self) -> String;
}

/// Content type of the text exposition format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
