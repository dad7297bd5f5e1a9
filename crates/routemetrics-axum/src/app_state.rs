//! Shared application state for the demo service.
//!
//! Owns the metrics backend chosen in config, the bootstrap (global counters)
//! and the request tracker. Everything is built once and shared via `Arc`.

use std::sync::Arc;

use routemetrics_core::error::Result;
use routemetrics_core::{MetricsBackend, MetricsBootstrap, RequestTracker};

use crate::config::{BackendKind, ServiceConfig};
use crate::obs::{Exposition, LocalRegistry, PrometheusBackend};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServiceConfig,
    exposition: Arc<dyn Exposition>,
    bootstrap: MetricsBootstrap,
    tracker: Arc<RequestTracker>,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: ServiceConfig) -> Result<Self> {
        let (backend, exposition): (Arc<dyn MetricsBackend>, Arc<dyn Exposition>) =
            match cfg.metrics.backend {
                BackendKind::Local => {
                    let b = Arc::new(LocalRegistry::new());
                    (b.clone() as Arc<dyn MetricsBackend>, b as Arc<dyn Exposition>)
                }
                BackendKind::Prometheus => {
                    let b = Arc::new(PrometheusBackend::default());
                    (b.clone() as Arc<dyn MetricsBackend>, b as Arc<dyn Exposition>)
                }
            };

        let bootstrap = MetricsBootstrap::new(backend);
        let tracker = Arc::new(RequestTracker::new(&bootstrap, &cfg.metrics.tracker_config())?);

        tracing::info!(
            backend = ?cfg.metrics.backend,
            instrument_all = cfg.metrics.instrument_all,
            prefix = cfg.metrics.prefix.as_deref().unwrap_or(""),
            "metrics initialized"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                exposition,
                bootstrap,
                tracker,
            }),
        })
    }

    pub fn cfg(&self) -> &ServiceConfig {
        &self.inner.cfg
    }

    pub fn tracker(&self) -> Arc<RequestTracker> {
        Arc::clone(&self.inner.tracker)
    }

    pub fn bootstrap(&self) -> &MetricsBootstrap {
        &self.inner.bootstrap
    }

    pub fn exposition(&self) -> Arc<dyn Exposition> {
        Arc::clone(&self.inner.exposition)
    }
}
