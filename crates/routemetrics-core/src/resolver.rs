//! Endpoint -> histogram resolution.
//!
//! The backend enforces uniqueness by metric name, so names are the
//! authoritative cache key: `names` maps every resolved name to the histogram
//! registered for it and to the endpoint that claimed it. `by_endpoint` is a
//! memo on top of that for the steady-state path, and `ignored` remembers
//! endpoints that never get a histogram.
//!
//! Registration runs while holding the `names` entry for that name, so
//! concurrent first requests register exactly once.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

use crate::backend::{HistogramHandle, MetricsBackend};
use crate::bootstrap::prefixed;
use crate::endpoint::{EndpointDescriptor, EndpointKey, MetricIdentity};
use crate::error::{MetricsError, Result};

struct NameClaim {
    histogram: HistogramHandle,
    owner: EndpointKey,
    /// Came from a complete declared identity; may be shared by other
    /// endpoints declaring the same one.
    declared: bool,
}

pub struct EndpointResolver {
    backend: Arc<dyn MetricsBackend>,
    prefix: Option<String>,
    names: DashMap<String, NameClaim>,
    by_endpoint: DashMap<EndpointKey, HistogramHandle>,
    ignored: DashSet<EndpointKey>,
    failed: DashMap<EndpointKey, MetricsError>,
}

impl EndpointResolver {
    pub fn new(backend: Arc<dyn MetricsBackend>, prefix: Option<&str>) -> Self {
        Self {
            backend,
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            names: DashMap::new(),
            by_endpoint: DashMap::new(),
            ignored: DashSet::new(),
            failed: DashMap::new(),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Metric identity for `endpoint`.
    ///
    /// A complete declared identity is taken verbatim, without prefix.
    /// Otherwise the declared name (or the handler name) gets the prefix, and
    /// the declared help (or `help_source()`, the normalized path) is used.
    pub fn identity(
        &self,
        endpoint: &EndpointDescriptor,
        help_source: impl FnOnce() -> String,
    ) -> MetricIdentity {
        if let Some(id) = endpoint.declared_identity() {
            return id.clone();
        }

        let declared = endpoint.metric();
        let name = declared
            .map(|m| m.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| endpoint.handler());

        let help = match declared.map(|m| m.help.as_str()).filter(|h| !h.is_empty()) {
            Some(h) => h.to_string(),
            None => {
                let path = help_source();
                if path.is_empty() { "/".to_string() } else { path }
            }
        };

        MetricIdentity::new(prefixed(self.prefix.as_deref(), name), help)
    }

    /// Mark an endpoint as never instrumented.
    pub fn ignore(&self, key: &EndpointKey) {
        if !self.by_endpoint.contains_key(key) {
            self.ignored.insert(key.clone());
        }
    }

    pub fn is_ignored(&self, key: &EndpointKey) -> bool {
        self.ignored.contains(key)
    }

    /// Cached histogram for an endpoint, if resolved already.
    pub fn cached(&self, key: &EndpointKey) -> Option<HistogramHandle> {
        self.by_endpoint.get(key).map(|h| h.value().clone())
    }

    /// Number of distinct histograms registered through this resolver.
    pub fn histogram_count(&self) -> usize {
        self.names.len()
    }

    /// Histogram for `endpoint`, registering it on first use.
    ///
    /// `Ok(None)` for ignored endpoints. A registration failure is cached and
    /// returned for every later call without touching the backend again.
    pub fn resolve(
        &self,
        endpoint: &EndpointDescriptor,
        help_source: impl FnOnce() -> String,
    ) -> Result<Option<HistogramHandle>> {
        let key = endpoint.key();

        if self.ignored.contains(key) {
            return Ok(None);
        }
        if let Some(h) = self.by_endpoint.get(key) {
            return Ok(Some(h.value().clone()));
        }
        if let Some(err) = self.failed.get(key) {
            return Err(err.value().clone());
        }

        let identity = self.identity(endpoint, help_source);
        let declared = endpoint.declared_identity().is_some();

        match self.claim(key, &identity, declared) {
            Ok(histogram) => {
                self.by_endpoint.insert(key.clone(), histogram.clone());
                Ok(Some(histogram))
            }
            Err(err) => {
                tracing::error!(
                    endpoint = %key,
                    metric = %identity.name,
                    kind = err.kind().as_str(),
                    error = %err,
                    "histogram registration failed"
                );
                self.failed.insert(key.clone(), err.clone());
                Err(err)
            }
        }
    }

    fn claim(&self, key: &EndpointKey, identity: &MetricIdentity, declared: bool) -> Result<HistogramHandle> {
        match self.names.entry(identity.name.clone()) {
            Entry::Occupied(e) => {
                let claim = e.get();
                if claim.owner == *key {
                    return Ok(claim.histogram.clone());
                }
                if claim.declared && declared {
                    tracing::debug!(
                        endpoint = %key,
                        owner = %claim.owner,
                        metric = %identity.name,
                        "sharing declared histogram"
                    );
                    return Ok(claim.histogram.clone());
                }
                Err(MetricsError::DuplicateName(format!(
                    "{} (endpoint {key} collides with {})",
                    identity.name, claim.owner
                )))
            }
            Entry::Vacant(e) => {
                let histogram = HistogramHandle::register(self.backend.as_ref(), &identity.name, &identity.help)?;
                tracing::info!(
                    endpoint = %key,
                    metric = %identity.name,
                    help = %identity.help,
                    "endpoint histogram registered"
                );
                e.insert(NameClaim {
                    histogram: histogram.clone(),
                    owner: key.clone(),
                    declared,
                });
                Ok(histogram)
            }
        }
    }
}
