//! Endpoint model: identity, declared metric metadata and route parameters.
//!
//! `EndpointSpec` is what application code attaches to a handler at wiring
//! time (handler name, optional metric identity, explicit marker). The router
//! combines it with the route template into an immutable `EndpointDescriptor`
//! which is then shared for the lifetime of the process.

use std::fmt;
use std::sync::Arc;

/// Name + help text of a metric.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricIdentity {
    pub name: String,
    pub help: String,
}

impl MetricIdentity {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
        }
    }

    /// Both name and help are set: the identity is used verbatim.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.help.is_empty()
    }
}

/// Stable identity of "this handler of this route". Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointKey {
    route: Arc<str>,
    handler: Arc<str>,
}

impl EndpointKey {
    pub fn new(route: &str, handler: &str) -> Self {
        Self {
            route: Arc::from(route),
            handler: Arc::from(handler),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.handler, self.route)
    }
}

/// Declared per-handler metadata.
#[derive(Debug, Clone)]
pub struct EndpointSpec {
    handler: String,
    metric: Option<MetricIdentity>,
    marked: bool,
}

impl EndpointSpec {
    /// `handler` is the handling function's name; it becomes the metric name
    /// when no explicit one is declared.
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            metric: None,
            marked: false,
        }
    }

    /// Declare a metric identity. Declaring one also marks the endpoint for
    /// instrumentation.
    pub fn metric(mut self, name: impl Into<String>, help: impl Into<String>) -> Self {
        self.metric = Some(MetricIdentity::new(name, help));
        self.marked = true;
        self
    }

    /// Opt this endpoint in even when instrumentation is not on by default.
    pub fn marked(mut self) -> Self {
        self.marked = true;
        self
    }
}

/// Immutable descriptor of a registered endpoint.
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    key: EndpointKey,
    metric: Option<MetricIdentity>,
    marked: bool,
    path_params: Vec<String>,
}

impl EndpointDescriptor {
    pub fn new(route: &str, spec: EndpointSpec) -> Self {
        Self {
            key: EndpointKey::new(route, &spec.handler),
            metric: spec.metric,
            marked: spec.marked,
            path_params: route_params(route),
        }
    }

    pub fn key(&self) -> &EndpointKey {
        &self.key
    }

    pub fn route(&self) -> &str {
        self.key.route()
    }

    pub fn handler(&self) -> &str {
        self.key.handler()
    }

    /// Declared identity, possibly partial.
    pub fn metric(&self) -> Option<&MetricIdentity> {
        self.metric.as_ref()
    }

    /// Declared identity, only when both name and help are set.
    pub fn declared_identity(&self) -> Option<&MetricIdentity> {
        self.metric.as_ref().filter(|m| m.is_complete())
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Parameter names in the order they appear in the route template.
    pub fn path_params(&self) -> &[String] {
        &self.path_params
    }
}

/// Extract parameter names from a route template.
///
/// Understands `:name` and `*name` segments as well as `{name}` / `{*name}`.
pub fn route_params(route: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for seg in route.split('/') {
        let name = if let Some(rest) = seg.strip_prefix(':').or_else(|| seg.strip_prefix('*')) {
            rest
        } else if let Some(inner) = seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            inner.trim_start_matches('*')
        } else {
            continue;
        };

        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}
