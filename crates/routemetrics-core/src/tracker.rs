//! Request lifecycle tracking.
//!
//! `register` runs at wiring time and applies the selection policy once per
//! endpoint. Per request, `on_request` starts the endpoint's timer (resolving
//! the histogram on first use) and `on_response` stops it and counts the
//! status class.
//!
//! States per request:
//! - `Pending`: no entry hook ran (request rejected before dispatch).
//! - `Running`: timer started.
//! - `Skipped`: endpoint has no histogram; only status counters move.
//! - `Completed`: timer stopped and recorded.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{MetricsBackend, Timer};
use crate::bootstrap::{GlobalCounters, MetricsBootstrap, StatusClass};
use crate::endpoint::EndpointDescriptor;
use crate::error::Result;
use crate::path::{normalize, PathParams};
use crate::policy::SelectionPolicy;
use crate::resolver::EndpointResolver;

/// Explicit tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Instrument every endpoint unless this is false and the endpoint is not
    /// marked.
    pub instrument_all: bool,
    /// Prepended with `_` to synthesized and global metric names.
    pub prefix: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            instrument_all: true,
            prefix: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Pending,
    Running,
    Skipped,
    Completed,
}

/// Endpoint plus the selection decision made when it was wired.
#[derive(Debug)]
pub struct RegisteredEndpoint {
    descriptor: EndpointDescriptor,
    instrumented: bool,
}

impl RegisteredEndpoint {
    pub fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }

    pub fn instrumented(&self) -> bool {
        self.instrumented
    }
}

/// Per-request scratch state, owned by the request's own future.
#[derive(Debug)]
pub struct RequestContext {
    timer: Option<Timer>,
    state: TrackState,
}

impl RequestContext {
    /// Context for a request that never reached the entry hook.
    pub fn untracked() -> Self {
        Self {
            timer: None,
            state: TrackState::Pending,
        }
    }

    pub fn state(&self) -> TrackState {
        self.state
    }
}

/// Outcome of `on_response`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub state: TrackState,
    pub class: Option<StatusClass>,
    pub elapsed: Option<Duration>,
}

pub struct RequestTracker {
    policy: SelectionPolicy,
    counters: Arc<GlobalCounters>,
    resolver: EndpointResolver,
}

impl RequestTracker {
    /// Build a tracker, initializing the global counters through `bootstrap`
    /// if that has not happened yet.
    pub fn new(bootstrap: &MetricsBootstrap, config: &TrackerConfig) -> Result<Self> {
        let prefix = config.prefix.as_deref();
        let counters = bootstrap.initialize(prefix)?;
        Ok(Self {
            policy: SelectionPolicy::new(config.instrument_all),
            counters,
            resolver: EndpointResolver::new(bootstrap.backend(), prefix),
        })
    }

    /// Convenience for a tracker that owns its own bootstrap.
    pub fn with_backend(backend: Arc<dyn MetricsBackend>, config: &TrackerConfig) -> Result<Self> {
        Self::new(&MetricsBootstrap::new(backend), config)
    }

    pub fn counters(&self) -> &GlobalCounters {
        &self.counters
    }

    pub fn resolver(&self) -> &EndpointResolver {
        &self.resolver
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Wiring-time registration.
    ///
    /// Unselected endpoints go to the ignored set. Selected endpoints with a
    /// complete declared identity are resolved right away so naming
    /// collisions between declarations fail at startup.
    pub fn register(&self, descriptor: EndpointDescriptor) -> Result<Arc<RegisteredEndpoint>> {
        let instrumented = self.policy.should_instrument(&descriptor);

        if !instrumented {
            tracing::debug!(endpoint = %descriptor.key(), "endpoint not instrumented");
            self.resolver.ignore(descriptor.key());
        } else if descriptor.declared_identity().is_some() {
            self.resolver.resolve(&descriptor, String::new)?;
        }

        Ok(Arc::new(RegisteredEndpoint {
            descriptor,
            instrumented,
        }))
    }

    /// Entry hook.
    ///
    /// `params` supplies the resolved path-parameter values; it is only called
    /// when the histogram's help text has to be derived from the path.
    pub fn on_request(
        &self,
        endpoint: &RegisteredEndpoint,
        raw_path: &str,
        params: impl FnOnce() -> PathParams,
    ) -> Result<RequestContext> {
        let descriptor = &endpoint.descriptor;
        let histogram = if endpoint.instrumented {
            self.resolver
                .resolve(descriptor, || normalize(raw_path, &ordered_params(descriptor, params())))?
        } else {
            None
        };

        let Some(histogram) = histogram else {
            return Ok(RequestContext {
                timer: None,
                state: TrackState::Skipped,
            });
        };

        let timer = histogram.start_timer();
        self.counters.requests_total.inc();
        Ok(RequestContext {
            timer: Some(timer),
            state: TrackState::Running,
        })
    }

    /// Exit hook. Always called with the final response status.
    pub fn on_response(&self, mut ctx: RequestContext, status: u16) -> Completion {
        let elapsed = ctx.timer.take().map(Timer::stop);
        if elapsed.is_some() {
            ctx.state = TrackState::Completed;
        }

        let class = self.counters.record_status(status);
        Completion {
            state: ctx.state,
            class,
            elapsed,
        }
    }
}

/// Put declared parameters first, in route order, so the first-declared one
/// wins when values collide. Observed parameters the route does not declare
/// follow in observation order.
fn ordered_params(descriptor: &EndpointDescriptor, observed: PathParams) -> PathParams {
    if descriptor.path_params().is_empty() {
        return observed;
    }

    let mut out = PathParams::new();
    for name in descriptor.path_params() {
        out.declare(name.as_str());
    }
    for (name, values) in observed.iter() {
        for v in values {
            out.push(name, v.as_str());
        }
    }
    out
}
