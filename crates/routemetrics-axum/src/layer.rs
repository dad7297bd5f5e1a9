//! Per-endpoint instrumentation for axum routers.
//!
//! `MetricsRouter` wraps `axum::Router` at wiring time. Every route added with
//! `route` is registered with the tracker (selection policy applied once,
//! declared identities registered eagerly) and gets its own `track_endpoint`
//! middleware carrying the endpoint it belongs to, so the handler identity is
//! known without any lookup per request.

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    extract::{OriginalUri, RawPathParams, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
    Router,
};

use routemetrics_core::error::Result;
use routemetrics_core::{
    EndpointDescriptor, EndpointSpec, PathParams, RegisteredEndpoint, RequestContext, RequestTracker,
};

/// State handed to one route's middleware.
#[derive(Clone)]
pub struct EndpointGuard {
    tracker: Arc<RequestTracker>,
    endpoint: Arc<RegisteredEndpoint>,
}

pub struct MetricsRouter<S = ()> {
    router: Router<S>,
    tracker: Arc<RequestTracker>,
}

impl<S> MetricsRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(tracker: Arc<RequestTracker>) -> Self {
        Self {
            router: Router::new(),
            tracker,
        }
    }

    pub fn tracker(&self) -> &Arc<RequestTracker> {
        &self.tracker
    }

    /// Add an instrumented route.
    ///
    /// Fails when the endpoint declares a metric identity that collides with
    /// an existing metric name.
    pub fn route(self, path: &str, method_router: MethodRouter<S>, spec: EndpointSpec) -> Result<Self> {
        let endpoint = self.tracker.register(EndpointDescriptor::new(path, spec))?;
        let guard = EndpointGuard {
            tracker: Arc::clone(&self.tracker),
            endpoint,
        };
        let method_router = method_router.layer(middleware::from_fn_with_state(guard, track_endpoint));

        Ok(Self {
            router: self.router.route(path, method_router),
            tracker: self.tracker,
        })
    }

    /// Add a route that is invisible to instrumentation (scrape endpoint,
    /// health checks).
    pub fn route_plain(self, path: &str, method_router: MethodRouter<S>) -> Self {
        Self {
            router: self.router.route(path, method_router),
            tracker: self.tracker,
        }
    }

    pub fn into_router(self) -> Router<S> {
        self.router
    }
}

/// Entry/exit hooks around one endpoint's handler.
///
/// The help text is derived from the full request path (including any
/// `Router::nest` prefix), decoded the same way as the path parameters.
/// A fatal resolve error (metric name collision) is answered with 500 and
/// the handler does not run.
pub async fn track_endpoint(
    State(guard): State<EndpointGuard>,
    OriginalUri(uri): OriginalUri,
    params: Option<RawPathParams>,
    request: Request,
    next: Next,
) -> Response {
    let EndpointGuard { tracker, endpoint } = guard;

    let path = decode_path(uri.path());
    let entered = tracker.on_request(&endpoint, &path, || collect_params(params.as_ref()));

    let ctx = match entered {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::error!(
                endpoint = %endpoint.descriptor().key(),
                route = endpoint.descriptor().route(),
                kind = err.kind().as_str(),
                error = %err,
                "endpoint instrumentation failed"
            );
            let response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            tracker.on_response(RequestContext::untracked(), response.status().as_u16());
            return response;
        }
    };

    let response = next.run(request).await;
    let done = tracker.on_response(ctx, response.status().as_u16());
    tracing::trace!(
        endpoint = %endpoint.descriptor().key(),
        status = response.status().as_u16(),
        state = ?done.state,
        elapsed = ?done.elapsed,
        "request tracked"
    );
    response
}

/// `RawPathParams` values are percent-decoded; a path that does not decode
/// to UTF-8 is used as sent.
fn decode_path(path: &str) -> Cow<'_, str> {
    urlencoding::decode(path).unwrap_or(Cow::Borrowed(path))
}

fn collect_params(params: Option<&RawPathParams>) -> PathParams {
    params
        .map(|p| p.iter().collect())
        .unwrap_or_default()
}
