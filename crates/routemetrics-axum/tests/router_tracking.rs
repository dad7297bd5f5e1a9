//! End-to-end: requests through instrumented axum routers.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    routing::get,
    Router,
};
use futures_util::future::join_all;
use tower::ServiceExt;

use routemetrics_axum::obs::{Exposition, LocalRegistry};
use routemetrics_axum::{app_state::AppState, config, router, MetricsRouter};
use routemetrics_core::{EndpointSpec, MetricsError, RequestTracker, TrackerConfig};

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn get_text(app: &Router, uri: &str) -> (StatusCode, String) {
    send(app, Method::GET, uri).await
}

fn demo(yaml: &str) -> Router {
    let cfg = config::load_from_str(yaml).unwrap();
    router::build_router(AppState::new(cfg).unwrap()).unwrap()
}

fn local(instrument_all: bool, prefix: Option<&str>) -> (Arc<LocalRegistry>, Arc<RequestTracker>) {
    let registry = Arc::new(LocalRegistry::new());
    let cfg = TrackerConfig {
        instrument_all,
        prefix: prefix.map(str::to_string),
    };
    let tracker = Arc::new(RequestTracker::with_backend(registry.clone(), &cfg).unwrap());
    (registry, tracker)
}

#[tokio::test]
async fn demo_service_records_templated_histograms_and_status_classes() {
    let app = demo("version: 1\n");

    assert_eq!(get_text(&app, "/users/42/orders/7").await.0, StatusCode::OK);
    assert_eq!(get_text(&app, "/users/42").await.0, StatusCode::OK);
    assert_eq!(get_text(&app, "/fail").await.0, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(send(&app, Method::POST, "/checkout").await.0, StatusCode::CREATED);
    assert_eq!(get_text(&app, "/health").await.0, StatusCode::OK);
    assert_eq!(get_text(&app, "/nope").await.0, StatusCode::NOT_FOUND);

    let (status, text) = get_text(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);

    assert!(text.contains("# HELP get_order users/{user_id}/orders/{order_id}\n"), "{text}");
    assert!(text.contains("get_order_count 1\n"), "{text}");
    assert!(text.contains("# HELP get_user users/{user_id}\n"), "{text}");
    assert!(text.contains("# HELP checkout_latency checkout flow\n"), "{text}");
    assert!(text.contains("checkout_latency_count 1\n"), "{text}");
    assert!(text.contains("fail_count 1\n"), "{text}");

    // Plain routes and unmatched paths are invisible.
    assert!(text.contains("requests_total 4\n"), "{text}");
    assert!(text.contains("response_2xx 3\n"), "{text}");
    assert!(text.contains("response_4xx 0\n"), "{text}");
    assert!(text.contains("response_5xx 1\n"), "{text}");
}

#[tokio::test]
async fn demo_service_applies_prefix_except_to_declared_identities() {
    let app = demo("version: 1\nmetrics:\n  prefix: shop\n  backend: prometheus\n");

    get_text(&app, "/users/1").await;
    send(&app, Method::POST, "/checkout").await;

    let (_, text) = get_text(&app, "/metrics").await;
    assert!(text.contains("shop_get_user_count 1"), "{text}");
    assert!(text.contains("checkout_latency_count 1"), "{text}");
    assert!(!text.contains("shop_checkout_latency"), "{text}");
    assert!(text.contains("shop_requests_total 2"), "{text}");
}

#[tokio::test]
async fn opt_in_mode_only_times_marked_endpoints() {
    let app = demo("version: 1\nmetrics:\n  instrument_all: false\n");

    for _ in 0..3 {
        get_text(&app, "/users/9").await;
    }
    get_text(&app, "/fail").await;

    let (_, text) = get_text(&app, "/metrics").await;
    assert!(!text.contains("get_user"), "{text}");
    assert!(text.contains("fail_count 1\n"), "{text}");
    assert!(text.contains("requests_total 1\n"), "{text}");
    // Skipped endpoints still count toward status classes.
    assert!(text.contains("response_2xx 3\n"), "{text}");
    assert!(text.contains("response_5xx 1\n"), "{text}");
}

#[tokio::test]
async fn concurrent_first_requests_share_one_histogram() {
    let (registry, tracker) = local(true, None);
    let app: Router = MetricsRouter::new(tracker)
        .route("/items/:id", get(|| async { "item" }), EndpointSpec::new("get_item"))
        .unwrap()
        .into_router();

    let uris: Vec<String> = (0..32).map(|i| format!("/items/{i}")).collect();
    let results = join_all(uris.iter().map(|u| get_text(&app, u))).await;

    assert!(results.iter().all(|(s, _)| *s == StatusCode::OK));
    assert_eq!(registry.histogram_count("get_item"), Some(32));
    assert_eq!(registry.counter_value("requests_total"), Some(32));
}

#[tokio::test]
async fn synthesized_collision_answers_500_without_running_handler() {
    let (registry, tracker) = local(true, None);
    let hits = Arc::new(AtomicUsize::new(0));
    let counted = {
        let hits = Arc::clone(&hits);
        get(move || {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::Relaxed);
                "v2"
            }
        })
    };

    let app: Router = MetricsRouter::new(tracker)
        .route("/v1/items", get(|| async { "v1" }), EndpointSpec::new("list"))
        .unwrap()
        .route("/v2/items", counted, EndpointSpec::new("list"))
        .unwrap()
        .into_router();

    assert_eq!(get_text(&app, "/v1/items").await.0, StatusCode::OK);
    for _ in 0..2 {
        assert_eq!(
            get_text(&app, "/v2/items").await.0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    assert_eq!(hits.load(Ordering::Relaxed), 0);
    assert_eq!(registry.histogram_count("list"), Some(1));
    assert_eq!(registry.counter_value("response_5xx"), Some(2));
    assert_eq!(registry.counter_value("requests_total"), Some(1));
}

#[tokio::test]
async fn declared_identity_collision_fails_wiring() {
    let (_registry, tracker) = local(true, None);

    let err = MetricsRouter::<()>::new(tracker)
        .route(
            "/a",
            get(|| async { "a" }),
            EndpointSpec::new("a").metric("requests_total", "clashes with the global counter"),
        )
        .err()
        .expect("wiring must fail");
    assert_eq!(err, MetricsError::DuplicateName("requests_total".into()));
}

#[tokio::test]
async fn shared_declared_identity_across_routes() {
    let (registry, tracker) = local(true, None);
    let spec = || EndpointSpec::new("search").metric("search_latency", "search");

    let app: Router = MetricsRouter::new(tracker)
        .route("/search/users", get(|| async { "u" }), spec())
        .unwrap()
        .route("/search/orders", get(|| async { "o" }), spec())
        .unwrap()
        .into_router();

    get_text(&app, "/search/users").await;
    get_text(&app, "/search/orders").await;

    assert_eq!(registry.histogram_count("search_latency"), Some(2));
}

#[tokio::test]
async fn encoded_parameter_values_are_templated() {
    let (registry, tracker) = local(true, None);
    let app: Router = MetricsRouter::new(tracker)
        .route("/users/:user_id", get(|| async { "user" }), EndpointSpec::new("get_user"))
        .unwrap()
        .into_router();

    assert_eq!(get_text(&app, "/users/john%20doe").await.0, StatusCode::OK);

    let text = registry.render();
    assert!(text.contains("# HELP get_user users/{user_id}\n"), "{text}");
    assert!(!text.contains("john"), "{text}");
}

#[tokio::test]
async fn nested_router_keeps_full_path_in_help() {
    let (registry, tracker) = local(true, None);
    let users: Router = MetricsRouter::new(tracker)
        .route("/users/:user_id", get(|| async { "user" }), EndpointSpec::new("get_user"))
        .unwrap()
        .into_router();
    let app = Router::new().nest("/api", users);

    assert_eq!(get_text(&app, "/api/users/5").await.0, StatusCode::OK);

    let text = registry.render();
    assert!(text.contains("# HELP get_user api/users/{user_id}\n"), "{text}");
    assert_eq!(registry.histogram_count("get_user"), Some(1));
}

#[tokio::test]
async fn demo_state_initializes_counters_once() {
    let state = AppState::new(config::load_from_str("version: 1\n").unwrap()).unwrap();
    assert!(state.bootstrap().is_initialized());

    let app = router::build_router(state.clone()).unwrap();
    get_text(&app, "/users/1").await;

    let counters = state.bootstrap().initialize(None).unwrap();
    assert_eq!(counters.requests_total.get(), 1);
    assert_eq!(state.tracker().counters().response_2xx.get(), 1);
}
