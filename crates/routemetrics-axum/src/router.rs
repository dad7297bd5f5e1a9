//! Axum router wiring for the demo service.
//!
//! Instrumented endpoints go through `MetricsRouter`; the scrape endpoint and
//! health check are plain routes.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use routemetrics_core::error::Result;
use routemetrics_core::EndpointSpec;

use crate::app_state::AppState;
use crate::layer::MetricsRouter;
use crate::obs::TEXT_CONTENT_TYPE;

pub fn build_router(state: AppState) -> Result<Router> {
    let metrics_path = state.cfg().metrics.path.clone();

    let router = MetricsRouter::new(state.tracker())
        .route("/users/:user_id", get(get_user), EndpointSpec::new("get_user"))?
        .route(
            "/users/:user_id/orders/:order_id",
            get(get_order),
            EndpointSpec::new("get_order"),
        )?
        .route(
            "/checkout",
            post(checkout),
            EndpointSpec::new("checkout").metric("checkout_latency", "checkout flow"),
        )?
        .route("/fail", get(fail), EndpointSpec::new("fail").marked())?
        .route_plain("/health", get(health))
        .route_plain(&metrics_path, get(metrics));

    Ok(router.into_router().with_state(state))
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
        state.exposition().render(),
    )
}

async fn get_user(Path(user_id): Path<String>) -> impl IntoResponse {
    Json(json!({ "user_id": user_id }))
}

async fn get_order(Path((user_id, order_id)): Path<(String, String)>) -> impl IntoResponse {
    Json(json!({ "user_id": user_id, "order_id": order_id }))
}

async fn checkout() -> impl IntoResponse {
    (StatusCode::CREATED, Json(json!({ "status": "accepted" })))
}

async fn fail() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
}
