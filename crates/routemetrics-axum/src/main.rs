//! routemetrics demo service.
//!
//! Serves a few instrumented endpoints plus the metrics scrape route.
//! Config path comes from the first argument (default `routemetrics.yaml`).

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use routemetrics_axum::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "routemetrics.yaml".to_string());
    let cfg = config::load_from_file(&path).expect("config load failed");
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .expect("server.listen must be a valid SocketAddr");

    let state = app_state::AppState::new(cfg).expect("metrics bootstrap failed");
    let app = router::build_router(state).expect("router wiring failed");

    tracing::info!(%listen, "routemetrics demo starting");
    let listener = tokio::net::TcpListener::bind(listen).await.expect("failed to bind");

    axum::serve(listener, app).await.expect("server failed");
}
