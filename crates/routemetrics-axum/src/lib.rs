//! routemetrics axum integration.
//!
//! This crate wires the core tracker into axum: strict YAML config, metrics
//! backends with text exposition, the per-endpoint instrumentation layer, and
//! a small demo service. It is consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod layer;
pub mod obs;
pub mod router;

pub use layer::{track_endpoint, MetricsRouter};
