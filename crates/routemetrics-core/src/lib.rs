//! routemetrics core: endpoint metric identity, lazy histogram registration
//! and request lifecycle tracking.
//!
//! This crate is transport-agnostic. It knows nothing about HTTP frameworks;
//! integrations feed it endpoint descriptors at wiring time and call the
//! tracker's entry/exit hooks around each request. The metrics backend is a
//! trait so the same logic runs against the in-process registry, the
//! `prometheus` crate, or a test double.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! A registration failure surfaces as `MetricsError` to the caller.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod backend;
pub mod bootstrap;
pub mod endpoint;
pub mod error;
pub mod path;
pub mod policy;
pub mod resolver;
pub mod tracker;

pub use backend::{Counter, CounterHandle, Histogram, HistogramHandle, MetricsBackend, Timer};
pub use bootstrap::{GlobalCounters, MetricsBootstrap, StatusClass};
pub use endpoint::{EndpointDescriptor, EndpointKey, EndpointSpec, MetricIdentity};
/// Shared result type.
pub use error::{ErrorKind, MetricsError, Result};
pub use path::{normalize, PathParams};
pub use policy::SelectionPolicy;
pub use resolver::EndpointResolver;
pub use tracker::{Completion, RegisteredEndpoint, RequestContext, RequestTracker, TrackState, TrackerConfig};
