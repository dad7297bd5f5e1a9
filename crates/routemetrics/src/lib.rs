//! Top-level facade crate for routemetrics.
//!
//! Re-exports the core tracking types and the axum integration so users can
//! depend on a single crate.

pub mod core {
    pub use routemetrics_core::*;
}

pub mod axum {
    pub use routemetrics_axum::*;
}
