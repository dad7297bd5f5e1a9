//! Service config loader (strict parsing).
//!
//! `load_from_file` also applies environment overrides:
//! - `ROUTEMETRICS_ALL`: `true`/`false`, replaces `metrics.instrument_all`
//! - `ROUTEMETRICS_PREFIX`: replaces `metrics.prefix` (empty clears it)

pub mod schema;

use std::fs;

use routemetrics_core::error::{MetricsError, Result};

pub use schema::{BackendKind, MetricsSection, ServerSection, ServiceConfig};

pub const ENV_INSTRUMENT_ALL: &str = "ROUTEMETRICS_ALL";
pub const ENV_PREFIX: &str = "ROUTEMETRICS_PREFIX";

pub fn load_from_file(path: &str) -> Result<ServiceConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MetricsError::BadConfig(format!("read config failed: {e}")))?;
    let mut cfg = parse(&s)?;
    apply_overrides(&mut cfg, |k| std::env::var(k).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_str(s: &str) -> Result<ServiceConfig> {
    let cfg = parse(s)?;
    cfg.validate()?;
    Ok(cfg)
}

fn parse(s: &str) -> Result<ServiceConfig> {
    serde_yaml::from_str(s).map_err(|e| MetricsError::BadConfig(format!("invalid yaml: {e}")))
}

/// Apply overrides from `lookup` (normally the process environment).
pub fn apply_overrides(
    cfg: &mut ServiceConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(v) = lookup(ENV_INSTRUMENT_ALL) {
        cfg.metrics.instrument_all = v.trim().parse().map_err(|_| {
            MetricsError::BadConfig(format!("{ENV_INSTRUMENT_ALL} must be true or false, got {v:?}"))
        })?;
    }
    if let Some(v) = lookup(ENV_PREFIX) {
        let v = v.trim();
        cfg.metrics.prefix = if v.is_empty() { None } else { Some(v.to_string()) };
    }
    Ok(())
}
