use serde::Deserialize;
use routemetrics_core::error::{MetricsError, Result};
use routemetrics_core::TrackerConfig;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::BadConfig(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.metrics.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

/// Which metrics backend owns the histograms and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process registry (`obs::metrics`).
    #[default]
    Local,
    /// `prometheus` crate registry.
    Prometheus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Instrument every endpoint; when false only marked endpoints are.
    #[serde(default = "default_instrument_all")]
    pub instrument_all: bool,

    /// Metric name prefix, joined with `_`.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Route serving the text exposition.
    #[serde(default = "default_metrics_path")]
    pub path: String,

    #[serde(default)]
    pub backend: BackendKind,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            instrument_all: default_instrument_all(),
            prefix: None,
            path: default_metrics_path(),
            backend: BackendKind::default(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if let Some(p) = self.prefix.as_deref().filter(|p| !p.is_empty()) {
            if !is_valid_metric_name(p) {
                return Err(MetricsError::BadConfig(format!(
                    "metrics.prefix must match [a-zA-Z_:][a-zA-Z0-9_:]*, got {p:?}"
                )));
            }
        }
        if !self.path.starts_with('/') {
            return Err(MetricsError::BadConfig(
                "metrics.path must start with '/'".into(),
            ));
        }
        Ok(())
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            instrument_all: self.instrument_all,
            prefix: self.prefix.clone().filter(|p| !p.is_empty()),
        }
    }
}

fn default_instrument_all() -> bool {
    true
}
fn default_metrics_path() -> String {
    "/metrics".into()
}

/// Prometheus metric name charset.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
