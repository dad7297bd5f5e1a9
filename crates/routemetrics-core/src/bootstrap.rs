//! Process-wide global counters.
//!
//! `MetricsBootstrap` registers the request and status-class counters exactly
//! once. Re-registering a name is fatal in every backend, so later calls hand
//! back the counters created by the first one instead of registering again.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::backend::{CounterHandle, MetricsBackend};
use crate::error::Result;

/// Status class of an HTTP-style response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl StatusClass {
    /// `None` for codes below 200.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            500.. => Some(StatusClass::ServerError),
            400.. => Some(StatusClass::ClientError),
            300.. => Some(StatusClass::Redirection),
            200.. => Some(StatusClass::Success),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusClass::Success => "2xx",
            StatusClass::Redirection => "3xx",
            StatusClass::ClientError => "4xx",
            StatusClass::ServerError => "5xx",
        }
    }
}

/// Join `prefix` and `name` with `_`; an empty or missing prefix leaves the
/// name alone.
pub fn prefixed(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{p}_{name}"),
        _ => name.to_string(),
    }
}

/// Total request counter plus one counter per status class.
#[derive(Debug)]
pub struct GlobalCounters {
    pub requests_total: CounterHandle,
    pub response_5xx: CounterHandle,
    pub response_4xx: CounterHandle,
    pub response_3xx: CounterHandle,
    pub response_2xx: CounterHandle,
}

impl GlobalCounters {
    fn register(backend: &dyn MetricsBackend, prefix: Option<&str>) -> Result<Self> {
        let reg = |name: &str, help: &str| {
            CounterHandle::register(backend, &prefixed(prefix, name), help)
        };

        Ok(Self {
            requests_total: reg("requests_total", "Total tracked requests.")?,
            response_5xx: reg("response_5xx", "5xx response count")?,
            response_4xx: reg("response_4xx", "4xx response count")?,
            response_3xx: reg("response_3xx", "3xx response count")?,
            response_2xx: reg("response_2xx", "2xx response count")?,
        })
    }

    pub fn counter(&self, class: StatusClass) -> &CounterHandle {
        match class {
            StatusClass::ServerError => &self.response_5xx,
            StatusClass::ClientError => &self.response_4xx,
            StatusClass::Redirection => &self.response_3xx,
            StatusClass::Success => &self.response_2xx,
        }
    }

    /// Increment exactly one status-class counter. Codes below 200 are not
    /// counted.
    pub fn record_status(&self, status: u16) -> Option<StatusClass> {
        let class = StatusClass::from_status(status)?;
        self.counter(class).inc();
        Some(class)
    }
}

struct Initialized {
    prefix: Option<String>,
    counters: Arc<GlobalCounters>,
}

/// Init-once holder for the global counters.
pub struct MetricsBootstrap {
    backend: Arc<dyn MetricsBackend>,
    state: OnceCell<Initialized>,
}

impl MetricsBootstrap {
    pub fn new(backend: Arc<dyn MetricsBackend>) -> Self {
        Self {
            backend,
            state: OnceCell::new(),
        }
    }

    pub fn backend(&self) -> Arc<dyn MetricsBackend> {
        Arc::clone(&self.backend)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    /// Register the global counters on first call; return the existing ones
    /// afterwards. Concurrent first calls block until one of them finishes.
    ///
    /// A failed first call leaves the bootstrap uninitialized, but counters
    /// registered before the failure stay in the backend. Retrying on the
    /// same backend then fails with `DuplicateName` on the first of those,
    /// so a failed bootstrap needs a fresh backend.
    pub fn initialize(&self, prefix: Option<&str>) -> Result<Arc<GlobalCounters>> {
        let prefix = prefix.filter(|p| !p.is_empty());

        let state = self.state.get_or_try_init(|| {
            let counters = GlobalCounters::register(self.backend.as_ref(), prefix)?;
            tracing::info!(prefix = prefix.unwrap_or(""), "global request counters registered");
            Ok::<_, crate::error::MetricsError>(Initialized {
                prefix: prefix.map(str::to_string),
                counters: Arc::new(counters),
            })
        })?;

        if state.prefix.as_deref() != prefix {
            tracing::warn!(
                initialized = state.prefix.as_deref().unwrap_or(""),
                requested = prefix.unwrap_or(""),
                "metrics bootstrap already initialized with another prefix; keeping the first"
            );
        }
        Ok(Arc::clone(&state.counters))
    }
}
