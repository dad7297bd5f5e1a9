//! Selection policy: which endpoints get instrumented at all.

use crate::endpoint::EndpointDescriptor;

/// Decided once per endpoint, when the router attaches interceptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    instrument_all: bool,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            instrument_all: true,
        }
    }
}

impl SelectionPolicy {
    pub fn new(instrument_all: bool) -> Self {
        Self { instrument_all }
    }

    pub fn instrument_all(&self) -> bool {
        self.instrument_all
    }

    /// Explicitly marked endpoints always pass; the rest only when
    /// instrument-all is on.
    pub fn should_instrument(&self, endpoint: &EndpointDescriptor) -> bool {
        endpoint.is_marked() || self.instrument_all
    }
}
