//! In-memory backend that counts registration calls per name.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use routemetrics_core::{Counter, Histogram, MetricsBackend, MetricsError, Result};

#[derive(Default)]
pub struct TestCounter(AtomicU64);

impl Counter for TestCounter {
    fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Default)]
pub struct TestHistogram {
    samples: Mutex<Vec<Duration>>,
}

impl Histogram for TestHistogram {
    fn observe(&self, elapsed: Duration) {
        self.samples.lock().unwrap().push(elapsed);
    }
    fn sample_count(&self) -> u64 {
        self.samples.lock().unwrap().len() as u64
    }
}

#[derive(Default)]
pub struct CountingBackend {
    names: Mutex<HashMap<String, String>>,
    calls: Mutex<HashMap<String, usize>>,
    histograms: Mutex<HashMap<String, Arc<TestHistogram>>>,
}

impl CountingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// How many times `name` was passed to a register call (successful or not).
    pub fn register_calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn total_register_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn help(&self, name: &str) -> Option<String> {
        self.names.lock().unwrap().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.names.lock().unwrap().contains_key(name)
    }

    pub fn histogram_names(&self) -> Vec<String> {
        let mut v: Vec<String> = self.histograms.lock().unwrap().keys().cloned().collect();
        v.sort();
        v
    }

    fn claim(&self, name: &str, help: &str) -> Result<()> {
        *self.calls.lock().unwrap().entry(name.to_string()).or_insert(0) += 1;
        let mut names = self.names.lock().unwrap();
        if names.contains_key(name) {
            return Err(MetricsError::DuplicateName(name.to_string()));
        }
        names.insert(name.to_string(), help.to_string());
        Ok(())
    }
}

impl MetricsBackend for CountingBackend {
    fn register_counter(&self, name: &str, help: &str) -> Result<Arc<dyn Counter>> {
        self.claim(name, help)?;
        Ok(Arc::new(TestCounter::default()))
    }

    fn register_histogram(&self, name: &str, help: &str) -> Result<Arc<dyn Histogram>> {
        self.claim(name, help)?;
        let h = Arc::new(TestHistogram::default());
        self.histograms.lock().unwrap().insert(name.to_string(), Arc::clone(&h));
        Ok(h)
    }
}
