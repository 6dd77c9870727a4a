//! Last-observed values of monotonic counters
//!
//! One store lives for the whole process and is shared by every request.
//! All reads and writes go through a single lock, so a read-then-replace of
//! a slot (or of several related slots) is never interleaved with another
//! request doing the same.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Last reading of one counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSample {
    pub value: u64,
    pub observed_at: Instant,
}

type Shared<T> = Arc<Mutex<T>>;

/// Process-owned counter state keyed by metric name.
#[derive(Debug, Clone, Default)]
pub struct CounterStore {
    slots: Shared<HashMap<String, CounterSample>>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CounterSample> {
        self.slots.lock().get(key).copied()
    }

    /// Overwrites unconditionally (last write wins).
    pub fn put(&self, key: &str, sample: CounterSample) {
        self.slots.lock().insert(key.to_string(), sample);
    }

    /// Stores `sample` and returns what it replaced, atomically.
    pub fn swap(&self, key: &str, sample: CounterSample) -> Option<CounterSample> {
        self.slots.lock().insert(key.to_string(), sample)
    }

    /// Swaps several slots under one lock acquisition.
    ///
    /// Used for counters that are only meaningful together (idle/total ticks,
    /// rx/tx bytes): a concurrent caller sees either all old or all new values.
    pub fn swap_many(&self, samples: &[(&str, CounterSample)]) -> Vec<Option<CounterSample>> {
        let mut slots = self.slots.lock();
        samples
            .iter()
            .map(|(key, sample)| slots.insert((*key).to_string(), *sample))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}
