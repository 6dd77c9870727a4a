//! Per-second rates from two timestamped counter readings

use crate::counters::{CounterSample, CounterStore};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Why a rate is (or is not) usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateStatus {
    Fresh,
    FirstObservation,
    NonPositiveElapsed,
    Stale,
    CounterReset,
}

/// Outcome of one rate computation. `rate` is always finite and never
/// negative; when `valid` is false it is 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateResult {
    pub rate: f64,
    pub valid: bool,
    pub status: RateStatus,
}

impl RateResult {
    fn invalid(status: RateStatus) -> Self {
        Self {
            rate: 0.0,
            valid: false,
            status,
        }
    }

    /// Rate, or 0 when unusable.
    pub fn or_zero(&self) -> f64 {
        if self.valid {
            self.rate
        } else {
            0.0
        }
    }
}

/// Computes rates against the last reading held in a [`CounterStore`].
#[derive(Debug, Clone, Default)]
pub struct RateComputer {
    store: CounterStore,
}

impl RateComputer {
    pub fn new(store: CounterStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CounterStore {
        &self.store
    }

    /// Records `value` for `key` and returns the rate since the previous reading.
    ///
    /// The new reading is stored even when the result is invalid, so the next
    /// call always compares against fresh state. `max_age` bounds how old the
    /// previous reading may be.
    pub fn compute(
        &self,
        key: &str,
        value: u64,
        now: Instant,
        max_age: Option<Duration>,
    ) -> RateResult {
        let current = CounterSample {
            value,
            observed_at: now,
        };
        let prior = self.store.swap(key, current);
        evaluate(prior, current, max_age)
    }

    /// Like [`compute`](Self::compute) for several related counters at once.
    pub fn compute_many(
        &self,
        readings: &[(&str, u64)],
        now: Instant,
        max_age: Option<Duration>,
    ) -> Vec<RateResult> {
        let samples: Vec<(&str, CounterSample)> = readings
            .iter()
            .map(|(key, value)| {
                (
                    *key,
                    CounterSample {
                        value: *value,
                        observed_at: now,
                    },
                )
            })
            .collect();

        let priors = self.store.swap_many(&samples);
        priors
            .into_iter()
            .zip(samples)
            .map(|(prior, (_, current))| evaluate(prior, current, max_age))
            .collect()
    }
}

fn evaluate(
    prior: Option<CounterSample>,
    current: CounterSample,
    max_age: Option<Duration>,
) -> RateResult {
    let Some(prior) = prior else {
        return RateResult::invalid(RateStatus::FirstObservation);
    };

    let elapsed = match current.observed_at.checked_duration_since(prior.observed_at) {
        Some(d) if !d.is_zero() => d,
        _ => return RateResult::invalid(RateStatus::NonPositiveElapsed),
    };

    if max_age.is_some_and(|bound| elapsed > bound) {
        return RateResult::invalid(RateStatus::Stale);
    }

    if current.value < prior.value {
        return RateResult::invalid(RateStatus::CounterReset);
    }

    RateResult {
        rate: (current.value - prior.value) as f64 / elapsed.as_secs_f64(),
        valid: true,
        status: RateStatus::Fresh,
    }
}
