// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Counter correction
//!
//! Device counters restart from zero on reboot and wrap on overflow. The
//! cache remembers the last raw reading per counter and, when a reading
//! goes down, re-bases the counter on it, so the corrected value is 0 at
//! the reset and ramps up from there.
//!
//! Any decrease counts as a reset. A single low misreading therefore
//! re-bases the counter and shows up as a dip in the exported series.

use std::collections::HashMap;
use std::sync::Mutex;

/// Identity of one counter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CounterKey {
    pub service: String,
    pub action: String,
    pub variable: String,
}

impl CounterKey {
    pub fn new(service: &str, action: &str, variable: &str) -> Self {
        Self {
            service: service.to_string(),
            action: action.to_string(),
            variable: variable.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CounterState {
    last_value: f64,
    offset: f64,
}

/// Per-counter correction state shared by all scrapes of a process
#[derive(Debug, Default)]
pub struct CounterCorrection {
    counters: Mutex<HashMap<CounterKey, CounterState>>,
}

impl CounterCorrection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a raw reading and return the corrected value.
    ///
    /// A non-finite reading leaves the state untouched and yields the last
    /// corrected value.
    pub fn correct(&self, key: &CounterKey, raw: f64) -> f64 {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let state = counters.entry(key.clone()).or_default();

        if !raw.is_finite() {
            log::debug!(
                "Counter {}/{}/{} ignored non-finite reading {}",
                key.service,
                key.action,
                key.variable,
                raw
            );
            return state.last_value - state.offset;
        }

        if raw < state.last_value {
            log::debug!(
                "Counter {}/{}/{} reset: {} -> {}",
                key.service,
                key.action,
                key.variable,
                state.last_value,
                raw
            );
            state.offset = raw;
        }
        state.last_value = raw;
        raw - state.offset
    }

    /// Number of counters tracked
    pub fn len(&self) -> usize {
        self.counters.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
