// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container Manager counters and gauges.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Monotonic counters plus point-in-time gauges, as returned by `stats()`.
/// Counters are updated under the Container Manager's lock; gauges are
/// recomputed on read from the live sandbox set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total_executions: u64,
    pub total_execution_time: Duration,
    pub active_containers: u64,
    pub memory_usage_bytes: u64,
    pub cpu_usage_nanos: u64,
}

impl Stats {
    pub fn average_execution_time(&self) -> Duration {
        if self.total_executions == 0 {
            Duration::ZERO
        } else {
            self.total_execution_time / self.total_executions as u32
        }
    }

    pub fn record_execution(&mut self, duration: Duration) {
        self.total_executions += 1;
        self.total_execution_time += duration;
    }
}
