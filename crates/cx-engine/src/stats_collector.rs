// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stats Collector (SPEC_FULL.md §4.G): a thin facade over the Container
//! Manager's counters. Counters are updated here under a lock; gauges are
//! recomputed on read by iterating live sandboxes and querying the runtime.
//! Grounded on the original's `container_manager.py:get_stats`.

use crate::container_manager::ContainerManager;
use cx_adapters::ContainerRuntime;
use cx_core::{Clock, Stats};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub struct StatsCollector<R: ContainerRuntime, C: Clock> {
    container_manager: Arc<ContainerManager<R, C>>,
    counters: Mutex<Stats>,
}

impl<R: ContainerRuntime, C: Clock> StatsCollector<R, C> {
    pub fn new(container_manager: Arc<ContainerManager<R, C>>) -> Self {
        Self {
            container_manager,
            counters: Mutex::new(Stats::default()),
        }
    }

    /// Record one finished execution's duration under the counters lock.
    /// Called once per execution regardless of terminal status.
    pub fn record_execution(&self, duration: Duration) {
        self.counters.lock().record_execution(duration);
    }

    /// Snapshot counters plus freshly-queried gauges. The counters half is a
    /// single lock acquisition; the gauges half queries the runtime once per
    /// live sandbox and so is the only part that can suspend.
    pub async fn get_stats(&self) -> Stats {
        let mut stats = self.counters.lock().clone();
        stats.active_containers = self.container_manager.active_count();
        let (memory_usage_bytes, cpu_usage_nanos) = self.container_manager.aggregate_resource_usage().await;
        stats.memory_usage_bytes = memory_usage_bytes;
        stats.cpu_usage_nanos = cpu_usage_nanos;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cx_adapters::FakeContainerRuntime;
    use cx_core::FakeClock;

    #[tokio::test]
    async fn records_accumulate_into_average() {
        let manager = Arc::new(ContainerManager::new(FakeContainerRuntime::new(), FakeClock::new()));
        let collector = StatsCollector::new(manager);

        collector.record_execution(Duration::from_secs(2));
        collector.record_execution(Duration::from_secs(4));

        let stats = collector.get_stats().await;
        assert_eq!(stats.total_executions, 2);
        assert_eq!(stats.average_execution_time(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn active_containers_gauge_reflects_container_manager() {
        let manager = Arc::new(ContainerManager::new(FakeContainerRuntime::new(), FakeClock::new()));
        let collector = StatsCollector::new(Arc::clone(&manager));

        assert_eq!(collector.get_stats().await.active_containers, 0);
    }
}
