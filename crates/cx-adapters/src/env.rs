// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Reaper sweep cadence (default: 60s, per SPEC_FULL.md §4.C).
pub fn reaper_interval() -> Duration {
    parse_duration_ms("CX_REAPER_INTERVAL_MS").unwrap_or(Duration::from_secs(60))
}

/// Maximum number of images allowed to pull concurrently (default: 4). Does
/// not affect the per-image dedup barrier, which always collapses to one pull
/// regardless of this value.
pub fn max_concurrent_pulls() -> usize {
    std::env::var("CX_MAX_CONCURRENT_PULLS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(4)
}

/// Docker connection target. `None` means use the platform default
/// (`DOCKER_HOST` env var or the local socket).
pub fn runtime_connect_target() -> Option<String> {
    std::env::var("CX_DOCKER_HOST").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaper_interval_defaults_to_60s() {
        std::env::remove_var("CX_REAPER_INTERVAL_MS");
        assert_eq!(reaper_interval(), Duration::from_secs(60));
    }

    #[test]
    fn max_concurrent_pulls_defaults_to_four() {
        std::env::remove_var("CX_MAX_CONCURRENT_PULLS");
        assert_eq!(max_concurrent_pulls(), 4);
    }
}
