// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.
//!
//! Mirrors `cx_adapters::env`: defaults match SPEC_FULL.md's stated numbers,
//! env vars only raise or lower them, never change their meaning.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

fn parse_u64(var: &str) -> Option<u64> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok())
}

/// Maximum timeout a caller may request (service ceiling, SPEC_FULL.md §6).
pub fn max_timeout() -> Duration {
    parse_duration_ms("CX_MAX_TIMEOUT_MS").unwrap_or(Duration::from_secs(120))
}

/// Maximum memory limit a caller may request, in bytes.
pub fn max_memory_bytes() -> u64 {
    parse_u64("CX_MAX_MEMORY_BYTES").unwrap_or(512 * 1024 * 1024)
}

/// Maximum stdin payload size, in bytes.
pub fn max_stdin_bytes() -> u64 {
    parse_u64("CX_MAX_STDIN_BYTES").unwrap_or(1024 * 1024)
}

/// Grace period added to a sandbox's declared timeout before the reaper's
/// internal sweep force-cleans it (SPEC_FULL.md §4.C).
pub fn grace_period() -> Duration {
    parse_duration_ms("CX_GRACE_PERIOD_MS").unwrap_or(Duration::from_secs(30))
}

/// Age beyond which a labeled-but-untracked container is considered orphaned
/// by the reaper's external sweep.
pub fn orphan_age() -> Duration {
    parse_duration_ms("CX_ORPHAN_AGE_MS").unwrap_or(Duration::from_secs(300))
}

/// Grace period passed to the runtime's `stop` call during cleanup.
pub fn stop_grace() -> Duration {
    parse_duration_ms("CX_STOP_GRACE_MS").unwrap_or(Duration::from_secs(5))
}

/// Tmpfs size mounted at `/app` inside every sandbox.
pub fn tmpfs_size_bytes() -> u64 {
    parse_u64("CX_TMPFS_SIZE_BYTES").unwrap_or(100 * 1024 * 1024)
}

/// Non-root uid/gid every sandbox runs as.
pub fn sandbox_uid_gid() -> (u32, u32) {
    (1000, 1000)
}

/// `cpu_quota`/`cpu_period` microseconds capping one sandbox at half a core
/// by default (SPEC_FULL.md §4.C, §9: per-sandbox, not aggregate).
pub fn cpu_quota_period() -> (i64, i64) {
    (50_000, 100_000)
}

/// Label value identifying sandboxes owned by this service, used by the
/// reaper's external sweep and attached at create time.
pub const SERVICE_LABEL: &str = "service";
pub const SERVICE_LABEL_VALUE: &str = "code-execution";

/// Validator sandbox limits (SPEC_FULL.md §4.F): short-lived, tightly capped.
pub fn validator_timeout() -> Duration {
    parse_duration_ms("CX_VALIDATOR_TIMEOUT_MS").unwrap_or(Duration::from_secs(10))
}

pub fn validator_memory_bytes() -> u64 {
    parse_u64("CX_VALIDATOR_MEMORY_BYTES").unwrap_or(64 * 1024 * 1024)
}
