// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The record the Container Manager keeps for one live sandbox.

use crate::language::LanguageId;
use crate::session::SessionId;
use std::time::{Duration, Instant};

crate::define_id! {
    /// Identifier for one execution / its sandbox. Shared 1:1 between the two.
    pub struct SandboxId;
}

/// Lifecycle state of a tracked sandbox. Transitions are monotonic; a sandbox
/// never moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    Created,
    Running,
    Terminating,
    Removed,
}

/// Everything the Container Manager needs to track one live sandbox. `handle` is
/// runtime-specific (a Docker container id in the bollard adapter, a synthetic
/// token in test doubles).
#[derive(Debug, Clone)]
pub struct Sandbox {
    pub id: SandboxId,
    pub handle: String,
    pub language_id: LanguageId,
    pub session_id: Option<SessionId>,
    pub created_at: Instant,
    pub timeout: Duration,
    pub state: SandboxState,
}

impl Sandbox {
    pub fn new(
        id: SandboxId,
        handle: impl Into<String>,
        language_id: LanguageId,
        session_id: Option<SessionId>,
        created_at: Instant,
        timeout: Duration,
    ) -> Self {
        Self {
            id,
            handle: handle.into(),
            language_id,
            session_id,
            created_at,
            timeout,
            state: SandboxState::Created,
        }
    }

    /// Age of the sandbox relative to `now`. Callers pass in the clock's `now()`
    /// rather than reading a wall clock directly so tests stay deterministic.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// Whether this sandbox has outlived `timeout + grace` as of `now`.
    pub fn is_expired(&self, now: Instant, grace: Duration) -> bool {
        self.age(now) > self.timeout + grace
    }
}
