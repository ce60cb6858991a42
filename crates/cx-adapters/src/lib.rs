// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the container runtime collaborator.

mod env;
pub mod runtime;
pub mod traced;

pub use env::{max_concurrent_pulls, reaper_interval, runtime_connect_target};
pub use runtime::{
    ContainerRuntime, ContainerSpec, ContainerStats, DockerRuntime, ExecHandle, ExecOutcome,
    LabeledContainer, NoOpContainerRuntime, OutputFrame, RuntimeError,
};
pub use traced::TracedRuntime;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use runtime::{FakeContainerRuntime, RuntimeCall};
