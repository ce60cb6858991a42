// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed error hierarchy, one `thiserror` enum per component boundary
//! (SPEC_FULL.md §7, §10). The Executor's top-level boundary converts every
//! variant into an `ExecutionResult`/`ExecutionEvent` before it reaches the
//! caller; callers of `cx-engine` directly (the CLI) see these directly.

use cx_adapters::RuntimeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unsupported language: {0}")]
    Unsupported(String),
}

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("sandbox not tracked: {0}")]
    NotTracked(String),
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error("invariant violation: {0}")]
    Invariant(String),
}

#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
