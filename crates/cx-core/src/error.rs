// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error primitives shared across more than one crate.

use thiserror::Error;

/// A lookup failed because the key isn't present. Reused by the language
/// registry, the sandbox tracker, and the stats log lookup so callers get a
/// consistent shape instead of each component defining its own "not found".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("not found: {0}")]
pub struct NotFound(pub String);

impl NotFound {
    pub fn new(what: impl Into<String>) -> Self {
        Self(what.into())
    }
}
