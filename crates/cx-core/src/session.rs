// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier type for grouping sandboxes by caller connection.
//!
//! A SessionId groups zero or more [`crate::SandboxId`]s originating from the same
//! caller connection (e.g. one WebSocket). It is a weak relation: sessions never own
//! sandboxes, they only index them for mass cleanup on disconnect.

crate::define_id! {
    /// Unique identifier for a caller session.
    pub struct SessionId;
}
