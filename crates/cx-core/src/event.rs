// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming event variants emitted by `execute_stream`.
//!
//! Ordering contract: `Start` is always first; exactly one of
//! `Complete`/`Timeout`/`Error` is emitted and it is always last.

use serde::{Deserialize, Serialize};

/// Which container stream a chunk of output came from. Never merged into one
/// channel — callers always see the originating fd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputChannel {
    Stdout,
    Stderr,
}

/// How an `output` event's `data` field is encoded. Defaults to plain UTF-8;
/// `Hex` is used only for chunks that didn't decode cleanly, so no bytes are
/// ever silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Utf8,
    Hex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExecutionEvent {
    Start {
        execution_id: String,
        timestamp: f64,
    },
    Status {
        execution_id: String,
        message: String,
        timestamp: f64,
    },
    Setup {
        execution_id: String,
        command: String,
        timestamp: f64,
    },
    Output {
        execution_id: String,
        data: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        encoding: Option<Encoding>,
        channel: OutputChannel,
        timestamp: f64,
    },
    Exit {
        execution_id: String,
        exit_code: i32,
        timestamp: f64,
    },
    Timeout {
        execution_id: String,
        message: String,
        execution_time: f64,
        timestamp: f64,
    },
    Error {
        execution_id: String,
        message: String,
        execution_time: f64,
        timestamp: f64,
    },
    Complete {
        execution_id: String,
        execution_time: f64,
        timestamp: f64,
    },
}

impl ExecutionEvent {
    pub fn execution_id(&self) -> &str {
        match self {
            ExecutionEvent::Start { execution_id, .. }
            | ExecutionEvent::Status { execution_id, .. }
            | ExecutionEvent::Setup { execution_id, .. }
            | ExecutionEvent::Output { execution_id, .. }
            | ExecutionEvent::Exit { execution_id, .. }
            | ExecutionEvent::Timeout { execution_id, .. }
            | ExecutionEvent::Error { execution_id, .. }
            | ExecutionEvent::Complete { execution_id, .. } => execution_id,
        }
    }

    /// True for the event kinds that may terminate a stream. Used by callers
    /// and tests to assert "at most one terminal event".
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionEvent::Timeout { .. } | ExecutionEvent::Error { .. } | ExecutionEvent::Complete { .. }
        )
    }
}
