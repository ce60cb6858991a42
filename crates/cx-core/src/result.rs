// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The collected (unary) outcome of one execution.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Terminal status of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Completed,
    Timeout,
    Error,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionStatus::Completed => "COMPLETED",
            ExecutionStatus::Timeout => "TIMEOUT",
            ExecutionStatus::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// The collected outcome of `execute()`: the same state machine as
/// `execute_stream`, folded into one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub execution_id: String,
    pub status: ExecutionStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub peak_memory_bytes: u64,
    pub exit_code: i32,
}

impl ExecutionResult {
    pub fn error(execution_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            status: ExecutionStatus::Error,
            stdout: String::new(),
            stderr: message.into(),
            duration: Duration::ZERO,
            peak_memory_bytes: 0,
            exit_code: -1,
        }
    }

    pub fn timeout(execution_id: impl Into<String>, duration: Duration) -> Self {
        Self {
            execution_id: execution_id.into(),
            status: ExecutionStatus::Timeout,
            stdout: String::new(),
            stderr: "Execution timed out".to_string(),
            duration,
            peak_memory_bytes: 0,
            exit_code: -1,
        }
    }
}
