// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound execution request, as accepted from the (external) HTTP/WebSocket layer.

use crate::language::LanguageId;
use crate::session::SessionId;

/// One call to `execute` or `execute_stream`. Timeout and memory are optional
/// overrides; the Executor clamps them to service ceilings before use.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub source: String,
    pub language: LanguageId,
    pub stdin: Option<Vec<u8>>,
    pub timeout_override: Option<std::time::Duration>,
    pub memory_override: Option<u64>,
    pub session_id: Option<SessionId>,
}

impl ExecutionRequest {
    pub fn new(source: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            language: LanguageId::new(language.into()),
            stdin: None,
            timeout_override: None,
            memory_override: None,
            session_id: None,
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout_override = Some(timeout);
        self
    }

    pub fn with_memory(mut self, bytes: u64) -> Self {
        self.memory_override = Some(bytes);
        self
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}
