// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor (SPEC_FULL.md §4.D): orchestrates one run end to end —
//! prepare → create → inject → setup → run/stream → collect → cleanup.
//!
//! `execute` and `execute_stream` share one implementation (SPEC_FULL.md §9):
//! the core state machine always emits into an optional event channel and
//! always returns the final `ExecutionResult`; `execute` drives it with no
//! channel, `execute_stream` drives it with one and returns the receiver as
//! a stream immediately. Grounded on the original's
//! `_execute_in_container`/`_execute_in_container_stream`, resolving the
//! flagged double-exec ambiguity by running the language command through
//! exactly one `exec_stream` call either way.

use crate::archive;
use crate::container_manager::ContainerManager;
use crate::env;
use crate::error::ExecuteError;
use crate::preparer;
use crate::registry::LanguageRegistry;
use crate::stats_collector::StatsCollector;
use crate::stream_mux::Demuxer;
use cx_adapters::ContainerRuntime;
use cx_core::{
    Clock, Encoding, ExecutionEvent, ExecutionRequest, ExecutionResult, ExecutionStatus, IdGen,
    LanguageSpec, SandboxId,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info_span, warn, Instrument};

const STREAM_BUFFER: usize = 256;

pub struct Executor<R: ContainerRuntime, C: Clock, G: IdGen> {
    registry: LanguageRegistry,
    container_manager: Arc<ContainerManager<R, C>>,
    stats: Arc<StatsCollector<R, C>>,
    clock: C,
    id_gen: G,
}

impl<R: ContainerRuntime, C: Clock, G: IdGen> Executor<R, C, G> {
    pub fn new(
        registry: LanguageRegistry,
        container_manager: Arc<ContainerManager<R, C>>,
        stats: Arc<StatsCollector<R, C>>,
        clock: C,
        id_gen: G,
    ) -> Self {
        Self { registry, container_manager, stats, clock, id_gen }
    }

    /// Validate the request against the registry and service ceilings
    /// without creating anything. A `BadRequest`/`Registry` error here means
    /// no sandbox was ever created (SPEC_FULL.md §7).
    fn check(&self, request: &ExecutionRequest) -> Result<LanguageSpec, ExecuteError> {
        let spec = self.registry.lookup(&request.language)?.clone();

        if let Some(timeout) = request.timeout_override {
            if timeout > env::max_timeout() {
                return Err(ExecuteError::BadRequest(format!(
                    "timeout {timeout:?} exceeds service ceiling {:?}",
                    env::max_timeout()
                )));
            }
        }
        if let Some(memory) = request.memory_override {
            if memory > env::max_memory_bytes() {
                return Err(ExecuteError::BadRequest(format!(
                    "memory {memory} exceeds service ceiling {}",
                    env::max_memory_bytes()
                )));
            }
        }
        if let Some(stdin) = &request.stdin {
            if stdin.len() as u64 > env::max_stdin_bytes() {
                return Err(ExecuteError::BadRequest(format!(
                    "stdin {} bytes exceeds service ceiling {}",
                    stdin.len(),
                    env::max_stdin_bytes()
                )));
            }
        }
        Ok(spec)
    }

    /// Run to completion and collect every event into one `ExecutionResult`.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult, ExecuteError> {
        let spec = self.check(&request)?;
        let exec_id = SandboxId::new(self.id_gen.next());
        Ok(self.run(exec_id, spec, request, None).await)
    }

    /// Run to completion, streaming every event as it happens. Dropping the
    /// returned stream mid-execution cancels the underlying run: cleanup
    /// still happens, but no further events are emitted.
    pub async fn execute_stream(
        self: &Arc<Self>,
        request: ExecutionRequest,
    ) -> Result<ReceiverStream<ExecutionEvent>, ExecuteError> {
        let spec = self.check(&request)?;
        let exec_id = SandboxId::new(self.id_gen.next());
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run(exec_id, spec, request, Some(tx)).await;
        });
        Ok(ReceiverStream::new(rx))
    }

    pub async fn cleanup_session(&self, session_id: &cx_core::SessionId) {
        self.container_manager.cleanup_session(session_id).await;
    }

    pub async fn logs(&self, id: &SandboxId) -> Result<Vec<u8>, ExecuteError> {
        Ok(self.container_manager.logs(id).await?)
    }

    /// The shared state machine. Never returns early on infra failure: every
    /// path folds into one terminal `ExecutionResult`, emitting the matching
    /// terminal event when a channel is attached.
    async fn run(
        &self,
        id: SandboxId,
        spec: LanguageSpec,
        request: ExecutionRequest,
        tx: Option<mpsc::Sender<ExecutionEvent>>,
    ) -> ExecutionResult {
        let span = info_span!("execute", execution_id = %id, language = %spec.id);
        async {
            let start = Instant::now();
            emit(&tx, ExecutionEvent::Start {
                execution_id: id.to_string(),
                timestamp: self.clock.unix_time(),
            })
            .await;

            let timeout = request.timeout_override.unwrap_or(spec.default_timeout);
            let memory = request.memory_override.unwrap_or(spec.default_memory_bytes);

            let result = self.run_inner(&id, &spec, &request, timeout, memory, &tx, start).await;

            let terminal = match &result.status {
                ExecutionStatus::Completed => ExecutionEvent::Complete {
                    execution_id: id.to_string(),
                    execution_time: result.duration.as_secs_f64(),
                    timestamp: self.clock.unix_time(),
                },
                ExecutionStatus::Timeout => ExecutionEvent::Timeout {
                    execution_id: id.to_string(),
                    message: result.stderr.clone(),
                    execution_time: result.duration.as_secs_f64(),
                    timestamp: self.clock.unix_time(),
                },
                ExecutionStatus::Error => ExecutionEvent::Error {
                    execution_id: id.to_string(),
                    message: result.stderr.clone(),
                    execution_time: result.duration.as_secs_f64(),
                    timestamp: self.clock.unix_time(),
                },
            };
            emit(&tx, terminal).await;

            self.container_manager.cleanup(&id).await;
            self.stats.record_execution(result.duration);
            result
        }
        .instrument(span)
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_inner(
        &self,
        id: &SandboxId,
        spec: &LanguageSpec,
        request: &ExecutionRequest,
        timeout: Duration,
        memory: u64,
        tx: &Option<mpsc::Sender<ExecutionEvent>>,
        start: Instant,
    ) -> ExecutionResult {
        let prepared = preparer::prepare(&request.source, spec);

        if let Err(e) = self
            .container_manager
            .create(id.clone(), spec, timeout, memory, request.session_id.clone())
            .await
        {
            return ExecutionResult::error(id.to_string(), e.to_string());
        }

        let tar_bytes = match archive::build(spec, &prepared) {
            Ok(bytes) => bytes,
            Err(e) => return ExecutionResult::error(id.to_string(), e.to_string()),
        };
        if let Err(e) = self.container_manager.upload_archive(id, tar_bytes).await {
            return ExecutionResult::error(id.to_string(), e.to_string());
        }

        // A failed setup step is logged and carried along, not fatal on its
        // own: it may just be installing a tool whose absence only manifests
        // once the run step actually needs it (SPEC_FULL.md §4.D step 6).
        let mut setup_stderr = String::new();
        for command in &spec.setup_commands {
            emit(tx, ExecutionEvent::Setup {
                execution_id: id.to_string(),
                command: command.clone(),
                timestamp: self.clock.unix_time(),
            })
            .await;
            match self.container_manager.run_setup(id, command).await {
                Ok(outcome) if outcome.exit_code != 0 => {
                    warn!(command, exit_code = outcome.exit_code, "setup command failed");
                    setup_stderr.push_str(&String::from_utf8_lossy(&outcome.output));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(command, error = %e, "setup command errored");
                    setup_stderr.push_str(&e.to_string());
                }
            }
        }

        self.container_manager.mark_running(id);

        let run = self.run_and_collect(id, spec, request.stdin.clone(), tx);
        match tokio::time::timeout(timeout, run).await {
            Ok(result) => match result {
                Ok((stdout, stderr, exit_code)) => ExecutionResult {
                    execution_id: id.to_string(),
                    status: ExecutionStatus::Completed,
                    stdout,
                    stderr,
                    duration: start.elapsed(),
                    peak_memory_bytes: self.container_manager.peak_memory(id).await,
                    exit_code,
                },
                Err(e) => {
                    let mut message = setup_stderr;
                    if !message.is_empty() {
                        message.push('\n');
                    }
                    message.push_str(&e.to_string());
                    ExecutionResult::error(id.to_string(), message)
                }
            },
            Err(_elapsed) => ExecutionResult::timeout(id.to_string(), start.elapsed()),
        }
    }

    /// Start the run command with stdin attached, demux its output into
    /// events (and into accumulated stdout/stderr for the unary path), and
    /// wait for the exec to exit.
    async fn run_and_collect(
        &self,
        id: &SandboxId,
        spec: &LanguageSpec,
        stdin: Option<Vec<u8>>,
        tx: &Option<mpsc::Sender<ExecutionEvent>>,
    ) -> Result<(String, String, i32), crate::error::ContainerError> {
        let mut exec = self
            .container_manager
            .exec_stream(id, &spec.run_command, stdin)
            .await?;

        let mut demuxer = Demuxer::new();
        let mut stdout = String::new();
        let mut stderr = String::new();

        while let Some(frame) = exec.output_rx.recv().await {
            let channel = frame.channel;
            if let Some(chunk) = demuxer.push(frame) {
                match channel {
                    cx_core::OutputChannel::Stdout => stdout.push_str(&chunk.text),
                    cx_core::OutputChannel::Stderr => stderr.push_str(&chunk.text),
                }
                let sent = emit(tx, ExecutionEvent::Output {
                    execution_id: id.to_string(),
                    data: chunk.text,
                    encoding: chunk.encoding,
                    channel,
                    timestamp: self.clock.unix_time(),
                })
                .await;
                if !sent {
                    break;
                }
            }
        }
        for chunk in demuxer.flush() {
            if chunk.encoding == Some(Encoding::Hex) {
                match chunk.channel {
                    cx_core::OutputChannel::Stdout => stdout.push_str(&chunk.text),
                    cx_core::OutputChannel::Stderr => stderr.push_str(&chunk.text),
                }
            }
        }

        let exit_code = self
            .container_manager
            .inspect_exec(id, &exec.exec_id)
            .await?
            .unwrap_or(-1);

        Ok((stdout, stderr, exit_code))
    }
}

/// Send one event if a channel is attached. Returns `false` when the
/// receiver has gone away, so the caller can stop driving the output loop
/// early; cleanup always runs regardless (SPEC_FULL.md §5 cancellation).
async fn emit(tx: &Option<mpsc::Sender<ExecutionEvent>>, event: ExecutionEvent) -> bool {
    match tx {
        Some(tx) => tx.send(event).await.is_ok(),
        None => true,
    }
}
