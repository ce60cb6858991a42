// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runtime adapter: the Container Manager's sole collaborator for
//! actually creating, running, and destroying OS-level sandboxes.

mod docker;
mod fake;
mod noop;

pub use docker::DockerRuntime;
pub use noop::NoOpContainerRuntime;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeContainerRuntime, RuntimeCall};

use async_trait::async_trait;
use cx_core::OutputChannel;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from the container runtime collaborator.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("image pull failed for {image}: {source}")]
    ImagePull { image: String, source: String },
    #[error("container create failed: {0}")]
    CreateFailed(String),
    #[error("exec failed: {0}")]
    ExecFailed(String),
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("runtime unavailable: {0}")]
    Unavailable(String),
}

/// Everything needed to create one hardened sandbox. Built by the Container
/// Manager from a `LanguageSpec` plus the per-request timeout/memory.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub image: String,
    pub command: Vec<String>,
    pub working_dir: String,
    pub memory_bytes: u64,
    pub cpu_quota: i64,
    pub cpu_period: i64,
    pub uid: u32,
    pub gid: u32,
    pub tmpfs_size_bytes: u64,
    pub labels: HashMap<String, String>,
    pub env: Vec<(String, String)>,
}

/// One chunk of demuxed output from a running exec.
#[derive(Debug, Clone)]
pub struct OutputFrame {
    pub channel: OutputChannel,
    pub bytes: Vec<u8>,
}

/// Handle to a streaming exec in progress. `output_rx` yields frames as they
/// arrive; the channel closes when the process exits or the stream errors.
pub struct ExecHandle {
    pub exec_id: String,
    pub output_rx: mpsc::Receiver<OutputFrame>,
}

/// Result of a one-shot (non-streaming) exec, used for setup commands.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub exit_code: i32,
    pub output: Vec<u8>,
}

/// Live resource usage for a single sandbox, as reported by the runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerStats {
    pub memory_usage_bytes: u64,
    pub cpu_usage_nanos: u64,
}

/// A container discovered via a label filter, independent of our own tracker.
/// Used by the reaper's external/orphan sweep.
#[derive(Debug, Clone)]
pub struct LabeledContainer {
    pub handle: String,
    pub labels: HashMap<String, String>,
}

/// Abstraction over the OS-level container runtime (Docker, in production).
/// Every suspension point named in the concurrency model is one method here.
#[async_trait]
pub trait ContainerRuntime: Clone + Send + Sync + 'static {
    /// Verify the image is present locally; pull it if missing. Implementations
    /// must dedupe concurrent first-uses of the same image (a per-image barrier).
    async fn ensure_image(&self, image: &str) -> Result<(), RuntimeError>;

    /// Create (but do not start) a sandbox from `spec`. Returns the runtime's
    /// opaque handle (a container id, in the Docker adapter).
    async fn create(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    async fn start(&self, handle: &str) -> Result<(), RuntimeError>;

    /// Extract a tar archive into `dest_dir` inside the sandbox.
    async fn upload_archive(
        &self,
        handle: &str,
        dest_dir: &str,
        tar_bytes: Vec<u8>,
    ) -> Result<(), RuntimeError>;

    /// Run one setup command to completion and collect its combined output.
    /// Non-streaming: setup steps are expected to be short and are not
    /// surfaced to the caller unless they fail.
    async fn run_setup(
        &self,
        handle: &str,
        command: &str,
        workdir: &str,
    ) -> Result<ExecOutcome, RuntimeError>;

    /// Start the language's run command with stdin attached from the start
    /// (never a second exec), streaming demuxed output as it arrives.
    async fn exec_stream(
        &self,
        handle: &str,
        command: &[String],
        workdir: &str,
        stdin: Option<Vec<u8>>,
    ) -> Result<ExecHandle, RuntimeError>;

    /// Exit code of a previously started exec. `None` if it hasn't exited yet.
    async fn inspect_exec(&self, handle: &str, exec_id: &str) -> Result<Option<i32>, RuntimeError>;

    async fn stats(&self, handle: &str) -> Result<ContainerStats, RuntimeError>;

    async fn logs(&self, handle: &str) -> Result<Vec<u8>, RuntimeError>;

    /// Stop with a short grace period, then the caller is expected to call
    /// `remove`. Implementations should not treat "already stopped" as an error.
    async fn stop(&self, handle: &str, grace: Duration) -> Result<(), RuntimeError>;

    /// Force-remove. Idempotent: removing an already-removed/unknown handle
    /// is not an error.
    async fn remove(&self, handle: &str) -> Result<(), RuntimeError>;

    /// List all containers (regardless of our own tracker) carrying `label`,
    /// used by the reaper's external/orphan sweep.
    async fn list_labeled(&self, label: &str) -> Result<Vec<LabeledContainer>, RuntimeError>;
}
