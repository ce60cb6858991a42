// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake container runtime for deterministic engine tests (no Docker daemon).
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    ContainerRuntime, ContainerSpec, ContainerStats, ExecHandle, ExecOutcome, LabeledContainer,
    OutputFrame, RuntimeError,
};
use async_trait::async_trait;
use cx_core::OutputChannel;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Recorded runtime call, for assertions in engine tests.
#[derive(Debug, Clone)]
pub enum RuntimeCall {
    EnsureImage { image: String },
    Create { image: String },
    Start { handle: String },
    UploadArchive { handle: String, dest_dir: String },
    RunSetup { handle: String, command: String },
    ExecStream { handle: String, command: Vec<String> },
    Stop { handle: String },
    Remove { handle: String },
    ListLabeled { label: String },
}

/// Scripted behavior for one fake container.
#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub labels: HashMap<String, String>,
    pub removed: bool,
    /// Output frames to emit, in order, when `exec_stream` is called.
    pub output: Vec<OutputFrame>,
    pub exit_code: i32,
    pub stats: ContainerStats,
    pub setup_exit_code: i32,
    pub setup_output: Vec<u8>,
}

impl Default for FakeContainer {
    fn default() -> Self {
        Self {
            labels: HashMap::new(),
            removed: false,
            output: Vec::new(),
            exit_code: 0,
            stats: ContainerStats::default(),
            setup_exit_code: 0,
            setup_output: Vec::new(),
        }
    }
}

struct FakeState {
    containers: HashMap<String, FakeContainer>,
    calls: Vec<RuntimeCall>,
    next_id: u64,
    images_present: std::collections::HashSet<String>,
    fail_create: bool,
    fail_exec_stream: bool,
    default_output: Vec<OutputFrame>,
    default_exit_code: i32,
    default_setup_exit_code: i32,
    default_setup_output: Vec<u8>,
    default_stats: ContainerStats,
}

/// In-memory `ContainerRuntime` double. Every sandbox created through it is
/// scriptable via [`FakeContainerRuntime::set_output`] /
/// [`FakeContainerRuntime::set_exit_code`] before `exec_stream` is called.
#[derive(Clone)]
pub struct FakeContainerRuntime {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeContainerRuntime {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                containers: HashMap::new(),
                calls: Vec::new(),
                next_id: 0,
                images_present: std::collections::HashSet::new(),
                fail_create: false,
                fail_exec_stream: false,
                default_output: Vec::new(),
                default_exit_code: 0,
                default_setup_exit_code: 0,
                default_setup_output: Vec::new(),
                default_stats: ContainerStats::default(),
            })),
        }
    }
}

impl FakeContainerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.inner.lock().calls.clone()
    }

    pub fn tracked_count(&self) -> usize {
        self.inner.lock().containers.values().filter(|c| !c.removed).count()
    }

    pub fn set_output(&self, handle: &str, output: Vec<OutputFrame>) {
        if let Some(c) = self.inner.lock().containers.get_mut(handle) {
            c.output = output;
        }
    }

    pub fn set_stdout(&self, handle: &str, text: &str) {
        self.set_output(
            handle,
            vec![OutputFrame {
                channel: OutputChannel::Stdout,
                bytes: text.as_bytes().to_vec(),
            }],
        );
    }

    pub fn set_exit_code(&self, handle: &str, code: i32) {
        if let Some(c) = self.inner.lock().containers.get_mut(handle) {
            c.exit_code = code;
        }
    }

    pub fn fail_next_create(&self) {
        self.inner.lock().fail_create = true;
    }

    /// Script the next `exec_stream` call (on any container) to return an
    /// error instead of a handle, for exercising the Executor's error path.
    pub fn fail_next_exec_stream(&self) {
        self.inner.lock().fail_exec_stream = true;
    }

    /// Output every container created *after* this call will emit from
    /// `exec_stream`, unless overridden per-handle via `set_output`. Lets
    /// callers script a run's output before the execution id/handle it will
    /// get is known.
    pub fn set_default_stdout(&self, text: &str) {
        let mut inner = self.inner.lock();
        inner.default_output = vec![OutputFrame {
            channel: OutputChannel::Stdout,
            bytes: text.as_bytes().to_vec(),
        }];
    }

    pub fn set_default_exit_code(&self, code: i32) {
        self.inner.lock().default_exit_code = code;
    }

    /// Script every container created *after* this call to report this exit
    /// code/output from `run_setup`, so tests can exercise a failing setup
    /// step without needing a real sandbox.
    pub fn set_default_setup_failure(&self, exit_code: i32, output: &str) {
        let mut inner = self.inner.lock();
        inner.default_setup_exit_code = exit_code;
        inner.default_setup_output = output.as_bytes().to_vec();
    }

    /// Script every container created *after* this call to report this
    /// memory usage from `stats`.
    pub fn set_default_memory_usage_bytes(&self, bytes: u64) {
        self.inner.lock().default_stats.memory_usage_bytes = bytes;
    }

    pub fn label_orphan(&self, handle: &str, labels: HashMap<String, String>) {
        self.inner.lock().containers.insert(
            handle.to_string(),
            FakeContainer {
                labels,
                ..Default::default()
            },
        );
    }
}

#[async_trait]
impl ContainerRuntime for FakeContainerRuntime {
    async fn ensure_image(&self, image: &str) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::EnsureImage {
            image: image.to_string(),
        });
        inner.images_present.insert(image.to_string());
        Ok(())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Create {
            image: spec.image.clone(),
        });
        if inner.fail_create {
            inner.fail_create = false;
            return Err(RuntimeError::CreateFailed("scripted failure".to_string()));
        }
        inner.next_id += 1;
        let handle = format!("fake-container-{}", inner.next_id);
        let output = inner.default_output.clone();
        let exit_code = inner.default_exit_code;
        let setup_exit_code = inner.default_setup_exit_code;
        let setup_output = inner.default_setup_output.clone();
        let stats = inner.default_stats;
        inner.containers.insert(
            handle.clone(),
            FakeContainer {
                labels: spec.labels.clone(),
                output,
                exit_code,
                setup_exit_code,
                setup_output,
                stats,
                ..Default::default()
            },
        );
        Ok(handle)
    }

    async fn start(&self, handle: &str) -> Result<(), RuntimeError> {
        self.inner.lock().calls.push(RuntimeCall::Start {
            handle: handle.to_string(),
        });
        Ok(())
    }

    async fn upload_archive(
        &self,
        handle: &str,
        dest_dir: &str,
        _tar_bytes: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        self.inner.lock().calls.push(RuntimeCall::UploadArchive {
            handle: handle.to_string(),
            dest_dir: dest_dir.to_string(),
        });
        Ok(())
    }

    async fn run_setup(
        &self,
        handle: &str,
        command: &str,
        _workdir: &str,
    ) -> Result<ExecOutcome, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::RunSetup {
            handle: handle.to_string(),
            command: command.to_string(),
        });
        match inner.containers.get(handle) {
            Some(c) => Ok(ExecOutcome {
                exit_code: c.setup_exit_code,
                output: c.setup_output.clone(),
            }),
            None => Err(RuntimeError::NotFound(handle.to_string())),
        }
    }

    async fn exec_stream(
        &self,
        handle: &str,
        command: &[String],
        _workdir: &str,
        _stdin: Option<Vec<u8>>,
    ) -> Result<ExecHandle, RuntimeError> {
        let (frames, exit_code) = {
            let mut inner = self.inner.lock();
            inner.calls.push(RuntimeCall::ExecStream {
                handle: handle.to_string(),
                command: command.to_vec(),
            });
            if inner.fail_exec_stream {
                inner.fail_exec_stream = false;
                return Err(RuntimeError::ExecFailed("scripted failure".to_string()));
            }
            match inner.containers.get(handle) {
                Some(c) => (c.output.clone(), c.exit_code),
                None => return Err(RuntimeError::NotFound(handle.to_string())),
            }
        };

        let (tx, rx) = mpsc::channel(32);
        for frame in frames {
            let _ = tx.send(frame).await;
        }
        drop(tx);

        let exit_handle = format!("{handle}-exec");
        self.inner
            .lock()
            .containers
            .entry(handle.to_string())
            .and_modify(|c| c.exit_code = exit_code);

        Ok(ExecHandle {
            exec_id: exit_handle,
            output_rx: rx,
        })
    }

    async fn inspect_exec(&self, handle: &str, _exec_id: &str) -> Result<Option<i32>, RuntimeError> {
        Ok(self.inner.lock().containers.get(handle).map(|c| c.exit_code))
    }

    async fn stats(&self, handle: &str) -> Result<ContainerStats, RuntimeError> {
        self.inner
            .lock()
            .containers
            .get(handle)
            .map(|c| c.stats)
            .ok_or_else(|| RuntimeError::NotFound(handle.to_string()))
    }

    async fn logs(&self, handle: &str) -> Result<Vec<u8>, RuntimeError> {
        let inner = self.inner.lock();
        let c = inner
            .containers
            .get(handle)
            .ok_or_else(|| RuntimeError::NotFound(handle.to_string()))?;
        Ok(c.output.iter().flat_map(|f| f.bytes.clone()).collect())
    }

    async fn stop(&self, handle: &str, _grace: Duration) -> Result<(), RuntimeError> {
        self.inner.lock().calls.push(RuntimeCall::Stop {
            handle: handle.to_string(),
        });
        Ok(())
    }

    async fn remove(&self, handle: &str) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::Remove {
            handle: handle.to_string(),
        });
        if let Some(c) = inner.containers.get_mut(handle) {
            c.removed = true;
        }
        Ok(())
    }

    async fn list_labeled(&self, label: &str) -> Result<Vec<LabeledContainer>, RuntimeError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RuntimeCall::ListLabeled {
            label: label.to_string(),
        });
        let (key, value) = label.split_once('=').unwrap_or((label, ""));
        Ok(inner
            .containers
            .iter()
            .filter(|(_, c)| !c.removed && c.labels.get(key).map(|v| v.as_str()) == Some(value))
            .map(|(handle, c)| LabeledContainer {
                handle: handle.clone(),
                labels: c.labels.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ContainerSpec {
        ContainerSpec {
            image: "python:3.11-slim".into(),
            command: vec!["python".into(), "/app/code.py".into()],
            working_dir: "/app".into(),
            memory_bytes: 128 * 1024 * 1024,
            cpu_quota: 50_000,
            cpu_period: 100_000,
            uid: 1000,
            gid: 1000,
            tmpfs_size_bytes: 100 * 1024 * 1024,
            labels: HashMap::from([("service".to_string(), "code-execution".to_string())]),
            env: Vec::new(),
        }
    }

    #[tokio::test]
    async fn create_then_remove_clears_tracked_count() {
        let rt = FakeContainerRuntime::new();
        let handle = rt.create(&spec()).await.unwrap();
        assert_eq!(rt.tracked_count(), 1);
        rt.remove(&handle).await.unwrap();
        assert_eq!(rt.tracked_count(), 0);
    }

    #[tokio::test]
    async fn scripted_create_failure_is_one_shot() {
        let rt = FakeContainerRuntime::new();
        rt.fail_next_create();
        assert!(rt.create(&spec()).await.is_err());
        assert!(rt.create(&spec()).await.is_ok());
    }

    #[tokio::test]
    async fn exec_stream_replays_scripted_output_in_order() {
        let rt = FakeContainerRuntime::new();
        let handle = rt.create(&spec()).await.unwrap();
        rt.set_stdout(&handle, "hello\n");
        rt.set_exit_code(&handle, 0);

        let mut exec = rt
            .exec_stream(&handle, &spec().command, "/app", None)
            .await
            .unwrap();
        let mut collected = Vec::new();
        while let Some(frame) = exec.output_rx.recv().await {
            collected.extend(frame.bytes);
        }
        assert_eq!(String::from_utf8(collected).unwrap(), "hello\n");
        assert_eq!(rt.inspect_exec(&handle, &exec.exec_id).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn scripted_setup_failure_is_reported_without_erroring() {
        let rt = FakeContainerRuntime::new();
        rt.set_default_setup_failure(1, "missing tool");
        let handle = rt.create(&spec()).await.unwrap();

        let outcome = rt.run_setup(&handle, "npm install -g ts-node", "/app").await.unwrap();

        assert_eq!(outcome.exit_code, 1);
        assert_eq!(String::from_utf8(outcome.output).unwrap(), "missing tool");
    }

    #[tokio::test]
    async fn scripted_exec_stream_failure_is_one_shot() {
        let rt = FakeContainerRuntime::new();
        let handle = rt.create(&spec()).await.unwrap();
        rt.fail_next_exec_stream();

        assert!(rt.exec_stream(&handle, &spec().command, "/app", None).await.is_err());
        assert!(rt.exec_stream(&handle, &spec().command, "/app", None).await.is_ok());
    }

    #[tokio::test]
    async fn list_labeled_filters_by_key_value() {
        let rt = FakeContainerRuntime::new();
        rt.label_orphan(
            "orphan-1",
            HashMap::from([("service".to_string(), "code-execution".to_string())]),
        );
        rt.label_orphan(
            "other-1",
            HashMap::from([("service".to_string(), "unrelated".to_string())]),
        );
        let found = rt.list_labeled("service=code-execution").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].handle, "orphan-1");
    }
}
