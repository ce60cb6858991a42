// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op container runtime, for minimal deployments with execution disabled.

use super::{
    ContainerRuntime, ContainerSpec, ContainerStats, ExecHandle, ExecOutcome, LabeledContainer,
    RuntimeError,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// Runtime that refuses every sandbox operation. Used when code execution is
/// disabled entirely, analogous to `NoOpSessionAdapter` disabling agent spawning.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpContainerRuntime;

impl NoOpContainerRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContainerRuntime for NoOpContainerRuntime {
    async fn ensure_image(&self, _image: &str) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn create(&self, _spec: &ContainerSpec) -> Result<String, RuntimeError> {
        Err(RuntimeError::Unavailable(
            "container execution is disabled".to_string(),
        ))
    }

    async fn start(&self, _handle: &str) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn upload_archive(
        &self,
        _handle: &str,
        _dest_dir: &str,
        _tar_bytes: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn run_setup(
        &self,
        _handle: &str,
        _command: &str,
        _workdir: &str,
    ) -> Result<ExecOutcome, RuntimeError> {
        Ok(ExecOutcome {
            exit_code: 0,
            output: Vec::new(),
        })
    }

    async fn exec_stream(
        &self,
        _handle: &str,
        _command: &[String],
        _workdir: &str,
        _stdin: Option<Vec<u8>>,
    ) -> Result<ExecHandle, RuntimeError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(ExecHandle {
            exec_id: "noop".to_string(),
            output_rx: rx,
        })
    }

    async fn inspect_exec(
        &self,
        _handle: &str,
        _exec_id: &str,
    ) -> Result<Option<i32>, RuntimeError> {
        Ok(Some(0))
    }

    async fn stats(&self, _handle: &str) -> Result<ContainerStats, RuntimeError> {
        Ok(ContainerStats::default())
    }

    async fn logs(&self, _handle: &str) -> Result<Vec<u8>, RuntimeError> {
        Ok(Vec::new())
    }

    async fn stop(&self, _handle: &str, _grace: Duration) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn remove(&self, _handle: &str) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn list_labeled(&self, _label: &str) -> Result<Vec<LabeledContainer>, RuntimeError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_is_refused() {
        let rt = NoOpContainerRuntime::new();
        let spec = ContainerSpec {
            image: "python:3.11-slim".into(),
            command: vec!["python".into()],
            working_dir: "/app".into(),
            memory_bytes: 0,
            cpu_quota: 0,
            cpu_period: 0,
            uid: 1000,
            gid: 1000,
            tmpfs_size_bytes: 0,
            labels: Default::default(),
            env: Vec::new(),
        };
        assert!(rt.create(&spec).await.is_err());
    }

    #[tokio::test]
    async fn lifecycle_ops_are_harmless_no_ops() {
        let rt = NoOpContainerRuntime::new();
        assert!(rt.stop("x", Duration::from_secs(1)).await.is_ok());
        assert!(rt.remove("x").await.is_ok());
        assert_eq!(rt.list_labeled("service=code-execution").await.unwrap().len(), 0);
    }
}
