// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrapper for consistent observability

use crate::runtime::{
    ContainerRuntime, ContainerSpec, ContainerStats, ExecHandle, ExecOutcome, LabeledContainer,
    RuntimeError,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::Instrument;

/// Wrapper that adds tracing to any ContainerRuntime
#[derive(Clone)]
pub struct TracedRuntime<R> {
    inner: R,
}

impl<R> TracedRuntime<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: ContainerRuntime> ContainerRuntime for TracedRuntime<R> {
    async fn ensure_image(&self, image: &str) -> Result<(), RuntimeError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.ensure_image(image).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "image available"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "image pull failed"),
            }
            result
        }
        .instrument(tracing::info_span!("runtime.ensure_image", image))
        .await
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        async {
            tracing::info!(image = %spec.image, "creating sandbox");
            let start = std::time::Instant::now();
            let result = self.inner.create(spec).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(handle) => tracing::info!(handle, elapsed_ms, "sandbox created"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "create failed"),
            }
            result
        }
        .instrument(tracing::info_span!("runtime.create"))
        .await
    }

    async fn start(&self, handle: &str) -> Result<(), RuntimeError> {
        let result = self.inner.start(handle).await;
        if let Err(ref e) = result {
            tracing::error!(handle, error = %e, "start failed");
        }
        result
    }

    async fn upload_archive(
        &self,
        handle: &str,
        dest_dir: &str,
        tar_bytes: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        let len = tar_bytes.len();
        let result = self.inner.upload_archive(handle, dest_dir, tar_bytes).await;
        tracing::info_span!("runtime.upload_archive", handle, dest_dir, archive_bytes = len)
            .in_scope(|| match &result {
                Ok(()) => tracing::debug!("uploaded"),
                Err(e) => tracing::error!(error = %e, "upload failed"),
            });
        result
    }

    async fn run_setup(
        &self,
        handle: &str,
        command: &str,
        workdir: &str,
    ) -> Result<ExecOutcome, RuntimeError> {
        let span = tracing::info_span!("runtime.run_setup", handle, command);
        async {
            let start = std::time::Instant::now();
            let result = self.inner.run_setup(handle, command, workdir).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(outcome) if outcome.exit_code != 0 => tracing::warn!(
                    elapsed_ms,
                    exit_code = outcome.exit_code,
                    "setup command failed"
                ),
                Ok(_) => tracing::debug!(elapsed_ms, "setup command ok"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "setup command errored"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn exec_stream(
        &self,
        handle: &str,
        command: &[String],
        workdir: &str,
        stdin: Option<Vec<u8>>,
    ) -> Result<ExecHandle, RuntimeError> {
        tracing::info_span!(
            "runtime.exec_stream",
            handle,
            stdin_bytes = stdin.as_ref().map(|s| s.len())
        )
        .in_scope(|| tracing::info!(command = ?command, "starting run command"));
        let result = self.inner.exec_stream(handle, command, workdir, stdin).await;
        if let Err(ref e) = result {
            tracing::error!(handle, error = %e, "exec_stream failed");
        }
        result
    }

    async fn inspect_exec(&self, handle: &str, exec_id: &str) -> Result<Option<i32>, RuntimeError> {
        self.inner.inspect_exec(handle, exec_id).await
    }

    async fn stats(&self, handle: &str) -> Result<ContainerStats, RuntimeError> {
        self.inner.stats(handle).await
    }

    async fn logs(&self, handle: &str) -> Result<Vec<u8>, RuntimeError> {
        self.inner.logs(handle).await
    }

    async fn stop(&self, handle: &str, grace: Duration) -> Result<(), RuntimeError> {
        let result = self.inner.stop(handle, grace).await;
        tracing::info_span!("runtime.stop", handle).in_scope(|| match &result {
            Ok(()) => tracing::info!("stopped"),
            Err(e) => tracing::warn!(error = %e, "stop failed (may be expected)"),
        });
        result
    }

    async fn remove(&self, handle: &str) -> Result<(), RuntimeError> {
        let result = self.inner.remove(handle).await;
        tracing::info_span!("runtime.remove", handle).in_scope(|| match &result {
            Ok(()) => tracing::info!("removed"),
            Err(e) => tracing::warn!(error = %e, "remove failed (may be expected)"),
        });
        result
    }

    async fn list_labeled(&self, label: &str) -> Result<Vec<LabeledContainer>, RuntimeError> {
        let result = self.inner.list_labeled(label).await;
        tracing::trace!(label, found = ?result.as_ref().map(|v| v.len()).ok(), "listed");
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
