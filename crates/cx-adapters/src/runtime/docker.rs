// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker-backed `ContainerRuntime`, built on `bollard`.

use super::{
    ContainerRuntime, ContainerSpec, ContainerStats, ExecHandle, ExecOutcome, LabeledContainer,
    OutputFrame, RuntimeError,
};
use async_trait::async_trait;
use bollard::container::{
    CreateContainerOptions, ListContainersOptions, LogsOptions, RemoveContainerOptions,
    StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, Mount, MountTypeEnum, MountTmpfsOptions, ResourcesUlimits};
use bollard::Docker;
use cx_core::OutputChannel;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Per-image pull barrier: concurrent first-uses of the same image collapse
/// into a single `create_image` call (SPEC_FULL.md §5, §9).
#[derive(Default)]
struct PullCoordinator {
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    completed: Mutex<HashSet<String>>,
}

impl PullCoordinator {
    fn barrier_for(&self, image: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.in_flight
            .lock()
            .entry(image.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn is_done(&self, image: &str) -> bool {
        self.completed.lock().contains(image)
    }

    fn mark_done(&self, image: &str) {
        self.completed.lock().insert(image.to_string());
    }
}

/// `ContainerRuntime` implementation backed by the real Docker Engine API.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
    pulls: Arc<PullCoordinator>,
}

impl DockerRuntime {
    /// Connect using the local Docker defaults (`DOCKER_HOST` env var, or the
    /// platform default socket).
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;
        Ok(Self {
            docker,
            pulls: Arc::new(PullCoordinator::default()),
        })
    }

    pub async fn ping(&self) -> Result<(), RuntimeError> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))
    }
}

fn is_not_found(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ensure_image(&self, image: &str) -> Result<(), RuntimeError> {
        if self.pulls.is_done(image) {
            return Ok(());
        }
        let barrier = self.pulls.barrier_for(image);
        let _guard = barrier.lock().await;
        if self.pulls.is_done(image) {
            return Ok(());
        }

        if self.docker.inspect_image(image).await.is_ok() {
            self.pulls.mark_done(image);
            return Ok(());
        }

        let options = Some(CreateImageOptions {
            from_image: image,
            ..Default::default()
        });
        let mut stream = self.docker.create_image(options, None, None);
        while let Some(progress) = stream.next().await {
            progress.map_err(|e| RuntimeError::ImagePull {
                image: image.to_string(),
                source: e.to_string(),
            })?;
        }
        self.pulls.mark_done(image);
        Ok(())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let host_config = HostConfig {
            memory: Some(spec.memory_bytes as i64),
            memory_swap: Some(spec.memory_bytes as i64),
            cpu_quota: Some(spec.cpu_quota),
            cpu_period: Some(spec.cpu_period),
            network_mode: Some("none".to_string()),
            readonly_rootfs: Some(false),
            cap_drop: Some(vec!["ALL".to_string()]),
            cap_add: Some(vec![
                "CHOWN".to_string(),
                "SETUID".to_string(),
                "SETGID".to_string(),
            ]),
            security_opt: Some(vec!["no-new-privileges:true".to_string()]),
            mounts: Some(vec![Mount {
                target: Some(spec.working_dir.clone()),
                typ: Some(MountTypeEnum::TMPFS),
                tmpfs_options: Some(MountTmpfsOptions {
                    size_bytes: Some(spec.tmpfs_size_bytes as i64),
                    mode: Some(0o1777),
                }),
                ..Default::default()
            }]),
            ulimits: Some(vec![ResourcesUlimits {
                name: Some("nofile".to_string()),
                soft: Some(256),
                hard: Some(512),
            }]),
            ..Default::default()
        };

        let config = bollard::container::Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command.clone()),
            working_dir: Some(spec.working_dir.clone()),
            user: Some(format!("{}:{}", spec.uid, spec.gid)),
            env: Some(
                spec.env
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .chain(["HOME=/app".to_string(), "USER=coderunner".to_string()])
                    .collect(),
            ),
            labels: Some(spec.labels.clone()),
            network_disabled: Some(true),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions::<String> {
            name: String::new(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| RuntimeError::CreateFailed(e.to_string()))?;
        Ok(response.id)
    }

    async fn start(&self, handle: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container::<String>(handle, None)
            .await
            .map_err(|e| RuntimeError::CreateFailed(e.to_string()))
    }

    async fn upload_archive(
        &self,
        handle: &str,
        dest_dir: &str,
        tar_bytes: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        let options = bollard::container::UploadToContainerOptions {
            path: dest_dir,
            no_overwrite_dir_non_directory: "",
        };
        self.docker
            .upload_to_container(handle, Some(options), tar_bytes.into())
            .await
            .map_err(|e| RuntimeError::ExecFailed(format!("upload failed: {e}")))
    }

    async fn run_setup(
        &self,
        handle: &str,
        command: &str,
        workdir: &str,
    ) -> Result<ExecOutcome, RuntimeError> {
        let exec = self
            .docker
            .create_exec(
                handle,
                CreateExecOptions {
                    cmd: Some(vec!["sh".to_string(), "-c".to_string(), command.to_string()]),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    working_dir: Some(workdir.to_string()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;

        let mut output = Vec::new();
        if let StartExecResults::Attached { mut output: stream, .. } = self
            .docker
            .start_exec(&exec.id, Some(StartExecOptions { detach: false, ..Default::default() }))
            .await
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?
        {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;
                output.extend_from_slice(&chunk.into_bytes());
            }
        }

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;

        Ok(ExecOutcome {
            exit_code: inspect.exit_code.unwrap_or(-1) as i32,
            output,
        })
    }

    async fn exec_stream(
        &self,
        handle: &str,
        command: &[String],
        workdir: &str,
        stdin: Option<Vec<u8>>,
    ) -> Result<ExecHandle, RuntimeError> {
        let exec = self
            .docker
            .create_exec(
                handle,
                CreateExecOptions {
                    cmd: Some(command.to_vec()),
                    attach_stdin: Some(stdin.is_some()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    working_dir: Some(workdir.to_string()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;

        let attached = self
            .docker
            .start_exec(
                &exec.id,
                Some(StartExecOptions { detach: false, ..Default::default() }),
            )
            .await
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;

        let (tx, rx) = mpsc::channel(64);

        if let StartExecResults::Attached { mut output, mut input } = attached {
            if let Some(bytes) = stdin {
                use tokio::io::AsyncWriteExt;
                input
                    .write_all(&bytes)
                    .await
                    .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;
            }
            // Dropping `input` closes stdin (half-close), matching the single-exec
            // contract in SPEC_FULL.md §4.D/§9: one exec, stdin written then closed.
            drop(input);

            tokio::spawn(async move {
                while let Some(chunk) = output.next().await {
                    let Ok(chunk) = chunk else { break };
                    let channel = match &chunk {
                        bollard::container::LogOutput::StdOut { .. } => OutputChannel::Stdout,
                        bollard::container::LogOutput::StdErr { .. } => OutputChannel::Stderr,
                        bollard::container::LogOutput::Console { .. } => OutputChannel::Stdout,
                        bollard::container::LogOutput::StdIn { .. } => continue,
                    };
                    let frame = OutputFrame {
                        channel,
                        bytes: chunk.into_bytes().to_vec(),
                    };
                    if tx.send(frame).await.is_err() {
                        break;
                    }
                }
            });
        }

        Ok(ExecHandle {
            exec_id: exec.id,
            output_rx: rx,
        })
    }

    async fn inspect_exec(&self, _handle: &str, exec_id: &str) -> Result<Option<i32>, RuntimeError> {
        let inspect = self
            .docker
            .inspect_exec(exec_id)
            .await
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;
        Ok(inspect.exit_code.map(|c| c as i32))
    }

    async fn stats(&self, handle: &str) -> Result<ContainerStats, RuntimeError> {
        use bollard::container::StatsOptions;
        let mut stream = self.docker.stats(
            handle,
            Some(StatsOptions {
                stream: false,
                one_shot: true,
            }),
        );
        let stats = stream
            .next()
            .await
            .ok_or_else(|| RuntimeError::NotFound(handle.to_string()))?
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;

        Ok(ContainerStats {
            memory_usage_bytes: stats.memory_stats.usage.unwrap_or(0),
            cpu_usage_nanos: stats.cpu_stats.cpu_usage.total_usage,
        })
    }

    async fn logs(&self, handle: &str) -> Result<Vec<u8>, RuntimeError> {
        let mut stream = self.docker.logs(
            handle,
            Some(LogsOptions::<String> {
                stdout: true,
                stderr: true,
                timestamps: true,
                ..Default::default()
            }),
        );
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;
            bytes.extend_from_slice(&chunk.into_bytes());
        }
        Ok(bytes)
    }

    async fn stop(&self, handle: &str, grace: Duration) -> Result<(), RuntimeError> {
        let result = self
            .docker
            .stop_container(
                handle,
                Some(StopContainerOptions {
                    t: grace.as_secs() as i64,
                }),
            )
            .await;
        match result {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(RuntimeError::ExecFailed(e.to_string())),
        }
    }

    async fn remove(&self, handle: &str) -> Result<(), RuntimeError> {
        let result = self
            .docker
            .remove_container(
                handle,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await;
        match result {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(RuntimeError::ExecFailed(e.to_string())),
        }
    }

    async fn list_labeled(&self, label: &str) -> Result<Vec<LabeledContainer>, RuntimeError> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), vec![label.to_string()]);
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions {
                all: true,
                filters,
                ..Default::default()
            }))
            .await
            .map_err(|e| RuntimeError::ExecFailed(e.to_string()))?;

        Ok(containers
            .into_iter()
            .filter_map(|c| {
                let handle = c.id?;
                let labels = c.labels.unwrap_or_default();
                Some(LabeledContainer { handle, labels })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_matches_404_status() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "no such container".to_string(),
        };
        assert!(is_not_found(&err));
    }

    #[test]
    fn not_found_rejects_other_statuses() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 500,
            message: "internal error".to_string(),
        };
        assert!(!is_not_found(&err));
    }
}
