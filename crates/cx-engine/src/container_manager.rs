// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container Manager (SPEC_FULL.md §4.C): owns the sandbox tracker, builds
//! the hardening profile, and runs the reaper's two sweeps.
//!
//! Every sandbox's primary process is a harmless keep-alive (`sleep
//! infinity`); the language's actual run command only ever executes through
//! a single `exec_stream` call made by the Executor. This keeps "one exec
//! per execution" true even though the container itself must stay up long
//! enough to be execed into (SPEC_FULL.md §9).

use crate::env;
use crate::error::ContainerError;
use crate::scheduler::Scheduler;
use cx_adapters::{ContainerRuntime, ContainerSpec, LabeledContainer};
use cx_core::{Clock, LanguageSpec, Sandbox, SandboxId, SandboxState, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, warn, Instrument};

const KEEP_ALIVE_COMMAND: &[&str] = &["sleep", "infinity"];

struct Tracked {
    sandbox: Sandbox,
}

struct State {
    sandboxes: HashMap<SandboxId, Tracked>,
    scheduler: Scheduler,
}

/// Owns the live sandbox set and the reaper loop. Generic over the runtime
/// collaborator so engine tests can run against `FakeContainerRuntime`
/// instead of a real Docker daemon.
pub struct ContainerManager<R: ContainerRuntime, C: Clock> {
    runtime: R,
    clock: C,
    state: Mutex<State>,
}

impl<R: ContainerRuntime, C: Clock> ContainerManager<R, C> {
    pub fn new(runtime: R, clock: C) -> Self {
        Self {
            runtime,
            clock,
            state: Mutex::new(State {
                sandboxes: HashMap::new(),
                scheduler: Scheduler::new(),
            }),
        }
    }

    /// Create, start, and track one hardened sandbox for `spec`. Returns the
    /// new `SandboxId` paired with the runtime's opaque container handle.
    pub async fn create(
        &self,
        id: SandboxId,
        spec: &LanguageSpec,
        timeout: Duration,
        memory_bytes: u64,
        session_id: Option<SessionId>,
    ) -> Result<String, ContainerError> {
        let span = info_span!("container_create", sandbox_id = %id, language = %spec.id);
        async {
            let started = Instant::now();
            self.runtime.ensure_image(&spec.image).await?;

            let (uid, gid) = env::sandbox_uid_gid();
            let (cpu_quota, cpu_period) = env::cpu_quota_period();
            let mut labels = HashMap::new();
            labels.insert(env::SERVICE_LABEL.to_string(), env::SERVICE_LABEL_VALUE.to_string());
            labels.insert("execution_id".to_string(), id.to_string());
            if let Some(session_id) = &session_id {
                labels.insert("session_id".to_string(), session_id.to_string());
            }
            labels.insert("created_at".to_string(), self.clock.unix_time().to_string());

            let container_spec = ContainerSpec {
                image: spec.image.clone(),
                command: KEEP_ALIVE_COMMAND.iter().map(|s| s.to_string()).collect(),
                working_dir: "/app".to_string(),
                memory_bytes,
                cpu_quota,
                cpu_period,
                uid,
                gid,
                tmpfs_size_bytes: env::tmpfs_size_bytes(),
                labels,
                env: Vec::new(),
            };

            let handle = self.runtime.create(&container_spec).await?;
            self.runtime.start(&handle).await?;

            let now = self.clock.now();
            let sandbox = Sandbox::new(id.clone(), handle.clone(), spec.id.clone(), session_id, now, timeout);

            let mut state = self.state.lock();
            state.scheduler.set_deadline(
                id.to_string(),
                timeout + env::grace_period(),
                now,
            );
            state.sandboxes.insert(id.clone(), Tracked { sandbox });
            drop(state);

            info!(elapsed_ms = started.elapsed().as_millis() as u64, "sandbox created");
            Ok(handle)
        }
        .instrument(span)
        .await
    }

    pub fn mark_running(&self, id: &SandboxId) {
        if let Some(tracked) = self.state.lock().sandboxes.get_mut(id) {
            tracked.sandbox.state = SandboxState::Running;
        }
    }

    pub fn handle_of(&self, id: &SandboxId) -> Result<String, ContainerError> {
        self.state
            .lock()
            .sandboxes
            .get(id)
            .map(|t| t.sandbox.handle.clone())
            .ok_or_else(|| ContainerError::NotTracked(id.to_string()))
    }

    /// Upload the prepared-source archive into a tracked sandbox's `/app`.
    pub async fn upload_archive(&self, id: &SandboxId, tar_bytes: Vec<u8>) -> Result<(), ContainerError> {
        let handle = self.handle_of(id)?;
        self.runtime.upload_archive(&handle, "/app", tar_bytes).await?;
        Ok(())
    }

    /// Run one setup command to completion inside a tracked sandbox.
    pub async fn run_setup(
        &self,
        id: &SandboxId,
        command: &str,
    ) -> Result<cx_adapters::ExecOutcome, ContainerError> {
        let handle = self.handle_of(id)?;
        Ok(self.runtime.run_setup(&handle, command, "/app").await?)
    }

    /// Start the language run command with stdin attached, streaming demuxed
    /// output back through the returned handle.
    pub async fn exec_stream(
        &self,
        id: &SandboxId,
        command: &[String],
        stdin: Option<Vec<u8>>,
    ) -> Result<cx_adapters::ExecHandle, ContainerError> {
        let handle = self.handle_of(id)?;
        Ok(self.runtime.exec_stream(&handle, command, "/app", stdin).await?)
    }

    pub async fn inspect_exec(&self, id: &SandboxId, exec_id: &str) -> Result<Option<i32>, ContainerError> {
        let handle = self.handle_of(id)?;
        Ok(self.runtime.inspect_exec(&handle, exec_id).await?)
    }

    /// Stop, remove, and stop tracking one sandbox. Individual runtime step
    /// failures are logged, never propagated: cleanup must not leave the
    /// tracker out of sync with a best-effort attempt (SPEC_FULL.md §4.C).
    pub async fn cleanup(&self, id: &SandboxId) {
        let handle = {
            let mut state = self.state.lock();
            state.scheduler.cancel(id.as_str());
            state.sandboxes.remove(id).map(|t| t.sandbox.handle)
        };
        let Some(handle) = handle else { return };
        self.stop_and_remove(&handle).await;
    }

    async fn stop_and_remove(&self, handle: &str) {
        if let Err(e) = self.runtime.stop(handle, env::stop_grace()).await {
            error!(handle, error = %e, "failed to stop sandbox during cleanup");
        }
        if let Err(e) = self.runtime.remove(handle).await {
            error!(handle, error = %e, "failed to remove sandbox during cleanup");
        }
    }

    /// Clean up every sandbox belonging to `session_id` (SPEC_FULL.md §4.C,
    /// caller disconnect).
    pub async fn cleanup_session(&self, session_id: &SessionId) {
        let ids: Vec<SandboxId> = {
            let state = self.state.lock();
            state
                .sandboxes
                .values()
                .filter(|t| t.sandbox.session_id.as_ref() == Some(session_id))
                .map(|t| t.sandbox.id.clone())
                .collect()
        };
        for id in ids {
            self.cleanup(&id).await;
        }
    }

    /// Clean up every tracked sandbox, e.g. on service shutdown.
    pub async fn cleanup_all(&self) {
        let ids: Vec<SandboxId> = self.state.lock().sandboxes.keys().cloned().collect();
        for id in ids {
            self.cleanup(&id).await;
        }
    }

    pub async fn logs(&self, id: &SandboxId) -> Result<Vec<u8>, ContainerError> {
        let handle = self.handle_of(id)?;
        Ok(self.runtime.logs(&handle).await?)
    }

    pub fn active_count(&self) -> u64 {
        self.state.lock().sandboxes.len() as u64
    }

    /// Peak memory observed for one still-tracked sandbox, queried right
    /// before the Executor tears it down (SPEC_FULL.md §4.D step 8). Returns
    /// 0 if the sandbox is already gone or the runtime can't report stats.
    pub async fn peak_memory(&self, id: &SandboxId) -> u64 {
        let Ok(handle) = self.handle_of(id) else { return 0 };
        self.runtime.stats(&handle).await.map(|s| s.memory_usage_bytes).unwrap_or(0)
    }

    /// Sum live memory/CPU usage across every tracked sandbox, used by the
    /// Stats Collector's gauges. A handle that fails to report (e.g. it just
    /// exited) is skipped rather than failing the whole aggregate.
    pub async fn aggregate_resource_usage(&self) -> (u64, u64) {
        let handles: Vec<String> = self
            .state
            .lock()
            .sandboxes
            .values()
            .map(|t| t.sandbox.handle.clone())
            .collect();

        let mut memory_bytes = 0u64;
        let mut cpu_nanos = 0u64;
        for handle in handles {
            if let Ok(stats) = self.runtime.stats(&handle).await {
                memory_bytes += stats.memory_usage_bytes;
                cpu_nanos += stats.cpu_usage_nanos;
            }
        }
        (memory_bytes, cpu_nanos)
    }

    /// One internal-sweep tick: force-clean every sandbox whose
    /// `timeout + grace` deadline has passed, per the scheduler.
    pub async fn reap_internal(&self) {
        let now = self.clock.now();
        let expired: Vec<SandboxId> = {
            let mut state = self.state.lock();
            state
                .scheduler
                .expired(now)
                .into_iter()
                .map(SandboxId::new)
                .collect()
        };
        for id in expired {
            warn!(sandbox_id = %id, "reaper force-cleaning expired sandbox");
            self.cleanup(&id).await;
        }
    }

    /// One external-sweep tick: remove any container carrying our service
    /// label that the tracker doesn't know about and that's old enough to be
    /// considered orphaned rather than mid-creation (SPEC_FULL.md §4.C).
    pub async fn reap_external(&self) {
        let label = format!("{}={}", env::SERVICE_LABEL, env::SERVICE_LABEL_VALUE);
        let labeled: Vec<LabeledContainer> = match self.runtime.list_labeled(&label).await {
            Ok(containers) => containers,
            Err(e) => {
                error!(error = %e, "external sweep: failed to list labeled containers");
                return;
            }
        };

        let tracked_handles: std::collections::HashSet<String> = self
            .state
            .lock()
            .sandboxes
            .values()
            .map(|t| t.sandbox.handle.clone())
            .collect();

        let now_unix = self.clock.unix_time();
        for container in labeled {
            if tracked_handles.contains(&container.handle) {
                continue;
            }
            let created_at: f64 = container
                .labels
                .get("created_at")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0);
            let age = Duration::from_secs_f64((now_unix - created_at).max(0.0));
            if age < env::orphan_age() {
                continue;
            }
            warn!(handle = %container.handle, "external sweep: removing orphaned container");
            self.stop_and_remove(&container.handle).await;
        }
    }

    /// Spawn the reaper's background loop. Returns a handle the caller can
    /// abort on shutdown.
    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()>
    where
        R: 'static,
        C: 'static,
    {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                this.reap_internal().await;
                this.reap_external().await;
            }
        })
    }
}
