// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runtime::FakeContainerRuntime;
use serial_test::{parallel, serial};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

/// Assert that captured logs contain the expected substring
fn assert_log(logs: &str, label: &str, expected: &str) {
    assert!(logs.contains(expected), "Should log {label}. Logs:\n{logs}",);
}

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

/// Create a sandbox through a traced fake runtime, returning the fake, the
/// traced wrapper, and the created handle.
async fn create_traced_sandbox() -> (
    FakeContainerRuntime,
    TracedRuntime<FakeContainerRuntime>,
    String,
) {
    let fake = FakeContainerRuntime::new();
    let traced = TracedRuntime::new(fake.clone());
    let handle = traced.create(&spec()).await.unwrap();
    (fake, traced, handle)
}

// =============================================================================
// Tracing output verification tests
// =============================================================================

#[test]
#[serial(tracing)]
fn traced_runtime_create_logs_entry_and_completion() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeContainerRuntime::new();
        let traced = TracedRuntime::new(fake);
        traced.create(&spec()).await
    });

    assert!(result.is_ok(), "create should succeed: {:?}", result);
    assert_log(&logs, "span name", "runtime.create");
    assert_log(&logs, "entry message", "creating sandbox");
    assert_log(&logs, "completion", "sandbox created");
    assert_log(&logs, "timing", "elapsed_ms");
}

#[test]
#[serial(tracing)]
fn traced_runtime_create_logs_error_on_failure() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeContainerRuntime::new();
        fake.fail_next_create();
        let traced = TracedRuntime::new(fake);
        traced.create(&spec()).await
    });

    assert!(result.is_err());
    assert_log(&logs, "create failure", "create failed");
}

#[test]
#[serial(tracing)]
fn traced_runtime_stop_logs_operation() {
    let (logs, _) = with_tracing(|| async {
        let (_, traced, handle) = create_traced_sandbox().await;
        traced.stop(&handle, Duration::from_secs(1)).await
    });

    assert_log(&logs, "stop span", "runtime.stop");
    assert_log(&logs, "stop completion", "stopped");
}

#[test]
#[serial(tracing)]
fn traced_runtime_remove_logs_operation() {
    let (logs, _) = with_tracing(|| async {
        let (_, traced, handle) = create_traced_sandbox().await;
        traced.remove(&handle).await
    });

    assert_log(&logs, "remove span", "runtime.remove");
    assert_log(&logs, "remove completion", "removed");
}

#[test]
#[serial(tracing)]
fn traced_runtime_exec_stream_logs_command() {
    let (logs, result) = with_tracing(|| async {
        let (_, traced, handle) = create_traced_sandbox().await;
        traced
            .exec_stream(&handle, &spec().command, "/app", None)
            .await
    });

    assert!(result.is_ok());
    assert_log(&logs, "exec span", "runtime.exec_stream");
    assert_log(&logs, "run command entry", "starting run command");
}

// =============================================================================
// Delegation tests - verify traced wrapper delegates to inner runtime
// =============================================================================

#[tokio::test]
#[parallel(tracing)]
async fn traced_runtime_delegates_create_to_inner() {
    let fake = FakeContainerRuntime::new();
    let traced = TracedRuntime::new(fake.clone());

    let handle = traced.create(&spec()).await.unwrap();

    assert_eq!(fake.tracked_count(), 1);
    let calls = fake.calls();
    assert!(matches!(&calls[0], crate::runtime::RuntimeCall::Create { image } if image == "python:3.11-slim"));
    assert!(handle.starts_with("fake-container-"));
}

#[tokio::test]
#[parallel(tracing)]
async fn traced_runtime_delegates_remove_to_inner() {
    let (fake, traced, handle) = create_traced_sandbox().await;

    traced.remove(&handle).await.unwrap();

    assert_eq!(fake.tracked_count(), 0);
}

#[tokio::test]
#[parallel(tracing)]
async fn traced_runtime_exec_stream_delegates_scripted_output() {
    let (fake, traced, handle) = create_traced_sandbox().await;
    fake.set_stdout(&handle, "hello\n");
    fake.set_exit_code(&handle, 0);

    let mut exec = traced
        .exec_stream(&handle, &spec().command, "/app", None)
        .await
        .unwrap();
    let mut collected = Vec::new();
    while let Some(frame) = exec.output_rx.recv().await {
        collected.extend(frame.bytes);
    }
    assert_eq!(String::from_utf8(collected).unwrap(), "hello\n");
}

#[tokio::test]
#[parallel(tracing)]
async fn traced_runtime_list_labeled_delegates_to_inner() {
    let fake = FakeContainerRuntime::new();
    fake.label_orphan(
        "orphan-1",
        HashMap::from([("service".to_string(), "code-execution".to_string())]),
    );
    let traced = TracedRuntime::new(fake);

    let found = traced.list_labeled("service=code-execution").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].handle, "orphan-1");
}

#[tokio::test]
#[parallel(tracing)]
async fn traced_runtime_stats_delegates_to_inner() {
    let (_, traced, handle) = create_traced_sandbox().await;
    let stats = traced.stats(&handle).await.unwrap();
    assert_eq!(stats.memory_usage_bytes, 0);
}
