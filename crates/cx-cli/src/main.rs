// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cx - Code eXecution CLI
//!
//! Slim in-process front end over `cx-engine`: every subcommand builds the
//! registry/container-manager/executor/validator stack in-process and calls
//! straight into it. There is no daemon — one process per invocation, same
//! as `cx-engine`'s own test harness.

mod color;
mod output;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cx_adapters::{ContainerRuntime, DockerRuntime, TracedRuntime};
use cx_core::{Clock, ExecutionRequest, IdGen, SandboxId, SessionId, SystemClock, UuidIdGen};
use cx_engine::{ContainerManager, Executor, LanguageRegistry, StatsCollector, Validator};
use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "cx",
    version,
    about = "Multi-tenant code execution service (in-process demo CLI)"
)]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    /// Use an in-memory fake container runtime instead of connecting to
    /// Docker. No sandboxes are actually created; intended for black-box
    /// testing of this CLI without a Docker daemon available.
    #[arg(long, global = true, hide = true)]
    fake: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the supported language catalog
    Languages,
    /// Run source to completion and print the collected result
    Execute(ExecuteArgs),
    /// Run source, printing each streaming event as it arrives
    ExecuteStream(ExecuteArgs),
    /// Syntax-only check, no full execution
    Validate(ValidateArgs),
    /// Print aggregate execution stats
    Stats,
    /// Print captured logs for a still-tracked execution
    Logs {
        /// Execution id returned by a prior `execute`/`execute-stream` call
        execution_id: String,
    },
    /// Tear down every sandbox tagged with a session id (WebSocket disconnect)
    CleanupSession {
        /// Session id passed via `--session` on a prior `execute-stream` call
        session_id: String,
    },
}

#[derive(clap::Args)]
struct ExecuteArgs {
    /// Language id from `cx languages` (e.g. python, javascript, rust)
    #[arg(short = 'l', long)]
    language: String,

    /// Read source from this file instead of --code or stdin
    #[arg(short = 'f', long, conflicts_with = "code")]
    file: Option<PathBuf>,

    /// Source passed inline instead of --file or stdin
    #[arg(short = 'c', long, conflicts_with = "file")]
    code: Option<String>,

    /// File whose bytes are fed to the process on stdin
    #[arg(long)]
    stdin: Option<PathBuf>,

    /// Wall-clock timeout override in seconds, clamped to the service ceiling
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Memory limit override in MiB, clamped to the service ceiling
    #[arg(long)]
    memory_mib: Option<u64>,

    /// Session id to tag this execution's sandbox with, for later
    /// `cleanup-session`
    #[arg(long)]
    session: Option<String>,
}

#[derive(clap::Args)]
struct ValidateArgs {
    #[arg(short = 'l', long)]
    language: String,

    #[arg(short = 'f', long, conflicts_with = "code")]
    file: Option<PathBuf>,

    #[arg(short = 'c', long, conflicts_with = "file")]
    code: Option<String>,
}

impl ExecuteArgs {
    fn read_source(&self) -> Result<String> {
        read_source(self.file.as_deref(), self.code.as_deref())
    }

    fn build_request(&self) -> Result<ExecutionRequest> {
        let source = self.read_source()?;
        let mut request = ExecutionRequest::new(source, self.language.clone());
        if let Some(path) = &self.stdin {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading stdin file '{}'", path.display()))?;
            request = request.with_stdin(bytes);
        }
        if let Some(secs) = self.timeout_secs {
            request = request.with_timeout(Duration::from_secs(secs));
        }
        if let Some(mib) = self.memory_mib {
            request = request.with_memory(mib * 1024 * 1024);
        }
        if let Some(session) = &self.session {
            request = request.with_session(SessionId::new(session.clone()));
        }
        Ok(request)
    }
}

impl ValidateArgs {
    fn read_source(&self) -> Result<String> {
        read_source(self.file.as_deref(), self.code.as_deref())
    }
}

/// Resolve one line of source: `--file`, else `--code`, else stdin (so
/// `echo 'print(1)' | cx execute -l python` works without either flag).
fn read_source(file: Option<&std::path::Path>, code: Option<&str>) -> Result<String> {
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("reading source file '{}'", path.display()));
    }
    if let Some(code) = code {
        return Ok(code.to_string());
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("reading source from stdin")?;
    Ok(buf)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.fake {
        run_with_runtime(fake_runtime(), cli.command, cli.output).await
    } else {
        let docker = DockerRuntime::connect().context(
            "failed to connect to the container runtime (is Docker running?); \
             pass --fake to exercise this CLI without one",
        )?;
        run_with_runtime(TracedRuntime::new(docker), cli.command, cli.output).await
    }
}

#[cfg(feature = "test-support")]
fn fake_runtime() -> cx_adapters::FakeContainerRuntime {
    let runtime = cx_adapters::FakeContainerRuntime::new();
    // Scripted via env vars so black-box CLI tests stay deterministic
    // without a real container runtime.
    if let Ok(stdout) = std::env::var("CX_FAKE_STDOUT") {
        runtime.set_default_stdout(&stdout);
    }
    if let Ok(code) = std::env::var("CX_FAKE_EXIT_CODE") {
        if let Ok(code) = code.parse::<i32>() {
            runtime.set_default_exit_code(code);
        }
    }
    runtime
}

#[cfg(not(feature = "test-support"))]
fn fake_runtime() -> cx_adapters::NoOpContainerRuntime {
    cx_adapters::NoOpContainerRuntime::new()
}

/// App wiring shared by every subcommand: one registry, one container
/// manager (which owns the reaper), one stats collector, one executor, one
/// validator, all built from the single runtime + clock + id generator
/// chosen by `main`.
async fn run_with_runtime<R: ContainerRuntime + Clone>(
    runtime: R,
    command: Commands,
    format: OutputFormat,
) -> Result<()> {
    let clock = SystemClock;
    let registry = LanguageRegistry::with_defaults();
    let container_manager = Arc::new(ContainerManager::new(runtime, clock));
    container_manager.spawn_reaper(cx_adapters::reaper_interval());
    let stats = Arc::new(StatsCollector::new(Arc::clone(&container_manager)));
    let executor = Arc::new(Executor::new(
        registry.clone(),
        Arc::clone(&container_manager),
        Arc::clone(&stats),
        clock,
        UuidIdGen,
    ));
    let validator = Validator::new(registry.clone(), Arc::clone(&container_manager), UuidIdGen);

    match command {
        Commands::Languages => print_languages(&registry, format),
        Commands::Execute(args) => execute(executor.as_ref(), args, format).await,
        Commands::ExecuteStream(args) => execute_stream(&executor, args, format).await,
        Commands::Validate(args) => validate(&validator, args, format).await,
        Commands::Stats => print_stats(stats.as_ref(), format).await,
        Commands::Logs { execution_id } => print_logs(executor.as_ref(), &execution_id).await,
        Commands::CleanupSession { session_id } => {
            executor.cleanup_session(&SessionId::new(session_id.as_str())).await;
            println!("cleaned up session {session_id}");
            Ok(())
        }
    }
}

#[derive(serde::Serialize)]
struct LanguageInfo<'a> {
    id: &'a str,
    name: &'a str,
    extension: &'a str,
    image: &'a str,
    default_timeout_secs: u64,
    default_memory_mib: u64,
}

fn print_languages(registry: &LanguageRegistry, format: OutputFormat) -> Result<()> {
    let mut languages: Vec<_> = registry.iter().collect();
    languages.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));

    match format {
        OutputFormat::Json => {
            let infos: Vec<LanguageInfo> = languages
                .iter()
                .map(|s| LanguageInfo {
                    id: s.id.as_str(),
                    name: &s.name,
                    extension: s.file_name.rsplit('.').next().unwrap_or(""),
                    image: &s.image,
                    default_timeout_secs: s.default_timeout.as_secs(),
                    default_memory_mib: s.default_memory_bytes / (1024 * 1024),
                })
                .collect();
            output::print_json(&infos)
        }
        OutputFormat::Text => {
            println!("{}", color::header("Supported languages:"));
            for spec in languages {
                println!(
                    "  {:<12} {}  ({}, {}s, {}MiB)",
                    spec.id.as_str(),
                    spec.name,
                    spec.image,
                    spec.default_timeout.as_secs(),
                    spec.default_memory_bytes / (1024 * 1024),
                );
            }
            Ok(())
        }
    }
}

async fn execute<R: ContainerRuntime, C: Clock, G: IdGen>(
    executor: &Executor<R, C, G>,
    args: ExecuteArgs,
    format: OutputFormat,
) -> Result<()> {
    let request = args.build_request()?;
    let result = executor.execute(request).await?;
    print_result(&result, format)
}

fn print_result(result: &cx_core::ExecutionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => output::print_json(result),
        OutputFormat::Text => {
            let status_line = format!(
                "{} ({:.2}s, exit {})",
                result.status,
                result.duration.as_secs_f64(),
                result.exit_code
            );
            println!("{}", color::status(&status_line));
            if !result.stdout.is_empty() {
                print!("{}", result.stdout);
            }
            if !result.stderr.is_empty() {
                eprint!("{}", result.stderr);
            }
            Ok(())
        }
    }
}

async fn execute_stream<R: ContainerRuntime, C: Clock, G: IdGen>(
    executor: &Arc<Executor<R, C, G>>,
    args: ExecuteArgs,
    format: OutputFormat,
) -> Result<()> {
    use futures::StreamExt;

    let request = args.build_request()?;
    let mut stream = executor.execute_stream(request).await?;

    let mut exit_code = 0;
    while let Some(event) = stream.next().await {
        match format {
            OutputFormat::Json => output::print_json(&event)?,
            OutputFormat::Text => print_event_text(&event),
        }
        if let cx_core::ExecutionEvent::Error { .. } | cx_core::ExecutionEvent::Timeout { .. } = &event {
            exit_code = 1;
        }
    }

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn print_event_text(event: &cx_core::ExecutionEvent) {
    use cx_core::ExecutionEvent::*;
    match event {
        Start { execution_id, .. } => println!("{}", color::muted(&format!("[{execution_id}] start"))),
        Status { message, .. } => println!("{}", color::muted(message)),
        Setup { command, .. } => println!("{}", color::muted(&format!("+ {command}"))),
        Output { data, channel, .. } => match channel {
            cx_core::OutputChannel::Stdout => print!("{data}"),
            cx_core::OutputChannel::Stderr => eprint!("{data}"),
        },
        Exit { exit_code, .. } => println!("{}", color::muted(&format!("exit {exit_code}"))),
        Timeout { execution_time, .. } => {
            println!("{}", color::status(&format!("TIMEOUT ({execution_time:.1}s)")))
        }
        Error { message, execution_time, .. } => {
            println!("{}", color::status(&format!("ERROR ({execution_time:.1}s): {message}")))
        }
        Complete { execution_time, .. } => {
            println!("{}", color::status(&format!("COMPLETED ({execution_time:.1}s)")))
        }
    }
}

async fn validate<R: ContainerRuntime, C: Clock, G: IdGen>(
    validator: &Validator<R, C, G>,
    args: ValidateArgs,
    format: OutputFormat,
) -> Result<()> {
    let source = args.read_source()?;
    let result = validator.validate(&source, &args.language).await?;

    #[derive(serde::Serialize)]
    struct ValidateOutput {
        valid: bool,
        error: Option<String>,
    }
    let out = ValidateOutput { valid: result.valid, error: result.error.clone() };

    match format {
        OutputFormat::Json => output::print_json(&out)?,
        OutputFormat::Text => {
            if result.valid {
                println!("{}", color::green("valid"));
            } else {
                println!("{}", color::yellow("invalid"));
                if let Some(error) = &result.error {
                    eprintln!("{error}");
                }
            }
        }
    }

    if !result.valid {
        std::process::exit(1);
    }
    Ok(())
}

async fn print_stats<R: ContainerRuntime, C: Clock>(
    stats: &StatsCollector<R, C>,
    format: OutputFormat,
) -> Result<()> {
    let snapshot = stats.get_stats().await;
    match format {
        OutputFormat::Json => output::print_json(&snapshot),
        OutputFormat::Text => {
            println!("{}", color::header("Execution stats:"));
            println!("  active_containers:       {}", snapshot.active_containers);
            println!("  total_executions:        {}", snapshot.total_executions);
            println!(
                "  average_execution_time:  {:.2}s",
                snapshot.average_execution_time().as_secs_f64()
            );
            println!("  memory_usage_bytes:      {}", snapshot.memory_usage_bytes);
            println!("  cpu_usage_nanos:         {}", snapshot.cpu_usage_nanos);
            Ok(())
        }
    }
}

async fn print_logs<R: ContainerRuntime, C: Clock, G: IdGen>(
    executor: &Executor<R, C, G>,
    execution_id: &str,
) -> Result<()> {
    let bytes = executor.logs(&SandboxId::new(execution_id)).await?;
    std::io::Write::write_all(&mut std::io::stdout(), &bytes)?;
    Ok(())
}
