// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static catalog entry describing how to run one language.

use serde::{Deserialize, Serialize};
use std::time::Duration;

crate::define_id! {
    /// Identifier for a supported language, e.g. `"python"`, `"rust"`.
    pub struct LanguageId;
}

/// Auxiliary file emitted alongside the prepared source in the injection archive
/// (e.g. a C# project manifest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxFile {
    pub name: String,
    pub contents: String,
}

/// Immutable, per-language execution recipe. One of these is constructed per
/// supported language at startup and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageSpec {
    pub id: LanguageId,
    /// Human-readable display name (e.g. `"Python"`).
    pub name: String,
    /// Container image reference to run the code in.
    pub image: String,
    /// Source file name, including extension, written at `/app/<file_name>`.
    pub file_name: String,
    /// Shell commands run once, in order, after injection and before `run_command`.
    pub setup_commands: Vec<String>,
    /// argv used to compile-and-run or interpret the source.
    pub run_command: Vec<String>,
    pub default_timeout: Duration,
    pub default_memory_bytes: u64,
    /// Required entrypoint symbol the Code Preparer must scaffold if absent
    /// (e.g. `Some("Main")` for Java).
    pub entrypoint: Option<String>,
    /// Auxiliary files that must be emitted in the same archive as the source
    /// (e.g. `app.csproj` for the C# scaffold).
    pub aux_files: Vec<AuxFile>,
}

impl LanguageSpec {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        image: impl Into<String>,
        file_name: impl Into<String>,
        run_command: Vec<&str>,
        default_timeout: Duration,
        default_memory_bytes: u64,
    ) -> Self {
        Self {
            id: LanguageId::new(id.into()),
            name: name.into(),
            image: image.into(),
            file_name: file_name.into(),
            setup_commands: Vec::new(),
            run_command: run_command.into_iter().map(String::from).collect(),
            default_timeout,
            default_memory_bytes,
            entrypoint: None,
            aux_files: Vec::new(),
        }
    }

    pub fn with_setup(mut self, commands: Vec<&str>) -> Self {
        self.setup_commands = commands.into_iter().map(String::from).collect();
        self
    }

    pub fn with_entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }
}
