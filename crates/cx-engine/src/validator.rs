// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validator (SPEC_FULL.md §4.F): syntax-only checks, in-process where a
//! local parser stands in for one, in a short-lived sandbox otherwise.
//! Grounded on the original's `validate_code`/`_validate_python_code`/
//! `_validate_java_code`/`_validate_code_in_container`.

use crate::archive;
use crate::container_manager::ContainerManager;
use crate::env;
use crate::error::ValidateError;
use crate::preparer;
use crate::registry::LanguageRegistry;
use cx_adapters::ContainerRuntime;
use cx_core::{Clock, IdGen, SandboxId};

/// Outcome of one `validate` call. `valid: false` always carries `error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self { valid: true, error: None }
    }

    fn invalid(error: impl Into<String>) -> Self {
        Self { valid: false, error: Some(error.into()) }
    }
}

pub struct Validator<R: ContainerRuntime, C: Clock, G: IdGen> {
    registry: LanguageRegistry,
    container_manager: std::sync::Arc<ContainerManager<R, C>>,
    id_gen: G,
}

impl<R: ContainerRuntime, C: Clock, G: IdGen> Validator<R, C, G> {
    pub fn new(
        registry: LanguageRegistry,
        container_manager: std::sync::Arc<ContainerManager<R, C>>,
        id_gen: G,
    ) -> Self {
        Self { registry, container_manager, id_gen }
    }

    pub async fn validate(&self, source: &str, language: &str) -> Result<ValidationResult, ValidateError> {
        let Ok(spec) = self.registry.lookup(&cx_core::LanguageId::new(language)) else {
            return Ok(ValidationResult::invalid(format!("unsupported language: {language}")));
        };

        match spec.id.as_str() {
            "python" => Ok(validate_python_structurally(source)),
            "javascript" => Ok(ValidationResult::ok()),
            "java" => {
                let structural = validate_java_structurally(source);
                if !structural.valid {
                    return Ok(structural);
                }
                self.validate_in_container(source, "java").await
            }
            "c" | "cpp" => self.validate_in_container(source, spec.id.as_str()).await,
            _ => Ok(ValidationResult::ok()),
        }
    }

    /// Spin a short-lived sandbox, inject the prepared source, and invoke the
    /// compiler in syntax-only mode. Always torn down afterward regardless of
    /// outcome (mirrors the original's `finally: cleanup_container`).
    async fn validate_in_container(&self, source: &str, language: &str) -> Result<ValidationResult, ValidateError> {
        let spec = self.registry.lookup(&cx_core::LanguageId::new(language))?;
        let id = SandboxId::new(self.id_gen.next());

        let create = self
            .container_manager
            .create(
                id.clone(),
                spec,
                env::validator_timeout(),
                env::validator_memory_bytes(),
                None,
            )
            .await;
        let result = match create {
            Ok(_) => self.compile_only(&id, source, language, spec).await,
            Err(e) => Ok(ValidationResult::invalid(e.to_string())),
        };
        self.container_manager.cleanup(&id).await;
        result
    }

    async fn compile_only(
        &self,
        id: &SandboxId,
        source: &str,
        language: &str,
        spec: &cx_core::LanguageSpec,
    ) -> Result<ValidationResult, ValidateError> {
        let prepared = preparer::prepare(source, spec);
        let tar_bytes = archive::build(spec, &prepared).unwrap_or_default();
        if let Err(e) = self.container_manager.upload_archive(id, tar_bytes).await {
            return Ok(ValidationResult::invalid(e.to_string()));
        }

        let compile_cmd = match language {
            "c" | "cpp" => format!("gcc -fsyntax-only /app/{}", spec.file_name),
            "java" => format!("javac /app/{}", spec.file_name),
            _ => return Ok(ValidationResult::ok()),
        };

        match self.container_manager.run_setup(id, &compile_cmd).await {
            Ok(outcome) if outcome.exit_code == 0 => Ok(ValidationResult::ok()),
            Ok(outcome) => Ok(ValidationResult::invalid(
                String::from_utf8_lossy(&outcome.output).into_owned(),
            )),
            Err(e) => Ok(ValidationResult::invalid(e.to_string())),
        }
    }
}

fn validate_java_structurally(source: &str) -> ValidationResult {
    if source.contains("public class") || source.contains("class") {
        ValidationResult::ok()
    } else {
        ValidationResult::invalid("Java code must contain a class definition")
    }
}

/// Stand-in for the original's `ast.parse`: a lightweight structural check
/// (balanced delimiters, no bare tabs/spaces mismatch concerns) rather than a
/// full Python grammar, per the Open Question resolved in DESIGN.md.
fn validate_python_structurally(source: &str) -> ValidationResult {
    let mut depth: i32 = 0;
    for (line_no, line) in source.lines().enumerate() {
        for ch in line.chars() {
            match ch {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return ValidationResult::invalid(format!(
                    "Syntax error at line {}: unmatched closing bracket",
                    line_no + 1
                ));
            }
        }
    }
    if depth != 0 {
        return ValidationResult::invalid("Syntax error: unbalanced brackets");
    }
    ValidationResult::ok()
}
