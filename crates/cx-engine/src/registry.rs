// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Language Registry (SPEC_FULL.md §4.A): a keyed mapping from language id to
//! `LanguageSpec`, populated at startup and thereafter read-only.

use crate::error::RegistryError;
use cx_core::{AuxFile, LanguageId, LanguageSpec};
use std::collections::HashMap;
use std::time::Duration;

/// Immutable catalog of every supported language. `lookup` is the only
/// read path; there is no mutation path after `with_defaults()` returns, so
/// "reads under write attempts" (SPEC_FULL.md §8) is enforced at compile time
/// by simply never exposing `&mut self`.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: HashMap<LanguageId, LanguageSpec>,
}

impl LanguageRegistry {
    /// Build the registry from an explicit list of specs. Exposed for tests
    /// that want a narrower catalog than the full default one.
    pub fn new(specs: Vec<LanguageSpec>) -> Self {
        Self {
            languages: specs.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    /// The 18-language catalog grounded on the original service's
    /// `language_configs` table (see DESIGN.md).
    pub fn with_defaults() -> Self {
        Self::new(default_catalog())
    }

    pub fn lookup(&self, id: &LanguageId) -> Result<&LanguageSpec, RegistryError> {
        self.languages
            .get(id)
            .ok_or_else(|| RegistryError::Unsupported(id.as_str().to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LanguageSpec> {
        self.languages.values()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

fn spec(
    id: &str,
    name: &str,
    image: &str,
    file_name: &str,
    run_command: Vec<&str>,
    timeout_secs: u64,
    memory_mib: u64,
) -> LanguageSpec {
    LanguageSpec::new(
        id,
        name,
        image,
        file_name,
        run_command,
        Duration::from_secs(timeout_secs),
        memory_mib * 1024 * 1024,
    )
}

fn default_catalog() -> Vec<LanguageSpec> {
    vec![
        spec(
            "python", "Python", "python:3.11-slim", "code.py",
            vec!["python", "/app/code.py"], 30, 128,
        ),
        spec(
            "javascript", "JavaScript", "node:18-alpine", "code.js",
            vec!["node", "/app/code.js"], 30, 128,
        ),
        spec(
            "typescript", "TypeScript", "node:18-alpine", "code.ts",
            vec!["sh", "-c", "npx ts-node /app/code.ts"], 30, 128,
        )
        .with_setup(vec!["npm install -g typescript ts-node"]),
        spec(
            "java", "Java", "openjdk:11-jdk-slim", "Main.java",
            vec!["sh", "-c", "cd /app && javac Main.java && java Main"], 45, 256,
        )
        .with_entrypoint("Main"),
        spec(
            "cpp", "C++", "gcc:latest", "code.cpp",
            vec!["sh", "-c", "cd /app && g++ -o main code.cpp && ./main"], 45, 256,
        ),
        spec(
            "c", "C", "gcc:latest", "code.c",
            vec!["sh", "-c", "cd /app && gcc -o main code.c && ./main"], 45, 256,
        ),
        spec(
            "go", "Go", "golang:1.21-alpine", "code.go",
            vec!["go", "run", "/app/code.go"], 30, 128,
        ),
        spec(
            "rust", "Rust", "rust:latest", "code.rs",
            vec!["sh", "-c", "cd /app && rustc code.rs && ./code"], 60, 256,
        ),
        spec(
            "php", "PHP", "php:8.2-cli", "code.php",
            vec!["php", "/app/code.php"], 30, 128,
        ),
        spec(
            "ruby", "Ruby", "ruby:3.2-alpine", "code.rb",
            vec!["ruby", "/app/code.rb"], 30, 128,
        ),
        with_aux(
            spec(
                "csharp", "C#", "mcr.microsoft.com/dotnet/sdk:7.0", "Program.cs",
                vec!["sh", "-c", "cd /app && dotnet run"], 45, 256,
            )
            .with_setup(vec!["dotnet new console -n app --force"]),
            AuxFile {
                name: "app.csproj".to_string(),
                contents: CSHARP_CSPROJ.to_string(),
            },
        ),
        spec(
            "swift", "Swift", "swift:5.8", "code.swift",
            vec!["swift", "/app/code.swift"], 45, 256,
        ),
        spec(
            "kotlin", "Kotlin", "openjdk:11-jdk-slim", "code.kt",
            vec![
                "sh", "-c",
                "cd /app && kotlinc code.kt -include-runtime -d code.jar && java -jar code.jar",
            ],
            60, 256,
        )
        .with_setup(vec![
            "apt-get update && apt-get install -y wget unzip && \
             wget -O kotlin.zip https://github.com/JetBrains/kotlin/releases/download/v1.9.0/kotlin-compiler-1.9.0.zip && \
             unzip kotlin.zip && mv kotlinc /opt/ && ln -s /opt/kotlinc/bin/kotlinc /usr/local/bin/kotlinc",
        ]),
        spec(
            "scala", "Scala", "hseeberger/scala-sbt:11.0.16_1.7.1_2.13.8", "code.scala",
            vec!["scala", "/app/code.scala"], 60, 512,
        ),
        spec(
            "r", "R", "r-base:latest", "code.r",
            vec!["Rscript", "/app/code.r"], 45, 256,
        ),
        spec(
            "perl", "Perl", "perl:latest", "code.pl",
            vec!["perl", "/app/code.pl"], 30, 128,
        ),
        spec(
            "lua", "Lua", "nickblah/lua:5.4-alpine", "code.lua",
            vec!["lua", "/app/code.lua"], 30, 128,
        ),
        spec(
            "bash", "Bash", "bash:latest", "code.sh",
            vec!["bash", "/app/code.sh"], 30, 128,
        ),
    ]
}

fn with_aux(mut s: LanguageSpec, aux: AuxFile) -> LanguageSpec {
    s.aux_files.push(aux);
    s
}

const CSHARP_CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <OutputType>Exe</OutputType>
    <TargetFramework>net7.0</TargetFramework>
  </PropertyGroup>
</Project>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_eighteen_languages() {
        let registry = LanguageRegistry::with_defaults();
        assert_eq!(registry.len(), 18);
    }

    #[test]
    fn lookup_known_language_succeeds() {
        let registry = LanguageRegistry::with_defaults();
        let spec = registry.lookup(&LanguageId::new("python")).unwrap();
        assert_eq!(spec.file_name, "code.py");
        assert_eq!(spec.default_timeout, Duration::from_secs(30));
    }

    #[test]
    fn lookup_unknown_language_is_unsupported() {
        let registry = LanguageRegistry::with_defaults();
        let err = registry.lookup(&LanguageId::new("cobol")).unwrap_err();
        assert!(matches!(err, RegistryError::Unsupported(id) if id == "cobol"));
    }

    #[test]
    fn java_has_main_entrypoint_constraint() {
        let registry = LanguageRegistry::with_defaults();
        let spec = registry.lookup(&LanguageId::new("java")).unwrap();
        assert_eq!(spec.entrypoint.as_deref(), Some("Main"));
    }

    #[test]
    fn csharp_carries_project_manifest_aux_file() {
        let registry = LanguageRegistry::with_defaults();
        let spec = registry.lookup(&LanguageId::new("csharp")).unwrap();
        assert_eq!(spec.aux_files.len(), 1);
        assert_eq!(spec.aux_files[0].name, "app.csproj");
    }

    #[test]
    fn typescript_carries_setup_commands() {
        let registry = LanguageRegistry::with_defaults();
        let spec = registry.lookup(&LanguageId::new("typescript")).unwrap();
        assert_eq!(spec.setup_commands.len(), 1);
    }
}
