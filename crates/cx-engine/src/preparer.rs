// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Code Preparer (SPEC_FULL.md §4.B): wraps snippets in the minimum
//! scaffolding a language requires. Pure and idempotent when a scaffold
//! already exists; for every other language the source passes through
//! verbatim. Grounded directly on the original's `_prepare_code`.

use cx_core::LanguageSpec;

/// `prepare(source, lang) -> injected_bytes`. Does not interpret or
/// transform code beyond scaffolding.
pub fn prepare(source: &str, spec: &LanguageSpec) -> String {
    match spec.id.as_str() {
        "java" => prepare_java(source),
        "csharp" => prepare_csharp(source),
        _ => source.to_string(),
    }
}

fn prepare_java(source: &str) -> String {
    if source.contains("class Main") || source.contains("public class") {
        return source.to_string();
    }
    format!(
        "public class Main {{\n    public static void main(String[] args) {{\n        {source}\n    }}\n}}\n"
    )
}

fn prepare_csharp(source: &str) -> String {
    if source.contains("using System") {
        return source.to_string();
    }
    format!("using System;\n\nclass Program {{\n    static void Main() {{\n        {source}\n    }}\n}}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LanguageRegistry;
    use cx_core::LanguageId;

    fn lookup(id: &str) -> LanguageSpec {
        LanguageRegistry::with_defaults()
            .lookup(&LanguageId::new(id))
            .unwrap()
            .clone()
    }

    #[test]
    fn python_passes_through_unchanged() {
        let spec = lookup("python");
        assert_eq!(prepare("print(1)", &spec), "print(1)");
    }

    #[test]
    fn java_wraps_bare_statement_in_main_class() {
        let spec = lookup("java");
        let wrapped = prepare("System.out.println(1+1);", &spec);
        assert!(wrapped.contains("public class Main"));
        assert!(wrapped.contains("System.out.println(1+1);"));
    }

    #[test]
    fn java_is_idempotent_when_class_already_present() {
        let spec = lookup("java");
        let source = "public class Main { public static void main(String[] a) {} }";
        assert_eq!(prepare(source, &spec), source);
    }

    #[test]
    fn java_is_idempotent_with_bare_class_main() {
        let spec = lookup("java");
        let source = "class Main { static void main(String[] a) {} }";
        assert_eq!(prepare(source, &spec), source);
    }

    #[test]
    fn csharp_wraps_bare_statement_in_program_class() {
        let spec = lookup("csharp");
        let wrapped = prepare("Console.WriteLine(1+1);", &spec);
        assert!(wrapped.contains("class Program"));
        assert!(wrapped.contains("Console.WriteLine(1+1);"));
    }

    #[test]
    fn csharp_is_idempotent_when_using_system_present() {
        let spec = lookup("csharp");
        let source = "using System;\nclass Program { static void Main() {} }";
        assert_eq!(prepare(source, &spec), source);
    }
}
