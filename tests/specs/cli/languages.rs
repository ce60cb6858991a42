//! `cx languages` output specs.

use crate::prelude::*;

#[test]
fn languages_text_lists_known_languages() {
    cli()
        .args(&["languages"])
        .passes()
        .stdout_has("python")
        .stdout_has("javascript")
        .stdout_has("rust");
}

#[test]
fn languages_json_is_an_array_of_objects() {
    let run = cli().args(&["-o", "json", "languages"]).passes();
    let value = run.json();
    let languages = value.as_array().expect("languages JSON should be an array");
    assert!(!languages.is_empty());
    let python = languages
        .iter()
        .find(|l| l["id"] == "python")
        .expect("python should be in the catalog");
    assert!(python["image"].is_string());
    assert!(python["default_timeout_secs"].is_u64());
}
