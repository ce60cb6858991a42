// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the in-memory tar archive injected into a sandbox's `/app`
//! (SPEC_FULL.md §4.D step 5), pairing with `bollard`'s archive-based
//! `upload_to_container` API.

use cx_core::LanguageSpec;
use std::io;

/// Build a tar archive containing the prepared source at `spec.file_name`,
/// plus any auxiliary files the language profile requires (e.g. a C# project
/// manifest). Infallible in practice (writes to an in-memory buffer).
pub fn build(spec: &LanguageSpec, prepared_source: &str) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    append_file(&mut builder, &spec.file_name, prepared_source.as_bytes())?;
    for aux in &spec.aux_files {
        append_file(&mut builder, &aux.name, aux.contents.as_bytes())?;
    }
    builder.into_inner()
}

fn append_file(builder: &mut tar::Builder<Vec<u8>>, name: &str, contents: &[u8]) -> io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, contents)
}
