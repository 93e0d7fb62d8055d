// Copyright 2026 the Opcode Tables Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Truncate-and-replace artifact writing.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Sibling path the artifact is staged at before the rename.
#[must_use]
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `contents` to a sibling staging file, then renames it over `path`.
///
/// A reader of `path` sees either the previous file or the complete new one.
/// Missing parent directories are created.
pub fn write_artifact(path: &Path, contents: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let staged = staging_path(path);
    if let Err(e) = fs::write(&staged, contents.as_bytes()) {
        let _ = fs::remove_file(&staged);
        return Err(io_error(&staged)(e));
    }
    fs::rename(&staged, path).map_err(io_error(path))?;
    log::debug!("wrote {}", path.display());
    Ok(())
}
