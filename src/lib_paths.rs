//! Purpose: Resolve which library file the CLI probes.
//! Exports: `resolve_library_path`, `library_file_name`, and the default name/symbol constants.
//! Role: Keep CLI path semantics in one place, apart from argument parsing.
//! Invariants: An explicit library path always wins over directory + name.
//! Invariants: Default directory is `target/release`, relative to the working directory.
//! Invariants: Library names must not contain path separators.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};

pub(crate) const DEFAULT_LIBRARY_NAME: &str = "kreuzberg_ffi";
pub(crate) const DEFAULT_VERSION_SYMBOL: &str = "kreuzberg_version";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum LibraryNameResolveError {
    Empty,
    ContainsPathSeparator,
}

pub(crate) fn default_lib_dir() -> PathBuf {
    PathBuf::from("target").join("release")
}

pub(crate) fn library_file_name(name: &str) -> String {
    format!("{DLL_PREFIX}{name}{DLL_SUFFIX}")
}

pub(crate) fn resolve_library_path(
    library: Option<&Path>,
    lib_dir: Option<&Path>,
    name: &str,
) -> Result<PathBuf, LibraryNameResolveError> {
    if let Some(library) = library {
        return Ok(library.to_path_buf());
    }
    if name.is_empty() {
        return Err(LibraryNameResolveError::Empty);
    }
    if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
        return Err(LibraryNameResolveError::ContainsPathSeparator);
    }
    let dir = lib_dir.map(Path::to_path_buf).unwrap_or_else(default_lib_dir);
    Ok(dir.join(library_file_name(name)))
}
