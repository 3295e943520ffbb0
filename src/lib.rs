//! Purpose: Dynamic library capability probe shared by the `dylib-probe` CLI and tests.
//! Exports: `core` (handle lifecycle, scoped probe runs, errors) and its flat re-exports.
//! Role: Library crate; the binary is a thin caller of this API.
//! Invariants: Every loader failure surfaces as a typed `Error`, never a print-and-exit.
//! Invariants: Callers pass path and symbol explicitly; no process-wide constants.
pub mod core;

pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::library::{LibraryHandle, VersionFn, VersionSymbol};
pub use crate::core::probe::{
    ExportReport, ProbeReport, ProbeRequest, check_exports, probe_version, with_library,
};
