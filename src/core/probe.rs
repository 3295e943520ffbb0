//! Purpose: Scoped probe runs that pair every `open` with exactly one `close`.
//! Exports: `with_library`, `check_exports`, `probe_version`, `ProbeRequest`, `ProbeReport`, `ExportReport`.
//! Role: Caller-facing entry points; the CLI is one caller among many.
//! Invariants: Close runs on every exit path out of a scoped run, early returns included.
//! Invariants: A run yields a full owned report or one typed error, never both.
//! Invariants: The first failure wins; a later unload failure in the same run is only logged.

use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind};
use crate::core::library::LibraryHandle;

/// Explicit parameters of one probe run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProbeRequest {
    pub path: PathBuf,
    pub version_symbol: String,
    pub required_exports: Vec<String>,
}

impl ProbeRequest {
    pub fn new(path: impl Into<PathBuf>, version_symbol: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version_symbol: version_symbol.into(),
            required_exports: Vec::new(),
        }
    }

    pub fn with_required_exports<I, S>(mut self, exports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_exports
            .extend(exports.into_iter().map(Into::into));
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProbeReport {
    pub path: PathBuf,
    pub version_symbol: String,
    pub version: String,
    /// Required exports that were verified present, in request order.
    pub exports: Vec<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExportReport {
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Collapses missing exports into a single `SymbolNotFound` error.
    pub fn require_all(&self) -> Result<(), Error> {
        if self.is_complete() {
            return Ok(());
        }
        let mut err = Error::new(ErrorKind::SymbolNotFound)
            .with_message(format!("missing exports: {}", self.missing.join(", ")));
        if let [only] = self.missing.as_slice() {
            err = err.with_symbol(only);
        }
        Err(err)
    }
}

/// Opens `path`, runs `f` against the handle, and closes the handle on every path.
///
/// `T` cannot borrow from the handle, so whatever `f` returns is already owned.
///
/// # Safety
/// Same contract as [`LibraryHandle::open`].
pub unsafe fn with_library<T, F>(path: impl AsRef<Path>, f: F) -> Result<T, Error>
where
    F: FnOnce(&LibraryHandle) -> Result<T, Error>,
{
    let handle = unsafe { LibraryHandle::open(path)? };
    let outcome = f(&handle);
    let closed = handle.close();

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            tracing::warn!(error = %close_err, "unload failed after an earlier probe error");
            Err(err)
        }
    }
}

/// Checks each name for presence; duplicates are reported once, in first-seen order.
pub fn check_exports<S: AsRef<str>>(handle: &LibraryHandle, names: &[S]) -> ExportReport {
    let mut report = ExportReport::default();
    for name in names {
        let name = name.as_ref();
        if report.present.iter().any(|seen| seen == name)
            || report.missing.iter().any(|seen| seen == name)
        {
            continue;
        }
        if handle.has_export(name) {
            report.present.push(name.to_string());
        } else {
            report.missing.push(name.to_string());
        }
    }
    report
}

/// Runs the full diagnostic: required exports first, then the version call.
///
/// # Safety
/// Same contract as [`LibraryHandle::open`], and `request.version_symbol` must name a
/// [`crate::core::library::VersionFn`] export.
pub unsafe fn probe_version(request: &ProbeRequest) -> Result<ProbeReport, Error> {
    unsafe {
        with_library(&request.path, |handle| {
            let exports = check_exports(handle, request.required_exports.as_slice());
            exports
                .require_all()
                .map_err(|err| err.with_path(handle.path()))?;

            let symbol = handle.resolve(&request.version_symbol)?;
            let version = symbol.invoke()?;
            tracing::debug!(path = %handle.path().display(), %version, "probe succeeded");

            Ok(ProbeReport {
                path: handle.path().to_path_buf(),
                version_symbol: symbol.name().to_string(),
                version,
                exports: exports.present,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ExportReport, ProbeRequest, probe_version, with_library};
    use crate::core::error::ErrorKind;

    #[test]
    fn require_all_passes_when_nothing_is_missing() {
        let report = ExportReport {
            present: vec!["a".to_string()],
            missing: Vec::new(),
        };
        assert!(report.is_complete());
        assert!(report.require_all().is_ok());
    }

    #[test]
    fn require_all_lists_every_missing_export() {
        let report = ExportReport {
            present: Vec::new(),
            missing: vec!["alpha".to_string(), "beta".to_string()],
        };
        let err = report.require_all().expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::SymbolNotFound);
        assert_eq!(err.diagnostic(), Some("missing exports: alpha, beta"));
        assert!(err.symbol().is_none());
    }

    #[test]
    fn require_all_names_a_single_missing_export() {
        let report = ExportReport {
            present: Vec::new(),
            missing: vec!["alpha".to_string()],
        };
        let err = report.require_all().expect_err("missing");
        assert_eq!(err.symbol(), Some("alpha"));
    }

    #[test]
    fn request_builder_appends_required_exports() {
        let request = ProbeRequest::new("/tmp/libdemo.so", "demo_version")
            .with_required_exports(["one"])
            .with_required_exports(vec!["two".to_string()]);
        assert_eq!(request.version_symbol, "demo_version");
        assert_eq!(request.required_exports, vec!["one", "two"]);
    }

    #[test]
    fn scoped_run_never_calls_the_body_when_open_fails() {
        let mut called = false;
        let result = unsafe {
            with_library("/nonexistent/path.ext", |_| {
                called = true;
                Ok(())
            })
        };
        assert_eq!(result.expect_err("missing").kind(), ErrorKind::LoadFailed);
        assert!(!called);
    }

    #[test]
    fn probe_of_missing_library_is_load_failed() {
        let request = ProbeRequest::new("/nonexistent/path.ext", "kreuzberg_version");
        let err = unsafe { probe_version(&request) }.expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::LoadFailed);
    }
}
