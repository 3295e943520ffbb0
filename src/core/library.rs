//! Purpose: Own one dynamically loaded native library from load to unload.
//! Exports: `LibraryHandle`, `VersionSymbol`, `VersionFn`.
//! Role: Typed layer over `libloading`; every loader failure becomes a core `Error`.
//! Invariants: One `LibraryHandle` per successful `open`; `close` consumes it, drop unloads it.
//! Invariants: A `VersionSymbol` borrows its handle and cannot outlive the unload.
//! Invariants: Strings returned by the library are copied out before the handle can be released.
//! Notes: Handles are `Send + Sync`, but callers must serialize concurrent `open`/`close`
//! of different libraries on platforms whose loader is not reentrant.

use std::ffi::{CStr, c_char, c_void};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};

use crate::core::error::{Error, ErrorKind};

/// Zero-argument export returning a borrowed NUL-terminated string.
pub type VersionFn = unsafe extern "C" fn() -> *const c_char;

#[derive(Debug)]
pub struct LibraryHandle {
    library: Library,
    path: PathBuf,
}

impl LibraryHandle {
    /// Loads the library at `path` with the platform loader.
    ///
    /// The path is handed to the loader as-is; existence is not checked first, so the
    /// diagnostic on failure is the loader's own.
    ///
    /// # Safety
    /// Loading runs the library's static initializers, which can execute arbitrary code.
    pub unsafe fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            // dlopen("") hands back the host program, never what the caller meant.
            return Err(Error::new(ErrorKind::LoadFailed).with_message("library path is empty"));
        }

        tracing::debug!(path = %path.display(), "loading library");
        let library = unsafe { Library::new(path) }.map_err(|err| {
            Error::new(ErrorKind::LoadFailed)
                .with_message(err.to_string())
                .with_path(path)
                .with_hint("Check that the file exists and was built for this platform.")
                .with_source(err)
        })?;

        Ok(Self {
            library,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves `symbol` as a [`VersionFn`].
    ///
    /// A failed lookup leaves the handle untouched.
    ///
    /// # Safety
    /// The export must really be a function of type [`VersionFn`], and the string it
    /// returns must stay valid at least until the library is unloaded.
    pub unsafe fn resolve(&self, symbol: &str) -> Result<VersionSymbol<'_>, Error> {
        if symbol.is_empty() {
            return Err(Error::new(ErrorKind::SymbolNotFound)
                .with_message("symbol name is empty")
                .with_path(&self.path));
        }

        tracing::debug!(path = %self.path.display(), symbol, "resolving symbol");
        let func = unsafe { self.library.get::<VersionFn>(symbol.as_bytes()) }
            .map_err(|err| self.symbol_error(symbol, err))?;

        Ok(VersionSymbol {
            name: symbol.to_string(),
            func,
        })
    }

    /// Reports whether `symbol` is in the export table without typing or calling it.
    pub fn has_export(&self, symbol: &str) -> bool {
        if symbol.is_empty() {
            return false;
        }
        // SAFETY: the address is only checked for presence, never read or called.
        unsafe { self.library.get::<*const c_void>(symbol.as_bytes()) }.is_ok()
    }

    /// Unloads the library.
    ///
    /// The handle is gone after this call whatever the outcome; an `UnloadFailed` error
    /// is a report, not a resource that is still open.
    pub fn close(self) -> Result<(), Error> {
        let Self { library, path } = self;
        tracing::debug!(path = %path.display(), "unloading library");
        library.close().map_err(|err| {
            Error::new(ErrorKind::UnloadFailed)
                .with_message(err.to_string())
                .with_path(path)
                .with_source(err)
        })
    }

    fn symbol_error(&self, symbol: &str, err: libloading::Error) -> Error {
        Error::new(ErrorKind::SymbolNotFound)
            .with_message(err.to_string())
            .with_path(&self.path)
            .with_symbol(symbol)
            .with_hint("Check the export name against the library's dynamic symbol table.")
            .with_source(err)
    }
}

/// A resolved [`VersionFn`] bound to the handle it came from.
#[derive(Debug)]
pub struct VersionSymbol<'lib> {
    name: String,
    func: Symbol<'lib, VersionFn>,
}

impl VersionSymbol<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls the export and copies the returned string into owned memory.
    pub fn invoke(&self) -> Result<String, Error> {
        tracing::debug!(symbol = %self.name, "invoking symbol");
        // SAFETY: `resolve` made the caller vouch for the signature.
        let raw = unsafe { (*self.func)() };
        if raw.is_null() {
            return Err(Error::new(ErrorKind::InvocationFailed)
                .with_message("export returned a null pointer")
                .with_symbol(&self.name));
        }

        // SAFETY: non-null, NUL-terminated, and alive while `self` borrows the handle.
        let text = unsafe { CStr::from_ptr(raw) };
        text.to_str().map(str::to_owned).map_err(|err| {
            Error::new(ErrorKind::InvocationFailed)
                .with_message("export returned a string that is not valid UTF-8")
                .with_symbol(&self.name)
                .with_source(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::LibraryHandle;
    use crate::core::error::ErrorKind;

    #[test]
    fn empty_path_is_rejected_before_the_loader() {
        let err = unsafe { LibraryHandle::open("") }.expect_err("empty path");
        assert_eq!(err.kind(), ErrorKind::LoadFailed);
        assert_eq!(err.diagnostic(), Some("library path is empty"));
        assert!(err.path().is_none());
    }

    #[test]
    fn missing_file_is_load_failed_with_loader_diagnostic() {
        let err = unsafe { LibraryHandle::open("/nonexistent/path.ext") }.expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::LoadFailed);
        assert!(!err.diagnostic().unwrap_or_default().is_empty());
        assert_eq!(
            err.path().map(|path| path.to_path_buf()),
            Some("/nonexistent/path.ext".into())
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
