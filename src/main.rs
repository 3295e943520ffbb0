//! Purpose: `dylib-probe` CLI entry point.
//! Role: Binary crate root; resolves the library path, runs one scoped probe, prints the result.
//! Invariants: With no flags it probes `target/release/<lib>kreuzberg_ffi<ext>` for `kreuzberg_version`.
//! Invariants: Success goes to stdout with exit 0; any probe failure is one stderr line and exit 1.
//! Invariants: Logs go to stderr via `tracing`, filtered by `RUST_LOG` (default `warn`).
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum, ValueHint};
use dylib_probe::{Error, ErrorKind, ProbeReport, ProbeRequest, probe_version};
use tracing_subscriber::EnvFilter;

mod lib_paths;
mod report_json;

use lib_paths::{
    DEFAULT_LIBRARY_NAME, DEFAULT_VERSION_SYMBOL, LibraryNameResolveError, resolve_library_path,
};
use report_json::{error_json, probe_report_json};

const EXIT_OK: i32 = 0;
const EXIT_PROBE_FAILED: i32 = 1;

#[derive(Parser)]
#[command(
    name = "dylib-probe",
    version,
    about = "Load a native library, verify its exports, and print its version",
    long_about = None,
    after_help = r#"EXAMPLES
  $ dylib-probe                                   # target/release/libkreuzberg_ffi.so, kreuzberg_version
  $ dylib-probe --library ./libdemo.so --symbol demo_version
  $ dylib-probe --lib-dir /opt/build --name demo --require demo_init --format json

ENVIRONMENT
  DYLIB_PROBE_LIBRARY   same as --library
  DYLIB_PROBE_LIB_DIR   same as --lib-dir
  RUST_LOG              log filter for stderr diagnostics (default: warn)"#
)]
struct Cli {
    #[arg(
        long,
        env = "DYLIB_PROBE_LIBRARY",
        help = "Exact library file to probe (overrides --lib-dir/--name)",
        value_hint = ValueHint::FilePath
    )]
    library: Option<PathBuf>,
    #[arg(
        long = "lib-dir",
        env = "DYLIB_PROBE_LIB_DIR",
        help = "Directory holding the library (default: target/release)",
        value_hint = ValueHint::DirPath
    )]
    lib_dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = DEFAULT_LIBRARY_NAME,
        help = "Library name without platform prefix/extension"
    )]
    name: String,
    #[arg(
        long,
        default_value = DEFAULT_VERSION_SYMBOL,
        help = "Exported zero-argument function returning the version string"
    )]
    symbol: String,
    #[arg(
        long = "require",
        value_name = "SYMBOL",
        help = "Export that must be present (repeatable)"
    )]
    require: Vec<String>,
    #[arg(long, default_value = "human", value_enum, help = "Output format: human|json")]
    format: OutputFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    std::process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let path = match resolve_library_path(cli.library.as_deref(), cli.lib_dir.as_deref(), &cli.name)
    {
        Ok(path) => path,
        Err(err) => {
            emit_error(&name_error(err, &cli.name), cli.format);
            return EXIT_PROBE_FAILED;
        }
    };

    let request = ProbeRequest::new(path, cli.symbol).with_required_exports(cli.require);
    // SAFETY: the named export is taken to be `VersionFn`; loading runs the library's
    // initializers in this process.
    match unsafe { probe_version(&request) } {
        Ok(report) => match emit_report(&report, cli.format) {
            Ok(()) => EXIT_OK,
            Err(err) => {
                eprintln!("error: failed to write report: {err}");
                EXIT_PROBE_FAILED
            }
        },
        Err(err) => {
            tracing::debug!(kind = err.kind().as_str(), "probe failed");
            emit_error(&err, cli.format);
            EXIT_PROBE_FAILED
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn name_error(err: LibraryNameResolveError, name: &str) -> Error {
    let message = match err {
        LibraryNameResolveError::Empty => "library name is empty".to_string(),
        LibraryNameResolveError::ContainsPathSeparator => {
            format!("library name `{name}` contains a path separator")
        }
    };
    Error::new(ErrorKind::LoadFailed)
        .with_message(message)
        .with_hint("Pass a bare name to --name, or a file path to --library.")
}

fn report_lines(report: &ProbeReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.exports.len() + 2);
    lines.push(format!("Loaded library: {}", report.path.display()));
    for export in &report.exports {
        lines.push(format!("Verified export: {export}"));
    }
    lines.push(format!("Version: {}", report.version));
    lines
}

fn emit_report(report: &ProbeReport, format: OutputFormat) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Human => {
            for line in report_lines(report) {
                writeln!(stdout, "{line}")?;
            }
        }
        OutputFormat::Json => {
            writeln!(stdout, "{}", probe_report_json(report))?;
        }
    }
    stdout.flush()
}

fn error_line(err: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => format!("error: {err}"),
        OutputFormat::Json => error_json(err).to_string(),
    }
}

fn emit_error(err: &Error, format: OutputFormat) {
    eprintln!("{}", error_line(err, format));
}

#[cfg(test)]
mod tests {
    use super::{Cli, OutputFormat, error_line, name_error, report_lines};
    use crate::lib_paths::LibraryNameResolveError;
    use clap::Parser;
    use dylib_probe::{Error, ErrorKind, ProbeReport};
    use std::path::PathBuf;

    #[test]
    fn no_flags_reproduce_the_original_diagnostic() {
        let cli = Cli::try_parse_from(["dylib-probe"]).expect("parse");
        assert_eq!(cli.name, "kreuzberg_ffi");
        assert_eq!(cli.symbol, "kreuzberg_version");
        assert!(cli.require.is_empty());
        assert_eq!(cli.format, OutputFormat::Human);
    }

    #[test]
    fn require_is_repeatable() {
        let cli = Cli::try_parse_from([
            "dylib-probe",
            "--require",
            "a",
            "--require",
            "b",
            "--format",
            "json",
        ])
        .expect("parse");
        assert_eq!(cli.require, vec!["a", "b"]);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn report_lines_list_exports_before_version() {
        let report = ProbeReport {
            path: PathBuf::from("/tmp/libdemo.so"),
            version_symbol: "demo_version".to_string(),
            version: "1.2.3".to_string(),
            exports: vec!["demo_init".to_string()],
        };
        assert_eq!(
            report_lines(&report),
            vec![
                "Loaded library: /tmp/libdemo.so",
                "Verified export: demo_init",
                "Version: 1.2.3",
            ]
        );
    }

    #[test]
    fn error_line_is_a_single_line() {
        let err = Error::new(ErrorKind::SymbolNotFound)
            .with_message("undefined symbol: nope")
            .with_symbol("nope");
        let human = error_line(&err, OutputFormat::Human);
        assert_eq!(human, "error: SymbolNotFound: undefined symbol: nope (symbol: nope)");
        let json = error_line(&err, OutputFormat::Json);
        assert!(!json.contains('\n'));
        assert!(json.starts_with("{\"error\":"));
    }

    #[test]
    fn name_errors_are_load_failed_with_json_envelope() {
        let err = name_error(LibraryNameResolveError::ContainsPathSeparator, "nested/demo");
        assert_eq!(err.kind(), ErrorKind::LoadFailed);
        assert_eq!(
            err.diagnostic(),
            Some("library name `nested/demo` contains a path separator")
        );
        let line = error_line(&err, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&line).expect("json");
        assert_eq!(value["error"]["kind"], "LoadFailed");
        assert!(value["error"]["hint"].is_string());
    }
}
