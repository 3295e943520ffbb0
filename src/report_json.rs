//! Purpose: JSON envelopes for probe reports and probe errors.
//! Exports: `probe_report_json`, `error_json`.
//! Role: Keep `--format json` output shape in one place.
//! Invariants: Stable key names; optional error fields are omitted when absent.

use dylib_probe::{Error, ProbeReport};
use serde_json::{Map, Value, json};

pub(crate) fn probe_report_json(report: &ProbeReport) -> Value {
    let mut map = Map::new();
    map.insert("library".to_string(), json!(report.path.display().to_string()));
    map.insert("symbol".to_string(), json!(report.version_symbol));
    map.insert("version".to_string(), json!(report.version));
    map.insert("exports".to_string(), json!(report.exports));
    Value::Object(map)
}

pub(crate) fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(err.kind().as_str()));
    if let Some(message) = err.diagnostic() {
        inner.insert("message".to_string(), json!(message));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(symbol) = err.symbol() {
        inner.insert("symbol".to_string(), json!(symbol));
    }
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}
