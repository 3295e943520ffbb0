//! Purpose: Build the native test fixture library the probe loads in tests.
//! Role: Cargo build-script; compiles `c/probe_fixture.c` into a shared library in `OUT_DIR`.
//! Invariants: Exposes the fixture path to tests as `DYLIB_PROBE_FIXTURE` only when the build succeeds.
//! Invariants: A missing or failing C toolchain is a warning, never a build failure.
//! Invariants: Uses only Cargo-provided env vars (e.g. `CARGO_MANIFEST_DIR`, `TARGET`).
use std::env;
use std::path::{Path, PathBuf};

fn main() {
    let target = env::var("TARGET").unwrap_or_default();
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));

    println!("cargo:rerun-if-changed=c/probe_fixture.c");

    let source = manifest_dir.join("c").join("probe_fixture.c");
    let output = out_dir.join(fixture_file_name(&target));

    match build_fixture(&source, &output, &out_dir) {
        Ok(()) => println!("cargo:rustc-env=DYLIB_PROBE_FIXTURE={}", output.display()),
        Err(err) => println!(
            "cargo:warning=probe fixture library was not built ({err}); fixture-backed tests will be skipped"
        ),
    }
}

fn fixture_file_name(target: &str) -> &'static str {
    if target.contains("windows") {
        "probe_fixture.dll"
    } else if target.contains("apple") {
        "libprobe_fixture.dylib"
    } else {
        "libprobe_fixture.so"
    }
}

fn build_fixture(source: &Path, output: &Path, out_dir: &Path) -> Result<(), String> {
    let compiler = cc::Build::new()
        .try_get_compiler()
        .map_err(|err| err.to_string())?;

    let mut command = compiler.to_command();
    if compiler.is_like_msvc() {
        command
            .current_dir(out_dir)
            .arg("/LD")
            .arg(source)
            .arg(format!("/Fe{}", output.display()));
    } else {
        command
            .arg("-shared")
            .arg("-fPIC")
            .arg("-o")
            .arg(output)
            .arg(source);
    }

    let status = command
        .status()
        .map_err(|err| format!("failed to run C compiler: {err}"))?;
    if !status.success() {
        return Err(format!("C compiler exited with {status}"));
    }
    Ok(())
}
