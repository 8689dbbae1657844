// Reproducibility tests for hermetic builds.
//
// These tests verify that the compiler produces byte-identical outputs
// for identical inputs, and that build-info tracks what went in.

use std::path::{Path, PathBuf};
use std::process::Command;

fn starc_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_starc"))
}

fn demos_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("demos")
}

fn run_starc(args: &[&str]) -> String {
    let output = Command::new(starc_binary())
        .args(args)
        .output()
        .expect("failed to run starc");
    assert!(
        output.status.success(),
        "starc failed with args {:?}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("non-UTF8 output")
}

fn demo(name: &str) -> String {
    demos_dir().join(name).to_string_lossy().into_owned()
}

/// Compiling the same netlist twice produces byte-identical C.
#[test]
fn same_source_identical_c() {
    for name in ["ramp_gain.net", "quantize.net", "chop.net", "fixed_point.net"] {
        let first = run_starc(&[&demo(name)]);
        let second = run_starc(&[&demo(name)]);
        assert_eq!(first, second, "{} is not reproducible", name);
    }
}

#[test]
fn build_info_is_stable() {
    let a = run_starc(&["--emit", "build-info", &demo("ramp_gain.net")]);
    let b = run_starc(&["--emit", "build-info", &demo("ramp_gain.net")]);
    assert_eq!(a, b);
    let v: serde_json::Value = serde_json::from_str(&a).unwrap();
    assert_eq!(v["source_hash"].as_str().unwrap().len(), 64);
    assert_eq!(v["library_fingerprint"].as_str().unwrap().len(), 64);
    assert_eq!(v["compiler_version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn build_info_tracks_source_and_library() {
    let base: serde_json::Value =
        serde_json::from_str(&run_starc(&["--emit", "build-info", &demo("ramp_gain.net")]))
            .unwrap();
    let other: serde_json::Value =
        serde_json::from_str(&run_starc(&["--emit", "build-info", &demo("chop.net")])).unwrap();
    assert_ne!(base["source_hash"], other["source_hash"]);
    assert_eq!(base["library_fingerprint"], other["library_fingerprint"]);

    let with_lib: serde_json::Value = serde_json::from_str(&run_starc(&[
        "--emit",
        "build-info",
        "-L",
        &demo("scale.star"),
        &demo("ramp_gain.net"),
    ]))
    .unwrap();
    assert_eq!(base["source_hash"], with_lib["source_hash"]);
    assert_ne!(base["library_fingerprint"], with_lib["library_fingerprint"]);
}
