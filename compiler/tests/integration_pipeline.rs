// Integration tests for the starc binary.
//
// These tests verify the command-line contract:
// - `--emit ast` is a parse-only path
// - each --emit target produces its artifact
// - exit codes: 1 for netlist errors, 2 for I/O and library errors

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn starc_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_starc"))
}

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn demo(name: &str) -> String {
    project_root()
        .join("demos")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn run(args: &[&str]) -> Output {
    Command::new(starc_binary())
        .args(args)
        .output()
        .expect("failed to run starc")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("starc-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn emit_c_prints_a_program() {
    let out = run(&[&demo("ramp_gain.net")]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("/* Generated by starc"), "{text}");
    assert!(text.contains("int main(void)"));
    assert!(text.contains("iteration < 3;"));
}

#[test]
fn iterations_and_banner_flags() {
    let out = run(&["--iterations", "7", "--no-banner", &demo("ramp_gain.net")]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("#include"), "{text}");
    assert!(text.contains("iteration < 7;"));
}

#[test]
fn emit_ast_is_parse_only() {
    // Unknown classes are not an error before graph construction.
    let path = temp_file("unknown.net", "star x : DoesNotExist\n");
    let out = run(&["--emit", "ast", path.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("DoesNotExist"));
}

#[test]
fn emit_graph_is_dot() {
    let out = run(&["--emit", "graph", &demo("chop.net")]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("digraph starc {"), "{text}");
    assert!(text.contains("ramp1\\nRamp x4"), "{text}");
}

#[test]
fn emit_sections_is_json() {
    let out = run(&["--emit", "sections", &demo("quantize.net")]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(v["iterations"], 16);
    assert_eq!(v["procedure"].as_array().unwrap().len(), 1);
}

#[test]
fn output_flag_writes_a_file() {
    let target = temp_file("out.c", "");
    let out = run(&["-o", target.to_str().unwrap(), &demo("fixed_point.net")]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).is_empty());
    let written = std::fs::read_to_string(&target).unwrap();
    assert!(written.contains("#include \"fix.h\""));
}

#[test]
fn library_flag_loads_template_stars() {
    let out = run(&["-L", &demo("scale.star"), &demo("template.net")]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("scale_output = 3.0 * ramp1_output;"));

    let out = run(&[&demo("template.net")]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("E0100"), "{}", stderr(&out));
}

#[test]
fn parse_error_exits_with_one() {
    let path = temp_file("bad.net", "connect a.output b.input\n");
    let out = run(&[path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("parse error"), "{}", stderr(&out));
}

#[test]
fn generation_error_exits_with_one() {
    let path = temp_file(
        "divzero.net",
        "star k : Const\nstar s : Sgn\nstar d : DivByInt(divisor = 0)\nstar p : Printer\n\
         connect k.output -> s.input\nconnect s.output -> d.input\nconnect d.output -> p.input\n",
    );
    let out = run(&[path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("must be non-zero"), "{}", stderr(&out));
    assert!(stdout(&out).is_empty());
}

#[test]
fn missing_source_exits_with_two() {
    let out = run(&["/nonexistent/dir/missing.net"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn bad_library_exits_with_two() {
    let lib = temp_file("broken.star", "STAR(Broken, IN(input, quaternion))\n");
    let out = run(&["-L", lib.to_str().unwrap(), &demo("ramp_gain.net")]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("quaternion"), "{}", stderr(&out));
}
