use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn build_model_dir() -> TempDir {
    let obj = "\
mtllib cube.mtl
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl Shell
f 1/1/1 2/2/1 3/3/1 4/4/1
";
    let mtl = "\
newmtl Shell
Kd 0.9 0.2 0.2
";

    let dir = TempDir::new().expect("temp model dir");
    fs::write(dir.path().join("cube.obj"), obj).expect("write obj");
    fs::write(dir.path().join("cube.mtl"), mtl).expect("write mtl");
    dir
}

#[test]
fn cli_prints_model_summary() {
    let dir = build_model_dir();
    let mut cmd = Command::cargo_bin("meshview").expect("binary exists");
    cmd.arg(dir.path().join("cube.obj")).arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("model has 1 draw group(s)"))
        .stdout(contains("Shell: 4 vertices, 2 triangles, texture none"));
}

#[test]
fn cli_without_arguments_prints_usage() {
    let mut cmd = Command::cargo_bin("meshview").expect("binary exists");
    cmd.assert()
        .failure()
        .stderr(contains("Usage: meshview <model.obj> [--summary-only]"));
}

#[test]
fn cli_rejects_unknown_flags() {
    let dir = build_model_dir();
    let mut cmd = Command::cargo_bin("meshview").expect("binary exists");
    cmd.arg(dir.path().join("cube.obj")).arg("--frobnicate");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --frobnicate"));
}

#[test]
fn cli_reports_missing_model() {
    let dir = build_model_dir();
    let mut cmd = Command::cargo_bin("meshview").expect("binary exists");
    cmd.arg(dir.path().join("missing.obj")).arg("--summary-only");
    cmd.assert()
        .failure()
        .stderr(contains("failed to load model"));
}
