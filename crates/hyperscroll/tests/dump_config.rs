use std::fs;
use std::process::Command;

use tempfile::TempDir;

#[test]
fn dump_config_merges_file_and_overrides() {
    let root = TempDir::new().unwrap();
    let config_path = root.path().join("stage.toml");
    fs::write(
        &config_path,
        r##"
[stage]
pages = 3

[field]
colors = ["#ff0000"]
speed = 2.0
"##,
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_hyperscroll"))
        .arg(&config_path)
        .args(["--dump-config", "--pages", "7", "--transparent"])
        .output()
        .expect("failed to run hyperscroll --dump-config");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("pages = 7"), "stdout: {stdout}");
    assert!(stdout.contains("transparent = true"), "stdout: {stdout}");
    assert!(stdout.contains("speed = 2.0"), "stdout: {stdout}");
    assert!(stdout.contains("\"#ff0000\""), "stdout: {stdout}");
}

#[test]
fn dump_config_without_file_prints_defaults() {
    let output = Command::new(env!("CARGO_BIN_EXE_hyperscroll"))
        .arg("--dump-config")
        .output()
        .expect("failed to run hyperscroll --dump-config");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("pages = 5"), "stdout: {stdout}");
    assert!(stdout.contains("repeat_start = 10.0"), "stdout: {stdout}");
}

#[test]
fn invalid_config_file_fails_with_context() {
    let root = TempDir::new().unwrap();
    let config_path = root.path().join("broken.toml");
    fs::write(&config_path, "[stage]\npages = 0\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_hyperscroll"))
        .arg(&config_path)
        .arg("--dump-config")
        .output()
        .expect("failed to run hyperscroll");

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("pages"), "stderr: {stderr}");
}
