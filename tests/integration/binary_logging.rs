//! Integration tests for the kiln binary: exit codes and log destinations.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn kiln(temp_dir: &TempDir, workspace: &Path, args: &[&str]) -> Output {
    let home = temp_dir.path().join("home");
    let config_home = temp_dir.path().join("xdg");
    fs::create_dir_all(&home).unwrap();
    fs::create_dir_all(&config_home).unwrap();

    Command::new(env!("CARGO_BIN_EXE_kiln"))
        .env("HOME", home.as_os_str())
        .env("XDG_CONFIG_HOME", config_home.as_os_str())
        .env_remove("KILN_LOG")
        .env_remove("KILN_LOG_FORMAT")
        .env_remove("KILN_LOG_OUTPUT")
        .env_remove("KILN_ENV")
        .arg("--workspace")
        .arg(workspace)
        .args(args)
        .output()
        .unwrap()
}

fn workspace(temp_dir: &TempDir) -> std::path::PathBuf {
    let workspace = temp_dir.path().join("ws");
    fs::create_dir_all(workspace.join("templates")).unwrap();
    fs::write(
        workspace.join("templates/greet.tmpl.txt"),
        "Hello, {{ name }}!",
    )
    .unwrap();
    workspace
}

#[test]
fn test_generate_prints_summary_and_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let ws = workspace(&temp_dir);
    let templates = ws.join("templates");

    let output = kiln(
        &temp_dir,
        &ws,
        &["generate", templates.to_str().unwrap(), "-c", "name=world"],
    );
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 generated"), "stdout={}", stdout);
    assert_eq!(
        fs::read_to_string(ws.join("generated/greet.txt")).unwrap(),
        "Hello, world!"
    );
}

#[test]
fn test_failed_unit_exits_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    let ws = workspace(&temp_dir);
    let templates = ws.join("templates");

    let output = kiln(&temp_dir, &ws, &["generate", templates.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("render-failure"));
}

#[test]
fn test_verbose_file_logging_under_store_dir() {
    let temp_dir = TempDir::new().unwrap();
    let ws = workspace(&temp_dir);

    let output = kiln(
        &temp_dir,
        &ws,
        &["--verbose", "--log-output", "file", "status"],
    );
    assert!(output.status.success());

    let log_path = ws.join(".kiln").join("kiln.log");
    let content = fs::read_to_string(&log_path).unwrap();
    assert!(content.contains("kiln starting"), "log={}", content);
    assert!(content.contains("Command finished"), "log={}", content);
}

#[test]
fn test_quiet_keeps_stderr_clean() {
    let temp_dir = TempDir::new().unwrap();
    let ws = workspace(&temp_dir);

    let output = kiln(&temp_dir, &ws, &["--quiet", "status"]);
    assert!(output.status.success());
    assert!(output.stderr.is_empty());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No recorded output groups."));
}

#[test]
fn test_invalid_config_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let ws = workspace(&temp_dir);
    fs::write(ws.join("kiln.toml"), "[generation]\noutput_root = \"\"\n").unwrap();

    let output = kiln(&temp_dir, &ws, &["--quiet", "status"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error["));
}
