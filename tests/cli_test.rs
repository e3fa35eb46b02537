//! CLI end-to-end tests
//!
//! Tests for the reelpress command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the reelpress binary
#[allow(deprecated)]
fn reelpress_cmd() -> Command {
    Command::cargo_bin("reelpress").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    reelpress_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    reelpress_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("reelpress"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    reelpress_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "reelpress {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_cli_serve_help() {
    reelpress_cmd()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Serve the transcode form"));
}

#[test]
fn test_cli_run_help() {
    reelpress_cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--options-file"))
        .stdout(predicate::str::contains("--ext"));
}

#[test]
fn test_cli_check_tools_command() {
    reelpress_cmd()
        .arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffmpeg"))
        .stdout(predicate::str::contains("ffprobe"));
}

#[test]
fn test_cli_validate_defaults() {
    reelpress_cmd()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("Default extension: mp4"));
}

#[test]
fn test_cli_validate_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reelpress.json");
    fs::write(
        &path,
        r#"{"server": {"port": 9090}, "form": {"default_extension": "webm"}}"#,
    )
    .unwrap();

    reelpress_cmd()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains(":9090"))
        .stdout(predicate::str::contains("Default extension: webm"));
}

#[test]
fn test_cli_validate_rejects_bad_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    reelpress_cmd().arg("validate").arg(&path).assert().failure();
}

#[test]
fn test_cli_run_missing_input() {
    reelpress_cmd()
        .args(["run", "/nonexistent/clip.mov"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[cfg(unix)]
#[test]
fn test_cli_run_with_fake_ffmpeg() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let ffmpeg = dir.path().join("ffmpeg");
    fs::write(
        &ffmpeg,
        r#"#!/bin/sh
if [ "$1" = "-version" ]; then echo "ffmpeg version fake"; exit 0; fi
prev=""
for a in "$@"; do
  if [ "$prev" = "-i" ]; then in="$a"; fi
  prev="$a"
  last="$a"
done
echo "frame=1 fake" >&2
cp "$in" "$last"
"#,
    )
    .unwrap();
    fs::set_permissions(&ffmpeg, fs::Permissions::from_mode(0o755)).unwrap();

    let config = dir.path().join("reelpress.json");
    fs::write(
        &config,
        format!(r#"{{"engine": {{"ffmpeg_path": "{}"}}}}"#, ffmpeg.display()),
    )
    .unwrap();

    let input = dir.path().join("clip.mov");
    fs::write(&input, b"not really a movie").unwrap();
    let options = dir.path().join("options.txt");
    fs::write(&options, "-c copy\n-an").unwrap();
    let output = dir.path().join("out.mkv");

    reelpress_cmd()
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg(&input)
        .arg("--options-file")
        .arg(&options)
        .args(["--ext", "mkv"])
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("frame=1 fake"))
        .stdout(predicate::str::contains("Complete transcoding!"))
        .stdout(predicate::str::contains("video/mkv"));

    assert_eq!(fs::read(&output).unwrap(), b"not really a movie");
}
