//! End-to-end CLI tests for the librarycache binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

use std::io::Cursor;
use std::path::Path;

use assert_cmd::Command;
use image::{GrayImage, ImageFormat};
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return socket_skip_return();
        };
        mock_server
    }};
}

fn write_config(config_home: &Path, contents: &str) {
    let config_dir = config_home.join("librarycache");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), contents).unwrap();
}

/// Command isolated from the user's config and working directory.
fn librarycache(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("librarycache").unwrap();
    cmd.current_dir(workdir)
        .env("XDG_CONFIG_HOME", workdir.join("config"))
        .env_remove("RUST_LOG")
        .write_stdin("");
    cmd
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    GrayImage::new(width, height)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[test]
fn test_binary_help_displays_usage() {
    let dir = TempDir::new().unwrap();
    librarycache(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Library"))
        .stdout(predicate::str::contains("--concurrency"));
}

#[test]
fn test_binary_version_displays_version() {
    let dir = TempDir::new().unwrap();
    librarycache(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("librarycache"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let dir = TempDir::new().unwrap();
    librarycache(dir.path())
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_concurrency_out_of_range_rejected() {
    let dir = TempDir::new().unwrap();
    librarycache(dir.path())
        .args(["-c", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_binary_renders_dir_outside_output_rejected() {
    let dir = TempDir::new().unwrap();
    let library = dir.path().join("Library");
    std::fs::write(&library, b"").unwrap();

    librarycache(dir.path())
        .arg(&library)
        .args(["--renders-dir", ".."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("plain folder name"));
}

#[test]
fn test_binary_renders_dir_from_config_outside_output_rejected() {
    let dir = TempDir::new().unwrap();
    let library = dir.path().join("Library");
    std::fs::write(&library, b"").unwrap();
    write_config(&dir.path().join("config"), "renders_dir = \"..\"\n");

    librarycache(dir.path())
        .arg(&library)
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file"));
}

#[test]
fn test_binary_missing_library_without_terminal_fails() {
    let dir = TempDir::new().unwrap();
    librarycache(dir.path())
        .arg(dir.path().join("no-such-Library"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to locate the Library file"));
}

#[test]
fn test_binary_library_without_links_completes() {
    let dir = TempDir::new().unwrap();
    let library = dir.path().join("Library");
    std::fs::write(&library, b"\x00\x01 nothing to see here \xff").unwrap();

    librarycache(dir.path())
        .arg(&library)
        .arg("-q")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Finished downloading/moving everything!",
        ));

    assert!(dir.path().join("DownloadedImages").is_dir());
    let report = std::fs::read_to_string(dir.path().join("output.txt")).unwrap();
    assert!(report.is_empty());
}

#[test]
fn test_binary_invalid_config_value_fails() {
    let dir = TempDir::new().unwrap();
    write_config(&dir.path().join("config"), "concurrency = 0\n");
    let library = dir.path().join("Library");
    std::fs::write(&library, b"").unwrap();

    librarycache(dir.path())
        .arg(&library)
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file"));
}

#[test]
fn test_binary_config_supplies_library_and_output() {
    let dir = TempDir::new().unwrap();
    let library = dir.path().join("Library");
    std::fs::write(&library, b"").unwrap();
    write_config(
        &dir.path().join("config"),
        &format!(
            "library_path = \"{}\"\noutput_dir = \"imgs\"\nreport_path = \"links.txt\"\nverbosity = \"quiet\"\n",
            library.display()
        ),
    );

    librarycache(dir.path()).assert().success();

    assert!(dir.path().join("imgs").is_dir());
    assert!(dir.path().join("links.txt").is_file());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_full_run_downloads_and_moves_renders() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/render.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(2048, 2048)))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/photo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(16, 16)))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let library = dir.path().join("Library");
    let uri = mock_server.uri();
    std::fs::write(
        &library,
        format!(
            "\u{1}\"{uri}/render.png\"\u{2}\"{uri}/photo.png\" {uri}/gone.jpg {}/RENDER.PNG",
            uri.to_uppercase()
        ),
    )
    .unwrap();

    let workdir = dir.path().to_path_buf();
    let assert = tokio::task::spawn_blocking(move || {
        librarycache(&workdir)
            .arg(&library)
            .args(["-q", "-r", "1", "--retry-delay", "0"])
            .assert()
    })
    .await
    .unwrap();

    assert.success().stdout(predicate::str::contains(
        "Finished downloading/moving everything!",
    ));

    let output = dir.path().join("DownloadedImages");
    assert!(output.join("Renders").join("render.png").is_file());
    assert!(!output.join("render.png").exists());
    assert!(output.join("photo.png").is_file());
    assert!(!output.join("gone.jpg").exists());

    let report = std::fs::read_to_string(dir.path().join("output.txt")).unwrap();
    assert!(report.contains("Extension: .jpg\n"));
    assert!(report.contains("Extension: .png\n"));
    assert_eq!(report.matches("render.png").count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_no_classify_keeps_renders_in_place() {
    let mock_server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes(2048, 2048)))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let library = dir.path().join("Library");
    std::fs::write(&library, format!("{}/big.png", mock_server.uri())).unwrap();

    let workdir = dir.path().to_path_buf();
    let assert = tokio::task::spawn_blocking(move || {
        librarycache(&workdir)
            .arg(&library)
            .args(["-q", "--no-classify"])
            .assert()
    })
    .await
    .unwrap();

    assert.success();
    let output = dir.path().join("DownloadedImages");
    assert!(output.join("big.png").is_file());
    assert!(!output.join("Renders").exists());
}
