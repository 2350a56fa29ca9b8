use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;

/// Command with an isolated home directory and no proxy settings
fn panofetch(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!();
    cmd.env("HOME", home)
        .env("NO_PROXY", "127.0.0.1")
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy")
        .env_remove("ALL_PROXY")
        .env_remove("all_proxy");
    cmd
}

fn write_config(home: &Path, contents: &str) {
    let dir = home.join(".config").join("panofetch");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), contents).unwrap();
}

/// Serve one HTTP response on a local port and return its URL
fn serve_once(body: Vec<u8>, content_type: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap_or(0) > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }

            let mut stream = stream;
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                content_type,
                body.len()
            );
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(&body);
        }
    });

    format!("http://{}/pano.png", addr)
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn test_cli_help_flag() {
    cargo_bin_cmd!()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("equirectangular panoramas"));
}

#[test]
fn test_cli_version_flag() {
    cargo_bin_cmd!()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("panofetch"));
}

#[test]
fn test_cli_requires_subcommand() {
    cargo_bin_cmd!().assert().failure();
}

#[test]
fn test_search_without_api_key_fails() {
    let home = tempfile::tempdir().unwrap();

    panofetch(home.path())
        .args(["search", "equirectangular"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key configured"));
}

#[test]
fn test_info_without_api_key_fails() {
    let home = tempfile::tempdir().unwrap();

    panofetch(home.path())
        .args(["info", "5301"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key configured"));
}

#[test]
fn test_fetch_rejects_unsupported_scheme() {
    let home = tempfile::tempdir().unwrap();
    let output = home.path().join("out.png");

    panofetch(home.path())
        .args(["fetch", "ftp://example.com/pano.jpg", "--output"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid request"));

    assert!(!output.exists());
}

#[test]
fn test_malformed_config_warns_and_continues() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "[photos\napi_key = 1");

    panofetch(home.path())
        .args(["fetch", "not a url", "--output", "out.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Warning: Invalid config"));
}

#[test]
fn test_fetch_streams_and_saves_image() {
    let home = tempfile::tempdir().unwrap();
    let output = home.path().join("pano.png");
    let url = serve_once(png(200, 100), "image/png");

    panofetch(home.path())
        .args(["fetch", &url, "--panorama", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("Saved 200x100 image"));

    let saved = image::open(&output).unwrap();
    assert_eq!((saved.width(), saved.height()), (200, 100));
}

#[test]
fn test_fetch_buffered_with_scaling() {
    let home = tempfile::tempdir().unwrap();
    let output = home.path().join("small.png");
    let url = serve_once(png(200, 100), "image/png");

    panofetch(home.path())
        .args(["fetch", &url, "--no-stream", "--max-dimension", "50", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("scaled from 200x100"));

    let saved = image::open(&output).unwrap();
    assert_eq!((saved.width(), saved.height()), (50, 25));
}

#[test]
fn test_fetch_rejects_non_panorama() {
    let home = tempfile::tempdir().unwrap();
    let output = home.path().join("square.png");
    let url = serve_once(png(64, 64), "image/png");

    panofetch(home.path())
        .args(["fetch", &url, "--panorama", "--output"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an equirectangular panorama"));
}
