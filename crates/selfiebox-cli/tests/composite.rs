use std::fs;
use std::io::Cursor;

use assert_cmd::cargo::cargo_bin_cmd;
use image::{ImageFormat, Rgba, RgbaImage};
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(pixel));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn test_composite_writes_backdrop_sized_png() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;

    // Cut-out is a larger square than the backdrop allows.
    Mock::given(method("POST"))
        .and(path("/api/remove"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(png(40, 40, [255, 0, 0, 255]))
                .insert_header("content-type", "image/png"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let subject = work.path().join("me.png");
    let backdrop = work.path().join("beach.png");
    let output = work.path().join("out.png");
    fs::write(&subject, png(40, 40, [1, 2, 3, 255])).unwrap();
    fs::write(&backdrop, png(20, 10, [0, 0, 255, 255])).unwrap();

    cargo_bin_cmd!("selfiebox")
        .env("SELFIEBOX_HOME", home.path())
        .env_remove("SELFIEBOX_CONFIG")
        .env("RUST_LOG", "off")
        .args([
            "composite",
            "--subject",
            subject.to_str().unwrap(),
            "--backdrop",
            backdrop.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--endpoint",
            &format!("{}/api/remove", mock_server.uri()),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("20x10"))
        .stdout(predicate::str::contains("subject 10x10 at 5,0"));

    let result = image::load_from_memory(&fs::read(&output).unwrap())
        .unwrap()
        .to_rgba8();
    assert_eq!(result.dimensions(), (20, 10));
    assert_eq!(result.get_pixel(0, 0).0, [0, 0, 255, 255]);
    assert_eq!(result.get_pixel(10, 5).0[3], 255);
    assert!(result.get_pixel(10, 5).0[0] > 200);
}

#[tokio::test]
async fn test_composite_reports_segmentation_failure() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/remove"))
        .respond_with(ResponseTemplate::new(500).set_body_string("CUDA out of memory"))
        .mount(&mock_server)
        .await;

    let subject = work.path().join("me.png");
    let backdrop = work.path().join("beach.png");
    let output = work.path().join("out.png");
    fs::write(&subject, png(4, 4, [1, 2, 3, 255])).unwrap();
    fs::write(&backdrop, png(4, 4, [0, 0, 255, 255])).unwrap();

    cargo_bin_cmd!("selfiebox")
        .env("SELFIEBOX_HOME", home.path())
        .env_remove("SELFIEBOX_CONFIG")
        .env("RUST_LOG", "off")
        .args([
            "composite",
            "--subject",
            subject.to_str().unwrap(),
            "--backdrop",
            backdrop.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--endpoint",
            &format!("{}/api/remove", mock_server.uri()),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("segmentation_failed"));

    assert!(!output.exists());
}

#[test]
fn test_composite_missing_input_fails() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    cargo_bin_cmd!("selfiebox")
        .env("SELFIEBOX_HOME", home.path())
        .env_remove("SELFIEBOX_CONFIG")
        .args([
            "composite",
            "--subject",
            work.path().join("nope.png").to_str().unwrap(),
            "--backdrop",
            work.path().join("nope2.png").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("read subject"));
}
