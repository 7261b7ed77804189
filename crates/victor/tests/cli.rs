//! Integration test: run the `victor` binary on generated images.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;
use std::process::Command;

use image::{Rgba, RgbaImage};

/// Fresh scratch directory for one test.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("victor-cli-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A dark square on a light background, saved as PNG.
fn square_png(dir: &std::path::Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_fn(64, 64, |x, y| {
        if (16..48).contains(&x) && (16..48).contains(&y) {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    })
    .save(&path)
    .unwrap();
    path
}

fn victor() -> Command {
    Command::new(env!("CARGO_BIN_EXE_victor"))
}

#[test]
fn json_summary_and_svg_for_each_image() {
    let dir = scratch("json");
    let a = square_png(&dir, "a.png");
    let b = square_png(&dir, "b.png");
    let out = dir.join("out");

    let output = victor()
        .args(["--json", "--seed", "5", "--workers", "2", "--out-dir"])
        .arg(&out)
        .arg(&a)
        .arg(&b)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let reports: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(reports.len(), 2);
    for report in &reports {
        assert!(report["segments"].as_u64().unwrap() > 0);
        assert_eq!(report["width"], 64);
    }

    let svg = std::fs::read_to_string(out.join("a.svg")).unwrap();
    assert!(svg.contains(r#"viewBox="0 0 64 64""#));
    assert!(svg.contains("<animate"));
    assert!(out.join("b.svg").exists());
}

#[test]
fn unreadable_image_fails_without_blocking_others() {
    let dir = scratch("missing");
    let good = square_png(&dir, "good.png");
    let missing = dir.join("missing.png");

    let output = victor().arg(&missing).arg(&good).output().unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.png"), "{stderr}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("good.png"), "{stdout}");
}

#[test]
fn undecodable_image_is_reported() {
    let dir = scratch("garbage");
    let garbage = dir.join("garbage.png");
    std::fs::write(&garbage, b"definitely not a png").unwrap();

    let output = victor().arg(&garbage).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error decoding"));
}
