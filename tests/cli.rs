use serde_json::{json, Value};
use std::io::Write;
use std::process::Command;

fn run(args: &[&str]) -> Value {
    let output = Command::new(env!("CARGO_BIN_EXE_motion-engine"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("binary should start");
    assert!(
        output.status.success(),
        "motion-engine {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn inspect_reports_nested_timelines() {
    let scene = json!({
        "name": "cli",
        "root": {
            "name": "root",
            "duration": 120,
            "type": "composition",
            "width": 200.0,
            "height": 100.0,
            "frameRate": 24.0,
            "layers": [
                {
                    "name": "card",
                    "duration": 48,
                    "startFrame": 12,
                    "type": "solid",
                    "width": 40.0,
                    "height": 20.0
                }
            ]
        }
    });
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{scene}").unwrap();

    let path = file.path().to_str().unwrap();
    let report = run(&["inspect", path, "--time", "1000000"]);

    assert_eq!(report["name"], "root");
    assert_eq!(report["content_frame"], 24);
    let card = &report["children"][0];
    assert_eq!(card["name"], "card");
    assert_eq!(card["layer_type"], "Solid");
    assert_eq!(card["content_frame"], 12);
    assert_eq!(card["bounds"], json!([0.0, 0.0, 40.0, 20.0]));
}

#[test]
fn inspect_rejects_missing_scene() {
    let status = Command::new(env!("CARGO_BIN_EXE_motion-engine"))
        .args(["inspect", "/nonexistent/scene.json"])
        .env("RUST_LOG", "off")
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn preset_samples_glyph_styles() {
    let mut options = tempfile::NamedTempFile::new().unwrap();
    write!(
        options,
        "{}",
        json!({ "type": "Fade", "duration": 500000.0, "effect": "Letter", "effectDelay": 100000.0 })
    )
    .unwrap();

    let report = run(&[
        "preset",
        "--text",
        "abc",
        "--options",
        options.path().to_str().unwrap(),
        "--step",
        "30",
    ]);

    assert_eq!(report["applied"], true);
    assert!(report["animators"].as_u64().unwrap() >= 3);
    let samples = report["samples"].as_array().unwrap();
    assert_eq!(samples.len(), 4);
    assert_eq!(samples[0]["styles"].as_array().unwrap().len(), 3);
}

#[test]
fn slide_moves_toward_the_end_position() {
    let samples = run(&["slide", "--text", "Hello", "--steps", "2"]);
    let samples = samples.as_array().unwrap();
    assert_eq!(samples.len(), 3);

    let first = samples[0]["position_x"].as_f64().unwrap();
    let last = samples[2]["position_x"].as_f64().unwrap();
    assert!((first - 240.0).abs() < 1e-3);
    assert!((last - 40.0).abs() < 1e-3);
    assert_eq!(samples[1]["offsets"]["dx"].as_array().unwrap().len(), 5);
}
