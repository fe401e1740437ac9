use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};

const BIN: &str = env!("CARGO_BIN_EXE_geojson-route-filter");

const INPUT: &str = r#"{"type":"FeatureCollection","name":"stops","features":[{"properties":{"route_ids":["100254"]}},{"properties":{"route_ids":[99]}}]}"#;

fn run_with_stdin(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(BIN)
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    // The process may exit before reading stdin (configuration errors)
    let _ = child.stdin.take().unwrap().write_all(stdin.as_bytes());
    child.wait_with_output().unwrap()
}

#[test]
fn test_stdin_to_stdout() {
    let output = run_with_stdin(&["--ids", "100254"], INPUT);

    assert!(output.status.success());
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        result["features"],
        json!([{"properties": {"route_ids": ["100254"]}}])
    );
    // Quiet by default
    assert!(output.stderr.is_empty());
}

#[test]
fn test_ids_with_garbage_token() {
    let output = run_with_stdin(&["--ids", "abc", "100254", "--mode", "buffered"], INPUT);

    assert!(output.status.success());
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["features"].as_array().unwrap().len(), 1);
}

#[test]
fn test_comma_separated_ids() {
    let output = run_with_stdin(&["--ids", "1,99"], INPUT);

    assert!(output.status.success());
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        result["features"],
        json!([{"properties": {"route_ids": [99]}}])
    );
}

#[test]
fn test_no_valid_ids_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("out.geojson");

    let output = run_with_stdin(
        &["--ids", "abc", "-o", out_path.to_str().unwrap()],
        INPUT,
    );

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("No valid numeric IDs provided in --ids."));
    assert!(!out_path.exists());
}

#[test]
fn test_missing_ids_is_usage_error() {
    let output = run_with_stdin(&[], INPUT);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_file_to_file_preserve_top() {
    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("stops.geojson");
    let out_path = dir.path().join("filtered.geojson");
    fs::write(&in_path, INPUT).unwrap();

    let output = Command::new(BIN)
        .args(["-i", in_path.to_str().unwrap()])
        .args(["-o", out_path.to_str().unwrap()])
        .args(["--ids", "100254", "--mode", "buffered", "--preserve-top"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let text = fs::read_to_string(&out_path).unwrap();
    assert!(text.starts_with("{\n  \"type\": \"FeatureCollection\""));
    assert!(text.ends_with("}\n"));
    let result: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(result["name"], json!("stops"));
    assert_eq!(result["features"].as_array().unwrap().len(), 1);
}

#[test]
fn test_malformed_input_leaves_destination_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("broken.geojson");
    let out_path = dir.path().join("filtered.geojson");
    fs::write(&in_path, r#"{"features":[{"properties":{"route_ids":[1]}},"#).unwrap();
    fs::write(&out_path, "previous contents").unwrap();

    for mode in ["auto", "buffered"] {
        let output = Command::new(BIN)
            .args(["-i", in_path.to_str().unwrap()])
            .args(["-o", out_path.to_str().unwrap()])
            .args(["--ids", "1", "--mode", mode])
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(3), "mode {}", mode);
        assert_eq!(fs::read_to_string(&out_path).unwrap(), "previous contents");
    }

    // No temporary files left behind
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn test_missing_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(BIN)
        .args(["-i", dir.path().join("nope.geojson").to_str().unwrap()])
        .args(["--ids", "1"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_digest_printed_to_stderr() {
    let output = run_with_stdin(&["--ids", "100254", "--digest", "sha256"], INPUT);

    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    let line = stderr.lines().find(|l| l.starts_with("sha256: ")).unwrap();
    assert_eq!(line.len(), "sha256: ".len() + 64);
}

#[cfg(feature = "streaming")]
#[test]
fn test_default_mode_streams_compact_output() {
    let output = run_with_stdin(&["--ids", "100254"], INPUT);

    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "{\"type\":\"FeatureCollection\",\"features\":[{\"properties\":{\"route_ids\":[\"100254\"]}}]}\n"
    );
}

#[test]
fn test_comma_part_with_garbage_is_dropped() {
    let output = run_with_stdin(&["--ids", "99,abc"], INPUT);

    assert!(output.status.success());
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        result["features"],
        json!([{"properties": {"route_ids": [99]}}])
    );
}

#[test]
fn test_ids_wider_than_i64() {
    let input = r#"{"features":[{"properties":{"route_ids":["99999999999999999999"]}}]}"#;
    let output = run_with_stdin(&["--ids", "99999999999999999999"], input);

    assert!(output.status.success());
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["features"].as_array().unwrap().len(), 1);
}

#[cfg(unix)]
fn mode_of(path: &std::path::Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[cfg(unix)]
fn filter_to(in_path: &std::path::Path, out_path: &std::path::Path) {
    let output = Command::new(BIN)
        .args(["-i", in_path.to_str().unwrap()])
        .args(["-o", out_path.to_str().unwrap()])
        .args(["--ids", "100254"])
        .output()
        .unwrap();
    assert!(output.status.success());
}

#[cfg(unix)]
#[test]
fn test_replaced_output_keeps_mode() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("stops.geojson");
    fs::write(&in_path, INPUT).unwrap();

    for mode in [0o644, 0o640] {
        let out_path = dir.path().join(format!("filtered-{:o}.geojson", mode));
        fs::write(&out_path, "old").unwrap();
        fs::set_permissions(&out_path, fs::Permissions::from_mode(mode)).unwrap();

        filter_to(&in_path, &out_path);

        assert_eq!(mode_of(&out_path), mode);
        assert_ne!(fs::read_to_string(&out_path).unwrap(), "old");
    }
}

#[cfg(unix)]
#[test]
fn test_new_output_mode_matches_file_create() {
    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("stops.geojson");
    let out_path = dir.path().join("filtered.geojson");
    fs::write(&in_path, INPUT).unwrap();

    filter_to(&in_path, &out_path);

    // Same umask as this process, so a plain create is the reference
    let reference = dir.path().join("reference");
    fs::File::create(&reference).unwrap();
    assert_eq!(mode_of(&out_path), mode_of(&reference));
}
