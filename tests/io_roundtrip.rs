//! File-level tests: load matrices from disk, run top-k, write results.

use std::fs;
use std::io::Write;

use ipball::io::{load_matrix, save_results, OutputFormat};
use ipball::{compute_top_k, MipsError};
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn text_results_for_concrete_scenario() {
    let dir = TempDir::new().unwrap();
    let items = write_file(&dir, "items.txt", "# A, B, C\n4 0\n0 3\n2 2\n");
    let users = write_file(&dir, "users.txt", "1,1\n0,-1\n");

    let items = load_matrix(items).unwrap();
    let users = load_matrix(users).unwrap();
    let results = compute_top_k(2, &users, &items).unwrap();

    let out = dir.path().join("out.txt");
    save_results(&out, &results, OutputFormat::Text).unwrap();
    let text = fs::read_to_string(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["0\t0:4 2:4", "1\t0:0 2:-2"]);
}

#[test]
fn json_results_are_well_formed() {
    let dir = TempDir::new().unwrap();
    let items = load_matrix(write_file(&dir, "items.txt", "1 0\n0 1\n")).unwrap();
    let users = load_matrix(write_file(&dir, "users.txt", "2 1\n")).unwrap();
    let results = compute_top_k(1, &users, &items).unwrap();

    let out = dir.path().join("out.json");
    save_results(&out, &results, OutputFormat::Json).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();

    assert_eq!(parsed[0]["user"], 0);
    assert_eq!(parsed[0]["neighbors"][0]["id"], 0);
    assert_eq!(parsed[0]["neighbors"][0]["score"], 2.0);
    assert!(parsed[0].get("error").is_none());
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_matrix(dir.path().join("nope.txt")).unwrap_err();
    assert!(matches!(err, MipsError::Io(_)));
}

#[test]
fn malformed_file_reports_line() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "bad.txt", "1 2\n3 4 5\n");
    let err = load_matrix(path).unwrap_err();
    assert!(err.to_string().contains("line 2"), "{err}");
}
