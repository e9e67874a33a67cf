//! Runs the `tar2headers` binary against archives piped to its stdin.

use std::{
    io::Write,
    process::{Command, Output, Stdio},
};

use serde_json::Value;
use similar_asserts::assert_eq;

fn create_tar_with<F>(f: F) -> Vec<u8>
where
    F: FnOnce(&mut tar::Builder<&mut Vec<u8>>),
{
    let mut data = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut data);
        f(&mut builder);
        builder.finish().unwrap();
    }
    data
}

fn append(builder: &mut tar::Builder<&mut Vec<u8>>, entry_type: tar::EntryType, path: &str) {
    let mut header = tar::Header::new_ustar();
    header.set_mode(0o640);
    header.set_size(0);
    header.set_entry_type(entry_type);
    builder.append_data(&mut header, path, std::io::empty()).unwrap();
}

fn tar2headers(input: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_tar2headers"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // the binary may bail out before reading everything
    let _ = child.stdin.take().unwrap().write_all(input);
    child.wait_with_output().unwrap()
}

fn lines(stdout: &[u8]) -> Vec<Value> {
    std::str::from_utf8(stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_prints_one_line_per_entry() {
    let data = create_tar_with(|b| {
        append(b, tar::EntryType::Directory, "usr/");
        append(b, tar::EntryType::Regular, "usr/.keep");
        append(b, tar::EntryType::Regular, "usr/README");
    });

    let output = tar2headers(&data);
    assert!(output.status.success(), "{output:?}");

    let records = lines(&output.stdout);
    let names: Vec<&str> = records
        .iter()
        .map(|r| r["basename"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["usr", ".keep", "README"]);

    let hidden: Vec<bool> = records
        .iter()
        .map(|r| r["hidden"].as_bool().unwrap())
        .collect();
    assert_eq!(hidden, vec![false, true, false]);
    assert_eq!(records[1]["file_mode_string"], Value::from("-rw-r-----"));
}

#[test]
fn test_empty_archive() {
    let output = tar2headers(&create_tar_with(|_| {}));
    assert!(output.status.success(), "{output:?}");
    assert!(output.stdout.is_empty());
}

#[test]
fn test_unknown_type_fails() {
    let data = create_tar_with(|b| {
        append(b, tar::EntryType::Regular, "before");
        append(b, tar::EntryType::new(b'Z'), "weird");
        append(b, tar::EntryType::Regular, "after");
    });

    let output = tar2headers(&data);
    assert!(!output.status.success());

    let records = lines(&output.stdout);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], Value::from("before"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid type flag"), "{stderr}");
}

#[test]
fn test_garbage_input_fails() {
    let output = tar2headers(&[0xff; 700]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_tar2headers"))
        .arg("--version")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("tar2headers "));
}
