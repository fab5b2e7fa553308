#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn lsmlcat() -> Command {
    Command::cargo_bin("lsmlcat").unwrap()
}

#[test]
fn cat_from_stdin() {
    lsmlcat()
        .write_stdin("{t}\nk = v\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("{\"t\"}"))
        .stdout(predicate::str::contains("\"k\"=\"v\""));
}

#[test]
fn cat_merges_files_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.lsml");
    let second = dir.path().join("second.lsml");
    std::fs::write(&first, "{a}\nx = 1\n").unwrap();
    std::fs::write(&second, "[b]\n1,2\n3\n").unwrap();

    lsmlcat()
        .arg(&first)
        .arg(&second)
        .assert()
        .success()
        .stdout(predicate::str::contains("{\"a\"}"))
        .stdout(predicate::str::contains("[\"b\"]"))
        .stdout(predicate::str::contains("\"1\",\"2\","));
}

#[test]
fn parse_errors_go_to_stderr_and_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.lsml");
    std::fs::write(&path, "stray\n{t}\nk = v\n").unwrap();

    lsmlcat()
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("text outside section"))
        .stderr(predicate::str::contains("line 1"))
        // The recovered document is still printed.
        .stdout(predicate::str::contains("\"k\"=\"v\""));
}

#[test]
fn missing_file_is_an_error() {
    lsmlcat()
        .arg("definitely-not-here.lsml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("definitely-not-here.lsml"));
}

#[test]
fn ascii_flag_escapes_output() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{t}}\nk = caf\u{e9}\n").unwrap();

    let assert = lsmlcat().arg("--ascii").arg(file.path()).assert().success();
    let output = assert.get_output().stdout.clone();
    assert!(output.iter().all(|&b| b < 0x80));
    assert!(String::from_utf8(output).unwrap().contains("\\u00E9"));
}
