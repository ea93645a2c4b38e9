//! Error handling integration tests for joinfiles CLI.
//!
//! These tests verify proper error handling behaviors:
//! - Too few operands exit with code 2 before touching the filesystem
//! - A missing or unusable source never damages the destination
//! - A destination that is also a source is refused

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::TestFixture;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_single_operand_is_invalid() {
    let fx = TestFixture::new();
    let only = fx.path("only");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&only)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error[invalid_input]"))
        .stderr(predicate::str::contains("Missing destination operand"));

    // Nothing created.
    assert_eq!(fx.entry_count(), 0);
}

#[test]
fn test_no_operands_is_usage_error() {
    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.assert().code(2);
}

#[test]
fn test_missing_source_leaves_destination_unchanged() {
    let fx = TestFixture::new();
    let a = fx.part("a", "data");
    let out = fx.part("out", "precious");
    let missing = fx.path("missing");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&a)
        .arg(&missing)
        .arg(&out)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error[resource_acquisition]"))
        .stderr(predicate::str::contains("missing"));

    assert_eq!(fs::read_to_string(&out).unwrap(), "precious");
}

#[test]
fn test_failed_join_keeps_previous_output() {
    let fx = TestFixture::new();
    let parts = fx.parts(2, 10_000);
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.args(&parts).arg(&out).assert().success();

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.args(&parts)
        .arg(fx.path("missing"))
        .arg(&out)
        .assert()
        .code(1);

    fx.assert_joined(&out, &parts);
}

#[test]
fn test_missing_source_creates_nothing() {
    let fx = TestFixture::new();
    let missing = fx.path("missing");
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&missing).arg(&out).assert().code(1);

    assert!(!out.exists());
}

#[test]
fn test_directory_source_is_rejected() {
    let fx = TestFixture::new();
    let dir = fx.path("dir");
    fs::create_dir(&dir).unwrap();
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&dir)
        .arg(&out)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is a directory"));

    assert!(!out.exists());
}

#[test]
fn test_destination_is_source_is_invalid() {
    let fx = TestFixture::new();
    let a = fx.part("a", "one");
    let b = fx.part("b", "two");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&a)
        .arg(&b)
        .arg(&b)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error[invalid_input]"));

    assert_eq!(fs::read_to_string(&b).unwrap(), "two");
}

#[test]
fn test_destination_in_missing_directory_fails() {
    let fx = TestFixture::new();
    let a = fx.part("a", "data");
    let out = fx.path("no/such/dir/out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&a)
        .arg(&out)
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("error["));

    assert!(!out.exists());
}

#[test]
fn test_destination_is_directory_fails() {
    let fx = TestFixture::new();
    let a = fx.part("a", "data");
    let out = fx.path("outdir");
    fs::create_dir(&out).unwrap();
    fs::write(out.join("inside"), "keep").unwrap();

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&a).arg(&out).assert().code(1);

    assert_eq!(fs::read_to_string(out.join("inside")).unwrap(), "keep");
}

#[test]
fn test_unknown_flag_is_usage_error() {
    let fx = TestFixture::new();
    let a = fx.part("a", "data");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg("--frobnicate")
        .arg(&a)
        .arg(fx.path("out"))
        .assert()
        .code(2);
}
