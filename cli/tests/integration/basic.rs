//! Basic functionality integration tests for joinfiles CLI.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::TestFixture;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_join_three_parts() {
    let fx = TestFixture::new();
    let a = fx.part("a", "hello ");
    let b = fx.part("b", "");
    let c = fx.part("c", "world\n");
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&a).arg(&b).arg(&c).arg(&out).assert().success();

    assert_eq!(fs::read_to_string(&out).unwrap(), "hello world\n");
}

#[test]
fn test_join_single_source_copies_it() {
    let fx = TestFixture::new();
    let parts = fx.parts(1, 70_000);
    let out = fx.path("copy");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.args(&parts).arg(&out).assert().success();

    fx.assert_joined(&out, &parts);
}

#[test]
fn test_join_many_parts_in_order() {
    let fx = TestFixture::new();
    let parts = fx.parts(20, 5_000);
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg("-q").args(&parts).arg(&out).assert().success();

    fx.assert_joined(&out, &parts);
}

#[test]
fn test_join_repeated_source() {
    let fx = TestFixture::new();
    let a = fx.part("a", "ab");
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&a).arg(&a).arg(&a).arg(&out).assert().success();

    assert_eq!(fs::read_to_string(&out).unwrap(), "ababab");
}

#[test]
fn test_join_replaces_existing_destination() {
    let fx = TestFixture::new();
    let parts = fx.parts(2, 100);
    let out = fx.part("out", "x".repeat(10_000));

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.args(&parts).arg(&out).assert().success();

    fx.assert_joined(&out, &parts);
}

#[test]
fn test_join_is_idempotent() {
    let fx = TestFixture::new();
    let parts = fx.parts(3, 12_345);
    let out = fx.path("out");

    for _ in 0..2 {
        let mut cmd = cargo_bin_cmd!("joinfiles");
        cmd.args(&parts).arg(&out).assert().success();
    }

    fx.assert_joined(&out, &parts);
    // Sources plus the output; no staging files left behind.
    assert_eq!(fx.entry_count(), 4);
}

#[test]
fn test_verbose_prints_summary() {
    let fx = TestFixture::new();
    let parts = fx.parts(2, 4096);
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg("-v")
        .args(&parts)
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Joined 2 files"))
        .stderr(predicate::str::contains("sendfile"));
}

#[test]
fn test_quiet_is_silent_on_success() {
    let fx = TestFixture::new();
    let parts = fx.parts(2, 10);
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg("--quiet")
        .args(&parts)
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_help() {
    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("DESTINATION"))
        .stdout(predicate::str::contains("--no-tmpfile"));
}

#[test]
fn test_version() {
    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("joinfiles"));
}
