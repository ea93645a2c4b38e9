//! Primitive selection flags.
//!
//! Whatever combination of primitives is allowed, the output must be the
//! same bytes.

use crate::common::TestFixture;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;

#[rstest]
#[case::defaults(&[])]
#[case::no_bulk_copy(&["--no-bulk-copy"])]
#[case::no_reflink(&["--no-reflink"])]
#[case::no_tmpfile(&["--no-tmpfile"])]
#[case::no_sync(&["--no-sync"])]
#[case::sendfile_only(&["--no-bulk-copy", "--no-reflink"])]
#[case::everything_off(&["--no-bulk-copy", "--no-reflink", "--no-tmpfile", "--no-sync"])]
fn test_flags_do_not_change_output(#[case] flags: &[&str]) {
    let fx = TestFixture::new();
    let parts = fx.parts(4, 50_000);
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.args(flags).args(&parts).arg(&out).assert().success();

    fx.assert_joined(&out, &parts);
    // No staging leftovers next to the parts.
    assert_eq!(fx.entry_count(), parts.len() + 1);
}

#[test]
fn test_degradation_is_silent_by_default() {
    let fx = TestFixture::new();
    let parts = fx.parts(2, 20_000);
    let out = fx.path("out");

    // Cloning is tried once bulk copy is off and fails quietly where the
    // filesystem has no shared extents.
    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg("--no-bulk-copy")
        .args(&parts)
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    fx.assert_joined(&out, &parts);
}

#[test]
fn test_no_bulk_copy_summary() {
    let fx = TestFixture::new();
    let parts = fx.parts(2, 3_000);
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.args(["-v", "--no-bulk-copy", "--no-reflink"])
        .args(&parts)
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("copy_file_range: 0 B"))
        .stderr(predicate::str::contains("FICLONERANGE: 0 B"))
        .stderr(predicate::str::contains("sendfile: 5.86 KB"));
}

#[test]
fn test_no_tmpfile_writes_in_place() {
    let fx = TestFixture::new();
    let parts = fx.parts(2, 100);
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.args(["-v", "--no-tmpfile"])
        .args(&parts)
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("written in place"));

    assert_eq!(fs::metadata(&out).unwrap().len(), 200);
}
