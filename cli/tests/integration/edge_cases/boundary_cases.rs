//! Boundary cases integration tests for joinfiles CLI.
//!
//! These tests verify behavior at edge cases and boundary conditions:
//! - Zero-length sources
//! - Parts that end exactly on, just before and just after a block
//! - Symlinked sources
//! - Files with special characters in names

use crate::common::{TestFixture, patterned};
use assert_cmd::cargo::cargo_bin_cmd;
use rstest::rstest;
use std::fs;

// =============================================================================
// Empty File Tests
// =============================================================================

#[test]
fn test_join_only_empty_sources() {
    let fx = TestFixture::new();
    let a = fx.part("a", "");
    let b = fx.part("b", "");
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&a).arg(&b).arg(&out).assert().success();

    assert!(out.exists());
    assert_eq!(fs::metadata(&out).unwrap().len(), 0);
}

#[test]
fn test_empty_source_between_parts() {
    let fx = TestFixture::new();
    let a = fx.part("a", "abc");
    let empty = fx.part("empty", "");
    let b = fx.part("b", "def");
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&a)
        .arg(&empty)
        .arg(&b)
        .arg(&out)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&out).unwrap(), "abcdef");
}

#[test]
fn test_empty_join_truncates_existing_destination() {
    let fx = TestFixture::new();
    let empty = fx.part("empty", "");
    let out = fx.part("out", "old content");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&empty).arg(&out).assert().success();

    assert_eq!(fs::metadata(&out).unwrap().len(), 0);
}

// =============================================================================
// Block Boundary Tests
// =============================================================================

#[rstest]
#[case::one_byte(&[1, 1])]
#[case::just_under_block(&[4095, 4095])]
#[case::exact_block(&[4096, 4096])]
#[case::just_over_block(&[4097, 4097])]
#[case::aligned_then_odd(&[8192, 100, 8192])]
#[case::large_uneven(&[1_000_003, 65_537, 2])]
fn test_block_boundaries(#[case] sizes: &[usize]) {
    let fx = TestFixture::new();
    let parts: Vec<_> = sizes
        .iter()
        .enumerate()
        .map(|(i, &size)| fx.part(&format!("p{i}"), patterned(size, i as u8)))
        .collect();
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.args(&parts).arg(&out).assert().success();

    fx.assert_joined(&out, &parts);
}

// =============================================================================
// Path Tests
// =============================================================================

#[test]
fn test_symlinked_source() {
    let fx = TestFixture::new();
    let real = fx.part("real", "through a link");
    let link = fx.path("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();
    let out = fx.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&link).arg(&out).assert().success();

    assert_eq!(fs::read_to_string(&out).unwrap(), "through a link");
    // The link itself is untouched.
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
}

#[test]
fn test_special_characters_in_names() {
    let fx = TestFixture::new();
    let a = fx.part("part one (1).bin", "spaces ");
    let b = fx.part("partie-été.bin", "unicode");
    let out = fx.path("joined output.bin");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.arg(&a).arg(&b).arg(&out).assert().success();

    assert_eq!(fs::read_to_string(&out).unwrap(), "spaces unicode");
}

#[test]
fn test_destination_in_other_directory() {
    let fx = TestFixture::new();
    let other = TestFixture::new();
    let parts = fx.parts(2, 9_000);
    let out = other.path("out");

    let mut cmd = cargo_bin_cmd!("joinfiles");
    cmd.args(&parts).arg(&out).assert().success();

    fx.assert_joined(&out, &parts);
}
