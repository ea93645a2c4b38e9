//! Edge case integration tests for joinfiles CLI.
//!
//! These tests cover edge cases and primitive selection:
//! - Empty, tiny and block-sized parts
//! - Symlinked sources and special filenames
//! - Forcing fallbacks with --no-bulk-copy, --no-reflink and --no-tmpfile

#[path = "../common/mod.rs"]
mod common;

#[path = "edge_cases/boundary_cases.rs"]
mod boundary_cases;

#[path = "edge_cases/strategy_flags.rs"]
mod strategy_flags;
