//! Benchgate workspace-level test utilities.
//!
//! This crate exists solely to support workspace-level integration tests,
//! particularly the BDD/cucumber tests in `tests/cucumber.rs`.
//!
//! The actual benchgate functionality is in the workspace member crates:
//! - `benchgate-types`: Shared types and JSON schemas
//! - `benchgate-expr`: Assertion grammar, syntax tree and units
//! - `benchgate-domain`: Statistics resolution and evaluation
//! - `benchgate-config`: Config loading and subject selection
//! - `benchgate-adapters`: Statistics sources
//! - `benchgate-app`: Application use cases
//! - `benchgate-cli`: CLI interface
