//! Integration test suite for hoist
//!
//! End-to-end tests of the `hoist` binary and of the upgrade pipeline wired
//! to real feed backends served by a local HTTP mock.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **common**: isolated config/data directories and a preconfigured command
//! - **config**: `hoist config` round trips through the config file
//! - **upgrade**: `hoist upgrade` against mocked feeds
//! - **pipeline**: library-level runs of the orchestrator with a real package

mod common;

mod config;
mod pipeline;
mod upgrade;
