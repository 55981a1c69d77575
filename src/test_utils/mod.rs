//! Test utilities for hoist
//!
//! This module provides substitutes for every host capability the upgrade
//! pipeline consumes, so pipeline tests can run without a network, without
//! spawning processes and inside a throwaway directory.
//!
//! # Test Isolation
//!
//! - [`mocks`]: scripted feed backend, platform strategy, copier, locator
//!   and process launcher, each recording how it was called
//! - [`fixtures`]: fake installation trees and config stores
//!
//! # Example
//!
//! ```rust,no_run
//! use hoist_cli::test_utils::{MockBackend, TestHost};
//! use hoist_cli::upgrade::{UpgradeFlags, UpgradeOrchestrator};
//!
//! let host = TestHost::new().unwrap();
//! let backend = MockBackend::new("mock").with_newest("2.0.0");
//! let mut orchestrator =
//!     UpgradeOrchestrator::new("1.0.0", Box::new(backend), host.services(), UpgradeFlags::new())
//!         .unwrap();
//! orchestrator.check_upgrade_allowed().unwrap();
//! ```

pub mod fixtures;
pub mod mocks;

pub use fixtures::{TestHost, build_installation_tree, config_entries};
pub use mocks::{
    CallLog, FailingCopier, FixedLocator, MockBackend, MockPlatform, RecordingLauncher,
    RecordingWrapper,
};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=hoist_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
