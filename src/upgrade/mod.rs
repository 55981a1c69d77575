//! Self-upgrade pipeline for hoist.
//!
//! This module detects whether a newer hoist release is published on the
//! configured feed, downloads it, stages a copy of the running installation
//! and runs the release's installers from there.
//!
//! # Architecture Overview
//!
//! Components, leaves first:
//!
//! - **[`platform::PlatformStrategy`]**: resets the download and staging
//!   directories with platform-correct permissions
//! - **[`backend::FeedBackend`]**: one kind of release feed; two variants ship
//!   in [`feed`] (direct feed and organization-resolved feed)
//! - **[`BackendSelector`]**: looks at which configuration keys are present
//!   and builds exactly one backend
//! - **[`UpgradeOrchestrator`]**: the phase state machine
//! - **[`staging::DirectoryCopier`]**: clones the running installation
//!
//! ## Update Process Flow
//!
//! ```text
//! 1. Allowance check      backend decides whether upgrading is permitted
//! 2. Version query        newest published version vs. installed version
//!    └── up to date → Done
//! 3. Download             prepare download dir, fetch + verify + extract
//! 4. Staging              prepare staging dir, copy running installation
//! 5. Installer run        each installer step bracketed by the caller's wrapper
//! 6. Cleanup              remove downloads (failure only warns)
//! ```
//!
//! # Dry Run and Verification
//!
//! With [`UpgradeFlags::dry_run`] every mutating step (directory
//! preparation, download write, copy, process spawn, deletion) is replaced
//! by a log line and reports success. [`UpgradeFlags::no_verify`] skips
//! checksum verification and is logged as a warning in every phase it
//! affects.
//!
//! # Usage Patterns
//!
//! ```bash
//! hoist upgrade                 # Check whether a newer version exists
//! hoist upgrade --confirm       # Download, stage and install it
//! hoist upgrade --confirm --dry-run
//! ```
//!
//! # Error Handling
//!
//! Every phase returns `Result<T, UpgradeError>`:
//!
//! ```rust,no_run
//! use hoist_cli::config::LocalConfig;
//! use hoist_cli::upgrade::credentials::EnvCredentialStore;
//! use hoist_cli::upgrade::feed::FeedEnvironment;
//! use hoist_cli::upgrade::platform::UpgradeDirectories;
//! use hoist_cli::upgrade::{
//!     BackendSelector, HostServices, UpgradeFlags, UpgradeOrchestrator, UpgradeOutcome,
//! };
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = LocalConfig::load()?;
//! let directories = UpgradeDirectories::from_environment()?;
//! let flags = UpgradeFlags::new();
//! let backend = BackendSelector::new(&config, &EnvCredentialStore).select(FeedEnvironment {
//!     installed_version: semver::Version::new(0, 3, 2),
//!     directories: directories.clone(),
//!     flags,
//! })?;
//!
//! let mut orchestrator =
//!     UpgradeOrchestrator::new("0.3.2", backend, HostServices::native(directories), flags)?;
//! let mut wrapper = |action: &mut dyn FnMut() -> bool, _description: &str| action();
//! match orchestrator.run(&mut wrapper)? {
//!     UpgradeOutcome::UpToDate { .. } => println!("Already on latest version"),
//!     UpgradeOutcome::Upgraded { to, .. } => println!("Upgraded to {to}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod feed;
pub mod orchestrator;
pub mod platform;
pub mod selector;
pub mod staging;
pub mod state;
/// Checksum verification of downloaded packages and installers.
pub mod verification;


pub use backend::{FeedBackend, InstallActionWrapper, InstallerRunner};
pub use error::{QueryFailureKind, UpgradeError};
pub use orchestrator::{HostServices, UpgradeOrchestrator, UpgradeOutcome, VersionCheck};
pub use selector::{BackendFactory, BackendSelector, DefaultBackendFactory};
pub use state::{UpgradeFlags, UpgradeInstanceId, UpgradePhase, UpgradeState};
pub use verification::ChecksumVerifier;
