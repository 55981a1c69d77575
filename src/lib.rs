//! hoist - a self-upgrading command-line tool
//!
//! hoist keeps itself current from a release feed chosen by the user's
//! configuration: either a package feed queried directly, or an
//! organization information server that names the version to install for
//! the user's ring.
//!
//! # Architecture Overview
//!
//! ```text
//! config file ──► BackendSelector ──► FeedBackend ─┐
//!                                                   ▼
//!                    HostServices ──► UpgradeOrchestrator ──► installer steps
//! ```
//!
//! - The selector inspects which `upgrade.*` keys are present and builds
//!   exactly one backend
//! - The orchestrator drives allowance check, version query, download,
//!   staging, installer run and cleanup strictly in order
//! - Host capabilities (directory preparation, copying, process launch) are
//!   traits so tests substitute them
//!
//! # Core Modules
//!
//! - [`cli`] - `hoist upgrade` and `hoist config`
//! - [`config`] - the user-level TOML config file
//! - [`constants`] - config keys, environment variables, well-known paths
//! - [`core`] - user-facing error reporting
//! - [`upgrade`] - the upgrade pipeline
//! - [`utils`] - progress spinners
//!
//! # Configuration
//!
//! ```toml
//! # ~/.hoist/config.toml
//! [upgrade]
//! feedurl = "https://pkgs.dev.azure.com/contoso/_packaging/tools/nuget/v3/flat2"
//! feedpackagename = "hoist.linux"
//! orginfoserverurl = "https://hoist-org-info.contoso.com"
//! ring = "fast"
//! ```
//!
//! # Environment Variables
//!
//! - `HOIST_CONFIG_PATH` - config file location
//! - `HOIST_DATA_DIR` - root of the download and staging directories
//! - `HOIST_FEED_TOKEN` / `HOIST_FEED_USER` - feed credentials
//! - `HOIST_NO_PROGRESS` - disable spinners
//! - `RUST_LOG` - log filter when neither `--verbose` nor `--quiet` is given

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod upgrade;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
