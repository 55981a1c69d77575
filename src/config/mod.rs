//! Configuration management for hoist
//!
//! hoist keeps a single user-level TOML file. The upgrade pipeline never
//! parses it directly: it asks a [`ConfigStore`] for the flattened key/value
//! mapping and decides what to do from which keys are present.
//!
//! # Configuration File (`~/.hoist/config.toml`)
//!
//! **Location:**
//! - Unix/macOS: `~/.hoist/config.toml`
//! - Windows: `%LOCALAPPDATA%\hoist\config.toml`
//! - Override: `HOIST_CONFIG_PATH`
//!
//! ```toml
//! [upgrade]
//! feedurl = "https://pkgs.dev.azure.com/contoso/_packaging/tools/nuget/v3/flat2"
//! feedpackagename = "hoist.linux"
//! orginfoserverurl = "https://hoist-org-info.contoso.com"
//! ring = "slow"
//! ```
//!
//! Managed from the command line with `hoist config get|set|unset|list`.

pub mod local;

pub use local::{ConfigFile, LocalConfig};

use anyhow::Result;
use std::collections::BTreeMap;

/// Source of the flattened configuration mapping.
pub trait ConfigStore {
    /// Every configured key with its value.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    fn all_entries(&self) -> Result<BTreeMap<String, String>>;
}

impl ConfigStore for BTreeMap<String, String> {
    fn all_entries(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.clone())
    }
}
