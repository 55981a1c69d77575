//! Manage the hoist configuration file.
//!
//! The `config` command reads and writes the user-level config file
//! (`~/.hoist/config.toml`). Its main use is pointing `hoist upgrade` at a
//! private release feed.
//!
//! # Examples
//!
//! ```bash
//! hoist config set upgrade.feedurl https://pkgs.dev.azure.com/contoso/_packaging/tools/nuget/v3/flat2
//! hoist config set upgrade.feedpackagename hoist.linux
//! hoist config get upgrade.feedurl
//! hoist config list
//! hoist config unset upgrade.orginfoserverurl
//! ```
//!
//! Keys are case-insensitive dotted paths; see [`crate::constants::config_keys`]
//! for the ones the upgrade pipeline reads.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use crate::config::LocalConfig;
use crate::core::HoistError;

/// Command to read and change hoist settings.
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommands,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Show every setting
    List,

    /// Print the value of one setting
    Get {
        /// Dotted key, e.g. `upgrade.feedurl`
        key: String,
    },

    /// Set a setting, creating the config file if needed
    Set {
        /// Dotted key, e.g. `upgrade.feedurl`
        key: String,

        /// New value
        value: String,
    },

    /// Remove a setting
    Unset {
        /// Dotted key, e.g. `upgrade.ring`
        key: String,
    },
}

impl ConfigCommand {
    /// Run the subcommand against `config_path`, or the default location.
    pub fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let path = match config_path {
            Some(path) => path,
            None => LocalConfig::default_path()?,
        };
        debug!(path = %path.display(), "Using config file");
        let mut config = LocalConfig::load_from(&path)?;

        match self.command {
            ConfigSubcommands::List => Self::list(&config),
            ConfigSubcommands::Get {
                key,
            } => Self::get(&config, &key),
            ConfigSubcommands::Set {
                key,
                value,
            } => Self::set(&mut config, &key, &value),
            ConfigSubcommands::Unset {
                key,
            } => Self::unset(&mut config, &key),
        }
    }

    fn list(config: &LocalConfig) -> Result<()> {
        let entries = config.entries();
        if entries.is_empty() {
            println!("No settings in {}", config.path().display());
            println!("\n{}", "Tip:".yellow());
            println!("  Run 'hoist config set upgrade.feedurl <url>' to configure upgrades");
            return Ok(());
        }

        for (key, value) in entries {
            println!("{}={value}", key.bold());
        }
        Ok(())
    }

    fn get(config: &LocalConfig, key: &str) -> Result<()> {
        match config.get(key) {
            Some(value) => {
                println!("{value}");
                Ok(())
            }
            None => Err(HoistError::ConfigError {
                message: format!("'{key}' is not set in {}", config.path().display()),
            }
            .into()),
        }
    }

    fn set(config: &mut LocalConfig, key: &str, value: &str) -> Result<()> {
        config.set(key, value)?;
        config.save()?;
        println!("{} {key}", "✓ Set".green());
        Ok(())
    }

    fn unset(config: &mut LocalConfig, key: &str) -> Result<()> {
        if config.unset(key)? {
            config.save()?;
            println!("{} {key}", "✓ Removed".green());
        } else {
            println!("⚠️  '{key}' was not set");
        }
        Ok(())
    }
}
