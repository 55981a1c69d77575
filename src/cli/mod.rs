//! Command-line interface for hoist
//!
//! # Available Commands
//!
//! - `upgrade` - Check for and install a newer hoist from the configured feed
//! - `config` - Read and change settings in the hoist config file
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--no-progress`: hide spinners (also `HOIST_NO_PROGRESS`)
//! - `--config` / `-c`: use a different config file
//!
//! # Example
//!
//! ```bash
//! hoist config set upgrade.feedurl https://pkgs.dev.azure.com/contoso/_packaging/tools/nuget/v3/flat2
//! hoist config set upgrade.feedpackagename hoist.linux
//! hoist upgrade
//! hoist upgrade --confirm
//! ```

mod config;
mod upgrade;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

use crate::constants::NO_PROGRESS_ENV;

pub use config::ConfigCommand;
pub use upgrade::UpgradeArgs;

/// Top-level argument parser.
#[derive(Parser, Debug)]
#[command(name = "hoist", version, about = "Keep hoist up to date from your organization's feed")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable progress spinners
    #[arg(long, global = true, env = NO_PROGRESS_ENV)]
    no_progress: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check for and install a newer version of hoist
    Upgrade(UpgradeArgs),

    /// Manage hoist settings
    Config(ConfigCommand),
}

impl Cli {
    /// Log level implied by `--verbose` and `--quiet`.
    ///
    /// `None` means no flag was given and `RUST_LOG` decides.
    #[must_use]
    pub const fn log_level(&self) -> Option<LevelFilter> {
        if self.verbose {
            Some(LevelFilter::DEBUG)
        } else if self.quiet {
            Some(LevelFilter::ERROR)
        } else {
            None
        }
    }

    /// Run the selected command.
    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Upgrade(args) => args.execute(self.config, self.no_progress),
            Commands::Config(cmd) => cmd.execute(self.config),
        }
    }
}
