//! Upgrade hoist itself from the configured release feed.
//!
//! ```bash
//! hoist upgrade                       # Is a newer version published?
//! hoist upgrade --confirm             # Download, stage and install it
//! hoist upgrade --confirm --dry-run   # Walk every phase without side effects
//! hoist upgrade --anonymous           # Only use feeds that allow anonymous queries
//! ```
//!
//! The feed is chosen from the `upgrade.*` keys of the config file; with no
//! feed configured the command reports that and exits successfully.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::config::ConfigFile;
use crate::constants::UPGRADE_CONFIRM_COMMAND;
use crate::upgrade::credentials::EnvCredentialStore;
use crate::upgrade::feed::FeedEnvironment;
use crate::upgrade::platform::UpgradeDirectories;
use crate::upgrade::state::parse_installed_version;
use crate::upgrade::{
    BackendSelector, HostServices, UpgradeFlags, UpgradeOrchestrator, UpgradeOutcome,
    VersionCheck,
};
use crate::utils::progress::StepSpinner;

/// Command-line arguments for `hoist upgrade`.
#[derive(Args, Debug, Default)]
pub struct UpgradeArgs {
    /// Download and install the newest version instead of only checking
    #[arg(long)]
    pub confirm: bool,

    /// Run every phase without writing, copying, spawning or deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip checksum verification of downloaded packages and installers
    #[arg(long)]
    pub no_verify: bool,

    /// Fail the version query unless the feed can be queried anonymously
    #[arg(long)]
    pub anonymous: bool,
}

impl UpgradeArgs {
    /// Run the upgrade command.
    ///
    /// `config_path` overrides the config file location; `no_progress`
    /// hides the installer spinner.
    pub fn execute(self, config_path: Option<PathBuf>, no_progress: bool) -> Result<()> {
        let installed_version = parse_installed_version(env!("CARGO_PKG_VERSION"))?;

        let config = match config_path {
            Some(path) => ConfigFile::new(path),
            None => ConfigFile::default_location()?,
        };
        let directories = UpgradeDirectories::from_environment()
            .context("Failed to determine the upgrade data directory")?;
        debug!(
            download = %directories.download.display(),
            application = %directories.application.display(),
            "Upgrade directories"
        );

        let flags = UpgradeFlags::new().dry_run(self.dry_run).no_verify(self.no_verify);
        let credentials = EnvCredentialStore;
        let backend = match BackendSelector::new(&config, &credentials).select(FeedEnvironment {
            installed_version: installed_version.clone(),
            directories: directories.clone(),
            flags,
        }) {
            Ok(backend) => backend,
            Err(e) if e.is_configuration_missing() => {
                println!("{e}");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let mut orchestrator = UpgradeOrchestrator::with_version(
            installed_version,
            backend,
            HostServices::native(directories),
            flags,
        )
        .anonymous_only(self.anonymous);

        if self.confirm {
            Self::install(&mut orchestrator, no_progress)
        } else {
            Self::check(&mut orchestrator)
        }
    }

    fn check(orchestrator: &mut UpgradeOrchestrator) -> Result<()> {
        println!("Checking for updates...");
        match orchestrator.check()? {
            VersionCheck::UpToDate {
                installed,
            } => {
                println!("{}", format!("✓ You are on the latest version ({installed})").green());
            }
            VersionCheck::UpdateAvailable {
                newest,
            } => {
                println!(
                    "{}",
                    format!(
                        "A new version is available: {} → {newest}",
                        orchestrator.installed_version()
                    )
                    .yellow()
                );
                println!("Run '{}' to install it", UPGRADE_CONFIRM_COMMAND.bold());
            }
        }
        Ok(())
    }

    fn install(orchestrator: &mut UpgradeOrchestrator, no_progress: bool) -> Result<()> {
        if orchestrator.flags().dry_run {
            println!("{}", "Dry run: no files will be changed".cyan());
        }

        let mut spinner = StepSpinner::new(no_progress);
        match orchestrator.run(&mut spinner)? {
            UpgradeOutcome::UpToDate {
                installed,
            } => {
                println!("{}", format!("✓ You are on the latest version ({installed})").green());
            }
            UpgradeOutcome::Upgraded {
                from,
                to,
                upgrader_path,
                cleanup_warning,
            } => {
                if let Some(warning) = cleanup_warning {
                    warn!("{warning}");
                    println!("⚠️  {warning}");
                }
                println!("{}", format!("✓ Upgraded hoist from {from} to {to}").green().bold());
                println!("Upgrader staged at {}", upgrader_path.display());
            }
        }
        Ok(())
    }
}
