//! The upgrade pipeline.
//!
//! [`UpgradeOrchestrator`] drives one upgrade attempt through a fixed
//! sequence of phases:
//!
//! ```text
//! Idle → AllowanceChecked → VersionQueried → Downloaded → StagingPrepared
//!      → InstallerRun → CleanedUp → Done
//! ```
//!
//! Each phase can be called on its own (the CLI's check-only mode stops
//! after the version query) or all at once through [`UpgradeOrchestrator::run`].
//! A phase refuses to start unless its predecessor completed, and any fatal
//! failure moves the orchestrator into an absorbing `Failed` state.
//!
//! Cleanup failures are the exception: they are reported but the pipeline
//! still finishes, because the new version is already installed by then.

use semver::Version;
use std::fmt;
use std::io;
use std::path::PathBuf;
use tracing::{error, info, info_span, warn};

use crate::constants::UPGRADE_CONFIRM_COMMAND;
use crate::upgrade::backend::{
    FeedBackend, InstallActionWrapper, InstallerRunner, ProcessLauncher, SystemProcessLauncher,
};
use crate::upgrade::error::{QueryFailureKind, UpgradeError};
use crate::upgrade::platform::{
    CurrentProcessLocator, NativePlatformStrategy, PlatformStrategy, ProcessLocator,
    UpgradeDirectories,
};
use crate::upgrade::staging::{DirectoryCopier, RecursiveCopier, StagingError};
use crate::upgrade::state::{
    UpgradeFlags, UpgradeInstanceId, UpgradePhase, UpgradeState, parse_installed_version,
};

/// Host capabilities the orchestrator calls into.
pub struct HostServices {
    /// Prepares the scratch directories
    pub platform: Box<dyn PlatformStrategy>,
    /// Copies the running installation into the staging directory
    pub copier: Box<dyn DirectoryCopier>,
    /// Finds the directory of the running executable
    pub locator: Box<dyn ProcessLocator>,
    /// Spawns installer processes
    pub launcher: Box<dyn ProcessLauncher>,
    /// Where downloads and the staged copy live
    pub directories: UpgradeDirectories,
}

impl HostServices {
    /// Real implementations for the current host.
    #[must_use]
    pub fn native(directories: UpgradeDirectories) -> Self {
        Self {
            platform: Box::new(NativePlatformStrategy::new(directories.clone())),
            copier: Box::new(RecursiveCopier::new()),
            locator: Box::new(CurrentProcessLocator),
            launcher: Box::new(SystemProcessLauncher),
            directories,
        }
    }
}

/// Result of the version query phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    /// A newer version is published.
    UpdateAvailable {
        /// The version that would be installed
        newest: Version,
    },
    /// The installed version is current.
    UpToDate {
        /// The running version
        installed: Version,
    },
}

/// Result of a complete pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// Nothing newer was available.
    UpToDate {
        /// The running version
        installed: Version,
    },
    /// The new version was installed.
    Upgraded {
        /// Version before the upgrade
        from: Version,
        /// Version after the upgrade
        to: Version,
        /// Path of the staged upgrader executable
        upgrader_path: PathBuf,
        /// Set when scratch files could not be removed
        cleanup_warning: Option<String>,
    },
}

/// Drives one upgrade attempt.
pub struct UpgradeOrchestrator {
    installed_version: Version,
    instance_id: UpgradeInstanceId,
    flags: UpgradeFlags,
    anonymous_only: bool,
    backend: Box<dyn FeedBackend>,
    host: HostServices,
    state: UpgradeState,
    newest: Option<Version>,
    upgrader_path: Option<PathBuf>,
}

impl fmt::Debug for UpgradeOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeOrchestrator")
            .field("installed_version", &self.installed_version)
            .field("instance_id", &self.instance_id)
            .field("flags", &self.flags)
            .field("backend", &self.backend.name())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl UpgradeOrchestrator {
    /// Bind `backend` to a new upgrade attempt.
    ///
    /// # Errors
    ///
    /// [`UpgradeError::InvalidInstalledVersion`] if `installed_version` does
    /// not parse.
    pub fn new(
        installed_version: &str,
        backend: Box<dyn FeedBackend>,
        host: HostServices,
        flags: UpgradeFlags,
    ) -> Result<Self, UpgradeError> {
        let installed_version = parse_installed_version(installed_version)?;
        Ok(Self::with_version(installed_version, backend, host, flags))
    }

    /// Bind `backend` to a new upgrade attempt for an already parsed version.
    ///
    /// Pass the same [`Version`] that went into the backend's
    /// [`FeedEnvironment`](crate::upgrade::feed::FeedEnvironment) so both
    /// compare against one installed version.
    #[must_use]
    pub fn with_version(
        installed_version: Version,
        backend: Box<dyn FeedBackend>,
        host: HostServices,
        flags: UpgradeFlags,
    ) -> Self {
        let instance_id = UpgradeInstanceId::generate();

        if flags.no_verify {
            warn!(
                upgrade_id = %instance_id,
                "Integrity verification is disabled (--no-verify); downloads and installers will not be checked"
            );
        }
        info!(
            upgrade_id = %instance_id,
            backend = backend.name(),
            dry_run = flags.dry_run,
            "Starting upgrade from {}",
            installed_version
        );

        Self {
            installed_version,
            instance_id,
            flags,
            anonymous_only: false,
            backend,
            host,
            state: UpgradeState::At(UpgradePhase::Idle),
            newest: None,
            upgrader_path: None,
        }
    }

    /// Require the version query to work without credentials.
    #[must_use]
    pub const fn anonymous_only(mut self, anonymous_only: bool) -> Self {
        self.anonymous_only = anonymous_only;
        self
    }

    /// The running version.
    #[must_use]
    pub const fn installed_version(&self) -> &Version {
        &self.installed_version
    }

    /// Correlation id tagging this attempt's log records.
    #[must_use]
    pub const fn instance_id(&self) -> &UpgradeInstanceId {
        &self.instance_id
    }

    /// Flags fixed at construction.
    #[must_use]
    pub const fn flags(&self) -> UpgradeFlags {
        self.flags
    }

    /// Current pipeline state.
    #[must_use]
    pub const fn state(&self) -> &UpgradeState {
        &self.state
    }

    /// Name of the bound backend.
    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Ask the backend whether an upgrade is permitted.
    pub fn check_upgrade_allowed(&mut self) -> Result<(), UpgradeError> {
        self.begin(UpgradePhase::AllowanceChecked)?;
        let result = self.backend.upgrade_allowed();
        if let Err(e) = &result {
            info!(upgrade_id = %self.instance_id, "Upgrade not allowed: {}", e);
        }
        self.finish(UpgradePhase::AllowanceChecked, result)
    }

    /// Query the newest version and compare it with the installed one.
    ///
    /// When nothing newer exists the pipeline moves straight to `Done`.
    pub fn query_newest_version(&mut self) -> Result<VersionCheck, UpgradeError> {
        self.begin(UpgradePhase::VersionQueried)?;

        if self.anonymous_only && !self.backend.supports_anonymous_version_query() {
            let err = UpgradeError::query(
                QueryFailureKind::Authentication,
                format!("The {} requires credentials to query for new versions", self.backend.name()),
            );
            return self.finish(UpgradePhase::VersionQueried, Err(err));
        }

        let result = self.backend.query_newest_version();
        match self.finish(UpgradePhase::VersionQueried, result)? {
            Some(newest) if newest > self.installed_version => {
                info!(upgrade_id = %self.instance_id, "New version {} is available", newest);
                self.newest = Some(newest.clone());
                Ok(VersionCheck::UpdateAvailable {
                    newest,
                })
            }
            _ => {
                info!(upgrade_id = %self.instance_id, "{} is the newest version", self.installed_version);
                self.state = UpgradeState::At(UpgradePhase::Done);
                Ok(VersionCheck::UpToDate {
                    installed: self.installed_version.clone(),
                })
            }
        }
    }

    /// Allowance check and version query, the non-mutating half of the pipeline.
    pub fn check(&mut self) -> Result<VersionCheck, UpgradeError> {
        self.check_upgrade_allowed()?;
        self.query_newest_version()
    }

    /// Download the newest version into a freshly prepared download directory.
    pub fn download_newest_version(&mut self) -> Result<(), UpgradeError> {
        self.begin(UpgradePhase::Downloaded)?;
        if self.flags.no_verify {
            warn!(upgrade_id = %self.instance_id, "Downloading without checksum verification");
        }

        if self.flags.dry_run {
            info!("Dry run: would prepare {}", self.host.directories.download.display());
        } else if let Err(e) = self.host.platform.prepare_download_directory() {
            self.trace_exception(&e, "download_newest_version", "Failed to prepare the download directory");
            let err = UpgradeError::download(format!(
                "Could not prepare {}: {e}",
                self.host.directories.download.display()
            ));
            return self.finish(UpgradePhase::Downloaded, Err(err));
        }

        let result = self.backend.download_newest_version();
        self.finish(UpgradePhase::Downloaded, result)
    }

    /// Copy the running installation into the staging directory.
    ///
    /// Returns the path of the staged upgrader executable.
    pub fn setup_upgrade_application_directory(&mut self) -> Result<PathBuf, UpgradeError> {
        self.begin(UpgradePhase::StagingPrepared)?;
        let result = self.stage();
        if let Ok(path) = &result {
            self.upgrader_path = Some(path.clone());
        }
        self.finish(UpgradePhase::StagingPrepared, result)
    }

    fn stage(&self) -> Result<PathBuf, UpgradeError> {
        const METHOD: &str = "setup_upgrade_application_directory";
        let target = &self.host.directories.application;
        let upgrader_path = target.join(self.host.platform.upgrader_executable_name());

        let current = self.host.locator.current_process_directory().map_err(|e| {
            self.trace_exception(&e, METHOD, "Could not locate the running executable");
            UpgradeError::IoFailure {
                message: format!("Could not locate the running executable - {e}"),
            }
        })?;

        if self.flags.dry_run {
            info!("Dry run: would copy {} to {}", current.display(), target.display());
            return Ok(upgrader_path);
        }

        self.host.platform.prepare_application_directory().map_err(|e| {
            self.trace_exception(&e, METHOD, &format!("Could not prepare {}", target.display()));
            if e.kind() == io::ErrorKind::PermissionDenied {
                self.permission_denied(&e)
            } else {
                UpgradeError::IoFailure {
                    message: format!("Could not prepare {} - {e}", target.display()),
                }
            }
        })?;

        match self.host.copier.copy(&current, target) {
            Ok(summary) => {
                info!(
                    upgrade_id = %self.instance_id,
                    "Staged {} files from {} to {}",
                    summary.files,
                    current.display(),
                    target.display()
                );
                Ok(upgrader_path)
            }
            Err(e @ StagingError::PermissionDenied { .. }) => {
                self.trace_exception(&e, METHOD, &format!("Access denied copying {} to {}.", current.display(), target.display()));
                Err(self.permission_denied(&e))
            }
            Err(e @ StagingError::Io { .. }) => {
                self.trace_exception(&e, METHOD, &format!("Error copying {} to {}.", current.display(), target.display()));
                Err(UpgradeError::IoFailure {
                    message: format!("File copy error - {e}"),
                })
            }
        }
    }

    fn permission_denied(&self, cause: &dyn fmt::Display) -> UpgradeError {
        let directory = self.host.directories.application.clone();
        let message = format!(
            "File copy error - {cause}\nMake sure you have write permissions to directory {} and run {UPGRADE_CONFIRM_COMMAND} again.",
            directory.display()
        );
        UpgradeError::PermissionDenied {
            directory,
            message,
        }
    }

    /// Run the installer steps, bracketing each with `wrapper`.
    pub fn run_installer(&mut self, wrapper: &mut dyn InstallActionWrapper) -> Result<(), UpgradeError> {
        self.begin(UpgradePhase::InstallerRun)?;
        if self.flags.no_verify {
            warn!(upgrade_id = %self.instance_id, "Running installers without checksum verification");
        }

        let mut runner = InstallerRunner::new(
            wrapper,
            self.host.launcher.as_ref(),
            self.flags.dry_run,
            self.instance_id.as_str(),
        );
        let result = self.backend.run_installer(&mut runner);
        if let Err(e) = &result {
            error!(upgrade_id = %self.instance_id, method = "run_installer", "{}", e);
        }
        self.finish(UpgradePhase::InstallerRun, result)
    }

    /// Remove download artifacts.
    ///
    /// A failure is returned to the caller but still advances the pipeline.
    pub fn cleanup(&mut self) -> Result<(), UpgradeError> {
        self.begin(UpgradePhase::CleanedUp)?;
        let result = self.backend.cleanup();
        if let Err(e) = &result {
            warn!(upgrade_id = %self.instance_id, "{}", e);
        }
        self.finish(UpgradePhase::CleanedUp, result)
    }

    /// Run every phase in order.
    pub fn run(&mut self, wrapper: &mut dyn InstallActionWrapper) -> Result<UpgradeOutcome, UpgradeError> {
        let span = info_span!("upgrade", id = %self.instance_id);
        let _enter = span.enter();

        self.check_upgrade_allowed()?;
        let newest = match self.query_newest_version()? {
            VersionCheck::UpToDate {
                installed,
            } => {
                return Ok(UpgradeOutcome::UpToDate {
                    installed,
                });
            }
            VersionCheck::UpdateAvailable {
                newest,
            } => newest,
        };

        self.download_newest_version()?;
        let upgrader_path = self.setup_upgrade_application_directory()?;
        self.run_installer(wrapper)?;
        let cleanup_warning = self.cleanup().err().map(|e| e.to_string());

        self.state = UpgradeState::At(UpgradePhase::Done);
        info!(upgrade_id = %self.instance_id, "Upgraded from {} to {}", self.installed_version, newest);

        Ok(UpgradeOutcome::Upgraded {
            from: self.installed_version.clone(),
            to: newest,
            upgrader_path,
            cleanup_warning,
        })
    }

    /// Version selected by the query phase, if any.
    #[must_use]
    pub const fn newest_version(&self) -> Option<&Version> {
        self.newest.as_ref()
    }

    /// Staged upgrader path, once staging succeeded.
    #[must_use]
    pub fn upgrader_path(&self) -> Option<&std::path::Path> {
        self.upgrader_path.as_deref()
    }

    /// Emit a structured error record for a caught failure.
    pub fn trace_exception(&self, exception: &dyn fmt::Debug, method: &str, message: &str) {
        error!(
            upgrade_id = %self.instance_id,
            method,
            exception = ?exception,
            "{}",
            message
        );
    }

    fn begin(&self, phase: UpgradePhase) -> Result<(), UpgradeError> {
        match &self.state {
            UpgradeState::At(current) if Some(*current) == phase.predecessor() => Ok(()),
            state => Err(UpgradeError::OutOfOrder {
                attempted: phase,
                state: state.to_string(),
            }),
        }
    }

    fn finish<T>(&mut self, phase: UpgradePhase, result: Result<T, UpgradeError>) -> Result<T, UpgradeError> {
        self.state = match &result {
            Err(e) if e.is_fatal() => UpgradeState::Failed {
                phase,
                message: e.to_string(),
            },
            _ => UpgradeState::At(phase),
        };
        result
    }
}
