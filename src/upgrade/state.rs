//! Pipeline state, flags and identifiers for one upgrade attempt.

use chrono::Local;
use semver::Version;
use std::fmt;

use crate::upgrade::error::UpgradeError;

/// Phases of the upgrade pipeline, in the only order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpgradePhase {
    /// Nothing has run yet.
    Idle,
    /// The backend agreed that an upgrade is permitted.
    AllowanceChecked,
    /// The newest version is known and newer than the installed one.
    VersionQueried,
    /// The release payload is in the download directory.
    Downloaded,
    /// The running installation has been copied to the staging directory.
    StagingPrepared,
    /// Every installer step completed.
    InstallerRun,
    /// Scratch artifacts were removed (or removal was reported).
    CleanedUp,
    /// The pipeline finished.
    Done,
}

impl UpgradePhase {
    /// The phase that must have completed before this one may start.
    #[must_use]
    pub const fn predecessor(self) -> Option<Self> {
        match self {
            Self::Idle => None,
            Self::AllowanceChecked => Some(Self::Idle),
            Self::VersionQueried => Some(Self::AllowanceChecked),
            Self::Downloaded => Some(Self::VersionQueried),
            Self::StagingPrepared => Some(Self::Downloaded),
            Self::InstallerRun => Some(Self::StagingPrepared),
            Self::CleanedUp => Some(Self::InstallerRun),
            Self::Done => Some(Self::CleanedUp),
        }
    }
}

impl fmt::Display for UpgradePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::AllowanceChecked => "AllowanceChecked",
            Self::VersionQueried => "VersionQueried",
            Self::Downloaded => "Downloaded",
            Self::StagingPrepared => "StagingPrepared",
            Self::InstallerRun => "InstallerRun",
            Self::CleanedUp => "CleanedUp",
            Self::Done => "Done",
        };
        f.write_str(name)
    }
}

/// Where an orchestrator currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeState {
    /// The last phase that completed successfully.
    At(UpgradePhase),
    /// A phase failed; no further phase will run.
    Failed {
        /// The phase that failed
        phase: UpgradePhase,
        /// User-facing failure message
        message: String,
    },
}

impl UpgradeState {
    /// Whether the pipeline can make no further progress.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::At(UpgradePhase::Done) | Self::Failed { .. })
    }
}

impl fmt::Display for UpgradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(phase) => write!(f, "at {phase}"),
            Self::Failed {
                phase,
                message,
            } => write!(f, "failed in {phase}: {message}"),
        }
    }
}

/// Behavior switches fixed for the lifetime of an orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpgradeFlags {
    /// Report every mutating action instead of performing it.
    pub dry_run: bool,
    /// Skip integrity verification of downloads and installers.
    pub no_verify: bool,
}

impl UpgradeFlags {
    /// Flags for a real, verified upgrade.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dry_run: false,
            no_verify: false,
        }
    }

    /// Set dry-run mode.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set whether verification is skipped.
    #[must_use]
    pub const fn no_verify(mut self, no_verify: bool) -> Self {
        self.no_verify = no_verify;
        self
    }
}

/// Correlation token tagging every log record of one upgrade attempt.
///
/// Formatted as `YYYYMMDD_HHMMSS_xxxxxxxx`: the local timestamp followed by
/// eight hex digits of a random UUID so that instances created within the
/// same second stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpgradeInstanceId(String);

impl UpgradeInstanceId {
    /// Generate a fresh id from the current time.
    #[must_use]
    pub fn generate() -> Self {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{timestamp}_{}", &random[..8]))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UpgradeInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a release version as published by a feed or reported by the tool.
///
/// Accepts an optional leading `v` and four-component versions
/// (`1.2.3.4` becomes `1.2.3+4`), which release feeds commonly use.
pub fn parse_version(raw: &str) -> Result<Version, semver::Error> {
    let trimmed = raw.trim();
    let text = trimmed.strip_prefix('v').unwrap_or(trimmed);

    if let Ok(version) = Version::parse(text) {
        return Ok(version);
    }

    let parts: Vec<&str> = text.split('.').collect();
    if parts.len() == 4 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())) {
        return Version::parse(&format!("{}.{}.{}+{}", parts[0], parts[1], parts[2], parts[3]));
    }

    Version::parse(text)
}

/// Parse the installed version, mapping failure into the upgrade taxonomy.
pub(crate) fn parse_installed_version(raw: &str) -> Result<Version, UpgradeError> {
    parse_version(raw).map_err(|e| UpgradeError::InvalidInstalledVersion {
        version: raw.to_string(),
        reason: e.to_string(),
    })
}
