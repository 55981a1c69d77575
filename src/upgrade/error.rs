//! Error taxonomy for the upgrade pipeline.
//!
//! Every phase of [`UpgradeOrchestrator`](crate::upgrade::UpgradeOrchestrator)
//! returns `Result<T, UpgradeError>`. Expected failures (nothing configured,
//! upgrade not allowed, feed unreachable) are ordinary variants rather than
//! panics, and only a malformed installed version aborts construction.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::upgrade::state::UpgradePhase;

/// Exact message returned when neither a feed URL nor a package name is configured.
pub const CONFIGURATION_MISSING_MESSAGE: &str = "Custom upgrade feed is not configured";

/// Classification of a failed version query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFailureKind {
    /// The feed rejected the request or needs credentials we do not have.
    Authentication,
    /// The feed could not be reached or answered with a server error.
    Network,
    /// The feed answered, but the payload could not be understood.
    InvalidResponse,
}

impl fmt::Display for QueryFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Authentication => "authentication",
            Self::Network => "network",
            Self::InvalidResponse => "invalid response",
        };
        f.write_str(label)
    }
}

/// Failure of one upgrade phase.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpgradeError {
    /// No upgrade feed is configured. A legitimate "nothing to do" outcome.
    #[error("{}", CONFIGURATION_MISSING_MESSAGE)]
    ConfigurationMissing,

    /// The configuration store itself could not be read.
    #[error("{message}")]
    ConfigurationRead {
        /// Message reported by the configuration store
        message: String,
    },

    /// The selected feed backend could not be constructed.
    #[error("{message}")]
    BackendConstructionFailed {
        /// Selector context followed by the backend's own reason
        message: String,
    },

    /// The backend does not permit an upgrade right now.
    #[error("{message}")]
    AllowanceDenied {
        /// Why the upgrade is not allowed
        message: String,
    },

    /// The newest version could not be determined.
    #[error("Failed to query the newest version ({kind}): {message}")]
    VersionQueryFailed {
        /// Authentication or network class of the failure
        kind: QueryFailureKind,
        /// Underlying reason
        message: String,
    },

    /// Fetching the release payload failed.
    #[error("Failed to download the newest version: {message}")]
    DownloadFailed {
        /// Underlying reason
        message: String,
    },

    /// Staging was denied write access to a directory.
    #[error("{message}")]
    PermissionDenied {
        /// Directory the user needs write access to
        directory: PathBuf,
        /// Actionable message naming the directory and the retry command
        message: String,
    },

    /// Staging failed for any other I/O reason.
    #[error("{message}")]
    IoFailure {
        /// Short user-facing message
        message: String,
    },

    /// An installer could not be spawned or exited unsuccessfully.
    #[error("Installer '{name}' failed: {message}")]
    InstallerFailed {
        /// Name of the installer step
        name: String,
        /// Exit code and captured error output, or the spawn error
        message: String,
    },

    /// Removing scratch artifacts failed. Never invalidates a finished install.
    #[error("Cleanup failed: {message}")]
    CleanupFailed {
        /// Underlying reason
        message: String,
    },

    /// The running tool reported a version that does not parse.
    #[error("Invalid installed version '{version}': {reason}")]
    InvalidInstalledVersion {
        /// The version string as reported
        version: String,
        /// Parser error
        reason: String,
    },

    /// A phase was invoked before its predecessor completed, or after a failure.
    #[error("Cannot enter phase {attempted} while upgrade is {state}")]
    OutOfOrder {
        /// Phase that was requested
        attempted: UpgradePhase,
        /// Description of the current state
        state: String,
    },
}

impl UpgradeError {
    /// Whether this error stops the pipeline.
    ///
    /// Only [`UpgradeError::CleanupFailed`] is non-fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::CleanupFailed { .. })
    }

    /// Whether this is the "no feed configured" outcome.
    #[must_use]
    pub const fn is_configuration_missing(&self) -> bool {
        matches!(self, Self::ConfigurationMissing)
    }

    /// Whether this is an authentication-class version query failure.
    #[must_use]
    pub const fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::VersionQueryFailed {
                kind: QueryFailureKind::Authentication,
                ..
            }
        )
    }

    pub(crate) fn query(kind: QueryFailureKind, message: impl Into<String>) -> Self {
        Self::VersionQueryFailed {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn download(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    pub(crate) fn cleanup(message: impl Into<String>) -> Self {
        Self::CleanupFailed {
            message: message.into(),
        }
    }
}
