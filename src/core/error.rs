//! Error handling for hoist
//!
//! Two layers:
//! - [`HoistError`] - typed failures of the CLI surface, wrapping
//!   [`UpgradeError`] for anything the upgrade pipeline reports
//! - [`ErrorContext`] - a [`HoistError`] plus optional details and an
//!   actionable suggestion, printed in color by `main`
//!
//! Use [`user_friendly_error`] to turn any `anyhow::Error` raised by a
//! command into an [`ErrorContext`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use hoist_cli::core::{HoistError, ErrorContext, user_friendly_error};
//! use hoist_cli::upgrade::UpgradeError;
//!
//! let err = anyhow::Error::from(UpgradeError::ConfigurationMissing);
//! let ctx = user_friendly_error(err);
//! ctx.display();
//!
//! let ctx = ErrorContext::new(HoistError::ConfigError {
//!     message: "bad key".to_string(),
//! })
//! .with_suggestion("Use a dotted key such as 'upgrade.feedurl'");
//! eprintln!("{ctx}");
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::constants::{CONFIG_PATH_ENV, FEED_TOKEN_ENV, UPGRADE_CONFIRM_COMMAND, config_keys};
use crate::upgrade::{QueryFailureKind, UpgradeError};

/// Failures surfaced by the hoist command line.
#[derive(Error, Debug, Clone)]
pub enum HoistError {
    /// The configuration file or a key in it is unusable.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong
        message: String,
    },

    /// The OS refused access to a file outside the upgrade pipeline.
    #[error("IO error: {0}")]
    IoError(String),

    /// The config file is not valid TOML.
    #[error("Invalid config file: {0}")]
    TomlError(String),

    /// A phase of the upgrade pipeline failed.
    #[error(transparent)]
    Upgrade(#[from] UpgradeError),

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Full message including the cause chain
        message: String,
    },
}

/// An error with optional details and a suggestion for the user.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: HoistError,
    /// What the user can do about it
    pub suggestion: Option<String>,
    /// Background on why it happened
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap `error` without details or suggestion.
    #[must_use]
    pub const fn new(error: HoistError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions.
///
/// Recognizes [`UpgradeError`] and [`HoistError`] anywhere in the chain, then
/// I/O and TOML errors. Anything else keeps its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(upgrade_error) = error.chain().find_map(|e| e.downcast_ref::<UpgradeError>()) {
        return create_upgrade_context(upgrade_error.clone());
    }

    if let Some(hoist_error) = error.downcast_ref::<HoistError>() {
        if let HoistError::Upgrade(inner) = hoist_error {
            return create_upgrade_context(inner.clone());
        }
        return ErrorContext::new(hoist_error.clone());
    }

    if let Some(io_error) = error.chain().find_map(|e| e.downcast_ref::<std::io::Error>())
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(HoistError::IoError(format!("{error:#}")))
            .with_suggestion("Check the ownership and permissions of the hoist data directories")
            .with_details("hoist could not read or write a file it needs");
    }

    if let Some(toml_error) = error.chain().find_map(|e| e.downcast_ref::<toml::de::Error>()) {
        return ErrorContext::new(HoistError::TomlError(toml_error.to_string()))
            .with_suggestion(format!(
                "Fix the syntax of your config file or point {CONFIG_PATH_ENV} at a valid one"
            ));
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(HoistError::Other {
        message,
    })
}

fn create_upgrade_context(error: UpgradeError) -> ErrorContext {
    match &error {
        UpgradeError::ConfigurationMissing => ErrorContext::new(error.into()).with_suggestion(
            format!(
                "Run 'hoist config set {} <url>' and 'hoist config set {} <name>'",
                config_keys::UPGRADE_FEED_URL,
                config_keys::UPGRADE_FEED_PACKAGE_NAME
            ),
        ),
        UpgradeError::ConfigurationRead { .. } => ErrorContext::new(error.into())
            .with_suggestion("Check that your hoist config file is readable and valid TOML"),
        UpgradeError::VersionQueryFailed {
            kind: QueryFailureKind::Authentication,
            ..
        } => ErrorContext::new(error.into())
            .with_suggestion(format!("Set {FEED_TOKEN_ENV} to a token with read access to the feed"))
            .with_details("The package feed rejected the request credentials"),
        UpgradeError::VersionQueryFailed { .. } | UpgradeError::DownloadFailed { .. } => {
            ErrorContext::new(error.into())
                .with_suggestion("Check your network connection and the configured feed URL")
        }
        UpgradeError::PermissionDenied { .. } => ErrorContext::new(error.into()).with_details(
            "Staging copies the running installation before handing off to the upgrader",
        ),
        UpgradeError::OutOfOrder { .. } => ErrorContext::new(error.into())
            .with_suggestion(format!("Start a fresh upgrade with '{UPGRADE_CONFIRM_COMMAND}'")),
        _ => ErrorContext::new(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_display() {
        let error = HoistError::ConfigError {
            message: "bad key".to_string(),
        };
        assert_eq!(error.to_string(), "Configuration error: bad key");

        let error = HoistError::from(UpgradeError::ConfigurationMissing);
        assert_eq!(error.to_string(), "Custom upgrade feed is not configured");
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(HoistError::IoError("disk full".to_string()))
            .with_details("while saving")
            .with_suggestion("free some space");

        let display = format!("{ctx}");
        assert!(display.contains("IO error: disk full"));
        assert!(display.contains("Details: while saving"));
        assert!(display.contains("Suggestion: free some space"));
    }

    #[test]
    fn test_missing_configuration_suggests_config_set() {
        let ctx = user_friendly_error(anyhow::Error::from(UpgradeError::ConfigurationMissing));
        assert!(matches!(ctx.error, HoistError::Upgrade(UpgradeError::ConfigurationMissing)));
        assert!(ctx.suggestion.unwrap().contains("upgrade.feedurl"));
    }

    #[test]
    fn test_upgrade_error_found_behind_context() {
        let err = anyhow::Error::from(UpgradeError::query(QueryFailureKind::Authentication, "401"))
            .context("upgrade failed");
        let ctx = user_friendly_error(err);
        assert!(matches!(ctx.error, HoistError::Upgrade(_)));
        assert!(ctx.suggestion.unwrap().contains(FEED_TOKEN_ENV));
    }

    #[test]
    fn test_permission_denied_keeps_message() {
        let err = UpgradeError::PermissionDenied {
            directory: PathBuf::from("/opt/hoist"),
            message: "File copy error - denied".to_string(),
        };
        let ctx = user_friendly_error(anyhow::Error::from(err));
        assert_eq!(ctx.error.to_string(), "File copy error - denied");
        assert!(ctx.details.is_some());
    }

    #[test]
    fn test_io_permission_denied_behind_context() {
        let err = anyhow::Error::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ))
        .context("Failed to write config to /etc/hoist/config.toml");
        let ctx = user_friendly_error(err);

        assert!(matches!(ctx.error, HoistError::IoError(_)));
        assert_eq!(
            ctx.error.to_string(),
            "IO error: Failed to write config to /etc/hoist/config.toml: denied"
        );
        assert!(ctx.suggestion.unwrap().contains("permissions"));
    }

    #[test]
    fn test_invalid_config_file_suggests_fix() {
        let parse_error = toml::from_str::<toml::Table>("[upgrade\nfeedurl = ").unwrap_err();
        let err = anyhow::Error::from(parse_error).context("Failed to parse config from config.toml");
        let ctx = user_friendly_error(err);

        assert!(matches!(ctx.error, HoistError::TomlError(_)));
        assert!(ctx.error.to_string().starts_with("Invalid config file: "));
        assert!(ctx.suggestion.unwrap().contains(CONFIG_PATH_ENV));
    }

    #[test]
    fn test_generic_error_keeps_chain() {
        let err = anyhow::anyhow!("root cause").context("outer");
        let ctx = user_friendly_error(err);
        let text = ctx.error.to_string();
        assert!(text.starts_with("outer"));
        assert!(text.contains("1: root cause"));
    }
}
