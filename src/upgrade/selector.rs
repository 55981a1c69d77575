//! Chooses the one feed backend an upgrade attempt will use.
//!
//! Selection reads the configuration once and looks only at which keys are
//! present (see [`UpgradeConfig`]). Exactly one backend constructor runs;
//! if it fails there is no fallback to the other variant.

use anyhow::Result;
use tracing::{debug, error, warn};

use crate::config::ConfigStore;
use crate::upgrade::backend::FeedBackend;
use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::credentials::CredentialStore;
use crate::upgrade::error::UpgradeError;
use crate::upgrade::feed::{DirectFeedBackend, FeedEnvironment, OrganizationFeedBackend};

const SELECT_METHOD: &str = "select_backend";

/// Constructs the two backend variants.
pub trait BackendFactory {
    /// Build the organization-resolved backend.
    fn create_organization(
        &self,
        config: &UpgradeConfig,
        env: FeedEnvironment,
        credentials: &dyn CredentialStore,
    ) -> Result<Box<dyn FeedBackend>>;

    /// Build the direct feed backend.
    fn create_direct(
        &self,
        config: &UpgradeConfig,
        env: FeedEnvironment,
        credentials: &dyn CredentialStore,
    ) -> Result<Box<dyn FeedBackend>>;
}

/// Factory for the shipped feed backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn create_organization(
        &self,
        config: &UpgradeConfig,
        env: FeedEnvironment,
        credentials: &dyn CredentialStore,
    ) -> Result<Box<dyn FeedBackend>> {
        let credential = credentials.credential_for(config.feed_url().unwrap_or_default())?;
        Ok(Box::new(OrganizationFeedBackend::new(config, env, credential)?))
    }

    fn create_direct(
        &self,
        config: &UpgradeConfig,
        env: FeedEnvironment,
        credentials: &dyn CredentialStore,
    ) -> Result<Box<dyn FeedBackend>> {
        let credential = credentials.credential_for(config.feed_url().unwrap_or_default())?;
        Ok(Box::new(DirectFeedBackend::new(config, env, credential)?))
    }
}

/// Picks and builds the feed backend for one upgrade attempt.
///
/// # Examples
///
/// ```rust,no_run
/// use hoist_cli::config::LocalConfig;
/// use hoist_cli::upgrade::credentials::EnvCredentialStore;
/// use hoist_cli::upgrade::feed::FeedEnvironment;
/// use hoist_cli::upgrade::platform::UpgradeDirectories;
/// use hoist_cli::upgrade::{BackendSelector, UpgradeFlags};
///
/// # fn example() -> anyhow::Result<()> {
/// let config = LocalConfig::load()?;
/// let selector = BackendSelector::new(&config, &EnvCredentialStore);
/// let backend = selector.select(FeedEnvironment {
///     installed_version: semver::Version::new(1, 0, 0),
///     directories: UpgradeDirectories::from_environment()?,
///     flags: UpgradeFlags::new(),
/// })?;
/// println!("Using the {}", backend.name());
/// # Ok(())
/// # }
/// ```
pub struct BackendSelector<'a> {
    config_store: &'a dyn ConfigStore,
    credentials: &'a dyn CredentialStore,
    factory: &'a dyn BackendFactory,
}

impl<'a> BackendSelector<'a> {
    /// Selector building the shipped backends.
    pub fn new(config_store: &'a dyn ConfigStore, credentials: &'a dyn CredentialStore) -> Self {
        Self {
            config_store,
            credentials,
            factory: &DefaultBackendFactory,
        }
    }

    /// Replace the backend factory.
    #[must_use]
    pub fn with_factory(mut self, factory: &'a dyn BackendFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Read the configuration and build exactly one backend.
    ///
    /// # Errors
    ///
    /// - [`UpgradeError::ConfigurationRead`] when the store cannot be read
    /// - [`UpgradeError::ConfigurationMissing`] when neither `upgrade.feedurl`
    ///   nor `upgrade.feedpackagename` is set
    /// - [`UpgradeError::BackendConstructionFailed`] when the chosen backend
    ///   cannot be built
    pub fn select(&self, env: FeedEnvironment) -> Result<Box<dyn FeedBackend>, UpgradeError> {
        let entries = self.config_store.all_entries().map_err(|e| UpgradeError::ConfigurationRead {
            message: format!("{e:#}"),
        })?;
        let config = UpgradeConfig::new(entries);

        if !config.is_feed_configured() {
            let err = UpgradeError::ConfigurationMissing;
            warn!("{}", err);
            return Err(err);
        }

        let (kind, built) = if config.uses_organization_server() {
            ("organization", self.factory.create_organization(&config, env, self.credentials))
        } else {
            ("NuGet", self.factory.create_direct(&config, env, self.credentials))
        };

        match built {
            Ok(backend) => {
                debug!("Selected the {} backend", backend.name());
                Ok(backend)
            }
            Err(e) => {
                let message = format!("{SELECT_METHOD}: Could not create {kind} based upgrader. {e:#}");
                error!("{}", message);
                Err(UpgradeError::BackendConstructionFailed {
                    message,
                })
            }
        }
    }
}
