//! Backend whose version is chosen by an organization info server.
//!
//! The server answers `GET {server}/api/GetLatestVersion?Organization=..&Platform=..&Ring=..`
//! with `{"version": "1.2.3"}` (or `null` when nothing is approved for the
//! ring). The package itself still comes from the configured feed, so
//! download, installation and cleanup are delegated to a pinned
//! [`DirectFeedBackend`].

use anyhow::{Context, anyhow};
use reqwest::Url;
use semver::Version;
use serde::Deserialize;
use tracing::{debug, info};

use super::{DirectFeedBackend, FeedClient, FeedEnvironment, PublishedVersion};
use crate::upgrade::backend::{FeedBackend, InstallerRunner};
use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::credentials::Credential;
use crate::upgrade::error::{QueryFailureKind, UpgradeError};

#[derive(Debug, Deserialize)]
struct LatestVersionResponse {
    version: Option<String>,
}

/// The "organization-resolved feed" backend.
#[derive(Debug)]
pub struct OrganizationFeedBackend {
    organization: String,
    server_url: Url,
    ring: String,
    installed: Version,
    client: FeedClient,
    inner: DirectFeedBackend,
}

impl OrganizationFeedBackend {
    /// Build the backend.
    ///
    /// Fails when the organization cannot be derived from `upgrade.feedurl`,
    /// when `upgrade.orginfoserverurl` is not a URL, or when the inner direct
    /// feed cannot be built.
    pub fn new(
        config: &UpgradeConfig,
        env: FeedEnvironment,
        credential: Option<Credential>,
    ) -> anyhow::Result<Self> {
        let server = config
            .org_info_server_url()
            .ok_or_else(|| anyhow!("Organization info server URL is not configured"))?;
        let mut server_url = Url::parse(server)
            .with_context(|| format!("Invalid organization info server URL '{server}'"))?;
        // Keep any base path when joining the API route
        if !server_url.path().ends_with('/') {
            let base = format!("{}/", server_url.path());
            server_url.set_path(&base);
        }

        let feed_url = config
            .feed_url()
            .ok_or_else(|| anyhow!("Upgrade feed URL (upgrade.feedurl) is not configured"))?;
        let organization = organization_from_feed_url(feed_url)
            .ok_or_else(|| anyhow!("Could not determine the organization from feed URL '{feed_url}'"))?;

        let installed = env.installed_version.clone();
        let inner = DirectFeedBackend::new(config, env, credential)?;
        debug!("Resolving versions for organization '{}' via {}", organization, server_url);

        Ok(Self {
            organization,
            server_url,
            ring: config.ring(),
            installed,
            client: FeedClient::new(None)?,
            inner,
        })
    }

    /// The organization whose approved version is queried.
    #[must_use]
    pub fn organization(&self) -> &str {
        &self.organization
    }

    fn latest_version_url(&self) -> Result<Url, UpgradeError> {
        let mut url = self.server_url.join("api/GetLatestVersion").map_err(|e| {
            UpgradeError::query(QueryFailureKind::InvalidResponse, format!("{}: {e}", self.server_url))
        })?;
        url.query_pairs_mut()
            .append_pair("Organization", &self.organization)
            .append_pair("Platform", server_platform_name())
            .append_pair("Ring", &self.ring);
        Ok(url)
    }
}

impl FeedBackend for OrganizationFeedBackend {
    fn name(&self) -> &str {
        "organization feed"
    }

    fn supports_anonymous_version_query(&self) -> bool {
        true
    }

    fn upgrade_allowed(&self) -> Result<(), UpgradeError> {
        self.inner.upgrade_allowed()
    }

    fn query_newest_version(&mut self) -> Result<Option<Version>, UpgradeError> {
        let url = self.latest_version_url()?;
        let response: LatestVersionResponse = self
            .client
            .get_json(url.as_str())
            .map_err(|e| UpgradeError::query(e.query_kind(), e.to_string()))?;

        let Some(raw) = response.version else {
            info!("No version is approved for organization '{}' on ring '{}'", self.organization, self.ring);
            return Ok(None);
        };
        let published = PublishedVersion::parse(&raw).ok_or_else(|| {
            UpgradeError::query(
                QueryFailureKind::InvalidResponse,
                format!("Organization info server returned invalid version '{raw}'"),
            )
        })?;

        if published.version > self.installed {
            let version = published.version.clone();
            self.inner.pin(published);
            self.inner.query_newest_version()?;
            Ok(Some(version))
        } else {
            Ok(None)
        }
    }

    fn download_newest_version(&mut self) -> Result<(), UpgradeError> {
        self.inner.download_newest_version()
    }

    fn run_installer(&mut self, runner: &mut InstallerRunner<'_>) -> Result<(), UpgradeError> {
        self.inner.run_installer(runner)
    }

    fn cleanup(&mut self) -> Result<(), UpgradeError> {
        self.inner.cleanup()
    }
}

/// Derive the organization name from an Azure DevOps feed URL.
///
/// Recognizes `https://dev.azure.com/{org}/...`,
/// `https://pkgs.dev.azure.com/{org}/...` and
/// `https://{org}.pkgs.visualstudio.com/...` (or `{org}.visualstudio.com`).
#[must_use]
pub fn organization_from_feed_url(feed_url: &str) -> Option<String> {
    let url = Url::parse(feed_url).ok()?;
    let host = url.host_str()?.to_lowercase();

    if host == "dev.azure.com" || host == "pkgs.dev.azure.com" {
        return url
            .path_segments()?
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }

    let org = host
        .strip_suffix(".pkgs.visualstudio.com")
        .or_else(|| host.strip_suffix(".visualstudio.com"))?;
    (!org.is_empty() && !org.contains('.')).then(|| org.to_string())
}

fn server_platform_name() -> &'static str {
    match std::env::consts::OS {
        "windows" => "Windows",
        "macos" => "Mac",
        _ => "Linux",
    }
}
