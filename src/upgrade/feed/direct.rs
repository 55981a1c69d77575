//! Backend reading a NuGet v3 flat-container feed.
//!
//! Layout relative to `upgrade.feedurl`:
//!
//! | Resource          | Path                                     |
//! |-------------------|------------------------------------------|
//! | version list      | `{id}/index.json`                        |
//! | package           | `{id}/{version}/{id}.{version}.nupkg`    |
//! | package checksum  | `{id}/{version}/{id}.{version}.nupkg.sha256` |
//!
//! `{id}` and `{version}` are lower-cased, as the flat container requires.

use anyhow::{Context, anyhow};
use semver::Version;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::manifest::{InstallManifest, current_platform};
use super::{FeedClient, FeedEnvironment, PublishedVersion};
use crate::constants::{INSTALL_MANIFEST_PATH, NONE_RING};
use crate::upgrade::backend::{FeedBackend, InstallerRunner};
use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::credentials::Credential;
use crate::upgrade::error::{QueryFailureKind, UpgradeError};
use crate::upgrade::verification::ChecksumVerifier;

#[derive(Debug, Deserialize)]
struct VersionIndex {
    #[serde(default)]
    versions: Vec<String>,
}

/// The "direct feed" backend.
#[derive(Debug)]
pub struct DirectFeedBackend {
    feed_url: String,
    package_id: String,
    ring: String,
    env: FeedEnvironment,
    client: FeedClient,
    pinned: Option<PublishedVersion>,
    newest: Option<PublishedVersion>,
    package_dir: Option<PathBuf>,
}

impl DirectFeedBackend {
    /// Build the backend from `upgrade.feedurl` and `upgrade.feedpackagename`.
    ///
    /// Fails when either key is missing or the URL does not parse.
    pub fn new(
        config: &UpgradeConfig,
        env: FeedEnvironment,
        credential: Option<Credential>,
    ) -> anyhow::Result<Self> {
        let feed_url = config
            .feed_url()
            .ok_or_else(|| anyhow!("Upgrade feed URL (upgrade.feedurl) is not configured"))?;
        let package_id = config.package_name().ok_or_else(|| {
            anyhow!("Upgrade package name (upgrade.feedpackagename) is not configured")
        })?;
        reqwest::Url::parse(feed_url)
            .with_context(|| format!("Invalid upgrade feed URL '{feed_url}'"))?;

        Ok(Self {
            feed_url: feed_url.trim_end_matches('/').to_string(),
            package_id: package_id.to_string(),
            ring: config.ring(),
            env,
            client: FeedClient::new(credential)?,
            pinned: None,
            newest: None,
            package_dir: None,
        })
    }

    /// Restrict the backend to one version instead of the newest on the feed.
    pub fn pin(&mut self, version: PublishedVersion) {
        self.pinned = Some(version);
    }

    /// The package identifier on the feed.
    #[must_use]
    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    fn id_lower(&self) -> String {
        self.package_id.to_lowercase()
    }

    fn index_url(&self) -> String {
        format!("{}/{}/index.json", self.feed_url, self.id_lower())
    }

    fn package_url(&self, version: &PublishedVersion) -> String {
        let id = self.id_lower();
        let ver = version.raw.to_lowercase();
        format!("{}/{id}/{ver}/{id}.{ver}.nupkg", self.feed_url)
    }

    fn package_stem(&self, version: &PublishedVersion) -> String {
        format!("{}.{}", self.id_lower(), version.raw.to_lowercase())
    }

    fn include_prereleases(&self) -> bool {
        self.ring == "fast"
    }

    fn newest_on_feed(&self) -> Result<Option<PublishedVersion>, UpgradeError> {
        let url = self.index_url();
        let index: VersionIndex =
            self.client.get_json(&url).map_err(|e| UpgradeError::query(e.query_kind(), e.to_string()))?;

        let newest = index
            .versions
            .iter()
            .filter_map(|raw| {
                let parsed = PublishedVersion::parse(raw);
                if parsed.is_none() {
                    debug!("Ignoring unparsable feed version '{}'", raw);
                }
                parsed
            })
            .filter(|v| self.include_prereleases() || v.version.pre.is_empty())
            .max_by(|a, b| a.version.cmp(&b.version));
        Ok(newest)
    }

    fn installed(&self) -> &Version {
        &self.env.installed_version
    }

    fn download_and_extract(&self, version: &PublishedVersion, extract_dir: &Path) -> anyhow::Result<()> {
        let url = self.package_url(version);
        let package_file = self.env.directories.download.join(format!("{}.nupkg", self.package_stem(version)));

        info!("Downloading {} {} from {}", self.package_id, version.raw, url);
        let bytes = self.client.get_bytes(&url)?;
        fs::create_dir_all(&self.env.directories.download)?;
        fs::write(&package_file, &bytes)
            .with_context(|| format!("Failed to write {}", package_file.display()))?;

        if self.env.flags.no_verify {
            warn!("Skipping checksum verification of {} (--no-verify)", package_file.display());
        } else {
            match self.client.get_optional_text(&format!("{url}.sha256"))? {
                Some(sidecar) => {
                    let expected = ChecksumVerifier::parse_sidecar(&sidecar)
                        .ok_or_else(|| anyhow!("Malformed checksum published for {url}"))?;
                    ChecksumVerifier::verify_checksum(&package_file, &expected)?;
                }
                None => warn!("No checksum published for {}, skipping verification", url),
            }
        }

        let file = fs::File::open(&package_file)?;
        let mut archive = zip::ZipArchive::new(file)
            .with_context(|| format!("{} is not a valid package", package_file.display()))?;
        archive
            .extract(extract_dir)
            .with_context(|| format!("Failed to extract package to {}", extract_dir.display()))?;
        debug!("Extracted {} entries to {}", archive.len(), extract_dir.display());
        Ok(())
    }
}

impl FeedBackend for DirectFeedBackend {
    fn name(&self) -> &str {
        "direct feed"
    }

    fn supports_anonymous_version_query(&self) -> bool {
        false
    }

    fn upgrade_allowed(&self) -> Result<(), UpgradeError> {
        if self.ring == NONE_RING {
            return Err(UpgradeError::AllowanceDenied {
                message: "Upgrades are disabled because upgrade.ring is set to 'none'".to_string(),
            });
        }
        Ok(())
    }

    fn query_newest_version(&mut self) -> Result<Option<Version>, UpgradeError> {
        let candidate = match &self.pinned {
            Some(pinned) => Some(pinned.clone()),
            None => self.newest_on_feed()?,
        };

        let Some(candidate) = candidate else {
            return Err(UpgradeError::query(
                QueryFailureKind::InvalidResponse,
                format!("No versions of {} are published on {}", self.package_id, self.feed_url),
            ));
        };

        if candidate.version > *self.installed() {
            let version = candidate.version.clone();
            self.newest = Some(candidate);
            Ok(Some(version))
        } else {
            debug!("Newest version {} is not newer than installed {}", candidate.version, self.installed());
            self.newest = None;
            Ok(None)
        }
    }

    fn download_newest_version(&mut self) -> Result<(), UpgradeError> {
        let version = self
            .newest
            .clone()
            .ok_or_else(|| UpgradeError::download("No newer version has been queried"))?;
        let extract_dir = self.env.directories.download.join(self.package_stem(&version));

        if self.env.flags.dry_run {
            info!(
                "Dry run: would download {} to {}",
                self.package_url(&version),
                extract_dir.display()
            );
        } else {
            self.download_and_extract(&version, &extract_dir)
                .map_err(|e| UpgradeError::download(format!("{e:#}")))?;
        }

        self.package_dir = Some(extract_dir);
        Ok(())
    }

    fn run_installer(&mut self, runner: &mut InstallerRunner<'_>) -> Result<(), UpgradeError> {
        let installer_failed = |message: String| UpgradeError::InstallerFailed {
            name: "install manifest".to_string(),
            message,
        };
        let package_dir =
            self.package_dir.clone().ok_or_else(|| installer_failed("No package has been downloaded".to_string()))?;
        let manifest_path = package_dir.join(INSTALL_MANIFEST_PATH);

        if runner.is_dry_run() && !manifest_path.exists() {
            let name = format!("installers from {}", package_dir.display());
            return runner.run_step(&name, &manifest_path, &[]);
        }

        let manifest = InstallManifest::load(&manifest_path).map_err(|e| installer_failed(format!("{e:#}")))?;
        let installers = manifest.installers_for(current_platform());
        if installers.is_empty() {
            return Err(installer_failed(format!(
                "Package declares no installers for platform '{}'",
                current_platform()
            )));
        }

        for entry in installers {
            let program = entry.resolve(&package_dir).map_err(|e| UpgradeError::InstallerFailed {
                name: entry.name.clone(),
                message: e.to_string(),
            })?;

            match (&entry.sha256, self.env.flags.no_verify) {
                (Some(_), true) => {
                    warn!("Skipping checksum verification of installer {} (--no-verify)", entry.name);
                }
                (Some(expected), false) if !runner.is_dry_run() => {
                    ChecksumVerifier::verify_checksum(&program, expected).map_err(|e| {
                        UpgradeError::InstallerFailed {
                            name: entry.name.clone(),
                            message: format!("{e:#}"),
                        }
                    })?;
                }
                _ => {}
            }

            runner.run_step(&entry.name, &program, &entry.args)?;
        }
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), UpgradeError> {
        let download = &self.env.directories.download;
        if self.env.flags.dry_run {
            info!("Dry run: would remove {}", download.display());
            return Ok(());
        }

        let entries = match fs::read_dir(download) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(UpgradeError::cleanup(format!("{}: {e}", download.display()))),
        };
        for entry in entries {
            let path = entry.map_err(|e| UpgradeError::cleanup(e.to_string()))?.path();
            let removed = if path.is_dir() { fs::remove_dir_all(&path) } else { fs::remove_file(&path) };
            removed.map_err(|e| UpgradeError::cleanup(format!("{}: {e}", path.display())))?;
        }
        self.package_dir = None;
        Ok(())
    }
}
