//! Install manifest shipped inside a release package.
//!
//! The manifest lives at `content/install-manifest.json` and lists, per
//! operating system, the installer programs to run in order:
//!
//! ```json
//! {
//!   "platforms": {
//!     "linux": {
//!       "installers": [
//!         {
//!           "name": "hoist",
//!           "installer_relative_path": "content/install.sh",
//!           "args": ["--quiet"],
//!           "sha256": "sha256:9f86d08..."
//!         }
//!       ]
//!     }
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Parsed install manifest.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct InstallManifest {
    /// Installer lists keyed by platform name (`linux`, `macos`, `windows`)
    #[serde(default)]
    pub platforms: BTreeMap<String, PlatformInstallers>,
}

/// Installers for one platform.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PlatformInstallers {
    /// Steps, run in order
    #[serde(default)]
    pub installers: Vec<InstallerEntry>,
}

/// One installer step.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InstallerEntry {
    /// Display name of the step
    pub name: String,
    /// Program path relative to the extracted package root
    pub installer_relative_path: String,
    /// Arguments passed verbatim
    #[serde(default)]
    pub args: Vec<String>,
    /// Expected digest of the program
    #[serde(default)]
    pub sha256: Option<String>,
}

impl InstallerEntry {
    /// Absolute path of the program below `package_root`.
    ///
    /// Rejects absolute paths and `..` components so a manifest cannot point
    /// outside the package.
    pub fn resolve(&self, package_root: &Path) -> Result<PathBuf> {
        let relative = Path::new(&self.installer_relative_path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || self.installer_relative_path.is_empty() {
            anyhow::bail!(
                "installer path '{}' must be relative to the package root",
                self.installer_relative_path
            );
        }
        Ok(package_root.join(relative))
    }
}

impl InstallManifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read install manifest: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse install manifest: {}", path.display()))
    }

    /// Parse manifest JSON.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Installers for `platform`, empty when the platform is not listed.
    #[must_use]
    pub fn installers_for(&self, platform: &str) -> &[InstallerEntry] {
        self.platforms.get(platform).map_or(&[], |p| p.installers.as_slice())
    }
}

/// Platform key of the running host.
#[must_use]
pub const fn current_platform() -> &'static str {
    std::env::consts::OS
}
