//! Fake installations and scratch hosts for pipeline tests.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use super::mocks::{FixedLocator, RecordingLauncher};
use crate::upgrade::orchestrator::HostServices;
use crate::upgrade::platform::{NativePlatformStrategy, UpgradeDirectories};
use crate::upgrade::staging::RecursiveCopier;

/// Write a small hoist installation below `root` and return its file count.
///
/// Layout: the `hoist` and `hoist-upgrader` executables, a `lib/` directory
/// with one nested plugin, and a `share/` directory with docs.
pub fn build_installation_tree(root: &Path) -> io::Result<usize> {
    let files: [(&str, &[u8]); 5] = [
        ("hoist", b"#!/bin/sh\necho hoist 1.0.0\n"),
        ("hoist-upgrader", b"#!/bin/sh\necho upgrader\n"),
        ("lib/libhoist.so", &[0x7f, b'E', b'L', b'F', 0, 1, 2, 3]),
        ("lib/plugins/feed.json", br#"{"enabled":true}"#),
        ("share/doc/README", b"hoist\n"),
    ];
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(files.len())
}

/// Build a flattened config mapping from pairs.
#[must_use]
pub fn config_entries(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

/// A throwaway host: an installed copy of hoist plus empty data directories.
///
/// ```text
/// <temp>/install/...            running installation
/// <temp>/data/upgrade/downloads download scratch (created on demand)
/// <temp>/data/upgrade/application staging target (created on demand)
/// ```
pub struct TestHost {
    /// Keeps the directory alive
    pub temp: TempDir,
    /// Directory of the "running" executable
    pub install_dir: PathBuf,
    /// Scratch directories handed to the orchestrator
    pub directories: UpgradeDirectories,
    /// Launcher used by [`TestHost::services`]
    pub launcher: RecordingLauncher,
}

impl TestHost {
    /// Create the host with a populated installation.
    pub fn new() -> io::Result<Self> {
        let temp = TempDir::new()?;
        let install_dir = temp.path().join("install");
        build_installation_tree(&install_dir)?;
        let directories = UpgradeDirectories::new(temp.path().join("data").join("upgrade"));
        Ok(Self {
            temp,
            install_dir,
            directories,
            launcher: RecordingLauncher::new(),
        })
    }

    /// Real platform strategy and copier over this host, recording launcher.
    #[must_use]
    pub fn services(&self) -> HostServices {
        HostServices {
            platform: Box::new(NativePlatformStrategy::new(self.directories.clone())),
            copier: Box::new(RecursiveCopier::new()),
            locator: Box::new(FixedLocator(self.install_dir.clone())),
            launcher: Box::new(self.launcher.clone()),
            directories: self.directories.clone(),
        }
    }

    /// Every path below the host root, sorted, with file contents.
    ///
    /// Compare two snapshots to prove nothing was written.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(PathBuf, Option<Vec<u8>>)> {
        let mut entries: Vec<_> = WalkDir::new(self.temp.path())
            .into_iter()
            .filter_map(Result::ok)
            .map(|e| {
                let content = if e.file_type().is_file() { fs::read(e.path()).ok() } else { None };
                (e.path().to_path_buf(), content)
            })
            .collect();
        entries.sort();
        entries
    }
}
