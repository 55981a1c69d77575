//! Host capabilities consumed by the upgrade pipeline.
//!
//! The orchestrator never touches well-known directories or the process
//! table directly. It goes through [`PlatformStrategy`] to reset its two
//! scratch directories and through [`ProcessLocator`] to find where the
//! running executable lives, so tests can substitute both.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{
    APP_DIR_NAME, APPLICATION_DIR_NAME, DATA_DIR_ENV, DOWNLOADS_DIR_NAME, UPGRADE_DIR_NAME,
    UPGRADER_EXECUTABLE_NAME, UPGRADER_EXECUTABLE_NAME_WINDOWS,
};

/// The two directories owned by one upgrade attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeDirectories {
    /// Scratch area for downloaded and extracted packages
    pub download: PathBuf,
    /// Destination of the staged copy of the running installation
    pub application: PathBuf,
}

impl UpgradeDirectories {
    /// Lay out both directories below `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            download: root.join(DOWNLOADS_DIR_NAME),
            application: root.join(APPLICATION_DIR_NAME),
        }
    }

    /// Resolve the directories from the environment.
    ///
    /// `HOIST_DATA_DIR` replaces the platform data directory when set.
    /// Otherwise `<local data dir>/hoist/upgrade` is used
    /// (`~/.local/share` on Linux, `%LOCALAPPDATA%` on Windows).
    pub fn from_environment() -> io::Result<Self> {
        let base = if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(dir)
        } else {
            dirs::data_local_dir().map(|d| d.join(APP_DIR_NAME)).ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "Could not determine local data directory")
            })?
        };
        Ok(Self::new(base.join(UPGRADE_DIR_NAME)))
    }
}

/// Platform-specific preparation of the upgrade directories.
pub trait PlatformStrategy {
    /// Reset the download directory to an empty, writable state.
    fn prepare_download_directory(&self) -> io::Result<()>;

    /// Reset the staging directory to an empty, writable state.
    fn prepare_application_directory(&self) -> io::Result<()>;

    /// File name of the upgrader executable inside the staged directory.
    fn upgrader_executable_name(&self) -> &str;
}

/// Strategy for the host the binary was compiled for.
#[derive(Debug, Clone)]
pub struct NativePlatformStrategy {
    directories: UpgradeDirectories,
}

impl NativePlatformStrategy {
    /// Create a strategy managing `directories`.
    #[must_use]
    pub const fn new(directories: UpgradeDirectories) -> Self {
        Self {
            directories,
        }
    }

    /// The directories this strategy prepares.
    #[must_use]
    pub const fn directories(&self) -> &UpgradeDirectories {
        &self.directories
    }
}

impl PlatformStrategy for NativePlatformStrategy {
    fn prepare_download_directory(&self) -> io::Result<()> {
        reset_directory(&self.directories.download)
    }

    fn prepare_application_directory(&self) -> io::Result<()> {
        reset_directory(&self.directories.application)
    }

    fn upgrader_executable_name(&self) -> &str {
        if cfg!(windows) {
            UPGRADER_EXECUTABLE_NAME_WINDOWS
        } else {
            UPGRADER_EXECUTABLE_NAME
        }
    }
}

/// Remove whatever a previous attempt left behind and recreate `dir`.
///
/// Safe to call repeatedly. A regular file squatting on the path is removed
/// as well.
fn reset_directory(dir: &Path) -> io::Result<()> {
    match fs::symlink_metadata(dir) {
        Ok(meta) if meta.is_dir() => {
            debug!("Clearing leftover directory: {}", dir.display());
            fs::remove_dir_all(dir)?;
        }
        Ok(_) => fs::remove_file(dir)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}

/// Locates the directory of the running executable.
pub trait ProcessLocator {
    /// Directory containing the current process's executable.
    fn current_process_directory(&self) -> io::Result<PathBuf>;
}

/// [`ProcessLocator`] backed by [`std::env::current_exe`].
///
/// Symlinks are resolved, so a `hoist` linked into `~/.local/bin` stages
/// the real installation directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentProcessLocator;

impl ProcessLocator for CurrentProcessLocator {
    fn current_process_directory(&self) -> io::Result<PathBuf> {
        let exe = std::env::current_exe()?;
        let exe = exe.canonicalize().unwrap_or(exe);
        exe.parent().map(Path::to_path_buf).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "Executable has no parent directory")
        })
    }
}
