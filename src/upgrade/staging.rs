//! Recursive copy of the running installation into the staging directory.
//!
//! The running process cannot overwrite its own binaries on most platforms,
//! so the upgrade first mirrors the whole executable directory into a fresh
//! location and runs the installer from there.
//!
//! The copy is not transactional: when it fails partway, whatever was
//! already copied stays at the destination. The next attempt re-prepares the
//! destination directory before copying, which clears the partial tree.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Failure while copying a directory tree.
#[derive(Error, Debug)]
pub enum StagingError {
    /// The OS refused access to a path.
    #[error("Access to the path '{}' is denied", path.display())]
    PermissionDenied {
        /// Path that could not be read or written
        path: PathBuf,
        /// Original I/O error
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure.
    #[error("I/O error at '{}': {source}", path.display())]
    Io {
        /// Path involved in the failing operation
        path: PathBuf,
        /// Original I/O error
        #[source]
        source: io::Error,
    },
}

impl StagingError {
    /// Classify an I/O error raised while touching `path`.
    #[must_use]
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied {
                path: path.to_path_buf(),
                source,
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Whether this is a permission failure.
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Counts reported by a completed copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopySummary {
    /// Regular files copied
    pub files: usize,
    /// Directories created or reused, including the destination root
    pub directories: usize,
}

/// Copies one directory tree into another.
pub trait DirectoryCopier {
    /// Mirror `source` into `destination`, creating it if needed.
    fn copy(&self, source: &Path, destination: &Path) -> Result<CopySummary, StagingError>;
}

/// Full recursive copy built on `walkdir`.
///
/// - Preserves the relative structure of files and subdirectories
/// - Overwrites files already present at the destination, so copying twice
///   yields the same tree
/// - Symlinks to files are copied as content; dangling symlinks are skipped
/// - Symlinks to directories are recreated as links on Unix, with absolute
///   links into the source tree pointed at the mirror instead; elsewhere the
///   linked directory is copied
/// - Never skips files that look identical; every copy is a full copy
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursiveCopier;

impl RecursiveCopier {
    /// Create a new copier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DirectoryCopier for RecursiveCopier {
    fn copy(&self, source: &Path, destination: &Path) -> Result<CopySummary, StagingError> {
        let mut summary = CopySummary::default();

        fs::create_dir_all(destination).map_err(|e| StagingError::from_io(destination, e))?;
        summary.directories += 1;

        for entry in WalkDir::new(source).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(source).to_path_buf();
                let io_error = e.into_io_error().unwrap_or_else(|| {
                    io::Error::other("filesystem loop detected while walking source tree")
                });
                StagingError::from_io(&path, io_error)
            })?;

            let relative = entry.path().strip_prefix(source).map_err(|_| StagingError::Io {
                path: entry.path().to_path_buf(),
                source: io::Error::other("entry is outside the source directory"),
            })?;
            let target = destination.join(relative);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                fs::create_dir_all(&target).map_err(|e| StagingError::from_io(&target, e))?;
                summary.directories += 1;
            } else if file_type.is_file() {
                copy_file(entry.path(), &target)?;
                summary.files += 1;
            } else if file_type.is_symlink() {
                match fs::metadata(entry.path()) {
                    Ok(meta) if meta.is_file() => {
                        copy_file(entry.path(), &target)?;
                        summary.files += 1;
                    }
                    Ok(meta) if meta.is_dir() => {
                        summary += self.copy_directory_link(source, destination, entry.path(), &target)?;
                    }
                    Ok(_) => debug!("Skipping special file behind symlink: {}", entry.path().display()),
                    Err(_) => debug!("Skipping dangling symlink: {}", entry.path().display()),
                }
            }
        }

        debug!(
            "Copied {} files in {} directories from {} to {}",
            summary.files,
            summary.directories,
            source.display(),
            destination.display()
        );
        Ok(summary)
    }
}

impl RecursiveCopier {
    #[cfg(unix)]
    fn copy_directory_link(
        &self,
        source: &Path,
        destination: &Path,
        link: &Path,
        target: &Path,
    ) -> Result<CopySummary, StagingError> {
        let pointee = fs::read_link(link).map_err(|e| StagingError::from_io(link, e))?;
        let pointee = match pointee.strip_prefix(source) {
            Ok(inside) => destination.join(inside),
            Err(_) => pointee,
        };

        if let Ok(meta) = fs::symlink_metadata(target) {
            let removed = if meta.is_dir() { fs::remove_dir_all(target) } else { fs::remove_file(target) };
            removed.map_err(|e| StagingError::from_io(target, e))?;
        }
        std::os::unix::fs::symlink(&pointee, target).map_err(|e| StagingError::from_io(target, e))?;
        debug!("Linked {} -> {}", target.display(), pointee.display());

        Ok(CopySummary {
            files: 0,
            directories: 1,
        })
    }

    #[cfg(not(unix))]
    fn copy_directory_link(
        &self,
        source: &Path,
        _destination: &Path,
        link: &Path,
        target: &Path,
    ) -> Result<CopySummary, StagingError> {
        let resolved = fs::canonicalize(link).map_err(|e| StagingError::from_io(link, e))?;
        // A link to an ancestor would be copied forever
        if fs::canonicalize(source).is_ok_and(|root| root.starts_with(&resolved)) {
            debug!("Skipping symlink to an ancestor directory: {}", link.display());
            return Ok(CopySummary::default());
        }
        self.copy(&resolved, target)
    }
}

impl std::ops::AddAssign for CopySummary {
    fn add_assign(&mut self, other: Self) {
        self.files += other.files;
        self.directories += other.directories;
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<(), StagingError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| StagingError::from_io(parent, e))?;
    }
    // A previous copy may have left a read-only file behind
    if let Ok(meta) = fs::symlink_metadata(to)
        && meta.permissions().readonly()
    {
        fs::remove_file(to).map_err(|e| StagingError::from_io(to, e))?;
    }
    fs::copy(from, to).map_err(|e| {
        // Attribute the failure to whichever side refused access
        let path = if fs::File::open(from).is_err() { from } else { to };
        StagingError::from_io(path, e)
    })?;
    Ok(())
}
