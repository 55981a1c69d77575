//! Concrete release feeds.
//!
//! - [`DirectFeedBackend`] reads a NuGet v3 flat-container feed directly
//! - [`OrganizationFeedBackend`] asks an organization info server which
//!   version the organization has approved, then downloads it from the feed
//!
//! Both resolve all network I/O through a blocking [`FeedClient`].

pub mod client;
pub mod direct;
pub mod manifest;
pub mod organization;

pub use client::{FeedClient, FeedError};
pub use direct::DirectFeedBackend;
pub use manifest::{InstallManifest, InstallerEntry};
pub use organization::OrganizationFeedBackend;

use semver::Version;

use crate::upgrade::platform::UpgradeDirectories;
use crate::upgrade::state::{UpgradeFlags, parse_version};

/// Everything a feed backend needs besides its configuration keys.
#[derive(Debug, Clone)]
pub struct FeedEnvironment {
    /// Version of the running tool
    pub installed_version: Version,
    /// Scratch directories of this upgrade attempt
    pub directories: UpgradeDirectories,
    /// Dry-run and verification switches
    pub flags: UpgradeFlags,
}

/// A version as published, keeping the feed's spelling for URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedVersion {
    /// Parsed version used for comparison
    pub version: Version,
    /// Exact string from the feed, used to build download URLs
    pub raw: String,
}

impl PublishedVersion {
    /// Parse a version string from a feed, `None` if it is not a version.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        parse_version(raw).ok().map(|version| Self {
            version,
            raw: raw.trim().to_string(),
        })
    }
}
