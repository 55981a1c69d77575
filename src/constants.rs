//! Global constants used throughout the hoist codebase.
//!
//! Configuration keys, environment variable names, well-known file and
//! directory names, and network timeouts live here so that the upgrade
//! pipeline, the CLI and the tests agree on a single spelling.

use std::time::Duration;

/// Configuration keys recognized by the upgrade pipeline.
///
/// Keys are flattened, lower-case and dot-separated. In the TOML config file
/// they are written as a `[upgrade]` table:
///
/// ```toml
/// [upgrade]
/// feedurl = "https://pkgs.dev.azure.com/contoso/_packaging/tools/nuget/v3/flat2"
/// feedpackagename = "hoist.linux"
/// ```
pub mod config_keys {
    /// URL of the package feed hosting hoist releases.
    pub const UPGRADE_FEED_URL: &str = "upgrade.feedurl";

    /// Package identifier of the hoist release on the feed.
    pub const UPGRADE_FEED_PACKAGE_NAME: &str = "upgrade.feedpackagename";

    /// Server that resolves the organization's approved version.
    pub const ORG_INFO_SERVER_URL: &str = "upgrade.orginfoserverurl";

    /// Release ring (`fast`, `slow` or `none`).
    pub const UPGRADE_RING: &str = "upgrade.ring";
}

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "HOIST_CONFIG_PATH";

/// Environment variable overriding the application data directory.
pub const DATA_DIR_ENV: &str = "HOIST_DATA_DIR";

/// Environment variable holding a personal access token for the feed.
pub const FEED_TOKEN_ENV: &str = "HOIST_FEED_TOKEN";

/// Environment variable holding the username paired with [`FEED_TOKEN_ENV`].
pub const FEED_USER_ENV: &str = "HOIST_FEED_USER";

/// Environment variable disabling spinners and animated output.
pub const NO_PROGRESS_ENV: &str = "HOIST_NO_PROGRESS";

/// Username sent with a token when [`FEED_USER_ENV`] is unset.
pub const DEFAULT_FEED_USER: &str = "PersonalAccessToken";

/// Ring used when `upgrade.ring` is not configured.
pub const DEFAULT_RING: &str = "slow";

/// Ring value that disables upgrades entirely.
pub const NONE_RING: &str = "none";

/// Name of the application directory under the platform data directory.
pub const APP_DIR_NAME: &str = "hoist";

/// Upgrade scratch area below the application directory.
pub const UPGRADE_DIR_NAME: &str = "upgrade";

/// Download scratch directory below [`UPGRADE_DIR_NAME`].
pub const DOWNLOADS_DIR_NAME: &str = "downloads";

/// Staged application directory below [`UPGRADE_DIR_NAME`].
pub const APPLICATION_DIR_NAME: &str = "application";

/// File name of the staged upgrader executable on Unix.
pub const UPGRADER_EXECUTABLE_NAME: &str = "hoist-upgrader";

/// File name of the staged upgrader executable on Windows.
pub const UPGRADER_EXECUTABLE_NAME_WINDOWS: &str = "hoist-upgrader.exe";

/// Location of the install manifest inside a release package.
pub const INSTALL_MANIFEST_PATH: &str = "content/install-manifest.json";

/// Command users run to perform an upgrade after a check.
pub const UPGRADE_CONFIRM_COMMAND: &str = "hoist upgrade --confirm";

/// Timeout for establishing feed connections (15 seconds).
pub const FEED_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for a whole feed request, including package downloads (5 minutes).
pub const FEED_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
