use std::collections::BTreeMap;

use crate::constants::{DEFAULT_RING, config_keys};

/// Read-only view of the upgrade-related configuration entries.
///
/// `UpgradeConfig` wraps the flattened key/value mapping produced by a
/// [`ConfigStore`](crate::config::ConfigStore). Which keys are *present*
/// decides the feed backend:
///
/// | `feedurl` / `feedpackagename` | `orginfoserverurl` | Backend                    |
/// |-------------------------------|--------------------|----------------------------|
/// | neither                       | any                | none (not configured)      |
/// | at least one                  | present            | organization-resolved feed |
/// | at least one                  | absent             | direct feed                |
///
/// The value accessors ignore empty values, so a present but empty key
/// selects its backend and that backend then fails to build.
///
/// # Examples
///
/// ```rust,no_run
/// use hoist_cli::upgrade::config::UpgradeConfig;
/// use std::collections::BTreeMap;
///
/// let mut entries = BTreeMap::new();
/// entries.insert("upgrade.feedurl".to_string(), "https://feed.example/v3".to_string());
/// entries.insert("upgrade.feedpackagename".to_string(), "hoist.linux".to_string());
///
/// let config = UpgradeConfig::new(entries);
/// assert!(config.is_feed_configured());
/// assert!(!config.uses_organization_server());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeConfig {
    entries: BTreeMap<String, String>,
}

impl UpgradeConfig {
    /// Wrap a flattened configuration mapping.
    #[must_use]
    pub const fn new(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries,
        }
    }

    /// Look up any key, ignoring empty values.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    /// The configured feed URL.
    #[must_use]
    pub fn feed_url(&self) -> Option<&str> {
        self.get(config_keys::UPGRADE_FEED_URL)
    }

    /// The configured package identifier.
    #[must_use]
    pub fn package_name(&self) -> Option<&str> {
        self.get(config_keys::UPGRADE_FEED_PACKAGE_NAME)
    }

    /// The organization info server URL.
    #[must_use]
    pub fn org_info_server_url(&self) -> Option<&str> {
        self.get(config_keys::ORG_INFO_SERVER_URL)
    }

    /// The release ring, lower-cased, defaulting to `slow`.
    #[must_use]
    pub fn ring(&self) -> String {
        self.get(config_keys::UPGRADE_RING).unwrap_or(DEFAULT_RING).to_lowercase()
    }

    /// Whether `upgrade.feedurl` is present, even if empty.
    #[must_use]
    pub fn has_feed_url(&self) -> bool {
        self.entries.contains_key(config_keys::UPGRADE_FEED_URL)
    }

    /// Whether `upgrade.feedpackagename` is present, even if empty.
    #[must_use]
    pub fn has_package_name(&self) -> bool {
        self.entries.contains_key(config_keys::UPGRADE_FEED_PACKAGE_NAME)
    }

    /// Whether `upgrade.orginfoserverurl` is present, even if empty.
    #[must_use]
    pub fn has_org_info_server(&self) -> bool {
        self.entries.contains_key(config_keys::ORG_INFO_SERVER_URL)
    }

    /// Whether a feed URL or a package name key is present.
    #[must_use]
    pub fn is_feed_configured(&self) -> bool {
        self.has_feed_url() || self.has_package_name()
    }

    /// Whether the organization-resolved backend should be used.
    #[must_use]
    pub fn uses_organization_server(&self) -> bool {
        self.has_org_info_server()
    }
}

impl From<BTreeMap<String, String>> for UpgradeConfig {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> UpgradeConfig {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect::<BTreeMap<_, _>>().into()
    }

    #[test]
    fn empty_values_are_present_but_have_no_value() {
        let cfg = config(&[("upgrade.feedurl", "  "), ("upgrade.orginfoserverurl", "")]);
        assert!(cfg.is_feed_configured());
        assert!(cfg.uses_organization_server());
        assert_eq!(cfg.feed_url(), None);
        assert_eq!(cfg.org_info_server_url(), None);
    }

    #[test]
    fn unrelated_keys_do_not_configure_a_feed() {
        let cfg = config(&[("upgrade.ring", "fast"), ("upgrade.orginfoserverurl", "https://org")]);
        assert!(!cfg.is_feed_configured());
        assert!(!cfg.has_feed_url());
        assert!(!cfg.has_package_name());
    }

    #[test]
    fn either_feed_key_marks_feed_configured() {
        assert!(config(&[("upgrade.feedurl", "https://feed")]).is_feed_configured());
        assert!(config(&[("upgrade.feedpackagename", "hoist")]).is_feed_configured());
    }

    #[test]
    fn ring_defaults_to_slow_and_is_lowercased() {
        assert_eq!(config(&[]).ring(), "slow");
        assert_eq!(config(&[("upgrade.ring", "Fast")]).ring(), "fast");
    }

    #[test]
    fn organization_server_detection() {
        let cfg = config(&[
            ("upgrade.feedurl", "https://feed"),
            ("upgrade.orginfoserverurl", "https://org.example"),
        ]);
        assert!(cfg.uses_organization_server());
        assert_eq!(cfg.org_info_server_url(), Some("https://org.example"));
    }
}
