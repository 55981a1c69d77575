//! The user's local hoist configuration file.
//!
//! # Location
//!
//! - **Unix/macOS**: `~/.hoist/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\hoist\config.toml`
//! - **Override**: set `HOIST_CONFIG_PATH`
//!
//! # Format
//!
//! Keys are addressed as lower-case dotted paths. Tables in the file map to
//! key prefixes, so both spellings below define `upgrade.feedurl`:
//!
//! ```toml
//! [upgrade]
//! feedurl = "https://pkgs.dev.azure.com/contoso/_packaging/tools/nuget/v3/flat2"
//!
//! # or
//! "upgrade.feedurl" = "..."
//! ```
//!
//! # Security
//!
//! The file may hold feed locations for private organizations, so it is
//! written with `0o600` permissions on Unix.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::debug;

use super::ConfigStore;
use crate::constants::{APP_DIR_NAME, CONFIG_PATH_ENV};

/// In-memory copy of a config file.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalConfig {
    path: PathBuf,
    table: Table,
}

impl LocalConfig {
    /// Load from the default location, or start empty if the file is missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from `path`, or start empty if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not
    /// valid TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        let table = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str::<Table>(&content)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            debug!("No config file at {}, using empty config", path.display());
            Table::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            table,
        })
    }

    /// Default config file path, honoring `HOIST_CONFIG_PATH`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join(APP_DIR_NAME)
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(format!(".{APP_DIR_NAME}"))
        };

        Ok(config_dir.join("config.toml"))
    }

    /// File this config was loaded from and saves to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All settings as flattened `section.key` pairs.
    ///
    /// Strings are returned verbatim; other values use their TOML spelling.
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, String> {
        let mut entries = BTreeMap::new();
        flatten(&self.table, "", &mut entries);
        entries
    }

    /// Value of one setting.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries().remove(&key.to_lowercase())
    }

    /// Set `key` to a string value, creating tables along the way.
    ///
    /// Every other spelling of the same key (quoted dotted keys, different
    /// case) is removed so the new value is the only one left.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let segments = split_key(key)?;
        let (leaf, parents) = segments.split_last().context("empty key")?;

        let mut updated = self.table.clone();
        remove_path(&mut updated, &segments);

        let mut table = &mut updated;
        for segment in parents {
            let name = table
                .keys()
                .find(|k| k.to_lowercase() == *segment)
                .cloned()
                .unwrap_or_else(|| segment.clone());
            let entry = table.entry(name).or_insert(Value::Table(Table::new()));
            table = match entry {
                Value::Table(t) => t,
                _ => bail!("Cannot set '{key}': '{segment}' already holds a value"),
            };
        }
        table.insert(leaf.clone(), Value::String(value.to_string()));

        self.table = updated;
        Ok(())
    }

    /// Remove `key`. Returns whether it was present.
    ///
    /// Keys are matched the way [`entries`](Self::entries) reports them, so
    /// `FeedUrl` and a quoted `"upgrade.feedurl"` both count. Tables left
    /// empty by the removal are dropped as well.
    pub fn unset(&mut self, key: &str) -> Result<bool> {
        let segments = split_key(key)?;
        Ok(remove_path(&mut self.table, &segments))
    }

    /// Save to the file this config was loaded from.
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.path)
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(&self.table).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }
}

impl ConfigStore for LocalConfig {
    fn all_entries(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.entries())
    }
}

/// Config store that reads its file on every request.
///
/// Used by the upgrade command so that a broken config file is reported as
/// a configuration read failure by the backend selector.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    /// Store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Store backed by the default config path.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(LocalConfig::default_path()?))
    }
}

impl ConfigStore for ConfigFile {
    fn all_entries(&self) -> Result<BTreeMap<String, String>> {
        Ok(LocalConfig::load_from(&self.path)?.entries())
    }
}

fn split_key(key: &str) -> Result<Vec<String>> {
    let segments: Vec<String> = key.trim().to_lowercase().split('.').map(str::to_string).collect();
    if segments.iter().any(String::is_empty) {
        bail!("Invalid config key '{key}': expected dot-separated names like 'upgrade.feedurl'");
    }
    Ok(segments)
}

fn flatten(table: &Table, prefix: &str, out: &mut BTreeMap<String, String>) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.to_lowercase()
        } else {
            format!("{prefix}.{}", key.to_lowercase())
        };
        match value {
            Value::Table(nested) => flatten(nested, &full, out),
            Value::String(s) => {
                out.insert(full, s.clone());
            }
            other => {
                out.insert(full, other.to_string());
            }
        }
    }
}

/// Remove every key that flattens to `segments`.
fn remove_path(table: &mut Table, segments: &[String]) -> bool {
    let keys: Vec<String> = table.keys().cloned().collect();
    let mut removed = false;

    for key in keys {
        let lowered = key.to_lowercase();
        // A key may itself contain dots, covering several segments at once
        let Some(depth) = (1..=segments.len()).find(|&n| segments[..n].join(".") == lowered) else {
            continue;
        };

        if depth == segments.len() {
            removed |= table.remove(&key).is_some();
        } else if let Some(Value::Table(child)) = table.get_mut(&key)
            && remove_path(child, &segments[depth..])
        {
            removed = true;
            if child.is_empty() {
                table.remove(&key);
            }
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_empty() {
        let temp = TempDir::new().unwrap();
        let config = LocalConfig::load_from(&temp.path().join("config.toml")).unwrap();
        assert!(config.entries().is_empty());
    }

    #[test]
    fn nested_tables_and_dotted_keys_flatten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
"upgrade.ring" = "Fast"

[upgrade]
FeedUrl = "https://feed.example/v3"
retries = 3
"#,
        )
        .unwrap();

        let entries = LocalConfig::load_from(&path).unwrap().entries();

        assert_eq!(entries.get("upgrade.feedurl").map(String::as_str), Some("https://feed.example/v3"));
        assert_eq!(entries.get("upgrade.retries").map(String::as_str), Some("3"));
        assert_eq!(entries.get("upgrade.ring").map(String::as_str), Some("Fast"));
    }

    #[test]
    fn set_save_reload_unset_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = LocalConfig::load_from(&path).unwrap();
        config.set("upgrade.feedurl", "https://feed.example/v3").unwrap();
        config.set("Upgrade.FeedPackageName", "hoist.linux").unwrap();
        config.save().unwrap();

        let mut reloaded = LocalConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.get("upgrade.feedpackagename").as_deref(), Some("hoist.linux"));
        assert_eq!(reloaded.entries().len(), 2);

        assert!(reloaded.unset("upgrade.feedurl").unwrap());
        assert!(!reloaded.unset("upgrade.feedurl").unwrap());
        assert!(reloaded.unset("upgrade.feedpackagename").unwrap());
        assert!(reloaded.entries().is_empty());
        reloaded.save().unwrap();
        assert!(!fs::read_to_string(&path).unwrap().contains("[upgrade]"));
    }

    #[test]
    fn set_replaces_quoted_dotted_key() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "\"upgrade.feedurl\" = \"https://old\"\n").unwrap();

        let mut config = LocalConfig::load_from(&path).unwrap();
        config.set("upgrade.feedurl", "https://new").unwrap();
        config.save().unwrap();

        let reloaded = LocalConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.get("upgrade.feedurl").as_deref(), Some("https://new"));
        assert_eq!(reloaded.entries().len(), 1);
        assert!(!fs::read_to_string(&path).unwrap().contains("https://old"));
    }

    #[test]
    fn unset_matches_keys_case_insensitively() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[Upgrade]\nFeedUrl = \"https://feed.example/v3\"\n").unwrap();

        let mut config = LocalConfig::load_from(&path).unwrap();
        assert_eq!(config.get("upgrade.feedurl").as_deref(), Some("https://feed.example/v3"));
        assert!(config.unset("upgrade.feedurl").unwrap());
        assert!(config.entries().is_empty());
        config.save().unwrap();
        assert!(!fs::read_to_string(&path).unwrap().contains("Upgrade"));
    }

    #[test]
    fn set_overwrites_differently_cased_key_in_place() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[Upgrade]\nFeedUrl = \"https://old\"\nring = \"fast\"\n").unwrap();

        let mut config = LocalConfig::load_from(&path).unwrap();
        config.set("upgrade.feedurl", "https://new").unwrap();
        config.save().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("[Upgrade]"));
        assert!(!content.contains("FeedUrl"));
        let reloaded = LocalConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.get("upgrade.feedurl").as_deref(), Some("https://new"));
        assert_eq!(reloaded.get("upgrade.ring").as_deref(), Some("fast"));
    }

    #[test]
    fn set_rejects_bad_keys_and_value_collisions() {
        let temp = TempDir::new().unwrap();
        let mut config = LocalConfig::load_from(&temp.path().join("config.toml")).unwrap();

        assert!(config.set("upgrade..feedurl", "x").is_err());
        assert!(config.set("", "x").is_err());

        config.set("upgrade", "scalar").unwrap();
        assert!(config.set("upgrade.feedurl", "x").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let mut config = LocalConfig::load_from(&path).unwrap();
        config.set("upgrade.ring", "slow").unwrap();
        config.save().unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600, "Config file should have 600 permissions");
    }

    #[test]
    fn config_file_store_reports_parse_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[upgrade\nfeedurl = ").unwrap();

        let err = ConfigFile::new(&path).all_entries().unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }
}
