//! Shared setup for hoist integration tests.

// Not every helper is used by every test module
#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

/// Isolated home for one test: config file and data directory live in a
/// temporary directory, and feed credentials are cleared.
pub struct HoistTestEnv {
    pub temp: TempDir,
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
}

impl HoistTestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config").join("config.toml");
        let data_dir = temp.path().join("data");
        Self {
            temp,
            config_path,
            data_dir,
        }
    }

    /// Write the `[upgrade]` table with `pairs`.
    pub fn write_upgrade_config(&self, pairs: &[(&str, &str)]) {
        let mut content = String::from("[upgrade]\n");
        for (key, value) in pairs {
            content.push_str(&format!("{key} = \"{value}\"\n"));
        }
        fs::create_dir_all(self.config_path.parent().unwrap()).unwrap();
        fs::write(&self.config_path, content).unwrap();
    }

    /// `hoist` with this environment's paths and no progress output.
    pub fn hoist_command(&self) -> Command {
        let mut cmd = Command::cargo_bin("hoist").unwrap();
        cmd.env("HOIST_CONFIG_PATH", &self.config_path)
            .env("HOIST_DATA_DIR", &self.data_dir)
            .env("HOIST_NO_PROGRESS", "1")
            .env("NO_COLOR", "1")
            .env_remove("HOIST_FEED_TOKEN")
            .env_remove("HOIST_FEED_USER")
            .env_remove("RUST_LOG");
        cmd
    }
}

/// A zipped release package holding an install manifest for the current
/// platform and one installer script.
pub fn release_package(installer_args: &[&str]) -> Vec<u8> {
    let platform = std::env::consts::OS;
    let args = installer_args.iter().map(|a| format!("\"{a}\"")).collect::<Vec<_>>().join(",");
    let manifest = format!(
        r#"{{"platforms":{{"{platform}":{{"installers":[{{"name":"hoist","installer_relative_path":"content/install.sh","args":[{args}]}}]}}}}}}"#
    );

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file("content/install-manifest.json", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(manifest.as_bytes()).unwrap();
    writer
        .start_file("content/install.sh", zip::write::SimpleFileOptions::default().unix_permissions(0o755))
        .unwrap();
    writer.write_all(b"#!/bin/sh\nexit 0\n").unwrap();
    writer.finish().unwrap().into_inner()
}
