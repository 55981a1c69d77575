//! `hoist config` through the binary.

use predicates::prelude::*;
use std::fs;

use crate::common::HoistTestEnv;

#[test]
fn test_config_set_get_unset() {
    let env = HoistTestEnv::new();

    env.hoist_command()
        .args(["config", "set", "upgrade.feedurl", "https://feed.example/v3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set upgrade.feedurl"));
    assert!(env.config_path.exists());

    env.hoist_command()
        .args(["config", "get", "Upgrade.FeedUrl"])
        .assert()
        .success()
        .stdout(predicate::str::diff("https://feed.example/v3\n"));

    env.hoist_command()
        .args(["config", "unset", "upgrade.feedurl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed upgrade.feedurl"));

    env.hoist_command()
        .args(["config", "get", "upgrade.feedurl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'upgrade.feedurl' is not set"));
}

#[test]
fn test_config_list_reads_hand_written_file() {
    let env = HoistTestEnv::new();
    env.write_upgrade_config(&[("feedurl", "https://feed.example/v3"), ("ring", "fast")]);

    env.hoist_command()
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("upgrade.feedurl"))
        .stdout(predicate::str::contains("=https://feed.example/v3"))
        .stdout(predicate::str::contains("=fast"));
}

#[test]
fn test_config_list_empty() {
    let env = HoistTestEnv::new();

    env.hoist_command()
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No settings"));
}

#[test]
fn test_config_flag_overrides_environment() {
    let env = HoistTestEnv::new();
    let other = env.temp.path().join("other.toml");

    env.hoist_command()
        .args(["--config"])
        .arg(&other)
        .args(["config", "set", "upgrade.ring", "slow"])
        .assert()
        .success();

    assert!(fs::read_to_string(&other).unwrap().contains("ring = \"slow\""));
    assert!(!env.config_path.exists());
}
