//! `hoist upgrade` against mocked feeds.

use predicates::prelude::*;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::HoistTestEnv;

const INSTALLED: &str = env!("CARGO_PKG_VERSION");
const AZURE_FEED: &str = "https://pkgs.dev.azure.com/contoso/_packaging/tools/nuget/v3/flat2";

/// A direct feed publishing `versions` for `hoist.linux`.
fn direct_feed(versions: &str) -> (Runtime, MockServer) {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(method("GET"))
            .and(path("/hoist.linux/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(versions.to_string()))
            .mount(&server),
    );
    (rt, server)
}

/// An organization server answering with `body` for contoso.
fn org_server(body: &str) -> (Runtime, MockServer) {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(method("GET"))
            .and(path("/api/GetLatestVersion"))
            .and(query_param("Organization", "contoso"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(&server),
    );
    (rt, server)
}

fn configure_direct(env: &HoistTestEnv, server: &MockServer, extra: &[(&str, &str)]) {
    let uri = server.uri();
    let mut pairs = vec![("feedurl", uri.as_str()), ("feedpackagename", "hoist.linux")];
    pairs.extend_from_slice(extra);
    env.write_upgrade_config(&pairs);
}

#[test]
fn test_upgrade_without_feed_configured() {
    let env = HoistTestEnv::new();

    env.hoist_command()
        .arg("upgrade")
        .assert()
        .success()
        .stdout(predicate::str::contains("Custom upgrade feed is not configured"));
}

#[test]
fn test_upgrade_reports_up_to_date() {
    let (_rt, server) = direct_feed(&format!(r#"{{"versions":["0.0.1","{INSTALLED}"]}}"#));
    let env = HoistTestEnv::new();
    configure_direct(&env, &server, &[]);

    env.hoist_command()
        .arg("upgrade")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("latest version ({INSTALLED})")));
}

#[test]
fn test_upgrade_check_reports_newer_version_without_writing() {
    let (_rt, server) = direct_feed(r#"{"versions":["99.0.0","99.1.0-beta.1"]}"#);
    let env = HoistTestEnv::new();
    configure_direct(&env, &server, &[]);

    env.hoist_command()
        .arg("upgrade")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{INSTALLED} → 99.0.0")))
        .stdout(predicate::str::contains("hoist upgrade --confirm"));

    assert!(!env.data_dir.exists(), "checking must not create the data directory");
}

#[test]
fn test_upgrade_fast_ring_sees_prereleases() {
    let (_rt, server) = direct_feed(r#"{"versions":["99.0.0","99.1.0-beta.1"]}"#);
    let env = HoistTestEnv::new();
    configure_direct(&env, &server, &[("ring", "fast")]);

    env.hoist_command()
        .arg("upgrade")
        .assert()
        .success()
        .stdout(predicate::str::contains("→ 99.1.0-beta.1"));
}

#[test]
fn test_upgrade_confirm_dry_run_changes_nothing() {
    let (_rt, server) = direct_feed(r#"{"versions":["99.0.0"]}"#);
    let env = HoistTestEnv::new();
    configure_direct(&env, &server, &[]);

    env.hoist_command()
        .args(["upgrade", "--confirm", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains(format!("Upgraded hoist from {INSTALLED} to 99.0.0")))
        .stdout(predicate::str::contains("Upgrader staged at"))
        .stdout(predicate::str::contains("hoist-upgrader"));

    assert!(!env.data_dir.exists(), "dry run must not create the data directory");
}

#[test]
fn test_upgrade_disabled_by_ring_none() {
    let (_rt, server) = direct_feed(r#"{"versions":["99.0.0"]}"#);
    let env = HoistTestEnv::new();
    configure_direct(&env, &server, &[("ring", "none")]);

    env.hoist_command()
        .arg("upgrade")
        .assert()
        .failure()
        .stderr(predicate::str::contains("upgrade.ring is set to 'none'"));
}

#[test]
fn test_upgrade_unauthorized_feed_suggests_token() {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(path("/hoist.linux/index.json"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server),
    );
    let env = HoistTestEnv::new();
    configure_direct(&env, &server, &[]);

    env.hoist_command()
        .arg("upgrade")
        .assert()
        .failure()
        .stderr(predicate::str::contains("(authentication)"))
        .stderr(predicate::str::contains("HOIST_FEED_TOKEN"));
}

#[test]
fn test_upgrade_anonymous_rejects_direct_feed() {
    let (_rt, server) = direct_feed(r#"{"versions":["99.0.0"]}"#);
    let env = HoistTestEnv::new();
    configure_direct(&env, &server, &[]);

    env.hoist_command()
        .args(["upgrade", "--anonymous"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("(authentication)"));
}

#[test]
fn test_upgrade_broken_config_file() {
    let env = HoistTestEnv::new();
    std::fs::create_dir_all(env.config_path.parent().unwrap()).unwrap();
    std::fs::write(&env.config_path, "[upgrade\nfeedurl =").unwrap();

    env.hoist_command()
        .arg("upgrade")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[test]
fn test_upgrade_through_organization_server() {
    let (_rt, server) = org_server(r#"{"version":"99.0.0"}"#);
    let env = HoistTestEnv::new();
    env.write_upgrade_config(&[
        ("feedurl", AZURE_FEED),
        ("feedpackagename", "hoist.linux"),
        ("orginfoserverurl", &server.uri()),
    ]);

    env.hoist_command()
        .arg("upgrade")
        .assert()
        .success()
        .stdout(predicate::str::contains("→ 99.0.0"));
}

#[test]
fn test_upgrade_organization_without_approved_version() {
    let (_rt, server) = org_server(r#"{"version":null}"#);
    let env = HoistTestEnv::new();
    env.write_upgrade_config(&[
        ("feedurl", AZURE_FEED),
        ("feedpackagename", "hoist.linux"),
        ("orginfoserverurl", &server.uri()),
    ]);

    env.hoist_command()
        .arg("upgrade")
        .assert()
        .success()
        .stdout(predicate::str::contains("latest version"));
}
