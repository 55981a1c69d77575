//! Library-level upgrade runs against a mocked direct feed serving a real
//! release package.

use hoist_cli::config::ConfigStore;
use hoist_cli::test_utils::{RecordingWrapper, TestHost, config_entries, init_test_logging};
use hoist_cli::upgrade::credentials::AnonymousCredentialStore;
use hoist_cli::upgrade::feed::FeedEnvironment;
use hoist_cli::upgrade::state::parse_version;
use hoist_cli::upgrade::{
    BackendSelector, UpgradeFlags, UpgradeOrchestrator, UpgradeOutcome, UpgradePhase,
    UpgradeState,
};
use sha2::{Digest, Sha256};
use tokio::runtime::Runtime;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::release_package;

const PACKAGE_DIR: &str = "/hoist.linux/2.0.0";

/// Feed with version 2.0.0 and its package; `checksum` is served as the
/// sidecar when given.
fn feed_with_package(package: &[u8], checksum: Option<String>) -> (Runtime, MockServer) {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(async {
        Mock::given(path("/hoist.linux/index.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"versions":["1.0.0","2.0.0"]}"#),
            )
            .mount(&server)
            .await;
        Mock::given(path(format!("{PACKAGE_DIR}/hoist.linux.2.0.0.nupkg")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(package.to_vec()))
            .mount(&server)
            .await;
        if let Some(checksum) = checksum {
            Mock::given(path(format!("{PACKAGE_DIR}/hoist.linux.2.0.0.nupkg.sha256")))
                .respond_with(ResponseTemplate::new(200).set_body_string(checksum))
                .mount(&server)
                .await;
        }
    });
    (rt, server)
}

fn orchestrator(host: &TestHost, server: &MockServer, flags: UpgradeFlags) -> UpgradeOrchestrator {
    let uri = server.uri();
    let config = config_entries(&[
        ("upgrade.feedurl", uri.as_str()),
        ("upgrade.feedpackagename", "Hoist.Linux"),
    ]);
    assert_eq!(config.all_entries().unwrap().len(), 2);

    let backend = BackendSelector::new(&config, &AnonymousCredentialStore)
        .select(FeedEnvironment {
            installed_version: parse_version("1.0.0").unwrap(),
            directories: host.directories.clone(),
            flags,
        })
        .unwrap();
    UpgradeOrchestrator::new("1.0.0", backend, host.services(), flags).unwrap()
}

#[cfg(unix)]
#[test]
fn test_full_upgrade_from_direct_feed() {
    init_test_logging(None);
    let package = release_package(&["--prefix", "/opt/hoist"]);
    let checksum = format!("{}  hoist.linux.2.0.0.nupkg\n", hex::encode(Sha256::digest(&package)));
    let (_rt, server) = feed_with_package(&package, Some(checksum));
    let host = TestHost::new().unwrap();

    let mut orchestrator = orchestrator(&host, &server, UpgradeFlags::new());
    let mut wrapper = RecordingWrapper::default();
    let outcome = orchestrator.run(&mut wrapper).unwrap();

    let UpgradeOutcome::Upgraded {
        from,
        to,
        upgrader_path,
        cleanup_warning,
    } = outcome
    else {
        panic!("expected an upgrade, got {outcome:?}");
    };
    assert_eq!(from.to_string(), "1.0.0");
    assert_eq!(to.to_string(), "2.0.0");
    assert!(cleanup_warning.is_none());

    // The running installation was staged next to the downloads
    assert!(upgrader_path.starts_with(&host.directories.application));
    assert!(upgrader_path.exists());
    assert!(host.directories.application.join("lib/plugins/feed.json").exists());

    // The package installer ran through the wrapper with its manifest arguments
    assert_eq!(wrapper.descriptions, vec!["Running hoist".to_string()]);
    let launched = host.launcher.log().entries();
    assert_eq!(launched.len(), 1);
    assert!(launched[0].ends_with("content/install.sh --prefix /opt/hoist"), "{launched:?}");

    // Downloads are gone after cleanup
    let leftovers = std::fs::read_dir(&host.directories.download).unwrap().count();
    assert_eq!(leftovers, 0);
    assert_eq!(orchestrator.state(), &UpgradeState::At(UpgradePhase::Done));
}

#[test]
fn test_checksum_mismatch_fails_download() {
    let package = release_package(&[]);
    let wrong = format!("sha256:{}", "0".repeat(64));
    let (_rt, server) = feed_with_package(&package, Some(wrong));
    let host = TestHost::new().unwrap();

    let mut orchestrator = orchestrator(&host, &server, UpgradeFlags::new());
    let err = orchestrator.run(&mut RecordingWrapper::default()).unwrap_err();

    assert!(err.to_string().contains("Checksum verification failed"), "{err}");
    assert!(matches!(
        orchestrator.state(),
        UpgradeState::Failed {
            phase: UpgradePhase::Downloaded,
            ..
        }
    ));
    assert!(!host.directories.application.exists());
    assert!(host.launcher.log().is_empty());
}

#[test]
fn test_no_verify_skips_bad_checksum() {
    let package = release_package(&[]);
    let wrong = format!("sha256:{}", "0".repeat(64));
    let (_rt, server) = feed_with_package(&package, Some(wrong));
    let host = TestHost::new().unwrap();

    let mut orchestrator = orchestrator(&host, &server, UpgradeFlags::new().no_verify(true));
    let outcome = orchestrator.run(&mut RecordingWrapper::default()).unwrap();

    assert!(matches!(outcome, UpgradeOutcome::Upgraded { .. }));
    assert_eq!(host.launcher.log().len(), 1);
}

#[test]
fn test_dry_run_leaves_host_untouched() {
    let package = release_package(&[]);
    let (_rt, server) = feed_with_package(&package, None);
    let host = TestHost::new().unwrap();
    let before = host.snapshot();

    let mut orchestrator = orchestrator(&host, &server, UpgradeFlags::new().dry_run(true));
    let mut wrapper = RecordingWrapper::default();
    let outcome = orchestrator.run(&mut wrapper).unwrap();

    assert!(matches!(outcome, UpgradeOutcome::Upgraded { .. }));
    assert_eq!(host.snapshot(), before);
    assert!(host.launcher.log().is_empty());
    assert_eq!(wrapper.descriptions.len(), 1);
}
