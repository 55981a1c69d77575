//! Scripted stand-ins for the upgrade pipeline's collaborators.

use semver::Version;
use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::constants::UPGRADER_EXECUTABLE_NAME;
use crate::upgrade::backend::{
    FeedBackend, InstallActionWrapper, InstallerRunner, ProcessLauncher, ProcessOutput,
};
use crate::upgrade::error::{QueryFailureKind, UpgradeError};
use crate::upgrade::platform::{PlatformStrategy, ProcessLocator};
use crate::upgrade::staging::{CopySummary, DirectoryCopier, StagingError};
use crate::upgrade::state::parse_version;

/// Shared, clonable record of calls made to a mock.
///
/// Clone it before boxing the mock to inspect the calls afterwards.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    /// Record a call.
    pub fn push(&self, call: impl Into<String>) {
        self.0.borrow_mut().push(call.into());
    }

    /// All calls so far, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Whether `call` was recorded.
    #[must_use]
    pub fn contains(&self, call: &str) -> bool {
        self.0.borrow().iter().any(|c| c == call)
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// Feed backend returning scripted results.
///
/// By default every phase succeeds and the query reports nothing newer.
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    anonymous: bool,
    allowance: Result<(), UpgradeError>,
    newest: Result<Option<Version>, UpgradeError>,
    download: Result<(), UpgradeError>,
    installers: Vec<(String, PathBuf, Vec<String>)>,
    cleanup: Result<(), UpgradeError>,
    log: CallLog,
}

impl MockBackend {
    /// Backend reporting `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            anonymous: true,
            allowance: Ok(()),
            newest: Ok(None),
            download: Ok(()),
            installers: Vec::new(),
            cleanup: Ok(()),
            log: CallLog::default(),
        }
    }

    /// Report `version` as the newest published version.
    ///
    /// # Panics
    ///
    /// If `version` does not parse.
    #[must_use]
    pub fn with_newest(mut self, version: &str) -> Self {
        self.newest = Ok(Some(parse_version(version).expect("valid test version")));
        self
    }

    /// Deny the upgrade with `message`.
    #[must_use]
    pub fn denying(mut self, message: &str) -> Self {
        self.allowance = Err(UpgradeError::AllowanceDenied {
            message: message.to_string(),
        });
        self
    }

    /// Fail the version query.
    #[must_use]
    pub fn failing_query(mut self, kind: QueryFailureKind, message: &str) -> Self {
        self.newest = Err(UpgradeError::query(kind, message));
        self
    }

    /// Fail the download.
    #[must_use]
    pub fn failing_download(mut self, message: &str) -> Self {
        self.download = Err(UpgradeError::download(message));
        self
    }

    /// Fail the cleanup.
    #[must_use]
    pub fn failing_cleanup(mut self, message: &str) -> Self {
        self.cleanup = Err(UpgradeError::cleanup(message));
        self
    }

    /// Add an installer step.
    #[must_use]
    pub fn with_installer(mut self, name: &str, program: impl Into<PathBuf>, args: &[&str]) -> Self {
        self.installers.push((
            name.to_string(),
            program.into(),
            args.iter().map(|a| (*a).to_string()).collect(),
        ));
        self
    }

    /// Set whether anonymous version queries are supported.
    #[must_use]
    pub const fn anonymous(mut self, supported: bool) -> Self {
        self.anonymous = supported;
        self
    }

    /// Handle on the calls this backend receives.
    #[must_use]
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl FeedBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_anonymous_version_query(&self) -> bool {
        self.anonymous
    }

    fn upgrade_allowed(&self) -> Result<(), UpgradeError> {
        self.log.push("upgrade_allowed");
        self.allowance.clone()
    }

    fn query_newest_version(&mut self) -> Result<Option<Version>, UpgradeError> {
        self.log.push("query_newest_version");
        self.newest.clone()
    }

    fn download_newest_version(&mut self) -> Result<(), UpgradeError> {
        self.log.push("download_newest_version");
        self.download.clone()
    }

    fn run_installer(&mut self, runner: &mut InstallerRunner<'_>) -> Result<(), UpgradeError> {
        self.log.push("run_installer");
        for (name, program, args) in &self.installers {
            runner.run_step(name, program, args)?;
        }
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), UpgradeError> {
        self.log.push("cleanup");
        self.cleanup.clone()
    }
}

/// Platform strategy that records calls and can simulate failures.
///
/// Does not touch the filesystem.
#[derive(Debug, Default)]
pub struct MockPlatform {
    log: CallLog,
    download_error: Option<io::ErrorKind>,
    application_error: Option<io::ErrorKind>,
}

impl MockPlatform {
    /// Platform where every preparation succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail download directory preparation with `kind`.
    #[must_use]
    pub const fn failing_download_dir(mut self, kind: io::ErrorKind) -> Self {
        self.download_error = Some(kind);
        self
    }

    /// Fail application directory preparation with `kind`.
    #[must_use]
    pub const fn failing_application_dir(mut self, kind: io::ErrorKind) -> Self {
        self.application_error = Some(kind);
        self
    }

    /// Handle on the calls this platform receives.
    #[must_use]
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl PlatformStrategy for MockPlatform {
    fn prepare_download_directory(&self) -> io::Result<()> {
        self.log.push("prepare_download_directory");
        self.download_error.map_or(Ok(()), |kind| Err(io::Error::new(kind, "simulated failure")))
    }

    fn prepare_application_directory(&self) -> io::Result<()> {
        self.log.push("prepare_application_directory");
        self.application_error.map_or(Ok(()), |kind| Err(io::Error::new(kind, "simulated failure")))
    }

    fn upgrader_executable_name(&self) -> &str {
        UPGRADER_EXECUTABLE_NAME
    }
}

/// Copier that always fails with the given error kind.
#[derive(Debug, Clone, Copy)]
pub struct FailingCopier {
    kind: io::ErrorKind,
}

impl FailingCopier {
    /// Copier failing with `kind`.
    #[must_use]
    pub const fn new(kind: io::ErrorKind) -> Self {
        Self {
            kind,
        }
    }
}

impl DirectoryCopier for FailingCopier {
    fn copy(&self, _source: &Path, destination: &Path) -> Result<CopySummary, StagingError> {
        Err(StagingError::from_io(destination, io::Error::new(self.kind, "simulated failure")))
    }
}

/// Locator reporting a fixed directory.
#[derive(Debug, Clone)]
pub struct FixedLocator(pub PathBuf);

impl ProcessLocator for FixedLocator {
    fn current_process_directory(&self) -> io::Result<PathBuf> {
        Ok(self.0.clone())
    }
}

/// Launcher that records programs instead of running them.
#[derive(Debug, Clone, Default)]
pub struct RecordingLauncher {
    log: CallLog,
    exit_code: i32,
    stderr: String,
}

impl RecordingLauncher {
    /// Launcher whose processes exit with code 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher whose processes exit with `code` and print `stderr`.
    #[must_use]
    pub fn exiting_with(code: i32, stderr: &str) -> Self {
        Self {
            log: CallLog::default(),
            exit_code: code,
            stderr: stderr.to_string(),
        }
    }

    /// Handle on the programs launched.
    #[must_use]
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn run(&self, program: &Path, args: &[String]) -> io::Result<ProcessOutput> {
        let mut call = program.display().to_string();
        for arg in args {
            call.push(' ');
            call.push_str(arg);
        }
        self.log.push(call);
        Ok(ProcessOutput {
            exit_code: Some(self.exit_code),
            stderr: self.stderr.clone(),
        })
    }
}

/// Install action wrapper that records step descriptions.
#[derive(Debug, Default)]
pub struct RecordingWrapper {
    /// Descriptions in the order the steps ran
    pub descriptions: Vec<String>,
}

impl InstallActionWrapper for RecordingWrapper {
    fn wrap(&mut self, action: &mut dyn FnMut() -> bool, description: &str) -> bool {
        self.descriptions.push(description.to_string());
        action()
    }
}
