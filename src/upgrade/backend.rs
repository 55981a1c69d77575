//! The feed backend capability and the installer step runner.
//!
//! A [`FeedBackend`] knows how to talk to one kind of release feed. The
//! orchestrator owns exactly one boxed backend for its whole lifetime and
//! calls it once per phase.
//!
//! Installer steps are not run by the backend directly. The backend hands
//! each step to an [`InstallerRunner`], which wraps the spawn in the
//! caller-supplied [`InstallActionWrapper`] so that the CLI (spinner) or a
//! test (recorder) brackets every step the same way.

use semver::Version;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{error, info};

use crate::upgrade::error::UpgradeError;

/// A pluggable release feed.
pub trait FeedBackend {
    /// Short name used in logs and selector messages.
    fn name(&self) -> &str;

    /// Whether the newest version can be queried without credentials.
    fn supports_anonymous_version_query(&self) -> bool;

    /// Decide whether an upgrade is permitted right now.
    fn upgrade_allowed(&self) -> Result<(), UpgradeError>;

    /// Query the newest version, returning `None` when nothing newer than the
    /// installed version is available.
    fn query_newest_version(&mut self) -> Result<Option<Version>, UpgradeError>;

    /// Fetch the newest version's payload into the download directory.
    fn download_newest_version(&mut self) -> Result<(), UpgradeError>;

    /// Run every installer step of the downloaded payload through `runner`.
    fn run_installer(&mut self, runner: &mut InstallerRunner<'_>) -> Result<(), UpgradeError>;

    /// Remove download artifacts.
    fn cleanup(&mut self) -> Result<(), UpgradeError>;
}

/// Brackets each mutating install step.
///
/// Receives the step as a zero-argument action and a human-readable
/// description. Implementations must call the action at most once and
/// return its result, possibly after reporting around it.
pub trait InstallActionWrapper {
    /// Run `action`, reporting it as `description`.
    fn wrap(&mut self, action: &mut dyn FnMut() -> bool, description: &str) -> bool;
}

impl<F> InstallActionWrapper for F
where
    F: FnMut(&mut dyn FnMut() -> bool, &str) -> bool,
{
    fn wrap(&mut self, action: &mut dyn FnMut() -> bool, description: &str) -> bool {
        self(action, description)
    }
}

/// Exit status and error output of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    /// Everything the process wrote to stderr
    pub stderr: String,
}

impl ProcessOutput {
    /// Whether the process exited with code zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }
}

/// Starts external programs and waits for them.
pub trait ProcessLauncher {
    /// Run `program` with `args` to completion.
    fn run(&self, program: &Path, args: &[String]) -> io::Result<ProcessOutput>;
}

/// [`ProcessLauncher`] built on [`std::process::Command`].
///
/// stdout is inherited so installer progress reaches the terminal; stderr is
/// captured for error reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessLauncher;

impl ProcessLauncher for SystemProcessLauncher {
    fn run(&self, program: &Path, args: &[String]) -> io::Result<ProcessOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Runs installer steps on behalf of a backend.
///
/// Built by the orchestrator for the `InstallerRun` phase. In dry-run mode
/// each step is still passed through the wrapper, but its action only logs
/// the command it would have run.
pub struct InstallerRunner<'a> {
    wrapper: &'a mut dyn InstallActionWrapper,
    launcher: &'a dyn ProcessLauncher,
    dry_run: bool,
    upgrade_id: &'a str,
    steps: usize,
}

impl<'a> InstallerRunner<'a> {
    /// Create a runner.
    pub fn new(
        wrapper: &'a mut dyn InstallActionWrapper,
        launcher: &'a dyn ProcessLauncher,
        dry_run: bool,
        upgrade_id: &'a str,
    ) -> Self {
        Self {
            wrapper,
            launcher,
            dry_run,
            upgrade_id,
            steps: 0,
        }
    }

    /// Whether this runner only simulates steps.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Number of steps handed to the wrapper so far.
    #[must_use]
    pub const fn steps_run(&self) -> usize {
        self.steps
    }

    /// Run one installer step through the wrapper.
    ///
    /// A spawn error, a non-zero exit, or the wrapper reporting failure
    /// becomes [`UpgradeError::InstallerFailed`] carrying the exit code and
    /// captured stderr when available.
    pub fn run_step(
        &mut self,
        name: &str,
        program: &Path,
        args: &[String],
    ) -> Result<(), UpgradeError> {
        let launcher = self.launcher;
        let dry_run = self.dry_run;
        let upgrade_id = self.upgrade_id;
        let mut failure: Option<String> = None;

        let mut action = || {
            if dry_run {
                info!("Dry run: would run {} {}", program.display(), args.join(" "));
                return true;
            }
            match launcher.run(program, args) {
                Ok(output) if output.success() => true,
                Ok(output) => {
                    let code = output
                        .exit_code
                        .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"));
                    failure = Some(if output.stderr.is_empty() {
                        code
                    } else {
                        format!("{code}: {}", output.stderr)
                    });
                    false
                }
                Err(e) => {
                    error!(
                        upgrade_id,
                        method = "run_installer",
                        exception = ?e,
                        "Failed to start installer {}",
                        program.display()
                    );
                    failure = Some(format!("could not start {}: {e}", program.display()));
                    false
                }
            }
        };

        let description = format!("Running {name}");
        let succeeded = self.wrapper.wrap(&mut action, &description);
        self.steps += 1;

        if succeeded {
            Ok(())
        } else {
            Err(UpgradeError::InstallerFailed {
                name: name.to_string(),
                message: failure.unwrap_or_else(|| "step reported failure".to_string()),
            })
        }
    }
}
