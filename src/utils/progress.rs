//! Progress indicators for long-running upgrade steps
//!
//! Installer steps can take minutes, so `hoist upgrade --confirm` wraps each
//! one in a spinner. The spinner is hidden when:
//! - `--no-progress` is passed
//! - `HOIST_NO_PROGRESS` is set
//!
//! ```rust,no_run
//! use hoist_cli::upgrade::InstallActionWrapper;
//! use hoist_cli::utils::progress::StepSpinner;
//!
//! let mut spinner = StepSpinner::new(false);
//! let ok = spinner.wrap(&mut || true, "Running installer");
//! assert!(ok);
//! ```

use colored::Colorize;
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

use crate::constants::NO_PROGRESS_ENV;
use crate::upgrade::InstallActionWrapper;

/// Whether progress output is disabled through the environment.
#[must_use]
pub fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV).is_ok()
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

/// Install action wrapper that shows a spinner while each step runs.
///
/// Finished steps stay on screen with a check mark or a cross. With progress
/// disabled the outcome lines are still printed so scripts see each step.
#[derive(Debug)]
pub struct StepSpinner {
    hidden: bool,
    steps: usize,
}

impl StepSpinner {
    /// Spinner wrapper; `no_progress` hides the animation.
    #[must_use]
    pub fn new(no_progress: bool) -> Self {
        Self {
            hidden: no_progress || is_progress_disabled(),
            steps: 0,
        }
    }

    /// Number of steps wrapped so far.
    #[must_use]
    pub const fn steps(&self) -> usize {
        self.steps
    }

    fn start(&self, description: &str) -> IndicatifBar {
        if self.hidden {
            return IndicatifBar::hidden();
        }
        let bar = IndicatifBar::new_spinner();
        bar.set_style(spinner_style());
        bar.set_prefix(format!("[{}]", self.steps));
        bar.set_message(description.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

impl InstallActionWrapper for StepSpinner {
    fn wrap(&mut self, action: &mut dyn FnMut() -> bool, description: &str) -> bool {
        self.steps += 1;
        let bar = self.start(description);
        let succeeded = action();
        bar.finish_and_clear();

        if succeeded {
            println!("{} {description}", "✓".green());
        } else {
            println!("{} {description}", "✗".red());
        }
        succeeded
    }
}
