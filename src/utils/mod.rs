//! Terminal helpers for the hoist command line.
//!
//! - [`progress`]: spinner wrapper around installer steps

pub mod progress;

pub use progress::StepSpinner;
