//! Core types shared by the hoist command line
//!
//! Currently the error layer: [`HoistError`] for typed failures and
//! [`user_friendly_error`] for rendering any command failure with
//! a suggestion the user can act on.

pub mod error;

pub use error::{ErrorContext, HoistError, user_friendly_error};
