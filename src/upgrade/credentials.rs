//! Credentials for authenticated feed access.

use anyhow::Result;
use std::fmt;

use crate::constants::{DEFAULT_FEED_USER, FEED_TOKEN_ENV, FEED_USER_ENV};

/// Username and secret sent with feed requests as HTTP basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Username, often a fixed placeholder for token-based feeds
    pub username: String,
    /// Token or password
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Source of credentials for a feed URL.
pub trait CredentialStore {
    /// Credential to use for `url`, or `None` to query anonymously.
    fn credential_for(&self, url: &str) -> Result<Option<Credential>>;
}

/// Reads a personal access token from the environment.
///
/// `HOIST_FEED_TOKEN` holds the token; `HOIST_FEED_USER` optionally
/// overrides the username.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialStore;

impl CredentialStore for EnvCredentialStore {
    fn credential_for(&self, _url: &str) -> Result<Option<Credential>> {
        let Ok(token) = std::env::var(FEED_TOKEN_ENV) else {
            return Ok(None);
        };
        if token.trim().is_empty() {
            return Ok(None);
        }
        let username =
            std::env::var(FEED_USER_ENV).unwrap_or_else(|_| DEFAULT_FEED_USER.to_string());
        Ok(Some(Credential {
            username,
            password: token,
        }))
    }
}

/// Store that never has credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousCredentialStore;

impl CredentialStore for AnonymousCredentialStore {
    fn credential_for(&self, _url: &str) -> Result<Option<Credential>> {
        Ok(None)
    }
}
