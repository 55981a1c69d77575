//! Blocking facade over an async `reqwest` client.
//!
//! The upgrade pipeline is synchronous, so each [`FeedClient`] owns a small
//! current-thread tokio runtime and resolves every request before returning.
//! It must not be called from inside another tokio runtime.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::constants::{FEED_CONNECT_TIMEOUT, FEED_REQUEST_TIMEOUT};
use crate::upgrade::credentials::Credential;
use crate::upgrade::error::QueryFailureKind;

/// Failure of one feed request.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The feed rejected our credentials (HTTP 401/403).
    #[error("{url} returned {status}; check the feed credentials")]
    Unauthorized {
        /// Requested URL
        url: String,
        /// HTTP status
        status: reqwest::StatusCode,
    },

    /// Any other unsuccessful HTTP status.
    #[error("{url} returned {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status
        status: reqwest::StatusCode,
    },

    /// The request never produced a response (DNS, connect, timeout).
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not what we expected.
    #[error("unexpected response from {url}: {message}")]
    Decode {
        /// Requested URL
        url: String,
        /// Parser error
        message: String,
    },
}

impl FeedError {
    /// Map onto the version-query failure classes.
    #[must_use]
    pub const fn query_kind(&self) -> QueryFailureKind {
        match self {
            Self::Unauthorized { .. } => QueryFailureKind::Authentication,
            Self::Status { .. } | Self::Transport { .. } => QueryFailureKind::Network,
            Self::Decode { .. } => QueryFailureKind::InvalidResponse,
        }
    }
}

/// HTTP client for release feeds.
pub struct FeedClient {
    client: reqwest::Client,
    runtime: Runtime,
    credential: Option<Credential>,
}

impl std::fmt::Debug for FeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient").field("credential", &self.credential).finish_non_exhaustive()
    }
}

impl FeedClient {
    /// Build a client, optionally authenticating every request.
    pub fn new(credential: Option<Credential>) -> anyhow::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let client = {
            let _guard = runtime.enter();
            reqwest::Client::builder()
                .user_agent(concat!("hoist/", env!("CARGO_PKG_VERSION")))
                .connect_timeout(FEED_CONNECT_TIMEOUT)
                .timeout(FEED_REQUEST_TIMEOUT)
                .build()?
        };

        Ok(Self {
            client,
            runtime,
            credential,
        })
    }

    /// Whether requests carry credentials.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    /// GET `url` and decode the body as JSON.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let bytes = self.get_bytes(url)?;
        serde_json::from_slice(&bytes).map_err(|e| FeedError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// GET `url` and return the raw body.
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        self.fetch(url)?.ok_or_else(|| FeedError::Status {
            url: url.to_string(),
            status: reqwest::StatusCode::NOT_FOUND,
        })
    }

    /// GET `url` as text, returning `None` on HTTP 404.
    pub fn get_optional_text(&self, url: &str) -> Result<Option<String>, FeedError> {
        Ok(self.fetch(url)?.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>, FeedError> {
        debug!("GET {}", url);
        self.runtime.block_on(async {
            let mut request = self.client.get(url);
            if let Some(cred) = &self.credential {
                request = request.basic_auth(&cred.username, Some(&cred.password));
            }

            let transport = |source| FeedError::Transport {
                url: url.to_string(),
                source,
            };
            let response = request.send().await.map_err(transport)?;
            let status = response.status();

            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
                return Err(FeedError::Unauthorized {
                    url: url.to_string(),
                    status,
                });
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                return Err(FeedError::Status {
                    url: url.to_string(),
                    status,
                });
            }

            let body = response.bytes().await.map_err(transport)?;
            debug!("Received {} bytes from {}", body.len(), url);
            Ok(Some(body.to_vec()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn server() -> (tokio::runtime::Runtime, MockServer) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        (rt, server)
    }

    #[test]
    fn status_codes_map_to_query_classes() {
        let (rt, server) = server();
        rt.block_on(async {
            Mock::given(path("/secret")).respond_with(ResponseTemplate::new(401)).mount(&server).await;
            Mock::given(path("/broken")).respond_with(ResponseTemplate::new(503)).mount(&server).await;
            Mock::given(path("/garbage"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
                .mount(&server)
                .await;
        });

        let client = FeedClient::new(None).unwrap();
        let secret = client.get_bytes(&format!("{}/secret", server.uri())).unwrap_err();
        let broken = client.get_bytes(&format!("{}/broken", server.uri())).unwrap_err();
        let garbage =
            client.get_json::<serde_json::Value>(&format!("{}/garbage", server.uri())).unwrap_err();

        assert_eq!(secret.query_kind(), QueryFailureKind::Authentication);
        assert_eq!(broken.query_kind(), QueryFailureKind::Network);
        assert_eq!(garbage.query_kind(), QueryFailureKind::InvalidResponse);
    }

    #[test]
    fn missing_resource_is_none_for_optional_text() {
        let (_rt, server) = server();
        let client = FeedClient::new(None).unwrap();

        assert!(client.get_optional_text(&format!("{}/nothing", server.uri())).unwrap().is_none());
    }

    #[test]
    fn credentials_are_sent_as_basic_auth() {
        let (rt, server) = server();
        rt.block_on(
            Mock::given(method("GET"))
                .and(path("/index.json"))
                .and(header_exists("authorization"))
                .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"versions":[]}"#))
                .mount(&server),
        );

        let client = FeedClient::new(Some(Credential {
            username: "PersonalAccessToken".to_string(),
            password: "pat".to_string(),
        }))
        .unwrap();
        assert!(client.is_authenticated());

        let body: serde_json::Value =
            client.get_json(&format!("{}/index.json", server.uri())).unwrap();
        assert_eq!(body["versions"], serde_json::json!([]));
    }

    #[test]
    fn unreachable_host_is_network_class() {
        let client = FeedClient::new(None).unwrap();
        let err = client.get_bytes("http://127.0.0.1:9/unreachable").unwrap_err();
        assert_eq!(err.query_kind(), QueryFailureKind::Network);
    }
}
