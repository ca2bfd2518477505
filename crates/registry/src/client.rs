//! Registry HTTP client: one memoized GET per package name, retried on
//! transient connection resets, shared across concurrent resolutions of the
//! same package via a single-flight cache.
//!
//! Grounded on pacquet's `HttpClient` (which memoized via
//! `elsa::FrozenMap`, unavailable in this rewrite's dependency set, and
//! retried via `reqwest-retry`'s middleware, likewise unavailable) — the
//! memoization shape is kept, implemented with `dashmap` + `tokio::OnceCell`
//! the same way `pacm-cache` dedups tarball downloads, and the retry loop is
//! hand-rolled around a predicate that only retries resets, not every error.

use crate::{error::RegistryError, metadata::PackageMetadata};
use dashmap::DashMap;
use std::{error::Error as StdError, io, sync::Arc};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// True if `error`'s source chain bottoms out in a TCP reset or abort —
/// the only failures worth a same-request retry. Anything else (404, bad
/// JSON, DNS failure) is retried by asking the user to re-run the command,
/// not by us guessing again.
pub fn is_transient_reset(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = source {
        if let Some(io_error) = err.downcast_ref::<io::Error>() {
            if matches!(io_error.kind(), io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted)
            {
                return true;
            }
        }
        source = err.source();
    }
    false
}

#[derive(Debug)]
pub struct RegistryClient {
    http_client: reqwest::Client,
    base_url: String,
    max_attempts: u8,
    cache: DashMap<String, Arc<OnceCell<Result<Arc<PackageMetadata>, Arc<RegistryError>>>>>,
}

impl RegistryClient {
    pub fn new(base_url: String, max_attempts: u8) -> Self {
        RegistryClient {
            http_client: reqwest::Client::new(),
            base_url,
            max_attempts: max_attempts.max(1),
            cache: DashMap::new(),
        }
    }

    /// Fetch (and memoize) the metadata document for `name`. Concurrent
    /// callers asking for the same package share one request.
    pub async fn metadata(&self, name: &str) -> Result<Arc<PackageMetadata>, Arc<RegistryError>> {
        let cell = self.cache.entry(name.to_string()).or_insert_with(|| Arc::new(OnceCell::new())).clone();
        cell.get_or_init(|| async { self.fetch_with_retry(name).await.map(Arc::new).map_err(Arc::new) })
            .await
            .clone()
    }

    async fn fetch_with_retry(&self, name: &str) -> Result<PackageMetadata, RegistryError> {
        let url = format!("{}{}", self.base_url, encode_package_name(name));
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = self.fetch_once(name, &url).await;
            match outcome {
                Ok(metadata) => return Ok(metadata),
                Err(RegistryError::Network { error, name }) if attempt < self.max_attempts && is_transient_reset(&error) => {
                    warn!(%name, attempt, "transient connection reset, retrying");
                    continue;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn fetch_once(&self, name: &str, url: &str) -> Result<PackageMetadata, RegistryError> {
        debug!(%name, %url, "fetching package metadata");
        let response = self
            .http_client
            .get(url)
            .header("user-agent", "pacm-cli")
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|error| RegistryError::Network { name: name.to_string(), error })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status { name: name.to_string(), status });
        }

        response
            .json::<PackageMetadata>()
            .await
            .map_err(|error| RegistryError::Deserialize { name: name.to_string(), error })
    }
}

/// `@scope/name` must be percent-encoded as `@scope%2fname` for npm's
/// registry metadata endpoint.
fn encode_package_name(name: &str) -> String {
    name.replacen('/', "%2f", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_scoped_names() {
        assert_eq!(encode_package_name("@fastify/error"), "@fastify%2ferror");
        assert_eq!(encode_package_name("left-pad"), "left-pad");
    }

    #[tokio::test]
    async fn fetches_and_memoizes_metadata() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "name": "left-pad",
            "dist-tags": { "latest": "1.3.0" },
            "versions": {
                "1.3.0": {
                    "name": "left-pad",
                    "version": "1.3.0",
                    "dist": { "tarball": "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz" }
                }
            }
        });
        let mock = server
            .mock("GET", "/left-pad")
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(1)
            .create_async()
            .await;

        let client = RegistryClient::new(format!("{}/", server.url()), 3);
        let first = client.metadata("left-pad").await.unwrap();
        let second = client.metadata("left-pad").await.unwrap();
        assert_eq!(first.name, "left-pad");
        assert!(Arc::ptr_eq(&first, &second));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn surfaces_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/missing-package").with_status(404).create_async().await;
        let client = RegistryClient::new(format!("{}/", server.url()), 1);
        let error = client.metadata("missing-package").await.unwrap_err();
        assert!(matches!(*error, RegistryError::Status { .. }));
        mock.assert_async().await;
    }
}
