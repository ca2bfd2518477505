//! Download a tarball and verify it against its `dist.integrity` string.
//!
//! Grounded on pacquet's tarball crate's `verify_checksum`, generalized
//! to recompute whichever of the three algorithm prefixes npm uses
//! (`sha1-`, `sha256-`, `sha512-`) instead of only handling sha1/sha512.

use crate::error::CacheError;
use ssri::{Algorithm, IntegrityOpts};
use std::error::Error as StdError;
use std::io;
use tracing::warn;

/// True if `error`'s source chain bottoms out in a TCP reset or abort —
/// the only failures worth a same-request retry.
fn is_transient_reset(error: &reqwest::Error) -> bool {
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

/// Download `url`'s bytes, retrying up to `max_attempts` times on a
/// transient connection reset.
pub(crate) async fn download(
    http_client: &reqwest::Client,
    url: &str,
    max_attempts: u8,
) -> Result<Vec<u8>, CacheError> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match download_once(http_client, url).await {
            Ok(bytes) => return Ok(bytes),
            Err(CacheError::Download { url, error }) if attempt < max_attempts && is_transient_reset(&error) => {
                warn!(%url, attempt, "transient connection reset, retrying download");
            }
            Err(error) => return Err(error),
        }
    }
}

async fn download_once(http_client: &reqwest::Client, url: &str) -> Result<Vec<u8>, CacheError> {
    let response = http_client
        .get(url)
        .send()
        .await
        .map_err(|error| CacheError::Download { url: url.to_string(), error })?
        .error_for_status()
        .map_err(|error| CacheError::Download { url: url.to_string(), error })?
        .bytes()
        .await
        .map_err(|error| CacheError::Download { url: url.to_string(), error })?;
    Ok(response.to_vec())
}

fn algorithm_of(integrity: &str) -> Result<Algorithm, CacheError> {
    if integrity.starts_with("sha512-") {
        Ok(Algorithm::Sha512)
    } else if integrity.starts_with("sha256-") {
        Ok(Algorithm::Sha256)
    } else if integrity.starts_with("sha1-") {
        Ok(Algorithm::Sha1)
    } else {
        Err(CacheError::BadIntegrity { integrity: integrity.to_string() })
    }
}

pub(crate) fn verify_integrity(url: &str, data: &[u8], integrity: &str) -> Result<(), CacheError> {
    let algorithm = algorithm_of(integrity)?;
    let actual = IntegrityOpts::new().algorithm(algorithm).chain(data).result().to_string();
    if actual != integrity {
        return Err(CacheError::IntegrityMismatch {
            url: url.to_string(),
            expected: integrity.to_string(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_sha512() {
        let data = b"hello world";
        let integrity = IntegrityOpts::new().algorithm(Algorithm::Sha512).chain(data).result().to_string();
        verify_integrity("http://example.test/x.tgz", data, &integrity).unwrap();
    }

    #[test]
    fn rejects_mismatched_integrity() {
        let data = b"hello world";
        let other = IntegrityOpts::new()
            .algorithm(Algorithm::Sha512)
            .chain(b"not the same bytes")
            .result()
            .to_string();
        assert!(verify_integrity("http://example.test/x.tgz", data, &other).is_err());
    }

    #[test]
    fn rejects_unparseable_integrity() {
        assert!(
            verify_integrity("http://example.test/x.tgz", b"data", "not-an-integrity-string")
                .is_err()
        );
    }

    #[tokio::test]
    async fn does_not_retry_non_transient_failures() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/missing.tgz").with_status(404).expect(1).create_async().await;

        let client = reqwest::Client::new();
        let url = format!("{}/missing.tgz", server.url());
        let error = download(&client, &url, 3).await.unwrap_err();
        assert!(matches!(error, CacheError::Download { .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn downloads_successfully_on_first_attempt() {
        let mut server = mockito::Server::new_async().await;
        let body = b"tarball bytes";
        let mock = server.mock("GET", "/ok.tgz").with_body(body).expect(1).create_async().await;

        let client = reqwest::Client::new();
        let url = format!("{}/ok.tgz", server.url());
        let bytes = download(&client, &url, 3).await.unwrap();
        assert_eq!(bytes, body);
        mock.assert_async().await;
    }
}
