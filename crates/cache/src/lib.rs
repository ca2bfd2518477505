//! Content-addressed tarball cache: downloads a package's tarball once per
//! `(name, version)`, verifies it against its registry-supplied integrity
//! string, and keeps it at `{cache_dir}/{safe_name}/{version}.tgz` so a later
//! install of the same version reuses the bytes already on disk.
//!
//! Grounded on pacquet's tarball/store-dir/cafs crates, but deliberately
//! simpler: those build a file-level content-addressed store so identical
//! *files* across packages can be hardlinked into a virtual store, which this
//! rewrite's flat `node_modules` layout has no use for (symlinked virtual
//! stores are explicitly out of scope here). What's kept is the *shape* of the idea:
//! one cache entry per tarball, looked up by content identity, fetched at
//! most once concurrently.

mod error;
mod extract;
mod fetch;

pub use error::CacheError;

use dashmap::DashMap;
use pacm_network::Throttle;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

fn safe_name(name: &str) -> String {
    name.replace('/', "_")
}

/// Manages the on-disk tarball cache and in-flight download dedup.
#[derive(Debug)]
pub struct CacheStore {
    cache_dir: PathBuf,
    http_client: reqwest::Client,
    max_attempts: u8,
    throttle: Throttle,
    inflight: DashMap<(String, String), Arc<OnceCell<Result<PathBuf, Arc<CacheError>>>>>,
}

impl CacheStore {
    pub fn new(cache_dir: PathBuf, max_attempts: u8) -> Self {
        CacheStore {
            cache_dir,
            http_client: reqwest::Client::new(),
            max_attempts: max_attempts.max(1),
            throttle: Throttle::default(),
            inflight: DashMap::new(),
        }
    }

    /// Path a tarball for `name`@`version` would be cached at, regardless of
    /// whether it has been downloaded yet.
    pub fn tarball_path(&self, name: &str, version: &str) -> PathBuf {
        self.cache_dir.join(safe_name(name)).join(format!("{version}.tgz"))
    }

    /// Ensure the tarball for `name`@`version` is present in the cache,
    /// downloading and integrity-checking it from `url` if necessary.
    /// Concurrent calls for the same `(name, version)` share one download.
    #[instrument(skip(self, url, integrity))]
    pub async fn ensure_tarball(
        &self,
        name: &str,
        version: &str,
        url: &str,
        integrity: &str,
    ) -> Result<PathBuf, Arc<CacheError>> {
        let key = (name.to_string(), version.to_string());
        let cell = self.inflight.entry(key).or_insert_with(|| Arc::new(OnceCell::new())).clone();

        cell.get_or_init(|| async {
            self.download_and_store(name, version, url, integrity).await.map_err(Arc::new)
        })
        .await
        .clone()
    }

    async fn download_and_store(
        &self,
        name: &str,
        version: &str,
        url: &str,
        integrity: &str,
    ) -> Result<PathBuf, CacheError> {
        let cached_path = self.tarball_path(name, version);
        if cached_path.is_file() {
            debug!(%name, %version, "tarball already cached");
            return Ok(cached_path);
        }

        let data = self
            .throttle
            .run(fetch::download(&self.http_client, url, self.max_attempts))
            .await?;
        fetch::verify_integrity(url, &data, integrity)?;

        pacm_fs::atomic_write(&cached_path, &data).map_err(CacheError::AtomicWrite)?;
        Ok(cached_path)
    }

    /// Extract a cached tarball into `dest`, replacing any prior contents.
    #[instrument(skip(self))]
    pub async fn extract(&self, tarball_path: &Path, dest: &Path) -> Result<(), CacheError> {
        let data = tokio::fs::read(tarball_path)
            .await
            .map_err(|error| CacheError::Io { path: tarball_path.to_path_buf(), error })?;
        let decompressed = extract::decompress_gzip(tarball_path, &data)?;
        let tarball_path = tarball_path.to_path_buf();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || extract::extract_tar(&tarball_path, &decompressed, &dest))
            .await
            .expect("extraction task panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tarball_path_escapes_scoped_names() {
        let store = CacheStore::new(PathBuf::from("/tmp/pacm-cache-test"), 3);
        assert_eq!(
            store.tarball_path("@fastify/error", "3.3.0"),
            PathBuf::from("/tmp/pacm-cache-test/@fastify_error/3.3.0.tgz")
        );
    }

    #[tokio::test]
    async fn ensure_tarball_downloads_once_and_caches() {
        let mut server = mockito::Server::new_async().await;
        let body = b"fake tarball bytes";
        let integrity =
            ssri::IntegrityOpts::new().algorithm(ssri::Algorithm::Sha512).chain(body).result().to_string();
        let mock = server.mock("GET", "/left-pad/-/left-pad-1.0.0.tgz").with_body(body).create_async().await;

        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().to_path_buf(), 3);
        let url = format!("{}/left-pad/-/left-pad-1.0.0.tgz", server.url());

        let path = store.ensure_tarball("left-pad", "1.0.0", &url, &integrity).await.unwrap();
        assert!(path.is_file());
        assert_eq!(std::fs::read(&path).unwrap(), body);

        // A second call should not hit the network again.
        let path_again = store.ensure_tarball("left-pad", "1.0.0", &url, &integrity).await.unwrap();
        assert_eq!(path, path_again);
        mock.assert_async().await;
    }
}
