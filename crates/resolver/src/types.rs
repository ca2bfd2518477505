use node_semver::Version;
use std::collections::{HashMap, HashSet};

/// Whether a direct dependency came from `dependencies` or `devDependencies`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyCategory {
    Prod,
    Dev,
}

/// One resolved, concrete-version package in the resolved set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: Version,
    pub tarball_url: String,
    pub integrity: Option<String>,
    pub dependencies: HashMap<String, String>,
    pub peer_dependencies: HashMap<String, String>,
    pub optional_dependencies: HashMap<String, String>,
    pub os: Option<Vec<String>>,
    pub cpu: Option<Vec<String>>,
}

impl ResolvedPackage {
    /// De-duplication key. Compares the version by its string form rather
    /// than `node_semver::Version` directly, since the latter's `Hash` impl
    /// isn't part of its documented public contract.
    pub fn key(&self) -> (String, String) {
        (self.name.clone(), self.version.to_string())
    }
}

/// Output of a resolve operation: an insertion-ordered sequence of resolved
/// packages plus the two distinguished direct-dependency partitions.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSet {
    packages: Vec<ResolvedPackage>,
    seen: HashSet<(String, String)>,
    /// `(alias, name, version)` triples the user asked for directly, in
    /// `dependencies`. The version is the exact one this direct spec's own
    /// resolution picked, which may differ from another `ResolvedPackage` of
    /// the same `name` reached transitively elsewhere ("last writer wins" in
    /// the flat `node_modules` layout) — the lockfile and install code need
    /// to know which concrete version *this* direct entry meant, not just
    /// its name.
    pub direct_prod: Vec<(String, String, Version)>,
    /// `(alias, name, version)` triples the user asked for directly, in `devDependencies`.
    pub direct_dev: Vec<(String, String, Version)>,
    /// Optional dependencies whose platform check failed or whose metadata
    /// could not be fetched, recorded for reporting rather than silently
    /// dropped.
    pub skipped_optional: Vec<SkippedOptional>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedOptional {
    pub name: String,
    pub range: String,
    pub reason: String,
}

impl ResolvedSet {
    pub fn contains(&self, name: &str, version: &Version) -> bool {
        self.seen.contains(&(name.to_string(), version.to_string()))
    }

    /// Insert `package`, returning `false` if `(name, version)` was already
    /// present (the resolver's de-duplication invariant: never resolve the
    /// same concrete version twice).
    pub fn insert(&mut self, package: ResolvedPackage) -> bool {
        let key = package.key();
        if !self.seen.insert(key) {
            return false;
        }
        self.packages.push(package);
        true
    }

    pub fn packages(&self) -> &[ResolvedPackage] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
