//! `pacm.lockp`: the project lockfile.
//!
//! Grounded on pacquet's `pacquet-lockfile`, but this is a far simpler
//! document than pnpm's full snapshot format (no per-importer snapshots, no
//! transitive graph, no `packages:`/`snapshots:` split) — only *direct*
//! dependencies are recorded, each carrying its own flattened
//! `dependencies`/`peerDependencies` ranges. This module keeps pacquet's
//! `derive_more`+`miette` error shape and atomic-write discipline, but the
//! document shape itself is written fresh.

mod entry;
mod error;
mod ordered_map;

pub use entry::LockEntry;
pub use error::LockfileError;
pub use ordered_map::OrderedMap;

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub const LOCKFILE_FILE_NAME: &str = "pacm.lockp";

/// Which top-level map a direct entry belongs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyGroup {
    Prod,
    Dev,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub dependencies: OrderedMap<LockEntry>,
    #[serde(default, rename = "devDependencies", skip_serializing_if = "OrderedMap::is_empty")]
    pub dev_dependencies: OrderedMap<LockEntry>,
}

impl Lockfile {
    /// Load `<project_dir>/pacm.lockp`, treating a missing file or
    /// whitespace-only content as an empty lockfile.
    pub fn load(project_dir: &Path) -> Result<Self, LockfileError> {
        let path = project_dir.join(LOCKFILE_FILE_NAME);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Lockfile::default()),
            Err(error) => return Err(LockfileError::Read { path, error }),
        };
        if content.trim().is_empty() {
            return Ok(Lockfile::default());
        }
        serde_json::from_str(&content).map_err(|error| LockfileError::Parse { path, error })
    }

    pub fn group(&self, group: DependencyGroup) -> &OrderedMap<LockEntry> {
        match group {
            DependencyGroup::Prod => &self.dependencies,
            DependencyGroup::Dev => &self.dev_dependencies,
        }
    }

    pub fn group_mut(&mut self, group: DependencyGroup) -> &mut OrderedMap<LockEntry> {
        match group {
            DependencyGroup::Prod => &mut self.dependencies,
            DependencyGroup::Dev => &mut self.dev_dependencies,
        }
    }

    /// Remove `name` from whichever group it's recorded under. Returns the
    /// group it was removed from, if any.
    pub fn remove(&mut self, name: &str) -> Option<DependencyGroup> {
        if self.dependencies.remove(name).is_some() {
            return Some(DependencyGroup::Prod);
        }
        if self.dev_dependencies.remove(name).is_some() {
            return Some(DependencyGroup::Dev);
        }
        None
    }

    /// All direct names across both groups, `dependencies` first, each in
    /// its on-disk order — the desired-set fallback when installing with no
    /// explicit specs.
    pub fn direct_names(&self) -> Vec<(String, DependencyGroup)> {
        self.dependencies
            .keys()
            .map(|name| (name.to_string(), DependencyGroup::Prod))
            .chain(self.dev_dependencies.keys().map(|name| (name.to_string(), DependencyGroup::Dev)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.dev_dependencies.is_empty()
    }

    /// Serialize pretty-printed with two-space indent and write atomically.
    pub fn write(&self, project_dir: &Path) -> Result<(), LockfileError> {
        let path = project_dir.join(LOCKFILE_FILE_NAME);
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(
            &mut buf,
            serde_json::ser::PrettyFormatter::with_indent(b"  "),
        );
        serde::Serialize::serialize(self, &mut serializer)
            .map_err(|error| LockfileError::Parse { path: path.clone(), error })?;
        pacm_fs::atomic_write(&path, &buf)?;
        Ok(())
    }
}
