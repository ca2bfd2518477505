//! `remove`: walk a package's own dependencies transitively, drop it (and
//! everything only it needed) from disk and from the manifest/lockfile.
//!
//! Grounded on pacquet's recursive "installed dependency" walk, same
//! shape as the resolver's queue but operating on what is *currently on
//! disk* rather than registry metadata: a removed package's `dependencies`
//! come from its own extracted `package.json`, not a fresh registry fetch,
//! since the whole point is to clean up a previously successful install
//! without re-hitting the network.

use crate::{
    error::PackageManagerError,
    link,
    types::{RemoveReport, Warning},
    PackageManager,
};
use pacm_lockfile::Lockfile;
use pacm_manifest::Manifest;
use std::collections::VecDeque;

pub async fn remove(pm: &PackageManager, names: Vec<String>) -> Result<RemoveReport, PackageManagerError> {
    let mut manifest = Manifest::load(&pm.project_dir)?;
    let mut lockfile = Lockfile::load(&pm.project_dir)?;

    let mut report = RemoveReport::default();
    let mut queue: VecDeque<String> = names.into_iter().collect();
    let mut visited = std::collections::HashSet::new();

    while let Some(name) = queue.pop_front() {
        if !visited.insert(name.clone()) {
            continue;
        }

        let dest_dir = link::dest_dir(&pm.project_dir, &name);
        let package_json = link::read_package_json(&dest_dir);

        let removed_from_manifest = manifest.remove_dependency(pacm_manifest::DependencyGroup::Prod, &name)
            | manifest.remove_dependency(pacm_manifest::DependencyGroup::Dev, &name);
        let removed_from_lockfile = lockfile.remove(&name).is_some();

        if !removed_from_manifest && !removed_from_lockfile && package_json.is_none() {
            report.warnings.push(Warning::new("unknown", format!("{name} is not installed")));
            continue;
        }

        if let Some(package_json) = &package_json {
            let bin_dir = link::bin_dir(&pm.project_dir);
            for bin_name in link::all_bin_names(package_json, &name) {
                pacm_cmd_shim::remove_shim(&bin_dir, &bin_name)?;
            }
            for dependency_name in link::declared_dependencies(package_json).into_keys() {
                queue.push_back(dependency_name);
            }
        }

        pacm_fs::remove_dir_all_if_exists(&dest_dir)
            .map_err(|error| PackageManagerError::Filesystem { path: dest_dir.clone(), error })?;

        report.removed.push(name);
    }

    let node_modules = pm.project_dir.join("node_modules");
    pacm_fs::remove_dir_if_empty(&node_modules)
        .map_err(|error| PackageManagerError::Filesystem { path: node_modules.clone(), error })?;

    manifest.write()?;
    lockfile.write(&pm.project_dir)?;

    Ok(report)
}
