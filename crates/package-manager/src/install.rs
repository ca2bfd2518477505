//! Install and update orchestration: desired-set assembly, resolution,
//! concurrent materialization, shimming, post-install hooks, and the final
//! manifest/lockfile write.
//!
//! Grounded on pacquet's `package_manager::install`/`install_without_lockfile`
//! family for the overall shape (load manifest+lockfile, resolve, fetch and
//! link concurrently, write back at the end), reworked around this crate's
//! flat `node_modules` layout and the simpler `pacm-lockfile` document.

use crate::{
    error::PackageManagerError,
    link,
    types::{InstallReport, Warning},
    PackageManager,
};
use node_semver::Version;
use pacm_lockfile::{DependencyGroup as LockGroup, LockEntry, Lockfile};
use pacm_manifest::{DependencyGroup as ManifestGroup, Manifest};
use pacm_network::Throttle;
use pacm_registry::PackageSpec;
use pacm_resolver::{DependencyCategory, ResolvedPackage, ResolvedSet};
use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    sync::Arc,
};
use tokio::task::JoinSet;
use tracing::warn;

enum OperationKind {
    Install,
    Update,
}

/// Resolve `specs` (or fall back to the lockfile's direct entries, or the
/// manifest's), materialize every resolved package, and persist the
/// manifest and lockfile.
pub async fn install(
    pm: &PackageManager,
    specs: Vec<String>,
    dev: bool,
    force: bool,
) -> Result<InstallReport, PackageManagerError> {
    let manifest = Manifest::load(&pm.project_dir)?;
    let lockfile = Lockfile::load(&pm.project_dir)?;

    if specs.is_empty() && !force && lockfile_satisfied_on_disk(&lockfile, &pm.project_dir) {
        return Ok(already_installed_report(&lockfile));
    }

    let desired = if specs.is_empty() {
        desired_from_lockfile_or_manifest(&lockfile, &manifest)?
    } else {
        let category = if dev { DependencyCategory::Dev } else { DependencyCategory::Prod };
        specs.iter().map(|spec| parse_spec(spec).map(|spec| (spec, category))).collect::<Result<Vec<_>, _>>()?
    };

    run(pm, manifest, lockfile, desired, force, OperationKind::Install).await
}

/// True when the lockfile is non-empty and every direct entry's
/// `node_modules/<name>/package.json.version` already matches the version
/// it pins, so a no-args reinstall can skip resolution (and therefore every
/// registry request) entirely.
fn lockfile_satisfied_on_disk(lockfile: &Lockfile, project_dir: &std::path::Path) -> bool {
    if lockfile.is_empty() {
        return false;
    }
    lockfile.direct_names().iter().all(|(name, group)| {
        let Some(entry) = lockfile.group(*group).get(name) else { return false };
        let dest_dir = link::dest_dir(project_dir, name);
        link::installed_version(&dest_dir).as_deref() == Some(entry.version.to_string().as_str())
    })
}

fn already_installed_report(lockfile: &Lockfile) -> InstallReport {
    let mut report = InstallReport::default();
    report.already_installed = lockfile.direct_names().into_iter().map(|(name, _)| name).collect();
    report
}

/// Like install, but a name absent from the current manifest is reported
/// *not-installed* rather than added.
pub async fn update(
    pm: &PackageManager,
    names: Vec<String>,
    force: bool,
) -> Result<InstallReport, PackageManagerError> {
    let manifest = Manifest::load(&pm.project_dir)?;
    let lockfile = Lockfile::load(&pm.project_dir)?;

    let mut not_installed = Vec::new();
    let desired = if names.is_empty() {
        desired_from_lockfile_or_manifest(&lockfile, &manifest)?
    } else {
        let mut desired = Vec::new();
        for name in names {
            match find_manifest_entry(&manifest, &name) {
                Some((group, range)) => {
                    let category = manifest_group_to_category(group);
                    desired.push((PackageSpec { alias: name.clone(), name, range }, category));
                }
                None => not_installed.push(name),
            }
        }
        desired
    };

    let mut report = run(pm, manifest, lockfile, desired, force, OperationKind::Update).await?;
    report.not_installed.extend(not_installed);
    Ok(report)
}

fn parse_spec(text: &str) -> Result<PackageSpec, PackageManagerError> {
    PackageSpec::parse(text).map_err(|error| PackageManagerError::BadSpec {
        spec: text.to_string(),
        reason: error.to_string(),
    })
}

fn find_manifest_entry(manifest: &Manifest, name: &str) -> Option<(ManifestGroup, String)> {
    for group in [ManifestGroup::Prod, ManifestGroup::Dev] {
        if let Some((_, range)) = manifest.dependencies(group).into_iter().find(|(n, _)| n == name) {
            return Some((group, range));
        }
    }
    None
}

fn manifest_group_to_category(group: ManifestGroup) -> DependencyCategory {
    match group {
        ManifestGroup::Prod => DependencyCategory::Prod,
        ManifestGroup::Dev => DependencyCategory::Dev,
    }
}

fn category_to_manifest_group(category: DependencyCategory) -> ManifestGroup {
    match category {
        DependencyCategory::Prod => ManifestGroup::Prod,
        DependencyCategory::Dev => ManifestGroup::Dev,
    }
}

fn category_to_lock_group(category: DependencyCategory) -> LockGroup {
    match category {
        DependencyCategory::Prod => LockGroup::Prod,
        DependencyCategory::Dev => LockGroup::Dev,
    }
}

fn lock_group_to_category(group: LockGroup) -> DependencyCategory {
    match group {
        LockGroup::Prod => DependencyCategory::Prod,
        LockGroup::Dev => DependencyCategory::Dev,
    }
}

/// The desired-set fallback for a no-args `install`: the lockfile's direct
/// entries if it is non-empty, else the manifest's dependency maps, else an
/// error.
/// When the lockfile is non-empty, every direct entry resolves to the
/// version the lockfile already pinned it to, not the manifest's declared
/// range — a no-args reinstall must never silently upgrade past what was
/// locked, and pinning to an exact version lets the resolver satisfy the
/// request from the already-populated cache without a fresh registry
/// request.
fn desired_from_lockfile_or_manifest(
    lockfile: &Lockfile,
    manifest: &Manifest,
) -> Result<Vec<(PackageSpec, DependencyCategory)>, PackageManagerError> {
    if !lockfile.is_empty() {
        let mut desired = Vec::new();
        for (name, lock_group) in lockfile.direct_names() {
            let category = lock_group_to_category(lock_group);
            let range = lockfile
                .group(lock_group)
                .get(&name)
                .map(|entry| entry.version.to_string())
                .unwrap_or_else(|| "latest".to_string());
            desired.push((PackageSpec { alias: name.clone(), name, range }, category));
        }
        return Ok(desired);
    }

    let mut desired = Vec::new();
    for (name, range) in manifest.dependencies(ManifestGroup::Prod) {
        desired.push((PackageSpec { alias: name.clone(), name, range }, DependencyCategory::Prod));
    }
    for (name, range) in manifest.dependencies(ManifestGroup::Dev) {
        desired.push((PackageSpec { alias: name.clone(), name, range }, DependencyCategory::Dev));
    }

    if desired.is_empty() {
        return Err(PackageManagerError::NothingToInstall);
    }
    Ok(desired)
}

/// `(name, version) -> alias` for every direct dependency, so a transitive
/// package (which always lands under its own `name`) can be told apart from
/// a direct one the user aliased to a different `destDir` name.
fn build_alias_map(resolved: &ResolvedSet) -> HashMap<(String, String), String> {
    resolved
        .direct_prod
        .iter()
        .chain(&resolved.direct_dev)
        .map(|(alias, name, version)| ((name.clone(), version.to_string()), alias.clone()))
        .collect()
}

/// The flat `node_modules` layout gives every package one `destDir` keyed
/// only by its link name; the resolved set itself de-dupes by exact
/// `(name, version)`, so two *different* versions of the same name (reached
/// through different branches of the graph) still collide on disk. This is
/// the "last writer wins" behavior spec.md §9 calls out as a latent bug to
/// surface, not silently fix: warn once per colliding link name rather than
/// picking a winner ourselves.
fn warn_on_destdir_collisions(
    resolved: &ResolvedSet,
    alias_by_name_version: &HashMap<(String, String), String>,
    warnings: &mut Vec<Warning>,
) {
    let mut versions_by_link_name: HashMap<&str, Vec<&Version>> = HashMap::new();
    for package in resolved.packages() {
        let link_name = alias_by_name_version
            .get(&(package.name.clone(), package.version.to_string()))
            .map(String::as_str)
            .unwrap_or(package.name.as_str());
        versions_by_link_name.entry(link_name).or_default().push(&package.version);
    }

    for (link_name, mut versions) in versions_by_link_name {
        versions.sort();
        versions.dedup();
        if versions.len() > 1 {
            let versions =
                versions.iter().map(|version| version.to_string()).collect::<Vec<_>>().join(", ");
            warn!(%link_name, %versions, "multiple versions resolve to the same node_modules directory");
            report_destdir_collision(warnings, link_name, &versions);
        }
    }
}

fn report_destdir_collision(warnings: &mut Vec<Warning>, link_name: &str, versions: &str) {
    warnings.push(Warning::new(
        "destdir-collision",
        format!(
            "{link_name} resolves to {versions} in different parts of the dependency graph; \
             only one will remain at node_modules/{link_name} (last writer wins)"
        ),
    ));
}

enum MaterializeStatus {
    Installed { postinstall: Option<(PathBuf, String)> },
    AlreadyInstalled,
}

struct MaterializeOutcome {
    link_name: String,
    status: MaterializeStatus,
}

async fn materialize_package(
    pm: &PackageManager,
    package: ResolvedPackage,
    link_name: String,
    force: bool,
    throttle: Arc<Throttle>,
) -> Result<MaterializeOutcome, PackageManagerError> {
    let dest_dir = link::dest_dir(&pm.project_dir, &link_name);

    if !force && dest_dir.is_dir() {
        if let Some(installed_version) = link::installed_version(&dest_dir) {
            if installed_version == package.version.to_string() {
                return Ok(MaterializeOutcome { link_name, status: MaterializeStatus::AlreadyInstalled });
            }
        }
    }

    let integrity = package.integrity.clone().ok_or_else(|| PackageManagerError::MissingIntegrity {
        name: package.name.clone(),
        version: package.version.to_string(),
    })?;

    throttle
        .run(async {
            let tarball_path = pm
                .cache
                .ensure_tarball(&package.name, &package.version.to_string(), &package.tarball_url, &integrity)
                .await?;
            pm.cache.extract(&tarball_path, &dest_dir).await?;
            Ok::<(), PackageManagerError>(())
        })
        .await?;

    let package_json = link::read_package_json(&dest_dir).unwrap_or_else(|| serde_json::json!({}));
    let bin_dir = link::bin_dir(&pm.project_dir);
    for (bin_name, target) in link::bin_entries(&dest_dir, &package_json, &link_name) {
        pacm_cmd_shim::create_shim(&bin_dir, &bin_name, &target)?;
    }
    let postinstall = link::postinstall_script(&package_json).map(|script| (dest_dir.clone(), script));

    Ok(MaterializeOutcome { link_name, status: MaterializeStatus::Installed { postinstall } })
}

struct PostInstallTask {
    project_dir: PathBuf,
    cwd: PathBuf,
    label: String,
    script: String,
}

impl pacm_task_queue::Task for PostInstallTask {
    type Output = (String, Result<std::process::ExitStatus, pacm_executor::ExecutorError>);

    fn run(self) -> Self::Output {
        (self.label, pacm_executor::run_script(&self.project_dir, &self.cwd, &self.script))
    }
}

async fn run(
    pm: &PackageManager,
    mut manifest: Manifest,
    mut lockfile: Lockfile,
    desired: Vec<(PackageSpec, DependencyCategory)>,
    force: bool,
    _kind: OperationKind,
) -> Result<InstallReport, PackageManagerError> {
    if desired.is_empty() {
        return Err(PackageManagerError::NothingToInstall);
    }

    let resolved =
        pacm_resolver::resolve(pm.registry.clone(), desired, pacm_resolver::DEFAULT_CONCURRENCY).await?;

    let mut report = InstallReport::default();
    for skipped in &resolved.skipped_optional {
        report.warnings.push(Warning::new(
            "platform-skip",
            format!(
                "skipping optional dependency {} ({}): {}",
                skipped.name, skipped.range, skipped.reason
            ),
        ));
    }

    let alias_by_name_version = build_alias_map(&resolved);
    warn_on_destdir_collisions(&resolved, &alias_by_name_version, &mut report.warnings);
    let throttle = Arc::new(Throttle::new(pacm_network::DEFAULT_CONCURRENCY));

    let mut join_set: JoinSet<Result<MaterializeOutcome, PackageManagerError>> = JoinSet::new();
    for package in resolved.packages().to_vec() {
        let link_name = alias_by_name_version
            .get(&(package.name.clone(), package.version.to_string()))
            .cloned()
            .unwrap_or_else(|| package.name.clone());
        let pm = pm.clone();
        let throttle = throttle.clone();
        join_set.spawn(async move { materialize_package(&pm, package, link_name, force, throttle).await });
    }

    let mut postinstall_scripts = Vec::new();
    let mut first_error = None;
    while let Some(outcome) = join_set.join_next().await {
        let outcome = outcome.expect("materialization task panicked");
        match outcome {
            Ok(MaterializeOutcome { link_name, status: MaterializeStatus::Installed { postinstall } }) => {
                if let Some((cwd, script)) = postinstall {
                    postinstall_scripts.push((link_name.clone(), cwd, script));
                }
                report.installed.push(link_name);
            }
            Ok(MaterializeOutcome { link_name, status: MaterializeStatus::AlreadyInstalled }) => {
                report.already_installed.push(link_name);
            }
            Err(error) => {
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }
    if let Some(error) = first_error {
        return Err(error);
    }

    run_postinstall_scripts(pm, &postinstall_scripts, &mut report.warnings).await;
    if let Some(script) = manifest.script("postinstall") {
        run_project_script(&pm.project_dir, script, &mut report.warnings);
    }

    apply_direct_entries(&resolved, &mut manifest, &mut lockfile);

    manifest.write()?;
    lockfile.write(&pm.project_dir)?;

    Ok(report)
}

async fn run_postinstall_scripts(
    pm: &PackageManager,
    scripts: &[(String, PathBuf, String)],
    warnings: &mut Vec<Warning>,
) {
    if scripts.is_empty() {
        return;
    }
    let queue = pacm_task_queue::TaskQueue::spawn(pacm_network::DEFAULT_CONCURRENCY);
    let mut receivers = Vec::with_capacity(scripts.len());
    for (label, cwd, script) in scripts {
        let task = PostInstallTask {
            project_dir: pm.project_dir.clone(),
            cwd: cwd.clone(),
            label: label.clone(),
            script: script.clone(),
        };
        receivers.push(queue.submit(task).expect("task queue worker is still running"));
    }
    for receiver in receivers {
        let (label, outcome) = receiver.await.expect("task queue dropped its response");
        report_script_outcome(&label, outcome, warnings);
    }
    queue.shutdown().await;
}

fn run_project_script(project_dir: &std::path::Path, script: &str, warnings: &mut Vec<Warning>) {
    let outcome = pacm_executor::run_script(project_dir, project_dir, script);
    report_script_outcome("<project>", outcome, warnings);
}

fn report_script_outcome(
    label: &str,
    outcome: Result<std::process::ExitStatus, pacm_executor::ExecutorError>,
    warnings: &mut Vec<Warning>,
) {
    match outcome {
        Ok(status) if status.success() => {}
        Ok(status) => {
            warn!(%label, ?status, "postinstall script exited non-zero");
            warnings.push(Warning::new(
                "postinstall",
                format!("{label}'s postinstall script exited with {status}"),
            ));
        }
        Err(error) => {
            warn!(%label, %error, "postinstall script failed to run");
            warnings.push(Warning::new("postinstall", format!("{label}'s postinstall script failed: {error}")));
        }
    }
}

/// Record every direct dependency's resolved version into the manifest and
/// lockfile: lockfile direct entries carry the resolved tarball/integrity/
/// dependency ranges; the manifest records the installed concrete version
/// under the same name.
fn apply_direct_entries(resolved: &ResolvedSet, manifest: &mut Manifest, lockfile: &mut Lockfile) {
    let direct = resolved.direct_prod.iter().map(|e| (e, DependencyCategory::Prod)).chain(
        resolved.direct_dev.iter().map(|e| (e, DependencyCategory::Dev)),
    );
    for ((alias, name, version), category) in direct {
        let Some(package) = find_resolved(resolved, name, version) else { continue };
        let manifest_group = category_to_manifest_group(category);
        let lock_group = category_to_lock_group(category);

        manifest.set_dependency(manifest_group, alias, &package.version.to_string());

        let entry = LockEntry {
            version: package.version.clone(),
            resolved: package.tarball_url.clone(),
            integrity: package.integrity.clone(),
            dependencies: to_btree(&package.dependencies),
            peer_dependencies: to_btree(&package.peer_dependencies),
        };
        lockfile.group_mut(lock_group).insert(alias.clone(), entry);
    }
}

fn find_resolved<'a>(resolved: &'a ResolvedSet, name: &str, version: &Version) -> Option<&'a ResolvedPackage> {
    resolved.packages().iter().find(|package| package.name == name && package.version == *version)
}

fn to_btree(map: &HashMap<String, String>) -> BTreeMap<String, String> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(name: &str, version: &str) -> ResolvedPackage {
        ResolvedPackage {
            name: name.to_string(),
            version: version.parse().unwrap(),
            tarball_url: format!("https://registry.npmjs.org/{name}/-/{name}-{version}.tgz"),
            integrity: Some("sha512-abc".to_string()),
            dependencies: HashMap::new(),
            peer_dependencies: HashMap::new(),
            optional_dependencies: HashMap::new(),
            os: None,
            cpu: None,
        }
    }

    fn lock_entry(version: &str) -> LockEntry {
        LockEntry {
            version: version.parse().unwrap(),
            resolved: format!("https://registry.npmjs.org/left-pad/-/left-pad-{version}.tgz"),
            integrity: Some("sha512-abc".to_string()),
            dependencies: Default::default(),
            peer_dependencies: Default::default(),
        }
    }

    fn write_installed_package(project_dir: &std::path::Path, name: &str, version: &str) {
        let dir = link::dest_dir(project_dir, name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("package.json"),
            serde_json::json!({ "name": name, "version": version }).to_string(),
        )
        .unwrap();
    }

    #[test]
    fn lockfile_satisfied_on_disk_when_versions_match() {
        let dir = tempfile::tempdir().unwrap();
        let mut lockfile = Lockfile::default();
        lockfile.group_mut(LockGroup::Prod).insert("left-pad".to_string(), lock_entry("1.3.0"));
        write_installed_package(dir.path(), "left-pad", "1.3.0");

        assert!(lockfile_satisfied_on_disk(&lockfile, dir.path()));
    }

    #[test]
    fn lockfile_not_satisfied_when_disk_version_differs() {
        let dir = tempfile::tempdir().unwrap();
        let mut lockfile = Lockfile::default();
        lockfile.group_mut(LockGroup::Prod).insert("left-pad".to_string(), lock_entry("1.3.0"));
        write_installed_package(dir.path(), "left-pad", "1.2.0");

        assert!(!lockfile_satisfied_on_disk(&lockfile, dir.path()));
    }

    #[test]
    fn lockfile_not_satisfied_when_package_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut lockfile = Lockfile::default();
        lockfile.group_mut(LockGroup::Prod).insert("left-pad".to_string(), lock_entry("1.3.0"));

        assert!(!lockfile_satisfied_on_disk(&lockfile, dir.path()));
    }

    #[test]
    fn empty_lockfile_is_never_satisfied() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!lockfile_satisfied_on_disk(&Lockfile::default(), dir.path()));
    }

    #[test]
    fn desired_from_lockfile_pins_to_locked_version_over_manifest_range() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            serde_json::json!({
                "name": "demo",
                "version": "1.0.0",
                "dependencies": { "left-pad": "^2.0.0" }
            })
            .to_string(),
        )
        .unwrap();
        let manifest = Manifest::load(dir.path()).unwrap();

        let mut lockfile = Lockfile::default();
        lockfile.group_mut(LockGroup::Prod).insert("left-pad".to_string(), lock_entry("1.3.0"));

        let desired = desired_from_lockfile_or_manifest(&lockfile, &manifest).unwrap();
        assert_eq!(desired.len(), 1);
        let (spec, category) = &desired[0];
        assert_eq!(spec.range, "1.3.0");
        assert_eq!(*category, DependencyCategory::Prod);
    }

    #[test]
    fn warns_when_two_versions_share_a_destdir() {
        let mut resolved = ResolvedSet::default();
        resolved.insert(package("left-pad", "1.0.0"));
        resolved.insert(package("left-pad", "2.0.0"));
        let alias_by_name_version = build_alias_map(&resolved);

        let mut warnings = Vec::new();
        warn_on_destdir_collisions(&resolved, &alias_by_name_version, &mut warnings);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].tag, "destdir-collision");
        assert!(warnings[0].message.contains("left-pad"));
    }

    #[test]
    fn no_warning_for_a_single_resolved_version() {
        let mut resolved = ResolvedSet::default();
        resolved.insert(package("left-pad", "1.0.0"));
        let alias_by_name_version = build_alias_map(&resolved);

        let mut warnings = Vec::new();
        warn_on_destdir_collisions(&resolved, &alias_by_name_version, &mut warnings);

        assert!(warnings.is_empty());
    }
}
