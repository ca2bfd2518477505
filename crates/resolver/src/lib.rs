//! Recursive dependency resolution.
//!
//! Grounded on pacquet's `package_manager::install_package_from_registry`
//! (recursive registry-walk-with-dedup-mutex shape), reworked so that the
//! work queue is an explicit FIFO `VecDeque` owned by a single
//! accumulator loop, so the de-duplication `HashSet` inside [`ResolvedSet`]
//! is never touched from more than one task and needs no lock. Concurrency
//! comes from spawning a bounded number of metadata-fetch-and-select tasks
//! per queue drain instead of recursing directly, avoiding both stack growth
//! on deep dependency chains and a mutex around the resolved set.

mod error;
mod platform;
mod types;

pub use error::ResolverError;
pub use platform::{current_cpu, current_os, matches_platform};
pub use types::{DependencyCategory, ResolvedPackage, ResolvedSet, SkippedOptional};

use pacm_registry::{select_version, PackageSpec, RegistryClient};
use std::{collections::VecDeque, sync::Arc};
use tracing::warn;

/// Default number of concurrent metadata-fetch tasks the resolver runs.
pub const DEFAULT_CONCURRENCY: usize = 20;

#[derive(Debug, Clone)]
struct QueueItem {
    spec: PackageSpec,
    category: DependencyCategory,
    optional: bool,
    direct: bool,
}

enum WorkerOutcome {
    Resolved { item: QueueItem, package: ResolvedPackage },
    Failed { item: QueueItem, error: ResolverError },
}

/// Resolve `direct_specs` (already split into categories) into a
/// [`ResolvedSet`], walking `dependencies`/`peerDependencies` recursively
/// and `optionalDependencies` with platform filtering.
pub async fn resolve(
    registry: Arc<RegistryClient>,
    direct_specs: Vec<(PackageSpec, DependencyCategory)>,
    concurrency: usize,
) -> Result<ResolvedSet, ResolverError> {
    let mut resolved = ResolvedSet::default();
    let mut queue: VecDeque<QueueItem> = direct_specs
        .into_iter()
        .map(|(spec, category)| QueueItem { spec, category, optional: false, direct: true })
        .collect();

    let concurrency = concurrency.max(1);
    let (result_sender, mut result_receiver) = tokio::sync::mpsc::unbounded_channel::<WorkerOutcome>();
    let mut in_flight = 0usize;

    loop {
        while in_flight < concurrency {
            let Some(item) = queue.pop_front() else { break };
            in_flight += 1;
            let registry = registry.clone();
            let sender = result_sender.clone();
            tokio::spawn(async move {
                let outcome = resolve_one(&registry, &item).await;
                let _ = sender.send(outcome.unwrap_or_else(|error| WorkerOutcome::Failed { item, error }));
            });
        }

        if in_flight == 0 {
            break;
        }

        let outcome = result_receiver.recv().await.expect("sender kept alive by this loop");
        in_flight -= 1;

        match outcome {
            WorkerOutcome::Resolved { item, package } => {
                if resolved.insert(package.clone()) {
                    if item.direct {
                        let entry = (item.spec.alias.clone(), item.spec.name.clone(), package.version.clone());
                        match item.category {
                            DependencyCategory::Prod => resolved.direct_prod.push(entry),
                            DependencyCategory::Dev => resolved.direct_dev.push(entry),
                        }
                    }
                    enqueue_children(&mut queue, &package, item.category);
                }
            }
            WorkerOutcome::Failed { item, error } => {
                if item.optional {
                    warn!(name = %item.spec.name, range = %item.spec.range, %error, "skipping optional dependency");
                    resolved.skipped_optional.push(SkippedOptional {
                        name: item.spec.name,
                        range: item.spec.range,
                        reason: error.to_string(),
                    });
                } else {
                    return Err(error);
                }
            }
        }
    }

    Ok(resolved)
}

async fn resolve_one(
    registry: &RegistryClient,
    item: &QueueItem,
) -> Result<WorkerOutcome, ResolverError> {
    let metadata = registry.metadata(&item.spec.name).await?;
    let version_metadata = select_version(&metadata, &item.spec.range)?;

    let os_ok = matches_platform(version_metadata.os.as_deref(), current_os());
    let cpu_ok = matches_platform(version_metadata.cpu.as_deref(), current_cpu());
    if !os_ok || !cpu_ok {
        return Err(ResolverError::PlatformIncompatible {
            name: item.spec.name.clone(),
            range: item.spec.range.clone(),
        });
    }

    let package = ResolvedPackage {
        name: version_metadata.name.clone(),
        version: version_metadata.version.clone(),
        tarball_url: version_metadata.dist.tarball.clone(),
        integrity: version_metadata.dist.integrity.clone(),
        dependencies: version_metadata.dependencies.clone(),
        peer_dependencies: version_metadata.peer_dependencies.clone(),
        optional_dependencies: version_metadata.optional_dependencies.clone(),
        os: version_metadata.os.clone(),
        cpu: version_metadata.cpu.clone(),
    };

    Ok(WorkerOutcome::Resolved { item: item.clone(), package })
}

fn enqueue_children(queue: &mut VecDeque<QueueItem>, package: &ResolvedPackage, category: DependencyCategory) {
    for (name, range) in package.dependencies.iter().chain(&package.peer_dependencies) {
        queue.push_back(QueueItem {
            spec: PackageSpec::from_manifest_entry(name, range),
            category,
            optional: false,
            direct: false,
        });
    }
    for (name, range) in &package.optional_dependencies {
        queue.push_back(QueueItem {
            spec: PackageSpec::from_manifest_entry(name, range),
            category,
            optional: true,
            direct: false,
        });
    }
}
