//! Cleanup workflow: drop old package versions and unpublished snapshots

use debintake_api::{ApiClient, CallArgs, ErrorReason, LocalRepoInfo, SnapshotInfo};
use indexmap::IndexMap;

use crate::error::{DuringPhase, Phase, PublishError, Result};
use crate::lock::PublishLock;
use crate::settings::IntakeSettings;
use crate::version::compare_versions;

/// An aptly package reference: `P<arch> <name> <version> <hash>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageRef<'a> {
    pub arch: &'a str,
    pub name: &'a str,
    pub version: &'a str,
    pub raw: &'a str,
}

impl<'a> PackageRef<'a> {
    pub fn parse(raw: &'a str) -> Option<Self> {
        let mut parts = raw.split(' ');
        let arch = parts.next()?.strip_prefix('P')?;
        let name = parts.next()?;
        let version = parts.next()?;
        let _hash = parts.next()?;
        if parts.next().is_some() || arch.is_empty() || name.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self {
            arch,
            name,
            version,
            raw,
        })
    }
}

/// Refs to remove so that at most `keep` versions of each package remain
/// per architecture, the highest ones by Debian ordering.
pub fn packages_to_remove(refs: &[String], keep: usize) -> Vec<String> {
    let mut grouped: IndexMap<(&str, &str), IndexMap<&str, &str>> = IndexMap::new();
    for raw in refs {
        match PackageRef::parse(raw) {
            Some(package) => {
                grouped
                    .entry((package.arch, package.name))
                    .or_default()
                    .insert(package.version, package.raw);
            }
            None => tracing::warn!(package = %raw, "unparseable package reference, keeping it"),
        }
    }

    let mut remove = Vec::new();
    for versions in grouped.values() {
        if versions.len() <= keep {
            continue;
        }
        let mut ordered: Vec<(&str, &str)> = versions.iter().map(|(v, r)| (*v, *r)).collect();
        ordered.sort_by(|a, b| compare_versions(b.0, a.0));
        remove.extend(ordered.into_iter().skip(keep).map(|(_, raw)| raw.to_string()));
    }
    remove
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Removed package refs per repository
    pub removed_packages: IndexMap<String, Vec<String>>,
    pub removed_snapshots: Vec<String>,
    /// Snapshots still referenced by a publish
    pub skipped_snapshots: Vec<String>,
    pub db_cleanup: bool,
}

impl CleanReport {
    pub fn removed_package_count(&self) -> usize {
        self.removed_packages.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Cleaner {
    client: ApiClient,
    settings: IntakeSettings,
}

impl Cleaner {
    pub fn new(settings: IntakeSettings) -> Result<Self> {
        let client = ApiClient::new(&settings.client_config())?;
        Ok(Self::with_client(client, settings))
    }

    pub fn with_client(client: ApiClient, settings: IntakeSettings) -> Self {
        Self { client, settings }
    }

    /// Run the cleanup under the publish lock, keeping `keep` versions
    pub async fn run(&self, keep: usize) -> Result<CleanReport> {
        if keep == 0 {
            return Err(PublishError::Settings {
                message: "at least one package version must be kept".to_string(),
            });
        }
        tracing::info!(keep, "starting cleanup");

        let lock =
            PublishLock::acquire(&self.settings.lock_path, self.settings.lock_wait()).await?;
        let result = self.run_locked(keep).await;
        lock.finish(result).await
    }

    async fn run_locked(&self, keep: usize) -> Result<CleanReport> {
        let mut report = CleanReport::default();

        let repositories: Vec<LocalRepoInfo> = self
            .client
            .entity("LocalRepo")
            .during(Phase::Inspect)?
            .call_as("list", CallArgs::new())
            .await
            .during(Phase::Inspect)?;

        for repository in repositories {
            let repo = self
                .client
                .entity("LocalRepo")
                .during(Phase::Cleanup)?
                .bind([("name", repository.name.as_str())]);
            let refs: Vec<String> = repo
                .call_as("search", CallArgs::new())
                .await
                .during(Phase::Inspect)?;

            let remove = packages_to_remove(&refs, keep);
            if remove.is_empty() {
                tracing::debug!(repository = %repository.name, "nothing to remove");
                continue;
            }

            tracing::info!(repository = %repository.name, count = remove.len(), "removing old packages");
            repo.call("delete_packages", CallArgs::new().arg(remove.as_slice()))
                .await
                .during(Phase::Cleanup)?;
            report.removed_packages.insert(repository.name, remove);
        }

        let snapshots: Vec<SnapshotInfo> = self
            .client
            .entity("Snapshot")
            .during(Phase::Inspect)?
            .call_as("list", CallArgs::new())
            .await
            .during(Phase::Inspect)?;

        for snapshot in snapshots {
            let deleted = self
                .client
                .entity("Snapshot")
                .during(Phase::Cleanup)?
                .bind([("name", snapshot.name.as_str())])
                .call("delete", CallArgs::new())
                .await;
            match deleted {
                Ok(_) => {
                    tracing::info!(snapshot = %snapshot.name, "removed snapshot");
                    report.removed_snapshots.push(snapshot.name);
                }
                Err(e) if e.reason() == Some(&ErrorReason::SnapshotPublished) => {
                    tracing::warn!(snapshot = %snapshot.name, "snapshot is published, keeping it");
                    report.skipped_snapshots.push(snapshot.name);
                }
                Err(e) => return Err(e).during(Phase::Cleanup),
            }
        }

        if let Some(command) = &self.settings.db_cleanup_command {
            run_db_cleanup(command).await?;
            report.db_cleanup = true;
        }

        Ok(report)
    }
}

async fn run_db_cleanup(command: &[String]) -> Result<()> {
    let (program, args) = command.split_first().ok_or_else(|| PublishError::Settings {
        message: "db_cleanup_command must name a program".to_string(),
    })?;
    tracing::info!(command = %command.join(" "), "running database cleanup");

    let status = tokio::process::Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|e| PublishError::CleanupCommand {
            message: format!("failed to start {program}: {e}"),
        })?;

    if !status.success() {
        return Err(PublishError::CleanupCommand {
            message: format!("{} exited with {status}", command.join(" ")),
        });
    }
    Ok(())
}
