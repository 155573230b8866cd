//! Import and republish workflows
//!
//! Both run their mutating phase under the [`PublishLock`] and end with the
//! same publish-or-switch step.

use debintake_api::{
    ApiClient, CallArgs, ErrorReason, IncludeResult, LocalRepoInfo, PublishStep,
    PublishedRepoInfo,
};
use indexmap::IndexMap;
use std::fmt;

use crate::batch::IntakeBatch;
use crate::error::{DuringPhase, Phase, Result};
use crate::lock::PublishLock;
use crate::settings::IntakeSettings;
use crate::upload::{UploadReport, truncate_batch, upload_batch};

/// Upper bound on publish/switch requests per distribution and run
pub const MAX_PUBLISH_ATTEMPTS: u32 = 2;

/// Identifier of one workflow execution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn repository_name(channel: &str, distribution: &str, component: &str) -> String {
    format!("{channel}_{distribution}_{component}")
}

/// Prefix shared by every repository of a channel and distribution
pub fn repository_prefix(channel: &str, distribution: &str) -> String {
    format!("{channel}_{distribution}_")
}

pub fn snapshot_name(repository: &str, run_id: &RunId) -> String {
    format!("{repository}_{run_id}")
}

pub fn upload_directory(run_id: &RunId, component: &str) -> String {
    format!("{run_id}-{component}")
}

/// Split `<channel>_<distribution>_<component>`
pub fn split_repository_name(name: &str) -> Option<(&str, &str, &str)> {
    let mut parts = name.splitn(3, '_');
    let channel = parts.next().filter(|s| !s.is_empty())?;
    let distribution = parts.next().filter(|s| !s.is_empty())?;
    let component = parts.next().filter(|s| !s.is_empty())?;
    Some((channel, distribution, component))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The published distribution now serves the new snapshots
    Switched,
    /// Nothing was published yet; a fresh publish was made
    Published,
    /// The switch named an unpublished component, so the distribution was
    /// dropped and published again
    Recreated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub prefix: String,
    pub distribution: String,
    pub outcome: PublishOutcome,
    /// Publish and switch requests issued
    pub attempts: u32,
    pub snapshots: Vec<PublishStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub run_id: RunId,
    pub upload: UploadReport,
    pub created_repositories: Vec<String>,
    /// Files the service refused to include
    pub failed_files: Vec<String>,
    pub publish: PublishReport,
}

/// Runs workflows against one aptly instance
#[derive(Debug, Clone)]
pub struct Publisher {
    client: ApiClient,
    settings: IntakeSettings,
    run_id: RunId,
}

impl Publisher {
    pub fn new(settings: IntakeSettings) -> Result<Self> {
        let client = ApiClient::new(&settings.client_config())?;
        Ok(Self::with_client(client, settings))
    }

    pub fn with_client(client: ApiClient, settings: IntakeSettings) -> Self {
        Self {
            client,
            settings,
            run_id: RunId::new(),
        }
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn settings(&self) -> &IntakeSettings {
        &self.settings
    }

    /// Publish a batch: upload, then under the lock ensure repositories,
    /// include the uploads, snapshot and publish.
    pub async fn import(&self, batch: &IntakeBatch) -> Result<ImportReport> {
        batch.validate(&self.settings.allowed_distributions)?;
        tracing::info!(
            run = %self.run_id,
            channel = %batch.channel,
            distribution = %batch.distribution,
            files = batch.files.len(),
            "starting import"
        );

        let upload = upload_batch(&self.client, batch, &self.run_id).await?;

        let lock =
            PublishLock::acquire(&self.settings.lock_path, self.settings.lock_wait()).await?;
        let result = self.import_locked(batch, upload).await;
        let report = lock.finish(result).await?;

        // Only a published batch is emptied; a failed run can be retried
        // from the intact intake files.
        if self.settings.truncate_uploaded {
            truncate_batch(batch).await?;
        }

        tracing::info!(run = %self.run_id, outcome = ?report.publish.outcome, "import finished");
        Ok(report)
    }

    async fn import_locked(&self, batch: &IntakeBatch, upload: UploadReport) -> Result<ImportReport> {
        let channel = batch.channel.as_str();
        let distribution = batch.distribution.as_str();

        let mut repositories = self.channel_repositories(channel, distribution).await?;

        let mut created_repositories = Vec::new();
        for component in batch.components() {
            let name = repository_name(channel, distribution, component);
            if repositories.contains_key(&name) {
                continue;
            }
            self.create_repository(&name, distribution, component)
                .await
                .during(Phase::EnsureRepository)?;
            repositories.insert(name.clone(), component.to_string());
            created_repositories.push(name);
        }

        let mut failed_files = Vec::new();
        for component in batch.components() {
            let name = repository_name(channel, distribution, component);
            let directory = upload_directory(&self.run_id, component);
            let result = self
                .include_directory(&name, &directory)
                .await
                .during(Phase::Register)?;

            for warning in &result.report.warnings {
                tracing::warn!(repository = %name, "{warning}");
            }
            if !result.failed_files.is_empty() {
                tracing::warn!(
                    repository = %name,
                    failed = result.failed_files.len(),
                    "some files were not included"
                );
            }
            tracing::info!(repository = %name, added = result.report.added.len(), "packages included");
            failed_files.extend(result.failed_files);
        }

        let snapshots = self.snapshot_repositories(&repositories).await?;
        let publish = self
            .publish_or_switch(channel, distribution, &snapshots)
            .await?;

        Ok(ImportReport {
            run_id: self.run_id.clone(),
            upload,
            created_repositories,
            failed_files,
            publish,
        })
    }

    /// Snapshot every known repository and switch each channel and
    /// distribution to its new snapshot set.
    pub async fn republish_all(&self) -> Result<Vec<PublishReport>> {
        tracing::info!(run = %self.run_id, "starting republish");

        let lock =
            PublishLock::acquire(&self.settings.lock_path, self.settings.lock_wait()).await?;
        let result = self.republish_locked().await;
        lock.finish(result).await
    }

    async fn republish_locked(&self) -> Result<Vec<PublishReport>> {
        let mut groups: IndexMap<(String, String), IndexMap<String, String>> = IndexMap::new();
        for repo in self.list_repositories().await? {
            let Some((channel, distribution, component)) = split_repository_name(&repo.name)
            else {
                tracing::debug!(repository = %repo.name, "not a channel repository, skipping");
                continue;
            };
            let component = if repo.default_component.is_empty() {
                component.to_string()
            } else {
                repo.default_component.clone()
            };
            groups
                .entry((channel.to_string(), distribution.to_string()))
                .or_default()
                .insert(repo.name.clone(), component);
        }

        let mut reports = Vec::with_capacity(groups.len());
        for ((channel, distribution), repositories) in &groups {
            let snapshots = self.snapshot_repositories(repositories).await?;
            let report = self
                .publish_or_switch(channel, distribution, &snapshots)
                .await?;
            reports.push(report);
        }
        Ok(reports)
    }

    /// Make `(channel, distribution)` serve `snapshots`.
    ///
    /// Switches an existing publish; if the switch names a component the
    /// publish does not have, drops the publish and creates it again. Any
    /// other failure is returned as is. At most
    /// [`MAX_PUBLISH_ATTEMPTS`] requests are made.
    pub async fn publish_or_switch(
        &self,
        channel: &str,
        distribution: &str,
        snapshots: &[PublishStep],
    ) -> Result<PublishReport> {
        let report = |outcome, attempts| PublishReport {
            prefix: channel.to_string(),
            distribution: distribution.to_string(),
            outcome,
            attempts,
            snapshots: snapshots.to_vec(),
        };

        if !self.is_published(channel, distribution).await? {
            self.publish_new(channel, distribution, snapshots)
                .await
                .during(Phase::Publish)?;
            tracing::info!(prefix = channel, distribution, "published");
            return Ok(report(PublishOutcome::Published, 1));
        }

        match self.switch(channel, distribution, snapshots).await {
            Ok(()) => {
                tracing::info!(prefix = channel, distribution, "switched snapshots");
                return Ok(report(PublishOutcome::Switched, 1));
            }
            Err(e) if matches!(e.reason(), Some(ErrorReason::ComponentNotPublished { .. })) => {
                tracing::warn!(
                    prefix = channel,
                    distribution,
                    error = %e,
                    "new component in published distribution, publishing again"
                );
            }
            Err(e) => return Err(e).during(Phase::Publish),
        }

        self.unpublish(channel, distribution)
            .await
            .during(Phase::Publish)?;
        self.publish_new(channel, distribution, snapshots)
            .await
            .during(Phase::Publish)?;
        tracing::info!(prefix = channel, distribution, "published again");
        Ok(report(PublishOutcome::Recreated, MAX_PUBLISH_ATTEMPTS))
    }

    async fn list_repositories(&self) -> Result<Vec<LocalRepoInfo>> {
        self.client
            .entity("LocalRepo")
            .during(Phase::Inspect)?
            .call_as("list", CallArgs::new())
            .await
            .during(Phase::Inspect)
    }

    /// Repositories of a channel and distribution, name -> component
    async fn channel_repositories(
        &self,
        channel: &str,
        distribution: &str,
    ) -> Result<IndexMap<String, String>> {
        let prefix = repository_prefix(channel, distribution);
        Ok(self
            .list_repositories()
            .await?
            .into_iter()
            .filter(|repo| repo.name.starts_with(&prefix))
            .map(|repo| {
                let component = if repo.default_component.is_empty() {
                    repo.name[prefix.len()..].to_string()
                } else {
                    repo.default_component
                };
                (repo.name, component)
            })
            .collect())
    }

    async fn create_repository(
        &self,
        name: &str,
        distribution: &str,
        component: &str,
    ) -> debintake_api::Result<()> {
        tracing::info!(repository = name, "creating repository");
        self.client
            .entity("LocalRepo")?
            .call(
                "@create",
                CallArgs::new()
                    .arg(name)
                    .kwarg(
                        "comment",
                        format!("Local repository for {distribution}/{component}"),
                    )
                    .kwarg("default_distribution", distribution)
                    .kwarg("default_component", component),
            )
            .await?;
        Ok(())
    }

    async fn include_directory(
        &self,
        repository: &str,
        directory: &str,
    ) -> debintake_api::Result<IncludeResult> {
        let include = self.settings.include;
        self.client
            .entity("RepositoryDirectory")?
            .bind([("name", repository), ("dir", directory)])
            .call_as(
                "include",
                CallArgs::new()
                    .kwarg("no_remove_files", include.no_remove_files)
                    .kwarg("force_replace", include.force_replace)
                    .kwarg("ignore_signature", include.ignore_signature)
                    .kwarg("accept_unsigned", include.accept_unsigned),
            )
            .await
    }

    async fn snapshot_repositories(
        &self,
        repositories: &IndexMap<String, String>,
    ) -> Result<Vec<PublishStep>> {
        let mut steps = Vec::with_capacity(repositories.len());
        for (repository, component) in repositories {
            let snapshot = snapshot_name(repository, &self.run_id);
            tracing::info!(repository = %repository, snapshot = %snapshot, "creating snapshot");
            self.client
                .entity("LocalRepo")
                .during(Phase::Snapshot)?
                .bind([("name", repository.as_str())])
                .call("snapshot", CallArgs::new().arg(snapshot.as_str()))
                .await
                .during(Phase::Snapshot)?;
            steps.push(PublishStep::new(component.as_str(), snapshot));
        }
        Ok(steps)
    }

    async fn is_published(&self, channel: &str, distribution: &str) -> Result<bool> {
        let published: Vec<PublishedRepoInfo> = self
            .client
            .entity("PublishedRepo")
            .during(Phase::Inspect)?
            .call_as("list", CallArgs::new())
            .await
            .during(Phase::Inspect)?;
        Ok(published
            .iter()
            .any(|p| p.prefix == channel && p.distribution == distribution))
    }

    async fn switch(
        &self,
        channel: &str,
        distribution: &str,
        snapshots: &[PublishStep],
    ) -> debintake_api::Result<()> {
        self.client
            .entity("PublishedDistribution")?
            .bind([("prefix", channel), ("distribution", distribution)])
            .call(
                "update",
                CallArgs::new()
                    .kwarg("snapshots", snapshots)
                    .kwarg("signing", self.settings.signing_options()?)
                    .kwarg("force_overwrite", true),
            )
            .await?;
        Ok(())
    }

    async fn unpublish(&self, channel: &str, distribution: &str) -> debintake_api::Result<()> {
        self.client
            .entity("PublishedDistribution")?
            .bind([("prefix", channel), ("distribution", distribution)])
            .call("delete", CallArgs::new())
            .await?;
        Ok(())
    }

    async fn publish_new(
        &self,
        channel: &str,
        distribution: &str,
        snapshots: &[PublishStep],
    ) -> debintake_api::Result<()> {
        self.client
            .entity("PublishedRepo")?
            .bind([("prefix", channel)])
            .call(
                "publish",
                CallArgs::new()
                    .arg("snapshot")
                    .arg(snapshots)
                    .kwarg("distribution", distribution)
                    .kwarg("label", self.settings.label(channel))
                    .kwarg("origin", self.settings.vendor.as_str())
                    .kwarg("architectures", self.settings.architectures.as_slice())
                    .kwarg("signing", self.settings.signing_options()?)
                    .kwarg("force_overwrite", true),
            )
            .await?;
        Ok(())
    }
}
