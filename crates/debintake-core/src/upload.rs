//! Upload phase: send batch files to per-run directories on the service

use debintake_api::{ApiClient, CallArgs, FilePayload};
use serde_json::Value;
use std::path::Path;

use crate::batch::{IntakeBatch, file_name_of};
use crate::error::{DuringPhase, Phase, Result};
use crate::publish::{RunId, upload_directory};

/// What the upload phase sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Remote paths as reported by the service
    pub uploaded: Vec<String>,
    /// Upload directories, one per component, in first-seen order
    pub directories: Vec<String>,
}

/// Upload every batch file to `<run>-<component>`, then the manifest (if
/// any) to each of those directories.
pub async fn upload_batch(
    client: &ApiClient,
    batch: &IntakeBatch,
    run_id: &RunId,
) -> Result<UploadReport> {
    let mut report = UploadReport::default();

    for file in &batch.files {
        let directory = upload_directory(run_id, &file.component);
        let path = batch.resolve(file);
        tracing::info!(file = %path.display(), %directory, "uploading");

        let remote = upload_file(client, &directory, &path).await?;
        report.uploaded.extend(remote);

        if !report.directories.contains(&directory) {
            report.directories.push(directory);
        }
    }

    if let Some(changes) = &batch.changes {
        for directory in &report.directories {
            tracing::info!(file = %changes.display(), %directory, "uploading changes file");
            let remote = upload_file(client, directory, changes).await?;
            report.uploaded.extend(remote);
        }
    }

    Ok(report)
}

async fn upload_file(client: &ApiClient, directory: &str, path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read(path).await?;
    let payload = FilePayload::new(file_name_of(path)?, content);

    let target = client
        .entity("Directory")
        .during(Phase::Upload)?
        .bind([("dir", directory)]);
    let response = target
        .call("upload", CallArgs::new().file(payload))
        .await
        .during(Phase::Upload)?;

    Ok(match response {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    })
}

/// Empty a file in place; the intake directory may not allow removal
pub async fn truncate_file(path: &Path) -> Result<()> {
    let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
    file.set_len(0).await?;
    Ok(())
}

/// Empty every batch file, then the manifest
pub async fn truncate_batch(batch: &IntakeBatch) -> Result<()> {
    for file in &batch.files {
        truncate_file(&batch.resolve(file)).await?;
    }
    if let Some(changes) = &batch.changes {
        truncate_file(changes).await?;
    }
    tracing::debug!(files = batch.files.len(), "intake files truncated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchFile;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_truncate_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello_1.0_amd64.deb");
        std::fs::write(&path, b"package").unwrap();

        truncate_file(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_truncate_batch() {
        let temp = TempDir::new().unwrap();
        let deb = temp.path().join("hello_1.0_amd64.deb");
        let changes = temp.path().join("hello_1.0_amd64.changes");
        std::fs::write(&deb, b"package").unwrap();
        std::fs::write(&changes, b"Distribution: bookworm\n").unwrap();

        let batch = IntakeBatch {
            base_directory: temp.path().to_path_buf(),
            distribution: "bookworm".to_string(),
            channel: "stable".to_string(),
            files: vec![BatchFile::new("hello_1.0_amd64.deb", "main")],
            changes: Some(changes.clone()),
        };
        truncate_batch(&batch).await.unwrap();

        assert_eq!(std::fs::metadata(&deb).unwrap().len(), 0);
        assert_eq!(std::fs::metadata(&changes).unwrap().len(), 0);
    }
}
