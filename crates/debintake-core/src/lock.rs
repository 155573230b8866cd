//! Cross-process publish lock
//!
//! A marker file at a well-known path; whoever creates it owns the mutating
//! phase. Creation is exclusive, so two processes cannot both succeed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::{PublishError, Result};

/// How long to wait for a held lock, and how often to look
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockWait {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

/// Ownership of the publish lock.
///
/// The marker is removed when the guard is released or dropped, so every
/// exit path (including panics) frees the lock. `Drop` cannot await and
/// removes the marker with a blocking call.
#[derive(Debug)]
pub struct PublishLock {
    path: PathBuf,
    released: bool,
}

impl PublishLock {
    /// Create the marker, waiting up to `wait.timeout` while another
    /// process holds it.
    pub async fn acquire(path: &Path, wait: LockWait) -> Result<Self> {
        let started = Instant::now();
        let mut warned = false;

        loop {
            match Self::try_acquire(path).await? {
                Some(lock) => {
                    tracing::debug!(path = %path.display(), "publish lock acquired");
                    return Ok(lock);
                }
                None => {
                    let waited = started.elapsed();
                    if waited >= wait.timeout {
                        return Err(PublishError::LockTimeout {
                            path: path.to_path_buf(),
                            waited_secs: waited.as_secs(),
                        });
                    }
                    if !warned {
                        tracing::warn!(path = %path.display(), "publish lock held, waiting");
                        warned = true;
                    }
                    let remaining = wait.timeout - waited;
                    tokio::time::sleep(wait.poll_interval.min(remaining)).await;
                }
            }
        }
    }

    /// Single attempt; `None` when the marker already exists
    pub async fn try_acquire(path: &Path) -> Result<Option<Self>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let lock = Self {
            path: path.to_path_buf(),
            released: false,
        };
        let marker = format!(
            "# debintake publish lock, pid {} since {}\n",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );
        file.write_all(marker.as_bytes()).await?;
        file.flush().await?;
        Ok(Some(lock))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the marker, reporting failure
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        tokio::fs::remove_file(&self.path).await?;
        tracing::debug!(path = %self.path.display(), "publish lock released");
        Ok(())
    }

    /// Release the lock after the guarded work produced `result`.
    ///
    /// A failure of the work takes precedence over a failure to release.
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        let released = self.release().await;
        let value = result?;
        released?;
        Ok(value)
    }
}

impl Drop for PublishLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove publish lock");
        }
    }
}
