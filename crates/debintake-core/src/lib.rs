//! Debintake Core
//!
//! Publish workflows built on `debintake-api`:
//!
//! - **Import**: upload a batch (usually read from a `.changes` file), include
//!   it into per-component repositories, snapshot and publish
//! - **Republish**: snapshot every channel repository and switch its publish
//! - **Cleanup**: keep the newest package versions and drop unpublished
//!   snapshots
//!
//! Every mutating phase runs under a cross-process [`PublishLock`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use debintake_core::{IntakeBatch, IntakeSettings, Publisher};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = IntakeSettings::load()?;
//! let batch = IntakeBatch::from_changes(Path::new("/srv/intake/stable/hello_1.0_amd64.changes"))?;
//!
//! let report = Publisher::new(settings)?.import(&batch).await?;
//! println!("{:?}", report.publish.outcome);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod settings;
pub mod lock;
pub mod batch;
pub mod version;
pub mod upload;
pub mod publish;
pub mod clean;

// Re-exports for convenience
pub use error::{DuringPhase, Phase, PublishError, Result};
pub use settings::{IncludeOptions, IntakeSettings};
pub use lock::{LockWait, PublishLock};
pub use batch::{BatchFile, IntakeBatch, component_for_section};
pub use version::{DebianVersion, compare_versions};
pub use upload::{UploadReport, truncate_batch, upload_batch};
pub use publish::{
    ImportReport, MAX_PUBLISH_ATTEMPTS, PublishOutcome, PublishReport, Publisher, RunId,
    repository_name, snapshot_name, upload_directory,
};
pub use clean::{CleanReport, Cleaner, PackageRef, packages_to_remove};
