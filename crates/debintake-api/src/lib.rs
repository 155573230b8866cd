//! Debintake API Client
//!
//! A table-driven client for the aptly REST API:
//!
//! - **Mapping table**: every operation is a static descriptor (verb, route,
//!   typed parameters), grouped by entity
//! - **Dynamic dispatch**: entities are resolved by name; collection methods
//!   (`@list`, `@create`) on unbound handles, everything else on handles bound
//!   to route identifiers
//! - **Validation first**: argument count, types and placeholders are checked
//!   before any request is sent
//! - **Classified failures**: HTTP errors carry a reason code callers can
//!   match on instead of parsing messages
//!
//! ## Example
//!
//! ```rust,no_run
//! use debintake_api::{ApiClient, CallArgs, ClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new(&ClientConfig::new("http://localhost:8080/"))?;
//!
//! let repos = client.entity("LocalRepo")?;
//! repos
//!     .call(
//!         "@create",
//!         CallArgs::new()
//!             .arg("stable_bookworm_main")
//!             .kwarg("default_distribution", "bookworm"),
//!     )
//!     .await?;
//!
//! let repo = repos.bind([("name", "stable_bookworm_main")]);
//! let packages = repo.call("search", CallArgs::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod params;
pub mod types;
pub mod mapping;
pub mod request;
pub mod config;
pub mod transport;
pub mod client;

// Re-exports for convenience
pub use error::{ApiError, ErrorKind, ErrorReason, Result};
pub use params::{FilePayload, ParamType, ParamValue, snake_to_camel};
pub use types::{
    IncludeReport, IncludeResult, LocalRepoInfo, PublishStep, PublishedRepoInfo, SigningOptions,
    SnapshotInfo,
};
pub use mapping::{COLLECTION_MARKER, MAPPING, OperationDescriptor, Verb, lookup};
pub use request::{ApiRequest, CallArgs, build_request};
pub use config::{BasicAuth, ClientConfig};
pub use transport::Transport;
pub use client::{ApiClient, BoundContext, EntityHandle};
