//! Entity handles and bound call contexts

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::mapping::{self, COLLECTION_MARKER, OperationDescriptor};
use crate::request::{CallArgs, build_request};
use crate::transport::Transport;

/// Entry point for calls against the aptly API
#[derive(Debug, Clone)]
pub struct ApiClient {
    transport: Transport,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }

    /// Unbound handle for `entity`, used for collection-level methods
    pub fn entity(&self, name: &str) -> Result<EntityHandle<'_>> {
        let entity = mapping::entity_name(name).ok_or_else(|| ApiError::DescriptorNotFound {
            entity: name.to_string(),
            method: String::new(),
        })?;
        Ok(EntityHandle {
            client: self,
            entity,
        })
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    async fn dispatch(
        &self,
        descriptor: &OperationDescriptor,
        placeholders: &BTreeMap<String, String>,
        args: CallArgs,
    ) -> Result<Value> {
        let request = build_request(descriptor, placeholders, args)?;
        self.transport.execute(request).await
    }
}

/// An entity without bound identifiers
#[derive(Debug, Clone, Copy)]
pub struct EntityHandle<'a> {
    client: &'a ApiClient,
    entity: &'static str,
}

impl<'a> EntityHandle<'a> {
    pub fn name(&self) -> &'static str {
        self.entity
    }

    /// Capture route identifiers, e.g. `[("name", "stable_bookworm_main")]`
    pub fn bind<I, K, V>(self, identifiers: I) -> BoundContext<'a>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        BoundContext {
            client: self.client,
            entity: self.entity,
            placeholders: identifiers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Resolve a collection-level method, named with or without its marker
    pub fn descriptor(&self, method: &str) -> Result<&'static OperationDescriptor> {
        let bare = method.strip_prefix(COLLECTION_MARKER).unwrap_or(method);
        if let Some(descriptor) = mapping::find(self.entity, &format!("{COLLECTION_MARKER}{bare}")) {
            return Ok(descriptor);
        }
        if mapping::find(self.entity, bare).is_some() {
            return Err(ApiError::UnboundContext {
                entity: self.entity.to_string(),
                method: bare.to_string(),
            });
        }
        Err(ApiError::DescriptorNotFound {
            entity: self.entity.to_string(),
            method: method.to_string(),
        })
    }

    pub async fn call(&self, method: &str, args: CallArgs) -> Result<Value> {
        let descriptor = self.descriptor(method)?;
        self.client
            .dispatch(descriptor, &BTreeMap::new(), args)
            .await
    }

    /// Like [`call`](Self::call), deserializing the response
    pub async fn call_as<T: DeserializeOwned>(&self, method: &str, args: CallArgs) -> Result<T> {
        let value = self.call(method, args).await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// An entity with its route identifiers bound.
///
/// There is no way to rebind; bind a fresh handle instead.
#[derive(Debug, Clone)]
pub struct BoundContext<'a> {
    client: &'a ApiClient,
    entity: &'static str,
    placeholders: BTreeMap<String, String>,
}

impl BoundContext<'_> {
    pub fn name(&self) -> &'static str {
        self.entity
    }

    pub fn placeholders(&self) -> &BTreeMap<String, String> {
        &self.placeholders
    }

    /// Resolve a bound method; collection-level methods are refused
    pub fn descriptor(&self, method: &str) -> Result<&'static OperationDescriptor> {
        if !method.starts_with(COLLECTION_MARKER) {
            if let Some(descriptor) = mapping::find(self.entity, method) {
                return Ok(descriptor);
            }
        }
        let bare = method.strip_prefix(COLLECTION_MARKER).unwrap_or(method);
        if mapping::find(self.entity, &format!("{COLLECTION_MARKER}{bare}")).is_some() {
            return Err(ApiError::AlreadyBound {
                entity: self.entity.to_string(),
                method: bare.to_string(),
            });
        }
        Err(ApiError::DescriptorNotFound {
            entity: self.entity.to_string(),
            method: method.to_string(),
        })
    }

    pub async fn call(&self, method: &str, args: CallArgs) -> Result<Value> {
        let descriptor = self.descriptor(method)?;
        self.client
            .dispatch(descriptor, &self.placeholders, args)
            .await
    }

    pub async fn call_as<T: DeserializeOwned>(&self, method: &str, args: CallArgs) -> Result<T> {
        let value = self.call(method, args).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new(&ClientConfig::new("http://localhost:8080/")).unwrap()
    }

    #[test]
    fn test_unknown_entity() {
        let client = client();
        assert!(matches!(
            client.entity("Mirror"),
            Err(ApiError::DescriptorNotFound { .. })
        ));
    }

    #[test]
    fn test_collection_resolution() {
        let client = client();
        let repos = client.entity("LocalRepo").unwrap();
        assert_eq!(repos.descriptor("list").unwrap().route, "/api/repos");
        assert_eq!(repos.descriptor("@create").unwrap().route, "/api/repos");

        let dirs = client.entity("Directory").unwrap();
        assert_eq!(dirs.descriptor("list_directories").unwrap().route, "/api/files");
    }

    #[test]
    fn test_bound_method_on_unbound_handle() {
        let client = client();
        let err = client.entity("LocalRepo").unwrap().descriptor("show").unwrap_err();
        assert!(matches!(err, ApiError::UnboundContext { ref method, .. } if method == "show"));
    }

    #[test]
    fn test_collection_method_on_bound_context() {
        let client = client();
        let bound = client
            .entity("LocalRepo")
            .unwrap()
            .bind([("name", "stable_bookworm_main")]);
        let err = bound.descriptor("list").unwrap_err();
        assert!(matches!(err, ApiError::AlreadyBound { .. }));
        let err = bound.descriptor("@create").unwrap_err();
        assert!(matches!(err, ApiError::AlreadyBound { .. }));

        // Directory.list is a bound method, distinct from @list_directories
        let dir = client.entity("Directory").unwrap().bind([("dir", "run-main")]);
        assert_eq!(dir.descriptor("list").unwrap().route, "/api/files/{dir}");
    }

    #[test]
    fn test_unknown_method() {
        let client = client();
        let handle = client.entity("Snapshot").unwrap();
        assert!(matches!(
            handle.descriptor("explode"),
            Err(ApiError::DescriptorNotFound { .. })
        ));
        assert!(matches!(
            handle.bind([("name", "s")]).descriptor("explode"),
            Err(ApiError::DescriptorNotFound { .. })
        ));
    }

    #[test]
    fn test_bound_placeholders() {
        let client = client();
        let bound = client
            .entity("PublishedDistribution")
            .unwrap()
            .bind([("prefix", "stable"), ("distribution", "bookworm")]);
        assert_eq!(bound.name(), "PublishedDistribution");
        assert_eq!(bound.placeholders().get("prefix").map(String::as_str), Some("stable"));
    }
}
