//! Typed request objects and response shapes
//!
//! Response structs only name the fields this crate reads; aptly sends more.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{ApiError, Result};
use crate::params::{ParamType, ParamValue};

/// Keys accepted in a `Signing` object, with their declared types
pub const SIGNING_KEYS: &[(&str, ParamType)] = &[
    ("Skip", ParamType::Boolean),
    ("Batch", ParamType::Boolean),
    ("GpgKey", ParamType::String),
    ("Keyring", ParamType::String),
    ("SecretKeyring", ParamType::String),
    ("Passphrase", ParamType::String),
    ("PassphraseFile", ParamType::String),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum SigningValue {
    Bool(bool),
    Str(String),
}

/// Signing configuration passed to publish and switch calls.
///
/// Only the keys in [`SIGNING_KEYS`] are accepted, each with its declared
/// type. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningOptions {
    entries: BTreeMap<&'static str, SigningValue>,
}

impl SigningOptions {
    pub fn new<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ParamValue>,
    {
        let mut map = BTreeMap::new();
        for (key, value) in entries {
            let key = key.as_ref();
            let (name, declared) = SIGNING_KEYS
                .iter()
                .find(|(name, _)| *name == key)
                .copied()
                .ok_or_else(|| ApiError::SigningKeyNotAllowed {
                    key: key.to_string(),
                })?;

            let value = match (declared, value.into()) {
                (ParamType::Boolean, ParamValue::Bool(b)) => SigningValue::Bool(b),
                (ParamType::String, ParamValue::Str(s)) => SigningValue::Str(s),
                (declared, other) => {
                    return Err(ApiError::SigningValueType {
                        key: name.to_string(),
                        expected: declared.as_str(),
                        actual: other.type_name(),
                    });
                }
            };
            map.insert(name, value);
        }
        Ok(Self { entries: map })
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key)? {
            SigningValue::Bool(b) => Some(*b),
            SigningValue::Str(_) => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key)? {
            SigningValue::Str(s) => Some(s),
            SigningValue::Bool(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    SigningValue::Bool(b) => Value::Bool(*b),
                    SigningValue::Str(s) => Value::String(s.clone()),
                };
                (key.to_string(), value)
            })
            .collect();
        Value::Object(map)
    }
}

impl Serialize for SigningOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            match value {
                SigningValue::Bool(b) => map.serialize_entry(key, b)?,
                SigningValue::Str(s) => map.serialize_entry(key, s)?,
            }
        }
        map.end()
    }
}

/// One component of a publish: which snapshot serves which component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishStep {
    pub component: String,
    /// Snapshot name
    pub name: String,
}

impl PublishStep {
    pub fn new(component: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            name: name.into(),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "Component": self.component,
            "Name": self.name,
        })
    }
}

/// Local repository as listed by `GET /api/repos`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalRepoInfo {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub default_distribution: String,
    #[serde(default)]
    pub default_component: String,
}

/// Snapshot as listed by `GET /api/snapshots`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Published distribution as listed by `GET /api/publish`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishedRepoInfo {
    pub prefix: String,
    pub distribution: String,
    #[serde(default)]
    pub source_kind: String,
    #[serde(default)]
    pub sources: Vec<PublishStep>,
}

/// Response of `RepositoryDirectory.include` and `.add`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IncludeResult {
    #[serde(default)]
    pub failed_files: Vec<String>,
    #[serde(default)]
    pub report: IncludeReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IncludeReport {
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_result_deserialize() {
        let json = r#"{
            "FailedFiles": ["/srv/upload/run-main/broken.deb"],
            "Report": {"Warnings": ["unable to verify"], "Added": ["hello_1.0_amd64 added"], "Removed": []}
        }"#;
        let result: IncludeResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.failed_files.len(), 1);
        assert_eq!(result.report.added, vec!["hello_1.0_amd64 added"]);
    }

    #[test]
    fn test_signing_options_accepts_declared_keys() {
        let options = SigningOptions::new([
            ("Skip", ParamValue::Bool(false)),
            ("GpgKey", ParamValue::from("ABCDEF")),
        ])
        .unwrap();

        assert_eq!(options.get_bool("Skip"), Some(false));
        assert_eq!(options.get_str("GpgKey"), Some("ABCDEF"));
        assert_eq!(
            options.to_json(),
            serde_json::json!({"Skip": false, "GpgKey": "ABCDEF"})
        );
    }

    #[test]
    fn test_signing_options_rejects_unknown_key() {
        let err = SigningOptions::new([("Armor", true)]).unwrap_err();
        assert!(matches!(err, ApiError::SigningKeyNotAllowed { key } if key == "Armor"));
    }

    #[test]
    fn test_signing_options_rejects_wrong_type() {
        let err = SigningOptions::new([("Skip", "yes")]).unwrap_err();
        assert!(matches!(
            err,
            ApiError::SigningValueType { expected: "boolean", actual: "string", .. }
        ));

        let err = SigningOptions::new([("Keyring", 1i64)]).unwrap_err();
        assert!(matches!(err, ApiError::SigningValueType { .. }));
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let options = SigningOptions::new([("Batch", true)]).unwrap();
        assert_eq!(serde_json::to_value(&options).unwrap(), options.to_json());
    }

    #[test]
    fn test_published_repo_deserialize() {
        let json = r#"{
            "Prefix": "stable",
            "Distribution": "bookworm",
            "SourceKind": "snapshot",
            "Sources": [{"Component": "main", "Name": "stable_bookworm_main_1"}],
            "Architectures": ["amd64"]
        }"#;
        let info: PublishedRepoInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.prefix, "stable");
        assert_eq!(info.sources, vec![PublishStep::new("main", "stable_bookworm_main_1")]);
    }
}
