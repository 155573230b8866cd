//! Request construction from a descriptor and caller arguments
//!
//! Everything here is pure: validation failures surface before any network
//! access happens.

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

use crate::error::{ApiError, Result};
use crate::mapping::{OperationDescriptor, Verb};
use crate::params::{FilePayload, ParamValue, coerce, snake_to_camel};

/// Positional and keyword arguments of a single call
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    positional: Vec<ParamValue>,
    keyword: Vec<(String, ParamValue)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<ParamValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Append a keyword argument, named in `lower_snake_case`
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    /// Append a file payload as the next positional argument
    pub fn file(self, payload: FilePayload) -> Self {
        self.arg(ParamValue::File(payload))
    }
}

/// A validated, wire-ready request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub verb: Verb,
    /// Route with placeholders substituted, relative to the API base
    pub path: String,
    pub body: IndexMap<String, Value>,
    pub query: Vec<(String, String)>,
    pub file: Option<FilePayload>,
}

/// Build a request for `descriptor`.
///
/// Positional arguments are matched in order against the required
/// parameters (after the file payload, for uploads); keyword names are
/// converted to the wire convention and merged underneath them.
pub fn build_request(
    descriptor: &OperationDescriptor,
    placeholders: &BTreeMap<String, String>,
    args: CallArgs,
) -> Result<ApiRequest> {
    let CallArgs {
        mut positional,
        keyword,
    } = args;

    let file = if descriptor.post_file && !positional.is_empty() {
        match positional.remove(0) {
            ParamValue::File(payload) => Some(payload),
            other => {
                return Err(ApiError::TypeMismatch {
                    param: "file".to_string(),
                    expected: "file",
                    actual: other.type_name(),
                });
            }
        }
    } else {
        None
    };

    if positional.len() != descriptor.required.len() {
        return Err(ApiError::ArgumentCount {
            expected: descriptor.required.len(),
            got: positional.len(),
        });
    }

    let mut merged: IndexMap<String, ParamValue> = keyword
        .into_iter()
        .map(|(name, value)| (snake_to_camel(&name), value))
        .collect();
    for ((name, _), value) in descriptor.required.iter().zip(positional) {
        merged.insert((*name).to_string(), value);
    }

    let mut body = IndexMap::new();
    let mut query = Vec::new();
    for (name, value) in merged {
        if value.is_null() {
            continue;
        }
        if let Some((wire_name, declared)) = descriptor.query_param(&name) {
            let value = coerce(&name, value, declared)?;
            query.push((wire_name.to_string(), value.to_query()));
        } else if let Some(declared) = descriptor.body_param(&name) {
            let value = coerce(&name, value, declared)?;
            body.insert(name, value.to_json());
        } else {
            return Err(ApiError::UnknownParameter {
                param: name,
                route: descriptor.route.to_string(),
            });
        }
    }

    let path = expand_route(descriptor.route, placeholders)?;

    Ok(ApiRequest {
        verb: descriptor.verb,
        path,
        body,
        query,
        file,
    })
}

/// Substitute `{placeholder}` segments of `route`
pub fn expand_route(route: &str, placeholders: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(route.len());
    let mut rest = route;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| ApiError::InvalidRoute {
            route: route.to_string(),
        })?;
        let name = &after[..end];
        let value = placeholders
            .get(name)
            .ok_or_else(|| ApiError::MissingPlaceholder {
                placeholder: name.to_string(),
                route: route.to_string(),
            })?;
        let segment = encode_segment(value).ok_or_else(|| ApiError::InvalidPlaceholder {
            placeholder: name.to_string(),
            value: value.clone(),
        })?;
        out.push_str(&segment);
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Percent-encode a placeholder value as exactly one path segment.
///
/// `None` for values that cannot name a segment (empty, `.`, `..`).
fn encode_segment(value: &str) -> Option<String> {
    if matches!(value, "" | "." | "..") {
        return None;
    }
    let mut url = Url::parse("http://segment/").ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(value);
    url.path().strip_prefix('/').map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::lookup;
    use crate::types::SigningOptions;
    use serde_json::json;

    fn bound(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_positional_argument() {
        let create = lookup("LocalRepo", "@create").unwrap();
        let err = build_request(create, &BTreeMap::new(), CallArgs::new()).unwrap_err();
        assert!(matches!(err, ApiError::ArgumentCount { expected: 1, got: 0 }));
        assert!(err.to_string().contains("expected 1, got 0"));
    }

    #[test]
    fn test_too_many_positional_arguments() {
        let show = lookup("LocalRepo", "show").unwrap();
        let err = build_request(show, &bound(&[("name", "r")]), CallArgs::new().arg("x"))
            .unwrap_err();
        assert!(matches!(err, ApiError::ArgumentCount { expected: 0, got: 1 }));
    }

    #[test]
    fn test_create_body() {
        let create = lookup("LocalRepo", "@create").unwrap();
        let request = build_request(
            create,
            &BTreeMap::new(),
            CallArgs::new()
                .arg("stable_bookworm_main")
                .kwarg("comment", "Local repository for bookworm/main")
                .kwarg("default_distribution", "bookworm")
                .kwarg("default_component", "main"),
        )
        .unwrap();

        assert_eq!(request.verb, Verb::Post);
        assert_eq!(request.path, "/api/repos");
        assert!(request.query.is_empty());
        assert_eq!(
            serde_json::to_value(&request.body).unwrap(),
            json!({
                "Comment": "Local repository for bookworm/main",
                "DefaultDistribution": "bookworm",
                "DefaultComponent": "main",
                "Name": "stable_bookworm_main",
            })
        );
    }

    #[test]
    fn test_positional_wins_over_keyword() {
        let snapshot = lookup("LocalRepo", "snapshot").unwrap();
        let request = build_request(
            snapshot,
            &bound(&[("name", "repo")]),
            CallArgs::new().arg("from-positional").kwarg("name", "from-keyword"),
        )
        .unwrap();
        assert_eq!(request.body["Name"], json!("from-positional"));
    }

    #[test]
    fn test_null_values_dropped() {
        let create = lookup("LocalRepo", "@create").unwrap();
        let request = build_request(
            create,
            &BTreeMap::new(),
            CallArgs::new()
                .arg("repo")
                .kwarg("comment", None::<String>)
                .kwarg("not_declared_at_all", None::<String>),
        )
        .unwrap();
        assert_eq!(request.body.len(), 1);
        assert!(!request.body.contains_key("Comment"));
    }

    #[test]
    fn test_query_routing_and_coercion() {
        let delete = lookup("PublishedDistribution", "delete").unwrap();
        let request = build_request(
            delete,
            &bound(&[("prefix", "stable"), ("distribution", "bookworm")]),
            CallArgs::new().kwarg("force", true),
        )
        .unwrap();

        assert_eq!(request.path, "/api/publish/stable/bookworm");
        assert!(request.body.is_empty());
        assert_eq!(request.query, vec![("force".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_query_wire_spelling() {
        let include = lookup("RepositoryDirectory", "include").unwrap();
        let request = build_request(
            include,
            &bound(&[("name", "repo"), ("dir", "run-main")]),
            CallArgs::new()
                .kwarg("force_replace", true)
                .kwarg("ignore_signature", false),
        )
        .unwrap();

        assert_eq!(request.path, "/api/repos/repo/include/run-main");
        assert_eq!(
            request.query,
            vec![
                ("forceReplace".to_string(), "1".to_string()),
                ("ignoreSignature".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_type_mismatch() {
        let update = lookup("PublishedDistribution", "update").unwrap();
        let err = build_request(
            update,
            &bound(&[("prefix", "stable"), ("distribution", "bookworm")]),
            CallArgs::new().kwarg("force_overwrite", "yes"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ApiError::TypeMismatch { expected: "boolean", actual: "string", .. }
        ));
    }

    #[test]
    fn test_unknown_parameter() {
        let update = lookup("PublishedDistribution", "update").unwrap();
        let err = build_request(
            update,
            &bound(&[("prefix", "stable"), ("distribution", "bookworm")]),
            CallArgs::new().kwarg("colour", "blue"),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::UnknownParameter { param, .. } if param == "Colour"));
    }

    #[test]
    fn test_signing_in_body() {
        let update = lookup("PublishedDistribution", "update").unwrap();
        let signing = SigningOptions::new([("Skip", true)]).unwrap();
        let request = build_request(
            update,
            &bound(&[("prefix", "stable"), ("distribution", "bookworm")]),
            CallArgs::new().kwarg("signing", signing),
        )
        .unwrap();
        assert_eq!(request.body["Signing"], json!({"Skip": true}));
    }

    #[test]
    fn test_file_payload_extracted() {
        let upload = lookup("Directory", "upload").unwrap();
        let request = build_request(
            upload,
            &bound(&[("dir", "run-main")]),
            CallArgs::new().file(FilePayload::new("hello_1.0_amd64.deb", b"data".to_vec())),
        )
        .unwrap();

        assert_eq!(request.path, "/api/files/run-main");
        let file = request.file.expect("file payload");
        assert_eq!(file.file_name, "hello_1.0_amd64.deb");
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_file_slot_rejects_non_file() {
        let upload = lookup("Directory", "upload").unwrap();
        let err = build_request(upload, &bound(&[("dir", "d")]), CallArgs::new().arg("oops"))
            .unwrap_err();
        assert!(matches!(err, ApiError::TypeMismatch { expected: "file", .. }));
    }

    #[test]
    fn test_missing_placeholder() {
        let include = lookup("RepositoryDirectory", "include").unwrap();
        let err = build_request(include, &bound(&[("name", "repo")]), CallArgs::new())
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingPlaceholder { placeholder, .. } if placeholder == "dir"));
    }

    #[test]
    fn test_placeholder_is_one_segment() {
        let route = "/api/snapshots/{name}";
        assert_eq!(
            expand_route(route, &bound(&[("name", "keep#old")])).unwrap(),
            "/api/snapshots/keep%23old"
        );
        assert_eq!(
            expand_route(route, &bound(&[("name", "keep?x=1")])).unwrap(),
            "/api/snapshots/keep%3Fx=1"
        );
        assert_eq!(
            expand_route(route, &bound(&[("name", "a/b c")])).unwrap(),
            "/api/snapshots/a%2Fb%20c"
        );
        assert_eq!(
            expand_route(route, &bound(&[("name", "stable_bookworm_main_1.0")])).unwrap(),
            "/api/snapshots/stable_bookworm_main_1.0"
        );
    }

    #[test]
    fn test_placeholder_rejects_dot_segments() {
        for value in ["", ".", ".."] {
            let err = expand_route("/api/snapshots/{name}", &bound(&[("name", value)])).unwrap_err();
            assert!(matches!(err, ApiError::InvalidPlaceholder { ref placeholder, .. } if placeholder == "name"));
            assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        }
    }

    #[test]
    fn test_expand_route_malformed() {
        let err = expand_route("/api/repos/{name", &bound(&[("name", "x")])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRoute { .. }));
    }
}
