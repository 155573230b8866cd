//! Declarative mapping of the aptly REST API
//!
//! Every operation the client can perform is one [`OperationDescriptor`] in
//! [`MAPPING`], grouped by entity. Method names starting with
//! [`COLLECTION_MARKER`] are collection-level operations (listing, creation)
//! that need no bound identifiers; all other methods fill their route
//! placeholders from a bound context.
//!
//! Adding an operation means adding one entry here.

use phf::phf_map;
use std::fmt;

use crate::error::{ApiError, Result};
use crate::params::ParamType;

/// Leading marker of collection-level method names
pub const COLLECTION_MARKER: char = '@';

const STR: ParamType = ParamType::String;
const INT: ParamType = ParamType::Integer;
const BOOL: ParamType = ParamType::Boolean;
const LIST: ParamType = ParamType::List;
const SIGNING: ParamType = ParamType::Signing;

/// HTTP verb of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn as_method(self) -> reqwest::Method {
        match self {
            Verb::Get => reqwest::Method::GET,
            Verb::Post => reqwest::Method::POST,
            Verb::Put => reqwest::Method::PUT,
            Verb::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_method().as_str())
    }
}

/// Ordered list of parameter names and their declared types
pub type ParamSpec = &'static [(&'static str, ParamType)];

/// Shape of a single REST operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub verb: Verb,
    /// Route with `{placeholder}` segments
    pub route: &'static str,
    /// Positional parameters, in declared order
    pub required: ParamSpec,
    pub optional: ParamSpec,
    /// Parameters sent in the query string, in their wire spelling
    pub query: ParamSpec,
    /// Whether the first positional argument is a file payload
    pub post_file: bool,
}

impl OperationDescriptor {
    const fn new(verb: Verb, route: &'static str) -> Self {
        Self {
            verb,
            route,
            required: &[],
            optional: &[],
            query: &[],
            post_file: false,
        }
    }

    const fn get(route: &'static str) -> Self {
        Self::new(Verb::Get, route)
    }

    const fn post(route: &'static str) -> Self {
        Self::new(Verb::Post, route)
    }

    const fn put(route: &'static str) -> Self {
        Self::new(Verb::Put, route)
    }

    const fn delete(route: &'static str) -> Self {
        Self::new(Verb::Delete, route)
    }

    const fn required(self, required: ParamSpec) -> Self {
        Self { required, ..self }
    }

    const fn optional(self, optional: ParamSpec) -> Self {
        Self { optional, ..self }
    }

    const fn query(self, query: ParamSpec) -> Self {
        Self { query, ..self }
    }

    const fn with_file(self) -> Self {
        Self {
            post_file: true,
            ..self
        }
    }

    /// Declared type of a body parameter (required or optional)
    pub fn body_param(&self, name: &str) -> Option<ParamType> {
        self.required
            .iter()
            .chain(self.optional)
            .find(|(param, _)| *param == name)
            .map(|(_, ty)| *ty)
    }

    /// Wire name and declared type of a query parameter.
    ///
    /// `name` is in the converted keyword form (`ForceReplace`); query
    /// parameters are declared in their wire spelling (`forceReplace`).
    pub fn query_param(&self, name: &str) -> Option<(&'static str, ParamType)> {
        self.query
            .iter()
            .find(|(param, _)| *param == name || capitalized_eq(param, name))
            .copied()
    }

    /// Placeholder names appearing in the route, in order
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = self.route;
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    names.push(&after[..end]);
                    rest = &after[end + 1..];
                }
                None => break,
            }
        }
        names
    }
}

fn capitalized_eq(declared: &str, converted: &str) -> bool {
    let mut declared_chars = declared.chars();
    let mut converted_chars = converted.chars();
    match (declared_chars.next(), converted_chars.next()) {
        (Some(a), Some(b)) => a.to_ascii_uppercase() == b && declared_chars.eq(converted_chars),
        _ => false,
    }
}

type EntityMap = phf::Map<&'static str, OperationDescriptor>;

/// The operation registry: entity -> method -> descriptor
pub static MAPPING: phf::Map<&'static str, EntityMap> = phf_map! {
    "LocalRepo" => phf_map! {
        "@list" => OperationDescriptor::get("/api/repos"),
        "@create" => OperationDescriptor::post("/api/repos")
            .required(&[("Name", STR)])
            .optional(&[
                ("Comment", STR),
                ("DefaultDistribution", STR),
                ("DefaultComponent", STR),
            ]),
        "show" => OperationDescriptor::get("/api/repos/{name}"),
        "search" => OperationDescriptor::get("/api/repos/{name}/packages")
            .query(&[("q", STR), ("withDeps", BOOL), ("format", STR)]),
        "edit" => OperationDescriptor::put("/api/repos/{name}")
            .optional(&[
                ("Comment", STR),
                ("DefaultDistribution", STR),
                ("DefaultComponent", STR),
            ]),
        "delete" => OperationDescriptor::delete("/api/repos/{name}")
            .query(&[("force", BOOL)]),
        "add_packages" => OperationDescriptor::post("/api/repos/{name}/packages")
            .required(&[("PackageRefs", LIST)]),
        "delete_packages" => OperationDescriptor::delete("/api/repos/{name}/packages")
            .required(&[("PackageRefs", LIST)]),
        "snapshot" => OperationDescriptor::post("/api/repos/{name}/snapshots")
            .required(&[("Name", STR)])
            .optional(&[("Description", STR)]),
    },
    "RepositoryDirectory" => phf_map! {
        "add" => OperationDescriptor::post("/api/repos/{name}/file/{dir}")
            .query(&[("noRemove", BOOL), ("forceReplace", BOOL)]),
        "include" => OperationDescriptor::post("/api/repos/{name}/include/{dir}")
            .query(&[
                ("noRemoveFiles", BOOL),
                ("forceReplace", BOOL),
                ("ignoreSignature", BOOL),
                ("acceptUnsigned", BOOL),
            ]),
    },
    "Directory" => phf_map! {
        "@list_directories" => OperationDescriptor::get("/api/files"),
        "upload" => OperationDescriptor::post("/api/files/{dir}").with_file(),
        "list" => OperationDescriptor::get("/api/files/{dir}"),
        "delete" => OperationDescriptor::delete("/api/files/{dir}"),
    },
    "File" => phf_map! {
        "delete" => OperationDescriptor::delete("/api/files/{dir}/{file}"),
    },
    "Snapshot" => phf_map! {
        "@list" => OperationDescriptor::get("/api/snapshots"),
        "@create" => OperationDescriptor::post("/api/snapshots")
            .required(&[("Name", STR)])
            .optional(&[
                ("Description", STR),
                ("SourceSnapshots", LIST),
                ("PackageRefs", LIST),
            ]),
        "update" => OperationDescriptor::put("/api/snapshots/{name}")
            .optional(&[("Name", STR), ("Description", STR)]),
        "show" => OperationDescriptor::get("/api/snapshots/{name}"),
        "delete" => OperationDescriptor::delete("/api/snapshots/{name}")
            .query(&[("force", BOOL)]),
        "search" => OperationDescriptor::get("/api/snapshots/{name}/packages")
            .query(&[("q", STR), ("withDeps", INT), ("format", STR)]),
    },
    "SnapshotDiff" => phf_map! {
        "diff" => OperationDescriptor::get("/api/snapshots/{name}/diff/{with_snapshot}"),
    },
    "PublishedRepo" => phf_map! {
        "@list" => OperationDescriptor::get("/api/publish"),
        "publish" => OperationDescriptor::post("/api/publish/{prefix}")
            .required(&[("SourceKind", STR), ("Sources", LIST)])
            .optional(&[
                ("Distribution", STR),
                ("Label", STR),
                ("Origin", STR),
                ("ForceOverwrite", BOOL),
                ("Architectures", LIST),
                ("Signing", SIGNING),
                ("NotAutomatic", STR),
                ("ButAutomaticUpgrades", STR),
                ("SkipCleanup", BOOL),
                ("AcquireByHash", BOOL),
            ]),
    },
    "PublishedDistribution" => phf_map! {
        "update" => OperationDescriptor::put("/api/publish/{prefix}/{distribution}")
            .optional(&[
                ("Snapshots", LIST),
                ("ForceOverwrite", BOOL),
                ("Signing", SIGNING),
                ("AcquireByHash", BOOL),
            ]),
        "delete" => OperationDescriptor::delete("/api/publish/{prefix}/{distribution}")
            .query(&[("force", INT)]),
    },
};

/// Find a descriptor; `None` when the entity or method is unknown
pub fn find(entity: &str, method: &str) -> Option<&'static OperationDescriptor> {
    MAPPING.get(entity)?.get(method)
}

/// Look up a descriptor, failing with [`ApiError::DescriptorNotFound`]
pub fn lookup(entity: &str, method: &str) -> Result<&'static OperationDescriptor> {
    find(entity, method).ok_or_else(|| ApiError::DescriptorNotFound {
        entity: entity.to_string(),
        method: method.to_string(),
    })
}

/// Canonical (static) name of an entity, if it exists
pub fn entity_name(entity: &str) -> Option<&'static str> {
    MAPPING.get_key(entity).copied()
}

/// All method names of an entity
pub fn methods(entity: &str) -> Vec<&'static str> {
    MAPPING
        .get(entity)
        .map(|ops| ops.keys().copied().collect())
        .unwrap_or_default()
}
