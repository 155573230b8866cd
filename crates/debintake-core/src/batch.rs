//! Intake batches and `.changes` manifests
//!
//! A batch is what one import run publishes: a set of files, each with the
//! component it belongs to, for one channel and distribution.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

use crate::error::{PublishError, Result};

/// Component used when a section carries no `component/` prefix
pub const DEFAULT_COMPONENT: &str = "main";

const PGP_SIGNED_HEADER: &str = "-----BEGIN PGP SIGNED MESSAGE-----";
const PGP_SIGNATURE_HEADER: &str = "-----BEGIN PGP SIGNATURE-----";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFile {
    pub path: PathBuf,
    pub component: String,
}

impl BatchFile {
    pub fn new(path: impl Into<PathBuf>, component: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            component: component.into(),
        }
    }

    /// Name the file is uploaded under
    pub fn file_name(&self) -> Result<String> {
        file_name_of(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeBatch {
    pub base_directory: PathBuf,
    pub distribution: String,
    pub channel: String,
    pub files: Vec<BatchFile>,
    /// Manifest the batch was read from, uploaded alongside the files
    pub changes: Option<PathBuf>,
}

impl IntakeBatch {
    /// Components touched by the batch, in first-seen order
    pub fn components(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for file in &self.files {
            if !seen.contains(&file.component.as_str()) {
                seen.push(&file.component);
            }
        }
        seen
    }

    /// Path of `file` on disk, relative paths taken from the base directory
    pub fn resolve(&self, file: &BatchFile) -> PathBuf {
        if file.path.is_absolute() {
            file.path.clone()
        } else {
            self.base_directory.join(&file.path)
        }
    }

    /// Check the batch can be published under the given distributions.
    ///
    /// Repository and snapshot names are joined with `_`, so neither the
    /// channel nor the distribution may contain one.
    pub fn validate(&self, allowed: &[String]) -> Result<()> {
        if !allowed.iter().any(|d| *d == self.distribution) {
            return Err(PublishError::DistributionNotAllowed {
                distribution: self.distribution.clone(),
                allowed: allowed.join(", "),
            });
        }
        for (what, value) in [("channel", &self.channel), ("distribution", &self.distribution)] {
            if value.is_empty() || value.contains('_') || value.contains('/') {
                return Err(PublishError::InvalidBatch {
                    message: format!("{what} '{value}' must be non-empty without '_' or '/'"),
                });
            }
        }
        if self.files.is_empty() {
            return Err(PublishError::InvalidBatch {
                message: "no files to publish".to_string(),
            });
        }
        if let Some(file) = self.files.iter().find(|f| f.component.is_empty() || f.component.contains('_')) {
            return Err(PublishError::InvalidBatch {
                message: format!(
                    "invalid component '{}' for {}",
                    file.component,
                    file.path.display()
                ),
            });
        }
        Ok(())
    }

    /// Read a batch from a Debian `.changes` manifest.
    ///
    /// The channel is the name of the directory holding the manifest, and
    /// listed files are resolved relative to it.
    pub fn from_changes(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let invalid = |message: String| PublishError::InvalidChanges {
            path: path.to_path_buf(),
            message,
        };

        let fields = parse_deb822(&content).map_err(&invalid)?;

        let distribution = fields
            .get("distribution")
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| invalid("missing Distribution field".to_string()))?;
        // Multiple distributions are space-separated; uploads target one
        if distribution.contains(char::is_whitespace) {
            return Err(invalid(format!(
                "expected a single distribution, got '{distribution}'"
            )));
        }

        let files_field = fields
            .get("files")
            .ok_or_else(|| invalid("missing Files field".to_string()))?;

        let mut files = Vec::new();
        for line in files_field.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let columns: Vec<&str> = line.split_whitespace().collect();
            let [_md5, _size, section, _priority, name] = columns.as_slice() else {
                return Err(invalid(format!("malformed Files entry '{line}'")));
            };
            if name.contains('/') {
                return Err(invalid(format!("file name '{name}' must not contain '/'")));
            }
            files.push(BatchFile::new(*name, component_for_section(section)));
        }

        let absolute = std::path::absolute(path)?;
        let base_directory = absolute
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| invalid("manifest has no parent directory".to_string()))?;
        let channel = base_directory
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| invalid("cannot derive channel from directory name".to_string()))?;

        Ok(Self {
            base_directory,
            distribution: distribution.to_string(),
            channel,
            files,
            changes: Some(absolute),
        })
    }
}

/// Component of a package section: `contrib/net` -> `contrib`, `net` -> `main`
pub fn component_for_section(section: &str) -> &str {
    match section.split_once('/') {
        Some((component, _)) if !component.is_empty() => component,
        _ => DEFAULT_COMPONENT,
    }
}

pub(crate) fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| PublishError::InvalidBatch {
            message: format!("{} has no usable file name", path.display()),
        })
}

/// Parse a single deb822 paragraph, keys lowercased.
///
/// Continuation lines are kept (one per line) so multi-line fields such as
/// `Files` can be split afterwards. A clearsigned wrapper is stripped.
fn parse_deb822(content: &str) -> std::result::Result<IndexMap<String, String>, String> {
    let mut lines = content.lines().peekable();

    if lines.peek().map(|l| l.trim_end()) == Some(PGP_SIGNED_HEADER) {
        // Armor headers end at the first blank line
        for line in lines.by_ref() {
            if line.trim().is_empty() {
                break;
            }
        }
    }

    let mut fields: IndexMap<String, String> = IndexMap::new();
    let mut current: Option<String> = None;

    for line in lines {
        if line.trim_end() == PGP_SIGNATURE_HEADER {
            break;
        }
        if line.trim().is_empty() {
            if fields.is_empty() {
                continue;
            }
            break;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            let key = current
                .as_ref()
                .ok_or_else(|| format!("continuation line before any field: '{line}'"))?;
            if let Some(value) = fields.get_mut(key) {
                value.push('\n');
                value.push_str(line.trim());
            }
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| format!("expected 'Field: value', got '{line}'"))?;
        let key = key.trim().to_ascii_lowercase();
        fields.insert(key.clone(), value.trim().to_string());
        current = Some(key);
    }

    Ok(fields)
}
