//! Feature definitions and their file-set shapes

use crate::error::{InstallerError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// How a template file is merged into the target project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    /// Package-manifest fragment whose dependencies get installed
    Install,
    /// Written only when the target does not exist yet
    Create,
    /// Always written
    Overwrite,
    /// Added after existing content unless already present
    Append,
    /// Added before existing content unless already present
    Prepend,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileAction::Install => "install",
            FileAction::Create => "create",
            FileAction::Overwrite => "overwrite",
            FileAction::Append => "append",
            FileAction::Prepend => "prepend",
        };
        f.write_str(name)
    }
}

/// One declared file within a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub action: FileAction,
}

/// Relative file path -> entry, in catalog order
pub type FileBucket = IndexMap<String, FileEntry>;

/// Files declared for one framework in a framework-first feature
#[derive(Debug, Clone, PartialEq)]
pub enum FrameworkFiles {
    /// No language split: the bucket applies to every language
    Flat(FileBucket),
    /// Language id -> bucket
    ByLanguage(IndexMap<String, FileBucket>),
}

/// Explicit shape discriminator a catalog entry may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Structure {
    #[serde(rename = "simple")]
    Simple,
    #[serde(rename = "byProvider")]
    ByProvider,
}

/// The two file-set shapes a feature can use, decided once at load time
#[derive(Debug, Clone, PartialEq)]
pub enum FileSetSpec {
    /// framework -> files
    Simple(IndexMap<String, FrameworkFiles>),
    /// provider -> framework -> language -> files
    ByProvider(IndexMap<String, IndexMap<String, IndexMap<String, FileBucket>>>),
}

impl FileSetSpec {
    /// Build a file set from the raw `files` document of a feature.
    ///
    /// An explicit `structure` wins. Without one the first top-level entry
    /// decides: a file bucket, or a language map of buckets, means framework
    /// first; anything deeper means provider first.
    pub fn from_value(feature: &str, files: Value, structure: Option<Structure>) -> Result<Self> {
        let invalid = |reason: String| InstallerError::InvalidFeature {
            feature: feature.to_string(),
            reason,
        };

        let map = match files {
            Value::Object(map) => map,
            other => {
                return Err(invalid(format!(
                    "expected an object of files, found {}",
                    json_kind(&other)
                )))
            }
        };

        let structure = structure.unwrap_or_else(|| match map.values().next() {
            Some(first) if !is_framework_files(first) => Structure::ByProvider,
            _ => Structure::Simple,
        });

        match structure {
            Structure::Simple => {
                let mut frameworks = IndexMap::new();
                for (framework, value) in map {
                    let files = if first_value_has_action(&value) {
                        FrameworkFiles::Flat(
                            serde_json::from_value(value)
                                .map_err(|e| invalid(format!("{}: {}", framework, e)))?,
                        )
                    } else {
                        FrameworkFiles::ByLanguage(
                            serde_json::from_value(value)
                                .map_err(|e| invalid(format!("{}: {}", framework, e)))?,
                        )
                    };
                    frameworks.insert(framework, files);
                }
                Ok(FileSetSpec::Simple(frameworks))
            }
            Structure::ByProvider => {
                let providers = serde_json::from_value(Value::Object(map))
                    .map_err(|e| invalid(e.to_string()))?;
                Ok(FileSetSpec::ByProvider(providers))
            }
        }
    }

    pub fn structure(&self) -> Structure {
        match self {
            FileSetSpec::Simple(_) => Structure::Simple,
            FileSetSpec::ByProvider(_) => Structure::ByProvider,
        }
    }
}

/// A bucket with no language split is recognised by its first entry
/// carrying an `action`. Empty objects count as flat.
fn first_value_has_action(value: &Value) -> bool {
    match value.as_object() {
        Some(obj) => match obj.values().next() {
            Some(first) => first.get("action").is_some(),
            None => true,
        },
        None => false,
    }
}

/// Framework files are either a bucket or a language map of buckets
fn is_framework_files(value: &Value) -> bool {
    if first_value_has_action(value) {
        return true;
    }
    value
        .as_object()
        .and_then(|obj| obj.values().next())
        .is_some_and(first_value_has_action)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A fully loaded feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDefinition {
    pub name: String,
    pub description: String,
    pub supported_frameworks: Vec<String>,
    pub supported_languages: Vec<String>,
    pub files: FileSetSpec,
}

impl FeatureDefinition {
    /// Providers in catalog order. Framework-first features have none.
    pub fn providers(&self) -> Vec<String> {
        match &self.files {
            FileSetSpec::Simple(_) => Vec::new(),
            FileSetSpec::ByProvider(providers) => providers.keys().cloned().collect(),
        }
    }

    pub fn has_provider(&self, provider: &str) -> bool {
        match &self.files {
            FileSetSpec::Simple(_) => false,
            FileSetSpec::ByProvider(providers) => providers.contains_key(provider),
        }
    }

    pub fn requires_provider(&self) -> bool {
        matches!(self.files, FileSetSpec::ByProvider(_))
    }

    pub fn supports_framework(&self, framework: &str) -> bool {
        self.supported_frameworks.iter().any(|f| f == framework)
    }

    /// Languages listed by the feature; an empty list means no restriction.
    /// JavaScript is accepted wherever TypeScript is.
    pub fn supports_language(&self, language: &str) -> bool {
        if self.supported_languages.is_empty() {
            return true;
        }
        let listed = |l: &str| self.supported_languages.iter().any(|s| s == l);
        listed(language) || (language == "javascript" && listed("typescript"))
    }

    /// Frameworks a given provider has files for, in catalog order
    pub fn frameworks_for_provider(&self, provider: &str) -> Vec<String> {
        match &self.files {
            FileSetSpec::Simple(frameworks) => frameworks.keys().cloned().collect(),
            FileSetSpec::ByProvider(providers) => providers
                .get(provider)
                .map(|fws| fws.keys().cloned().collect())
                .unwrap_or_default(),
        }
    }
}
