//! Feature and template catalogs
//!
//! Both catalogs are read once by the command entry point and handed to the
//! resolver and applier. Per-feature JSON files referenced via `jsonPath` are
//! loaded eagerly so that every feature's file-set shape is known up front.

use crate::config::root::InstallRoot;
use crate::error::{InstallerError, Result};
use crate::features::model::{FeatureDefinition, FileSetSpec, Structure};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

/// Raw entry of `features/features.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCatalogEntry {
    #[serde(default)]
    pub supported_frameworks: Vec<String>,

    #[serde(default)]
    pub supported_languages: Vec<String>,

    #[serde(default)]
    pub description: String,

    /// Inline file set
    #[serde(default)]
    pub files: Option<Value>,

    /// Path of a per-feature JSON file, relative to `features/`
    #[serde(default)]
    pub json_path: Option<String>,

    /// Explicit shape; inferred when absent
    #[serde(default)]
    pub structure: Option<Structure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeaturesDocument {
    features: IndexMap<String, FeatureCatalogEntry>,
}

/// All features, loaded and shape-checked
#[derive(Debug, Clone, Default)]
pub struct FeatureCatalog {
    features: IndexMap<String, FeatureDefinition>,
}

impl FeatureCatalog {
    /// Load `features.json` from a features directory.
    ///
    /// A feature whose file set cannot be read or parsed is skipped with a
    /// warning so the rest of the catalog stays usable.
    pub fn load(features_dir: &Path) -> Result<Self> {
        let catalog_path = features_dir.join("features.json");
        let document: FeaturesDocument = read_json(&catalog_path)?;

        let mut features = IndexMap::new();
        for (name, entry) in document.features {
            match load_feature(features_dir, &name, entry) {
                Ok(definition) => {
                    features.insert(name, definition);
                }
                Err(e) => warn!(feature = %name, "skipping feature: {}", e),
            }
        }

        Ok(Self { features })
    }

    /// Build a catalog from already constructed definitions
    pub fn from_definitions(definitions: impl IntoIterator<Item = FeatureDefinition>) -> Self {
        Self {
            features: definitions
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    /// Look a feature up, listing the alternatives when it is missing
    pub fn feature(&self, name: &str) -> Result<&FeatureDefinition> {
        self.features
            .get(name)
            .ok_or_else(|| InstallerError::UnknownFeature {
                name: name.to_string(),
                available: self.names(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.features.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureDefinition> {
        self.features.values()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// One framework in `template.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkTemplates {
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub description: String,

    /// Language ids the templates are available in
    #[serde(default)]
    pub languages: Vec<String>,

    /// Template directory names
    #[serde(default)]
    pub templates: Vec<String>,

    /// Oldest CLI version the templates work with
    #[serde(default)]
    pub min_cli_version: Option<String>,
}

/// The template catalog (`template.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateCatalog {
    #[serde(default)]
    pub frameworks: IndexMap<String, FrameworkTemplates>,
}

impl TemplateCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        serde_json::from_str(content).map_err(|source| InstallerError::CatalogParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn framework(&self, name: &str) -> Result<&FrameworkTemplates> {
        self.frameworks
            .get(name)
            .ok_or_else(|| InstallerError::UnknownFramework {
                name: name.to_string(),
                available: self.frameworks.keys().cloned().collect(),
            })
    }
}

impl FrameworkTemplates {
    pub fn label<'a>(&'a self, id: &'a str) -> &'a str {
        self.display_name.as_deref().unwrap_or(id)
    }

    pub fn template(&self, name: &str) -> Result<&str> {
        self.templates
            .iter()
            .find(|t| t.as_str() == name)
            .map(String::as_str)
            .ok_or_else(|| InstallerError::UnknownTemplate {
                name: name.to_string(),
                available: self.templates.clone(),
            })
    }
}

/// Both catalogs of an installation
#[derive(Debug, Clone)]
pub struct Catalog {
    pub features: FeatureCatalog,
    pub templates: TemplateCatalog,
}

impl Catalog {
    /// Load both catalogs. A missing template catalog is tolerated so that
    /// feature-only installations keep working.
    pub fn load(root: &InstallRoot) -> Result<Self> {
        let features = FeatureCatalog::load(&root.features_dir())?;
        let template_path = root.template_catalog_path();
        let templates = if template_path.exists() {
            TemplateCatalog::load(&template_path)?
        } else {
            debug!(path = %template_path.display(), "no template catalog");
            TemplateCatalog::default()
        };
        Ok(Self {
            features,
            templates,
        })
    }
}

fn load_feature(
    features_dir: &Path,
    name: &str,
    entry: FeatureCatalogEntry,
) -> Result<FeatureDefinition> {
    let files = match (entry.files, &entry.json_path) {
        (Some(files), _) => files,
        (None, Some(json_path)) => {
            let path = features_dir.join(json_path);
            debug!(feature = %name, path = %path.display(), "loading feature file");
            read_json::<Value>(&path)?
        }
        (None, None) => {
            return Err(InstallerError::InvalidFeature {
                feature: name.to_string(),
                reason: "neither `files` nor `jsonPath` is set".to_string(),
            })
        }
    };

    Ok(FeatureDefinition {
        files: FileSetSpec::from_value(name, files, entry.structure)?,
        name: name.to_string(),
        description: entry.description,
        supported_frameworks: entry.supported_frameworks,
        supported_languages: entry.supported_languages,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|source| InstallerError::CatalogRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| InstallerError::CatalogParse {
        path: path.to_path_buf(),
        source,
    })
}
