//! The add-feature flow
//!
//! Planning validates the request against the catalog, resolves the file set
//! and decides source and destination for every file without touching the
//! project. Applying then walks the plan strictly in catalog order, since
//! later files may depend on earlier ones. There is no rollback: a write
//! failure stops the run and leaves already-applied files in place.

use crate::config::catalog::FeatureCatalog;
use crate::detect::ProjectInfo;
use crate::error::{InstallerError, Result};
use crate::features::actions::{apply_action, ActionOutcome};
use crate::features::model::{FeatureDefinition, FileAction};
use crate::features::placement::place_file;
use crate::features::resolver::{locate_template, resolve_files};
use crate::runtime::check::Language;
use crate::runtime::package_manager::DependencyInstaller;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything needed to add a feature to a project
#[derive(Debug, Clone)]
pub struct FeatureRequest<'a> {
    pub feature: &'a str,
    pub provider: Option<&'a str>,
    pub framework: &'a str,
    pub language: Language,
    pub has_src_folder: bool,
    pub project_dir: &'a Path,
}

impl<'a> FeatureRequest<'a> {
    /// Build a request from detected project information.
    ///
    /// Returns `None` when no framework is known for the project.
    pub fn for_project(
        feature: &'a str,
        provider: Option<&'a str>,
        info: &'a ProjectInfo,
        project_dir: &'a Path,
    ) -> Option<Self> {
        Some(Self {
            feature,
            provider,
            framework: info.framework.as_deref()?,
            language: info.language,
            has_src_folder: info.has_src_folder,
            project_dir,
        })
    }
}

/// One file of a plan
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFile {
    /// Path as declared in the catalog
    pub path: String,
    pub action: FileAction,
    /// Template on disk, if one was found
    pub source: Option<PathBuf>,
    /// Destination in the project
    pub target: PathBuf,
}

/// A validated, resolved feature addition
#[derive(Debug, Clone)]
pub struct FeaturePlan<'a> {
    pub feature: &'a FeatureDefinition,
    pub provider: Option<String>,
    pub framework: String,
    pub language: Language,
    /// JavaScript was requested and TypeScript files are used
    pub language_fallback: bool,
    pub files: Vec<PlannedFile>,
    project_dir: PathBuf,
}

/// Result for one applied file
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: String,
    pub action: FileAction,
    pub target: PathBuf,
    pub outcome: ActionOutcome,
}

/// Result of an add-feature run
#[derive(Debug, Clone)]
pub struct FeatureReport {
    pub feature: String,
    pub provider: Option<String>,
    pub framework: String,
    pub language: Language,
    pub language_fallback: bool,
    pub files: Vec<FileReport>,
}

impl FeatureReport {
    pub fn modified_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome.modified_project())
            .count()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.outcome.is_warning())
    }
}

/// Validate a request and work out what would be written where.
///
/// Fails before any file is touched when the feature, framework, language or
/// provider is not in the catalog, or when nothing is configured for the
/// combination.
pub fn plan_feature<'a>(
    catalog: &'a FeatureCatalog,
    features_dir: &Path,
    request: &FeatureRequest<'_>,
) -> Result<FeaturePlan<'a>> {
    let feature = catalog.feature(request.feature)?;
    let language = request.language.id();

    if !feature.supports_framework(request.framework) {
        return Err(InstallerError::UnsupportedFramework {
            feature: feature.name.clone(),
            framework: request.framework.to_string(),
            supported: feature.supported_frameworks.clone(),
        });
    }
    if !feature.supports_language(language) {
        return Err(InstallerError::UnsupportedLanguage {
            feature: feature.name.clone(),
            language: language.to_string(),
            supported: feature.supported_languages.clone(),
        });
    }

    let provider = if feature.requires_provider() {
        match request.provider {
            None => {
                return Err(InstallerError::MissingProvider {
                    feature: feature.name.clone(),
                    available: feature.providers(),
                })
            }
            Some(p) if !feature.has_provider(p) => {
                return Err(InstallerError::UnknownProvider {
                    feature: feature.name.clone(),
                    provider: p.to_string(),
                    available: feature.providers(),
                })
            }
            Some(p) => Some(p),
        }
    } else {
        if let Some(p) = request.provider {
            debug!(feature = %feature.name, provider = p, "feature has no providers, ignoring");
        }
        None
    };

    let resolution = resolve_files(feature, provider, request.framework, language);
    if resolution.is_empty() {
        return Err(InstallerError::NoFilesConfigured {
            feature: feature.name.clone(),
            provider: provider.unwrap_or("default").to_string(),
            framework: request.framework.to_string(),
            language: language.to_string(),
        });
    }

    let files = resolution
        .files()
        .map(|(path, entry)| PlannedFile {
            path: path.clone(),
            action: entry.action,
            source: locate_template(
                features_dir,
                &feature.name,
                provider,
                request.framework,
                language,
                path,
            ),
            target: place_file(
                path,
                Some(request.framework),
                request.has_src_folder,
                request.project_dir,
            ),
        })
        .collect();

    Ok(FeaturePlan {
        feature,
        provider: provider.map(str::to_string),
        framework: request.framework.to_string(),
        language: request.language,
        language_fallback: resolution.language_fallback,
        files,
        project_dir: request.project_dir.to_path_buf(),
    })
}

/// Apply a plan file by file, in order
pub async fn apply_plan<I: DependencyInstaller>(
    plan: &FeaturePlan<'_>,
    installer: &I,
) -> Result<FeatureReport> {
    let mut files = Vec::with_capacity(plan.files.len());

    for file in &plan.files {
        let outcome = apply_action(
            file.action,
            file.source.as_deref(),
            &file.target,
            &plan.project_dir,
            installer,
        )
        .await?;
        files.push(FileReport {
            path: file.path.clone(),
            action: file.action,
            target: file.target.clone(),
            outcome,
        });
    }

    let report = FeatureReport {
        feature: plan.feature.name.clone(),
        provider: plan.provider.clone(),
        framework: plan.framework.clone(),
        language: plan.language,
        language_fallback: plan.language_fallback,
        files,
    };
    info!(
        feature = %report.feature,
        modified = report.modified_count(),
        "feature applied"
    );
    Ok(report)
}

/// Plan and apply a feature in one go
pub async fn add_feature<I: DependencyInstaller>(
    catalog: &FeatureCatalog,
    features_dir: &Path,
    request: &FeatureRequest<'_>,
    installer: &I,
) -> Result<FeatureReport> {
    let plan = plan_feature(catalog, features_dir, request)?;
    apply_plan(&plan, installer).await
}

/// One line per feature for listings
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSummary {
    pub name: String,
    pub description: String,
    pub providers: Vec<String>,
    pub frameworks: Vec<String>,
}

pub fn list_features(catalog: &FeatureCatalog) -> Vec<FeatureSummary> {
    catalog
        .iter()
        .map(|f| FeatureSummary {
            name: f.name.clone(),
            description: f.description.clone(),
            providers: f.providers(),
            frameworks: f.supported_frameworks.clone(),
        })
        .collect()
}
