//! Project creation from framework templates
//!
//! This module provides:
//! - Per-template manifests (`template.yaml`)
//! - Template fetching from remote archives or the installation root
//! - Template copying with placeholder substitution
//! - Version compatibility checking
//! - Packing local templates into the archives served remotely

pub mod copier;
pub mod fetcher;
pub mod manifest;
pub mod version;

use crate::config::catalog::TemplateCatalog;
use crate::runtime::check::Language;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub use copier::{copy_template, Placeholders};
pub use fetcher::{build_template_zip, TemplateFetcher, TemplateFiles, TemplateSource};
pub use manifest::TemplateManifest;
pub use version::check_compatibility;

/// Reject names that cannot be used as a directory or package name
pub fn validate_project_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        anyhow::bail!("Project name cannot be empty");
    }
    if trimmed == "." || trimmed == ".." {
        anyhow::bail!("Project name cannot be '{}'", trimmed);
    }
    if let Some(c) = trimmed
        .chars()
        .find(|c| matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
    {
        anyhow::bail!("Project name cannot contain '{}'", c);
    }
    Ok(())
}

/// A project to create
#[derive(Debug, Clone)]
pub struct ProjectRequest<'a> {
    pub name: &'a str,
    pub framework: &'a str,
    pub template: &'a str,
    pub language: Language,
    /// Directory the project folder is created in
    pub parent_dir: &'a Path,
}

#[derive(Debug, Clone)]
pub struct CreatedProject {
    pub dir: PathBuf,
    pub files: Vec<String>,
    /// Display name from the template manifest
    pub template_name: Option<String>,
}

/// Validate a request against the template catalog and copy the template
/// into `<parent_dir>/<name>`. The target must not exist or be empty.
pub async fn create_project(
    fetcher: &mut TemplateFetcher,
    catalog: &TemplateCatalog,
    request: &ProjectRequest<'_>,
) -> Result<CreatedProject> {
    validate_project_name(request.name)?;
    let framework = catalog.framework(request.framework)?;
    let template = framework.template(request.template)?;
    if !framework.languages.is_empty()
        && !framework
            .languages
            .iter()
            .any(|l| l.as_str() == request.language.id())
    {
        anyhow::bail!(
            "{} templates are not available in {} (available: {})",
            framework.label(request.framework),
            request.language.display_name(),
            framework.languages.join(", ")
        );
    }

    let dir = request.parent_dir.join(request.name.trim());
    if dir.exists() {
        let occupied = std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to read {}", dir.display()))?
            .next()
            .is_some();
        if occupied {
            anyhow::bail!(
                "Directory {} already exists and is not empty",
                dir.display()
            );
        }
    }

    let files = fetcher
        .fetch(request.framework, template, request.language)
        .await?;
    if files.files.is_empty() {
        anyhow::bail!(
            "Template '{}/{}' has no files",
            request.framework,
            template
        );
    }

    let placeholders = Placeholders {
        project_name: request.name.trim(),
        framework: request.framework,
        language: request.language.id(),
    };
    let copied = copy_template(&files, &dir, &placeholders).await?;
    info!(dir = %dir.display(), files = copied.len(), "project created");

    Ok(CreatedProject {
        dir,
        files: copied,
        template_name: files.manifest.name,
    })
}

/// One archive written by [`pack_templates`]
#[derive(Debug, Clone, PartialEq)]
pub struct PackedTemplate {
    pub framework: String,
    pub template: String,
    pub path: PathBuf,
    pub size: usize,
}

fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            let name = entry.file_name().to_string_lossy().into_owned();
            dirs.push((name, entry.path()));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Build `<framework>/<template>.zip` for every template below
/// `templates_dir`, writing the archives under `out_dir`
pub fn pack_templates(templates_dir: &Path, out_dir: &Path) -> Result<Vec<PackedTemplate>> {
    if !templates_dir.is_dir() {
        anyhow::bail!("Template directory not found: {}", templates_dir.display());
    }

    let mut packed = Vec::new();
    for (framework, framework_dir) in subdirectories(templates_dir)? {
        let target_dir = out_dir.join(&framework);
        for (template, template_dir) in subdirectories(&framework_dir)? {
            let bytes = match build_template_zip(&template_dir, &template) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(framework = %framework, template = %template, "failed to pack: {:#}", e);
                    continue;
                }
            };

            std::fs::create_dir_all(&target_dir)
                .with_context(|| format!("Failed to create {}", target_dir.display()))?;
            let path = target_dir.join(format!("{}.zip", template));
            std::fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;

            packed.push(PackedTemplate {
                framework: framework.clone(),
                template,
                path,
                size: bytes.len(),
            });
        }
    }

    Ok(packed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::catalog::FrameworkTemplates;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn catalog() -> TemplateCatalog {
        let mut catalog = TemplateCatalog::default();
        catalog.frameworks.insert(
            "nextjs".into(),
            FrameworkTemplates {
                display_name: Some("Next.js".into()),
                description: String::new(),
                languages: vec!["typescript".into(), "javascript".into()],
                templates: vec!["basic".into()],
                min_cli_version: None,
            },
        );
        catalog
    }

    #[test]
    fn test_validate_project_name() {
        assert!(validate_project_name("my-app").is_ok());
        assert!(validate_project_name("  ").is_err());
        assert!(validate_project_name("..").is_err());
        assert!(validate_project_name("a/b").is_err());
    }

    #[tokio::test]
    async fn test_create_project_from_local_template() {
        let templates = TempDir::new().unwrap();
        write(
            templates.path(),
            "nextjs/basic/package.json",
            "{\"name\": \"{{projectName}}\"}",
        );
        write(templates.path(), "nextjs/basic/_gitignore", ".next\n");
        let parent = TempDir::new().unwrap();

        let source = TemplateSource::Local(templates.path().to_path_buf());
        let mut fetcher = TemplateFetcher::new(source, "test");
        let created = create_project(
            &mut fetcher,
            &catalog(),
            &ProjectRequest {
                name: "shop",
                framework: "nextjs",
                template: "basic",
                language: Language::TypeScript,
                parent_dir: parent.path(),
            },
        )
        .await
        .unwrap();

        assert_eq!(created.dir, parent.path().join("shop"));
        assert!(created.dir.join(".gitignore").exists());
        assert_eq!(
            fs::read_to_string(created.dir.join("package.json")).unwrap(),
            "{\"name\": \"shop\"}"
        );
    }

    #[tokio::test]
    async fn test_create_project_rejects_unsupported_language_and_occupied_dir() {
        let templates = TempDir::new().unwrap();
        write(templates.path(), "nextjs/basic/package.json", "{}");
        let parent = TempDir::new().unwrap();
        write(parent.path(), "shop/existing.txt", "x");

        let source = TemplateSource::Local(templates.path().to_path_buf());
        let mut fetcher = TemplateFetcher::new(source, "test");
        let mut request = ProjectRequest {
            name: "shop",
            framework: "nextjs",
            template: "basic",
            language: Language::Python,
            parent_dir: parent.path(),
        };
        assert!(create_project(&mut fetcher, &catalog(), &request).await.is_err());

        request.language = Language::TypeScript;
        let err = create_project(&mut fetcher, &catalog(), &request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not empty"));
    }

    #[test]
    fn test_pack_templates() {
        let templates = TempDir::new().unwrap();
        write(templates.path(), "nextjs/basic/package.json", "{}");
        write(templates.path(), "nextjs/full/package.json", "{}");
        write(templates.path(), "template.json", "{}");
        let out = TempDir::new().unwrap();

        let packed = pack_templates(templates.path(), out.path()).unwrap();

        assert_eq!(packed.len(), 2);
        assert_eq!(packed[0].template, "basic");
        assert!(out.path().join("nextjs/basic.zip").exists());
        assert!(out.path().join("nextjs/full.zip").exists());
    }
}
