//! Template file copying with placeholder substitution

use crate::templates::fetcher::TemplateFiles;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// Values substituted into `{{...}}` placeholders
#[derive(Debug, Clone)]
pub struct Placeholders<'a> {
    pub project_name: &'a str,
    pub framework: &'a str,
    pub language: &'a str,
}

impl Placeholders<'_> {
    fn apply(&self, content: &str) -> String {
        content
            .replace("{{projectName}}", self.project_name)
            .replace("{{framework}}", self.framework)
            .replace("{{language}}", self.language)
    }
}

/// Dotfiles are stored under an underscore name in templates
const RENAMES: &[(&str, &str)] = &[("_gitignore", ".gitignore"), ("_npmrc", ".npmrc")];

fn destination_path(file_path: &str) -> String {
    let (dir, name) = match file_path.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, file_path),
    };
    let name = RENAMES
        .iter()
        .find(|(from, _)| *from == name)
        .map_or(name, |(_, to)| *to);
    match dir {
        Some(dir) => format!("{}/{}", dir, name),
        None => name.to_string(),
    }
}

/// Copy template files to the target directory.
///
/// Text files get placeholder substitution; anything that is not valid UTF-8
/// is written byte for byte. Returns the written paths relative to
/// `target_dir`.
pub async fn copy_template(
    template: &TemplateFiles,
    target_dir: &Path,
    placeholders: &Placeholders<'_>,
) -> Result<Vec<String>> {
    fs::create_dir_all(target_dir)
        .await
        .context("Failed to create target directory")?;

    let mut copied_files = Vec::new();

    for (file_path, content) in template.included() {
        let relative = destination_path(file_path);
        let target_path = target_dir.join(&relative);
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let result = match std::str::from_utf8(content) {
            Ok(text) => fs::write(&target_path, placeholders.apply(text)).await,
            Err(_) => fs::write(&target_path, content).await,
        };
        result.with_context(|| format!("Failed to write file: {}", target_path.display()))?;

        copied_files.push(relative);
    }

    Ok(copied_files)
}
