//! File actions applied to a target project
//!
//! Each declared file moves through its action independently; nothing is
//! shared between files. `create`, `append` and `prepend` are idempotent
//! against an unchanged source and target. `overwrite` always re-applies.

use crate::error::{InstallerError, Result};
use crate::features::model::FileAction;
use crate::features::transform::process_content;
use crate::runtime::package_manager::DependencyInstaller;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

/// What applying one file did to the project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Target did not exist and was written
    Created,
    /// Target existed and was replaced
    Updated,
    /// `create` found the target already present
    AlreadyExists,
    Appended,
    Prepended,
    /// Source content was already present in the target
    Duplicate,
    /// No template file was found for the entry
    MissingTemplate,
    Installed {
        packages: Vec<String>,
        dev_packages: Vec<String>,
        reported: Vec<String>,
    },
    /// Dependencies could not be installed; the commands let the user retry by hand
    InstallFailed {
        error: String,
        manual_commands: Vec<String>,
    },
    NothingToInstall,
}

impl ActionOutcome {
    /// Whether the project tree was modified
    pub fn modified_project(&self) -> bool {
        matches!(
            self,
            ActionOutcome::Created
                | ActionOutcome::Updated
                | ActionOutcome::Appended
                | ActionOutcome::Prepended
        )
    }

    /// Whether the user should be warned about this file
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ActionOutcome::MissingTemplate | ActionOutcome::InstallFailed { .. }
        )
    }

    pub fn describe(&self) -> String {
        match self {
            ActionOutcome::Created => "created".to_string(),
            ActionOutcome::Updated => "updated".to_string(),
            ActionOutcome::AlreadyExists => "already exists, skipped".to_string(),
            ActionOutcome::Appended => "appended".to_string(),
            ActionOutcome::Prepended => "prepended".to_string(),
            ActionOutcome::Duplicate => "content already present, skipped".to_string(),
            ActionOutcome::MissingTemplate => "template not found, skipped".to_string(),
            ActionOutcome::Installed {
                packages,
                dev_packages,
                ..
            } => format!(
                "installed {} package(s), {} dev package(s)",
                packages.len(),
                dev_packages.len()
            ),
            ActionOutcome::InstallFailed { error, .. } => format!("install failed: {}", error),
            ActionOutcome::NothingToInstall => "nothing to install".to_string(),
        }
    }
}

/// Package-manifest fragment used by the `install` action
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestFragment {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
}

/// Apply `action` from `source` (if a template was found) to `target`
pub async fn apply_action<I: DependencyInstaller>(
    action: FileAction,
    source: Option<&Path>,
    target: &Path,
    project_root: &Path,
    installer: &I,
) -> Result<ActionOutcome> {
    if action == FileAction::Install {
        return match source {
            Some(source) => install_from_manifest(source, installer).await,
            None => Ok(ActionOutcome::NothingToInstall),
        };
    }

    let Some(source) = source else {
        warn!(path = %target.display(), %action, "template file not found, skipping");
        return Ok(ActionOutcome::MissingTemplate);
    };

    let outcome = match action {
        FileAction::Create => {
            if target.exists() {
                ActionOutcome::AlreadyExists
            } else {
                let content = load_processed(source, target, project_root).await?;
                write_file(target, &content).await?;
                ActionOutcome::Created
            }
        }
        FileAction::Overwrite => {
            let existed = target.exists();
            let content = load_processed(source, target, project_root).await?;
            write_file(target, &content).await?;
            if existed {
                ActionOutcome::Updated
            } else {
                ActionOutcome::Created
            }
        }
        FileAction::Append | FileAction::Prepend => {
            let existing = read_existing(target).await?;
            let processed = load_processed(source, target, project_root).await?;
            let addition = String::from_utf8_lossy(&processed).into_owned();

            if existing.contains(addition.trim()) {
                ActionOutcome::Duplicate
            } else {
                let combined = if existing.is_empty() {
                    addition
                } else if action == FileAction::Append {
                    format!("{}\n{}", existing, addition)
                } else {
                    format!("{}\n{}", addition, existing)
                };
                write_file(target, combined.as_bytes()).await?;
                if action == FileAction::Append {
                    ActionOutcome::Appended
                } else {
                    ActionOutcome::Prepended
                }
            }
        }
        FileAction::Install => unreachable!("install handled above"),
    };

    info!(path = %target.display(), %action, outcome = %outcome.describe(), "applied file");
    Ok(outcome)
}

async fn install_from_manifest<I: DependencyInstaller>(
    source: &Path,
    installer: &I,
) -> Result<ActionOutcome> {
    let content = fs::read_to_string(source)
        .await
        .map_err(|e| InstallerError::FileRead {
            path: source.to_path_buf(),
            source: e,
        })?;

    let fragment: ManifestFragment = match serde_json::from_str(&content) {
        Ok(fragment) => fragment,
        Err(e) => {
            warn!(source = %source.display(), "invalid package manifest fragment: {}", e);
            return Ok(ActionOutcome::InstallFailed {
                error: format!("invalid package manifest {}: {}", source.display(), e),
                manual_commands: Vec::new(),
            });
        }
    };

    let packages: Vec<String> = fragment.dependencies.into_keys().collect();
    let dev_packages: Vec<String> = fragment.dev_dependencies.into_keys().collect();

    if packages.is_empty() && dev_packages.is_empty() {
        return Ok(ActionOutcome::NothingToInstall);
    }

    let mut reported = Vec::new();
    let mut errors = Vec::new();
    let mut manual_commands = Vec::new();

    for (group, dev) in [(&packages, false), (&dev_packages, true)] {
        if group.is_empty() {
            continue;
        }
        match installer.install(group, dev).await {
            Ok(names) => reported.extend(names),
            Err(e) => {
                warn!(dev, "dependency install failed: {}", e);
                errors.push(e.to_string());
                manual_commands.push(installer.manual_command(group, dev));
            }
        }
    }

    if errors.is_empty() {
        Ok(ActionOutcome::Installed {
            packages,
            dev_packages,
            reported,
        })
    } else {
        Ok(ActionOutcome::InstallFailed {
            error: errors.join("; "),
            manual_commands,
        })
    }
}

/// Source bytes, with the import rewrite applied when the file is text
async fn load_processed(source: &Path, target: &Path, project_root: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(source).await.map_err(|e| InstallerError::FileRead {
        path: source.to_path_buf(),
        source: e,
    })?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(process_content(&text, target, project_root)
            .into_owned()
            .into_bytes()),
        // Binary templates are copied verbatim
        Err(e) => Ok(e.into_bytes()),
    }
}

async fn read_existing(target: &Path) -> Result<String> {
    match fs::read(target).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(InstallerError::FileRead {
            path: target.to_path_buf(),
            source: e,
        }),
    }
}

async fn write_file(target: &Path, content: &[u8]) -> Result<()> {
    let write_error = |e| InstallerError::FileWrite {
        path: target.to_path_buf(),
        source: e,
    };
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    fs::write(target, content).await.map_err(write_error)
}
