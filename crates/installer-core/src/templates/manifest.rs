//! Per-template manifest (`template.yaml`)

use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "template.yaml";

/// Optional metadata shipped next to a template's files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateManifest {
    /// Display name of the template
    #[serde(default)]
    pub name: Option<String>,

    /// Description of what the template provides
    #[serde(default)]
    pub description: Option<String>,

    /// File patterns never copied into a project
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl TemplateManifest {
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Check if a filename matches any pattern in a list
    fn matches_any(filename: &str, patterns: &[String]) -> bool {
        patterns.iter().any(|pattern| {
            if let Some(suffix) = pattern.strip_prefix('*') {
                // Suffix match: *.log matches debug.log
                filename.ends_with(suffix)
            } else if let Some(prefix) = pattern.strip_suffix('*') {
                // Prefix match: .env* matches .env.local
                filename.starts_with(prefix)
            } else {
                filename == pattern
            }
        })
    }

    /// Whether `file_path` should be left out of generated projects.
    ///
    /// Patterns containing `/` are compared against the whole relative path,
    /// all others against the file name only. The manifest itself is always
    /// excluded.
    pub fn excludes(&self, file_path: &str) -> bool {
        let filename = file_path.rsplit('/').next().unwrap_or(file_path);
        if filename == MANIFEST_FILE {
            return true;
        }

        let (path_patterns, name_patterns): (Vec<String>, Vec<String>) = self
            .exclude
            .iter()
            .cloned()
            .partition(|p| p.contains('/'));

        Self::matches_any(filename, &name_patterns) || Self::matches_any(file_path, &path_patterns)
    }
}
