//! Error types for catalog lookups, resolution and file mutation

use std::path::PathBuf;
use thiserror::Error;

/// Result type for installer-core operations
pub type Result<T> = std::result::Result<T, InstallerError>;

/// Errors raised by the library layer.
///
/// Lookup failures carry the list of valid alternatives (in catalog order) so
/// the caller can show the user what to pick instead.
#[derive(Error, Debug)]
pub enum InstallerError {
    #[error("Failed to read catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog {path}: {source}")]
    CatalogParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Feature '{feature}' is misconfigured: {reason}")]
    InvalidFeature { feature: String, reason: String },

    #[error("Feature '{name}' not found. Available features: {}", .available.join(", "))]
    UnknownFeature { name: String, available: Vec<String> },

    #[error("Feature '{feature}' needs a provider. Available providers: {}", .available.join(", "))]
    MissingProvider {
        feature: String,
        available: Vec<String>,
    },

    #[error(
        "Provider '{provider}' not found for feature '{feature}'. Available providers: {}",
        .available.join(", ")
    )]
    UnknownProvider {
        feature: String,
        provider: String,
        available: Vec<String>,
    },

    #[error(
        "Feature '{feature}' does not support framework '{framework}'. Supported frameworks: {}",
        .supported.join(", ")
    )]
    UnsupportedFramework {
        feature: String,
        framework: String,
        supported: Vec<String>,
    },

    #[error(
        "Feature '{feature}' does not support language '{language}'. Supported languages: {}",
        .supported.join(", ")
    )]
    UnsupportedLanguage {
        feature: String,
        language: String,
        supported: Vec<String>,
    },

    #[error("No files configured for {feature}/{provider}/{framework}/{language}")]
    NoFilesConfigured {
        feature: String,
        provider: String,
        framework: String,
        language: String,
    },

    #[error("Framework '{name}' not found. Available frameworks: {}", .available.join(", "))]
    UnknownFramework { name: String, available: Vec<String> },

    #[error("Template '{name}' not found. Available templates: {}", .available.join(", "))]
    UnknownTemplate { name: String, available: Vec<String> },

    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not locate the installation root. Searched:\n{}", format_searched(.searched))]
    RootNotFound { searched: Vec<PathBuf> },
}

fn format_searched(searched: &[PathBuf]) -> String {
    searched
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

impl InstallerError {
    /// Whether the error was raised before any file in the project was touched
    pub fn is_configuration_error(&self) -> bool {
        !matches!(
            self,
            InstallerError::FileRead { .. } | InstallerError::FileWrite { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_lists_alternatives() {
        let err = InstallerError::UnknownProvider {
            feature: "auth".to_string(),
            provider: "okta".to_string(),
            available: vec!["clerk".to_string(), "auth0".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("'okta'"));
        assert!(message.ends_with("clerk, auth0"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_write_error_is_not_configuration_error() {
        let err = InstallerError::FileWrite {
            path: PathBuf::from("/tmp/x"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn test_root_not_found_lists_paths() {
        let err = InstallerError::RootNotFound {
            searched: vec![PathBuf::from("/a"), PathBuf::from("/b")],
        };
        let message = err.to_string();
        assert!(message.contains("  - /a"));
        assert!(message.contains("  - /b"));
    }
}
