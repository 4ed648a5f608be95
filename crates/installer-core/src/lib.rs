//! Installer Core - library behind the `pi` package installer CLI
//!
//! This library creates projects from framework templates and adds features
//! (authentication, docker, databases, ...) to existing projects. Features are
//! described by a JSON catalog shipped with the installation; the library
//! resolves which template files apply to a project's framework, language and
//! chosen provider, places them according to the project layout, and applies
//! one of five file actions to each.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **Layer 1: Core Operations** - catalog loading, stack detection, feature
//!   resolution, file actions, template fetching and copying
//! - **Layer 2: Workflow Orchestration** - `ProductConfig`, `add_feature`,
//!   `create_project` and the best-effort cache
//! - **Layer 3: CLI/TUI Interface** - Optional cliclack-based prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based TUI prompts module
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use installer_core::{
//!     add_feature, detect_project, Catalog, CommandInstaller, FeatureRequest, InstallRoot,
//! };
//!
//! let root = InstallRoot::discover(&MyConfig)?;
//! let catalog = Catalog::load(&root)?;
//! let info = detect_project(&project_dir);
//! let request = FeatureRequest::for_project("auth", Some("clerk"), &info, &project_dir)
//!     .expect("framework detected");
//! let installer = CommandInstaller::new(info.package_manager, &project_dir);
//! let report = add_feature(&catalog.features, &root.features_dir(), &request, &installer).await?;
//! ```

pub mod cache;
pub mod config;
pub mod detect;
pub mod error;
pub mod features;
pub mod product;
pub mod runtime;
pub mod templates;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use cache::{CacheStore, EvictionPolicy, Preferences};
pub use config::{Catalog, FeatureCatalog, InstallRoot, TemplateCatalog};
pub use detect::{detect_project, ProjectInfo};
pub use error::{InstallerError, Result};
pub use features::{
    add_feature, list_features, plan_feature, ActionOutcome, FeatureReport, FeatureRequest,
    FileAction,
};
pub use product::ProductConfig;
pub use runtime::{CommandInstaller, DependencyInstaller, Language, PackageManager};
pub use templates::{
    create_project, pack_templates, ProjectRequest, TemplateFetcher, TemplateSource,
};

/// CLI version - used for template compatibility checking
/// Each binary should define its own version, but this provides a fallback
pub const DEFAULT_CLI_VERSION: &str = "0.1.0";
