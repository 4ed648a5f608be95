//! Runtime tooling: language identifiers, package managers and git
//!
//! This module provides:
//! - Language identifiers shared by catalogs and detection
//! - Package manager command construction and dependency installation
//! - Git repository initialisation

pub mod check;
pub mod git;
pub mod package_manager;

pub use check::{check_git, check_tool, Language, RuntimeInfo};
pub use git::{init_repository, GitInit};
pub use package_manager::{CommandInstaller, DependencyInstaller, PackageManager};
