//! Product configuration trait for CLI binaries
//!
//! The binary implements this trait to describe its identity, where its
//! catalogs live and what to tell the user once a project is ready.

use crate::detect::ProjectInfo;
use std::path::Path;

/// Configuration trait for the CLI product
///
/// Defines:
/// - Product identity (binary name, display name, npm package names)
/// - Environment overrides for the installation root and remote templates
/// - Cache location
/// - Documentation links and post-setup instructions
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Binary name (also looked up on `PATH` during root discovery)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// npm package names the tool is published under
    fn package_names(&self) -> &'static [&'static str];

    /// Environment variable overriding the installation root
    fn root_env(&self) -> &'static str;

    /// Environment variable selecting a remote template base URL
    fn template_url_env(&self) -> &'static str;

    /// Directory name under the user cache directory
    fn cache_dir_name(&self) -> &'static str;

    /// URL for product documentation
    fn docs_url(&self) -> &'static str;

    /// Upgrade/install command shown in version warnings
    fn upgrade_command(&self) -> &'static str;

    /// Generate the "next steps" instructions after project creation
    fn next_steps(&self, dir: &Path, info: &ProjectInfo) -> Vec<String>;

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }
}
