//! Installation root discovery
//!
//! The catalogs and template trees ship next to the CLI, wherever it was
//! installed. The root is found by trying, in order: an environment override,
//! a package-manifest walk-up from the working directory and the executable,
//! well-known global install locations, the `PATH`-resolved binary, and
//! finally the directory above the executable.

use crate::error::{InstallerError, Result};
use crate::product::ProductConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How many parent directories a walk-up inspects
const WALK_UP_LEVELS: usize = 5;

/// A directory containing `features/features.json` (and usually `template.json`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRoot {
    path: PathBuf,
}

impl InstallRoot {
    /// Use `path` as the root without searching
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Search the standard locations for the product
    pub fn discover<C: ProductConfig>(config: &C) -> Result<Self> {
        RootSearch::from_environment(config).discover()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn features_dir(&self) -> PathBuf {
        self.path.join("features")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.path.join("templates")
    }

    pub fn template_catalog_path(&self) -> PathBuf {
        self.path.join("template.json")
    }

    fn is_valid(path: &Path) -> bool {
        path.join("features").join("features.json").is_file()
    }
}

/// Inputs to root discovery, gathered from the process environment or
/// supplied directly in tests
#[derive(Debug, Clone, Default)]
pub struct RootSearch {
    pub env_override: Option<PathBuf>,
    pub current_dir: Option<PathBuf>,
    pub exe_dir: Option<PathBuf>,
    pub path_dirs: Vec<PathBuf>,
    pub global_dirs: Vec<PathBuf>,
    pub binary_name: String,
    pub package_names: Vec<String>,
}

impl RootSearch {
    pub fn from_environment<C: ProductConfig>(config: &C) -> Self {
        let package_names: Vec<String> =
            config.package_names().iter().map(|s| s.to_string()).collect();

        let mut global_dirs = Vec::new();
        for name in &package_names {
            if let Some(home) = dirs::home_dir() {
                global_dirs.push(home.join(".npm-global/lib/node_modules").join(name));
            }
            global_dirs.push(PathBuf::from("/usr/local/lib/node_modules").join(name));
            global_dirs.push(PathBuf::from("/usr/lib/node_modules").join(name));
        }
        if let Some(data) = dirs::data_dir() {
            global_dirs.push(data.join(config.cache_dir_name()));
        }
        if let Some(cache) = dirs::cache_dir() {
            global_dirs.push(cache.join(config.cache_dir_name()));
        }

        Self {
            env_override: std::env::var_os(config.root_env()).map(PathBuf::from),
            current_dir: std::env::current_dir().ok(),
            exe_dir: std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(Path::to_path_buf)),
            path_dirs: std::env::var_os("PATH")
                .map(|p| std::env::split_paths(&p).collect())
                .unwrap_or_default(),
            global_dirs,
            binary_name: config.name().to_string(),
            package_names,
        }
    }

    pub fn discover(&self) -> Result<InstallRoot> {
        let mut searched = Vec::new();

        let found = self
            .from_override(&mut searched)
            .or_else(|| self.from_walk_up(&mut searched))
            .or_else(|| self.from_global_dirs(&mut searched))
            .or_else(|| self.from_path_binary(&mut searched))
            .or_else(|| self.from_exe_fallback(&mut searched));

        match found {
            Some(path) => {
                debug!(root = %path.display(), "installation root found");
                Ok(InstallRoot::new(path))
            }
            None => Err(InstallerError::RootNotFound { searched }),
        }
    }

    fn check(candidate: PathBuf, searched: &mut Vec<PathBuf>) -> Option<PathBuf> {
        if InstallRoot::is_valid(&candidate) {
            Some(candidate)
        } else {
            searched.push(candidate);
            None
        }
    }

    fn from_override(&self, searched: &mut Vec<PathBuf>) -> Option<PathBuf> {
        let path = self.env_override.clone()?;
        Self::check(path, searched)
    }

    fn from_walk_up(&self, searched: &mut Vec<PathBuf>) -> Option<PathBuf> {
        let starts = [self.current_dir.as_deref(), self.exe_dir.as_deref()];
        starts
            .into_iter()
            .flatten()
            .find_map(|start| self.walk_up(start, searched))
    }

    /// Inspect `start` and its ancestors for the product's own package
    /// manifest or a local `node_modules` install of it
    fn walk_up(&self, start: &Path, searched: &mut Vec<PathBuf>) -> Option<PathBuf> {
        for dir in start.ancestors().take(WALK_UP_LEVELS + 1) {
            if self.is_product_manifest(&dir.join("package.json")) {
                if let Some(found) = Self::check(dir.to_path_buf(), searched) {
                    return Some(found);
                }
            }
            for name in &self.package_names {
                let local = dir.join("node_modules").join(name);
                if local.is_dir() {
                    if let Some(found) = Self::check(local, searched) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    fn is_product_manifest(&self, manifest: &Path) -> bool {
        let Ok(content) = std::fs::read_to_string(manifest) else {
            return false;
        };
        serde_json::from_str::<serde_json::Value>(&content)
            .ok()
            .and_then(|v| v.get("name").and_then(|n| n.as_str()).map(str::to_string))
            .is_some_and(|name| self.package_names.iter().any(|p| *p == name))
    }

    fn from_global_dirs(&self, searched: &mut Vec<PathBuf>) -> Option<PathBuf> {
        self.global_dirs
            .iter()
            .find_map(|dir| Self::check(dir.clone(), searched))
    }

    fn from_path_binary(&self, searched: &mut Vec<PathBuf>) -> Option<PathBuf> {
        let binary = self
            .path_dirs
            .iter()
            .map(|dir| dir.join(&self.binary_name))
            .find(|candidate| candidate.is_file())?;
        // npm links bin/<name> into the package directory
        let resolved = std::fs::canonicalize(&binary).unwrap_or(binary);
        let start = resolved.parent()?;

        start
            .ancestors()
            .take(WALK_UP_LEVELS + 1)
            .find_map(|dir| Self::check(dir.to_path_buf(), searched))
    }

    fn from_exe_fallback(&self, searched: &mut Vec<PathBuf>) -> Option<PathBuf> {
        let parent = self.exe_dir.as_deref()?.parent()?;
        Self::check(parent.to_path_buf(), searched)
    }
}
