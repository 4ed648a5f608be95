//! Project stack detection
//!
//! Inspects an existing project directory (package manifest, lockfiles,
//! framework config files) to infer the framework, language, package manager
//! and source-folder convention a feature should be applied with.

use crate::runtime::check::Language;
use crate::runtime::package_manager::PackageManager;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What was inferred about a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub project_name: String,
    pub framework: Option<String>,
    pub language: Language,
    pub package_manager: PackageManager,
    pub has_src_folder: bool,
}

impl ProjectInfo {
    /// Replace detected values with ones the user supplied.
    ///
    /// The source-folder flag is recomputed because it depends on the framework.
    pub fn with_overrides(
        mut self,
        dir: &Path,
        framework: Option<&str>,
        language: Option<Language>,
    ) -> Self {
        if let Some(framework) = framework {
            self.framework = Some(framework.to_string());
            self.has_src_folder = detect_src_folder(dir, Some(framework));
        }
        if let Some(language) = language {
            self.language = language;
        }
        self
    }
}

/// Dependency name -> framework id, checked in order
const DEPENDENCY_FRAMEWORKS: &[(&str, &str)] = &[
    ("next", "nextjs"),
    ("@nestjs/core", "nestjs"),
    ("@angular/core", "angularjs"),
    ("@remix-run/react", "remixjs"),
    ("vue", "vuejs"),
    ("react", "reactjs"),
    ("express", "expressjs"),
];

/// Config file -> framework id, used when dependencies are inconclusive
const CONFIG_FRAMEWORKS: &[(&str, &str)] = &[
    ("next.config.js", "nextjs"),
    ("next.config.mjs", "nextjs"),
    ("next.config.ts", "nextjs"),
    ("nest-cli.json", "nestjs"),
    ("angular.json", "angularjs"),
    ("vue.config.js", "vuejs"),
    ("remix.config.js", "remixjs"),
];

/// Inspect `dir` and infer its stack
pub fn detect_project(dir: &Path) -> ProjectInfo {
    let project_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());

    let manifest = read_package_json(dir);

    let (framework, language, package_manager) = if let Some(manifest) = &manifest {
        let framework = framework_from_dependencies(manifest)
            .or_else(|| framework_from_config(dir));
        let typescript =
            dir.join("tsconfig.json").exists() || has_dependency(manifest, "typescript");
        let language = if typescript {
            Language::TypeScript
        } else {
            Language::JavaScript
        };
        (framework, language, detect_node_package_manager(dir))
    } else if dir.join("Cargo.toml").exists() {
        (Some("rust".to_string()), Language::Rust, PackageManager::Cargo)
    } else if dir.join("go.mod").exists() {
        (Some("go".to_string()), Language::Go, PackageManager::Go)
    } else if dir.join("manage.py").exists() {
        (Some("django".to_string()), Language::Python, PackageManager::Pip)
    } else if dir.join("requirements.txt").exists() || dir.join("pyproject.toml").exists() {
        (None, Language::Python, PackageManager::Pip)
    } else {
        (
            framework_from_config(dir),
            if dir.join("tsconfig.json").exists() {
                Language::TypeScript
            } else {
                Language::JavaScript
            },
            detect_node_package_manager(dir),
        )
    };

    let project_name = manifest
        .as_ref()
        .and_then(|m| m.get("name"))
        .and_then(|n| n.as_str())
        .map(str::to_string)
        .unwrap_or(project_name);

    ProjectInfo {
        project_name,
        has_src_folder: detect_src_folder(dir, framework.as_deref()),
        framework,
        language,
        package_manager,
    }
}

/// Lockfile precedence: pnpm > yarn > bun > npm
pub fn detect_node_package_manager(dir: &Path) -> PackageManager {
    if dir.join("pnpm-lock.yaml").exists() {
        PackageManager::Pnpm
    } else if dir.join("yarn.lock").exists() {
        PackageManager::Yarn
    } else if dir.join("bun.lockb").exists() || dir.join("bun.lock").exists() {
        PackageManager::Bun
    } else {
        PackageManager::Npm
    }
}

/// Whether code for `framework` conventionally lives under `src/`
pub fn detect_src_folder(dir: &Path, framework: Option<&str>) -> bool {
    match framework {
        Some("nextjs") => detect_next_src_folder(dir),
        Some("nestjs") => true,
        _ => dir.join("src").is_dir(),
    }
}

/// Next.js supports both `app/` and `src/app/`; look at where routes actually live
fn detect_next_src_folder(dir: &Path) -> bool {
    let src = dir.join("src");
    if src.join("app").is_dir() || src.join("pages").is_dir() {
        return true;
    }
    if dir.join("app").is_dir() || dir.join("pages").is_dir() {
        return false;
    }
    if ["components", "lib", "utils", "hooks", "styles"]
        .iter()
        .any(|sub| src.join(sub).is_dir())
    {
        return true;
    }
    src.is_dir()
}

fn read_package_json(dir: &Path) -> Option<serde_json::Value> {
    let content = std::fs::read_to_string(dir.join("package.json")).ok()?;
    serde_json::from_str(&content).ok()
}

fn has_dependency(manifest: &serde_json::Value, name: &str) -> bool {
    ["dependencies", "devDependencies", "peerDependencies"]
        .iter()
        .any(|section| manifest.get(section).and_then(|d| d.get(name)).is_some())
}

fn framework_from_dependencies(manifest: &serde_json::Value) -> Option<String> {
    DEPENDENCY_FRAMEWORKS
        .iter()
        .find(|(dep, _)| has_dependency(manifest, dep))
        .map(|(_, framework)| framework.to_string())
}

fn framework_from_config(dir: &Path) -> Option<String> {
    CONFIG_FRAMEWORKS
        .iter()
        .find(|(file, _)| dir.join(file).exists())
        .map(|(_, framework)| framework.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn package_json(dir: &Path, body: &str) {
        fs::write(dir.join("package.json"), body).unwrap();
    }

    #[test]
    fn test_detects_nextjs_typescript_with_src() {
        let dir = TempDir::new().unwrap();
        package_json(
            dir.path(),
            r#"{ "name": "shop", "dependencies": { "next": "14.0.0", "react": "18.0.0" } }"#,
        );
        touch(dir.path(), "tsconfig.json");
        fs::create_dir_all(dir.path().join("src/app")).unwrap();

        let info = detect_project(dir.path());
        assert_eq!(info.project_name, "shop");
        assert_eq!(info.framework.as_deref(), Some("nextjs"));
        assert_eq!(info.language, Language::TypeScript);
        assert_eq!(info.package_manager, PackageManager::Npm);
        assert!(info.has_src_folder);
    }

    #[test]
    fn test_nextjs_root_app_dir_means_no_src() {
        let dir = TempDir::new().unwrap();
        package_json(dir.path(), r#"{ "dependencies": { "next": "14" } }"#);
        fs::create_dir_all(dir.path().join("app")).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();

        assert!(!detect_project(dir.path()).has_src_folder);
    }

    #[test]
    fn test_nextjs_src_subdirectory_heuristic() {
        let dir = TempDir::new().unwrap();
        package_json(dir.path(), r#"{ "dependencies": { "next": "14" } }"#);
        fs::create_dir_all(dir.path().join("src/components")).unwrap();

        assert!(detect_project(dir.path()).has_src_folder);
    }

    #[test]
    fn test_react_is_not_mistaken_for_next() {
        let dir = TempDir::new().unwrap();
        package_json(dir.path(), r#"{ "dependencies": { "react": "18" } }"#);
        let info = detect_project(dir.path());
        assert_eq!(info.framework.as_deref(), Some("reactjs"));
        assert_eq!(info.language, Language::JavaScript);
        assert!(!info.has_src_folder);
    }

    #[test]
    fn test_nestjs_always_has_src() {
        let dir = TempDir::new().unwrap();
        package_json(
            dir.path(),
            r#"{ "dependencies": { "@nestjs/core": "10" } }"#,
        );
        let info = detect_project(dir.path());
        assert_eq!(info.framework.as_deref(), Some("nestjs"));
        assert!(info.has_src_folder);
    }

    #[test]
    fn test_config_file_fallback() {
        let dir = TempDir::new().unwrap();
        package_json(dir.path(), r#"{ "name": "x" }"#);
        touch(dir.path(), "angular.json");
        assert_eq!(
            detect_project(dir.path()).framework.as_deref(),
            Some("angularjs")
        );
    }

    #[test]
    fn test_lockfile_precedence() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "package-lock.json");
        touch(dir.path(), "bun.lockb");
        assert_eq!(detect_node_package_manager(dir.path()), PackageManager::Bun);
        touch(dir.path(), "yarn.lock");
        assert_eq!(
            detect_node_package_manager(dir.path()),
            PackageManager::Yarn
        );
        touch(dir.path(), "pnpm-lock.yaml");
        assert_eq!(
            detect_node_package_manager(dir.path()),
            PackageManager::Pnpm
        );
    }

    #[test]
    fn test_non_node_projects() {
        let rust = TempDir::new().unwrap();
        touch(rust.path(), "Cargo.toml");
        let info = detect_project(rust.path());
        assert_eq!(info.language, Language::Rust);
        assert_eq!(info.package_manager, PackageManager::Cargo);

        let py = TempDir::new().unwrap();
        touch(py.path(), "requirements.txt");
        let info = detect_project(py.path());
        assert_eq!(info.framework, None);
        assert_eq!(info.package_manager, PackageManager::Pip);
    }

    #[test]
    fn test_overrides_recompute_src_folder() {
        let dir = TempDir::new().unwrap();
        package_json(dir.path(), r#"{ "dependencies": { "express": "4" } }"#);
        let info = detect_project(dir.path());
        assert!(!info.has_src_folder);

        let info = info.with_overrides(dir.path(), Some("nestjs"), Some(Language::TypeScript));
        assert_eq!(info.framework.as_deref(), Some("nestjs"));
        assert_eq!(info.language, Language::TypeScript);
        assert!(info.has_src_folder);
    }
}
