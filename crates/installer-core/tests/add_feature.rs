use installer_core::config::{Catalog, InstallRoot};
use installer_core::features::{
    add_feature, plan_feature, ActionOutcome, FeatureReport, FeatureRequest,
};
use installer_core::{DependencyInstaller, InstallerError, Language};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Records install calls instead of running a package manager
#[derive(Default)]
struct FakeInstaller {
    calls: RefCell<Vec<(Vec<String>, bool)>>,
}

impl DependencyInstaller for FakeInstaller {
    async fn install(&self, packages: &[String], dev: bool) -> anyhow::Result<Vec<String>> {
        self.calls.borrow_mut().push((packages.to_vec(), dev));
        Ok(packages.to_vec())
    }

    fn manual_command(&self, packages: &[String], _dev: bool) -> String {
        format!("npm install {}", packages.join(" "))
    }
}

struct Installation {
    root: TempDir,
}

impl Installation {
    fn new() -> Self {
        let installation = Self {
            root: TempDir::new().unwrap(),
        };

        installation.write(
            "features/features.json",
            r#"{
              "features": {
                "auth": {
                  "description": "Authentication",
                  "supportedFrameworks": ["nextjs", "expressjs"],
                  "supportedLanguages": ["typescript", "javascript"],
                  "jsonPath": "auth/auth.json"
                },
                "docker": {
                  "description": "Docker",
                  "supportedFrameworks": ["expressjs", "nextjs"],
                  "files": {
                    "expressjs": {
                      "Dockerfile": { "action": "create" },
                      ".dockerignore": { "action": "create" }
                    }
                  }
                },
                "gitignore": {
                  "description": "Ignore rules",
                  "supportedFrameworks": ["expressjs"],
                  "files": { "expressjs": { ".gitignore": { "action": "append" } } }
                },
                "settings": {
                  "description": "Settings files",
                  "supportedFrameworks": ["expressjs"],
                  "files": {
                    "expressjs": {
                      "a.txt": { "action": "create" },
                      "blocked/b.txt": { "action": "create" },
                      "c.txt": { "action": "create" }
                    }
                  }
                },
                "users": {
                  "description": "Users module",
                  "supportedFrameworks": ["nestjs"],
                  "supportedLanguages": ["typescript"],
                  "files": {
                    "nestjs": { "controllers/user.controller.ts": { "action": "create" } }
                  }
                }
              }
            }"#,
        );
        installation.write(
            "features/auth/auth.json",
            r#"{
              "clerk": {
                "nextjs": {
                  "typescript": {
                    "package.json": { "action": "install" },
                    "middleware.ts": { "action": "create" },
                    "lib/auth.ts": { "action": "create" }
                  }
                }
              },
              "auth0": {
                "expressjs": {
                  "javascript": { "routes/auth.js": { "action": "create" } }
                }
              }
            }"#,
        );
        installation.write(
            "features/auth/clerk/nextjs/typescript/package.json",
            r#"{ "dependencies": { "@clerk/nextjs": "^6.0.0" } }"#,
        );
        installation.write(
            "features/auth/clerk/nextjs/typescript/middleware.ts",
            "import { clerkMiddleware } from \"@clerk/nextjs/server\";\n\
             export default clerkMiddleware();\n",
        );
        installation.write(
            "features/auth/clerk/nextjs/typescript/lib/auth.ts",
            "export const auth = () => null;\n",
        );
        installation.write(
            "features/docker/expressjs/Dockerfile",
            "FROM node:20-alpine\n",
        );
        installation.write("features/docker/.dockerignore", "node_modules\n");
        installation.write(
            "features/gitignore/.gitignore",
            "# added by feature\n.env\n",
        );
        installation.write("features/settings/a.txt", "a\n");
        installation.write("features/settings/blocked/b.txt", "b\n");
        installation.write("features/settings/c.txt", "c\n");
        installation.write(
            "features/users/nestjs/controllers/user.controller.ts",
            "export class UserController {}\n",
        );

        installation
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.root.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn root(&self) -> InstallRoot {
        InstallRoot::new(self.root.path())
    }

    fn catalog(&self) -> Catalog {
        Catalog::load(&self.root()).unwrap()
    }

    async fn add(
        &self,
        request: &FeatureRequest<'_>,
        installer: &FakeInstaller,
    ) -> installer_core::Result<FeatureReport> {
        let catalog = self.catalog();
        let features_dir = self.root().features_dir();
        add_feature(&catalog.features, &features_dir, request, installer).await
    }
}

/// A TypeScript request without provider for a project that has `src/`
fn request<'a>(feature: &'a str, framework: &'a str, project_dir: &'a Path) -> FeatureRequest<'a> {
    FeatureRequest {
        feature,
        provider: None,
        framework,
        language: Language::TypeScript,
        has_src_folder: true,
        project_dir,
    }
}

fn file_count(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .count()
}

#[tokio::test]
async fn test_clerk_on_nextjs_with_src_folder() {
    let installation = Installation::new();
    let project = TempDir::new().unwrap();
    let installer = FakeInstaller::default();
    let req = FeatureRequest {
        provider: Some("clerk"),
        ..request("auth", "nextjs", project.path())
    };

    let report = installation.add(&req, &installer).await.unwrap();

    assert!(!report.language_fallback);
    let targets: Vec<_> = report.files.iter().map(|f| f.target.clone()).collect();
    assert_eq!(
        targets,
        vec![
            project.path().join("package.json"),
            project.path().join("middleware.ts"),
            project.path().join("src/lib/auth.ts"),
        ]
    );
    assert!(project.path().join("middleware.ts").is_file());
    assert!(project.path().join("src/lib/auth.ts").is_file());
    // install never writes the manifest fragment into the project
    assert!(!project.path().join("package.json").exists());
    assert_eq!(
        *installer.calls.borrow(),
        vec![(vec!["@clerk/nextjs".to_string()], false)]
    );
}

#[tokio::test]
async fn test_javascript_falls_back_to_typescript_files() {
    let installation = Installation::new();
    let project = TempDir::new().unwrap();
    let req = FeatureRequest {
        provider: Some("clerk"),
        language: Language::JavaScript,
        ..request("auth", "nextjs", project.path())
    };

    let report = installation
        .add(&req, &FakeInstaller::default())
        .await
        .unwrap();

    assert!(report.language_fallback);
    let template = installation
        .root()
        .features_dir()
        .join("auth/clerk/nextjs/typescript/middleware.ts");
    assert_eq!(
        fs::read_to_string(project.path().join("middleware.ts")).unwrap(),
        fs::read_to_string(template).unwrap()
    );
}

#[tokio::test]
async fn test_docker_create_is_skipped_on_second_run() {
    let installation = Installation::new();
    let project = TempDir::new().unwrap();
    let req = FeatureRequest {
        language: Language::JavaScript,
        ..request("docker", "expressjs", project.path())
    };

    let first = installation
        .add(&req, &FakeInstaller::default())
        .await
        .unwrap();
    assert_eq!(first.files[0].outcome, ActionOutcome::Created);
    assert_eq!(first.files[1].outcome, ActionOutcome::Created);

    fs::write(project.path().join("Dockerfile"), "FROM custom\n").unwrap();

    let second = installation
        .add(&req, &FakeInstaller::default())
        .await
        .unwrap();
    assert_eq!(second.files[0].outcome, ActionOutcome::AlreadyExists);
    assert_eq!(second.modified_count(), 0);
    assert_eq!(
        fs::read_to_string(project.path().join("Dockerfile")).unwrap(),
        "FROM custom\n"
    );
}

#[tokio::test]
async fn test_append_is_idempotent() {
    let installation = Installation::new();
    let project = TempDir::new().unwrap();
    fs::write(project.path().join(".gitignore"), "node_modules\n").unwrap();
    let req = FeatureRequest {
        language: Language::JavaScript,
        has_src_folder: false,
        ..request("gitignore", "expressjs", project.path())
    };

    let first = installation
        .add(&req, &FakeInstaller::default())
        .await
        .unwrap();
    assert_eq!(first.files[0].outcome, ActionOutcome::Appended);
    let after_first = fs::read(project.path().join(".gitignore")).unwrap();
    assert_eq!(
        String::from_utf8_lossy(&after_first),
        "node_modules\n\n# added by feature\n.env\n"
    );

    let second = installation
        .add(&req, &FakeInstaller::default())
        .await
        .unwrap();
    assert_eq!(second.files[0].outcome, ActionOutcome::Duplicate);
    assert_eq!(
        fs::read(project.path().join(".gitignore")).unwrap(),
        after_first
    );
}

#[tokio::test]
async fn test_unknown_provider_aborts_before_writing() {
    let installation = Installation::new();
    let project = TempDir::new().unwrap();
    let req = FeatureRequest {
        provider: Some("firebase"),
        ..request("auth", "nextjs", project.path())
    };

    let err = installation
        .add(&req, &FakeInstaller::default())
        .await
        .unwrap_err();

    match err {
        InstallerError::UnknownProvider {
            provider,
            available,
            ..
        } => {
            assert_eq!(provider, "firebase");
            assert_eq!(available, vec!["clerk", "auth0"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(file_count(project.path()), 0);
}

#[tokio::test]
async fn test_write_failure_stops_without_rolling_back() {
    let installation = Installation::new();
    let project = TempDir::new().unwrap();
    // a regular file where the second target needs a directory
    fs::write(project.path().join("blocked"), "not a directory").unwrap();
    let req = FeatureRequest {
        language: Language::JavaScript,
        has_src_folder: false,
        ..request("settings", "expressjs", project.path())
    };

    let err = installation
        .add(&req, &FakeInstaller::default())
        .await
        .unwrap_err();

    match err {
        InstallerError::FileWrite { path, .. } => {
            assert!(path.starts_with(project.path().join("blocked")));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(
        fs::read_to_string(project.path().join("a.txt")).unwrap(),
        "a\n"
    );
    assert!(!project.path().join("c.txt").exists());
}

#[tokio::test]
async fn test_nestjs_always_places_under_src() {
    let installation = Installation::new();
    let project = TempDir::new().unwrap();
    let req = FeatureRequest {
        has_src_folder: false,
        ..request("users", "nestjs", project.path())
    };

    installation
        .add(&req, &FakeInstaller::default())
        .await
        .unwrap();

    assert!(project
        .path()
        .join("src/controllers/user.controller.ts")
        .is_file());
}

#[test]
fn test_provider_for_simple_feature_is_ignored() {
    let installation = Installation::new();
    let catalog = installation.catalog();
    let features_dir = installation.root().features_dir();
    let project = TempDir::new().unwrap();
    let without = FeatureRequest {
        language: Language::JavaScript,
        ..request("docker", "expressjs", project.path())
    };
    let with = FeatureRequest {
        provider: Some("anything"),
        ..without
    };

    let with = plan_feature(&catalog.features, &features_dir, &with).unwrap();
    let without = plan_feature(&catalog.features, &features_dir, &without).unwrap();

    assert_eq!(with.files, without.files);
    assert_eq!(with.provider, None);
}

#[test]
fn test_sample_installation_loads() {
    let root = InstallRoot::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("../.."));
    let catalog = Catalog::load(&root).unwrap();

    assert_eq!(catalog.features.names(), vec!["auth", "docker", "prettier"]);
    let auth = catalog.features.feature("auth").unwrap();
    assert_eq!(auth.providers(), vec!["clerk", "auth0"]);
    assert!(catalog.templates.framework("nextjs").is_ok());
}
