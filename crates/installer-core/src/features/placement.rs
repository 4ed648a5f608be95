//! Framework-aware placement of feature files
//!
//! Decides whether a relative file path from a feature lands in the project
//! root or under `src/`. Import paths in the copied files only resolve if the
//! files end up where each ecosystem expects them, so the rules are kept per
//! framework.

use std::path::{Path, PathBuf};

/// Files that always live in the project root
const ROOT_ONLY_FILES: &[&str] = &[
    ".env",
    ".env.local",
    ".env.example",
    ".env.development",
    ".env.production",
    ".env.test",
    "package.json",
    "package-lock.json",
    "pnpm-lock.yaml",
    "yarn.lock",
    "tsconfig.json",
    "jsconfig.json",
    "next.config.js",
    "next.config.mjs",
    "next.config.ts",
    "vite.config.js",
    "vite.config.ts",
    "vue.config.js",
    "angular.json",
    "nest-cli.json",
    "tailwind.config.js",
    "tailwind.config.ts",
    "postcss.config.js",
    "postcss.config.mjs",
    "eslint.config.js",
    "eslint.config.mjs",
    ".eslintrc.json",
    ".eslintrc.js",
    ".prettierrc",
    ".prettierrc.json",
    "middleware.ts",
    "middleware.js",
    "drizzle.config.ts",
    "drizzle.config.js",
    "Dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    ".dockerignore",
    ".gitignore",
    ".gitlab-ci.yml",
    "vercel.json",
    "netlify.toml",
    "README.md",
    "requirements.txt",
    "pyproject.toml",
    "Cargo.toml",
    "go.mod",
];

/// Directories whose contents always live in the project root
const ROOT_ONLY_DIRS: &[&str] = &[".github", ".circleci", ".husky", "prisma"];

const NEXT_SRC_DIRS: &[&str] = &[
    "app",
    "pages",
    "components",
    "lib",
    "utils",
    "styles",
    "hooks",
    "types",
];

const FRONTEND_SRC_DIRS: &[&str] = &[
    "app",
    "components",
    "pages",
    "views",
    "hooks",
    "lib",
    "utils",
    "services",
    "store",
    "router",
    "styles",
    "assets",
    "types",
    "context",
];

const BACKEND_SRC_DIRS: &[&str] = &[
    "controllers",
    "routes",
    "services",
    "utils",
    "middleware",
    "models",
];

/// Absolute destination of `relative_path` inside `project_root`
pub fn place_file(
    relative_path: &str,
    framework: Option<&str>,
    has_src_folder: bool,
    project_root: &Path,
) -> PathBuf {
    let relative = normalize(relative_path);

    if is_root_only(&relative) || relative.starts_with("public/") {
        return project_root.join(&relative);
    }

    if let Some(rest) = relative.strip_prefix("src/") {
        // A Next.js project without src/ keeps everything at the root
        if framework == Some("nextjs") && !has_src_folder {
            return project_root.join(rest);
        }
        return project_root.join(&relative);
    }

    if belongs_in_src(&relative, framework, has_src_folder) {
        project_root.join("src").join(&relative)
    } else {
        project_root.join(&relative)
    }
}

/// Whether a path is one of the fixed root-only files or directories
pub fn is_root_only(relative_path: &str) -> bool {
    let relative = normalize(relative_path);
    ROOT_ONLY_FILES.contains(&relative.as_str())
        || first_segment(&relative).is_some_and(|dir| ROOT_ONLY_DIRS.contains(&dir))
}

fn belongs_in_src(relative: &str, framework: Option<&str>, has_src_folder: bool) -> bool {
    let dir = first_segment(relative);
    let name = file_name(relative);

    match framework {
        Some("nextjs") => {
            has_src_folder
                && (dir.is_some_and(|d| NEXT_SRC_DIRS.contains(&d))
                    || (dir.is_none()
                        && has_extension(name, &["ts", "tsx", "js", "jsx"])
                        && !name.contains("config")))
        }
        Some("reactjs") | Some("vuejs") | Some("angularjs") => {
            has_src_folder
                && (dir.is_some_and(|d| FRONTEND_SRC_DIRS.contains(&d))
                    || has_extension(name, &["ts", "tsx", "js", "jsx", "vue"]))
        }
        Some("nestjs") => true,
        _ => {
            has_src_folder
                && (dir.is_some_and(|d| BACKEND_SRC_DIRS.contains(&d))
                    || (dir.is_some() && has_extension(name, &["js", "ts"])))
        }
    }
}

fn normalize(relative_path: &str) -> String {
    let unified = relative_path.replace('\\', "/");
    let mut trimmed = unified.as_str();
    loop {
        if let Some(rest) = trimmed.strip_prefix("./") {
            trimmed = rest;
        } else if let Some(rest) = trimmed.strip_prefix('/') {
            trimmed = rest;
        } else {
            break;
        }
    }
    trimmed.to_string()
}

/// Leading directory, if the path has one
fn first_segment(relative: &str) -> Option<&str> {
    relative.split_once('/').map(|(dir, _)| dir)
}

fn file_name(relative: &str) -> &str {
    relative.rsplit('/').next().unwrap_or(relative)
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| extensions.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/project";

    fn place(rel: &str, framework: Option<&str>, has_src: bool) -> PathBuf {
        place_file(rel, framework, has_src, Path::new(ROOT))
    }

    #[track_caller]
    fn assert_placed(rel: &str, framework: Option<&str>, has_src: bool, expected: &str) {
        assert_eq!(
            place(rel, framework, has_src),
            Path::new(ROOT).join(expected),
            "{}",
            rel
        );
    }

    #[test]
    fn test_root_only_files_ignore_src_folder() {
        for framework in [Some("nextjs"), Some("nestjs"), Some("reactjs"), None] {
            assert_placed(".env", framework, true, ".env");
            assert_placed("middleware.ts", framework, true, "middleware.ts");
            assert_placed(
                ".github/workflows/ci.yml",
                framework,
                true,
                ".github/workflows/ci.yml",
            );
        }
    }

    #[test]
    fn test_public_and_src_prefixed_paths_stay() {
        assert_placed("public/logo.svg", Some("nextjs"), true, "public/logo.svg");
        assert_placed("public/app.js", Some("nestjs"), false, "public/app.js");
        assert_placed("src/lib/a.ts", Some("reactjs"), false, "src/lib/a.ts");
    }

    #[test]
    fn test_nextjs_with_src() {
        let nextjs = Some("nextjs");
        assert_placed("lib/auth.ts", nextjs, true, "src/lib/auth.ts");
        assert_placed("app/api/route.ts", nextjs, true, "src/app/api/route.ts");
        assert_placed("instrumentation.ts", nextjs, true, "src/instrumentation.ts");
        // configs stay at root even when not in the fixed list
        assert_placed("sentry.config.ts", nextjs, true, "sentry.config.ts");
        assert_placed("docs/guide.md", nextjs, true, "docs/guide.md");
    }

    #[test]
    fn test_nextjs_without_src_never_uses_src() {
        let paths = [
            "lib/auth.ts",
            "app/page.tsx",
            "src/lib/auth.ts",
            "auth.ts",
            "components/x.tsx",
        ];
        for rel in paths {
            let placed = place(rel, Some("nextjs"), false);
            assert!(
                !placed.to_string_lossy().contains("/src/"),
                "{} placed at {}",
                rel,
                placed.display()
            );
        }
        assert_placed("src/lib/auth.ts", Some("nextjs"), false, "lib/auth.ts");
    }

    #[test]
    fn test_frontend_frameworks() {
        for framework in ["reactjs", "vuejs", "angularjs"] {
            let framework = Some(framework);
            assert_placed(
                "components/Button.tsx",
                framework,
                true,
                "src/components/Button.tsx",
            );
            assert_placed("firebase.ts", framework, true, "src/firebase.ts");
            assert_placed("docs/notes.md", framework, true, "docs/notes.md");
            assert_placed(
                "components/Button.tsx",
                framework,
                false,
                "components/Button.tsx",
            );
        }
        assert_placed("App.vue", Some("vuejs"), true, "src/App.vue");
    }

    #[test]
    fn test_nestjs_always_uses_src() {
        for has_src in [true, false] {
            assert_placed(
                "controllers/user.controller.ts",
                Some("nestjs"),
                has_src,
                "src/controllers/user.controller.ts",
            );
            assert_placed("notes.md", Some("nestjs"), has_src, "src/notes.md");
            assert_placed("package.json", Some("nestjs"), has_src, "package.json");
        }
    }

    #[test]
    fn test_default_backend_rules() {
        let express = Some("expressjs");
        assert_placed("routes/auth.js", express, true, "src/routes/auth.js");
        assert_placed("config/db.ts", None, true, "src/config/db.ts");
        assert_placed("server.js", express, true, "server.js");
        assert_placed("routes/auth.js", express, false, "routes/auth.js");
    }

    #[test]
    fn test_placement_is_idempotent() {
        let cases = [
            ("lib/auth.ts", Some("nextjs"), true),
            ("controllers/a.ts", Some("nestjs"), false),
            ("routes/x.js", None, true),
            ("./components/A.jsx", Some("reactjs"), true),
        ];
        for (rel, framework, has_src) in cases {
            assert_eq!(
                place(rel, framework, has_src),
                place(rel, framework, has_src)
            );
        }
    }

    #[test]
    fn test_normalizes_leading_dot_slash() {
        assert_placed("./lib/a.ts", Some("nextjs"), true, "src/lib/a.ts");
        assert!(is_root_only("./.env"));
        assert!(!is_root_only("config/.env"));
    }
}
