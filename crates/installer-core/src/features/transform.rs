//! Import-path normalisation for copied source files
//!
//! This is a best-effort text transform, not a module-resolution rewrite:
//! two regex substitutions normalise `@/` and `../` import specifiers to
//! single-quoted literals when a file lands under `src/`.

use regex::Regex;
use std::borrow::Cow;
use std::path::{Component, Path};
use std::sync::OnceLock;

/// Extensions that get the import rewrite
const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs", "cjs", "vue", "svelte"];

fn alias_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"from\s+["']@/([^"']*)["']"#).expect("alias import pattern is valid")
    })
}

fn parent_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"from\s+["']\.\./([^"']*)["']"#).expect("parent import pattern is valid")
    })
}

pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Whether `target` has a `src` directory between `project_root` and the file
pub fn is_under_src(target: &Path, project_root: &Path) -> bool {
    let relative = target.strip_prefix(project_root).unwrap_or(target);
    relative
        .parent()
        .is_some_and(|dir| dir.components().any(|c| c == Component::Normal("src".as_ref())))
}

/// Normalise `@/` and `../` import specifiers to single-quoted literals
pub fn rewrite_import_aliases(content: &str) -> Cow<'_, str> {
    let aliased = alias_import().replace_all(content, "from '@/$1'");
    if !parent_import().is_match(&aliased) {
        return aliased;
    }
    let rewritten = parent_import()
        .replace_all(&aliased, "from '../$1'")
        .into_owned();
    Cow::Owned(rewritten)
}

/// Prepare template content for `target`.
///
/// Source files landing under `src/` get the import rewrite; everything else
/// is copied verbatim.
pub fn process_content<'a>(content: &'a str, target: &Path, project_root: &Path) -> Cow<'a, str> {
    if is_source_file(target) && is_under_src(target, project_root) {
        rewrite_import_aliases(content)
    } else {
        Cow::Borrowed(content)
    }
}
