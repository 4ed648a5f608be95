//! Template fetching from a remote archive host or the installation root
//!
//! Both sources produce the same in-memory file map:
//! - Remote: fetches `<framework>/<template>.zip` and extracts it
//! - Local: walks `templates/<framework>/<template>` on disk
//!
//! Templates that ship one directory per language (`typescript/`,
//! `javascript/`, ...) are narrowed to the selected language afterwards.

use super::manifest::{TemplateManifest, MANIFEST_FILE};
use crate::config::root::InstallRoot;
use crate::product::ProductConfig;
use crate::runtime::check::Language;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Template source - either remote URL or local directory
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSource {
    Remote(Url),
    Local(PathBuf),
}

impl TemplateSource {
    /// Remote when the product's template URL variable is set, otherwise the
    /// `templates/` directory of the installation root
    pub fn from_config<C: ProductConfig>(config: &C, root: &InstallRoot) -> Result<Self> {
        match std::env::var(config.template_url_env()) {
            Ok(url_str) if !url_str.trim().is_empty() => {
                let url = Url::parse(url_str.trim())
                    .with_context(|| format!("Invalid template URL: {}", url_str))?;
                Ok(Self::Remote(url))
            }
            _ => Ok(Self::Local(root.templates_dir())),
        }
    }
}

/// Files of one template, already narrowed to a language
#[derive(Debug, Clone, Default)]
pub struct TemplateFiles {
    pub manifest: TemplateManifest,
    /// Relative path (always `/`-separated) to content
    pub files: BTreeMap<String, Vec<u8>>,
}

impl TemplateFiles {
    /// Paths that end up in a generated project
    pub fn included(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.files
            .iter()
            .filter(|(path, _)| !self.manifest.excludes(path))
    }

    fn from_raw(
        mut raw: BTreeMap<String, Vec<u8>>,
        language: Language,
        origin: &str,
    ) -> Result<Self> {
        let manifest = match raw.remove(MANIFEST_FILE) {
            Some(bytes) => TemplateManifest::parse(&String::from_utf8_lossy(&bytes))
                .with_context(|| format!("Failed to parse {} manifest", origin))?,
            None => TemplateManifest::default(),
        };

        let files = select_language(raw, language);
        Ok(Self { manifest, files })
    }
}

/// Keep only the `<language>/` subtree when the template is split by language
fn select_language(
    raw: BTreeMap<String, Vec<u8>>,
    language: Language,
) -> BTreeMap<String, Vec<u8>> {
    let prefix = format!("{}/", language.id());
    if !raw.keys().any(|k| k.starts_with(&prefix)) {
        return raw;
    }

    raw.into_iter()
        .filter_map(|(path, content)| {
            path.strip_prefix(&prefix)
                .map(|rest| (rest.to_string(), content))
        })
        .collect()
}

/// Template fetcher - handles retrieving templates from remote or local sources
pub struct TemplateFetcher {
    source: TemplateSource,
    client: reqwest::Client,
    /// Raw (unfiltered) templates already read, keyed by `<framework>/<template>`
    cache: HashMap<String, BTreeMap<String, Vec<u8>>>,
}

impl TemplateFetcher {
    /// Create a new fetcher with a custom user agent
    pub fn new(source: TemplateSource, user_agent: &str) -> Self {
        Self {
            source,
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            cache: HashMap::new(),
        }
    }

    /// Create a fetcher from a product config
    pub fn from_config<C: ProductConfig>(config: &C, root: &InstallRoot) -> Result<Self> {
        let source = TemplateSource::from_config(config, root)?;
        Ok(Self::new(source, config.user_agent()))
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Build a URL by appending path segments, preserving query parameters
    fn build_url(base: &Url, segments: &[&str]) -> Result<Url> {
        let mut url = base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("URL cannot have path segments: {}", base))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Fetch a template's files for `language`
    pub async fn fetch(
        &mut self,
        framework: &str,
        template: &str,
        language: Language,
    ) -> Result<TemplateFiles> {
        let key = format!("{}/{}", framework, template);
        if !self.cache.contains_key(&key) {
            let raw = match &self.source {
                TemplateSource::Remote(base) => {
                    let bytes = self.download_zip(base, framework, template).await?;
                    extract_zip(&bytes, template)?
                }
                TemplateSource::Local(dir) => {
                    read_local_template(&dir.join(framework).join(template))?
                }
            };
            debug!(template = %key, files = raw.len(), "template loaded");
            self.cache.insert(key.clone(), raw);
        }

        let raw = self.cache.get(&key).cloned().unwrap_or_default();
        TemplateFiles::from_raw(raw, language, &key)
    }

    async fn download_zip(&self, base: &Url, framework: &str, template: &str) -> Result<Vec<u8>> {
        let zip_url = Self::build_url(base, &[framework, &format!("{}.zip", template)])?;
        let response = self
            .client
            .get(zip_url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch template zip: {}", zip_url))?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to fetch template '{}/{}' zip from {}: HTTP {}",
                framework,
                template,
                zip_url,
                response.status()
            );
        }

        Ok(response.bytes().await?.to_vec())
    }
}

fn relative_key(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Read every file below a local template directory
pub fn read_local_template(dir: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    if !dir.is_dir() {
        anyhow::bail!("Template directory not found: {}", dir.display());
    }

    let mut files = BTreeMap::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(key) = relative_key(entry.path(), dir) else {
            continue;
        };
        let content = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        files.insert(key, content);
    }
    Ok(files)
}

/// Extract a template zip, stripping the leading `<template>/` directory
fn extract_zip(zip_bytes: &[u8], template: &str) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(zip_bytes))
        .with_context(|| format!("Failed to read zip archive for template '{}'", template))?;

    let prefix = format!("{}/", template);
    let mut files = BTreeMap::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }

        let safe = file.enclosed_name().and_then(|_| entry_path(file.name()));
        let Some(full_path) = safe else {
            warn!(entry = %file.name(), "skipping zip entry outside the template");
            continue;
        };
        let relative = full_path
            .strip_prefix(&prefix)
            .unwrap_or(&full_path)
            .to_string();

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        files.insert(relative, contents);
    }

    Ok(files)
}

/// Normalise a zip entry name to a relative `/`-separated path.
///
/// Absolute names, drive prefixes and parent components are rejected,
/// whichever separator the archive used.
fn entry_path(name: &str) -> Option<String> {
    let name = name.replace('\\', "/");
    if name.starts_with('/') || name.contains('\0') {
        return None;
    }
    let parts: Vec<&str> = name
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    if parts.is_empty() || parts.iter().any(|part| *part == ".." || part.contains(':')) {
        return None;
    }
    Some(parts.join("/"))
}

/// Zip a local template directory as `<template>/<path>` entries
pub fn build_template_zip(template_dir: &Path, template: &str) -> Result<Vec<u8>> {
    let files = read_local_template(template_dir)?;

    let mut zip_buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_buffer));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (path, content) in &files {
            zip.start_file(format!("{}/{}", template, path), options)?;
            zip.write_all(content)?;
        }

        zip.finish()?;
    }

    Ok(zip_buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_build_url_appends_segments() {
        let base = Url::parse("https://example.com/templates/?ref=main").unwrap();
        let url = TemplateFetcher::build_url(&base, &["nextjs", "basic.zip"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/templates/nextjs/basic.zip?ref=main"
        );
    }

    #[test]
    fn test_select_language_narrows_split_templates() {
        let mut raw = BTreeMap::new();
        raw.insert("typescript/src/index.ts".to_string(), b"ts".to_vec());
        raw.insert("javascript/src/index.js".to_string(), b"js".to_vec());

        let ts = select_language(raw.clone(), Language::TypeScript);
        assert_eq!(ts.keys().collect::<Vec<_>>(), vec!["src/index.ts"]);

        // Python has no subtree, so the template is used as-is
        let py = select_language(raw, Language::Python);
        assert_eq!(py.len(), 2);
    }

    #[test]
    fn test_zip_round_trip_strips_template_prefix() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "package.json", "{}");
        write(dir.path(), "src/app/page.tsx", "export default 1");

        let bytes = build_template_zip(dir.path(), "basic").unwrap();
        let files = extract_zip(&bytes, "basic").unwrap();

        assert_eq!(
            files.keys().collect::<Vec<_>>(),
            vec!["package.json", "src/app/page.tsx"]
        );
        assert_eq!(files["package.json"], b"{}".to_vec());
    }

    #[test]
    fn test_zip_entries_outside_the_template_are_skipped() {
        let mut bytes = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut bytes));
            let options = SimpleFileOptions::default();
            for name in [
                "/tmp/escape.txt",
                "..\\escape.txt",
                "basic/../../escape.txt",
                "basic\\..\\..\\escape.txt",
                "C:/escape.txt",
                "basic/src/index.js",
            ] {
                zip.start_file(name, options).unwrap();
                zip.write_all(b"x").unwrap();
            }
            zip.finish().unwrap();
        }

        let files = extract_zip(&bytes, "basic").unwrap();
        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["src/index.js"]);
    }

    #[test]
    fn test_entry_path_normalises_separators() {
        assert_eq!(
            entry_path("basic\\src\\a.js").as_deref(),
            Some("basic/src/a.js")
        );
        assert_eq!(entry_path("./basic//a.js").as_deref(), Some("basic/a.js"));
        assert_eq!(entry_path("/etc/passwd"), None);
        assert_eq!(entry_path("..\\a.js"), None);
    }

    #[tokio::test]
    async fn test_fetch_local_template() {
        let root = TempDir::new().unwrap();
        let base = root.path().join("nextjs/basic");
        write(
            &base,
            "template.yaml",
            "name: Basic\nexclude: [\"*.log\"]\n",
        );
        write(&base, "typescript/package.json", "{}");
        write(&base, "typescript/debug.log", "noise");
        write(&base, "javascript/package.json", "{}");

        let mut fetcher =
            TemplateFetcher::new(TemplateSource::Local(root.path().to_path_buf()), "test");
        let template = fetcher
            .fetch("nextjs", "basic", Language::TypeScript)
            .await
            .unwrap();

        assert_eq!(template.manifest.name.as_deref(), Some("Basic"));
        let included: Vec<_> = template.included().map(|(p, _)| p.as_str()).collect();
        assert_eq!(included, vec!["package.json"]);
    }

    #[tokio::test]
    async fn test_fetch_missing_local_template_fails() {
        let root = TempDir::new().unwrap();
        let mut fetcher =
            TemplateFetcher::new(TemplateSource::Local(root.path().to_path_buf()), "test");
        assert!(fetcher
            .fetch("nextjs", "missing", Language::TypeScript)
            .await
            .is_err());
    }
}
