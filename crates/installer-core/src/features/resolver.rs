//! File-set resolution for a feature
//!
//! Resolution happens in two stages: first the logical lookup of which files
//! a feature declares for a provider/framework/language, then, per file, the
//! physical lookup of where its template lives on disk. Keeping them apart
//! lets a declared-but-missing template produce a diagnostic instead of a
//! silent skip.
//!
//! The only fallback is JavaScript -> TypeScript: templates are written
//! TypeScript-first, so a JavaScript project may reuse TypeScript files. The
//! reverse never happens.

use crate::features::model::{FeatureDefinition, FileBucket, FileEntry, FileSetSpec, FrameworkFiles};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const JAVASCRIPT: &str = "javascript";
const TYPESCRIPT: &str = "typescript";

/// The outcome of a logical lookup
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    bucket: Option<&'a FileBucket>,
    /// True when JavaScript was requested and TypeScript files were used
    pub language_fallback: bool,
}

impl<'a> Resolution<'a> {
    fn found(bucket: &'a FileBucket, language_fallback: bool) -> Self {
        Self {
            bucket: Some(bucket),
            language_fallback,
        }
    }

    fn empty() -> Self {
        Self {
            bucket: None,
            language_fallback: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bucket.map_or(true, |b| b.is_empty())
    }

    pub fn len(&self) -> usize {
        self.bucket.map_or(0, |b| b.len())
    }

    pub fn bucket(&self) -> Option<&'a FileBucket> {
        self.bucket
    }

    /// Files in catalog order
    pub fn files(&self) -> impl Iterator<Item = (&'a String, &'a FileEntry)> {
        self.bucket.into_iter().flat_map(|b| b.iter())
    }
}

/// Find the files `feature` declares for the given context.
///
/// Framework-first features ignore `provider`.
pub fn resolve_files<'a>(
    feature: &'a FeatureDefinition,
    provider: Option<&str>,
    framework: &str,
    language: &str,
) -> Resolution<'a> {
    let resolution = match &feature.files {
        FileSetSpec::Simple(frameworks) => match frameworks.get(framework) {
            None => Resolution::empty(),
            Some(FrameworkFiles::Flat(bucket)) => Resolution::found(bucket, false),
            Some(FrameworkFiles::ByLanguage(languages)) => {
                match languages.get(language) {
                    Some(bucket) => Resolution::found(bucket, false),
                    None if language == JAVASCRIPT => languages
                        .get(TYPESCRIPT)
                        .map(|bucket| Resolution::found(bucket, true))
                        .unwrap_or_else(Resolution::empty),
                    None => Resolution::empty(),
                }
            }
        },
        FileSetSpec::ByProvider(providers) => {
            let languages = provider
                .and_then(|p| providers.get(p))
                .and_then(|frameworks| frameworks.get(framework));
            match languages {
                None => Resolution::empty(),
                Some(languages) => match languages.get(language) {
                    Some(bucket) => Resolution::found(bucket, false),
                    None if language == JAVASCRIPT => languages
                        .get(TYPESCRIPT)
                        .map(|bucket| Resolution::found(bucket, true))
                        .unwrap_or_else(Resolution::empty),
                    None => Resolution::empty(),
                },
            }
        }
    };

    if resolution.language_fallback {
        warn!(
            feature = %feature.name,
            framework,
            "no javascript files configured, using typescript files"
        );
    }
    debug!(
        feature = %feature.name,
        provider = provider.unwrap_or("-"),
        framework,
        language,
        files = resolution.len(),
        "resolved feature files"
    );

    resolution
}

/// Where a feature's template file may live on disk, most specific first
pub fn template_candidates(
    features_dir: &Path,
    feature: &str,
    provider: Option<&str>,
    framework: &str,
    language: &str,
    file: &str,
) -> Vec<PathBuf> {
    let base = features_dir.join(feature);
    let mut candidates = Vec::new();

    let by_provider = |language: &str| {
        provider.map(|p| base.join(p).join(framework).join(language))
    };

    if let Some(dir) = by_provider(language) {
        candidates.push(dir.join(file));
    }
    candidates.push(base.join(framework).join(language).join(file));
    candidates.push(base.join(framework).join(file));
    if let Some(provider) = provider {
        candidates.push(base.join(provider).join(file));
    }
    candidates.push(base.join(file));

    if language == JAVASCRIPT {
        if let Some(dir) = by_provider(TYPESCRIPT) {
            candidates.push(dir.join(file));
        }
        candidates.push(base.join(framework).join(TYPESCRIPT).join(file));
    }

    candidates
}

/// First candidate path that exists
pub fn locate_template(
    features_dir: &Path,
    feature: &str,
    provider: Option<&str>,
    framework: &str,
    language: &str,
    file: &str,
) -> Option<PathBuf> {
    template_candidates(features_dir, feature, provider, framework, language, file)
        .into_iter()
        .find(|candidate| {
            debug!(candidate = %candidate.display(), "checking template path");
            candidate.is_file()
        })
}
