//! Best-effort cache of detected projects and recent choices
//!
//! The cache is a single JSON document. It is only ever an optimisation:
//! missing or corrupt files load as empty, and detection is re-run whenever a
//! cached entry is absent or stale. Saving writes a temporary file next to
//! the cache and renames it over the old one, so a crash mid-write never
//! leaves a truncated cache behind.

use crate::detect::ProjectInfo;
use crate::runtime::check::Language;
use crate::runtime::package_manager::PackageManager;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

const CACHE_FILE: &str = "cache.json";

/// Entries not touched for this long are dropped on save
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Which entries go first when the cache is over capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Least recently used
    #[default]
    Lru,
    /// Least frequently used, ties broken by recency
    Lfu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedProject {
    pub info: ProjectInfo,
    #[serde(default)]
    pub features: Vec<String>,
    pub created_at: u64,
    pub last_accessed: u64,
    #[serde(default)]
    pub access_count: u64,
}

/// Choices remembered between runs to prefill prompts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub framework: Option<String>,
    pub language: Option<Language>,
    pub package_manager: Option<PackageManager>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheData {
    #[serde(default)]
    projects: BTreeMap<String, CachedProject>,
    #[serde(default)]
    preferences: Preferences,
}

/// Summary for `cache stats`
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub path: PathBuf,
    pub projects: usize,
    pub features_recorded: usize,
    pub size_bytes: u64,
}

/// Process-local cache handle
pub struct CacheStore {
    path: PathBuf,
    ttl: Duration,
    max_entries: usize,
    policy: EvictionPolicy,
    data: Mutex<CacheData>,
}

impl CacheStore {
    /// Open the cache in `dir`, treating unreadable content as empty
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(CACHE_FILE);
        let data = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), "ignoring unreadable cache: {}", e);
                CacheData::default()
            }),
            Err(_) => CacheData::default(),
        };

        Self {
            path,
            ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
            policy: EvictionPolicy::default(),
            data: Mutex::new(data),
        }
    }

    /// Open the cache in the user's cache directory
    pub fn open_default(cache_dir_name: &str) -> Option<Self> {
        dirs::cache_dir().map(|dir| Self::open(&dir.join(cache_dir_name)))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, CacheData> {
        // A panic while holding the lock cannot leave the data half-updated
        // in a way that matters for a cache
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached detection for `dir`, if fresh
    pub fn project(&self, dir: &Path) -> Option<ProjectInfo> {
        let now = now_secs();
        let ttl = self.ttl.as_secs();
        let mut data = self.lock();
        let entry = data.projects.get_mut(&key(dir))?;
        if now.saturating_sub(entry.last_accessed) > ttl {
            return None;
        }
        entry.last_accessed = now;
        entry.access_count += 1;
        Some(entry.info.clone())
    }

    pub fn record_project(&self, dir: &Path, info: &ProjectInfo) {
        let now = now_secs();
        let mut data = self.lock();
        let entry = data
            .projects
            .entry(key(dir))
            .or_insert_with(|| CachedProject {
                info: info.clone(),
                features: Vec::new(),
                created_at: now,
                last_accessed: now,
                access_count: 0,
            });
        entry.info = info.clone();
        entry.last_accessed = now;
        entry.access_count += 1;
    }

    /// Remember that `feature` was added to the project at `dir`
    pub fn record_feature(&self, dir: &Path, feature: &str) {
        let mut data = self.lock();
        if let Some(entry) = data.projects.get_mut(&key(dir)) {
            if !entry.features.iter().any(|f| f == feature) {
                entry.features.push(feature.to_string());
            }
        }
    }

    pub fn features(&self, dir: &Path) -> Vec<String> {
        self.lock()
            .projects
            .get(&key(dir))
            .map(|p| p.features.clone())
            .unwrap_or_default()
    }

    pub fn preferences(&self) -> Preferences {
        self.lock().preferences.clone()
    }

    pub fn set_preferences(&self, preferences: Preferences) {
        self.lock().preferences = preferences;
    }

    /// Evict, then persist atomically
    pub fn save(&self) -> Result<()> {
        let content = {
            let mut data = self.lock();
            evict(
                &mut data.projects,
                now_secs(),
                self.ttl,
                self.max_entries,
                self.policy,
            );
            serde_json::to_string_pretty(&*data).context("Failed to serialize cache")?
        };

        let dir = self
            .path
            .parent()
            .context("Cache path has no parent directory")?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        temp.write_all(content.as_bytes())
            .context("Failed to write cache")?;
        temp.persist(&self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), "cache saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        *self.lock() = CacheData::default();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let data = self.lock();
        CacheStats {
            path: self.path.clone(),
            projects: data.projects.len(),
            features_recorded: data.projects.values().map(|p| p.features.len()).sum(),
            size_bytes: std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0),
        }
    }
}

/// Drop expired entries, then trim to `max_entries` by policy
fn evict(
    projects: &mut BTreeMap<String, CachedProject>,
    now: u64,
    ttl: Duration,
    max_entries: usize,
    policy: EvictionPolicy,
) {
    let ttl = ttl.as_secs();
    projects.retain(|_, p| now.saturating_sub(p.last_accessed) <= ttl);

    if projects.len() <= max_entries {
        return;
    }

    let mut ranked: Vec<(String, u64, u64)> = projects
        .iter()
        .map(|(k, p)| (k.clone(), p.access_count, p.last_accessed))
        .collect();
    match policy {
        EvictionPolicy::Lru => ranked.sort_by_key(|(_, _, last)| *last),
        EvictionPolicy::Lfu => ranked.sort_by_key(|(_, count, last)| (*count, *last)),
    }

    let excess = projects.len() - max_entries;
    for (k, _, _) in ranked.into_iter().take(excess) {
        projects.remove(&k);
    }
}

fn key(dir: &Path) -> String {
    std::fs::canonicalize(dir)
        .unwrap_or_else(|_| dir.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn info(name: &str) -> ProjectInfo {
        ProjectInfo {
            project_name: name.to_string(),
            framework: Some("nextjs".to_string()),
            language: Language::TypeScript,
            package_manager: PackageManager::Pnpm,
            has_src_folder: true,
        }
    }

    fn cached(last_accessed: u64, access_count: u64) -> CachedProject {
        CachedProject {
            info: info("x"),
            features: Vec::new(),
            created_at: 0,
            last_accessed,
            access_count,
        }
    }

    #[test]
    fn test_round_trip_through_disk() {
        let cache_dir = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        let store = CacheStore::open(cache_dir.path());
        store.record_project(project.path(), &info("shop"));
        store.record_feature(project.path(), "auth");
        store.record_feature(project.path(), "auth");
        store.set_preferences(Preferences {
            framework: Some("nextjs".into()),
            language: Some(Language::TypeScript),
            package_manager: Some(PackageManager::Pnpm),
        });
        store.save().unwrap();

        let reopened = CacheStore::open(cache_dir.path());
        assert_eq!(reopened.project(project.path()), Some(info("shop")));
        assert_eq!(reopened.features(project.path()), vec!["auth"]);
        assert_eq!(
            reopened.preferences().package_manager,
            Some(PackageManager::Pnpm)
        );
    }

    #[test]
    fn test_corrupt_cache_loads_empty() {
        let cache_dir = TempDir::new().unwrap();
        std::fs::write(cache_dir.path().join(CACHE_FILE), "{ truncated").unwrap();
        let store = CacheStore::open(cache_dir.path());
        assert_eq!(store.stats().projects, 0);
    }

    #[test]
    fn test_clear_removes_file() {
        let cache_dir = TempDir::new().unwrap();
        let store = CacheStore::open(cache_dir.path());
        store.record_project(cache_dir.path(), &info("a"));
        store.save().unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.stats().projects, 0);
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_ttl_eviction() {
        let mut projects = BTreeMap::new();
        projects.insert("old".to_string(), cached(100, 5));
        projects.insert("new".to_string(), cached(1_000, 1));

        let ttl = Duration::from_secs(500);
        evict(&mut projects, 1_000, ttl, 10, EvictionPolicy::Lru);
        assert_eq!(projects.keys().collect::<Vec<_>>(), vec!["new"]);
    }

    #[test]
    fn test_lru_eviction() {
        let mut projects = BTreeMap::new();
        projects.insert("a".to_string(), cached(10, 9));
        projects.insert("b".to_string(), cached(30, 1));
        projects.insert("c".to_string(), cached(20, 5));

        evict(&mut projects, 30, DEFAULT_TTL, 2, EvictionPolicy::Lru);
        assert_eq!(projects.keys().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_lfu_eviction() {
        let mut projects = BTreeMap::new();
        projects.insert("a".to_string(), cached(10, 9));
        projects.insert("b".to_string(), cached(30, 1));
        projects.insert("c".to_string(), cached(20, 5));

        evict(&mut projects, 30, DEFAULT_TTL, 2, EvictionPolicy::Lfu);
        assert_eq!(projects.keys().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn test_stale_project_is_not_returned() {
        let cache_dir = TempDir::new().unwrap();
        let store = CacheStore::open(cache_dir.path()).with_ttl(Duration::from_secs(0));
        store.record_project(cache_dir.path(), &info("a"));
        {
            let mut data = store.lock();
            for p in data.projects.values_mut() {
                p.last_accessed = 0;
            }
        }
        assert_eq!(store.project(cache_dir.path()), None);
    }
}
