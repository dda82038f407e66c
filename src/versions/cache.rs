//! Per-package version cache
//!
//! One record per tracked package, persisted write-through so a crash
//! mid-run still benefits a retry. A missing or unreadable record is a
//! cache miss, never an error.

use crate::error::{BakeryError, BakeryResult};
use crate::versions::source::VersionSource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

/// A tracked upstream package with memoized resolution state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedPackage {
    /// Build-arg name this package resolves into
    pub name: String,

    /// GitHub `owner/repo` identifier
    pub org_and_repo: String,

    /// Resolved commit hash, if any
    pub commit: Option<String>,

    /// Resolved release tag, if any (untrimmed)
    pub latest_tag: Option<String>,
}

impl VersionedPackage {
    /// Create an unresolved package
    pub fn new(name: impl Into<String>, org_and_repo: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            org_and_repo: org_and_repo.into(),
            commit: None,
            latest_tag: None,
        }
    }

    /// Create a package, consulting the store for prior resolution state
    ///
    /// A cached record for a different repository is discarded; the cache
    /// is keyed by build-arg name and repointing a package invalidates it.
    pub fn load_or_new(
        name: impl Into<String>,
        org_and_repo: impl Into<String>,
        store: &dyn CacheStore,
    ) -> Self {
        let name = name.into();
        let org_and_repo = org_and_repo.into();

        match store.load(&name) {
            Some(cached) if cached.org_and_repo == org_and_repo => {
                debug!("Reusing cached versions for {}", name);
                cached
            }
            _ => Self::new(name, org_and_repo),
        }
    }

    /// The latest release tag, fetched at most once per package
    pub fn resolve_tag(
        &mut self,
        source: &dyn VersionSource,
        store: &dyn CacheStore,
    ) -> BakeryResult<String> {
        if let Some(tag) = &self.latest_tag {
            return Ok(tag.clone());
        }

        let tag = source.latest_release_tag(&self.org_and_repo)?;
        self.latest_tag = Some(tag.clone());
        store.save(self)?;
        Ok(tag)
    }

    /// The commit hash of the latest release tag, fetched at most once
    pub fn resolve_commit(
        &mut self,
        source: &dyn VersionSource,
        store: &dyn CacheStore,
    ) -> BakeryResult<String> {
        if let Some(commit) = &self.commit {
            return Ok(commit.clone());
        }

        let tag = self.resolve_tag(source, store)?;
        let commit = source.commit_for_tag(&self.org_and_repo, &tag)?;
        self.commit = Some(commit.clone());
        store.save(self)?;
        Ok(commit)
    }

    /// The tip commit of a branch, fetched at most once
    pub fn resolve_branch_commit(
        &mut self,
        branch: &str,
        source: &dyn VersionSource,
        store: &dyn CacheStore,
    ) -> BakeryResult<String> {
        if let Some(commit) = &self.commit {
            return Ok(commit.clone());
        }

        let commit = source.latest_commit(&self.org_and_repo, branch)?;
        self.commit = Some(commit.clone());
        store.save(self)?;
        Ok(commit)
    }
}

/// Injectable persistence for package resolution state
pub trait CacheStore: Send + Sync {
    /// Load a prior record; corruption and absence are both `None`
    fn load(&self, name: &str) -> Option<VersionedPackage>;

    /// Persist a record, replacing any prior one
    fn save(&self, package: &VersionedPackage) -> BakeryResult<()>;

    /// Remove a record; removing an absent one is a no-op
    fn delete(&self, name: &str) -> BakeryResult<()>;
}

/// Cache store keeping one JSON file per package
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl CacheStore for FileStore {
    fn load(&self, name: &str) -> Option<VersionedPackage> {
        let path = self.path_for(name);
        let contents = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(package) => Some(package),
            Err(e) => {
                debug!("Ignoring unreadable cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn save(&self, package: &VersionedPackage) -> BakeryResult<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| BakeryError::io(format!("creating cache dir {}", self.dir.display()), e))?;

        let path = self.path_for(&package.name);
        let contents = serde_json::to_string_pretty(package)?;
        fs::write(&path, contents)
            .map_err(|e| BakeryError::io(format!("writing cache file {}", path.display()), e))?;

        debug!("Cached versions for {} to {}", package.name, path.display());
        Ok(())
    }

    fn delete(&self, name: &str) -> BakeryResult<()> {
        let path = self.path_for(name);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| BakeryError::io(format!("removing cache file {}", path.display()), e))?;
            info!("Removed {}", path.display());
        }
        Ok(())
    }
}

/// In-memory cache store for tests and single-shot runs
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, VersionedPackage>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, name: &str) -> Option<VersionedPackage> {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.get(name).cloned())
    }

    fn save(&self, package: &VersionedPackage) -> BakeryResult<()> {
        if let Ok(mut records) = self.records.lock() {
            records.insert(package.name.clone(), package.clone());
        }
        Ok(())
    }

    fn delete(&self, name: &str) -> BakeryResult<()> {
        if let Ok(mut records) = self.records.lock() {
            records.remove(name);
        }
        Ok(())
    }
}
