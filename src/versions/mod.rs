//! Dynamic version resolution for build args
//!
//! Latest release tags, commit hashes, and the platform release string are
//! fetched from upstream sources, memoized per run, and persisted through a
//! per-package cache so retried runs skip the network.

pub mod cache;
pub mod resolve;
pub mod source;

pub use cache::{CacheStore, FileStore, MemoryStore, VersionedPackage};
pub use source::{trim_version_prefix, GithubSource, VersionSource};
