//! Upstream version sources
//!
//! Each call is one blocking round-trip. Transport or parse failures are
//! fatal to the run; callers opt out with `--skip-*` flags or a static
//! build-args file, never with stale data.

use crate::error::{BakeryError, BakeryResult};
use tracing::{debug, info};

const USER_AGENT: &str = concat!("bakery/", env!("CARGO_PKG_VERSION"));

/// Abstract source of upstream version information
pub trait VersionSource: Send + Sync {
    /// Most recent release tag of a repository, e.g. `v4.44.1`
    fn latest_release_tag(&self, org_and_repo: &str) -> BakeryResult<String>;

    /// Commit hash the given tag points at
    fn commit_for_tag(&self, org_and_repo: &str, tag: &str) -> BakeryResult<String>;

    /// Tip commit hash of a branch
    fn latest_commit(&self, org_and_repo: &str, branch: &str) -> BakeryResult<String>;

    /// Latest stable platform release string from a plain-text index
    fn latest_stable_release(&self, index_url: &str) -> BakeryResult<String>;
}

/// Strip a leading `v` from a version tag
///
/// Only applies when the tag matches `v<digit>...`; names like
/// `version-1` pass through unchanged.
pub fn trim_version_prefix(tag: &str) -> &str {
    let mut chars = tag.chars();
    match (chars.next(), chars.next()) {
        (Some('v'), Some(c)) if c.is_ascii_digit() => &tag[1..],
        _ => tag,
    }
}

/// Version source backed by the GitHub REST API
///
/// Uses `GITHUB_TOKEN` when set to avoid anonymous rate limits.
pub struct GithubSource {
    api_base: String,
}

impl GithubSource {
    pub fn new() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
        }
    }

    fn get(&self, url: &str) -> BakeryResult<String> {
        debug!("GET {}", url);

        let mut request = ureq::get(url).header("User-Agent", USER_AGENT);
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.is_empty() {
                request = request.header("Authorization", format!("Bearer {token}"));
            }
        }

        let mut response = request.call().map_err(|e| BakeryError::http(url, e))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| BakeryError::http(url, e))
    }

    fn get_json(&self, url: &str) -> BakeryResult<serde_json::Value> {
        let body = self.get(url)?;
        serde_json::from_str(&body).map_err(|e| BakeryError::ApiResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl Default for GithubSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionSource for GithubSource {
    fn latest_release_tag(&self, org_and_repo: &str) -> BakeryResult<String> {
        let url = format!("{}/repos/{}/releases/latest", self.api_base, org_and_repo);
        let value = self.get_json(&url)?;
        let tag = string_field(&value, &["tag_name"], &url)?;
        info!("Found {} for {}", tag, org_and_repo);
        Ok(tag)
    }

    fn commit_for_tag(&self, org_and_repo: &str, tag: &str) -> BakeryResult<String> {
        let url = format!(
            "{}/repos/{}/git/ref/tags/{}",
            self.api_base, org_and_repo, tag
        );
        let value = self.get_json(&url)?;
        string_field(&value, &["object", "sha"], &url)
    }

    fn latest_commit(&self, org_and_repo: &str, branch: &str) -> BakeryResult<String> {
        let url = format!("{}/repos/{}/commits/{}", self.api_base, org_and_repo, branch);
        let value = self.get_json(&url)?;
        string_field(&value, &["sha"], &url)
    }

    fn latest_stable_release(&self, index_url: &str) -> BakeryResult<String> {
        let body = self.get(index_url)?;
        parse_release_index(&body).ok_or_else(|| BakeryError::ApiResponse {
            url: index_url.to_string(),
            reason: "no 'Version:' line in release index".to_string(),
        })
    }
}

/// Extract a nested string field from a JSON response
fn string_field(value: &serde_json::Value, path: &[&str], url: &str) -> BakeryResult<String> {
    let mut current = value;
    for key in path {
        current = current.get(key).ok_or_else(|| BakeryError::ApiResponse {
            url: url.to_string(),
            reason: format!("missing field '{}'", path.join(".")),
        })?;
    }
    current
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| BakeryError::ApiResponse {
            url: url.to_string(),
            reason: format!("field '{}' is not a string", path.join(".")),
        })
}

/// Find the `Version:` line in a plain-text release index
fn parse_release_index(body: &str) -> Option<String> {
    body.lines()
        .find(|line| line.contains("Version:"))
        .map(|line| line.replace("Version:", "").trim().to_string())
}
