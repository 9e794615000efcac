//! Persistent tool cache keyed by tool name, version and platform.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::download::set_executable_bits;
use crate::platform::PlatformTarget;
use crate::request::LATEST;
use crate::{Error, Result};

/// Version under which an entry is written.
///
/// Built from a concrete version only, so the symbolic request can never
/// become a key by accident. [`CacheKey::degraded_latest`] is the single
/// escape hatch, used when a downloaded `latest` binary does not report its
/// version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a concrete version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] for an empty string, the `latest`
    /// literal, or anything that would escape the cache directory.
    pub fn concrete(version: impl Into<String>) -> Result<Self> {
        let version = version.into();
        let invalid = version.is_empty()
            || version == LATEST
            || version == "."
            || version == ".."
            || version.starts_with('.')
            || version.contains(['/', '\\']);
        if invalid {
            return Err(Error::InvalidVersion { version });
        }
        Ok(Self(version))
    }

    /// Key used when the version of a `latest` download could not be read.
    #[must_use]
    pub fn degraded_latest() -> Self {
        Self(LATEST.to_string())
    }

    /// Whether this is the degraded `latest` key.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.0 == LATEST
    }

    /// Version string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a lookup should match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheQuery<'a> {
    /// Exactly this version.
    Exact(&'a CacheKey),
    /// The highest cached release version (no prereleases, no degraded entry).
    AnyVersion,
}

/// A tool version present in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Tool name.
    pub tool_name: String,
    /// Version the entry is stored under.
    pub version: String,
    /// Directory holding the executable, suitable for `PATH`.
    pub path: PathBuf,
}

/// Lookup and insertion of downloaded tools.
pub trait ToolCache: Send + Sync {
    /// Find a cached entry for `tool` on `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be read.
    fn lookup(
        &self,
        tool: &str,
        query: CacheQuery<'_>,
        target: &PlatformTarget,
    ) -> Result<Option<CacheEntry>>;

    /// Copy `artifact` into the cache as `file_name` and return the entry.
    ///
    /// Storing an existing key replaces it; a failed store never leaves an
    /// entry that `lookup` can see.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheStoreFailure`] if the entry cannot be written.
    fn store(
        &self,
        tool: &str,
        key: &CacheKey,
        artifact: &Path,
        file_name: &str,
        target: &PlatformTarget,
    ) -> Result<CacheEntry>;
}

/// Filesystem tool cache.
///
/// Structure:
/// ```text
/// <root>/
/// └── earthly/
///     └── 0.8.15/
///         ├── linux-amd64/
///         │   └── earthly
///         └── linux-amd64.complete
/// ```
///
/// The `.complete` marker is written last; entries without it are invisible.
#[derive(Debug, Clone)]
pub struct FsToolCache {
    root: PathBuf,
}

impl Default for FsToolCache {
    fn default() -> Self {
        Self::new(default_cache_root())
    }
}

impl FsToolCache {
    /// Create a cache at the specified root directory.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, tool: &str, version: &str) -> PathBuf {
        self.root.join(tool).join(version)
    }

    /// Directory of an entry.
    #[must_use]
    pub fn entry_dir(&self, tool: &str, version: &str, target: &PlatformTarget) -> PathBuf {
        self.version_dir(tool, version).join(target.to_string())
    }

    fn marker_path(&self, tool: &str, version: &str, target: &PlatformTarget) -> PathBuf {
        self.version_dir(tool, version)
            .join(format!("{target}.complete"))
    }

    fn complete_entry(
        &self,
        tool: &str,
        version: &str,
        target: &PlatformTarget,
    ) -> Option<CacheEntry> {
        let dir = self.entry_dir(tool, version, target);
        if self.marker_path(tool, version, target).is_file() && dir.is_dir() {
            Some(CacheEntry {
                tool_name: tool.to_string(),
                version: version.to_string(),
                path: dir,
            })
        } else {
            None
        }
    }

    fn newest_entry(&self, tool: &str, target: &PlatformTarget) -> Result<Option<CacheEntry>> {
        let tool_dir = self.root.join(tool);
        let entries = match fs::read_dir(&tool_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(e, &tool_dir, "read")),
        };

        let mut newest: Option<(semver::Version, String)> = None;

        for entry in entries {
            let entry = entry.map_err(|e| Error::io(e, &tool_dir, "read"))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || self.complete_entry(tool, &name, target).is_none() {
                continue;
            }
            // Covers the degraded `latest` entry: only exact lookups see it
            let Some(version) = parse_version(&name) else {
                trace!(%name, "Ignoring non-semver cache entry");
                continue;
            };
            if !version.pre.is_empty() {
                trace!(%name, "Ignoring prerelease cache entry");
                continue;
            }
            if newest.as_ref().is_none_or(|(best, _)| version > *best) {
                newest = Some((version, name));
            }
        }

        Ok(newest.and_then(|(_, name)| self.complete_entry(tool, &name, target)))
    }
}

impl ToolCache for FsToolCache {
    fn lookup(
        &self,
        tool: &str,
        query: CacheQuery<'_>,
        target: &PlatformTarget,
    ) -> Result<Option<CacheEntry>> {
        let found = match query {
            CacheQuery::Exact(key) => self.complete_entry(tool, key.as_str(), target),
            CacheQuery::AnyVersion => self.newest_entry(tool, target)?,
        };
        match &found {
            Some(entry) => trace!(tool, version = %entry.version, "Cache hit"),
            None => trace!(tool, ?query, "Cache miss"),
        }
        Ok(found)
    }

    fn store(
        &self,
        tool: &str,
        key: &CacheKey,
        artifact: &Path,
        file_name: &str,
        target: &PlatformTarget,
    ) -> Result<CacheEntry> {
        let version_dir = self.version_dir(tool, key.as_str());
        let dest = self.entry_dir(tool, key.as_str(), target);
        let marker = self.marker_path(tool, key.as_str(), target);
        let staging = version_dir.join(format!(".{target}.{}.tmp", uuid::Uuid::new_v4()));

        // Stage the copy next to the destination so the final rename stays on one filesystem
        let staged = (|| -> std::io::Result<()> {
            fs::create_dir_all(&staging)?;
            let binary = staging.join(file_name);
            fs::copy(artifact, &binary)?;
            set_executable_bits(&binary)
        })();
        if let Err(e) = staged {
            let _ = fs::remove_dir_all(&staging);
            return Err(Error::cache_store(&dest, e));
        }

        let swapped = (|| -> std::io::Result<()> {
            remove_if_exists(&marker, |p| fs::remove_file(p))?;
            remove_if_exists(&dest, |p| fs::remove_dir_all(p))?;
            fs::rename(&staging, &dest)?;
            fs::write(&marker, b"")
        })();
        if let Err(e) = swapped {
            let _ = fs::remove_dir_all(&staging);
            return Err(Error::cache_store(&dest, e));
        }

        debug!(tool, version = %key, ?dest, "Stored tool in cache");
        Ok(CacheEntry {
            tool_name: tool.to_string(),
            version: key.as_str().to_string(),
            path: dest,
        })
    }
}

fn remove_if_exists(
    path: &Path,
    remove: impl FnOnce(&Path) -> std::io::Result<()>,
) -> std::io::Result<()> {
    match remove(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Parse a directory name as a semantic version, tolerating a `v` prefix.
fn parse_version(name: &str) -> Option<semver::Version> {
    semver::Version::parse(name.strip_prefix('v').unwrap_or(name)).ok()
}

/// Get the default cache root.
///
/// Uses the runner tool cache when present, else `~/.cache/setup-tool/tools`.
#[must_use]
pub fn default_cache_root() -> PathBuf {
    if let Some(dir) = std::env::var_os("RUNNER_TOOL_CACHE").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("setup-tool")
        .join("tools")
}
