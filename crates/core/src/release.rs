//! Release download URLs.

use crate::platform::PlatformTarget;
use crate::request::ToolVersion;

/// Default release repository.
pub const DEFAULT_REPOSITORY: &str = "https://github.com/earthly/earthly";

/// Where release artifacts are published.
///
/// URLs follow the GitHub Releases layout:
/// - `{repository}/releases/download/v{version}/{artifact}`
/// - `{repository}/releases/latest/download/{artifact}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    repository: String,
}

impl Default for ReleaseSource {
    fn default() -> Self {
        Self::new(DEFAULT_REPOSITORY)
    }
}

impl ReleaseSource {
    /// Create a source from a repository URL.
    #[must_use]
    pub fn new(repository: impl Into<String>) -> Self {
        let repository = repository.into();
        Self {
            repository: repository.trim_end_matches('/').to_string(),
        }
    }

    /// Create a source for a GitHub `owner/repo`.
    #[must_use]
    pub fn github(repo: &str) -> Self {
        Self::new(format!("https://github.com/{repo}"))
    }

    /// Repository URL without trailing slash.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// URL of the artifact for `tool` at `version` on `target`.
    #[must_use]
    pub fn artifact_url(&self, tool: &str, version: &ToolVersion, target: &PlatformTarget) -> String {
        let artifact = target.artifact_name(tool);
        match version {
            ToolVersion::Latest => {
                format!("{}/releases/latest/download/{artifact}", self.repository)
            }
            ToolVersion::Concrete(v) => {
                format!("{}/releases/download/v{v}/{artifact}", self.repository)
            }
        }
    }
}
