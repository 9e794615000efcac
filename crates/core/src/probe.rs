//! Self-reported version of a downloaded binary.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

use crate::Result;
use crate::process::ProcessRunner;

/// Flag that makes the tool print its version.
pub const VERSION_FLAG: &str = "--version";

// Matches e.g. "earthly version v0.8.15 abc123 linux/amd64"; word characters are ASCII only
static VERSION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"version\sv([A-Za-z0-9_.]+)").ok());

/// Extract the version token from `--version` output.
#[must_use]
pub fn parse_reported_version(output: &str) -> Option<String> {
    VERSION_PATTERN
        .as_ref()?
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Run `binary --version` silently and parse the reported version.
///
/// `Ok(None)` means the binary ran but printed nothing recognizable.
///
/// # Errors
///
/// Returns [`crate::Error::ProcessFailed`] if the binary cannot be run or
/// exits non-zero.
pub async fn probe_version(runner: &dyn ProcessRunner, binary: &Path) -> Result<Option<String>> {
    let output = runner.output(binary, &[VERSION_FLAG]).await?.check(binary)?;
    let version = parse_reported_version(&output.stdout);
    debug!(binary = ?binary, ?version, "Probed tool version");
    Ok(version)
}
