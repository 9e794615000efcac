//! Command-line and GitHub Actions input definitions.

use crate::tracing::{LogLevel, TracingFormat};
use clap::Parser;
use setup_tool_core::DEFAULT_REPOSITORY;
use std::path::PathBuf;

/// Install a released tool binary and put it on PATH.
///
/// Every option also reads the matching GitHub Actions input variable, so the
/// binary can run as an action step without arguments.
#[derive(Parser, Debug)]
#[command(name = "setup-tool")]
#[command(about = "Install a released tool binary into the runner tool cache and put it on PATH")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// Version to install, or `latest`.
    #[arg(long, env = "INPUT_VERSION", default_value = "latest")]
    pub tool_version: String,

    /// Always download when the version is `latest`.
    #[arg(long, env = "INPUT_DOWNLOAD-LATEST")]
    pub download_latest: Option<String>,

    /// Problem matchers to register, separated by newlines or commas.
    #[arg(long, env = "INPUT_MATCHERS", default_value = "")]
    pub matchers: String,

    /// Tool name, used for the artifact name and cache namespace.
    #[arg(long, env = "SETUP_TOOL_NAME", default_value = "earthly")]
    pub tool: String,

    /// Repository the release artifacts are downloaded from.
    #[arg(long, env = "SETUP_TOOL_REPOSITORY", default_value = DEFAULT_REPOSITORY)]
    pub repository: String,

    /// Tool cache root.
    #[arg(long, env = "RUNNER_TOOL_CACHE")]
    pub cache_dir: Option<PathBuf>,

    /// Directory holding problem matcher JSON files.
    #[arg(long, env = "SETUP_TOOL_MATCHERS_DIR")]
    pub matchers_dir: Option<PathBuf>,

    /// Token sent as a bearer credential with downloads.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Do not run `<tool> bootstrap` after installing.
    #[arg(long)]
    pub skip_bootstrap: bool,

    /// File the runner reads extra PATH entries from.
    #[arg(long, env = "GITHUB_PATH", hide = true)]
    pub github_path: Option<PathBuf>,

    /// Logging verbosity level.
    #[arg(long, help = "Set logging level", default_value = "info", value_enum)]
    pub log_level: LogLevel,

    /// Log output format.
    #[arg(long, help = "Log output format", default_value = "compact", value_enum)]
    pub log_format: TracingFormat,
}
