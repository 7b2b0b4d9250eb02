//! Step inputs.
//!
//! Every input can be passed as a flag or through the `INPUT_*` variable the
//! Actions runner sets for it.

use clap::Parser;
use covbase_core::{Error, Result};
use covbase_github::DEFAULT_API_URL;
use std::path::PathBuf;
use tracing::info;

/// Baseline file name used when `reference-coverage-path` is blank.
pub const DEFAULT_REFERENCE_PATH: &str = "__prev-text-summary.txt";

#[derive(Parser, Debug)]
#[command(name = "covbase")]
#[command(version, about = "Compare coverage against the previous baseline and publish the next one", long_about = None)]
pub struct ActionArgs {
    /// Path to the coverage report produced by this run
    #[arg(long = "coverage-path", env = "INPUT_COVERAGE-PATH")]
    pub coverage_path: Option<String>,

    /// Where the previous baseline is restored to
    #[arg(long = "reference-coverage-path", env = "INPUT_REFERENCE-COVERAGE-PATH")]
    pub reference_coverage_path: Option<String>,

    /// Token for the GitHub API
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Root directory of the baseline store
    #[arg(long = "cache-dir", env = "COVBASE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// GitHub REST endpoint
    #[arg(long = "api-url", env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
}

/// Validated step configuration.
#[derive(Debug, Clone)]
pub struct ActionConfig {
    pub coverage_path: PathBuf,
    pub reference_coverage_path: PathBuf,
    pub token: String,
    pub cache_dir: Option<PathBuf>,
    pub api_url: String,
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MissingInput(name.to_string()))
}

impl ActionConfig {
    pub fn from_args(args: ActionArgs) -> Result<Self> {
        let coverage_path = PathBuf::from(required(args.coverage_path, "coverage-path")?);

        let reference_coverage_path = match args
            .reference_coverage_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            Some(path) => PathBuf::from(path),
            None => {
                info!(
                    "No 'reference-coverage-path' provided; defaulting to '{}'",
                    DEFAULT_REFERENCE_PATH
                );
                PathBuf::from(DEFAULT_REFERENCE_PATH)
            }
        };

        let token = required(args.token, "token")?;

        Ok(Self {
            coverage_path,
            reference_coverage_path,
            token,
            cache_dir: args.cache_dir,
            api_url: args.api_url,
        })
    }
}
