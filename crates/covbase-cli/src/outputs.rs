//! Step outputs and failure reporting for the Actions runner.

use covbase_core::{Error, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Writes `name=value` pairs to the runner's `GITHUB_OUTPUT` file.
pub struct StepOutputs {
    path: Option<PathBuf>,
}

impl StepOutputs {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os("GITHUB_OUTPUT")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        )
    }

    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        let Some(path) = &self.path else {
            debug!(name, "GITHUB_OUTPUT not set; output not recorded");
            return Ok(());
        };

        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        let entry = format_output(name, value, &delimiter)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(entry.as_bytes())?;
        Ok(())
    }
}

/// Heredoc form accepted by the runner for single and multi-line values.
fn format_output(name: &str, value: &str, delimiter: &str) -> Result<String> {
    if name.contains(delimiter) || value.contains(delimiter) {
        return Err(Error::Internal(format!(
            "Output {name} contains the delimiter {delimiter}"
        )));
    }
    Ok(format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
}

fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Mark the step as failed with `message`.
pub fn report_failure(message: &str) {
    println!("::error::{}", escape_data(message));
}
