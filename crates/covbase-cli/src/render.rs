//! Comment rendering.
//!
//! The bundled renderer does not diff coverage; it places the current and
//! previous text summaries next to each other under the commits they came from.

use covbase_core::Result;
use covbase_core::ports::{CommentRenderer, CoverageComparison};
use std::path::{Path, PathBuf};

/// Renders text coverage summaries as a Markdown comment.
pub struct SummaryRenderer {
    base_dir: PathBuf,
}

impl SummaryRenderer {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn read(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(self.base_dir.join(path))
    }
}

fn short(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

fn fenced(text: &str) -> String {
    format!("```text\n{}\n```\n", text.trim_end())
}

impl CommentRenderer for SummaryRenderer {
    fn render(&self, comparison: &CoverageComparison) -> Result<String> {
        let current = self.read(&comparison.current_artifact)?;
        let previous = self.read(&comparison.previous_artifact).ok();

        let mut out = format!(
            "### Coverage for `{}`\n\n{}\n",
            short(&comparison.commit_id),
            fenced(&current)
        );

        match (&comparison.previous_commit_id, previous) {
            (Some(sha), Some(text)) => {
                out.push_str(&format!("#### Baseline `{}`\n\n{}", short(sha), fenced(&text)));
            }
            (None, Some(text)) => {
                out.push_str(&format!("#### Baseline (commit unknown)\n\n{}", fenced(&text)));
            }
            (Some(sha), None) => {
                out.push_str(&format!(
                    "No baseline coverage was recorded for `{}`.\n",
                    short(sha)
                ));
            }
            (None, None) => {
                out.push_str("No baseline coverage found; nothing to compare against.\n");
            }
        }

        Ok(out)
    }
}
