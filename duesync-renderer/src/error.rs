use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning a record into a task payload.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A template (embedded or override) did not compile.
    #[error("invalid task template: {0}")]
    Template(#[from] tera::Error),

    #[error("rendering {name} failed: {source}")]
    Render {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("cannot read template override {path}: {source}")]
    Override { path: PathBuf, source: std::io::Error },

    /// The title template produced only whitespace.
    #[error("task title for '{0}' rendered empty")]
    EmptyTitle(String),
}
