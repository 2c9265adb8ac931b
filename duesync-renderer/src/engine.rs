//! Tera composition engine: [`TemplateEngine`] and [`TaskComposer`].
//!
//! | Template     | Produces                |
//! |--------------|-------------------------|
//! | `title.tera` | remote task title       |
//! | `notes.tera` | remote task notes body  |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tera::Tera;

use duesync_core::{paths, AssignmentRecord, DueDate};

use crate::context::TaskContext;
use crate::error::RenderError;

pub const TITLE_TEMPLATE: &str = "title.tera";
pub const NOTES_TEMPLATE: &str = "notes.tera";

// ---------------------------------------------------------------------------
// Embedded templates, baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    (TITLE_TEMPLATE, include_str!("templates/title.tera")),
    (NOTES_TEMPLATE, include_str!("templates/notes.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn override_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Override { path: path.into(), source }
}

/// Only the two known template names are picked up from the override dir.
fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut templates = Vec::new();
    for (name, _) in TPLS {
        let path = dir.join(name);
        if !path.is_file() {
            continue;
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| override_err(&path, e))?;
        templates.push(((*name).to_string(), contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = TPLS
        .iter()
        .map(|(name, content)| ((*name).to_string(), (*content).to_string()))
        .collect();
    if let Some(dir) = user_template_dir {
        templates.extend(load_user_templates(dir)?);
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera engine with the embedded templates plus optional user overrides.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(TemplateEngine {
            tera: build_tera(user_template_dir)?,
        })
    }

    /// Render one named template.
    pub fn render(&self, name: &str, ctx: &TaskContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        self.tera
            .render(name, &tera_ctx)
            .map_err(|source| RenderError::Render {
                name: name.to_string(),
                source,
            })
    }
}

// ---------------------------------------------------------------------------
// TaskComposer
// ---------------------------------------------------------------------------

/// Outbound payload for one registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub title: String,
    /// RFC 3339 UTC with milliseconds, e.g. `2024-05-01T14:59:00.000Z`.
    pub due: String,
    pub notes: String,
}

/// Builds [`TaskPayload`]s. Create once per pass and reuse.
pub struct TaskComposer {
    engine: TemplateEngine,
}

impl TaskComposer {
    /// Embedded templates only.
    pub fn new() -> Result<Self, RenderError> {
        Ok(TaskComposer {
            engine: TemplateEngine::new(None)?,
        })
    }

    /// Embedded templates overridden by `<home>/.duesync/templates/*.tera`.
    pub fn at(home: &Path) -> Result<Self, RenderError> {
        let dir = paths::templates_dir(home);
        Ok(TaskComposer {
            engine: TemplateEngine::new(Some(&dir))?,
        })
    }

    pub fn compose(
        &self,
        record: &AssignmentRecord,
        due: &DueDate,
        now: DateTime<Local>,
    ) -> Result<TaskPayload, RenderError> {
        let ctx = TaskContext::from_record(record, due, now);
        let title = self.engine.render(TITLE_TEMPLATE, &ctx)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(RenderError::EmptyTitle(record.title.clone()));
        }
        let notes = self.engine.render(NOTES_TEMPLATE, &ctx)?;
        Ok(TaskPayload {
            title: title.to_string(),
            due: format_due(due),
            notes: notes.trim_end().to_string(),
        })
    }
}

/// The outbound due timestamp: [`DueDate::deadline`] (23:59 local for
/// date-only input) as RFC 3339 UTC.
pub fn format_due(due: &DueDate) -> String {
    due.deadline()
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
