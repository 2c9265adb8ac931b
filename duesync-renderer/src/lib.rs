//! # duesync-renderer
//!
//! Tera-based composition of the remote task title, due timestamp, and notes
//! for a record about to be registered.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrono::Local;
//! use duesync_core::{parse_due, AssignmentRecord};
//! use duesync_renderer::TaskComposer;
//!
//! fn preview(record: &AssignmentRecord) {
//!     let Ok(composer) = TaskComposer::new() else { return };
//!     if let Some(due) = parse_due(&record.due) {
//!         if let Ok(payload) = composer.compose(record, &due, Local::now()) {
//!             println!("{} due {}", payload.title, payload.due);
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::TaskContext;
pub use engine::{format_due, TaskComposer, TaskPayload, TemplateEngine};
pub use error::RenderError;
