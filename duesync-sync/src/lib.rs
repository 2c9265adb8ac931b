//! # duesync-sync
//!
//! Reconciliation engine and retention sweep.
//!
//! Call [`pipeline::run`] for a full pass over the sheets under a home
//! directory, or [`pipeline::run_pass`] with an explicit store and config.

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod sweeper;

pub use engine::{RecordOutcome, RecordReport, Reconciler, SheetReconcile};
pub use error::SyncError;
pub use pipeline::{run, run_pass, SheetReport, SyncOptions, SyncReport, SyncScope, Totals};
pub use sweeper::{sweep_reason, sweep_sheet, SweepReason, SweptRow};
