//! duesync core library: domain types, due-date parsing, record storage.
//!
//! Public API surface:
//! - [`types`]: assignment records, sync state, row schema
//! - [`due`]: due-date text parsing
//! - [`store`]: [`RecordStore`] trait plus file and in-memory stores
//! - [`settings`]: user settings (`settings.yaml`)
//! - [`props`]: machine-written properties (`props.json`)
//! - [`ingest`]: converting upstream assignment tuples into rows
//! - [`error`]: [`StoreError`], [`SettingsError`], [`RecordError`]

pub mod due;
pub mod error;
pub mod ingest;
pub mod paths;
pub mod props;
pub mod settings;
pub mod store;
pub mod types;

pub use due::{parse_due, DueDate};
pub use error::{RecordError, SettingsError, StoreError};
pub use props::Props;
pub use settings::Settings;
pub use store::{FileRecordStore, MemoryRecordStore, RecordStore};
pub use types::{header_row, AssignmentRecord, Row, SourceKind, SyncState, TaskId};
