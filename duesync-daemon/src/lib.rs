//! Background runner: daily scheduler + sync processor + socket server.

mod error;
pub mod log_rotation;
pub mod paths;
pub mod protocol;
mod runtime;
pub mod schedule;

pub use error::DaemonError;
pub use protocol::{
    request_status, request_stop, request_sync, send_request, DaemonRequest, DaemonResponse,
};
pub use runtime::{run, start_blocking, SyncSummary};
pub use schedule::next_trigger;
