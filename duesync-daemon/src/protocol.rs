//! Control socket client for `~/.duesync/daemon.sock`.
//!
//! Each exchange is one JSON line each way:
//!
//! | `cmd`    | `data` on success                                        |
//! |----------|----------------------------------------------------------|
//! | `status` | pid, start time, next scheduled pass, last pass summary  |
//! | `sync`   | summary of a pass run now (over `sheet` if given)        |
//! | `stop`   | `{"stopping": true}`; the daemon then shuts down         |

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{io_err, DaemonError};
use crate::paths::socket_path;

pub const CMD_STATUS: &str = "status";
pub const CMD_SYNC: &str = "sync";
pub const CMD_STOP: &str = "stop";

/// A command sent to the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonRequest {
    pub cmd: String,
    /// Limits a `sync` pass to one sheet; ignored by other commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
}

impl DaemonRequest {
    pub fn new(cmd: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            sheet: None,
        }
    }
}

/// The daemon's answer: `data` when `ok`, otherwise `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Send one command and wait for the daemon's answer. A missing or refusing
/// socket is reported as [`DaemonError::NotRunning`].
pub fn send_request(home: &Path, request: &DaemonRequest) -> Result<DaemonResponse, DaemonError> {
    let socket = socket_path(home);
    if !socket.exists() {
        return Err(DaemonError::NotRunning { socket });
    }

    let mut stream = UnixStream::connect(&socket).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound
        | std::io::ErrorKind::ConnectionRefused
        | std::io::ErrorKind::ConnectionReset => DaemonError::NotRunning {
            socket: socket.clone(),
        },
        _ => io_err(&socket, err),
    })?;

    let mut payload = serde_json::to_string(request)?;
    payload.push('\n');
    stream
        .write_all(payload.as_bytes())
        .and_then(|_| stream.flush())
        .map_err(|e| io_err(&socket, e))?;

    let mut line = String::new();
    let read = BufReader::new(stream)
        .read_line(&mut line)
        .map_err(|e| io_err(&socket, e))?;
    if read == 0 {
        return Err(DaemonError::Protocol(format!(
            "{} hung up without answering",
            socket.display()
        )));
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

const STATUS_ATTEMPTS: u32 = 5;
const STATUS_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Fetch the status payload, retrying briefly while a just-started daemon
/// binds its socket.
pub fn request_status(home: &Path) -> Result<Value, DaemonError> {
    let request = DaemonRequest::new(CMD_STATUS);
    let mut attempt = 1;
    loop {
        match send_request(home, &request) {
            Err(DaemonError::NotRunning { .. }) if attempt < STATUS_ATTEMPTS => {
                attempt += 1;
                sleep(STATUS_RETRY_DELAY);
            }
            result => return response_into_data(result?),
        }
    }
}

/// Ask the daemon to finish its current work and exit.
pub fn request_stop(home: &Path) -> Result<(), DaemonError> {
    let response = send_request(home, &DaemonRequest::new(CMD_STOP))?;
    response_into_data(response).map(|_| ())
}

/// Queue a pass behind any running one and wait for its summary. `None`
/// covers every tracked sheet.
pub fn request_sync(home: &Path, sheet: Option<String>) -> Result<Value, DaemonError> {
    let request = DaemonRequest {
        sheet,
        ..DaemonRequest::new(CMD_SYNC)
    };
    response_into_data(send_request(home, &request)?)
}

fn response_into_data(response: DaemonResponse) -> Result<Value, DaemonError> {
    if response.ok {
        Ok(response.data.unwrap_or(Value::Null))
    } else {
        Err(DaemonError::Protocol(
            response
                .error
                .unwrap_or_else(|| "daemon refused the request".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn request_without_sheet_omits_field() {
        let line = serde_json::to_string(&DaemonRequest::new("status")).unwrap();
        assert_eq!(line, r#"{"cmd":"status"}"#);
        let parsed: DaemonRequest = serde_json::from_str(r#"{"cmd":"sync","sheet":"WebClass"}"#).unwrap();
        assert_eq!(parsed.sheet.as_deref(), Some("WebClass"));
    }

    #[test]
    fn missing_socket_means_not_running() {
        let home = TempDir::new().unwrap();
        let err = send_request(home.path(), &DaemonRequest::new("status")).unwrap_err();
        assert!(matches!(err, DaemonError::NotRunning { .. }));
    }

    #[test]
    fn error_response_becomes_protocol_error() {
        let err = response_into_data(DaemonResponse::error("boom")).unwrap_err();
        assert!(matches!(err, DaemonError::Protocol(msg) if msg == "boom"));
        assert_eq!(
            response_into_data(DaemonResponse::ok(Value::Bool(true))).unwrap(),
            Value::Bool(true)
        );
    }
}
