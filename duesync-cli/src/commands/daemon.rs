//! `duesync daemon`: background scheduler lifecycle.

use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use duesync_daemon::log_rotation::tail_lines;
use duesync_daemon::paths::{log_path, socket_path};
use duesync_daemon::{request_status, request_stop, start_blocking, DaemonError};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Launch the daemon in the background.
    Start,
    /// Request graceful daemon shutdown over the socket.
    Stop,
    /// Query daemon runtime status over the socket.
    Status,
    /// Run the daemon in the foreground.
    Run,
    /// Print recent daemon log lines.
    Logs(DaemonLogsArgs),
}

#[derive(Args, Debug)]
pub struct DaemonLogsArgs {
    /// Number of trailing lines to show.
    #[arg(long, default_value_t = 100)]
    pub lines: usize,
}

pub fn run(command: DaemonCommand) -> Result<()> {
    let home = super::home_dir()?;

    match command {
        DaemonCommand::Run => {
            start_blocking(&home).context("daemon exited with error")?;
        }
        DaemonCommand::Start => {
            if request_status(&home).is_ok() {
                println!("daemon is already running");
                return Ok(());
            }
            let exe = std::env::current_exe().context("cannot locate duesync binary")?;
            let child = Command::new(exe)
                .args(["daemon", "run"])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .context("failed to launch daemon")?;
            wait_until_up(&home).with_context(|| {
                format!("daemon did not come up; see {}", log_path(&home).display())
            })?;
            println!("✓ daemon started (pid {})", child.id());
        }
        DaemonCommand::Stop => match request_stop(&home) {
            Ok(()) => println!("daemon stop requested"),
            Err(DaemonError::NotRunning { .. }) => println!("daemon is not running"),
            Err(err) => return Err(err).context("failed to stop daemon"),
        },
        DaemonCommand::Status => {
            let status = match request_status(&home) {
                Ok(status) => status,
                Err(DaemonError::NotRunning { .. }) => serde_json::json!({
                    "running": false,
                    "socket": socket_path(&home).display().to_string(),
                }),
                Err(err) => return Err(err).context("failed to query daemon status"),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&status)
                    .context("failed to render daemon status JSON")?
            );
        }
        DaemonCommand::Logs(args) => {
            let path = log_path(&home);
            if !path.exists() {
                println!("log file not found: {}", path.display());
                return Ok(());
            }
            let lines = tail_lines(&path, args.lines)
                .with_context(|| format!("read {}", path.display()))?;
            println!("==> {} <==", path.display());
            for line in lines {
                println!("{line}");
            }
        }
    }

    Ok(())
}

/// `request_status` already retries for half a second; allow a few rounds.
fn wait_until_up(home: &std::path::Path) -> Result<(), DaemonError> {
    let mut last = None;
    for _ in 0..6 {
        match request_status(home) {
            Ok(_) => return Ok(()),
            Err(err @ DaemonError::NotRunning { .. }) => last = Some(err),
            Err(err) => return Err(err),
        }
    }
    Err(last.unwrap_or_else(|| DaemonError::NotRunning {
        socket: socket_path(home),
    }))
}
