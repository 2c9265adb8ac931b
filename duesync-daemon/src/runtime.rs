use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::Instant;

use duesync_core::Settings;
use duesync_sync::pipeline::{self, SyncOptions, SyncReport, SyncScope};
use duesync_tasks::{GoogleTasksClient, TaskService};

use crate::error::{io_err, DaemonError};
use crate::paths::{log_path, logs_dir, socket_path};
use crate::protocol::{DaemonRequest, DaemonResponse, CMD_STATUS, CMD_STOP, CMD_SYNC};
use crate::schedule::{delay_until, next_trigger};

/// Builds the task service for one pass. Called on the blocking pool.
pub(crate) type ServiceFactory =
    Arc<dyn Fn() -> Result<Box<dyn TaskService + Send>, DaemonError> + Send + Sync>;

#[derive(Debug, Clone)]
enum SyncTarget {
    All,
    Sheet(String),
}

impl SyncTarget {
    fn scope(&self) -> SyncScope {
        match self {
            SyncTarget::All => SyncScope::All,
            SyncTarget::Sheet(name) => SyncScope::Sheet(name.clone()),
        }
    }

    fn label(&self) -> String {
        match self {
            SyncTarget::All => "all".to_string(),
            SyncTarget::Sheet(name) => name.clone(),
        }
    }
}

struct SyncJob {
    target: SyncTarget,
    source: &'static str,
    respond_to: oneshot::Sender<Result<SyncSummary, String>>,
}

/// What one daemon-run pass did.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub target: String,
    pub source: String,
    /// Why the pass was skipped, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    pub sheets: Vec<String>,
    pub registered: usize,
    pub completed: usize,
    pub deleted: usize,
    pub expired: usize,
    pub failed: usize,
    pub swept: usize,
    pub finished_at_unix: u64,
    pub duration_ms: u128,
}

#[derive(Debug, Default)]
struct DaemonState {
    started_at_unix: u64,
    next_run_at: Option<DateTime<Local>>,
    last_run: Option<SyncSummary>,
}

type SharedState = Arc<RwLock<DaemonState>>;

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    ensure_runtime_dirs(home)?;
    init_tracing(home);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Run the daemon against the Google Tasks API.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    let factory: ServiceFactory = Arc::new(|| -> Result<Box<dyn TaskService + Send>, DaemonError> {
        Ok(Box::new(GoogleTasksClient::from_env()?))
    });
    serve(home, factory).await
}

pub(crate) async fn serve(home: PathBuf, factory: ServiceFactory) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;

    let state: SharedState = Arc::new(RwLock::new(DaemonState {
        started_at_unix: unix_seconds_now(),
        ..DaemonState::default()
    }));

    let (sync_tx, sync_rx) = mpsc::channel::<SyncJob>(64);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let state = state.clone();
        let sync_tx = sync_tx.clone();
        tokio::spawn(async move {
            let result = scheduler_task(home, state, sync_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let state = state.clone();
        tokio::spawn(async move {
            let result =
                sync_processor_task(home, factory, state, sync_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let state = state.clone();
        tokio::spawn(async move {
            let result =
                socket_server_task(home, state, sync_tx, shutdown.clone(), shutdown.subscribe())
                    .await;
            let _ = shutdown.send(());
            result
        })
    };

    let rotation_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        tokio::spawn(async move {
            let result = log_rotation_task(home, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move { signal_task(shutdown).await })
    };

    let (scheduler_result, processor_result, socket_result, rotation_result, signal_result) = tokio::join!(
        scheduler_handle,
        processor_handle,
        socket_handle,
        rotation_handle,
        signal_handle
    );

    handle_join("scheduler", scheduler_result)?;
    handle_join("sync_processor", processor_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("log_rotation", rotation_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("daemon stopped");
    Ok(())
}

async fn scheduler_task(
    home: PathBuf,
    state: SharedState,
    sync_tx: mpsc::Sender<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        // Re-read every cycle so an edited trigger hour applies from the next run.
        let hour = match Settings::load_at(&home) {
            Ok(settings) => settings.trigger_hour,
            Err(err) => {
                tracing::warn!(error = %err, "settings unreadable; using default trigger hour");
                Settings::default().trigger_hour
            }
        };
        let now = Local::now();
        let next = next_trigger(&now, hour);
        state.write().await.next_run_at = Some(next);
        tracing::info!(next_run_at = %next.to_rfc3339(), "scheduled next pass");

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep(delay_until(&now, &next)) => {
                match enqueue_sync(&sync_tx, SyncTarget::All, "scheduler").await {
                    Ok(summary) => log_summary(&summary),
                    Err(DaemonError::QueueClosed(what)) => {
                        tracing::debug!(channel = what, "scheduler exiting; processor gone");
                        break;
                    }
                    Err(err) => tracing::error!(error = %err, "scheduled pass failed"),
                }
            }
        }
    }
    Ok(())
}

async fn sync_processor_task(
    home: PathBuf,
    factory: ServiceFactory,
    state: SharedState,
    mut sync_rx: mpsc::Receiver<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = sync_rx.recv() => {
                let Some(job) = maybe_job else { break };
                let started = Instant::now();

                let scope = job.target.scope();
                let home_for_sync = home.clone();
                let factory = factory.clone();
                let pass = tokio::task::spawn_blocking(move || {
                    let service = (*factory)()?;
                    pipeline::run(&home_for_sync, &*service, scope, SyncOptions::default())
                        .map_err(DaemonError::from)
                })
                .await
                .map_err(|err| DaemonError::Protocol(format!("sync task join error: {err}")))?;

                let outcome = match pass {
                    Ok(report) => {
                        let summary = build_sync_summary(&job.target, job.source, &report, started.elapsed());
                        state.write().await.last_run = Some(summary.clone());
                        Ok(summary)
                    }
                    Err(err) => Err(err.to_string()),
                };

                let _ = job.respond_to.send(outcome);
            }
        }
    }
    Ok(())
}

async fn socket_server_task(
    home: PathBuf,
    state: SharedState,
    sync_tx: mpsc::Sender<SyncJob>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let socket = socket_path(&home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;
    tracing::info!(socket = %socket.display(), "daemon listening");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let home = home.clone();
                let state = state.clone();
                let sync_tx = sync_tx.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(stream, home, state, sync_tx, shutdown_tx).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    home: PathBuf,
    state: SharedState,
    sync_tx: mpsc::Sender<SyncJob>,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: DaemonRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request JSON: {err}")),
                )
                .await?;
                continue;
            }
        };

        let response = match request.cmd.as_str() {
            CMD_STATUS => DaemonResponse::ok(build_status_payload(&home, &state).await),
            CMD_SYNC => {
                let target = match request.sheet {
                    Some(sheet) => SyncTarget::Sheet(sheet),
                    None => SyncTarget::All,
                };
                match enqueue_sync(&sync_tx, target, "socket").await {
                    Ok(summary) => {
                        log_summary(&summary);
                        DaemonResponse::ok(json!(summary))
                    }
                    Err(err) => DaemonResponse::error(err.to_string()),
                }
            }
            CMD_STOP => {
                tracing::info!("stop requested over socket");
                let _ = shutdown_tx.send(());
                DaemonResponse::ok(json!({ "stopping": true }))
            }
            other => DaemonResponse::error(format!("unknown command '{other}'")),
        };

        write_response(&mut writer, &response).await?;
        if request.cmd == CMD_STOP {
            break;
        }
    }
    Ok(())
}

async fn build_status_payload(home: &Path, state: &SharedState) -> Value {
    let state = state.read().await;
    json!({
        "running": true,
        "pid": std::process::id(),
        "started_at_unix": state.started_at_unix,
        "next_run_at": state.next_run_at.map(|at| at.to_rfc3339()),
        "last_run": state.last_run,
        "socket": socket_path(home).display().to_string(),
        "log": log_path(home).display().to_string(),
    })
}

async fn enqueue_sync(
    sync_tx: &mpsc::Sender<SyncJob>,
    target: SyncTarget,
    source: &'static str,
) -> Result<SyncSummary, DaemonError> {
    let (tx, rx) = oneshot::channel();
    sync_tx
        .send(SyncJob {
            target,
            source,
            respond_to: tx,
        })
        .await
        .map_err(|_| DaemonError::QueueClosed("sync queue"))?;

    let outcome = rx
        .await
        .map_err(|_| DaemonError::QueueClosed("sync response"))?;
    outcome.map_err(DaemonError::Protocol)
}

async fn log_rotation_task(
    home: PathBuf,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let home = home.clone();
                // Failures are logged inside rotate_logs.
                tokio::task::spawn_blocking(move || crate::log_rotation::rotate_logs(&home))
                    .await
                    .ok();
            }
        }
    }
    Ok(())
}

async fn signal_task(shutdown: broadcast::Sender<()>) -> Result<(), DaemonError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut shutdown_rx = shutdown.subscribe();
    let mut terminate = signal(SignalKind::terminate())
        .map_err(|err| DaemonError::Signal(format!("SIGTERM: {err}")))?;

    tokio::select! {
        _ = shutdown_rx.recv() => Ok(()),
        _ = terminate.recv() => {
            tracing::info!("received SIGTERM, shutting down daemon");
            let _ = shutdown.send(());
            Ok(())
        }
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                tracing::info!("received ctrl-c, shutting down daemon");
                let _ = shutdown.send(());
                Ok(())
            }
            Err(err) => Err(DaemonError::Signal(format!("ctrl-c: {err}"))),
        },
    }
}

fn build_sync_summary(
    target: &SyncTarget,
    source: &'static str,
    report: &SyncReport,
    duration: Duration,
) -> SyncSummary {
    let totals = report.totals();
    SyncSummary {
        target: target.label(),
        source: source.to_string(),
        skipped: report.skipped.clone(),
        sheets: report
            .sheets
            .iter()
            .filter(|s| !s.skipped)
            .map(|s| s.sheet.clone())
            .collect(),
        registered: totals.registered,
        completed: totals.completed,
        deleted: totals.deleted,
        expired: totals.expired,
        failed: totals.failed,
        swept: totals.swept,
        finished_at_unix: unix_seconds_now(),
        duration_ms: duration.as_millis(),
    }
}

fn log_summary(summary: &SyncSummary) {
    match &summary.skipped {
        Some(reason) => tracing::info!(source = %summary.source, reason = %reason, "pass skipped"),
        None => tracing::info!(
            source = %summary.source,
            target = %summary.target,
            registered = summary.registered,
            completed = summary.completed,
            deleted = summary.deleted,
            expired = summary.expired,
            failed = summary.failed,
            swept = summary.swept,
            duration_ms = summary.duration_ms,
            "pass completed",
        ),
    }
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    if StdUnixStream::connect(socket).is_ok() {
        return Err(DaemonError::Protocol(format!(
            "daemon socket already in use: {}",
            socket.display()
        )));
    }
    tracing::warn!(socket = %socket.display(), "removing stale daemon socket before bind");

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    let logs = logs_dir(home);
    if !logs.exists() {
        fs::create_dir_all(&logs).map_err(|e| io_err(&logs, e))?;
    }
    Ok(())
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let mut payload = serde_json::to_string(response)?;
    payload.push('\n');
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Log to `~/.duesync/logs/daemon.log`, reopening per event so rotation
/// never leaves the writer on a renamed file.
fn init_tracing(home: &Path) {
    use std::io::Write;
    use tracing_subscriber::{fmt, EnvFilter};

    let path = log_path(home);
    let make_writer = move || -> Box<dyn Write> {
        match fs::OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Box::new(file),
            Err(_) => Box::new(std::io::stderr()),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(make_writer)
        .try_init();
}

fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}
