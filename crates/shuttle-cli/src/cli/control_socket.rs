//! Control socket: server (during `shuttle run`) and client (other commands).
//!
//! Protocol: one command per line. "cancel <id>", "cancel-all" and "wake" get
//! a single reply line ("ok ..." or "error ..."). "subscribe" turns the
//! connection into a stream of progress events, one JSON object per line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use shuttle_core::broadcast::SubscriberHub;
use shuttle_core::control::{CancelOutcome, JobControl};
use shuttle_core::job_db::JobId;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    Cancel(JobId),
    CancelAll,
    Wake,
    Subscribe,
}

impl ControlRequest {
    /// Parse one protocol line. Unknown or malformed lines yield None.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let cmd = parts.next()?;
        let arg = parts.next();
        if parts.next().is_some() {
            return None;
        }
        match (cmd, arg) {
            ("cancel", Some(id)) => id.parse().ok().map(ControlRequest::Cancel),
            ("cancel-all", None) => Some(ControlRequest::CancelAll),
            ("wake", None) => Some(ControlRequest::Wake),
            ("subscribe", None) => Some(ControlRequest::Subscribe),
            _ => None,
        }
    }

    pub fn to_line(self) -> String {
        match self {
            ControlRequest::Cancel(id) => format!("cancel {}\n", id),
            ControlRequest::CancelAll => "cancel-all\n".to_string(),
            ControlRequest::Wake => "wake\n".to_string(),
            ControlRequest::Subscribe => "subscribe\n".to_string(),
        }
    }
}

/// Removes the socket file when the listener goes away.
pub struct ListenerGuard {
    path: PathBuf,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.task.abort();
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Bind `path` and serve control requests until the returned guard is dropped.
pub fn spawn_control_listener(
    control: JobControl,
    hub: Arc<SubscriberHub>,
    path: impl AsRef<Path>,
) -> Result<ListenerGuard> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)
        .with_context(|| format!("bind control socket {}", path.display()))?;

    let task = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let control = control.clone();
                    let hub = Arc::clone(&hub);
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, &control, &hub).await {
                            tracing::debug!("control connection ended: {:#}", e);
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(ListenerGuard { path, task })
}

async fn serve_connection(
    stream: UnixStream,
    control: &JobControl,
    hub: &SubscriberHub,
) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(request) = ControlRequest::parse(&line) else {
            write
                .write_all(format!("error unknown command: {}\n", line.trim()).as_bytes())
                .await?;
            continue;
        };
        let reply = match request {
            ControlRequest::Subscribe => return stream_events(lines, write, hub).await,
            ControlRequest::Cancel(id) => match control.cancel(id).await {
                Ok(CancelOutcome::Cancelled) => "ok cancelled".to_string(),
                Ok(CancelOutcome::Requested) => "ok requested".to_string(),
                Ok(CancelOutcome::AlreadyFinished(status)) => format!("ok finished {}", status),
                Err(e) => format!("error {}", e),
            },
            ControlRequest::CancelAll => match control.cancel_all().await {
                Ok(summary) => format!(
                    "ok cancelled {} requested {}",
                    summary.cancelled,
                    summary.requested.len()
                ),
                Err(e) => format!("error {}", e),
            },
            ControlRequest::Wake => {
                control.wake_scheduler();
                "ok".to_string()
            }
        };
        write.write_all(format!("{}\n", reply).as_bytes()).await?;
    }
    Ok(())
}

/// Forward hub events to the client until it disconnects or falls behind.
async fn stream_events(
    mut lines: Lines<BufReader<tokio::net::unix::OwnedReadHalf>>,
    mut write: OwnedWriteHalf,
    hub: &SubscriberHub,
) -> Result<()> {
    let mut sub = hub.subscribe();
    let id = sub.id;
    let result = async {
        loop {
            tokio::select! {
                event = sub.rx.recv() => {
                    let Some(event) = event else { break };
                    let mut json = serde_json::to_string(&event)?;
                    json.push('\n');
                    write.write_all(json.as_bytes()).await?;
                }
                line = lines.next_line() => {
                    // Client closed its side (or sent garbage we don't expect).
                    if line?.is_none() {
                        break;
                    }
                }
            }
        }
        anyhow::Ok(())
    }
    .await;
    hub.unsubscribe(id);
    result
}

/// Send one request and return the reply line. Errors if no `shuttle run`
/// is listening.
pub async fn send_request(socket_path: &Path, request: ControlRequest) -> Result<String> {
    let stream = UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("connect control socket {}", socket_path.display()))?;
    let (read, mut write) = stream.into_split();
    write.write_all(request.to_line().as_bytes()).await?;
    let reply = BufReader::new(read)
        .lines()
        .next_line()
        .await?
        .context("control socket closed without a reply")?;
    Ok(reply)
}

/// Best-effort wake of a running worker; silent when none is listening.
pub async fn try_wake(socket_path: &Path) {
    if !socket_path.exists() {
        return;
    }
    if let Err(e) = send_request(socket_path, ControlRequest::Wake).await {
        tracing::debug!("wake via control socket failed: {:#}", e);
    }
}

/// Open a subscription; returns a line reader over JSON events.
pub async fn subscribe(
    socket_path: &Path,
) -> Result<(Lines<BufReader<tokio::net::unix::OwnedReadHalf>>, OwnedWriteHalf)> {
    let stream = UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("connect control socket {}", socket_path.display()))?;
    let (read, mut write) = stream.into_split();
    write
        .write_all(ControlRequest::Subscribe.to_line().as_bytes())
        .await?;
    Ok((BufReader::new(read).lines(), write))
}
