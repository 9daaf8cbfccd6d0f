//! `shuttle watch` – follow progress events from a running worker.

use anyhow::{Context, Result};
use shuttle_core::broadcast::ProgressEvent;

use crate::cli::control_socket;

pub async fn run_watch(json: bool) -> Result<()> {
    let path = super::socket_path()?;
    let (mut lines, _write) = control_socket::subscribe(&path)
        .await
        .context("is `shuttle run` running?")?;
    while let Some(line) = lines.next_line().await? {
        if json {
            println!("{}", line);
            continue;
        }
        match serde_json::from_str::<ProgressEvent>(&line) {
            Ok(ev) => println!("{}", super::run::describe(&ev)),
            Err(e) => tracing::debug!("unparseable event line: {}", e),
        }
    }
    println!("Worker closed the stream.");
    Ok(())
}
