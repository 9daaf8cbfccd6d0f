//! `shuttle notify-test` – check the configured webhook.

use anyhow::{bail, Context, Result};
use shuttle_core::config::ShuttleConfig;
use shuttle_core::notify::WebhookNotifier;
use tokio::runtime::Handle;

pub async fn run_notify_test(cfg: &ShuttleConfig) -> Result<()> {
    let Some(webhook) = WebhookNotifier::from_config(&cfg.notify, Handle::current()) else {
        bail!("no webhook configured; set notify.webhook_url in config.toml");
    };
    let url = webhook.url().to_string();
    tokio::task::spawn_blocking(move || webhook.send_test())
        .await
        .context("webhook test task")??;
    println!("Test notification sent to {}", url);
    Ok(())
}
