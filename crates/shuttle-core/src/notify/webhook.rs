//! Webhook notifier: posts a JSON embed per finished job via libcurl.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::runtime::Handle;

use super::{format_duration, format_size, JobOutcome, TerminalNotifier};
use crate::config::NotifyConfig;
use crate::job_db::JobStatus;

const MAX_ERROR_CHARS: usize = 500;

pub struct WebhookNotifier {
    url: String,
    notify_success: bool,
    notify_failure: bool,
    rt: Handle,
}

impl WebhookNotifier {
    pub fn new(url: String, cfg: &NotifyConfig, rt: Handle) -> Self {
        Self {
            url,
            notify_success: cfg.notify_success,
            notify_failure: cfg.notify_failure,
            rt,
        }
    }

    /// None unless a non-blank `webhook_url` is configured.
    pub fn from_config(cfg: &NotifyConfig, rt: Handle) -> Option<Self> {
        match cfg.webhook_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Some(Self::new(url.to_string(), cfg, rt)),
            _ => None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post the "notifications enabled" embed and wait for the response.
    /// Blocking; call from `spawn_blocking`. Ignores the status filters.
    pub fn send_test(&self) -> Result<()> {
        post_json(&self.url, &test_payload())
    }

    fn wants(&self, status: JobStatus) -> bool {
        match status {
            JobStatus::Completed => self.notify_success,
            JobStatus::Failed | JobStatus::Cancelled => self.notify_failure,
            JobStatus::Queued | JobStatus::Processing => false,
        }
    }
}

impl TerminalNotifier for WebhookNotifier {
    fn notify(&self, outcome: JobOutcome) {
        if !self.wants(outcome.status) {
            return;
        }
        let Some(payload) = build_payload(&outcome) else {
            return;
        };
        let url = self.url.clone();
        let job_id = outcome.job_id;
        self.rt.spawn_blocking(move || {
            if let Err(e) = post_json(&url, &payload) {
                tracing::warn!(job_id, "webhook notification failed: {:#}", e);
            } else {
                tracing::debug!(job_id, "webhook notification sent");
            }
        });
    }
}

/// Embed for a terminal status; None for non-terminal ones.
pub(crate) fn build_payload(outcome: &JobOutcome) -> Option<Value> {
    let (title, color, verb) = match outcome.status {
        JobStatus::Completed => ("Copy Completed", 0x2ECC71, "finished"),
        JobStatus::Failed => ("Copy Failed", 0xE74C3C, "failed"),
        JobStatus::Cancelled => ("Copy Cancelled", 0xF39C12, "was cancelled"),
        JobStatus::Queued | JobStatus::Processing => return None,
    };

    let mut fields = vec![
        json!({ "name": "Source", "value": format!("```{}```", outcome.source_path), "inline": false }),
        json!({ "name": "Destination", "value": format!("```{}```", outcome.destination_path), "inline": false }),
    ];
    if outcome.total_size_bytes > 0 {
        fields.push(json!({ "name": "Size", "value": format_size(outcome.total_size_bytes), "inline": true }));
    }
    let secs = outcome.duration.as_secs();
    if secs > 0 {
        fields.push(json!({ "name": "Duration", "value": format_duration(outcome.duration), "inline": true }));
        if outcome.status == JobStatus::Completed && outcome.total_size_bytes > 0 {
            let speed = outcome.total_size_bytes / secs;
            fields.push(json!({ "name": "Avg Speed", "value": format!("{}/s", format_size(speed)), "inline": true }));
        }
    }
    if outcome.status == JobStatus::Failed {
        if let Some(err) = &outcome.error_message {
            let short: String = err.chars().take(MAX_ERROR_CHARS).collect();
            fields.push(json!({ "name": "Error", "value": format!("```{}```", short), "inline": false }));
        }
    }

    Some(json!({
        "embeds": [{
            "title": title,
            "description": format!("Job #{} {}.", outcome.job_id, verb),
            "color": color,
            "fields": fields,
            "footer": { "text": "shuttle" },
        }]
    }))
}

pub(crate) fn test_payload() -> Value {
    json!({
        "embeds": [{
            "title": "Shuttle Connected",
            "description": "Webhook notifications are enabled.",
            "color": 0x60CDFF,
            "fields": [
                { "name": "Status", "value": "Webhook verified", "inline": false },
            ],
            "footer": { "text": "shuttle" },
        }]
    })
}

/// Blocking POST; call from `spawn_blocking`.
fn post_json(url: &str, payload: &Value) -> Result<()> {
    let body = serde_json::to_vec(payload)?;
    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid webhook URL")?;
    easy.post(true)?;
    easy.post_field_size(body.len() as u64)?;
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(5))?;
    easy.timeout(Duration::from_secs(10))?;

    let mut list = curl::easy::List::new();
    list.append("Content-Type: application/json")?;
    easy.http_headers(list)?;

    let mut remaining = body.as_slice();
    {
        let mut transfer = easy.transfer();
        transfer.read_function(|buf| {
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            remaining = &remaining[n..];
            Ok(n)
        })?;
        // Discard the response body.
        transfer.write_function(|data| Ok(data.len()))?;
        transfer.perform().context("webhook POST failed")?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("webhook returned HTTP {}", code);
    }
    Ok(())
}
