use aixmon_common::textparse::{Entry, ParseError, Parser};
use aixmon_common::types::{set_label, Batch, StoredMetric};
use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Label attached to every scraped sample.
pub const JOB_LABEL: &str = "job_name";
pub const JOB_NAME: &str = "aix_exporter";

/// Polls one exposition endpoint and forwards each scrape as a batch.
pub struct Scraper {
    client: reqwest::Client,
    target: String,
    send_to: mpsc::UnboundedSender<Batch>,
}

impl Scraper {
    /// `timeout` bounds a single scrape request.
    pub fn new(send_to: mpsc::UnboundedSender<Batch>, target: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build scrape client")?;
        Ok(Self {
            client,
            target: target.into(),
            send_to,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Scrape every `every` until `cancel` fires.
    ///
    /// A failed scrape is logged and skipped; the next tick tries again.
    pub async fn run(&self, every: Duration, cancel: CancellationToken) {
        tracing::info!(scrape_target = %self.target, interval_secs = every.as_secs(), "Starting scraper");
        let mut tick = interval_at(Instant::now() + every, every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Scraper stopped");
                    return;
                }
                _ = tick.tick() => {}
            }

            let batch = match self.scrape_once().await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::error!(scrape_target = %self.target, error = %format!("{e:#}"), "Scrape failed");
                    continue;
                }
            };

            tracing::debug!(samples = batch.len(), "Scraped batch");
            if self.send_to.send(batch).is_err() {
                tracing::warn!("Remote writer is gone, scraper stopping");
                return;
            }
        }
    }

    /// Fetch and parse the target once.
    pub async fn scrape_once(&self) -> Result<Batch> {
        let response = self
            .client
            .get(&self.target)
            .send()
            .await
            .context("failed to reach scrape target")?
            .error_for_status()
            .context("scrape target returned an error status")?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .bytes()
            .await
            .context("failed to read scrape body")?;

        let parser = Parser::new(&body, &content_type).context("failed to create parser")?;
        build_batch(parser, Utc::now().timestamp_millis()).context("failed to parse scrape body")
    }
}

/// Collect every sample entry into a batch.
///
/// Metadata entries are skipped, each sample gets the job label, and all
/// samples share `timestamp_ms` regardless of any timestamp in the body.
pub fn build_batch(parser: Parser<'_>, timestamp_ms: i64) -> Result<Batch, ParseError> {
    let mut batch = Vec::new();
    for entry in parser {
        let entry = entry?;
        if entry.is_metadata() {
            continue;
        }
        let Entry::Series(series) = entry else {
            continue;
        };
        let mut labels = series.labels;
        set_label(&mut labels, JOB_LABEL, JOB_NAME);
        batch.push(StoredMetric {
            labels,
            timestamp_ms,
            value: series.value,
        });
    }
    Ok(batch)
}
