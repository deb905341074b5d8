use super::client::Client;
use super::codec::{build_write_request, stored_metrics_to_series};
use super::queue::PendingQueue;
use crate::config::AgentConfig;
use crate::error::DeliveryError;
use aixmon_common::types::Batch;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Basic auth credentials for the remote endpoint.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Result of one delivery tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// Nothing was queued.
    Idle,
    /// The head batch was accepted and removed from the queue.
    Delivered { samples: usize, highest_timestamp: i64 },
    /// The head batch stays queued for the next tick.
    Retained(DeliveryError),
}

/// Moves scraped batches into the pending queue and delivers them, oldest
/// first, to the remote write endpoint.
///
/// A batch leaves the queue only after a 2xx response. Permanent failures
/// keep the batch as well, so a request the endpoint always rejects is
/// retried on every tick.
pub struct RemoteWriter {
    client: Client,
    queue: Arc<PendingQueue>,
    credentials: Credentials,
    send_interval: Duration,
    retry_wait: Duration,
}

impl RemoteWriter {
    pub fn new(
        client: Client,
        credentials: Credentials,
        send_interval: Duration,
        retry_wait: Duration,
    ) -> Self {
        Self {
            client,
            queue: Arc::new(PendingQueue::new()),
            credentials,
            send_interval,
            retry_wait,
        }
    }

    pub fn from_config(config: &AgentConfig) -> anyhow::Result<Self> {
        let client = Client::new(
            config.remote_url()?,
            config.remote_timeout(),
            config.retry_on_rate_limit,
        )?;
        let credentials = Credentials {
            username: config.remote_write_user.clone(),
            password: config.remote_write_password.clone(),
        };
        Ok(Self::new(
            client,
            credentials,
            config.send_interval(),
            config.retry_wait(),
        ))
    }

    pub fn queue(&self) -> &Arc<PendingQueue> {
        &self.queue
    }

    /// Run the ingest and delivery loops until `cancel` fires.
    pub async fn run(&self, memory: mpsc::UnboundedReceiver<Batch>, cancel: CancellationToken) {
        tracing::info!(
            url = %self.client.url(),
            send_interval_secs = self.send_interval.as_secs(),
            "Starting remote writer"
        );
        tokio::join!(self.ingest(memory, cancel.clone()), self.deliver(cancel));
        tracing::info!(pending = self.queue.len(), "Remote writer stopped");
    }

    /// Enqueue every batch received from the scraper.
    pub async fn ingest(&self, mut memory: mpsc::UnboundedReceiver<Batch>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                received = memory.recv() => match received {
                    Some(batch) => {
                        self.queue.enqueue(batch);
                        tracing::debug!(pending = self.queue.len(), "Batch queued");
                    }
                    None => {
                        tracing::warn!("Scrape channel closed, ingest stopping");
                        return;
                    }
                },
            }
        }
    }

    /// Attempt one delivery per send interval.
    pub async fn deliver(&self, cancel: CancellationToken) {
        let mut tick = interval_at(Instant::now() + self.send_interval, self.send_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tick.tick() => {}
            }

            match self.deliver_next().await {
                TickOutcome::Idle => {}
                TickOutcome::Delivered { samples, .. } => {
                    tracing::debug!(samples, pending = self.queue.len(), "Batch delivered");
                }
                TickOutcome::Retained(e) if e.is_recoverable() => {
                    tracing::error!(error = %e, "Failed to send write request but retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(self.retry_wait) => {}
                    }
                }
                TickOutcome::Retained(e) => {
                    tracing::error!(error = %e, "Failed to send write request");
                }
            }
        }
    }

    /// Encode and send the head of the queue, removing it on success.
    pub async fn deliver_next(&self) -> TickOutcome {
        let Some(batch) = self.queue.peek() else {
            return TickOutcome::Idle;
        };

        let (body, highest_timestamp) = match build_write_request(stored_metrics_to_series(&batch)) {
            Ok(encoded) => encoded,
            Err(e) => return TickOutcome::Retained(e.into()),
        };

        if let Err(e) = self
            .client
            .store(body, &self.credentials.username, &self.credentials.password)
            .await
        {
            return TickOutcome::Retained(e);
        }

        let delivered = self.queue.dequeue();
        TickOutcome::Delivered {
            samples: delivered.len(),
            highest_timestamp,
        }
    }
}
