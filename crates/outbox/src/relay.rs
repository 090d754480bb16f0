//! Outbox relay: drains unprocessed messages and hands them to a publisher.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::{OutboxMessage, RelayConfig, Result, store::OutboxStore};

/// Error reported by a publisher for a single message.
///
/// Publish errors never abort a relay pass; they are recorded on the message
/// through `mark_failed`.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct PublishError(String);

impl PublishError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Destination for outbox messages (a broker client, a webhook, ...).
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Delivers a single message.
    async fn publish(&self, message: &OutboxMessage) -> std::result::Result<(), PublishError>;
}

/// Publisher that writes every message to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPublisher;

#[async_trait]
impl MessagePublisher for LoggingPublisher {
    async fn publish(&self, message: &OutboxMessage) -> std::result::Result<(), PublishError> {
        tracing::info!(
            message_id = %message.id(),
            message_type = message.message_type(),
            occurred_at = %message.occurred_at(),
            payload = message.payload(),
            "publishing outbox message"
        );
        Ok(())
    }
}

/// Tuning knobs for a relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOptions {
    /// Maximum number of messages fetched per pass.
    pub batch_size: usize,

    /// Messages with this many failed attempts are left for manual handling.
    pub max_attempts: u32,

    /// Delay between passes in [`OutboxRelay::run`].
    pub poll_interval: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

impl From<&RelayConfig> for RelayOptions {
    fn from(config: &RelayConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            max_attempts: config.max_attempts,
            poll_interval: config.poll_interval,
        }
    }
}

/// Outcome of a single relay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub delivered: usize,
    pub failed: usize,
}

impl RelayReport {
    /// Returns true if the pass found nothing to deliver.
    pub fn is_idle(&self) -> bool {
        self.delivered == 0 && self.failed == 0
    }
}

/// Delivers unprocessed outbox messages through a [`MessagePublisher`].
///
/// Delivery is at-least-once: a message is marked processed only after the
/// publisher accepted it, so a crash between the two repeats the delivery.
pub struct OutboxRelay<S: OutboxStore, P: MessagePublisher> {
    store: S,
    publisher: P,
    options: RelayOptions,
}

impl<S: OutboxStore, P: MessagePublisher> OutboxRelay<S, P> {
    /// Creates a relay with default options.
    pub fn new(store: S, publisher: P) -> Self {
        Self::with_options(store, publisher, RelayOptions::default())
    }

    pub fn with_options(store: S, publisher: P, options: RelayOptions) -> Self {
        Self {
            store,
            publisher,
            options,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> RelayOptions {
        self.options
    }

    /// Runs one delivery pass over the oldest deliverable messages.
    ///
    /// Messages that reached `max_attempts` are never fetched, so they cannot
    /// fill a batch. Store errors abort the pass; publish errors are recorded
    /// on the message.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> Result<RelayReport> {
        let messages = self
            .store
            .get_deliverable(self.options.batch_size, self.options.max_attempts)
            .await?;
        let mut report = RelayReport::default();

        for message in messages {
            match self.publisher.publish(&message).await {
                Ok(()) => {
                    self.store.mark_processed(message.id(), Utc::now()).await?;
                    metrics::counter!("outbox_messages_delivered").increment(1);
                    report.delivered += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        message_id = %message.id(),
                        attempts = message.attempts() + 1,
                        error = %err,
                        "outbox delivery failed"
                    );
                    self.store.mark_failed(message.id(), &err.to_string()).await?;
                    metrics::counter!("outbox_delivery_failures").increment(1);
                    report.failed += 1;
                }
            }
        }

        if !report.is_idle() {
            tracing::debug!(
                delivered = report.delivered,
                failed = report.failed,
                "relay pass complete"
            );
        }

        Ok(report)
    }

    /// Runs delivery passes until `shutdown` resolves.
    ///
    /// A full batch with progress triggers the next pass immediately;
    /// otherwise the relay waits `poll_interval` before polling again.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let report = self.run_once().await?;
            let seen = report.delivered + report.failed;
            let delay = if !report.is_idle() && seen >= self.options.batch_size {
                Duration::ZERO
            } else {
                self.options.poll_interval
            };

            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("outbox relay stopping");
                    return Ok(());
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}
