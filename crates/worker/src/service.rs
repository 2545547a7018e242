//! The poll → validate → publish loop.
//!
//! A message is acked once its results were published, or when it can never
//! be validated (malformed payload, unsupported entity type). It is nacked
//! when model resolution or a REST call failed, or when serialization or
//! publishing failed, so the queue redelivers it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use validus_core::ValidationError;
use validus_queue::{QueueConsumer, QueueHealth, QueueMessage, ResultPublisher};
use validus_rules::engine::Validator;

/// Counters for one poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub received: usize,
    /// Messages whose results were published.
    pub validated: usize,
    /// Results published across all validated messages.
    pub published: usize,
    /// Messages that can never be validated; acked and dropped.
    pub rejected: usize,
    /// Messages left on the queue for redelivery.
    pub failed: usize,
}

enum Outcome {
    Published(usize),
    Rejected,
    Failed,
}

pub struct ValidationService {
    consumer: Arc<dyn QueueConsumer>,
    validator: Arc<Validator>,
    publisher: Arc<ResultPublisher>,
    batch_size: u32,
    poll_interval: Duration,
}

impl ValidationService {
    pub fn new(
        consumer: Arc<dyn QueueConsumer>,
        validator: Arc<Validator>,
        publisher: Arc<ResultPublisher>,
    ) -> Self {
        Self {
            consumer,
            validator,
            publisher,
            batch_size: 10,
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Check the inbound queue and log its depth and dead-letter depth.
    pub async fn queue_health(&self) -> Result<(QueueHealth, Option<u64>), ValidationError> {
        let health = self.consumer.health_check().await?;
        let dead_letters = self.consumer.dlq_depth().await?;
        info!(
            %health,
            dlq_depth = ?dead_letters,
            "queue reachable"
        );
        if dead_letters.is_some_and(|depth| depth > 0) {
            warn!(dlq_depth = ?dead_letters, "dead-letter queue is not empty");
        }
        Ok((health, dead_letters))
    }

    /// Poll once and process everything received.
    pub async fn run_cycle(&self) -> Result<CycleReport, ValidationError> {
        let messages = self.consumer.poll_batch(self.batch_size).await?;
        let mut report = CycleReport {
            received: messages.len(),
            ..CycleReport::default()
        };

        for message in &messages {
            match self.process(message).await {
                Outcome::Published(count) => {
                    report.validated += 1;
                    report.published += count;
                }
                Outcome::Rejected => report.rejected += 1,
                Outcome::Failed => report.failed += 1,
            }
        }
        Ok(report)
    }

    async fn process(&self, message: &QueueMessage) -> Outcome {
        let results = match self.validator.validate(&message.body).await {
            Ok(results) => results,
            Err(e) if e.code().is_transient() => {
                warn!(
                    message_id = %message.id,
                    attempt = message.attempt_count,
                    code = %e.code(),
                    error = %e,
                    "validation interrupted by an external failure, leaving event for redelivery"
                );
                self.nack(message).await;
                return Outcome::Failed;
            }
            Err(e) => {
                error!(
                    message_id = %message.id,
                    code = %e.code(),
                    error = %e,
                    "event cannot be validated, dropping"
                );
                self.ack(message).await;
                return Outcome::Rejected;
            }
        };

        let serialized: Result<Vec<String>, _> = results.iter().map(|r| r.to_json()).collect();
        let serialized = match serialized {
            Ok(serialized) => serialized,
            Err(e) => {
                error!(message_id = %message.id, error = %e, "failed to serialize validation results");
                self.nack(message).await;
                return Outcome::Failed;
            }
        };

        let invalid = results.iter().filter(|r| !r.is_valid()).count();
        debug!(
            message_id = %message.id,
            results = results.len(),
            invalid,
            "event validated"
        );

        match self.publisher.publish(&serialized).await {
            Ok(()) => {
                self.ack(message).await;
                Outcome::Published(serialized.len())
            }
            Err(e) => {
                warn!(
                    message_id = %message.id,
                    attempt = message.attempt_count,
                    code = %e.code(),
                    "results not published, leaving event for redelivery"
                );
                self.nack(message).await;
                Outcome::Failed
            }
        }
    }

    async fn ack(&self, message: &QueueMessage) {
        if let Err(e) = self.consumer.ack(&message.receipt_handle).await {
            warn!(message_id = %message.id, error = %e, "failed to ack message");
        }
    }

    async fn nack(&self, message: &QueueMessage) {
        if let Err(e) = self.consumer.nack(&message.receipt_handle).await {
            warn!(message_id = %message.id, error = %e, "failed to nack message");
        }
    }

    /// Run cycles until `shutdown` is notified.
    ///
    /// A cycle in progress always completes; the notification is observed
    /// between cycles.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        info!(
            batch_size = self.batch_size,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "validation service started"
        );

        loop {
            match self.run_cycle().await {
                Ok(report) if report.received > 0 => info!(
                    received = report.received,
                    validated = report.validated,
                    published = report.published,
                    rejected = report.rejected,
                    failed = report.failed,
                    "poll cycle complete"
                ),
                Ok(_) => {}
                Err(e) => warn!(code = %e.code(), error = %e, "queue poll failed"),
            }

            tokio::select! {
                _ = shutdown.notified() => {
                    info!("validation service shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}
