//! Inbound event source.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// One entity-change event as delivered by the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: String,
    /// Event payload, passed to the validator untouched.
    pub body: String,
    /// Token for ack/nack (the SQS receipt handle).
    pub receipt_handle: String,
    pub timestamp: DateTime<Utc>,
    /// Deliveries so far, including this one.
    pub attempt_count: u32,
}

/// Reachability and backlog of the inbound queue.
#[derive(Debug, Clone, Serialize)]
pub struct QueueHealth {
    pub connected: bool,
    pub approximate_message_count: Option<u64>,
    pub provider: String,
}

impl fmt::Display for QueueHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.connected { "connected" } else { "disconnected" };
        match self.approximate_message_count {
            Some(count) => write!(f, "{} {} ({} waiting)", self.provider, state, count),
            None => write!(f, "{} {}", self.provider, state),
        }
    }
}

/// Source of inbound entity-change events.
///
/// A message is acked once its results were published (or it can never be
/// validated) and nacked otherwise, so the provider redelivers it.
#[async_trait]
pub trait QueueConsumer: Send + Sync {
    /// Up to `max_messages` events; empty when nothing arrived before the
    /// provider's long-poll wait ran out.
    async fn poll_batch(&self, max_messages: u32) -> Result<Vec<QueueMessage>, QueueError>;

    /// Delete the event from the queue.
    async fn ack(&self, receipt_handle: &str) -> Result<(), QueueError>;

    /// Make the event visible again right away.
    async fn nack(&self, receipt_handle: &str) -> Result<(), QueueError>;

    async fn health_check(&self) -> Result<QueueHealth, QueueError>;

    /// Events parked in the dead-letter queue; `None` when there is none.
    async fn dlq_depth(&self) -> Result<Option<u64>, QueueError> {
        Ok(None)
    }
}
