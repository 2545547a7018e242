//! Output channels for serialized validation results.
//!
//! A channel hands out short-lived handles. The publisher opens a fresh
//! handle for every attempt and always closes it, even after a failed send.

use async_trait::async_trait;

use crate::error::ChannelError;

/// A named destination that results are published to.
#[async_trait]
pub trait OutputChannel: Send + Sync {
    /// Stable name used in logs and errors.
    fn name(&self) -> &str;

    /// Open a new handle for one publish attempt.
    async fn open(&self) -> Result<Box<dyn ChannelHandle>, ChannelError>;
}

/// One publish attempt against a channel.
#[async_trait]
pub trait ChannelHandle: Send {
    /// Send the whole batch; returns how many messages were acknowledged.
    async fn send(&mut self, batch: &[String]) -> Result<usize, ChannelError>;

    /// Drain the handle and return every message that was not delivered.
    /// The handle must not be used afterwards.
    async fn close(&mut self) -> Result<Vec<String>, ChannelError>;
}
