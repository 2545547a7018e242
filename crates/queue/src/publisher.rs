//! Publishes serialized results to every configured channel.
//!
//! Per channel, one attempt is: open a handle, send the batch, close the
//! handle. An attempt succeeds only when every message was acknowledged and
//! the close reported nothing unsent. Failed attempts are repeated with the
//! whole batch until the retry budget runs out. Channels are independent:
//! one failing channel never stops delivery to the others.

use tracing::{debug, error, info, warn};
use validus_core::config::PublisherConfig;

use crate::channel::OutputChannel;
use crate::error::PublishError;

pub struct ResultPublisher {
    channels: Vec<Box<dyn OutputChannel>>,
    config: PublisherConfig,
}

impl ResultPublisher {
    pub fn new(channels: Vec<Box<dyn OutputChannel>>, config: PublisherConfig) -> Self {
        Self { channels, config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Publish one batch to all channels.
    ///
    /// Every channel is attempted. The first channel failure is returned;
    /// later ones are only logged.
    pub async fn publish(&self, results: &[String]) -> Result<(), PublishError> {
        if !self.config.enabled {
            debug!(messages = results.len(), "publishing disabled, dropping results");
            return Ok(());
        }
        if results.is_empty() {
            return Ok(());
        }

        let mut first_error = None;
        for channel in &self.channels {
            match self.publish_to(channel.as_ref(), results, self.config.retries).await {
                Ok(()) => info!(
                    channel = channel.name(),
                    messages = results.len(),
                    "results published"
                ),
                Err(e) => {
                    error!(
                        channel = channel.name(),
                        code = %e.code(),
                        unsent = e.unsent().len(),
                        error = %e,
                        "publishing failed after all retries"
                    );
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn publish_to(
        &self,
        channel: &dyn OutputChannel,
        batch: &[String],
        retries: u32,
    ) -> Result<(), PublishError> {
        let mut remaining = retries;
        loop {
            match attempt(channel, batch).await {
                Ok(()) => return Ok(()),
                Err(e) if remaining > 0 => {
                    warn!(
                        channel = channel.name(),
                        remaining,
                        error = %e,
                        "publish attempt failed, retrying"
                    );
                    remaining -= 1;
                    let delay = self.config.retry_delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// One open → send → close cycle against a fresh handle.
async fn attempt(channel: &dyn OutputChannel, batch: &[String]) -> Result<(), PublishError> {
    let name = channel.name();
    let mut handle = channel.open().await.map_err(|source| PublishError::Open {
        channel: name.to_string(),
        source,
    })?;

    let sent = handle.send(batch).await;
    let closed = handle.close().await;

    let acknowledged = match sent {
        Ok(n) => n,
        Err(source) => {
            return Err(PublishError::Send {
                channel: name.to_string(),
                source,
                unsent: closed.unwrap_or_else(|_| batch.to_vec()),
            })
        }
    };
    let unsent = closed.map_err(|source| PublishError::Send {
        channel: name.to_string(),
        source,
        unsent: Vec::new(),
    })?;

    if acknowledged != batch.len() {
        let unsent = if unsent.is_empty() {
            batch.get(acknowledged..).map(<[String]>::to_vec).unwrap_or_default()
        } else {
            unsent
        };
        return Err(PublishError::IncorrectMessageCount {
            channel: name.to_string(),
            expected: batch.len(),
            acknowledged,
            unsent,
        });
    }
    if !unsent.is_empty() {
        return Err(PublishError::Unsent {
            channel: name.to_string(),
            unsent,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use validus_core::error::ErrorCode;

    use super::*;
    use crate::channel::ChannelHandle;
    use crate::error::ChannelError;

    #[derive(Clone, Copy)]
    enum Behavior {
        AckAll,
        AckOneLess,
        UnsentOnClose,
        FailSend,
        FailOpen,
        /// Fail this many sends, then acknowledge everything.
        FailFirst(usize),
    }

    #[derive(Default)]
    struct Counters {
        opens: AtomicUsize,
        sends: AtomicUsize,
        closes: AtomicUsize,
    }

    struct MockChannel {
        name: String,
        behavior: Behavior,
        counters: Arc<Counters>,
    }

    impl MockChannel {
        fn boxed(name: &str, behavior: Behavior) -> (Box<dyn OutputChannel>, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            let channel = MockChannel {
                name: name.to_string(),
                behavior,
                counters: Arc::clone(&counters),
            };
            (Box::new(channel), counters)
        }
    }

    struct MockHandle {
        behavior: Behavior,
        counters: Arc<Counters>,
        pending: Vec<String>,
    }

    #[async_trait]
    impl OutputChannel for MockChannel {
        fn name(&self) -> &str {
            &self.name
        }

        async fn open(&self) -> Result<Box<dyn ChannelHandle>, ChannelError> {
            self.counters.opens.fetch_add(1, Ordering::SeqCst);
            if matches!(self.behavior, Behavior::FailOpen) {
                return Err(ChannelError::Open("broker down".into()));
            }
            Ok(Box::new(MockHandle {
                behavior: self.behavior,
                counters: Arc::clone(&self.counters),
                pending: Vec::new(),
            }))
        }
    }

    #[async_trait]
    impl ChannelHandle for MockHandle {
        async fn send(&mut self, batch: &[String]) -> Result<usize, ChannelError> {
            let previous = self.counters.sends.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::AckAll | Behavior::FailOpen => Ok(batch.len()),
                Behavior::AckOneLess => Ok(batch.len() - 1),
                Behavior::UnsentOnClose => {
                    self.pending = batch[..1].to_vec();
                    Ok(batch.len())
                }
                Behavior::FailSend => Err(ChannelError::Send("connection reset".into())),
                Behavior::FailFirst(n) if previous < n => {
                    Err(ChannelError::Send("connection reset".into()))
                }
                Behavior::FailFirst(_) => Ok(batch.len()),
            }
        }

        async fn close(&mut self) -> Result<Vec<String>, ChannelError> {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
            Ok(std::mem::take(&mut self.pending))
        }
    }

    fn config(retries: u32) -> PublisherConfig {
        PublisherConfig {
            enabled: true,
            retries,
            retry_delay_ms: 0,
        }
    }

    fn batch() -> Vec<String> {
        vec![r#"{"a":1}"#.to_string(), r#"{"b":2}"#.to_string()]
    }

    #[tokio::test]
    async fn short_acks_exhaust_retries() {
        let (channel, counters) = MockChannel::boxed("results", Behavior::AckOneLess);
        let publisher = ResultPublisher::new(vec![channel], config(2));

        let err = publisher.publish(&batch()).await.unwrap_err();

        assert_eq!(counters.sends.load(Ordering::SeqCst), 3);
        assert_eq!(counters.opens.load(Ordering::SeqCst), 3);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 3);
        assert_eq!(err.code(), ErrorCode::IncorrectMessageCount);
        match err {
            PublishError::IncorrectMessageCount {
                channel,
                expected,
                acknowledged,
                unsent,
            } => {
                assert_eq!(channel, "results");
                assert_eq!(expected, 2);
                assert_eq!(acknowledged, 1);
                assert_eq!(unsent, vec![r#"{"b":2}"#.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn full_ack_sends_once() {
        let (channel, counters) = MockChannel::boxed("results", Behavior::AckAll);
        let publisher = ResultPublisher::new(vec![channel], config(3));

        publisher.publish(&batch()).await.unwrap();

        assert_eq!(counters.sends.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsent_after_close_is_a_failure() {
        let (channel, counters) = MockChannel::boxed("results", Behavior::UnsentOnClose);
        let publisher = ResultPublisher::new(vec![channel], config(1));

        let err = publisher.publish(&batch()).await.unwrap_err();

        assert_eq!(counters.sends.load(Ordering::SeqCst), 2);
        assert_eq!(err.code(), ErrorCode::MessagesUnsent);
        assert_eq!(err.unsent(), &[r#"{"a":1}"#.to_string()]);
    }

    #[tokio::test]
    async fn send_errors_are_retried_until_success() {
        let (channel, counters) = MockChannel::boxed("results", Behavior::FailFirst(2));
        let publisher = ResultPublisher::new(vec![channel], config(3));

        publisher.publish(&batch()).await.unwrap();

        assert_eq!(counters.sends.load(Ordering::SeqCst), 3);
        assert_eq!(counters.opens.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let (channel, counters) = MockChannel::boxed("results", Behavior::FailSend);
        let publisher = ResultPublisher::new(vec![channel], config(0));

        let err = publisher.publish(&batch()).await.unwrap_err();

        assert_eq!(counters.sends.load(Ordering::SeqCst), 1);
        assert_eq!(err.code(), ErrorCode::PublishFailed);
    }

    #[tokio::test]
    async fn open_failure_is_reported() {
        let (channel, counters) = MockChannel::boxed("results", Behavior::FailOpen);
        let publisher = ResultPublisher::new(vec![channel], config(1));

        let err = publisher.publish(&batch()).await.unwrap_err();

        assert_eq!(counters.opens.load(Ordering::SeqCst), 2);
        assert_eq!(counters.sends.load(Ordering::SeqCst), 0);
        assert_eq!(err.code(), ErrorCode::ChannelUnavailable);
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_others() {
        let (broken, broken_counters) = MockChannel::boxed("broken", Behavior::FailSend);
        let (healthy, healthy_counters) = MockChannel::boxed("healthy", Behavior::AckAll);
        let (late, late_counters) = MockChannel::boxed("late", Behavior::AckOneLess);
        let publisher = ResultPublisher::new(vec![broken, healthy, late], config(1));

        let err = publisher.publish(&batch()).await.unwrap_err();

        assert_eq!(err.channel(), "broken");
        assert_eq!(broken_counters.sends.load(Ordering::SeqCst), 2);
        assert_eq!(healthy_counters.sends.load(Ordering::SeqCst), 1);
        assert_eq!(late_counters.sends.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_publisher_sends_nothing() {
        let (channel, counters) = MockChannel::boxed("results", Behavior::AckAll);
        let publisher = ResultPublisher::new(
            vec![channel],
            PublisherConfig {
                enabled: false,
                ..config(3)
            },
        );

        publisher.publish(&batch()).await.unwrap();

        assert!(!publisher.is_enabled());
        assert_eq!(counters.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_delay_is_applied_between_attempts() {
        let (channel, counters) = MockChannel::boxed("results", Behavior::FailFirst(2));
        let publisher = ResultPublisher::new(
            vec![channel],
            PublisherConfig {
                retry_delay_ms: 250,
                ..config(2)
            },
        );

        let started = tokio::time::Instant::now();
        publisher.publish(&batch()).await.unwrap();

        assert_eq!(counters.sends.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
