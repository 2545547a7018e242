//! AWS SQS bindings: the inbound event consumer and outbound result channels.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_sqs::config::{BehaviorVersion, Region};
use aws_sdk_sqs::types::{MessageSystemAttributeName, QueueAttributeName, SendMessageBatchRequestEntry};
use aws_sdk_sqs::Client;
use chrono::{TimeZone, Utc};
use tracing::{debug, info, warn};
use validus_core::config::{AwsConfig, QueueConfig};

use crate::channel::{ChannelHandle, OutputChannel};
use crate::consumer::{QueueConsumer, QueueHealth, QueueMessage};
use crate::error::{ChannelError, QueueError};

/// SQS rejects batches larger than this.
const MAX_BATCH_ENTRIES: usize = 10;

/// Long-poll wait per receive call.
const WAIT_TIME_SECS: i32 = 20;

/// Build an SQS client from explicit settings.
///
/// The SDK's environment defaults are not consulted: `AWS_ENDPOINT_URL` may
/// point at another service.
pub fn build_client(aws: &AwsConfig) -> Client {
    let mut sqs_config = aws_sdk_sqs::Config::builder()
        .region(Region::new(aws.region.clone()))
        .behavior_version(BehaviorVersion::latest());

    if let (Some(key_id), Some(secret)) = (&aws.access_key_id, &aws.secret_access_key) {
        let creds = Credentials::new(
            key_id,
            secret,
            aws.session_token.clone(),
            None,
            "validus-queue-static",
        );
        sqs_config = sqs_config.credentials_provider(creds);
    }

    if let Some(endpoint) = aws.endpoint_url.as_deref().filter(|e| !e.is_empty()) {
        let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("https://{endpoint}")
        };
        sqs_config = sqs_config.endpoint_url(url);
    }

    Client::from_conf(sqs_config.build())
}

async fn approximate_depth(client: &Client, queue_url: &str) -> Result<Option<u64>, QueueError> {
    let resp = client
        .get_queue_attributes()
        .queue_url(queue_url)
        .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
        .send()
        .await
        .map_err(|e| QueueError::Connection(format!("SQS get attributes failed: {e:?}")))?;

    Ok(resp
        .attributes()
        .and_then(|attrs| attrs.get(&QueueAttributeName::ApproximateNumberOfMessages))
        .and_then(|v| v.parse::<u64>().ok()))
}

/// Inbound event queue.
pub struct SqsConsumer {
    client: Client,
    queue_url: String,
    dlq_url: Option<String>,
    visibility_timeout_secs: i32,
}

impl SqsConsumer {
    pub fn new(client: Client, queue: &QueueConfig) -> Result<Self, QueueError> {
        let queue_url = queue
            .queue_url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| QueueError::NotConfigured("QUEUE_URL".into()))?;

        info!(queue_url = %queue_url, "SQS consumer initialized");

        Ok(Self {
            client,
            queue_url,
            dlq_url: queue.dlq_url.clone(),
            visibility_timeout_secs: i32::try_from(queue.visibility_timeout_secs).unwrap_or(i32::MAX),
        })
    }

    pub fn from_config(aws: &AwsConfig, queue: &QueueConfig) -> Result<Self, QueueError> {
        Self::new(build_client(aws), queue)
    }
}

#[async_trait]
impl QueueConsumer for SqsConsumer {
    async fn poll_batch(&self, max_messages: u32) -> Result<Vec<QueueMessage>, QueueError> {
        let capped = max_messages.clamp(1, MAX_BATCH_ENTRIES as u32) as i32;
        debug!(max_messages = capped, "polling SQS");

        let resp = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(capped)
            .wait_time_seconds(WAIT_TIME_SECS)
            .visibility_timeout(self.visibility_timeout_secs)
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .send()
            .await
            .map_err(|e| QueueError::Connection(format!("SQS receive failed: {e:?}")))?;

        let received = resp.messages.unwrap_or_default();
        debug!(count = received.len(), "received SQS messages");

        let mut messages = Vec::with_capacity(received.len());
        for msg in received {
            let receipt_handle = msg
                .receipt_handle()
                .ok_or_else(|| QueueError::Parse("missing receipt handle".into()))?
                .to_string();
            let attribute = |name: &MessageSystemAttributeName| {
                msg.attributes().and_then(|attrs| attrs.get(name)).cloned()
            };

            // SentTimestamp is epoch millis.
            let timestamp = attribute(&MessageSystemAttributeName::SentTimestamp)
                .and_then(|ts| ts.parse::<i64>().ok())
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .unwrap_or_else(Utc::now);
            let attempt_count = attribute(&MessageSystemAttributeName::ApproximateReceiveCount)
                .and_then(|c| c.parse::<u32>().ok())
                .unwrap_or(1);

            messages.push(QueueMessage {
                id: msg.message_id().unwrap_or("unknown").to_string(),
                body: msg.body().unwrap_or_default().to_string(),
                receipt_handle,
                timestamp,
                attempt_count,
            });
        }

        Ok(messages)
    }

    async fn ack(&self, receipt_handle: &str) -> Result<(), QueueError> {
        debug!(receipt_handle, "acking SQS message");
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::Ack(format!("SQS delete failed: {e:?}")))?;
        Ok(())
    }

    async fn nack(&self, receipt_handle: &str) -> Result<(), QueueError> {
        debug!(receipt_handle, "nacking SQS message (visibility=0)");
        self.client
            .change_message_visibility()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(0)
            .send()
            .await
            .map_err(|e| QueueError::Provider(format!("SQS visibility change failed: {e:?}")))?;
        Ok(())
    }

    async fn health_check(&self) -> Result<QueueHealth, QueueError> {
        let count = approximate_depth(&self.client, &self.queue_url).await?;
        Ok(QueueHealth {
            connected: true,
            approximate_message_count: count,
            provider: "sqs".to_string(),
        })
    }

    async fn dlq_depth(&self) -> Result<Option<u64>, QueueError> {
        match &self.dlq_url {
            Some(url) => approximate_depth(&self.client, url).await,
            None => Ok(None),
        }
    }
}

/// Outbound results queue.
#[derive(Clone)]
pub struct SqsChannel {
    name: String,
    client: Client,
    queue_url: String,
}

impl SqsChannel {
    /// The channel is named after the last path segment of its queue URL.
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        let queue_url = queue_url.into();
        let name = queue_url
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or(queue_url.as_str())
            .to_string();
        Self {
            name,
            client,
            queue_url,
        }
    }

    /// One channel per configured output queue URL.
    pub fn from_config(client: &Client, queue: &QueueConfig) -> Vec<Self> {
        queue
            .output_queue_urls
            .iter()
            .map(|url| Self::new(client.clone(), url.as_str()))
            .collect()
    }
}

#[async_trait]
impl OutputChannel for SqsChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self) -> Result<Box<dyn ChannelHandle>, ChannelError> {
        Ok(Box::new(SqsHandle {
            client: self.client.clone(),
            queue_url: self.queue_url.clone(),
            failed: Vec::new(),
        }))
    }
}

/// Handle for one publish attempt; remembers entries SQS did not accept.
struct SqsHandle {
    client: Client,
    queue_url: String,
    failed: Vec<String>,
}

#[async_trait]
impl ChannelHandle for SqsHandle {
    async fn send(&mut self, batch: &[String]) -> Result<usize, ChannelError> {
        let mut acknowledged = 0;

        for (chunk_index, chunk) in batch.chunks(MAX_BATCH_ENTRIES).enumerate() {
            let mut entries = Vec::with_capacity(chunk.len());
            let mut by_id = HashMap::with_capacity(chunk.len());
            for (i, body) in chunk.iter().enumerate() {
                let id = format!("{}-{}", chunk_index, i);
                let entry = SendMessageBatchRequestEntry::builder()
                    .id(id.as_str())
                    .message_body(body.as_str())
                    .build()
                    .map_err(|e| ChannelError::Send(e.to_string()))?;
                entries.push(entry);
                by_id.insert(id, body);
            }

            let resp = match self
                .client
                .send_message_batch()
                .queue_url(&self.queue_url)
                .set_entries(Some(entries))
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    // This chunk and every later one stay unsent.
                    self.failed
                        .extend(batch.iter().skip(chunk_index * MAX_BATCH_ENTRIES).cloned());
                    return Err(ChannelError::Send(format!("SQS send batch failed: {e:?}")));
                }
            };

            acknowledged += resp.successful().len();
            for failure in resp.failed() {
                warn!(
                    queue_url = %self.queue_url,
                    code = failure.code(),
                    sender_fault = failure.sender_fault(),
                    "SQS rejected batch entry"
                );
                if let Some(body) = by_id.get(failure.id()) {
                    self.failed.push((*body).clone());
                }
            }
        }

        Ok(acknowledged)
    }

    async fn close(&mut self) -> Result<Vec<String>, ChannelError> {
        Ok(std::mem::take(&mut self.failed))
    }
}
