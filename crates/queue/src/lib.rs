pub mod channel;
pub mod consumer;
pub mod error;
pub mod publisher;
pub mod sqs;

pub use channel::{ChannelHandle, OutputChannel};
pub use consumer::{QueueConsumer, QueueHealth, QueueMessage};
pub use error::{ChannelError, PublishError, QueueError};
pub use publisher::ResultPublisher;
pub use sqs::{SqsChannel, SqsConsumer};
