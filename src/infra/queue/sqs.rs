//! Amazon SQS queue backend.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;

use crate::core::{Ack, Message, QueueClient, RelayError, MAX_MESSAGES_PER_RECEIVE};

/// Region used when neither the configuration nor the AWS environment names one.
pub const DEFAULT_REGION: &str = "eu-west-1";

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const RECEIVE_BATCH: i32 = MAX_MESSAGES_PER_RECEIVE as i32;

/// Queue client for a single SQS queue URL.
///
/// Receives are short polls for at most one message. Nothing is ever deleted, so
/// a received message becomes visible again once its visibility timeout lapses.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    visibility_timeout_secs: Option<i32>,
}

impl SqsQueue {
    /// Build a client from the AWS environment.
    ///
    /// `region` overrides the environment's region; `endpoint_url` points the
    /// client at an SQS-compatible service instead of AWS. Credentials are
    /// resolved lazily on the first request.
    pub async fn connect(
        queue_url: impl Into<String>,
        region: Option<&str>,
        endpoint_url: Option<&str>,
        visibility_timeout: Duration,
    ) -> Self {
        let regions = match region {
            Some(region) => RegionProviderChain::first_try(Region::new(region.to_string())),
            None => RegionProviderChain::default_provider(),
        }
        .or_else(Region::new(DEFAULT_REGION));
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(regions)
            .load()
            .await;

        let mut config = aws_sdk_sqs::config::Builder::from(&shared);
        if let Some(endpoint_url) = endpoint_url {
            config = config.endpoint_url(endpoint_url);
        }
        Self::from_client(Client::from_conf(config.build()), queue_url, visibility_timeout)
    }

    /// Wrap an existing SDK client.
    pub fn from_client(client: Client, queue_url: impl Into<String>, visibility_timeout: Duration) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
            visibility_timeout_secs: i32::try_from(visibility_timeout.as_secs()).ok(),
        }
    }
}

/// Convert a delivered SQS message. A message without an id cannot be keyed.
fn to_message(delivered: &aws_sdk_sqs::types::Message) -> Result<Message, RelayError> {
    let id = delivered
        .message_id()
        .ok_or_else(|| RelayError::QueueReceive("delivered message has no id".into()))?;
    Ok(Message::new(id, delivered.body().unwrap_or_default()))
}

#[async_trait]
impl QueueClient for SqsQueue {
    async fn send(&self, body: &str) -> Result<Ack, RelayError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| RelayError::QueueSend(DisplayErrorContext(&e).to_string()))?;
        Ok(Ack {
            message_id: output.message_id().unwrap_or_default().to_string(),
        })
    }

    async fn receive(&self) -> Result<Option<Message>, RelayError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(RECEIVE_BATCH)
            .set_visibility_timeout(self.visibility_timeout_secs)
            .send()
            .await
            .map_err(|e| RelayError::QueueReceive(DisplayErrorContext(&e).to_string()))?;
        output.messages().first().map(to_message).transpose()
    }

    fn endpoint(&self) -> &str {
        &self.queue_url
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_sqs::types::Message as SqsMessage;

    use super::*;

    #[test]
    fn test_delivered_message_keeps_id_and_body() {
        let delivered = SqsMessage::builder().message_id("123").body("Hello").build();
        assert_eq!(to_message(&delivered).unwrap(), Message::new("123", "Hello"));
    }

    #[test]
    fn test_delivered_message_without_body_is_empty() {
        let delivered = SqsMessage::builder().message_id("123").build();
        assert_eq!(to_message(&delivered).unwrap().body, "");
    }

    #[test]
    fn test_delivered_message_without_id_is_a_receive_error() {
        let delivered = SqsMessage::builder().body("Hello").build();
        assert!(matches!(to_message(&delivered), Err(RelayError::QueueReceive(_))));
    }

    #[test]
    fn test_receive_requests_a_single_message() {
        assert_eq!(RECEIVE_BATCH, 1);
    }

    #[tokio::test]
    async fn test_connect_uses_configured_region_and_url() {
        let queue = SqsQueue::connect(
            "https://sqs.eu-west-1.amazonaws.com/000000000000/relay",
            Some("eu-west-1"),
            Some("http://localhost:9324"),
            Duration::from_secs(30),
        )
        .await;

        assert_eq!(queue.endpoint(), "https://sqs.eu-west-1.amazonaws.com/000000000000/relay");
        assert_eq!(queue.visibility_timeout_secs, Some(30));
        assert_eq!(
            queue.client.config().region().map(ToString::to_string).as_deref(),
            Some("eu-west-1")
        );
    }
}
