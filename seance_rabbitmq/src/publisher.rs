use crate::{Connector, Egress};
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions, QueueDeclareOptions};
use lapin::protocol::basic::AMQPProperties;
use lapin::types::FieldTable;
use lapin::{Channel, Error as LapinError, ExchangeKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{error, info};

/// Represents an **outgoing** RabbitMQ message: the encoded payload bytes, the
/// AMQP properties, and an optional per-dispatch routing key that overrides
/// the egress-level one.
#[derive(Debug)]
pub struct Dispatch {
    bytes: Vec<u8>,
    properties: AMQPProperties,
    routing_key: Option<String>,
}

/// Allows building an outgoing [`Dispatch`] iteratively.
#[derive(Debug)]
pub struct DispatchBuilder {
    bytes: Vec<u8>,
    properties: AMQPProperties,
    routing_key: Option<String>,
}

/// Publishes outgoing [`Dispatch`]es to the RabbitMQ cluster over a single
/// channel.
///
/// Publishing is fire-and-forget at the transport level: the payload is
/// transmitted to the broker without publisher confirms. The fallible
/// [`try_publish`](Publisher::try_publish) surfaces transmission errors; the
/// error-less [`publish`](Publisher::publish) logs them and moves on, which is
/// the policy the coordinating agent applies to replies and broadcasts.
pub struct Publisher {
    /// The globally unique name of this publisher, for logging purposes.
    name: Arc<str>,
    /// The [`Egress`] used by this publisher to route outgoing dispatches.
    egress: Egress,
    /// The channel this publisher transmits on.
    channel: Channel,
}

/// Represents a failure to transmit an outgoing message to the broker.
#[derive(Error, Debug)]
#[error("failed to publish a RabbitMQ message from '{publisher}': {source}")]
pub struct PublishingError {
    publisher: String,
    source: LapinError,
}

impl Dispatch {
    /// Creates a new [`DispatchBuilder`].
    pub fn builder() -> DispatchBuilder {
        DispatchBuilder::new()
    }

    /// Shorthand for creating a builder whose payload is the given value
    /// serialized as JSON, with the content type set accordingly.
    pub fn json<P>(payload: &P) -> Result<DispatchBuilder, serde_json::Error>
    where
        P: serde::Serialize,
    {
        let bytes = serde_json::to_vec(payload)?;

        Ok(Self::builder()
            .with_bytes(bytes)
            .with_content_type("application/json"))
    }
}

impl Dispatch {
    /// Exposes the encoded content of this message.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Exposes the properties of this message.
    pub fn properties(&self) -> &AMQPProperties {
        &self.properties
    }

    /// Exposes the routing key override of this message, if any.
    pub fn routing_key(&self) -> Option<&str> {
        self.routing_key.as_deref()
    }
}

impl DispatchBuilder {
    /// Creates a new [`Dispatch`] builder.
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            properties: AMQPProperties::default(),
            routing_key: None,
        }
    }

    /// Sets the payload of this dispatch to the given bytes.
    pub fn with_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.bytes = bytes;

        self
    }

    /// Sets the content type in the AMQP properties of this dispatch.
    pub fn with_content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.properties = self.properties.with_content_type(content_type.as_ref().into());

        self
    }

    /// Sets the correlation ID in the AMQP properties of this dispatch.
    pub fn with_correlation_id(mut self, correlation_id: impl AsRef<str>) -> Self {
        self.properties = self
            .properties
            .with_correlation_id(correlation_id.as_ref().into());

        self
    }

    /// Sets the `reply_to` value in the AMQP properties of this dispatch.
    pub fn with_reply_to(mut self, reply_to: impl AsRef<str>) -> Self {
        self.properties = self.properties.with_reply_to(reply_to.as_ref().into());

        self
    }

    /// Sets a routing key just for this dispatch, overriding the egress-level
    /// routing key.
    pub fn with_routing_key(mut self, routing_key: impl AsRef<str>) -> Self {
        self.routing_key = Some(routing_key.as_ref().to_string());

        self
    }

    /// Finalizes and returns the [`Dispatch`].
    pub fn build(self) -> Dispatch {
        Dispatch {
            bytes: self.bytes,
            properties: self.properties,
            routing_key: self.routing_key,
        }
    }
}

impl Default for DispatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher {
    /// Creates a fresh channel on the given [`Connector`] and opens a
    /// publisher for the given [`Egress`] on it.
    pub async fn open(connector: &Connector, egress: Egress) -> Result<Self, LapinError> {
        let channel = connector.channel().await?;

        Self::on_channel(channel, egress).await
    }

    /// Opens a publisher for the given [`Egress`] on the given, already
    /// minted [`Channel`].
    ///
    /// This allows several publishers to share one channel owned by a single
    /// task, keeping their publishes serialized.
    pub async fn on_channel(channel: Channel, egress: Egress) -> Result<Self, LapinError> {
        let name = Self::compose_name(&egress);

        // Declare the target exchange when the egress asks for it
        if egress.declare_exchange() {
            channel
                .exchange_declare(
                    egress.exchange(),
                    ExchangeKind::Direct,
                    ExchangeDeclareOptions::default(),
                    FieldTable::default(),
                )
                .await?;
        }

        // Declare the target queue when the egress asks for it, so publishing
        // may begin before any consumer has declared its end
        if egress.declare_queue() {
            channel
                .queue_declare(
                    egress.routing_key(),
                    QueueDeclareOptions {
                        durable: true,
                        ..QueueDeclareOptions::default()
                    },
                    FieldTable::default(),
                )
                .await?;
        }

        info!(
            publisher = name.as_ref(),
            exchange = egress.exchange(),
            routing_key = egress.routing_key(),
            "Publishing to RabbitMQ",
        );

        Ok(Self {
            name,
            egress,
            channel,
        })
    }

    /// Composes a globally unique, human-readable name for this publisher.
    fn compose_name(egress: &Egress) -> Arc<str> {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        Arc::from(format!(
            "rabbitmq:pub:{}:{}",
            egress.name(),
            COUNTER.fetch_add(1, Ordering::Relaxed),
        ))
    }
}

impl Publisher {
    /// Reports the name of this publisher.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attempts once to transmit the given [`Dispatch`] and surfaces any
    /// transmission error to the caller.
    pub async fn try_publish(&self, dispatch: Dispatch) -> Result<(), PublishingError> {
        let routing_key = dispatch
            .routing_key()
            .unwrap_or_else(|| self.egress.routing_key());

        self.channel
            .basic_publish(
                self.egress.exchange(),
                routing_key,
                BasicPublishOptions::default(),
                dispatch.bytes(),
                dispatch.properties().clone(),
            )
            .await
            .map_err(|source| PublishingError {
                publisher: self.name.to_string(),
                source,
            })?;

        Ok(())
    }

    /// Transmits the given [`Dispatch`], logging and swallowing any
    /// transmission error.
    ///
    /// A dropped publish manifests as a client-side timeout at the asker,
    /// which retries; the store state is already committed by then.
    pub async fn publish(&self, dispatch: Dispatch) {
        let byte_preview = String::from_utf8_lossy(dispatch.bytes()).into_owned();

        if let Err(error) = self.try_publish(dispatch).await {
            error!(
                publisher = self.name.as_ref(),
                ?error,
                error_message = %error,
                byte_preview = byte_preview.as_str(),
                "Failed to publish a message to RabbitMQ",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Probe {
        question: String,
    }

    #[test]
    fn builder_sets_properties() {
        // When
        let dispatch = Dispatch::builder()
            .with_bytes(b"{}".to_vec())
            .with_content_type("application/json")
            .with_correlation_id("c1")
            .with_reply_to("q.a1")
            .with_routing_key("q.a1")
            .build();

        // Then
        assert_eq!(dispatch.bytes(), b"{}");
        assert_eq!(dispatch.routing_key(), Some("q.a1"));
        assert_eq!(
            dispatch
                .properties()
                .correlation_id()
                .as_ref()
                .map(|value| value.as_str()),
            Some("c1"),
        );
        assert_eq!(
            dispatch
                .properties()
                .reply_to()
                .as_ref()
                .map(|value| value.as_str()),
            Some("q.a1"),
        );
    }

    #[test]
    fn json_dispatch_serializes_payload() {
        // Given
        let payload = Probe {
            question: "foo".to_string(),
        };

        // When
        let dispatch = Dispatch::json(&payload).unwrap().build();

        // Then
        assert_eq!(dispatch.bytes(), br#"{"question":"foo"}"#);
        assert_eq!(
            dispatch
                .properties()
                .content_type()
                .as_ref()
                .map(|value| value.as_str()),
            Some("application/json"),
        );
    }

    #[test]
    fn dispatch_without_override_defers_to_egress_key() {
        // When
        let dispatch = Dispatch::builder().with_bytes(b"{}".to_vec()).build();

        // Then
        assert_eq!(dispatch.routing_key(), None);
    }
}
