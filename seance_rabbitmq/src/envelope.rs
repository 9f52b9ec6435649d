use lapin::Error as LapinError;
use lapin::acker::Acker;
use lapin::options::BasicAckOptions;
use lapin::protocol::basic::AMQPProperties;
use std::sync::Arc;

/// Represents an **incoming** RabbitMQ message: the decoded payload together
/// with the original AMQP properties and the acker of the underlying delivery.
///
/// Acknowledgement is always manual: the consuming component calls
/// [`ack`](Envelope::ack) once the message is safely handed off. An envelope
/// dropped without acking is redelivered by the broker.
#[derive(Debug)]
pub struct Envelope<T> {
    /// The name of the subscriber that received this message.
    subscriber: Arc<str>,
    /// The original properties.
    properties: AMQPProperties,
    /// The acker associated with the underlying delivery.
    acker: Acker,
    /// The decoded content of the underlying message.
    payload: T,
}

impl<T> Envelope<T> {
    /// Internal constructor.
    pub(crate) fn new(
        subscriber: Arc<str>,
        properties: AMQPProperties,
        acker: Acker,
        payload: T,
    ) -> Self {
        Self {
            subscriber,
            properties,
            acker,
            payload,
        }
    }

    /// Reports the name of the subscriber that received this message.
    pub fn subscriber(&self) -> &str {
        &self.subscriber
    }

    /// Exposes the decoded payload of this message.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Consumes this envelope, returning the decoded payload.
    ///
    /// The underlying delivery must have been [acked](Envelope::ack) first;
    /// destructing an un-acked envelope forfeits the acker and leaves the
    /// message to be redelivered.
    pub fn into_payload(self) -> T {
        self.payload
    }

    /// Extracts the `reply_to` property of the underlying delivery, if
    /// present and non-empty.
    pub fn reply_to(&self) -> Option<&str> {
        self.properties
            .reply_to()
            .as_ref()
            .map(|value| value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Extracts the `correlation_id` property of the underlying delivery, if
    /// present and non-empty.
    pub fn correlation_id(&self) -> Option<&str> {
        self.properties
            .correlation_id()
            .as_ref()
            .map(|value| value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Positively acknowledges the underlying delivery with the broker.
    pub async fn ack(&self) -> Result<(), LapinError> {
        self.acker.ack(BasicAckOptions::default()).await
    }
}
