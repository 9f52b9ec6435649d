use crate::{Connector, Decoder, Envelope, Ingress, JsonDecoder};
use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicQosOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{
    Channel, Consumer as LapinConsumer, Error as LapinError, ExchangeKind,
    Result as LapinResult,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{error, info, warn};

/// Shorthand for a [`Subscriber`] that decodes messages as JSON into `T`.
pub type JsonSubscriber<T> = Subscriber<T, JsonDecoder<T>>;

/// Receives incoming messages from the RabbitMQ cluster, passing each through
/// a pre-set [`Decoder`] before yielding it as an [`Envelope`].
///
/// Subscribing issues all declarations required by the [`Ingress`]: the
/// channel prefetch, the direct exchange (if any), the queue, and the binding.
/// Messages that fail to decode are logged, acknowledged, and dropped; the
/// agent is never crashed by gibberish.
pub struct Subscriber<T, D>
where
    D: Decoder<Result = T>,
{
    name: Arc<str>,
    queue_name: String,
    consumer: LapinConsumer,
    decoder: D,
}

/// Represents a failure to issue one of the declarations required before the
/// subscriber can start consuming messages (declaring an exchange, declaring
/// a queue, binding the queue, or starting the consumer).
#[derive(Error, Debug)]
#[error("failed to issue RabbitMQ declarations for subscriber '{subscriber}': {error}")]
pub struct DeclarationError {
    subscriber: String,
    error: String,
}

impl<T, D> Subscriber<T, D>
where
    D: Decoder<Result = T>,
{
    /// Creates a fresh channel on the given [`Connector`], issues the
    /// declarations required by the given [`Ingress`], and starts consuming
    /// with the given [`Decoder`].
    pub async fn subscribe(
        connector: &Connector,
        ingress: Ingress,
        decoder: D,
    ) -> Result<Self, DeclarationError> {
        let name = Self::compose_name(&ingress);

        // Mint a dedicated channel for this subscriber
        let channel = connector
            .channel()
            .await
            .map_err(|error| DeclarationError::new(name.as_ref(), error))?;

        // Issue declarations and start the consumer
        let (queue_name, consumer) = Self::start_consumer(&channel, &ingress, &name)
            .await
            .map_err(|error| DeclarationError::new(name.as_ref(), error))?;

        info!(
            subscriber = name.as_ref(),
            queue = queue_name.as_str(),
            "Consuming from RabbitMQ",
        );

        Ok(Self {
            name,
            queue_name,
            consumer,
            decoder,
        })
    }

    /// Composes a globally unique, human-readable name for this subscriber.
    fn compose_name(ingress: &Ingress) -> Arc<str> {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        Arc::from(format!(
            "rabbitmq:sub:{}:{}",
            ingress.name(),
            COUNTER.fetch_add(1, Ordering::Relaxed),
        ))
    }

    /// Declares the topology required by the given [`Ingress`] on the given
    /// [`Channel`] and starts a consumer on the declared queue.
    async fn start_consumer(
        channel: &Channel,
        ingress: &Ingress,
        name: &str,
    ) -> LapinResult<(String, LapinConsumer)> {
        // Set prefetch count on the channel if relevant
        if let Some(prefetch_count) = ingress.prefetch_count() {
            channel
                .basic_qos(prefetch_count, BasicQosOptions { global: false })
                .await?;
        }

        // If the ingress binds to an exchange, declare it first
        if let Some(exchange) = ingress.exchange() {
            channel
                .exchange_declare(
                    exchange,
                    ExchangeKind::Direct,
                    ExchangeDeclareOptions::default(),
                    FieldTable::default(),
                )
                .await?;
        }

        // Declare the queue
        let queue = channel
            .queue_declare(
                ingress.queue(),
                QueueDeclareOptions {
                    passive: false,
                    durable: ingress.durable(),
                    exclusive: ingress.exclusive(),
                    auto_delete: ingress.auto_delete(),
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await?;

        // Bind the queue to the exchange
        if let Some(exchange) = ingress.exchange() {
            channel
                .queue_bind(
                    queue.name().as_str(),
                    exchange,
                    ingress.binding_key(),
                    QueueBindOptions { nowait: false },
                    FieldTable::default(),
                )
                .await?;
        }

        // Initiate consuming of messages
        let consumer = channel
            .basic_consume(
                queue.name().as_str(),
                name,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok((queue.name().as_str().to_string(), consumer))
    }
}

impl<T> Subscriber<T, JsonDecoder<T>>
where
    T: serde::de::DeserializeOwned,
{
    /// A shorthand for calling [`subscribe`](Subscriber::subscribe) with a
    /// [`JsonDecoder`].
    pub async fn subscribe_json(
        connector: &Connector,
        ingress: Ingress,
    ) -> Result<Self, DeclarationError> {
        Self::subscribe(connector, ingress, JsonDecoder::default()).await
    }
}

impl<T, D> Subscriber<T, D>
where
    D: Decoder<Result = T>,
{
    /// Reports the name of this subscriber.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reports the name of the queue this subscriber consumes from. For a
    /// server-named queue this is the broker-assigned name, which is what an
    /// asker advertises as its `reply_to`.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Receives the next decodable message from the broker.
    ///
    /// Messages that fail to decode are acknowledged and dropped in place.
    /// Returns `None` once the consumer stream ends, which indicates that the
    /// underlying connection is gone; the caller is expected to treat this as
    /// fatal.
    pub async fn receive(&mut self) -> Option<Envelope<T>> {
        loop {
            // Fetch the next delivery
            let delivery = match self.consumer.next().await? {
                Ok(delivery) => delivery,
                Err(error) => {
                    warn!(
                        subscriber = self.name.as_ref(),
                        ?error,
                        error_message = %error,
                        "Received an error from a RabbitMQ consumer",
                    );

                    continue;
                }
            };

            // Attempt to decode it
            match self.decode_delivery(delivery).await {
                Some(envelope) => return Some(envelope),
                None => continue,
            }
        }
    }

    /// Decodes the given delivery into an [`Envelope`], or acknowledges and
    /// discards it if the payload is gibberish.
    async fn decode_delivery(&self, delivery: Delivery) -> Option<Envelope<T>> {
        let Delivery {
            properties,
            data: bytes,
            acker,
            ..
        } = delivery;

        match self.decoder.decode(&bytes) {
            Ok(payload) => Some(Envelope::new(
                self.name.clone(),
                properties,
                acker,
                payload,
            )),
            Err(error) => {
                error!(
                    subscriber = self.name.as_ref(),
                    ?error,
                    error_message = %error,
                    byte_preview = String::from_utf8_lossy(&bytes).as_ref(),
                    "Failed to decode an inbound RabbitMQ message",
                );

                self.discard_gibberish(acker).await;

                None
            }
        }
    }

    /// Acknowledges an un-decodable message so that the broker does not keep
    /// redelivering it.
    async fn discard_gibberish(&self, acker: lapin::acker::Acker) {
        if let Err(error) = acker.ack(BasicAckOptions::default()).await {
            warn!(
                subscriber = self.name.as_ref(),
                ?error,
                error_message = %error,
                "Failed to acknowledge an un-decodable RabbitMQ message",
            );
        }
    }
}

impl DeclarationError {
    fn new(subscriber: &str, error: LapinError) -> Self {
        Self {
            subscriber: subscriber.to_string(),
            error: error.to_string(),
        }
    }
}
