use crate::Handle;
use lapin::{Channel, Connection, ConnectionProperties, Error as LapinError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{info, warn};

/// Owns a single connection to a RabbitMQ cluster, identified by a [`Handle`],
/// and mints fresh [`Channel`]s on it.
///
/// There is no reconnection logic: once the connection is lost, every channel
/// operation starts failing and the agent is expected to terminate and be
/// restarted by its supervisor. The connection is closed explicitly via
/// [`close`](Connector::close) during the agent's shutdown sequence.
pub struct Connector {
    /// The globally unique name of this connector, for logging purposes.
    name: Arc<str>,
    /// The identifier of this connector's [`Handle`], for logging purposes.
    identifier: Arc<str>,
    /// The connection to the RabbitMQ cluster.
    connection: Connection,
}

/// Represents a failure to establish a connection to the RabbitMQ cluster.
#[derive(Error, Debug)]
#[error("failed to connect to RabbitMQ at '{identifier}': {source}")]
pub struct ConnectError {
    identifier: String,
    source: LapinError,
}

impl Connector {
    /// Establishes a connection to the RabbitMQ cluster behind the given
    /// [`Handle`], wiring the connection into the current tokio runtime.
    pub async fn connect(handle: impl AsRef<Handle>) -> Result<Self, ConnectError> {
        let handle = handle.as_ref();
        let name = Self::compose_name(handle);
        let identifier: Arc<str> = Arc::from(handle.identifier());

        // Set up the connection properties to use the current tokio context
        let connection_properties = ConnectionProperties::default()
            .with_executor(tokio_executor_trait::Tokio::current())
            .with_reactor(tokio_reactor_trait::Tokio);

        // Establish the connection
        let connection = Connection::connect(handle.dsn().unsecure(), connection_properties)
            .await
            .map_err(|source| ConnectError {
                identifier: identifier.to_string(),
                source,
            })?;

        info!(
            name = name.as_ref(),
            identifier = identifier.as_ref(),
            "Connected to RabbitMQ",
        );

        Ok(Self {
            name,
            identifier,
            connection,
        })
    }

    /// Composes a human-readable name for this connector.
    fn compose_name(handle: &Handle) -> Arc<str> {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        Arc::from(format!(
            "rabbitmq:connector:{}:{}",
            handle.name(),
            COUNTER.fetch_add(1, Ordering::Relaxed),
        ))
    }
}

impl Connector {
    /// Reports the name of this connector.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reports the identifier of this connector's [`Handle`].
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Creates a fresh [`Channel`] on the underlying connection.
    pub async fn channel(&self) -> Result<Channel, LapinError> {
        self.connection.create_channel().await
    }

    /// Closes the underlying connection, consuming this connector.
    pub async fn close(self) {
        let result = self.connection.close(0, "Agent shutting down").await;

        match result {
            Ok(()) => info!(
                name = self.name.as_ref(),
                identifier = self.identifier.as_ref(),
                "Closed the RabbitMQ connection",
            ),
            Err(LapinError::InvalidConnectionState(_)) => info!(
                name = self.name.as_ref(),
                identifier = self.identifier.as_ref(),
                "Discarded a previously lost RabbitMQ connection",
            ),
            Err(error) => warn!(
                name = self.name.as_ref(),
                identifier = self.identifier.as_ref(),
                ?error,
                error_message = %error,
                "Failed to cleanly close the RabbitMQ connection",
            ),
        }
    }
}
