use crate::repository::StoreError;
use crate::{Handle, QuestionRecord};
use mongodb::{Client, Collection};
use std::sync::Arc;
use tracing::info;

/// Owns a client for the MongoDB deployment identified by a [`Handle`] and
/// hands out the question [`Collection`].
///
/// There is no reconnection logic beyond what the driver does internally:
/// a deployment that stays unreachable surfaces as operation errors, and the
/// agent is expected to terminate and be restarted by its supervisor. The
/// client is shut down explicitly via [`close`](Connector::close) during the
/// agent's shutdown sequence.
pub struct Connector {
    /// The identifier of this connector's [`Handle`], for logging purposes.
    identifier: Arc<str>,
    /// The underlying driver client.
    client: Client,
    /// The handle this connector was opened with.
    handle: Handle,
}

impl Connector {
    /// Creates a client for the MongoDB deployment behind the given
    /// [`Handle`].
    ///
    /// The driver connects lazily; an unreachable deployment surfaces on the
    /// first operation (typically the index bootstrap), which the agents
    /// treat as a fatal initialization error.
    pub async fn connect(handle: impl AsRef<Handle>) -> Result<Self, StoreError> {
        let handle = handle.as_ref().clone();
        let identifier: Arc<str> = Arc::from(handle.identifier());

        let client = Client::with_uri_str(handle.dsn().unsecure()).await?;

        info!(
            identifier = identifier.as_ref(),
            "Opened a MongoDB client",
        );

        Ok(Self {
            identifier,
            client,
            handle,
        })
    }

    /// Reports the identifier of this connector's [`Handle`].
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Exposes the question collection.
    pub fn collection(&self) -> Collection<QuestionRecord> {
        self.client
            .database(self.handle.database())
            .collection(self.handle.collection())
    }

    /// Shuts down the underlying client, consuming this connector.
    pub async fn close(self) {
        self.client.shutdown().await;

        info!(
            identifier = self.identifier.as_ref(),
            "Closed the MongoDB client",
        );
    }
}
