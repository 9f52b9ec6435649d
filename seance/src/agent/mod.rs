use crate::AppConfig;
use clap::ValueEnum;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Exposes the asker agent.
mod asker;
pub use self::asker::Asker;

/// Exposes the brainer agent.
mod brainer;
pub use self::brainer::Brainer;

/// Exposes the memory agent and its coordinating core.
pub mod memory;
pub use self::memory::Memory;

/// The role a seance process instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Submits questions on behalf of an end user.
    Asker,
    /// The deduplicating, caching relay between askers and brainers.
    Memory,
    /// Provides human answers to forwarded questions.
    Brainer,
}

/// Represents a fatal agent failure: anything that aborts initialization, or
/// a lost connection at runtime. Per-message failures are never surfaced
/// through this type; they are logged and absorbed where they occur.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Failed to connect to RabbitMQ.
    #[error(transparent)]
    BusConnect(#[from] seance_rabbitmq::ConnectError),
    /// Failed to declare the bus topology.
    #[error(transparent)]
    Declaration(#[from] seance_rabbitmq::DeclarationError),
    /// A RabbitMQ channel operation failed.
    #[error("RabbitMQ channel operation failed: {0}")]
    Channel(#[from] lapin::Error),
    /// The question store failed.
    #[error(transparent)]
    Store(#[from] seance_mongo::StoreError),
    /// A consumer stream ended, meaning the bus connection is gone.
    #[error("the RabbitMQ connection was lost")]
    ConnectionLost,
    /// Terminal input could not be read.
    #[error("terminal input failed: {0}")]
    Stdin(#[from] std::io::Error),
    /// One of the agent's tasks panicked or was aborted.
    #[error("an agent task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Asker => f.write_str("asker"),
            Role::Memory => f.write_str("memory"),
            Role::Brainer => f.write_str("brainer"),
        }
    }
}

/// Launches the agent for the given [`Role`] and runs it to completion.
pub async fn run(role: Role, config: &AppConfig) -> Result<(), AgentError> {
    match role {
        Role::Asker => Asker::run(config).await,
        Role::Memory => Memory::run(config).await,
        Role::Brainer => Brainer::run(config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn role_deserializes_from_lowercase() {
        assert_eq!(serde_yml::from_str::<Role>("asker").unwrap(), Role::Asker);
        assert_eq!(serde_yml::from_str::<Role>("memory").unwrap(), Role::Memory);
        assert_eq!(
            serde_yml::from_str::<Role>("brainer").unwrap(),
            Role::Brainer,
        );
    }

    #[test]
    fn role_displays_its_config_spelling() {
        assert_eq!(Role::Memory.to_string(), "memory");
    }
}
