use crate::Role;
use crate::telemetry::TelemetryConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// The application-level configuration of a seance agent, assembled from the
/// configuration file named on the command line plus `SEANCE`-prefixed
/// environment variable overrides (e.g. `SEANCE_RABBITMQ__HOST`).
///
/// Every section falls back to sensible local-development defaults, so an
/// empty file is a valid configuration for a fabric running on localhost.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// The role to launch when no `--role` flag is given.
    pub role: Option<Role>,
    /// The RabbitMQ connection section.
    pub rabbitmq: seance_rabbitmq::Handle,
    /// The MongoDB connection section.
    pub mongodb: seance_mongo::Handle,
    /// The logging section.
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Assembles the configuration from the given file (required to exist)
    /// and the environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()).required(true))
            .add_source(Environment::with_prefix("SEANCE").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use pretty_assertions::assert_eq;

    fn from_yaml(input: &str) -> AppConfig {
        Config::builder()
            .add_source(File::from_str(input, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_configuration_uses_defaults() {
        // When
        let config = from_yaml("{}");

        // Then
        assert_eq!(config.role, None);
        assert_eq!(config.rabbitmq, seance_rabbitmq::Handle::default());
        assert_eq!(config.mongodb, seance_mongo::Handle::default());
    }

    #[test]
    fn full_configuration() {
        // Given
        let input = r#"
role: memory
rabbitmq:
  host: rabbit.internal
  port: 5673
  credentials:
    username: seance
    password: secret
mongodb:
  host: mongo.internal
  database: fabric
  collection: questions
telemetry:
  verbosity: debug
"#;

        // When
        let config = from_yaml(input);

        // Then
        assert_eq!(config.role, Some(Role::Memory));
        assert_eq!(
            config.rabbitmq.identifier(),
            "seance@rabbit.internal:5673/%2F",
        );
        assert_eq!(
            config.mongodb.identifier(),
            "mongo.internal:27017/fabric.questions",
        );
    }
}
