#![cfg_attr(test, deny(warnings))]

//! A distributed question-and-answer fabric of three cooperating agent roles,
//! connected by RabbitMQ and backed by MongoDB:
//!
//! - an **asker** submits questions typed at a terminal and prints the
//!   replies;
//! - a **brainer** is a human-answered oracle, prompted per forwarded
//!   question;
//! - a **memory** sits in between: it deduplicates questions, answers from
//!   its persistent store when it can, forwards new questions to the
//!   brainers, and fans each settled answer back out to every asker still
//!   waiting on it.
//!
//! The memory is the interesting part: three cooperating tasks (two bus
//! ingresses and a coordinator) share a single in-process mailbox, and every
//! store mutation is a single atomic document update, which keeps the whole
//! fan-in/fan-out safe under concurrent askers, concurrent brainers, and even
//! concurrent memory processes.

/// Exposes the application entry point.
mod app;
pub use self::app::App;

/// Exposes the command-line interface definition.
mod cli;
pub use self::cli::Cli;

/// Exposes the application configuration.
pub mod config;
pub use self::config::AppConfig;

/// Exposes the logging bootstrap.
pub mod telemetry;

/// Exposes the queue/exchange topology shared by all three roles.
pub mod topology;

/// Exposes the JSON wire messages exchanged over the bus.
pub mod wire;

/// Exposes the agent roles.
pub mod agent;
pub use self::agent::Role;
