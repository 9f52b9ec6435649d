use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// The logging section of the application configuration: the root verbosity,
/// the event formatting flavor, and optional per-target overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    verbosity: Verbosity,
    flavor: Flavor,
    color: bool,
    targets: BTreeMap<String, Verbosity>,
}

/// The root verbosity level for emitted events.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// No events at all.
    Off,
    /// Errors only.
    Error,
    /// Warnings and up.
    Warn,
    /// Informational events and up.
    #[default]
    Info,
    /// Debug events and up.
    Debug,
    /// Everything.
    Trace,
}

/// The event formatting flavor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// The default single-line format.
    #[default]
    Full,
    /// An abbreviated single-line format.
    Compact,
    /// A multi-line, human-oriented format.
    Pretty,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::default(),
            flavor: Flavor::default(),
            color: true,
            targets: BTreeMap::new(),
        }
    }
}

impl TelemetryConfig {
    /// Reports the root verbosity level.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Reports the formatting flavor.
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Reports whether colored output is enabled.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Reports the per-target verbosity overrides.
    pub fn targets(&self) -> &BTreeMap<String, Verbosity> {
        &self.targets
    }
}

impl From<Verbosity> for LevelFilter {
    fn from(verbosity: Verbosity) -> Self {
        match verbosity {
            Verbosity::Off => LevelFilter::OFF,
            Verbosity::Error => LevelFilter::ERROR,
            Verbosity::Warn => LevelFilter::WARN,
            Verbosity::Info => LevelFilter::INFO,
            Verbosity::Debug => LevelFilter::DEBUG,
            Verbosity::Trace => LevelFilter::TRACE,
        }
    }
}

/// Installs the global `tracing` subscriber according to the given config.
///
/// Called once during boot, before the runtime is built; repeated
/// installation would panic, which is fine for a process entry point.
pub fn init(config: &TelemetryConfig) {
    let targets = Targets::new()
        .with_default(config.verbosity())
        .with_targets(
            config
                .targets()
                .iter()
                .map(|(target, verbosity)| (target.clone(), LevelFilter::from(*verbosity))),
        );

    match config.flavor() {
        Flavor::Full => {
            let layer = fmt::layer().with_ansi(config.color());
            tracing_subscriber::registry()
                .with(layer.with_filter(targets))
                .init();
        }
        Flavor::Compact => {
            let layer = fmt::layer().compact().with_ansi(config.color());
            tracing_subscriber::registry()
                .with(layer.with_filter(targets))
                .init();
        }
        Flavor::Pretty => {
            let layer = fmt::layer().pretty().with_ansi(config.color());
            tracing_subscriber::registry()
                .with(layer.with_filter(targets))
                .init();
        }
    }
}
