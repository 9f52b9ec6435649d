use crate::{AppConfig, Cli, agent, telemetry};
use clap::Parser;
use seance_core::{AgentContext, AgentSpindown};
use std::process::ExitCode;
use tracing::{error, info};

/// The entry point for launching a seance agent.
///
/// Boot proceeds in stages: `.env` loading, CLI parsing, configuration
/// assembly, telemetry installation, runtime construction, and finally the
/// selected agent's main future. When that future returns (on shutdown or on
/// a fatal error), the global context is terminated and every workload
/// registered with the spindown registry gets its cleanup window before the
/// process exits.
pub struct App;

impl App {
    /// Boots a seance agent and reports the process exit code: zero on clean
    /// shutdown, non-zero on a fatal error.
    pub fn run() -> ExitCode {
        // Load `.env` before anything reads the environment
        let _ = dotenvy::dotenv();

        let cli = Cli::parse();

        // Assemble the configuration; telemetry is not up yet, so speak plainly
        let config = match AppConfig::load(&cli.config) {
            Ok(config) => config,
            Err(error) => {
                eprintln!(
                    "Fatal: failed to load configuration from '{}': {}",
                    cli.config.display(),
                    error,
                );
                return ExitCode::FAILURE;
            }
        };

        telemetry::init(&config.telemetry);

        // The role comes from the flag first, the file second
        let role = match cli.role.or(config.role) {
            Some(role) => role,
            None => {
                error!("No role given; pass --role or set 'role' in the configuration file");
                return ExitCode::FAILURE;
            }
        };

        // Make the asynchronous runtime
        let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(error) => {
                error!(
                    ?error,
                    error_message = %error,
                    "Failed to build the tokio runtime",
                );
                return ExitCode::FAILURE;
            }
        };

        let outcome = runtime.block_on(async {
            // From here on, the first OS shutdown signal flips the context
            // instead of killing the process
            AgentContext::auto_terminate().await;

            info!(%role, "Launching agent");
            let outcome = agent::run(role, &config).await;

            // Whether the agent finished or failed, give every registered
            // workload its cleanup window
            AgentContext::terminate();
            AgentSpindown::completed().await;

            outcome
        });

        match outcome {
            Ok(()) => {
                info!("Bye");
                ExitCode::SUCCESS
            }
            Err(error) => {
                error!(
                    ?error,
                    error_message = %error,
                    "Agent failed",
                );
                ExitCode::FAILURE
            }
        }
    }
}
