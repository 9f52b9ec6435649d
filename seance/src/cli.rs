use crate::Role;
use clap::Parser;
use std::path::PathBuf;

/// The command-line interface of the seance binary.
///
/// The role may come from either the `--role` flag or the configuration
/// file; the flag wins when both are present.
#[derive(Debug, Parser)]
#[command(
    name = "seance",
    about = "A distributed Q&A fabric agent: either an asker, a brainer, or a memory."
)]
pub struct Cli {
    /// Configuration file location.
    #[arg(short, long, value_name = "FILE", default_value = "./configuration.yml")]
    pub config: PathBuf,

    /// Role to launch.
    #[arg(short, long, value_enum)]
    pub role: Option<Role>,
}
