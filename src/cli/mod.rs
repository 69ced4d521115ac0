// credvault: command-line interface
//
// clap derive types for the operator diagnostics. Parsing lives here; the
// handlers are in `commands` and return a `Result` the binary turns into an
// exit status.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::execute;

/// credvault: encryption at rest for stored exchange API keys.
#[derive(Parser, Debug)]
#[command(name = "credvault")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Security operations.
    Security {
        #[command(subcommand)]
        action: SecurityCommand,
    },

    /// Audit trail operations.
    Audit {
        #[command(subcommand)]
        action: AuditCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Show the recorded access attempts for one credential.
    Show {
        /// Numeric credential ID.
        #[arg(long)]
        credential: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum SecurityCommand {
    /// Run the encryption round-trip and salt-uniqueness self-test.
    Test,

    /// Print a new random base64 master key.
    GenerateKey,

    /// Print a new random base64 per-credential salt.
    GenerateSalt,
}
