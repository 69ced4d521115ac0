// credvault: operator diagnostics
//
// Loads configuration once, initialises structured logging (no secret values
// are ever emitted), and dispatches to the command handler. The exit status
// is non-zero on any failure so scripts can gate on it.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use credvault::cli::{execute, Cli};
use credvault::config::Config;

fn init_logging(level: &str) {
    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("credvault={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config.log_level);

    if let Err(e) = execute(cli.command, &config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
