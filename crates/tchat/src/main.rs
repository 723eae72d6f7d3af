//! tchat binary entry point.

use clap::Parser;
use tracing::{error, info};

use tchat::Cli;

fn main() {
    let cli = Cli::parse();

    let log_format = cli.log_format.into();
    if let Err(e) = tchat_core::init_logging(cli.verbose, cli.log_file.as_deref(), log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "tchat starting");

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("tchat: failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(tchat::run(&cli)) {
        error!(error = %e, "tchat failed");
        eprintln!("tchat: {}", e);
        std::process::exit(1);
    }
}
