//! tchat: terminal chat client and server.
//!
//! Provides:
//! - CLI argument parsing
//! - Settings resolution from flags and an optional JSON file
//! - TCP connection setup for both launch modes
//! - The interactive chat loop

pub mod cli;
pub mod config;
pub mod repl;
pub mod transport;

pub use cli::{Cli, CliLogFormat, Mode};
pub use config::{FileConfig, Settings};

use tokio::io::BufReader;
use tracing::info;

use tchat_core::{AutoAccept, RejectAll, Result, Session, SessionEvents};

/// Resolve settings, connect, and chat until done.
pub async fn run(cli: &Cli) -> Result<()> {
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(cli, file)?;
    info!(
        mode = ?cli.mode,
        transport = ?cli.transport,
        username = %settings.session.username,
        "Starting"
    );

    let stream = if cli.is_server() {
        println!("Waiting for a peer on {}:{} ...", cli.bind, settings.port);
        let (stream, peer) = transport::accept_one(&cli.bind, settings.port).await?;
        println!("Peer connected from {peer}");
        stream
    } else {
        println!("Connecting to {}:{} ...", settings.host, settings.port);
        transport::connect(&settings.host, settings.port).await?
    };

    let (session, events) = start_session(stream, &settings)?;
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    repl::run(&session, events, stdin, &mut stdout).await
}

fn start_session(stream: tokio::net::TcpStream, settings: &Settings) -> Result<(Session, SessionEvents)> {
    let config = settings.session.clone();
    if settings.auto_accept {
        Session::start(stream, config, AutoAccept)
    } else {
        Session::start(stream, config, RejectAll)
    }
}
