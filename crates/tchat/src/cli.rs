//! Command-line interface.
//!
//! Provides command-line argument parsing using clap.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

/// Log output format for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CliLogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Structured JSON output.
    Json,
}

impl From<CliLogFormat> for tchat_core::LogFormat {
    fn from(fmt: CliLogFormat) -> Self {
        match fmt {
            CliLogFormat::Text => tchat_core::LogFormat::Text,
            CliLogFormat::Json => tchat_core::LogFormat::Json,
        }
    }
}

/// Which side of the connection this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Listen and wait for one peer.
    Server,
    /// Connect to a listening peer.
    Client,
}

/// Transport carrying the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportKind {
    #[default]
    Tcp,
}

/// What to do with incoming file offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AcceptMode {
    /// Accept every offer within the size limit.
    All,
    /// Decline every offer.
    None,
}

/// Peer-to-peer terminal chat with file transfer.
#[derive(Debug, Parser)]
#[command(
    name = "tchat",
    version,
    about = "Peer-to-peer terminal chat with file transfer"
)]
pub struct Cli {
    /// Launch mode
    #[arg(value_enum)]
    pub mode: Mode,

    /// Transport to use
    #[arg(short = 't', long, value_enum, default_value = "tcp")]
    pub transport: TransportKind,

    /// Host to connect to (client mode)
    #[arg(long, env = "TCHAT_HOST", value_name = "HOST")]
    pub host: Option<String>,

    /// Address to listen on (server mode)
    #[arg(long, env = "TCHAT_BIND", default_value = "0.0.0.0", value_name = "ADDR")]
    pub bind: String,

    /// TCP port
    #[arg(short = 'p', long, env = "TCHAT_PORT")]
    pub port: Option<u16>,

    /// Name shown to the peer
    #[arg(short = 'u', long, env = "TCHAT_USERNAME")]
    pub username: Option<String>,

    /// Where received files are stored
    #[arg(short = 'd', long, env = "TCHAT_DOWNLOADS_DIR", value_name = "DIR")]
    pub downloads_dir: Option<PathBuf>,

    /// Bytes per file chunk
    #[arg(long, env = "TCHAT_CHUNK_SIZE", value_name = "BYTES")]
    pub chunk_size: Option<usize>,

    /// Largest incoming file accepted, in MiB
    #[arg(long = "max-file-size-mb", env = "TCHAT_MAX_FILE_SIZE_MB", value_name = "MB")]
    pub max_file_size_mb: Option<u64>,

    /// Incoming file offers
    #[arg(long, env = "TCHAT_ACCEPT", value_enum)]
    pub accept: Option<AcceptMode>,

    /// Chat lines kept for /history
    #[arg(long, env = "TCHAT_HISTORY_LIMIT", value_name = "LINES")]
    pub history_limit: Option<usize>,

    /// JSON configuration file supplying defaults
    #[arg(short = 'c', long, env = "TCHAT_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Log file path (default: stderr)
    #[arg(long = "log-file", env = "TCHAT_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long = "log-format", default_value = "text", value_enum)]
    pub log_format: CliLogFormat,
}

impl Cli {
    pub fn is_server(&self) -> bool {
        self.mode == Mode::Server
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_server_defaults() {
        let cli = Cli::try_parse_from(["tchat", "server"]).unwrap();
        assert!(cli.is_server());
        assert_eq!(cli.transport, TransportKind::Tcp);
        assert_eq!(cli.bind, "0.0.0.0");
        assert_eq!(cli.log_format, CliLogFormat::Text);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn parse_client_options() {
        let cli = Cli::try_parse_from([
            "tchat",
            "client",
            "--host",
            "10.0.0.2",
            "-p",
            "9000",
            "-u",
            "alice",
            "--accept",
            "none",
        ])
        .unwrap();
        assert_eq!(cli.mode, Mode::Client);
        assert_eq!(cli.host.as_deref(), Some("10.0.0.2"));
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.username.as_deref(), Some("alice"));
        assert_eq!(cli.accept, Some(AcceptMode::None));
    }

    #[test]
    fn parse_verbosity() {
        let cli = Cli::try_parse_from(["tchat", "server", "-vvv"]).unwrap();
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn parse_log_format() {
        let cli = Cli::try_parse_from(["tchat", "client", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, CliLogFormat::Json);
    }
}
