//! Settings resolution: command-line flags over a JSON config file over
//! built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tchat_core::constants::{
    DEFAULT_DOWNLOADS_SUBDIR, DEFAULT_HOST, DEFAULT_TCP_PORT, DEFAULT_USERNAME,
};
use tchat_core::{Error, Result, SessionConfig};

use crate::cli::{AcceptMode, Cli};

/// Optional on-disk configuration. Every key may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub username: Option<String>,
    pub downloads_dir: Option<String>,
    pub chunk_size: Option<usize>,
    pub max_file_size_mb: Option<u64>,
    pub auto_accept_files: Option<bool>,
    pub max_history_lines: Option<usize>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl FileConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::parse(&text).map_err(|e| Error::Config {
            message: format!("{}: {e}", path.display()),
        })
    }

    pub fn parse(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Everything `run` needs, fully resolved.
#[derive(Debug, Clone)]
pub struct Settings {
    pub session: SessionConfig,
    pub host: String,
    pub port: u16,
    pub auto_accept: bool,
}

impl Settings {
    /// Merge `cli` over `file`, filling gaps from the environment and
    /// defaults, then validate the session part.
    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self> {
        let username = cli
            .username
            .clone()
            .or(file.username)
            .or_else(|| std::env::var("USER").ok())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string());

        let downloads_dir = match (&cli.downloads_dir, file.downloads_dir) {
            (Some(dir), _) => dir.clone(),
            (None, Some(dir)) => expand_home(&dir),
            (None, None) => default_downloads_dir(),
        };

        let mut session = SessionConfig::new(username).with_downloads_dir(downloads_dir);
        if let Some(size) = cli.chunk_size.or(file.chunk_size) {
            session = session.with_chunk_size(size);
        }
        if let Some(mb) = cli.max_file_size_mb.or(file.max_file_size_mb) {
            session = session.with_max_file_size(mb.saturating_mul(1024 * 1024));
        }
        if let Some(lines) = cli.history_limit.or(file.max_history_lines) {
            session = session.with_history_limit(lines);
        }
        session.validate()?;

        let auto_accept = match cli.accept {
            Some(mode) => mode == AcceptMode::All,
            None => file.auto_accept_files.unwrap_or(true),
        };

        Ok(Self {
            session,
            host: cli
                .host
                .clone()
                .or(file.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file.port).unwrap_or(DEFAULT_TCP_PORT),
            auto_accept,
        })
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn default_downloads_dir() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(DEFAULT_DOWNLOADS_SUBDIR),
        None => PathBuf::from(DEFAULT_DOWNLOADS_SUBDIR),
    }
}

/// Expand a leading `~/`.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tchat_core::constants::DEFAULT_CHUNK_SIZE;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["tchat", "client"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parse_full_file() {
        let file = FileConfig::parse(
            r#"{
                "username": "carol",
                "downloads_dir": "/tmp/in",
                "chunk_size": 4096,
                "max_file_size_mb": 10,
                "auto_accept_files": false,
                "max_history_lines": 20,
                "host": "chat.local",
                "port": 9999
            }"#,
        )
        .unwrap();
        assert_eq!(file.username.as_deref(), Some("carol"));
        assert_eq!(file.port, Some(9999));
        assert_eq!(file.auto_accept_files, Some(false));
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(FileConfig::parse(r#"{"colour": true}"#).is_err());
    }

    #[test]
    fn file_fills_defaults() {
        let file = FileConfig {
            username: Some("carol".into()),
            downloads_dir: Some("/tmp/in".into()),
            chunk_size: Some(4096),
            max_file_size_mb: Some(10),
            auto_accept_files: Some(false),
            max_history_lines: Some(20),
            host: Some("chat.local".into()),
            port: Some(9999),
        };
        let settings = Settings::resolve(&cli(&[]), file).unwrap();
        assert_eq!(settings.session.username, "carol");
        assert_eq!(settings.session.downloads_dir, PathBuf::from("/tmp/in"));
        assert_eq!(settings.session.chunk_size, 4096);
        assert_eq!(settings.session.max_file_size, 10 * 1024 * 1024);
        assert_eq!(settings.session.history_limit, 20);
        assert_eq!(settings.host, "chat.local");
        assert_eq!(settings.port, 9999);
        assert!(!settings.auto_accept);
    }

    #[test]
    fn flags_override_file() {
        let file = FileConfig {
            username: Some("carol".into()),
            port: Some(9999),
            auto_accept_files: Some(false),
            ..FileConfig::default()
        };
        let settings = Settings::resolve(
            &cli(&["-u", "dave", "-p", "7000", "--accept", "all", "-d", "/srv/in"]),
            file,
        )
        .unwrap();
        assert_eq!(settings.session.username, "dave");
        assert_eq!(settings.port, 7000);
        assert!(settings.auto_accept);
        assert_eq!(settings.session.downloads_dir, PathBuf::from("/srv/in"));
    }

    #[test]
    fn builtin_defaults() {
        let settings = Settings::resolve(&cli(&["-u", "erin"]), FileConfig::default()).unwrap();
        assert_eq!(settings.port, DEFAULT_TCP_PORT);
        assert_eq!(settings.host, DEFAULT_HOST);
        assert_eq!(settings.session.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(settings.auto_accept);
        assert!(settings.session.downloads_dir.ends_with(DEFAULT_DOWNLOADS_SUBDIR));
    }

    #[test]
    fn invalid_chunk_size_is_refused() {
        let err = Settings::resolve(&cli(&["--chunk-size", "0"]), FileConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tchat.json");
        std::fs::write(&path, r#"{"port": 1234}"#).unwrap();
        assert_eq!(FileConfig::load(&path).unwrap().port, Some(1234));
    }
}
