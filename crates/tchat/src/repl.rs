//! Line-oriented chat loop.
//!
//! Reads commands and chat lines from the user while printing session
//! events as they arrive.

use std::io::Write;
use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use tchat_core::session::{ChatLine, Origin};
use tchat_core::{Direction, Result, Session, SessionEvent, SessionEvents, TransferInfo};

/// Lines shown by `/history`.
pub const HISTORY_LINES: usize = 10;

const HELP: &str = "\
Commands:
  /file <path>   Send a file (alias: /send)
  /history       Show recent chat history
  /status        Show connection and transfer status
  /help          Show this help
  /quit          Exit chat";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Text(String),
    SendFile(PathBuf),
    History,
    Status,
    Help,
    Quit,
    /// Blank input.
    Empty,
    /// A recognised command used wrongly; carries the usage line.
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Command::Text(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match name.to_ascii_lowercase().as_str() {
            "file" | "send" if arg.is_empty() => Command::Usage("/file <path>"),
            "file" | "send" => Command::SendFile(PathBuf::from(unquote(arg))),
            "history" => Command::History,
            "status" => Command::Status,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(format!("/{name}")),
        }
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(arg: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = arg
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return inner;
        }
    }
    arg
}

/// Run until the user quits, input ends, or the session disconnects.
/// Always shuts the session down before returning.
pub async fn run<R, W>(session: &Session, mut events: SessionEvents, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "Connected as {}. Type /help for commands.", session.username())?;
    let mut lines = input.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("Input closed");
                    break;
                };
                if !handle_command(session, Command::parse(&line), out).await? {
                    break;
                }
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                let disconnected = matches!(event, SessionEvent::Disconnected { .. });
                writeln!(out, "{}", render(&event))?;
                if disconnected {
                    break;
                }
            }
        }
    }

    session.shutdown().await;
    while let Ok(event) = events.try_recv() {
        writeln!(out, "{}", render(&event))?;
    }
    out.flush()?;
    Ok(())
}

/// Returns false when the loop should stop.
async fn handle_command<W: Write>(session: &Session, command: Command, out: &mut W) -> Result<bool> {
    match command {
        Command::Empty => {}
        Command::Text(text) => {
            if let Err(e) = session.send_text(text) {
                warn!(error = %e, "Text not sent");
                writeln!(out, "! message not sent: {e}")?;
            }
        }
        Command::SendFile(path) => match session.offer_file(&path).await {
            Ok(handle) => writeln!(
                out,
                "* offering {} ({})",
                handle.filename(),
                format_size(handle.total_size())
            )?,
            Err(e) => writeln!(out, "! cannot send {}: {e}", path.display())?,
        },
        Command::History => {
            let recent = session.recent_history(HISTORY_LINES);
            if recent.is_empty() {
                writeln!(out, "* no messages yet")?;
            }
            for line in &recent {
                writeln!(out, "{}", render_line(line))?;
            }
        }
        Command::Status => {
            let status = if session.is_connected() {
                "connected".to_string()
            } else {
                format!("{:?}", session.status())
            };
            writeln!(out, "* {} ({status})", session.username())?;
            for direction in [Direction::Outgoing, Direction::Incoming] {
                if let Some(handle) = session.transfer(direction) {
                    writeln!(out, "* {}", render_transfer(&handle.info()))?;
                }
            }
        }
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Usage(usage) => writeln!(out, "Usage: {usage}")?,
        Command::Unknown(name) => {
            writeln!(out, "Unknown command: {name}. Type /help for available commands.")?
        }
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

fn render_line(line: &ChatLine) -> String {
    match line.origin {
        Origin::Local => format!("[you] {}", line.content),
        Origin::Remote => format!("[{}] {}", line.sender, line.content),
    }
}

fn render_transfer(info: &TransferInfo) -> String {
    format!(
        "{} {} {}: {}/{} ({:.0}%)",
        info.direction,
        info.filename,
        info.state,
        format_size(info.bytes_transferred),
        format_size(info.total_size),
        info.progress_percent()
    )
}

/// One line describing `event` for the terminal.
pub fn render(event: &SessionEvent) -> String {
    match event {
        SessionEvent::TextReceived(line) => render_line(line),
        SessionEvent::IncomingOffer { info, sender } => format!(
            "* {sender} offers {} ({})",
            info.filename,
            format_size(info.total_size)
        ),
        SessionEvent::TransferAccepted(info) => match info.direction {
            Direction::Outgoing => format!("* peer accepted {}", info.filename),
            Direction::Incoming => format!("* receiving {}", info.filename),
        },
        SessionEvent::TransferProgress(info) => format!("* {}", render_transfer(info)),
        SessionEvent::TransferCompleted { info, path } => match info.direction {
            Direction::Outgoing => format!("* sent {}", info.filename),
            Direction::Incoming => format!("* saved {} to {}", info.filename, path.display()),
        },
        SessionEvent::TransferRejected { info, reason } => {
            format!("* {} {} rejected: {reason}", info.direction, info.filename)
        }
        SessionEvent::TransferAborted { info, reason } => {
            format!("! {} {} aborted: {reason}", info.direction, info.filename)
        }
        SessionEvent::Disconnected { reason } => format!("* disconnected: {reason}"),
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
