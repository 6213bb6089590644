//! Line-based command input from stdin.
//!
//! Reads commands on a blocking thread and forwards them to the main
//! application over an async channel.

use crate::{AppCommand, AppError, AppResult};

use std::{io::BufRead, panic::Location, time::Duration};

use error_location::ErrorLocation;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Parse one typed line. Blank lines yield `None`.
#[track_caller]
pub fn parse_command(line: &str) -> AppResult<Option<AppCommand>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let argument = words.next();
    if words.next().is_some() {
        return Err(invalid(line, "too many arguments"));
    }

    let command = match (verb.to_ascii_lowercase().as_str(), argument) {
        ("record" | "r", None) => AppCommand::Record,
        ("play" | "pause" | "p", None) => AppCommand::PlayPause,
        ("stop" | "s", None) => AppCommand::Stop,
        ("mute" | "m", None) => AppCommand::Mute,
        ("pitch", None) => AppCommand::Pitch,
        ("current" | "c", None) => AppCommand::PlayCurrent,
        ("next" | "n", None) => AppCommand::Next,
        ("prev" | "previous", None) => AppCommand::Previous,
        ("status", None) => AppCommand::Status,
        ("help" | "?", None) => AppCommand::Help,
        ("quit" | "exit" | "q", None) => AppCommand::Shutdown,
        ("volume" | "vol", Some(value)) => AppCommand::Volume(unit_fraction(line, value)? as f32),
        ("rate", Some(value)) => AppCommand::Rate(unit_fraction(line, value)? as f32),
        ("seek", Some(value)) => AppCommand::Seek(unit_fraction(line, value)?),
        ("volume" | "vol" | "rate" | "seek", None) => {
            return Err(invalid(line, "expects a value between 0 and 1"));
        }
        (_, Some(_)) if is_known(verb) => return Err(invalid(line, "takes no argument")),
        _ => return Err(invalid(line, "unknown command, type 'help'")),
    };

    Ok(Some(command))
}

fn is_known(verb: &str) -> bool {
    matches!(
        verb.to_ascii_lowercase().as_str(),
        "record" | "r" | "play" | "pause" | "p" | "stop" | "s" | "mute" | "m" | "pitch"
            | "current" | "c" | "next" | "n" | "prev" | "previous" | "status" | "help" | "?"
            | "quit" | "exit" | "q"
    )
}

#[track_caller]
fn unit_fraction(line: &str, value: &str) -> AppResult<f64> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| invalid(line, "value is not a number"))?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err(invalid(line, "value must be between 0 and 1"));
    }
    Ok(parsed)
}

#[track_caller]
fn invalid(line: &str, reason: &str) -> AppError {
    AppError::InvalidCommand {
        input: line.trim().to_string(),
        reason: reason.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// Forwards typed commands to the application.
pub struct InputHandler {
    command_tx: mpsc::Sender<AppCommand>,
}

impl InputHandler {
    /// Handler sending parsed commands on `command_tx`.
    pub fn new(command_tx: mpsc::Sender<AppCommand>) -> Self {
        Self { command_tx }
    }

    /// Run until shutdown is signalled or stdin closes.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()> {
        let (line_tx, mut line_rx) = mpsc::channel::<String>(32);

        // Single blocking task forwarding stdin lines. When line_rx is
        // dropped the next blocking_send fails and the task exits.
        let handle = tokio::task::spawn_blocking(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if line_tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Input handler shutting down");
                    break;
                }
                line = line_rx.recv() => {
                    match line {
                        Some(line) => self.handle_line(&line).await?,
                        None => {
                            info!("Input closed, requesting shutdown");
                            self.send(AppCommand::Shutdown).await?;
                            break;
                        }
                    }
                }
            }
        }

        drop(line_rx);

        // The blocking task may sit in read() until the next line; it is
        // cleaned up on process exit.
        match tokio::time::timeout(Duration::from_millis(100), handle).await {
            Ok(Ok(())) => debug!("Input forwarder stopped cleanly"),
            Ok(Err(e)) => warn!(error = ?e, "Input forwarder task panicked"),
            Err(_) => debug!("Input forwarder still blocked on stdin, leaving it to exit"),
        }

        Ok(())
    }

    async fn handle_line(&self, line: &str) -> AppResult<()> {
        match parse_command(line) {
            Ok(Some(command)) => self.send(command).await,
            Ok(None) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Ignoring input");
                Ok(())
            }
        }
    }

    async fn send(&self, command: AppCommand) -> AppResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("Failed to send command: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
