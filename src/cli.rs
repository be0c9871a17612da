//! Operator console
//!
//! A rustyline prompt that stands in for the panel's on-screen controls.
//! Lines are parsed into [`ReplCommand`]s and sent to the main loop, which
//! owns the panel; the prompt itself never touches panel state.

use std::str::FromStr;
use std::thread;

use anyhow::{Context, Result};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::command::{DriveCommand, UnknownCommand};
use crate::input::keyboard::UnknownKey;
use crate::input::{Direction, Point};
use crate::panel::{ControlPanel, PanelEvent};
use crate::telemetry::PLACEHOLDER;
use crate::transport::Transport;

/// Default number of lines shown by `log`
pub const DEFAULT_LOG_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Panel(PanelEvent),
    ShowStatus,
    ShowLog(usize),
    Help,
    Quit,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandParseError {
    #[error("unknown command '{0}' (type 'help')")]
    Unknown(String),
    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error(transparent)]
    Key(#[from] UnknownKey),
    #[error(transparent)]
    Command(#[from] UnknownCommand),
}

/// Parse one prompt line
pub fn parse_command(line: &str) -> Result<ReplCommand, CommandParseError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(ReplCommand::Empty);
    };
    let head = head.to_ascii_lowercase();

    let command = match head.as_str() {
        "connect" | "c" => ReplCommand::Panel(PanelEvent::ToggleConnect {
            url: words.next().map(str::to_string),
        }),
        "disconnect" => ReplCommand::Panel(PanelEvent::Disconnect),
        "press" => {
            let key = words.next().ok_or(CommandParseError::MissingArgument {
                command: "press",
                argument: "a key (up, down, left, right, w, a, s, d)",
            })?;
            ReplCommand::Panel(PanelEvent::KeyDown(Direction::from_str(key)?))
        },
        "release" => {
            let key = words.next().ok_or(CommandParseError::MissingArgument {
                command: "release",
                argument: "a key (up, down, left, right, w, a, s, d)",
            })?;
            ReplCommand::Panel(PanelEvent::KeyUp(Direction::from_str(key)?))
        },
        "drag" => ReplCommand::Panel(PanelEvent::PointerDown(parse_point("drag", &mut words)?)),
        "move" => ReplCommand::Panel(PanelEvent::PointerMove(parse_point("move", &mut words)?)),
        "up" | "release-pointer" => ReplCommand::Panel(PanelEvent::PointerUp),
        "forward" | "backward" | "left" | "right" => {
            ReplCommand::Panel(PanelEvent::Button(DriveCommand::from_str(&head)?))
        },
        "status" | "st" => ReplCommand::ShowStatus,
        "log" => match words.next() {
            Some(n) => ReplCommand::ShowLog(n.parse().map_err(|_| CommandParseError::InvalidNumber(n.to_string()))?),
            None => ReplCommand::ShowLog(DEFAULT_LOG_LINES),
        },
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        _ => return Err(CommandParseError::Unknown(head)),
    };

    Ok(command)
}

fn parse_point<'a>(
    command: &'static str,
    words: &mut impl Iterator<Item = &'a str>,
) -> Result<Point, CommandParseError> {
    let mut coordinate = || -> Result<f32, CommandParseError> {
        let word = words.next().ok_or(CommandParseError::MissingArgument {
            command,
            argument: "pad coordinates <px> <py>",
        })?;
        word.parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| CommandParseError::InvalidNumber(word.to_string()))
    };

    let x = coordinate()?;
    let y = coordinate()?;
    Ok(Point::new(x, y))
}

/// Run the prompt on its own thread until `quit`, EOF or Ctrl-C
///
/// The thread is detached: a prompt blocked in `readline` must not hold up
/// process exit. The main loop answers a closed channel by shutting down.
pub fn spawn_repl(tx: mpsc::UnboundedSender<ReplCommand>) -> Result<()> {
    thread::Builder::new()
        .name("operator-console".to_string())
        .spawn(move || run_repl(tx))
        .context("Failed to start operator console thread")?;
    Ok(())
}

fn run_repl(tx: mpsc::UnboundedSender<ReplCommand>) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            warn!("Operator console unavailable: {}", e);
            return;
        },
    };

    loop {
        match rl.readline("car> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }

                match parse_command(&line) {
                    Ok(ReplCommand::Empty) => {},
                    Ok(ReplCommand::Help) => print_help(),
                    Ok(ReplCommand::Quit) => {
                        let _ = tx.send(ReplCommand::Quit);
                        break;
                    },
                    Ok(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    },
                    Err(e) => println!("{}", e.to_string().red()),
                }
            },
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                let _ = tx.send(ReplCommand::Quit);
                break;
            },
            Err(e) => {
                warn!("Operator console error: {}", e);
                let _ = tx.send(ReplCommand::Quit);
                break;
            },
        }
    }

    debug!("Operator console closed");
}

pub fn print_help() {
    println!("\n{}", "Commands:".bold());
    let rows = [
        ("connect [url]", "connect to the broker, or disconnect if connected"),
        ("disconnect", "close the broker session"),
        ("press <key>", "hold a direction key (up/down/left/right or w/a/s/d)"),
        ("release <key>", "release a direction key"),
        ("drag <px> <py>", "touch the pad at a point"),
        ("move <px> <py>", "drag to a point"),
        ("up", "lift the pointer (stops the vehicle)"),
        ("forward|backward|left|right", "send a button command"),
        ("status", "show connection, intent and telemetry"),
        ("log [n]", "show the last n log lines"),
        ("quit", "stop the vehicle and exit"),
    ];
    for (command, description) in rows {
        println!("  {:<30} {}", command.cyan(), description);
    }
    println!();
}

/// Multi-line status summary
pub fn render_status<T: Transport>(panel: &ControlPanel<T>) -> String {
    let state = panel.state();
    let state_label = if state.is_connected() {
        state.label().green()
    } else if state.is_engaged() {
        state.label().yellow()
    } else {
        state.label().red()
    };

    let last = panel
        .last_command()
        .map(|c| String::from_utf8_lossy(&c.to_payload()).into_owned())
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    let status = panel.status();
    let mut out = String::new();
    out.push_str(&format!("{:<12} {}\n", "Connection:".bold(), state_label));
    out.push_str(&format!("{:<12} {}\n", "Broker:".bold(), panel.config().broker.url));
    out.push_str(&format!(
        "{:<12} {} from {}\n",
        "Intent:".bold(),
        panel.intent(),
        panel.active_source()
    ));
    out.push_str(&format!("{:<12} {}\n", "Last cmd:".bold(), last));
    out.push_str(&format!(
        "{:<12} speed {}  battery {}  status {}",
        "Vehicle:".bold(),
        status.speed,
        status.battery,
        status.status
    ));
    if let Some(raw) = &status.raw {
        out.push_str(&format!("\n{:<12} {}", "Raw:".bold(), raw));
    }
    out
}

/// The latest `n` log lines, colored
pub fn render_log<T: Transport>(panel: &ControlPanel<T>, n: usize) -> String {
    panel
        .log()
        .tail(n)
        .map(|line| line.render_colored())
        .collect::<Vec<_>>()
        .join("\n")
}
