//! Operator-visible log
//!
//! Append-only history of connect/disconnect/publish/receive events, one
//! line each. Streams that repeat themselves (the connect-first warning, an
//! engaged gamepad publishing every tick) go through
//! [`OperatorLog::append_folded`], which bumps a repeat count on the last
//! line instead of adding a new one.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use colored::*;
use tracing::debug;

/// Oldest lines are dropped beyond this
pub const MAX_LINES: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Info,
    /// Sent to the vehicle
    Outbound,
    /// Received from the vehicle
    Inbound,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub at: DateTime<Local>,
    pub kind: LogKind,
    pub text: String,
    /// How many times this exact line occurred in a row
    pub repeats: u32,
}

impl LogLine {
    /// Plain rendering: `[HH:MM:SS.mmm] text (xN)`
    pub fn render(&self) -> String {
        let mut line = format!("[{}] {}", self.at.format("%H:%M:%S%.3f"), self.text);
        if self.repeats > 1 {
            line.push_str(&format!(" (x{})", self.repeats));
        }
        line
    }

    /// Terminal rendering with color by kind
    pub fn render_colored(&self) -> String {
        let plain = self.render();
        match self.kind {
            LogKind::Info => plain.normal().to_string(),
            LogKind::Outbound => plain.cyan().to_string(),
            LogKind::Inbound => plain.green().to_string(),
            LogKind::Warning => plain.yellow().to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct OperatorLog {
    lines: VecDeque<LogLine>,
    /// Print each new line to stdout as it is appended
    echo: bool,
}

impl OperatorLog {
    pub fn new(echo: bool) -> Self {
        Self {
            lines: VecDeque::new(),
            echo,
        }
    }

    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.append(LogKind::Info, text.into());
    }

    pub fn outbound(&mut self, text: impl Into<String>) {
        self.append(LogKind::Outbound, text.into());
    }

    pub fn inbound(&mut self, text: impl Into<String>) {
        self.append(LogKind::Inbound, text.into());
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.append(LogKind::Warning, text.into());
    }

    /// Add a new line
    pub fn append(&mut self, kind: LogKind, text: String) {
        debug!(target: "operator", "{}", text);

        let line = LogLine {
            at: Local::now(),
            kind,
            text,
            repeats: 1,
        };
        if self.echo {
            println!("{}", line.render_colored());
        }

        self.lines.push_back(line);
        while self.lines.len() > MAX_LINES {
            self.lines.pop_front();
        }
    }

    /// Add a line, or count a repeat if the last line is identical
    ///
    /// With `echo_repeats` a folded repeat is printed again with its count.
    pub fn append_folded(&mut self, kind: LogKind, text: String, echo_repeats: bool) {
        if let Some(last) = self.lines.back_mut() {
            if last.kind == kind && last.text == text {
                last.repeats += 1;
                last.at = Local::now();
                if self.echo && echo_repeats {
                    println!("{}", last.render_colored());
                }
                return;
            }
        }
        self.append(kind, text);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last(&self) -> Option<&LogLine> {
        self.lines.back()
    }

    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    /// The latest `n` lines, oldest first
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &LogLine> {
        self.lines.iter().skip(self.lines.len().saturating_sub(n))
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.text.contains(needle))
    }
}
