//! Discrete button-bank commands
//!
//! The button bank publishes a bare token per press and never goes through
//! the mixer.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveCommand {
    Forward,
    Backward,
    Left,
    Right,
}

impl DriveCommand {
    pub const ALL: [DriveCommand; 4] = [
        DriveCommand::Forward,
        DriveCommand::Left,
        DriveCommand::Right,
        DriveCommand::Backward,
    ];

    /// Token published on the control topic
    pub fn as_str(self) -> &'static str {
        match self {
            DriveCommand::Forward => "forward",
            DriveCommand::Backward => "backward",
            DriveCommand::Left => "left",
            DriveCommand::Right => "right",
        }
    }
}

impl fmt::Display for DriveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown drive command '{0}' (expected forward, backward, left or right)")]
pub struct UnknownCommand(pub String);

impl FromStr for DriveCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DriveCommand::ALL
            .into_iter()
            .find(|cmd| cmd.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}
