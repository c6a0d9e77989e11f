//! Session kind and lifecycle state

use crate::Error;
use knit_h1::Mode;
use std::fmt;
use std::str::FromStr;

/// Which messages a session parses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Kind {
    /// Detect request or response per message
    Both = 0,
    Request = 1,
    Response = 2,
}

impl Kind {
    /// Tokenizer mode for this kind
    pub fn mode(self) -> Mode {
        match self {
            Kind::Both => Mode::Both,
            Kind::Request => Mode::Request,
            Kind::Response => Mode::Response,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Both => "both",
            Kind::Request => "request",
            Kind::Response => "response",
        }
    }
}

impl TryFrom<u8> for Kind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Kind::Both),
            1 => Ok(Kind::Request),
            2 => Ok(Kind::Response),
            _ => Err(Error::InvalidKind(value.to_string())),
        }
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "both" => Ok(Kind::Both),
            "request" => Ok(Kind::Request),
            "response" => Ok(Kind::Response),
            _ => Err(Error::InvalidKind(s.to_string())),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a parser session.
///
/// ```text
/// Init --feed--> Parsing --pause/handler pause/upgrade--> Paused
///                Parsing <--resume-- Paused
/// Init/Parsing --finish--> Complete
/// Init/Parsing --parse or handler error--> Error
/// any --reset--> Init
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum State {
    #[default]
    Init = 0,
    Parsing = 1,
    Paused = 2,
    Complete = 3,
    Error = 4,
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::Init => "init",
            State::Parsing => "parsing",
            State::Paused => "paused",
            State::Complete => "complete",
            State::Error => "error",
        }
    }

    /// No further input accepted until reset
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Complete | State::Error)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
