//! Error types for knit-core

use crate::events::{EventKind, HandlerError};
use knit_h1::Errno;
use thiserror::Error;

/// Result type alias for knit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for a parser session
#[derive(Debug, Error)]
pub enum Error {
    /// Data fed after the session completed
    #[error("Parser has already finished")]
    AlreadyFinished,

    /// Data fed while paused
    #[error("Parser is paused; call resume() first")]
    Paused,

    /// Session entered while a previous feed/finish never returned
    #[error("Parser is already dispatching")]
    ReentrantFeed,

    /// Unknown parser kind
    #[error("Invalid parser kind: {0}")]
    InvalidKind(String),

    /// Unknown event name
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// Input rejected by the tokenizer
    #[error("Parse error: {reason} ({})", .code.name())]
    Protocol { code: Errno, reason: String },

    /// An event handler returned an error
    #[error("Handler for {event} failed")]
    Callback {
        event: EventKind,
        #[source]
        source: HandlerError,
    },

    /// Header not representable as an `http` header
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl Error {
    /// Closest tokenizer error code
    pub fn code(&self) -> Errno {
        match self {
            Error::Protocol { code, .. } => *code,
            Error::Callback { .. } => Errno::User,
            Error::Paused => Errno::Paused,
            Error::InvalidHeader(_) => Errno::InvalidHeaderToken,
            Error::AlreadyFinished
            | Error::ReentrantFeed
            | Error::InvalidKind(_)
            | Error::UnknownEvent(_) => Errno::Internal,
        }
    }
}
