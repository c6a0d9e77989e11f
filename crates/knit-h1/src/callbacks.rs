//! Callback interface driven by the tokenizer

use crate::Method;

/// What a callback wants the tokenizer to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Keep consuming input
    Continue,
    /// Stop right after this callback; `execute` reports the bytes consumed
    Pause,
    /// Abort with [`Errno::User`](crate::Errno::User)
    Error,
}

/// Message metadata known once the head (start line + headers) is parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Head {
    /// Request method (`None` for responses)
    pub method: Option<Method>,
    /// Response status code (0 for requests)
    pub status_code: u16,
    pub http_major: u8,
    pub http_minor: u8,
    /// Whether the current message is a response
    pub is_response: bool,
    /// Connection may be reused after this message
    pub keep_alive: bool,
    /// Protocol switch (`Upgrade`, `CONNECT` or `101`)
    pub upgrade: bool,
    /// Body is delimited by end of stream
    pub needs_eof: bool,
}

/// Receiver for tokenizer events.
///
/// Span callbacks (`on_url`, `on_status`, `on_header_field`,
/// `on_header_value`, `on_body`) may be invoked any number of times for one
/// logical field; fragments follow the caller's chunk boundaries, not the
/// protocol's.
#[allow(unused_variables)]
pub trait Callbacks {
    fn on_message_begin(&mut self) -> Signal {
        Signal::Continue
    }

    fn on_url(&mut self, at: &[u8]) -> Signal {
        Signal::Continue
    }

    fn on_status(&mut self, at: &[u8]) -> Signal {
        Signal::Continue
    }

    fn on_header_field(&mut self, at: &[u8]) -> Signal {
        Signal::Continue
    }

    /// Also invoked once with an empty slice for a header with no value
    fn on_header_value(&mut self, at: &[u8]) -> Signal {
        Signal::Continue
    }

    fn on_headers_complete(&mut self, head: &Head) -> Signal {
        Signal::Continue
    }

    fn on_body(&mut self, at: &[u8]) -> Signal {
        Signal::Continue
    }

    fn on_message_complete(&mut self) -> Signal {
        Signal::Continue
    }
}

/// Callbacks that ignore everything
impl Callbacks for () {}
