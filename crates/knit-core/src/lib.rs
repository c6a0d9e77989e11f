//! knit-core: Incremental HTTP/1.x parser session
//!
//! Wraps a byte-level tokenizer (knit-h1 by default) and turns its
//! fragmented callbacks into complete fields, a lifecycle state machine and
//! an optional stream of typed events.
//!
//! ## Features
//! - Chunk-boundary independent results: any split of the input yields the
//!   same URL, headers and body
//! - Case-insensitive headers with multi-value or overwrite merging
//! - One handler per event kind, with in-handler pause and abort
//! - Pause, resume, finish and reset with llhttp error codes
//!
//! ## Example
//! ```
//! use knit_core::{EventKind, Flow, Kind, Parser};
//!
//! let mut parser = Parser::new(Kind::Request);
//! parser.on(EventKind::HeadersComplete, |_| Ok(Flow::Continue));
//! parser.feed(b"GET /a").unwrap();
//! parser.feed(b"bc HTTP/1.1\r\nContent-Type: text/plain\r\n\r\n").unwrap();
//!
//! assert_eq!(parser.url(), "/abc");
//! assert_eq!(parser.header("content-type"), Some("text/plain"));
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod accumulator;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod parser;
pub mod state;

// Re-exports
pub use accumulator::Accumulator;
pub use config::ParserConfig;
pub use error::{Error, Result};
pub use events::{Event, EventKind, Flow, Handler, HandlerError, HandlerResult, Observers};
pub use headers::{Headers, MergePolicy};
pub use parser::Parser;
pub use state::{Kind, State};

// Tokenizer re-exports
pub use knit_h1::{Errno, Head, Method, Mode, Tokenize, Tokenizer};
