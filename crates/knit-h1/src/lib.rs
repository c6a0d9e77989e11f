//! knit-h1: Incremental HTTP/1.x tokenizer
//!
//! Byte-level engine used by knit-core. Input may arrive in chunks of any
//! size; fields are reported through [`Callbacks`] as spans of the chunk
//! being executed, so a value split across chunks arrives in fragments.
//!
//! ## Features
//! - Requests, responses, or auto-detection per message
//! - Content-Length, chunked and read-until-EOF bodies
//! - Pipelining, keep-alive and upgrade detection
//! - Pause/resume from inside any callback
//! - llhttp method table and `HPE_*` error codes
//!
//! ## Example
//! ```
//! use knit_h1::{Callbacks, Mode, Outcome, Signal, Tokenize, Tokenizer};
//!
//! #[derive(Default)]
//! struct Url(Vec<u8>);
//!
//! impl Callbacks for Url {
//!     fn on_url(&mut self, at: &[u8]) -> Signal {
//!         self.0.extend_from_slice(at);
//!         Signal::Continue
//!     }
//! }
//!
//! let mut tokenizer = Tokenizer::new(Mode::Request);
//! let mut url = Url::default();
//! assert_eq!(tokenizer.execute(&mut url, b"GET /a"), Outcome::Ok);
//! assert_eq!(tokenizer.execute(&mut url, b"bc HTTP/1.1\r\n\r\n"), Outcome::Ok);
//! assert_eq!(url.0, b"/abc");
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod callbacks;
mod errno;
mod method;
mod tokenizer;

pub use callbacks::{Callbacks, Head, Signal};
pub use errno::Errno;
pub use method::Method;
pub use tokenizer::{Mode, Outcome, Tokenize, Tokenizer};
