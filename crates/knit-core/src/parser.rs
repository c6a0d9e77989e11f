//! Parser session
//!
//! [`Parser`] drives a [`Tokenize`] implementation over byte chunks, keeps
//! the reassembled fields, fires events and enforces the lifecycle in
//! [`State`].

use crate::events::{Event, EventKind, Flow, HandlerError, HandlerResult, Observers};
use crate::{Accumulator, Error, Headers, Kind, ParserConfig, Result, State};
use knit_h1::{Callbacks, Errno, Head, Method, Outcome, Signal, Tokenize, Tokenizer};
use std::borrow::Cow;
use tracing::{debug, trace, warn};

/// Receives tokenizer callbacks on behalf of the session
#[derive(Debug)]
struct Sink {
    acc: Accumulator,
    observers: Observers,
    synthesize_status: bool,
    /// Error returned by the handler that aborted the current call
    handler_error: Option<(EventKind, HandlerError)>,
}

impl Sink {
    fn emit(&mut self, event: Event<'_>) -> Signal {
        if self.observers.is_empty() {
            return Signal::Continue;
        }
        match self.observers.dispatch(&event) {
            Ok(Flow::Continue) => Signal::Continue,
            Ok(Flow::Pause) => Signal::Pause,
            Err(err) => {
                self.handler_error = Some((event.kind(), err));
                Signal::Error
            }
        }
    }
}

impl Callbacks for Sink {
    fn on_message_begin(&mut self) -> Signal {
        self.emit(Event::MessageBegin)
    }

    fn on_url(&mut self, at: &[u8]) -> Signal {
        self.acc.push_url(at);
        self.emit(Event::Url(at))
    }

    fn on_status(&mut self, at: &[u8]) -> Signal {
        self.acc.push_status(at);
        if self.synthesize_status {
            return Signal::Continue;
        }
        self.emit(Event::Status(at))
    }

    fn on_header_field(&mut self, at: &[u8]) -> Signal {
        self.acc.push_field(at);
        self.emit(Event::HeaderField(at))
    }

    fn on_header_value(&mut self, at: &[u8]) -> Signal {
        self.acc.push_value(at);
        self.emit(Event::HeaderValue(at))
    }

    fn on_headers_complete(&mut self, head: &Head) -> Signal {
        self.acc.commit();
        if self.synthesize_status && head.is_response {
            let code = head.status_code.to_string();
            let status = self.emit(Event::Status(code.as_bytes()));
            if status == Signal::Error {
                return status;
            }
            return match self.emit(Event::HeadersComplete(head)) {
                Signal::Continue => status,
                other => other,
            };
        }
        self.emit(Event::HeadersComplete(head))
    }

    fn on_body(&mut self, at: &[u8]) -> Signal {
        self.acc.push_body(at);
        self.emit(Event::Body(at))
    }

    fn on_message_complete(&mut self) -> Signal {
        // Chunked trailers end without a headers-complete callback
        self.acc.commit();
        self.emit(Event::MessageComplete)
    }
}

/// Recorded cause of the `Error` state
#[derive(Debug, Clone)]
struct Failure {
    code: Errno,
    reason: String,
}

/// Incremental HTTP/1.x parser session.
///
/// Feed chunks of any size with [`feed`](Parser::feed) and signal end of
/// stream with [`finish`](Parser::finish). Fields can be read through the
/// accessors at any point, or observed as they arrive with
/// [`on`](Parser::on).
///
/// ```
/// use knit_core::{Kind, Parser, State};
///
/// let mut parser = Parser::new(Kind::Request);
/// parser.feed(b"POST /submit HTTP/1.1\r\nContent-Length: 5\r\n\r\nhel").unwrap();
/// parser.feed(b"lo").unwrap();
/// parser.finish().unwrap();
///
/// assert_eq!(parser.state(), State::Complete);
/// assert_eq!(parser.method_name(), Some("POST"));
/// assert_eq!(parser.url(), "/submit");
/// assert_eq!(parser.body(), b"hello");
/// ```
#[derive(Debug)]
pub struct Parser<T: Tokenize = Tokenizer> {
    kind: Kind,
    config: ParserConfig,
    tokenizer: T,
    sink: Sink,
    state: State,
    paused: bool,
    finished: bool,
    dispatching: bool,
    failure: Option<Failure>,
}

impl Parser {
    /// Create a session with the default configuration
    pub fn new(kind: Kind) -> Self {
        Self::with_config(kind, ParserConfig::default())
    }

    pub fn with_config(kind: Kind, config: ParserConfig) -> Self {
        Self::with_tokenizer(kind, config, Tokenizer::new(kind.mode()))
    }
}

impl<T: Tokenize> Parser<T> {
    /// Create a session around a caller-supplied tokenizer
    pub fn with_tokenizer(kind: Kind, config: ParserConfig, tokenizer: T) -> Self {
        Self {
            kind,
            config,
            tokenizer,
            sink: Sink {
                acc: Accumulator::new(config.merge_policy),
                observers: Observers::new(),
                synthesize_status: config.synthesize_status_event,
                handler_error: None,
            },
            state: State::Init,
            paused: false,
            finished: false,
            dispatching: false,
            failure: None,
        }
    }

    /// Consume a chunk; returns the number of bytes consumed.
    ///
    /// Fewer than `data.len()` bytes are consumed only when the session
    /// pauses, either from a handler returning [`Flow::Pause`] or on a
    /// protocol upgrade. The remainder was not parsed.
    pub fn feed(&mut self, data: &[u8]) -> Result<usize> {
        if self.dispatching {
            return Err(Error::ReentrantFeed);
        }
        if self.state.is_terminal() {
            return Err(match self.state {
                State::Complete => Error::AlreadyFinished,
                _ => self.recorded_error(),
            });
        }
        match self.state {
            State::Paused => return Err(Error::Paused),
            State::Init => self.transition(State::Parsing),
            _ => {}
        }

        self.dispatching = true;
        let outcome = self.tokenizer.execute(&mut self.sink, data);
        self.dispatching = false;

        match outcome {
            Outcome::Ok => Ok(data.len()),
            Outcome::Paused(consumed) => {
                debug!(consumed, "parser paused by handler");
                self.enter_pause();
                Ok(consumed)
            }
            Outcome::PausedUpgrade(consumed) => {
                debug!(consumed, "parser paused on upgrade");
                self.enter_pause();
                Ok(consumed)
            }
            Outcome::Error(code) => Err(self.fail(code)),
        }
    }

    /// Signal end of input.
    ///
    /// Completes a body delimited by end of stream; fails if a message is
    /// only partially received. A no-op once complete. A handler pause
    /// raised while finishing is ignored.
    pub fn finish(&mut self) -> Result<()> {
        if self.dispatching {
            return Err(Error::ReentrantFeed);
        }
        match self.state {
            State::Complete => return Ok(()),
            State::Error => return Err(self.recorded_error()),
            State::Paused => return Err(Error::Paused),
            State::Init | State::Parsing => {}
        }

        self.dispatching = true;
        let outcome = loop {
            match self.tokenizer.finish(&mut self.sink) {
                Outcome::Paused(_) | Outcome::PausedUpgrade(_) => {
                    debug!("pause ignored while finishing");
                    self.tokenizer.resume();
                }
                other => break other,
            }
        };
        self.dispatching = false;

        match outcome {
            Outcome::Error(code) => Err(self.fail(code)),
            _ => {
                self.finished = true;
                self.transition(State::Complete);
                Ok(())
            }
        }
    }

    /// Pause between feeds; only effective while parsing
    pub fn pause(&mut self) {
        if self.state != State::Parsing {
            return;
        }
        self.tokenizer.pause();
        debug!("parser paused");
        self.enter_pause();
    }

    /// Resume a paused session; no-op otherwise
    pub fn resume(&mut self) {
        if self.state != State::Paused {
            return;
        }
        self.tokenizer.resume();
        self.paused = false;
        self.transition(State::Parsing);
    }

    /// Return to `Init`, dropping everything parsed. Handlers stay registered.
    pub fn reset(&mut self) {
        self.tokenizer.reset();
        self.sink.acc.clear();
        self.sink.handler_error = None;
        self.paused = false;
        self.finished = false;
        self.dispatching = false;
        self.failure = None;
        debug!(from = self.state.name(), "parser reset");
        self.state = State::Init;
    }

    /// Register the handler for `kind`, replacing any previous one
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> &mut Self
    where
        F: FnMut(&Event<'_>) -> HandlerResult + Send + 'static,
    {
        self.sink.observers.set(kind, Box::new(handler));
        self
    }

    /// Register a handler by event name (`"headersComplete"`, ...)
    pub fn on_named<F>(&mut self, name: &str, handler: F) -> Result<&mut Self>
    where
        F: FnMut(&Event<'_>) -> HandlerResult + Send + 'static,
    {
        let kind = name.parse::<EventKind>()?;
        Ok(self.on(kind, handler))
    }

    pub fn off(&mut self, kind: EventKind) -> &mut Self {
        self.sink.observers.remove(kind);
        self
    }

    pub fn has_handler(&self, kind: EventKind) -> bool {
        self.sink.observers.is_registered(kind)
    }

    // Accessors

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Method of the current request (`None` for responses or before the
    /// request line is parsed)
    pub fn method(&self) -> Option<Method> {
        self.tokenizer.method()
    }

    pub fn method_name(&self) -> Option<&'static str> {
        self.method().map(|m| m.as_str())
    }

    pub fn http_version_major(&self) -> u8 {
        self.tokenizer.http_major()
    }

    pub fn http_version_minor(&self) -> u8 {
        self.tokenizer.http_minor()
    }

    /// Response status code, 0 for requests
    pub fn status_code(&self) -> u16 {
        self.tokenizer.status_code()
    }

    pub fn status_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.sink.acc.status_text())
    }

    /// Request target as received (not percent-decoded)
    pub fn url(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.sink.acc.url())
    }

    pub fn url_bytes(&self) -> &[u8] {
        self.sink.acc.url()
    }

    pub fn body(&self) -> &[u8] {
        self.sink.acc.body()
    }

    /// Snapshot of every committed header
    pub fn headers(&self) -> Headers {
        self.sink.acc.headers().clone()
    }

    /// First value of a header (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.sink.acc.headers().get(name)
    }

    pub fn header_all(&self, name: &str) -> &[String] {
        self.sink.acc.headers().get_all(name)
    }

    pub fn should_keep_alive(&self) -> bool {
        self.tokenizer.should_keep_alive()
    }

    pub fn message_needs_eof(&self) -> bool {
        self.tokenizer.message_needs_eof()
    }

    pub fn is_upgrade(&self) -> bool {
        self.tokenizer.is_upgrade()
    }

    pub fn is_complete(&self) -> bool {
        self.finished
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Code of the recorded error, [`Errno::Ok`] if none
    pub fn error_code(&self) -> Errno {
        self.failure.as_ref().map_or(Errno::Ok, |f| f.code)
    }

    pub fn error_reason(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.reason.as_str())
    }

    /// Header pair still being assembled
    pub fn pending_header(&self) -> Option<(String, String)> {
        self.sink.acc.pending()
    }

    fn transition(&mut self, to: State) {
        trace!(from = self.state.name(), to = to.name(), "parser state change");
        self.state = to;
    }

    fn enter_pause(&mut self) {
        self.paused = true;
        self.transition(State::Paused);
    }

    fn fail(&mut self, code: Errno) -> Error {
        let error = match self.sink.handler_error.take() {
            Some((event, source)) if code == Errno::User => {
                warn!(event = event.name(), error = %source, "event handler failed");
                self.failure = Some(Failure {
                    code,
                    reason: format!("{} handler failed: {}", event, source),
                });
                Error::Callback { event, source }
            }
            _ => {
                let reason = self
                    .tokenizer
                    .error_reason()
                    .unwrap_or_else(|| code.message())
                    .to_string();
                if code.is_pause() {
                    debug!(code = code.name(), errno = code.code(), reason = %reason, "protocol switch requested");
                } else {
                    warn!(code = code.name(), errno = code.code(), reason = %reason, "parse error");
                }
                self.failure = Some(Failure {
                    code,
                    reason: reason.clone(),
                });
                Error::Protocol { code, reason }
            }
        };
        self.transition(State::Error);
        error
    }

    fn recorded_error(&self) -> Error {
        match &self.failure {
            Some(failure) => Error::Protocol {
                code: failure.code,
                reason: failure.reason.clone(),
            },
            None => Error::Protocol {
                code: Errno::Internal,
                reason: Errno::Internal.message().to_string(),
            },
        }
    }
}
