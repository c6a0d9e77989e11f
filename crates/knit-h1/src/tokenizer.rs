//! Incremental HTTP/1.x tokenizer
//!
//! A byte-at-a-time state machine in the spirit of llhttp: each `execute`
//! call consumes as much of the chunk as it can and reports fields through
//! [`Callbacks`] as spans of the caller's buffer. Nothing is buffered except
//! the few bytes needed to recognise methods and framing headers, so a field
//! split across chunks arrives as several fragments.

use crate::{Callbacks, Errno, Head, Method, Signal};
use memchr::{memchr2, memchr3};
use smallvec::SmallVec;

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Protocol constant preceding the version digits
const PROTO: &[u8; 5] = b"HTTP/";

/// Lower-cased header names longer than this are never framing headers
const MAX_NAME: usize = 24;

/// Framing header values longer than this are rejected or ignored
const MAX_VALUE: usize = 1024;

/// Which messages the tokenizer expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mode {
    /// Decide per message from the first bytes
    Both = 0,
    Request = 1,
    Response = 2,
}

/// Result of [`Tokenize::execute`] and [`Tokenize::finish`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Whole input consumed
    Ok,
    /// Paused after consuming this many bytes
    Paused(usize),
    /// Message requested a protocol switch; bytes past this offset belong
    /// to the new protocol
    PausedUpgrade(usize),
    /// Input rejected; see [`Tokenize::error_reason`]
    Error(Errno),
}

/// Byte-level HTTP/1.x engine.
///
/// Callbacks are passed per call, so the engine never holds a reference to
/// its consumer.
pub trait Tokenize {
    fn new(mode: Mode) -> Self;

    fn mode(&self) -> Mode;

    /// Consume `data`, firing callbacks synchronously
    fn execute<C: Callbacks>(&mut self, cb: &mut C, data: &[u8]) -> Outcome;

    /// Signal end of stream
    fn finish<C: Callbacks>(&mut self, cb: &mut C) -> Outcome;

    /// Make the next `execute` return immediately with nothing consumed
    fn pause(&mut self);

    fn resume(&mut self);

    /// Forget everything, including a recorded error
    fn reset(&mut self);

    /// Metadata of the current (or last) message
    fn head(&self) -> &Head;

    /// Last error code, [`Errno::Ok`] if none
    fn errno(&self) -> Errno;

    fn error_reason(&self) -> Option<&str>;

    fn http_major(&self) -> u8 {
        self.head().http_major
    }

    fn http_minor(&self) -> u8 {
        self.head().http_minor
    }

    fn method(&self) -> Option<Method> {
        self.head().method
    }

    fn status_code(&self) -> u16 {
        self.head().status_code
    }

    fn should_keep_alive(&self) -> bool {
        self.head().keep_alive
    }

    fn message_needs_eof(&self) -> bool {
        self.head().needs_eof
    }

    fn is_upgrade(&self) -> bool {
        self.head().upgrade
    }

    fn is_response(&self) -> bool {
        self.head().is_response
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    StartBothH,
    Method,
    UrlStart,
    Url,
    Constant(u8),
    VersionMajor,
    VersionDot,
    VersionMinor,
    RequestLineEnd,
    StatusSpace,
    StatusCode(u8),
    StatusCodeEnd,
    StatusText,
    Lf(Next),
    HeaderLineStart,
    HeaderField,
    ValueWs,
    HeaderValue,
    FoldWs,
    BodyIdentity,
    BodyEof,
    ChunkSizeStart,
    ChunkSize,
    ChunkExtension,
    ChunkData,
    ChunkDataEnd,
    MessageDone,
    Closed,
    Dead,
}

/// Where to go once the LF of a CRLF pair arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    HeaderLine,
    HeadersDone,
    ChunkSizeDone,
    ChunkDataDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderKind {
    Other,
    ContentLength,
    TransferEncoding,
    Connection,
    Upgrade,
}

#[derive(Debug, Clone, Copy, Default)]
struct Framing {
    content_length: Option<u64>,
    transfer_encoding: bool,
    chunked: bool,
    conn_close: bool,
    conn_keep_alive: bool,
    conn_upgrade: bool,
    has_upgrade: bool,
}

type Failure = (Errno, &'static str);

/// Default llhttp-compatible tokenizer
#[derive(Debug, Clone)]
pub struct Tokenizer {
    mode: Mode,
    state: State,
    head: Head,
    framing: Framing,
    errno: Errno,
    reason: Option<&'static str>,
    paused: bool,
    /// Method bytes, then the lower-cased name of the current header
    name: SmallVec<[u8; MAX_NAME]>,
    name_len: usize,
    header: HeaderKind,
    /// Lower-cased value of the current framing header
    value: SmallVec<[u8; 32]>,
    value_overflow: bool,
    /// A header line is open and may still be folded
    in_value: bool,
    /// A value callback fired for the current header
    value_seen: bool,
    remaining: u64,
    in_trailers: bool,
}

macro_rules! notify {
    ($self:ident, $signal:expr, $pos:expr, $reason:literal) => {{
        let signal = $signal;
        if let Some(outcome) = $self.after(signal, $pos, $reason) {
            return outcome;
        }
    }};
}

macro_rules! check {
    ($self:ident, $result:expr) => {
        if let Err((errno, reason)) = $result {
            return $self.fail(errno, reason);
        }
    };
}

impl Tokenizer {
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn fail(&mut self, errno: Errno, reason: &'static str) -> Outcome {
        self.state = State::Dead;
        self.errno = errno;
        self.reason = Some(reason);
        Outcome::Error(errno)
    }

    fn after(&mut self, signal: Signal, pos: usize, reason: &'static str) -> Option<Outcome> {
        match signal {
            Signal::Continue => None,
            Signal::Pause => {
                self.paused = true;
                Some(Outcome::Paused(pos))
            }
            Signal::Error => Some(self.fail(Errno::User, reason)),
        }
    }

    fn begin_message(&mut self) {
        self.head = Head::default();
        self.framing = Framing::default();
        self.name.clear();
        self.name_len = 0;
        self.header = HeaderKind::Other;
        self.value.clear();
        self.value_overflow = false;
        self.in_value = false;
        self.value_seen = false;
        self.remaining = 0;
        self.in_trailers = false;
    }

    fn start_field(&mut self) {
        self.name.clear();
        self.name_len = 0;
        self.header = HeaderKind::Other;
        self.value.clear();
        self.value_overflow = false;
        self.value_seen = false;
    }

    fn push_name(&mut self, span: &[u8]) {
        for &c in span {
            if self.name.len() == MAX_NAME {
                break;
            }
            self.name.push(c.to_ascii_lowercase());
        }
        self.name_len += span.len();
    }

    fn classify_header(&self) -> HeaderKind {
        if self.in_trailers || self.name_len != self.name.len() {
            return HeaderKind::Other;
        }
        match self.name.as_slice() {
            b"content-length" => HeaderKind::ContentLength,
            b"transfer-encoding" => HeaderKind::TransferEncoding,
            b"connection" | b"proxy-connection" => HeaderKind::Connection,
            b"upgrade" => HeaderKind::Upgrade,
            _ => HeaderKind::Other,
        }
    }

    fn push_value(&mut self, span: &[u8]) {
        if self.header == HeaderKind::Other || self.value_overflow {
            return;
        }
        if self.value.len() + span.len() > MAX_VALUE {
            self.value_overflow = true;
            return;
        }
        self.value.extend(span.iter().map(|c| c.to_ascii_lowercase()));
    }

    /// Apply a completed framing header
    fn finish_header_value(&mut self) -> Result<(), Failure> {
        if !self.in_value {
            return Ok(());
        }
        self.in_value = false;
        let value = trim_ows(&self.value);
        match self.header {
            HeaderKind::Other => {}
            HeaderKind::ContentLength => {
                if self.framing.content_length.is_some() {
                    return Err((Errno::UnexpectedContentLength, "Duplicate Content-Length"));
                }
                if self.value_overflow {
                    return Err((Errno::InvalidContentLength, "Content-Length overflow"));
                }
                if value.is_empty() {
                    return Err((Errno::InvalidContentLength, "Empty Content-Length"));
                }
                let mut length: u64 = 0;
                for &c in value {
                    if !c.is_ascii_digit() {
                        return Err((
                            Errno::InvalidContentLength,
                            "Invalid character in Content-Length",
                        ));
                    }
                    length = length
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(u64::from(c - b'0')))
                        .ok_or((Errno::InvalidContentLength, "Content-Length overflow"))?;
                }
                self.framing.content_length = Some(length);
            }
            HeaderKind::TransferEncoding => {
                // Only the final coding decides the framing
                self.framing.transfer_encoding = true;
                self.framing.chunked = !self.value_overflow
                    && value.rsplit(|&c| c == b',').next().map(trim_ows)
                        == Some(b"chunked".as_slice());
            }
            HeaderKind::Connection => {
                for token in value.split(|&c| c == b',') {
                    match trim_ows(token) {
                        b"close" => self.framing.conn_close = true,
                        b"keep-alive" => self.framing.conn_keep_alive = true,
                        b"upgrade" => self.framing.conn_upgrade = true,
                        _ => {}
                    }
                }
            }
            HeaderKind::Upgrade => self.framing.has_upgrade = true,
        }
        Ok(())
    }

    /// Decide framing once the header block ends
    fn prepare_body(&mut self) -> Result<(), Failure> {
        let framing = self.framing;
        if framing.content_length.is_some() && framing.transfer_encoding {
            return Err((
                Errno::UnexpectedContentLength,
                "Content-Length can't be present with Transfer-Encoding",
            ));
        }
        let head = &mut self.head;
        if !head.is_response && framing.transfer_encoding && !framing.chunked {
            return Err((
                Errno::InvalidTransferEncoding,
                "Request has invalid `Transfer-Encoding`",
            ));
        }

        let status = head.status_code;
        head.upgrade = if head.is_response {
            status == 101
        } else {
            (framing.conn_upgrade && framing.has_upgrade) || head.method == Some(Method::Connect)
        };
        let no_body = head.is_response && (status / 100 == 1 || status == 204 || status == 304);
        head.needs_eof = head.is_response
            && !no_body
            && !head.upgrade
            && !framing.chunked
            && framing.content_length.is_none();
        let persistent = if head.http_major > 0 && head.http_minor > 0 {
            !framing.conn_close
        } else {
            framing.conn_keep_alive
        };
        head.keep_alive = persistent && !head.needs_eof;

        self.state = if head.upgrade || no_body {
            State::MessageDone
        } else if framing.chunked {
            State::ChunkSizeStart
        } else if let Some(length) = framing.content_length {
            self.remaining = length;
            if length == 0 {
                State::MessageDone
            } else {
                State::BodyIdentity
            }
        } else if head.needs_eof {
            State::BodyEof
        } else {
            State::MessageDone
        };
        Ok(())
    }

    fn headers_done<C: Callbacks>(&mut self, cb: &mut C, pos: usize) -> Option<Outcome> {
        if self.in_trailers {
            self.state = State::MessageDone;
            return None;
        }
        if let Err((errno, reason)) = self.prepare_body() {
            return Some(self.fail(errno, reason));
        }
        let signal = cb.on_headers_complete(&self.head);
        self.after(signal, pos, "`on_headers_complete` callback error")
    }

    fn chunk_size_done(&mut self) {
        if self.remaining == 0 {
            self.in_trailers = true;
            self.in_value = false;
            self.state = State::HeaderLineStart;
        } else {
            self.state = State::ChunkData;
        }
    }

    /// Take up to `remaining` bytes of body from `data[pos..]`
    fn body_span<'d>(&mut self, data: &'d [u8], pos: usize) -> &'d [u8] {
        let available = data.len() - pos;
        let take = usize::try_from(self.remaining).map_or(available, |r| r.min(available));
        self.remaining -= take as u64;
        &data[pos..pos + take]
    }
}

impl Tokenize for Tokenizer {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            state: State::Start,
            head: Head::default(),
            framing: Framing::default(),
            errno: Errno::Ok,
            reason: None,
            paused: false,
            name: SmallVec::new(),
            name_len: 0,
            header: HeaderKind::Other,
            value: SmallVec::new(),
            value_overflow: false,
            in_value: false,
            value_seen: false,
            remaining: 0,
            in_trailers: false,
        }
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn execute<C: Callbacks>(&mut self, cb: &mut C, data: &[u8]) -> Outcome {
        if self.state == State::Dead {
            return Outcome::Error(self.errno);
        }
        if self.paused {
            return Outcome::Paused(0);
        }

        let len = data.len();
        let mut p = 0;

        loop {
            if self.state == State::MessageDone {
                let upgrade = self.head.upgrade;
                self.state = if upgrade || self.head.keep_alive {
                    State::Start
                } else {
                    State::Closed
                };
                self.in_trailers = false;
                notify!(self, cb.on_message_complete(), p, "`on_message_complete` callback error");
                if upgrade {
                    self.paused = true;
                    return Outcome::PausedUpgrade(p);
                }
                continue;
            }
            if p >= len {
                break;
            }
            let b = data[p];

            match self.state {
                State::Start => {
                    if b == CR || b == LF {
                        p += 1;
                        continue;
                    }
                    self.begin_message();
                    match self.mode {
                        Mode::Request => self.state = State::Method,
                        Mode::Response => {
                            self.head.is_response = true;
                            self.state = State::Constant(0);
                        }
                        Mode::Both if b == b'H' => {
                            self.state = State::StartBothH;
                            p += 1;
                        }
                        Mode::Both => self.state = State::Method,
                    }
                    notify!(self, cb.on_message_begin(), p, "`on_message_begin` callback error");
                }

                State::StartBothH => {
                    if b == b'T' {
                        self.head.is_response = true;
                        self.state = State::Constant(2);
                        p += 1;
                    } else {
                        self.name.push(b'H');
                        self.state = State::Method;
                    }
                }

                State::Method => {
                    if b == b' ' {
                        match Method::parse(&self.name) {
                            Some(method) => {
                                self.head.method = Some(method);
                                self.name.clear();
                                self.state = State::UrlStart;
                                p += 1;
                            }
                            None => return self.fail(Errno::InvalidMethod, "Invalid method encountered"),
                        }
                    } else if b.is_ascii_uppercase() || b == b'-' || b == b'_' {
                        self.name.push(b);
                        if !Method::is_prefix(&self.name) {
                            return self.fail(Errno::InvalidMethod, "Invalid method encountered");
                        }
                        p += 1;
                    } else {
                        return self.fail(Errno::InvalidMethod, "Invalid method encountered");
                    }
                }

                State::UrlStart => {
                    if b == b' ' || b == CR || b == LF {
                        return self.fail(Errno::InvalidUrl, "Unexpected start char in url");
                    }
                    self.state = State::Url;
                }

                State::Url => {
                    let rest = &data[p..];
                    let end = memchr3(b' ', CR, LF, rest).unwrap_or(rest.len());
                    let span = &rest[..end];
                    if span.iter().any(|&c| c < 0x21 || c == 0x7f) {
                        return self.fail(Errno::InvalidUrl, "Invalid characters in url");
                    }
                    p += end;
                    if !span.is_empty() {
                        notify!(self, cb.on_url(span), p, "`on_url` callback error");
                    }
                    if p < len {
                        if data[p] != b' ' {
                            return self.fail(Errno::InvalidConstant, "Expected HTTP/");
                        }
                        self.state = State::Constant(0);
                        p += 1;
                    }
                }

                State::Constant(i) => {
                    if b != PROTO[usize::from(i)] {
                        return self.fail(Errno::InvalidConstant, "Expected HTTP/");
                    }
                    self.state = if usize::from(i) + 1 == PROTO.len() {
                        State::VersionMajor
                    } else {
                        State::Constant(i + 1)
                    };
                    p += 1;
                }

                State::VersionMajor => {
                    if !b.is_ascii_digit() {
                        return self.fail(Errno::InvalidVersion, "Invalid major version");
                    }
                    self.head.http_major = b - b'0';
                    self.state = State::VersionDot;
                    p += 1;
                }

                State::VersionDot => {
                    if b != b'.' {
                        return self.fail(Errno::InvalidVersion, "Expected dot");
                    }
                    self.state = State::VersionMinor;
                    p += 1;
                }

                State::VersionMinor => {
                    if !b.is_ascii_digit() {
                        return self.fail(Errno::InvalidVersion, "Invalid minor version");
                    }
                    self.head.http_minor = b - b'0';
                    let version = (self.head.http_major, self.head.http_minor);
                    if !matches!(version, (0, 9) | (1, 0) | (1, 1) | (2, 0)) {
                        return self.fail(Errno::InvalidVersion, "Invalid HTTP version");
                    }
                    p += 1;
                    if self.head.is_response {
                        self.state = State::StatusSpace;
                    } else if self.head.method == Some(Method::Pri) && version == (2, 0) {
                        return self.fail(Errno::PausedH2Upgrade, "Pause on PRI/Upgrade");
                    } else {
                        self.state = State::RequestLineEnd;
                    }
                }

                State::RequestLineEnd => {
                    self.state = match b {
                        CR => State::Lf(Next::HeaderLine),
                        LF => State::HeaderLineStart,
                        _ => return self.fail(Errno::InvalidVersion, "Expected CRLF after version"),
                    };
                    p += 1;
                }

                State::StatusSpace => {
                    if b != b' ' {
                        return self.fail(Errno::InvalidVersion, "Expected space after version");
                    }
                    self.state = State::StatusCode(0);
                    p += 1;
                }

                State::StatusCode(digits) => {
                    if !b.is_ascii_digit() {
                        return self.fail(Errno::InvalidStatus, "Invalid status code");
                    }
                    self.head.status_code = self.head.status_code * 10 + u16::from(b - b'0');
                    self.state = if digits == 2 {
                        State::StatusCodeEnd
                    } else {
                        State::StatusCode(digits + 1)
                    };
                    p += 1;
                }

                State::StatusCodeEnd => {
                    self.state = match b {
                        b' ' => State::StatusText,
                        CR => State::Lf(Next::HeaderLine),
                        LF => State::HeaderLineStart,
                        _ => return self.fail(Errno::InvalidStatus, "Invalid response status"),
                    };
                    p += 1;
                }

                State::StatusText => {
                    let rest = &data[p..];
                    let end = memchr2(CR, LF, rest).unwrap_or(rest.len());
                    let span = &rest[..end];
                    if span.iter().any(|&c| is_ctl(c)) {
                        return self.fail(Errno::InvalidStatus, "Invalid character in status text");
                    }
                    p += end;
                    if !span.is_empty() {
                        notify!(self, cb.on_status(span), p, "`on_status` callback error");
                    }
                    if p < len {
                        self.state = if data[p] == CR {
                            State::Lf(Next::HeaderLine)
                        } else {
                            State::HeaderLineStart
                        };
                        p += 1;
                    }
                }

                State::Lf(next) => {
                    if b != LF {
                        return self.fail(Errno::LfExpected, "Expected LF after CR");
                    }
                    p += 1;
                    match next {
                        Next::HeaderLine => self.state = State::HeaderLineStart,
                        Next::HeadersDone => {
                            if let Some(outcome) = self.headers_done(cb, p) {
                                return outcome;
                            }
                        }
                        Next::ChunkSizeDone => self.chunk_size_done(),
                        Next::ChunkDataDone => self.state = State::ChunkSizeStart,
                    }
                }

                State::HeaderLineStart => match b {
                    CR => {
                        check!(self, self.finish_header_value());
                        self.state = State::Lf(Next::HeadersDone);
                        p += 1;
                    }
                    LF => {
                        check!(self, self.finish_header_value());
                        p += 1;
                        if let Some(outcome) = self.headers_done(cb, p) {
                            return outcome;
                        }
                    }
                    b' ' | b'\t' if self.in_value => {
                        // obs-fold: the value continues on this line
                        self.state = State::FoldWs;
                        self.push_value(b" ");
                        p += 1;
                        notify!(self, cb.on_header_value(b" "), p, "`on_header_value` callback error");
                    }
                    b' ' | b'\t' => {
                        return self.fail(Errno::InvalidHeaderToken, "Unexpected whitespace before header");
                    }
                    _ => {
                        check!(self, self.finish_header_value());
                        self.start_field();
                        self.state = State::HeaderField;
                    }
                },

                State::HeaderField => {
                    let rest = &data[p..];
                    let end = rest.iter().position(|&c| !is_token(c)).unwrap_or(rest.len());
                    let span = &rest[..end];
                    self.push_name(span);
                    p += end;
                    if !span.is_empty() {
                        notify!(self, cb.on_header_field(span), p, "`on_header_field` callback error");
                    }
                    if p < len {
                        if data[p] != b':' {
                            return self.fail(Errno::InvalidHeaderToken, "Invalid header token");
                        }
                        if self.name_len == 0 {
                            return self.fail(Errno::InvalidHeaderToken, "Empty header name");
                        }
                        self.header = self.classify_header();
                        self.in_value = true;
                        self.state = State::ValueWs;
                        p += 1;
                    }
                }

                State::ValueWs | State::FoldWs => {
                    if b == b' ' || b == b'\t' {
                        p += 1;
                    } else {
                        self.state = State::HeaderValue;
                    }
                }

                State::HeaderValue => {
                    let rest = &data[p..];
                    let end = memchr2(CR, LF, rest).unwrap_or(rest.len());
                    let span = &rest[..end];
                    if span.iter().any(|&c| is_ctl(c)) {
                        return self.fail(Errno::InvalidHeaderToken, "Invalid header value char");
                    }
                    self.push_value(span);
                    p += end;
                    if !span.is_empty() {
                        self.value_seen = true;
                        notify!(self, cb.on_header_value(span), p, "`on_header_value` callback error");
                    }
                    if p < len {
                        self.state = if data[p] == CR {
                            State::Lf(Next::HeaderLine)
                        } else {
                            State::HeaderLineStart
                        };
                        p += 1;
                        if !self.value_seen {
                            self.value_seen = true;
                            notify!(self, cb.on_header_value(&[]), p, "`on_header_value` callback error");
                        }
                    }
                }

                State::BodyIdentity => {
                    let span = self.body_span(data, p);
                    p += span.len();
                    if self.remaining == 0 {
                        self.state = State::MessageDone;
                    }
                    notify!(self, cb.on_body(span), p, "`on_body` callback error");
                }

                State::BodyEof => {
                    let span = &data[p..];
                    p = len;
                    notify!(self, cb.on_body(span), p, "`on_body` callback error");
                }

                State::ChunkSizeStart => {
                    let Some(digit) = hex_value(b) else {
                        return self.fail(Errno::InvalidChunkSize, "Invalid character in chunk size");
                    };
                    self.remaining = digit;
                    self.state = State::ChunkSize;
                    p += 1;
                }

                State::ChunkSize => {
                    if let Some(digit) = hex_value(b) {
                        match self.remaining.checked_mul(16).and_then(|r| r.checked_add(digit)) {
                            Some(size) => self.remaining = size,
                            None => return self.fail(Errno::InvalidChunkSize, "Chunk size overflow"),
                        }
                        p += 1;
                        continue;
                    }
                    p += 1;
                    match b {
                        b';' | b' ' | b'\t' => self.state = State::ChunkExtension,
                        CR => self.state = State::Lf(Next::ChunkSizeDone),
                        LF => self.chunk_size_done(),
                        _ => return self.fail(Errno::InvalidChunkSize, "Invalid character in chunk size"),
                    }
                }

                State::ChunkExtension => {
                    let rest = &data[p..];
                    match memchr2(CR, LF, rest) {
                        Some(end) => {
                            p += end + 1;
                            if rest[end] == CR {
                                self.state = State::Lf(Next::ChunkSizeDone);
                            } else {
                                self.chunk_size_done();
                            }
                        }
                        None => p = len,
                    }
                }

                State::ChunkData => {
                    let span = self.body_span(data, p);
                    p += span.len();
                    if self.remaining == 0 {
                        self.state = State::ChunkDataEnd;
                    }
                    notify!(self, cb.on_body(span), p, "`on_body` callback error");
                }

                State::ChunkDataEnd => {
                    self.state = match b {
                        CR => State::Lf(Next::ChunkDataDone),
                        LF => State::ChunkSizeStart,
                        _ => return self.fail(Errno::LfExpected, "Expected LF after chunk data"),
                    };
                    p += 1;
                }

                State::Closed => {
                    if b != CR && b != LF {
                        return self.fail(Errno::ClosedConnection, "Data after `Connection: close`");
                    }
                    p += 1;
                }

                State::MessageDone => continue,

                State::Dead => return Outcome::Error(self.errno),
            }
        }

        Outcome::Ok
    }

    fn finish<C: Callbacks>(&mut self, cb: &mut C) -> Outcome {
        match self.state {
            State::Dead => return Outcome::Error(self.errno),
            _ if self.paused => return Outcome::Paused(0),
            State::BodyEof => self.state = State::MessageDone,
            _ => {}
        }
        let outcome = self.execute(cb, &[]);
        if outcome != Outcome::Ok {
            return outcome;
        }
        match self.state {
            State::Start | State::Closed => Outcome::Ok,
            _ => self.fail(Errno::InvalidEofState, "Invalid EOF state"),
        }
    }

    fn pause(&mut self) {
        if self.state != State::Dead {
            self.paused = true;
        }
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn reset(&mut self) {
        *self = Self::new(self.mode);
    }

    fn head(&self) -> &Head {
        &self.head
    }

    fn errno(&self) -> Errno {
        self.errno
    }

    fn error_reason(&self) -> Option<&str> {
        self.reason
    }
}

/// RFC 9110 `tchar`
#[inline]
fn is_token(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        )
}

/// Control characters other than HTAB
#[inline]
fn is_ctl(c: u8) -> bool {
    (c < 0x20 && c != b'\t') || c == 0x7f
}

#[inline]
fn hex_value(c: u8) -> Option<u64> {
    match c {
        b'0'..=b'9' => Some(u64::from(c - b'0')),
        b'a'..=b'f' => Some(u64::from(c - b'a' + 10)),
        b'A'..=b'F' => Some(u64::from(c - b'A' + 10)),
        _ => None,
    }
}

fn trim_ows(mut s: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = s {
        s = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = s {
        s = rest;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every callback; adjacent fragments of one kind can be merged
    #[derive(Default)]
    struct Recorder {
        events: Vec<(&'static str, Vec<u8>)>,
        heads: Vec<Head>,
        pause_on: Option<&'static str>,
        fail_on: Option<&'static str>,
    }

    impl Recorder {
        fn record(&mut self, name: &'static str, at: &[u8]) -> Signal {
            self.events.push((name, at.to_vec()));
            if self.fail_on == Some(name) {
                Signal::Error
            } else if self.pause_on == Some(name) {
                Signal::Pause
            } else {
                Signal::Continue
            }
        }

        fn merged(&self) -> Vec<(&'static str, String)> {
            let mut out: Vec<(&'static str, String)> = Vec::new();
            for (name, data) in &self.events {
                let text = String::from_utf8_lossy(data).into_owned();
                match out.last_mut() {
                    Some((last, acc)) if *last == *name && !data.is_empty() && is_span(name) => {
                        acc.push_str(&text)
                    }
                    _ => out.push((name, text)),
                }
            }
            out
        }
    }

    fn is_span(name: &str) -> bool {
        matches!(name, "url" | "status" | "field" | "value" | "body")
    }

    impl Callbacks for Recorder {
        fn on_message_begin(&mut self) -> Signal {
            self.record("begin", b"")
        }
        fn on_url(&mut self, at: &[u8]) -> Signal {
            self.record("url", at)
        }
        fn on_status(&mut self, at: &[u8]) -> Signal {
            self.record("status", at)
        }
        fn on_header_field(&mut self, at: &[u8]) -> Signal {
            self.record("field", at)
        }
        fn on_header_value(&mut self, at: &[u8]) -> Signal {
            self.record("value", at)
        }
        fn on_headers_complete(&mut self, head: &Head) -> Signal {
            self.heads.push(*head);
            self.record("headers", b"")
        }
        fn on_body(&mut self, at: &[u8]) -> Signal {
            self.record("body", at)
        }
        fn on_message_complete(&mut self) -> Signal {
            self.record("complete", b"")
        }
    }

    fn run(mode: Mode, input: &[u8]) -> (Tokenizer, Recorder, Outcome) {
        let mut tokenizer = Tokenizer::new(mode);
        let mut recorder = Recorder::default();
        let outcome = tokenizer.execute(&mut recorder, input);
        (tokenizer, recorder, outcome)
    }

    fn ev(name: &'static str, text: &str) -> (&'static str, String) {
        (name, text.to_string())
    }

    #[test]
    fn test_simple_get() {
        let (tokenizer, recorder, outcome) =
            run(Mode::Request, b"GET /test HTTP/1.1\r\nHost: example.com\r\n\r\n");
        assert_eq!(outcome, Outcome::Ok);
        assert_eq!(
            recorder.merged(),
            vec![
                ev("begin", ""),
                ev("url", "/test"),
                ev("field", "Host"),
                ev("value", "example.com"),
                ev("headers", ""),
                ev("complete", ""),
            ]
        );
        let head = tokenizer.head();
        assert_eq!(head.method, Some(Method::Get));
        assert_eq!((head.http_major, head.http_minor), (1, 1));
        assert!(head.keep_alive);
        assert!(!head.needs_eof);
    }

    #[test]
    fn test_every_split_point_yields_same_fields() {
        let input: &[u8] = b"POST /api/test?x=1 HTTP/1.1\r\nHost: example.com\r\nX-Folded: a\r\n  b\r\nContent-Length: 13\r\n\r\n{\"test\":true}";
        let (_, whole, _) = run(Mode::Request, input);
        for split in 0..=input.len() {
            let mut tokenizer = Tokenizer::new(Mode::Request);
            let mut recorder = Recorder::default();
            assert_eq!(tokenizer.execute(&mut recorder, &input[..split]), Outcome::Ok);
            assert_eq!(tokenizer.execute(&mut recorder, &input[split..]), Outcome::Ok);
            assert_eq!(recorder.merged(), whole.merged(), "split at {}", split);
        }
    }

    #[test]
    fn test_byte_at_a_time_fragments_url() {
        let input = b"GET /abc HTTP/1.1\r\n\r\n";
        let mut tokenizer = Tokenizer::new(Mode::Request);
        let mut recorder = Recorder::default();
        for byte in input.chunks(1) {
            assert_eq!(tokenizer.execute(&mut recorder, byte), Outcome::Ok);
        }
        let url_fragments = recorder.events.iter().filter(|(n, _)| *n == "url").count();
        assert_eq!(url_fragments, 4);
        assert_eq!(recorder.merged()[1], ev("url", "/abc"));
    }

    #[test]
    fn test_response_with_status_text_and_body() {
        let (tokenizer, recorder, outcome) = run(
            Mode::Response,
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 3\r\n\r\nabc",
        );
        assert_eq!(outcome, Outcome::Ok);
        let merged = recorder.merged();
        assert_eq!(merged[1], ev("status", "Not Found"));
        assert_eq!(merged[merged.len() - 2], ev("body", "abc"));
        assert_eq!(tokenizer.head().status_code, 404);
        assert!(tokenizer.head().is_response);
    }

    #[test]
    fn test_chunked_body_with_trailer() {
        let (_, recorder, outcome) = run(
            Mode::Request,
            b"POST /c HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5;ext=1\r\nhello\r\n6\r\n world\r\n0\r\nX-Trailer: t\r\n\r\n",
        );
        assert_eq!(outcome, Outcome::Ok);
        let merged = recorder.merged();
        assert!(merged.contains(&ev("body", "hello world")));
        assert!(merged.contains(&ev("field", "X-Trailer")));
        assert_eq!(merged.last(), Some(&ev("complete", "")));
        assert_eq!(merged.iter().filter(|(n, _)| *n == "headers").count(), 1);
    }

    #[test]
    fn test_read_until_eof() {
        let mut tokenizer = Tokenizer::new(Mode::Response);
        let mut recorder = Recorder::default();
        let input = b"HTTP/1.0 200 OK\r\n\r\npart one, ";
        assert_eq!(tokenizer.execute(&mut recorder, input), Outcome::Ok);
        assert!(tokenizer.head().needs_eof);
        assert!(!tokenizer.head().keep_alive);
        assert_eq!(tokenizer.execute(&mut recorder, b"part two"), Outcome::Ok);
        assert_eq!(tokenizer.finish(&mut recorder), Outcome::Ok);
        let merged = recorder.merged();
        assert!(merged.contains(&ev("body", "part one, part two")));
        assert_eq!(merged.last(), Some(&ev("complete", "")));
    }

    #[test]
    fn test_no_body_statuses() {
        let (tokenizer, recorder, outcome) = run(Mode::Response, b"HTTP/1.1 204 No Content\r\n\r\n");
        assert_eq!(outcome, Outcome::Ok);
        assert!(!tokenizer.head().needs_eof);
        assert_eq!(recorder.merged().last(), Some(&ev("complete", "")));
    }

    #[test]
    fn test_invalid_method() {
        let (tokenizer, _, outcome) = run(Mode::Request, b"BADMETHOD / HTTP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Error(Errno::InvalidMethod));
        assert_eq!(tokenizer.error_reason(), Some("Invalid method encountered"));
    }

    #[test]
    fn test_dead_tokenizer_repeats_error() {
        let (mut tokenizer, mut recorder, _) = run(Mode::Request, b"get / HTTP/1.1\r\n");
        assert_eq!(
            tokenizer.execute(&mut recorder, b"GET / HTTP/1.1\r\n\r\n"),
            Outcome::Error(Errno::InvalidMethod)
        );
        tokenizer.reset();
        assert_eq!(tokenizer.errno(), Errno::Ok);
        assert_eq!(tokenizer.execute(&mut recorder, b"GET / HTTP/1.1\r\n\r\n"), Outcome::Ok);
    }

    #[test]
    fn test_invalid_header_token() {
        let (_, _, outcome) = run(Mode::Request, b"GET / HTTP/1.1\r\nBad Header: x\r\n\r\n");
        assert_eq!(outcome, Outcome::Error(Errno::InvalidHeaderToken));
    }

    #[test]
    fn test_invalid_version() {
        let (_, _, outcome) = run(Mode::Request, b"GET / HTTP/3.7\r\n\r\n");
        assert_eq!(outcome, Outcome::Error(Errno::InvalidVersion));
        let (_, _, outcome) = run(Mode::Request, b"GET / HTXP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Error(Errno::InvalidConstant));
    }

    #[test]
    fn test_invalid_status() {
        let (_, _, outcome) = run(Mode::Response, b"HTTP/1.1 2x0 OK\r\n\r\n");
        assert_eq!(outcome, Outcome::Error(Errno::InvalidStatus));
    }

    #[test]
    fn test_content_length_rules() {
        let (_, _, outcome) = run(
            Mode::Request,
            b"POST / HTTP/1.1\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\n",
        );
        assert_eq!(outcome, Outcome::Error(Errno::UnexpectedContentLength));

        let (_, _, outcome) = run(
            Mode::Request,
            b"POST / HTTP/1.1\r\nContent-Length: 1\r\nTransfer-Encoding: chunked\r\n\r\n",
        );
        assert_eq!(outcome, Outcome::Error(Errno::UnexpectedContentLength));

        let (_, _, outcome) = run(Mode::Request, b"POST / HTTP/1.1\r\nContent-Length: 1x\r\n\r\n");
        assert_eq!(outcome, Outcome::Error(Errno::InvalidContentLength));

        let (_, _, outcome) = run(
            Mode::Request,
            b"POST / HTTP/1.1\r\nContent-Length: 99999999999999999999999\r\n\r\n",
        );
        assert_eq!(outcome, Outcome::Error(Errno::InvalidContentLength));
    }

    #[test]
    fn test_request_with_unknown_transfer_encoding() {
        let (_, _, outcome) = run(
            Mode::Request,
            b"POST / HTTP/1.1\r\nTransfer-Encoding: gzip\r\n\r\n",
        );
        assert_eq!(outcome, Outcome::Error(Errno::InvalidTransferEncoding));
    }

    #[test]
    fn test_invalid_chunk_size() {
        let (_, _, outcome) = run(
            Mode::Request,
            b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n",
        );
        assert_eq!(outcome, Outcome::Error(Errno::InvalidChunkSize));
    }

    #[test]
    fn test_pause_from_callback() {
        let input = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n";
        let mut tokenizer = Tokenizer::new(Mode::Request);
        let mut recorder = Recorder {
            pause_on: Some("headers"),
            ..Recorder::default()
        };
        assert_eq!(tokenizer.execute(&mut recorder, input), Outcome::Paused(input.len()));
        assert!(tokenizer.is_paused());
        assert_eq!(tokenizer.execute(&mut recorder, b""), Outcome::Paused(0));

        tokenizer.resume();
        recorder.pause_on = None;
        assert_eq!(tokenizer.execute(&mut recorder, b""), Outcome::Ok);
        assert_eq!(recorder.merged().last(), Some(&ev("complete", "")));
    }

    #[test]
    fn test_callback_error() {
        let mut tokenizer = Tokenizer::new(Mode::Request);
        let mut recorder = Recorder {
            fail_on: Some("url"),
            ..Recorder::default()
        };
        let outcome = tokenizer.execute(&mut recorder, b"GET /x HTTP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Error(Errno::User));
        assert_eq!(tokenizer.error_reason(), Some("`on_url` callback error"));
    }

    #[test]
    fn test_upgrade_pauses_after_message() {
        let input = b"GET /chat HTTP/1.1\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n\x81\x05hello";
        let (tokenizer, recorder, outcome) = run(Mode::Request, input);
        let head_len = input.len() - 7;
        assert_eq!(outcome, Outcome::PausedUpgrade(head_len));
        assert!(tokenizer.head().upgrade);
        assert_eq!(recorder.merged().last(), Some(&ev("complete", "")));
    }

    #[test]
    fn test_connect_is_upgrade() {
        let (tokenizer, _, outcome) = run(Mode::Request, b"CONNECT example.com:443 HTTP/1.1\r\n\r\n");
        assert!(matches!(outcome, Outcome::PausedUpgrade(_)));
        assert_eq!(tokenizer.head().method, Some(Method::Connect));
    }

    #[test]
    fn test_h2_preface() {
        let (_, _, outcome) = run(Mode::Request, b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n");
        assert_eq!(outcome, Outcome::Error(Errno::PausedH2Upgrade));
    }

    #[test]
    fn test_pipelined_requests() {
        let (_, recorder, outcome) = run(
            Mode::Request,
            b"GET /one HTTP/1.1\r\n\r\nGET /two HTTP/1.1\r\n\r\n",
        );
        assert_eq!(outcome, Outcome::Ok);
        let urls: Vec<_> = recorder
            .merged()
            .into_iter()
            .filter(|(n, _)| *n == "url")
            .collect();
        assert_eq!(urls, vec![ev("url", "/one"), ev("url", "/two")]);
    }

    #[test]
    fn test_data_after_close() {
        let (tokenizer, _, outcome) = run(
            Mode::Request,
            b"GET / HTTP/1.0\r\n\r\nGET / HTTP/1.0\r\n\r\n",
        );
        assert_eq!(outcome, Outcome::Error(Errno::ClosedConnection));
        assert!(!tokenizer.head().keep_alive);
    }

    #[test]
    fn test_http10_keep_alive() {
        let (tokenizer, _, outcome) = run(
            Mode::Request,
            b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n",
        );
        assert_eq!(outcome, Outcome::Ok);
        assert!(tokenizer.head().keep_alive);
    }

    #[test]
    fn test_connection_close() {
        let (tokenizer, _, _) = run(Mode::Request, b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n");
        assert!(!tokenizer.head().keep_alive);
    }

    #[test]
    fn test_finish_mid_message() {
        let (mut tokenizer, mut recorder, _) = run(Mode::Request, b"GET /partial HT");
        assert_eq!(tokenizer.finish(&mut recorder), Outcome::Error(Errno::InvalidEofState));
    }

    #[test]
    fn test_finish_between_messages() {
        let (mut tokenizer, mut recorder, _) = run(Mode::Request, b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(tokenizer.finish(&mut recorder), Outcome::Ok);
        let mut fresh = Tokenizer::new(Mode::Request);
        assert_eq!(fresh.finish(&mut ()), Outcome::Ok);
    }

    #[test]
    fn test_both_mode_detects_message_type() {
        let (tokenizer, _, outcome) = run(Mode::Both, b"HEAD / HTTP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Ok);
        assert_eq!(tokenizer.head().method, Some(Method::Head));
        assert!(!tokenizer.head().is_response);

        let (tokenizer, _, outcome) = run(Mode::Both, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        assert_eq!(outcome, Outcome::Ok);
        assert!(tokenizer.head().is_response);
        assert_eq!(tokenizer.head().status_code, 200);
    }

    #[test]
    fn test_empty_header_value_is_reported() {
        let (_, recorder, _) = run(Mode::Request, b"GET / HTTP/1.1\r\nX-Empty:\r\nHost: a\r\n\r\n");
        assert_eq!(
            recorder.merged()[2..6].to_vec(),
            vec![ev("field", "X-Empty"), ev("value", ""), ev("field", "Host"), ev("value", "a")]
        );
    }

    #[test]
    fn test_leading_crlf_is_skipped() {
        let (_, recorder, outcome) = run(Mode::Request, b"\r\n\r\nGET / HTTP/1.1\r\n\r\n");
        assert_eq!(outcome, Outcome::Ok);
        assert_eq!(recorder.merged()[0], ev("begin", ""));
    }

    #[test]
    fn test_trim_ows() {
        assert_eq!(trim_ows(b"  chunked\t"), b"chunked");
        assert_eq!(trim_ows(b" \t "), b"");
    }
}
