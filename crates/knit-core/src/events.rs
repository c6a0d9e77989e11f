//! Parser events and the per-kind handler table
//!
//! Each [`EventKind`] has at most one handler. Registering again replaces
//! the previous handler; firing a kind with no handler does nothing.

use crate::Error;
use knit_h1::Head;
use std::fmt;
use std::str::FromStr;

/// Kind of parser event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    MessageBegin = 0,
    Url = 1,
    Status = 2,
    HeaderField = 3,
    HeaderValue = 4,
    HeadersComplete = 5,
    Body = 6,
    MessageComplete = 7,
}

impl EventKind {
    /// All kinds in firing order
    pub const ALL: [EventKind; 8] = [
        EventKind::MessageBegin,
        EventKind::Url,
        EventKind::Status,
        EventKind::HeaderField,
        EventKind::HeaderValue,
        EventKind::HeadersComplete,
        EventKind::Body,
        EventKind::MessageComplete,
    ];

    /// Event name as used by `Parser::on_named`
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::MessageBegin => "messageBegin",
            EventKind::Url => "url",
            EventKind::Status => "status",
            EventKind::HeaderField => "headerField",
            EventKind::HeaderValue => "headerValue",
            EventKind::HeadersComplete => "headersComplete",
            EventKind::Body => "body",
            EventKind::MessageComplete => "messageComplete",
        }
    }

    /// Look up a kind by its exact name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::UnknownEvent(s.to_string()))
    }
}

/// An event with its payload.
///
/// Data events borrow the fragment delivered by the tokenizer; it is only
/// valid for the duration of the handler call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    MessageBegin,
    Url(&'a [u8]),
    Status(&'a [u8]),
    HeaderField(&'a [u8]),
    HeaderValue(&'a [u8]),
    HeadersComplete(&'a Head),
    Body(&'a [u8]),
    MessageComplete,
}

impl<'a> Event<'a> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::MessageBegin => EventKind::MessageBegin,
            Event::Url(_) => EventKind::Url,
            Event::Status(_) => EventKind::Status,
            Event::HeaderField(_) => EventKind::HeaderField,
            Event::HeaderValue(_) => EventKind::HeaderValue,
            Event::HeadersComplete(_) => EventKind::HeadersComplete,
            Event::Body(_) => EventKind::Body,
            Event::MessageComplete => EventKind::MessageComplete,
        }
    }

    /// Fragment carried by the event (empty for signal events)
    pub fn data(&self) -> &'a [u8] {
        match *self {
            Event::Url(data)
            | Event::Status(data)
            | Event::HeaderField(data)
            | Event::HeaderValue(data)
            | Event::Body(data) => data,
            Event::MessageBegin | Event::HeadersComplete(_) | Event::MessageComplete => &[],
        }
    }
}

/// What the parser should do after a handler returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Flow {
    #[default]
    Continue,
    /// Stop consuming input right after this event
    Pause,
}

/// Error returned by a handler
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Handler return type
pub type HandlerResult = std::result::Result<Flow, HandlerError>;

/// Boxed event handler
pub type Handler = Box<dyn FnMut(&Event<'_>) -> HandlerResult + Send>;

/// One optional handler per event kind
#[derive(Default)]
pub struct Observers {
    handlers: [Option<Handler>; 8],
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, replacing any previous one
    pub fn set(&mut self, kind: EventKind, handler: Handler) {
        self.handlers[kind.index()] = Some(handler);
    }

    /// Remove the handler for `kind`; returns whether one was registered
    pub fn remove(&mut self, kind: EventKind) -> bool {
        self.handlers[kind.index()].take().is_some()
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers[kind.index()].is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.iter().all(Option::is_none)
    }

    /// Run the handler for the event's kind, if any
    pub fn dispatch(&mut self, event: &Event<'_>) -> HandlerResult {
        match &mut self.handlers[event.kind().index()] {
            Some(handler) => handler(event),
            None => Ok(Flow::Continue),
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(
                EventKind::ALL
                    .iter()
                    .filter(|k| self.is_registered(**k))
                    .map(|k| k.name()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn handler(f: impl FnMut(&Event<'_>) -> HandlerResult + Send + 'static) -> Handler {
        Box::new(f)
    }

    #[test]
    fn test_event_names() {
        assert_eq!(EventKind::MessageBegin.name(), "messageBegin");
        assert_eq!(EventKind::HeadersComplete.to_string(), "headersComplete");
        assert_eq!(EventKind::from_name("headerValue"), Some(EventKind::HeaderValue));
        assert_eq!(EventKind::from_name("HeaderValue"), None);
        assert!(matches!("nope".parse::<EventKind>(), Err(Error::UnknownEvent(_))));
        for kind in EventKind::ALL {
            assert_eq!(kind.name().parse::<EventKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_event_data() {
        assert_eq!(Event::Url(b"/a").data(), b"/a");
        assert_eq!(Event::Url(b"/a").kind(), EventKind::Url);
        assert!(Event::MessageComplete.data().is_empty());
        let head = Head::default();
        assert!(Event::HeadersComplete(&head).data().is_empty());
    }

    #[test]
    fn test_dispatch_without_handler() {
        let mut observers = Observers::new();
        assert!(observers.is_empty());
        assert_eq!(observers.dispatch(&Event::MessageBegin).unwrap(), Flow::Continue);
    }

    #[test]
    fn test_set_replaces_handler() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut observers = Observers::new();

        let first = calls.clone();
        observers.set(
            EventKind::Url,
            handler(move |_| {
                first.lock().unwrap().push("first");
                Ok(Flow::Continue)
            }),
        );
        let second = calls.clone();
        observers.set(
            EventKind::Url,
            handler(move |_| {
                second.lock().unwrap().push("second");
                Ok(Flow::Pause)
            }),
        );

        assert_eq!(observers.dispatch(&Event::Url(b"/")).unwrap(), Flow::Pause);
        assert_eq!(*calls.lock().unwrap(), ["second"]);
        assert_eq!(format!("{:?}", observers), "{\"url\"}");

        assert!(observers.remove(EventKind::Url));
        assert!(!observers.remove(EventKind::Url));
        assert!(observers.is_empty());
    }

    #[test]
    fn test_handler_error() {
        let mut observers = Observers::new();
        observers.set(EventKind::Body, handler(|_| Err("rejected".into())));
        let err = observers.dispatch(&Event::Body(b"x")).unwrap_err();
        assert_eq!(err.to_string(), "rejected");
    }
}
