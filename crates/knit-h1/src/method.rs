//! HTTP Method enum
//!
//! Numeric codes follow llhttp's method table so they can be exchanged with
//! other llhttp-based tooling unchanged.

/// HTTP Method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Method {
    Delete = 0,
    Get = 1,
    Head = 2,
    Post = 3,
    Put = 4,
    Connect = 5,
    Options = 6,
    Trace = 7,
    Copy = 8,
    Lock = 9,
    Mkcol = 10,
    Move = 11,
    Propfind = 12,
    Proppatch = 13,
    Search = 14,
    Unlock = 15,
    Bind = 16,
    Rebind = 17,
    Unbind = 18,
    Acl = 19,
    Report = 20,
    Mkactivity = 21,
    Checkout = 22,
    Merge = 23,
    MSearch = 24,
    Notify = 25,
    Subscribe = 26,
    Unsubscribe = 27,
    Patch = 28,
    Purge = 29,
    Mkcalendar = 30,
    Link = 31,
    Unlink = 32,
    Source = 33,
    Pri = 34,
    Query = 46,
}

impl Method {
    /// Every method the tokenizer accepts, in code order
    pub const ALL: [Method; 36] = [
        Method::Delete,
        Method::Get,
        Method::Head,
        Method::Post,
        Method::Put,
        Method::Connect,
        Method::Options,
        Method::Trace,
        Method::Copy,
        Method::Lock,
        Method::Mkcol,
        Method::Move,
        Method::Propfind,
        Method::Proppatch,
        Method::Search,
        Method::Unlock,
        Method::Bind,
        Method::Rebind,
        Method::Unbind,
        Method::Acl,
        Method::Report,
        Method::Mkactivity,
        Method::Checkout,
        Method::Merge,
        Method::MSearch,
        Method::Notify,
        Method::Subscribe,
        Method::Unsubscribe,
        Method::Patch,
        Method::Purge,
        Method::Mkcalendar,
        Method::Link,
        Method::Unlink,
        Method::Source,
        Method::Pri,
        Method::Query,
    ];

    /// Longest method name in the table (`MKACTIVITY`, `UNSUBSCRIBE`)
    pub const MAX_LEN: usize = 11;

    /// Parse method from bytes (exact, case-sensitive match)
    #[inline]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > Self::MAX_LEN {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().as_bytes() == bytes)
    }

    /// True if `bytes` is the start of at least one known method
    #[inline]
    pub fn is_prefix(bytes: &[u8]) -> bool {
        bytes.len() <= Self::MAX_LEN
            && Self::ALL
                .iter()
                .any(|m| m.as_str().as_bytes().starts_with(bytes))
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Copy => "COPY",
            Method::Lock => "LOCK",
            Method::Mkcol => "MKCOL",
            Method::Move => "MOVE",
            Method::Propfind => "PROPFIND",
            Method::Proppatch => "PROPPATCH",
            Method::Search => "SEARCH",
            Method::Unlock => "UNLOCK",
            Method::Bind => "BIND",
            Method::Rebind => "REBIND",
            Method::Unbind => "UNBIND",
            Method::Acl => "ACL",
            Method::Report => "REPORT",
            Method::Mkactivity => "MKACTIVITY",
            Method::Checkout => "CHECKOUT",
            Method::Merge => "MERGE",
            Method::MSearch => "M-SEARCH",
            Method::Notify => "NOTIFY",
            Method::Subscribe => "SUBSCRIBE",
            Method::Unsubscribe => "UNSUBSCRIBE",
            Method::Patch => "PATCH",
            Method::Purge => "PURGE",
            Method::Mkcalendar => "MKCALENDAR",
            Method::Link => "LINK",
            Method::Unlink => "UNLINK",
            Method::Source => "SOURCE",
            Method::Pri => "PRI",
            Method::Query => "QUERY",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
