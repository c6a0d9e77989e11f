//! Reassembly of fragmented fields
//!
//! The tokenizer reports each field in as many pieces as the input was
//! chunked into. The accumulator concatenates them and turns each completed
//! header name/value pair into an entry of [`Headers`].

use crate::{Headers, MergePolicy};
use bytes::BytesMut;

/// Which header fragment arrived last
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    None,
    Field,
    Value,
}

/// Accumulated message fields
#[derive(Debug)]
pub struct Accumulator {
    url: BytesMut,
    status_text: BytesMut,
    body: BytesMut,
    pending_field: BytesMut,
    pending_value: BytesMut,
    headers: Headers,
    last: Last,
    policy: MergePolicy,
}

impl Accumulator {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            url: BytesMut::new(),
            status_text: BytesMut::new(),
            body: BytesMut::new(),
            pending_field: BytesMut::new(),
            pending_value: BytesMut::new(),
            headers: Headers::new(),
            last: Last::None,
            policy,
        }
    }

    pub fn push_url(&mut self, fragment: &[u8]) {
        self.url.extend_from_slice(fragment);
    }

    pub fn push_status(&mut self, fragment: &[u8]) {
        self.status_text.extend_from_slice(fragment);
    }

    pub fn push_body(&mut self, fragment: &[u8]) {
        self.body.extend_from_slice(fragment);
    }

    /// A name fragment; a name following a value starts a new pair
    pub fn push_field(&mut self, fragment: &[u8]) {
        if self.last == Last::Value {
            self.commit();
        }
        self.pending_field.extend_from_slice(fragment);
        self.last = Last::Field;
    }

    pub fn push_value(&mut self, fragment: &[u8]) {
        self.pending_value.extend_from_slice(fragment);
        self.last = Last::Value;
    }

    /// Move the pending pair into the header collection
    pub fn commit(&mut self) {
        if !self.pending_field.is_empty() {
            let name = String::from_utf8_lossy(&self.pending_field);
            let value = String::from_utf8_lossy(trim_ows(&self.pending_value)).into_owned();
            self.headers.insert(&name, value, self.policy);
        }
        self.pending_field.clear();
        self.pending_value.clear();
        self.last = Last::None;
    }

    pub fn url(&self) -> &[u8] {
        &self.url
    }

    pub fn status_text(&self) -> &[u8] {
        &self.status_text
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The uncommitted pair, if a name has started
    pub fn pending(&self) -> Option<(String, String)> {
        if self.pending_field.is_empty() {
            return None;
        }
        Some((
            String::from_utf8_lossy(&self.pending_field).into_owned(),
            String::from_utf8_lossy(&self.pending_value).into_owned(),
        ))
    }

    /// Drop everything accumulated, keeping the merge policy
    pub fn clear(&mut self) {
        self.url.clear();
        self.status_text.clear();
        self.body.clear();
        self.pending_field.clear();
        self.pending_value.clear();
        self.headers.clear();
        self.last = Last::None;
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

    #[test]
    fn test_fragments_concatenate() {
        let mut acc = Accumulator::new(MergePolicy::MultiValue);
        acc.push_url(b"/a");
        acc.push_url(b"bc");
        acc.push_body(b"hel");
        acc.push_body(b"lo");
        assert_eq!(acc.url(), b"/abc");
        assert_eq!(acc.body(), b"hello");
    }

    #[test]
    fn test_split_header_pair() {
        let mut acc = Accumulator::new(MergePolicy::MultiValue);
        acc.push_field(b"Con");
        acc.push_field(b"tent-Type");
        acc.push_value(b"text/");
        acc.push_value(b"html  ");
        assert_eq!(
            acc.pending(),
            Some(("Content-Type".to_string(), "text/html  ".to_string()))
        );

        acc.push_field(b"Host");
        assert_eq!(acc.headers().get("content-type"), Some("text/html"));
        assert_eq!(acc.pending(), Some(("Host".to_string(), String::new())));

        acc.push_value(b"example.com");
        acc.commit();
        assert_eq!(acc.headers().get("host"), Some("example.com"));
        assert_eq!(acc.pending(), None);
    }

    #[test]
    fn test_fold_after_empty_value() {
        let mut acc = Accumulator::new(MergePolicy::MultiValue);
        acc.push_field(b"X");
        acc.push_value(b"");
        acc.push_value(b" ");
        acc.push_value(b"v");
        acc.commit();
        assert_eq!(acc.headers().get("x"), Some("v"));
    }

    #[test]
    fn test_empty_value_is_kept() {
        let mut acc = Accumulator::new(MergePolicy::MultiValue);
        acc.push_field(b"X-Empty");
        acc.push_value(b"");
        acc.commit();
        assert_eq!(acc.headers().get("x-empty"), Some(""));
    }

    #[test]
    fn test_commit_without_field_is_dropped() {
        let mut acc = Accumulator::new(MergePolicy::MultiValue);
        acc.push_value(b"orphan");
        acc.commit();
        assert!(acc.headers().is_empty());
    }

    #[test]
    fn test_policy_applies() {
        let mut acc = Accumulator::new(MergePolicy::Overwrite);
        for value in [&b"a"[..], b"b"] {
            acc.push_field(b"X-Dup");
            acc.push_value(value);
        }
        acc.commit();
        assert_eq!(acc.headers().get_all("x-dup"), ["b"]);
    }

    #[test]
    fn test_clear() {
        let mut acc = Accumulator::new(MergePolicy::MultiValue);
        acc.push_url(b"/");
        acc.push_field(b"Host");
        acc.clear();
        assert!(acc.url().is_empty());
        assert_eq!(acc.pending(), None);
    }
}
