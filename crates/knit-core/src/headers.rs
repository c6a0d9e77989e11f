//! Case-insensitive header collection

use crate::{Error, Result};
use smallvec::SmallVec;

/// How a repeated header name is stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Keep every value in arrival order (`Set-Cookie` safe)
    #[default]
    MultiValue,
    /// Last value wins; the entry keeps its original position
    Overwrite,
}

/// Parsed headers keyed by lower-cased name.
///
/// Enumeration follows the first occurrence of each name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, SmallVec<[String; 1]>)>,
}

impl Headers {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value under `name` according to `policy`
    pub fn insert(&mut self, name: &str, value: String, policy: MergePolicy) {
        let key = name.to_ascii_lowercase();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => match policy {
                MergePolicy::MultiValue => values.push(value),
                MergePolicy::Overwrite => {
                    values.clear();
                    values.push(value);
                }
            },
            None => {
                let mut values = SmallVec::new();
                values.push(value);
                self.entries.push((key, values));
            }
        }
    }

    /// First value for `name` (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values(name)
            .and_then(|values| values.first())
            .map(|v| v.as_str())
    }

    /// Every value for `name`, in arrival order
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values(name).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values(name).is_some()
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, values)` in first-occurrence order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Convert to an `http::HeaderMap`, keeping every value
    pub fn to_header_map(&self) -> Result<http::HeaderMap> {
        let mut map = http::HeaderMap::with_capacity(self.entries.len());
        for (name, values) in &self.entries {
            let key = http::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidHeader(name.clone()))?;
            for value in values {
                let value = http::header::HeaderValue::from_str(value)
                    .map_err(|_| Error::InvalidHeader(format!("{}: {}", name, value)))?;
                map.append(key.clone(), value);
            }
        }
        Ok(map)
    }

    fn values(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }
}
