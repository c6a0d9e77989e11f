//! Parser configuration

use crate::MergePolicy;

/// Parser session configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserConfig {
    /// Storage of repeated header names
    pub merge_policy: MergePolicy,
    /// Replace raw status-text events with one `status` event carrying the
    /// numeric code, fired just before `headersComplete` on responses
    pub synthesize_status_event: bool,
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// Last value wins for repeated header names
    pub fn overwrite_headers(mut self) -> Self {
        self.merge_policy = MergePolicy::Overwrite;
        self
    }

    pub fn synthesize_status_event(mut self, enabled: bool) -> Self {
        self.synthesize_status_event = enabled;
        self
    }
}
