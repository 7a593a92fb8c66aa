use compact_str::CompactString;
use std::fmt;

/// A single `(name, class, type)` tuple taken from a query's question section.
///
/// The name is kept exactly as received so that it can serve as the cache key;
/// [`Question::routing_name`] gives the form used for suffix routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Question {
    pub name: CompactString,
    pub qclass: u16,
    pub qtype: u16,
}

impl Question {
    pub fn new(name: impl Into<CompactString>, qclass: u16, qtype: u16) -> Self {
        Self {
            name: name.into(),
            qclass,
            qtype,
        }
    }

    /// Name with every trailing dot removed.
    pub fn routing_name(&self) -> &str {
        strip_trailing_dots(&self.name)
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} class={} type={}", self.name, self.qclass, self.qtype)
    }
}

pub fn strip_trailing_dots(name: &str) -> &str {
    name.trim_end_matches('.')
}
