//! The counter records handed to a render pass.

use std::fmt;

/// The declared C type of the only counters a pass processes.
pub const UINT64: &str = "uint64_t";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// The declared numeric kind of a [`Counter`].
pub enum Kind {
    /// A 64 bit unsigned integer, `uint64_t` in the shared memory segment.
    Uint64,
    /// Anything else. The original text is kept for diagnostics.
    Other(String),
}

impl From<&str> for Kind {
    fn from(s: &str) -> Self {
        if s == UINT64 {
            Self::Uint64
        } else {
            Self::Other(s.to_string())
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Uint64 => f.write_str(UINT64),
            Kind::Other(kind) => f.write_str(kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One named measurement from a stats snapshot.
pub struct Counter {
    /// Dotted identifier, for example `MAIN.cache_hit` or
    /// `VBE.boot.default(127.0.0.1,,80).happy`.
    pub name: String,
    /// Short human description.
    pub description: String,
    /// The declared numeric kind.
    pub kind: Kind,
    /// The raw value.
    pub value: u64,
}

impl Counter {
    /// Create a new [`Counter`].
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: impl Into<Kind>,
        value: u64,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: kind.into(),
            value,
        }
    }

    /// Create a new `uint64_t` [`Counter`].
    #[must_use]
    pub fn uint64(name: impl Into<String>, description: impl Into<String>, value: u64) -> Self {
        Self::new(name, description, Kind::Uint64, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_str() {
        assert_eq!(Kind::from("uint64_t"), Kind::Uint64);
        assert_eq!(Kind::from("double"), Kind::Other("double".to_string()));
        assert_eq!(Kind::from("UINT64_T"), Kind::Other("UINT64_T".to_string()));
    }

    #[test]
    fn kind_display_round_trips_text() {
        assert_eq!(Kind::Uint64.to_string(), "uint64_t");
        assert_eq!(Kind::Other("bitmap".to_string()).to_string(), "bitmap");
    }
}
