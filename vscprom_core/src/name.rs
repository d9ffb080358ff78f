//! Structural markers of a dotted counter name
//!
//! Counter names are semi-structured: `PREFIX.ident.field`, where `ident` may
//! itself contain dots or a parenthesized address and `field` may contain
//! underscores. This module locates the markers the classifier works from in
//! one left-to-right scan. All positions are byte offsets. Every marker is an
//! ASCII byte so slicing at them never splits a UTF-8 sequence.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Marker positions of a counter name.
pub struct ParsedName<'a> {
    name: &'a str,
    /// First `.`
    pub first_dot: Option<usize>,
    /// First `.` strictly after `first_dot`
    pub second_dot: Option<usize>,
    /// Last `.`
    pub last_dot: Option<usize>,
    /// First `(`
    pub paren_open: Option<usize>,
    /// Last `)`
    pub paren_close: Option<usize>,
    /// First `_` after `last_dot`
    pub underscore: Option<usize>,
}

/// Scan `name` once, recording its markers.
#[must_use]
pub fn parse(name: &str) -> ParsedName<'_> {
    let mut parsed = ParsedName {
        name,
        first_dot: None,
        second_dot: None,
        last_dot: None,
        paren_open: None,
        paren_close: None,
        underscore: None,
    };

    for (idx, byte) in name.bytes().enumerate() {
        match byte {
            b'.' => {
                if parsed.first_dot.is_none() {
                    parsed.first_dot = Some(idx);
                } else if parsed.second_dot.is_none() {
                    parsed.second_dot = Some(idx);
                }
                parsed.last_dot = Some(idx);
                // An underscore only counts once no dot follows it.
                parsed.underscore = None;
            }
            b'(' if parsed.paren_open.is_none() => parsed.paren_open = Some(idx),
            b')' => parsed.paren_close = Some(idx),
            b'_' if parsed.underscore.is_none() => parsed.underscore = Some(idx),
            _ => {}
        }
    }

    parsed
}

impl<'a> ParsedName<'a> {
    /// The name this was parsed from.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Text before the first dot, `None` if the name has no dot.
    #[must_use]
    pub fn prefix(&self) -> Option<&'a str> {
        self.first_dot.map(|dot| &self.name[..dot])
    }

    /// Text after the last dot, `None` if the name has no dot.
    #[must_use]
    pub fn suffix(&self) -> Option<&'a str> {
        self.last_dot.map(|dot| &self.name[dot + 1..])
    }

    /// Text strictly between the first and last dot, `None` when the name has
    /// fewer than two dots.
    #[must_use]
    pub fn ident(&self) -> Option<&'a str> {
        match (self.first_dot, self.last_dot) {
            (Some(first), Some(last)) if first < last => Some(&self.name[first + 1..last]),
            _ => None,
        }
    }

    /// Text strictly between byte offsets `start` and `end`.
    ///
    /// Callers must only pass offsets of recorded markers with `start < end`.
    pub(crate) fn between(&self, start: usize, end: usize) -> &'a str {
        &self.name[start + 1..end]
    }
}
