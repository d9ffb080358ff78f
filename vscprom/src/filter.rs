//! Counter selection
//!
//! Patterns follow `varnishstat -f`: a glob where `*` matches any run of
//! characters, and a leading `^` turns the pattern into an exclusion. With no
//! inclusion pattern every counter is included. Exclusions always win.

use regex::Regex;

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Filter::new`]
pub enum Error {
    /// A pattern could not be compiled.
    #[error("Invalid filter pattern {pattern:?}: {source}")]
    Pattern {
        /// The pattern as given
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },
}

/// Compile a glob to an anchored regex, everything but `*` taken literally.
fn glob(pattern: &str) -> Result<Regex, regex::Error> {
    let pieces: Vec<String> = pattern.split('*').map(regex::escape).collect();
    Regex::new(&format!("(?s)^{}$", pieces.join(".*")))
}

/// A set of inclusion and exclusion globs.
#[derive(Debug, Default, Clone)]
pub struct Filter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl Filter {
    /// Build a filter from `varnishstat -f` style patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern cannot be compiled.
    pub fn new<I, S>(patterns: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let (globs, body) = match pattern.strip_prefix('^') {
                Some(excluded) => (&mut filter.exclude, excluded),
                None => (&mut filter.include, pattern),
            };
            let regex = glob(body).map_err(|source| Error::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;
            globs.push(regex);
        }
        Ok(filter)
    }

    /// Whether the counter called `name` is selected.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        if self.exclude.iter().any(|re| re.is_match(name)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|re| re.is_match(name))
    }

    /// Whether the filter selects everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}
