//! Line parser for the Prometheus text exposition format
//!
//! Each line is classified on its own. Whether lines fit together into
//! families is decided by [`super::check`].
//! <https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md>

use std::str::FromStr;

/// Type alias for label pairs
pub type LabelPairs = Vec<(String, String)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Prometheus metric types
pub enum MetricType {
    /// A single value that can go up and down
    Gauge,
    /// A monotonically increasing value
    Counter,
    /// Bucketed observations
    Histogram,
    /// Quantiles over observations
    Summary,
    /// No type information
    Untyped,
}

impl MetricType {
    /// Whether a sample called `sample` belongs to a family called `family`
    /// of this type.
    #[must_use]
    pub fn owns(self, family: &str, sample: &str) -> bool {
        if sample == family {
            return true;
        }
        let suffixes: &[&str] = match self {
            MetricType::Histogram => &["_bucket", "_sum", "_count"],
            MetricType::Summary => &["_sum", "_count"],
            MetricType::Gauge | MetricType::Counter | MetricType::Untyped => &[],
        };
        sample
            .strip_prefix(family)
            .is_some_and(|suffix| suffixes.contains(&suffix))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
/// Errors that can occur while parsing a line
pub enum ParseError {
    /// Unknown metric type in a TYPE line
    #[error("Unknown metric type: {0}")]
    UnknownMetricType(String),
    /// The line is not shaped like any known line
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    /// The sample value is not a float
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// A sample without a value
    #[error("Missing value")]
    MissingValue,
    /// A sample without a metric name
    #[error("Missing metric name")]
    MissingName,
    /// A malformed label set
    #[error("Invalid label: {0}")]
    InvalidLabel(String),
}

impl FromStr for MetricType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(Self::Counter),
            "gauge" => Ok(Self::Gauge),
            "histogram" => Ok(Self::Histogram),
            "summary" => Ok(Self::Summary),
            "untyped" => Ok(Self::Untyped),
            _ => Err(ParseError::UnknownMetricType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A sample line
pub struct Sample<'a> {
    /// The metric name
    pub name: &'a str,
    /// Label pairs in line order, values unescaped
    pub labels: LabelPairs,
    /// The sample value
    pub value: f64,
    /// Optional timestamp in milliseconds since Unix epoch
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
/// One line of exposition text
pub enum Line<'a> {
    /// Empty or whitespace only
    Blank,
    /// `# HELP <name> <text>`
    Help {
        /// Family name
        name: &'a str,
        /// Docstring, possibly empty
        text: &'a str,
    },
    /// `# TYPE <name> <type>`
    Type {
        /// Family name
        name: &'a str,
        /// Declared type
        metric_type: MetricType,
    },
    /// Any other line starting with `#`
    Comment(&'a str),
    /// A sample
    Sample(Sample<'a>),
}

/// Parse a single line of exposition text.
///
/// # Errors
///
/// Returns an error if the line is neither blank, a comment, nor a well formed
/// sample.
pub fn parse_line(line: &str) -> Result<Line<'_>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Line::Blank);
    }

    if let Some(comment) = line.strip_prefix('#') {
        let comment = comment.trim_start();
        return match keyword(comment) {
            Some(("HELP", rest)) => help(rest),
            Some(("TYPE", rest)) => type_line(rest),
            _ => Ok(Line::Comment(comment)),
        };
    }

    sample(line).map(Line::Sample)
}

fn keyword(comment: &str) -> Option<(&str, &str)> {
    let (word, rest) = comment.split_once(char::is_whitespace)?;
    Some((word, rest.trim_start()))
}

fn help(rest: &str) -> Result<Line<'_>, ParseError> {
    let (name, text) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(name, text)| (name, text.trim_start()));
    if name.is_empty() {
        return Err(ParseError::MissingName);
    }
    validate_metric_name(name)?;
    Ok(Line::Help { name, text })
}

fn type_line(rest: &str) -> Result<Line<'_>, ParseError> {
    let mut parts = rest.split_ascii_whitespace();
    let name = parts.next().ok_or(ParseError::MissingName)?;
    validate_metric_name(name)?;
    let metric_type = parts
        .next()
        .ok_or_else(|| ParseError::InvalidFormat("missing metric type in TYPE line".to_string()))?
        .parse()?;
    if let Some(extra) = parts.next() {
        return Err(ParseError::InvalidFormat(format!(
            "trailing data in TYPE line: {extra}"
        )));
    }
    Ok(Line::Type { name, metric_type })
}

fn sample(line: &str) -> Result<Sample<'_>, ParseError> {
    let end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .unwrap_or(line.len());
    let (name, rest) = line.split_at(end);
    if name.is_empty() {
        return Err(ParseError::MissingName);
    }
    validate_metric_name(name)?;

    let (labels, rest) = match rest.strip_prefix('{') {
        Some(inner) => parse_labels(inner)?,
        None => (Vec::new(), rest),
    };
    let (value, timestamp) = value_and_timestamp(rest)?;

    Ok(Sample {
        name,
        labels,
        value,
        timestamp,
    })
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
fn validate_metric_name(name: &str) -> Result<(), ParseError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':');
    if valid {
        Ok(())
    } else {
        Err(ParseError::InvalidFormat(format!(
            "invalid metric name: {name}"
        )))
    }
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, not starting with `__`
fn validate_label_name(name: &str) -> Result<(), ParseError> {
    if name.is_empty() {
        return Err(ParseError::InvalidLabel("empty label name".to_string()));
    }
    if name.starts_with("__") {
        return Err(ParseError::InvalidLabel(format!(
            "label name {name} is reserved"
        )));
    }
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ParseError::InvalidLabel(format!(
            "invalid label name: {name}"
        )))
    }
}

/// Parse the label set following `{`, returning the labels and the text after
/// the closing `}`.
fn parse_labels(mut rest: &str) -> Result<(LabelPairs, &str), ParseError> {
    let mut labels = Vec::new();

    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((labels, after));
        }

        let (name, after) = rest
            .split_once('=')
            .ok_or_else(|| ParseError::InvalidLabel(format!("label missing '=': {rest}")))?;
        let name = name.trim();
        validate_label_name(name)?;

        let after = after
            .trim_start()
            .strip_prefix('"')
            .ok_or_else(|| ParseError::InvalidLabel(format!("value of {name} is not quoted")))?;
        let (value, after) = quoted(after)?;
        labels.push((name.to_string(), value));

        rest = after.trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after;
        } else if !rest.starts_with('}') {
            return Err(ParseError::InvalidLabel(format!(
                "expected ',' or '}}' after value of {name}"
            )));
        }
    }
}

/// Read a label value up to its closing quote, returning the unescaped value
/// and the text after the quote.
fn quoted(s: &str) -> Result<(String, &str), ParseError> {
    let mut value = String::new();
    let mut chars = s.char_indices();

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '"' => return Ok((value, &s[idx + 1..])),
            '\\' => match chars.next() {
                Some((_, '\\')) => value.push('\\'),
                Some((_, '"')) => value.push('"'),
                Some((_, 'n')) => value.push('\n'),
                Some((_, c)) => {
                    return Err(ParseError::InvalidLabel(format!(
                        "invalid escape sequence: \\{c}"
                    )));
                }
                None => break,
            },
            _ => value.push(ch),
        }
    }

    Err(ParseError::InvalidLabel(
        "unterminated label value".to_string(),
    ))
}

fn value_and_timestamp(rest: &str) -> Result<(f64, Option<i64>), ParseError> {
    let mut parts = rest.split_whitespace();
    let value = parts.next().ok_or(ParseError::MissingValue)?;

    let value = match value {
        "NaN" => f64::NAN,
        "+Inf" => f64::INFINITY,
        "-Inf" => f64::NEG_INFINITY,
        _ => value
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidValue(value.to_string()))?,
    };

    let timestamp = parts
        .next()
        .map(|ts| {
            ts.parse::<i64>()
                .map_err(|_| ParseError::InvalidFormat(format!("invalid timestamp: {ts}")))
        })
        .transpose()?;

    if let Some(extra) = parts.next() {
        return Err(ParseError::InvalidFormat(format!(
            "trailing data after sample: {extra}"
        )));
    }

    Ok((value, timestamp))
}
