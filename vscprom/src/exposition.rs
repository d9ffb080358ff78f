//! Structural check of rendered exposition text
//!
//! Every line must parse, every `# HELP` must be followed directly by the
//! matching `# TYPE`, every sample must belong to the family most recently
//! opened and the text must end in a newline.

use rustc_hash::FxHashSet;
use tracing::warn;

pub mod parser;

use parser::{Line, MetricType, ParseError};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
/// Errors produced by [`check`]
pub enum Error {
    /// A line failed to parse.
    #[error("Line {line}: {source}")]
    Parse {
        /// One-based line number
        line: usize,
        /// Underlying parse error
        #[source]
        source: ParseError,
    },
    /// A `# HELP` line was not followed by its `# TYPE` line.
    #[error("Line {line}: HELP for {name} is not followed by its TYPE")]
    HelpWithoutType {
        /// Line of the `# HELP`
        line: usize,
        /// Family named by the `# HELP`
        name: String,
    },
    /// A `# TYPE` line without a preceding `# HELP`.
    #[error("Line {line}: TYPE for {name} has no HELP")]
    TypeWithoutHelp {
        /// Line of the `# TYPE`
        line: usize,
        /// Family named by the `# TYPE`
        name: String,
    },
    /// A sample that does not belong to the current family.
    #[error("Line {line}: sample {name} is outside its family")]
    SampleOutsideFamily {
        /// Line of the sample
        line: usize,
        /// Metric name of the sample
        name: String,
    },
    /// Non-empty text that does not end in a newline.
    #[error("Exposition does not end in a newline")]
    MissingNewline,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// What [`check`] counted.
pub struct Stats {
    /// Families opened by a `# HELP`/`# TYPE` pair
    pub families: usize,
    /// Sample lines
    pub samples: usize,
}

/// Check that `text` is well formed exposition.
///
/// A family name seen twice is legal here and only logged; two counters with
/// the same family name and different descriptions produce exactly that.
///
/// # Errors
///
/// Returns the first structural problem found.
pub fn check(text: &str) -> Result<Stats, Error> {
    if !text.is_empty() && !text.ends_with('\n') {
        return Err(Error::MissingNewline);
    }

    let mut stats = Stats::default();
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut pending_help: Option<(usize, &str)> = None;
    let mut family: Option<(&str, MetricType)> = None;

    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        let parsed = parser::parse_line(line).map_err(|source| Error::Parse {
            line: lineno,
            source,
        })?;

        // Only a matching TYPE may follow a HELP.
        if let Some((help_line, help_name)) = pending_help {
            match &parsed {
                Line::Type { name, .. } if *name == help_name => {}
                _ => {
                    return Err(Error::HelpWithoutType {
                        line: help_line,
                        name: help_name.to_string(),
                    });
                }
            }
        }

        match parsed {
            Line::Blank | Line::Comment(_) => {}
            Line::Help { name, .. } => pending_help = Some((lineno, name)),
            Line::Type { name, metric_type } => {
                if pending_help.take().is_none() {
                    return Err(Error::TypeWithoutHelp {
                        line: lineno,
                        name: name.to_string(),
                    });
                }
                if !seen.insert(name) {
                    warn!("family {name} appears more than once, line {lineno}");
                }
                stats.families += 1;
                family = Some((name, metric_type));
            }
            Line::Sample(sample) => {
                let owned = family
                    .is_some_and(|(name, metric_type)| metric_type.owns(name, sample.name));
                if !owned {
                    return Err(Error::SampleOutsideFamily {
                        line: lineno,
                        name: sample.name.to_string(),
                    });
                }
                stats.samples += 1;
            }
        }
    }

    if let Some((line, name)) = pending_help {
        return Err(Error::HelpWithoutType {
            line,
            name: name.to_string(),
        });
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vscprom_core::{Counter, pass};

    const VALID: &str = "\
# HELP varnish_main_uptime Child process uptime
# TYPE varnish_main_uptime gauge
varnish_main_uptime 3600
# HELP varnish_backend_happy Happy health probes
# TYPE varnish_backend_happy gauge
varnish_backend_happy{server=\"boot.default\", backend=\"127.0.0.1,,8080\"} 255
varnish_backend_happy{server=\"boot.b2\", backend=\"UNKNOWN\"} 0
";

    #[test]
    fn valid_text() {
        assert_eq!(
            check(VALID),
            Ok(Stats {
                families: 2,
                samples: 3
            })
        );
    }

    #[test]
    fn empty_text() {
        assert_eq!(check(""), Ok(Stats::default()));
    }

    #[test]
    fn missing_newline() {
        assert_eq!(check(VALID.trim_end()), Err(Error::MissingNewline));
    }

    #[test]
    fn help_without_type() {
        let text = "# HELP a x\na 1\n";
        assert_eq!(
            check(text),
            Err(Error::HelpWithoutType {
                line: 1,
                name: "a".to_string()
            })
        );
        assert_eq!(
            check("# HELP a x\n# TYPE b gauge\n"),
            Err(Error::HelpWithoutType {
                line: 1,
                name: "a".to_string()
            })
        );
        assert_eq!(
            check("# HELP a x\n"),
            Err(Error::HelpWithoutType {
                line: 1,
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn type_without_help() {
        assert_eq!(
            check("# TYPE a gauge\na 1\n"),
            Err(Error::TypeWithoutHelp {
                line: 1,
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn sample_outside_family() {
        assert_eq!(
            check("a 1\n"),
            Err(Error::SampleOutsideFamily {
                line: 1,
                name: "a".to_string()
            })
        );
        assert_eq!(
            check("# HELP a x\n# TYPE a gauge\na 1\nb 2\n"),
            Err(Error::SampleOutsideFamily {
                line: 4,
                name: "b".to_string()
            })
        );
    }

    #[test]
    fn parse_errors_carry_the_line() {
        assert_eq!(
            check("# HELP a x\n# TYPE a gauge\na{x=\"unterminated} 1\n"),
            Err(Error::Parse {
                line: 3,
                source: ParseError::InvalidLabel("unterminated label value".to_string())
            })
        );
    }

    #[test]
    fn repeated_family_is_allowed() {
        let text = "# HELP a x\n# TYPE a gauge\na 1\n# HELP a y\n# TYPE a gauge\na 2\n";
        assert_eq!(
            check(text),
            Ok(Stats {
                families: 2,
                samples: 2
            })
        );
    }

    #[test]
    fn histogram_samples_use_suffixes() {
        let text = "\
# HELP req Request latency
# TYPE req histogram
req_bucket{le=\"0.5\"} 1
req_bucket{le=\"+Inf\"} 2
req_sum 0.7
req_count 2
";
        assert_eq!(
            check(text),
            Ok(Stats {
                families: 1,
                samples: 4
            })
        );
    }

    #[test]
    fn rendered_quote_in_backend_is_caught() {
        let output = pass::run(vec![Counter::uint64(
            "VBE.boot.a\"b.happy",
            "Happy health probes",
            1,
        )])
        .unwrap();
        assert!(matches!(check(&output.text), Err(Error::Parse { line: 3, .. })));
    }

    proptest! {
        #[test]
        fn rendered_passes_are_well_formed(
            counters in prop::collection::vec(
                (
                    prop_oneof![
                        Just("MAIN"), Just("VBE"), Just("LCK"), Just("SMA"), Just("SMF"), Just("MGT"),
                    ],
                    "[a-z0-9_.(),]{0,16}",
                    "[a-z]{1,8}",
                    any::<u64>(),
                ),
                0..32,
            ),
        ) {
            let counters: Vec<Counter> = counters
                .into_iter()
                .map(|(prefix, middle, suffix, value)| {
                    Counter::uint64(format!("{prefix}.{middle}.{suffix}"), "A counter", value)
                })
                .collect();
            let output = pass::run(&counters).unwrap();
            let stats = check(&output.text).unwrap();
            prop_assert_eq!(stats.families, output.summary.families);
            prop_assert_eq!(stats.samples as u64, output.summary.classified);
        }
    }
}
