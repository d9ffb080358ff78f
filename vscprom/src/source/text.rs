//! `varnishstat -1` source
//!
//! One counter per line, whitespace separated:
//!
//! ```text
//! MAIN.uptime              1218         1.00 Child process uptime
//! MAIN.sess_conn              2          .   Sessions accepted
//! ```
//!
//! Name, value, per-second rate (or `.`) and the description, which runs to
//! the end of the line.

use tracing::warn;
use vscprom_core::Counter;

use super::{Error, Input, Source};

/// Counters from `varnishstat -1` output.
#[derive(Debug)]
pub struct Text {
    input: Input,
}

impl Text {
    /// Create a new [`Text`] source reading from `input`.
    #[must_use]
    pub fn new(input: Input) -> Self {
        Self { input }
    }
}

impl Source for Text {
    fn counters(&mut self) -> Result<Vec<Counter>, Error> {
        let text = self.input.read()?;
        Ok(parse(&text))
    }
}

/// Decode `varnishstat -1` output. Malformed lines are logged and skipped.
#[must_use]
pub fn parse(text: &str) -> Vec<Counter> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(counter) => out.push(counter),
            None => warn!("skipping malformed varnishstat line {}: {line:?}", idx + 1),
        }
    }
    out
}

fn parse_line(line: &str) -> Option<Counter> {
    let (name, rest) = field(line)?;
    let (value, rest) = field(rest)?;
    let value = value.parse::<u64>().ok()?;
    let description = field(rest).map_or("", |(_rate, description)| description);

    Some(Counter::uint64(name, description.trim_end(), value))
}

/// Split the next whitespace delimited field off `s`.
fn field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.split_once(char::is_whitespace) {
        Some((field, rest)) => Some((field, rest.trim_start())),
        None => Some((s, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const OUTPUT: &str = "\
MGT.uptime                   1000         1.00 Management process uptime
MAIN.sess_conn                  2          .   Sessions accepted
SMA.s0.c_bytes            1048576      1024.00 Bytes allocated
LCK.sma.creat                   1          .   Created locks
";

    #[test]
    fn parses_varnishstat_output() {
        assert_eq!(
            parse(OUTPUT),
            vec![
                Counter::uint64("MGT.uptime", "Management process uptime", 1000),
                Counter::uint64("MAIN.sess_conn", "Sessions accepted", 2),
                Counter::uint64("SMA.s0.c_bytes", "Bytes allocated", 1_048_576),
                Counter::uint64("LCK.sma.creat", "Created locks", 1),
            ]
        );
    }

    #[test]
    fn description_keeps_inner_spaces() {
        assert_eq!(
            parse("MAIN.fetch_head 3 . Fetch no body (HEAD)  \n"),
            vec![Counter::uint64("MAIN.fetch_head", "Fetch no body (HEAD)", 3)]
        );
    }

    #[test]
    fn missing_rate_and_description() {
        assert_eq!(
            parse("MAIN.x 7\nMAIN.y 8 .\n"),
            vec![Counter::uint64("MAIN.x", "", 7), Counter::uint64("MAIN.y", "", 8)]
        );
    }

    #[test]
    fn malformed_lines_are_skipped() {
        assert_eq!(
            parse("\nMAIN.x\nMAIN.y -1 . neg\nMAIN.z abc . nan\nMAIN.ok 1 . fine\n"),
            vec![Counter::uint64("MAIN.ok", "fine", 1)]
        );
    }

    proptest! {
        #[test]
        fn never_panics(input in ".*") {
            let _ = parse(&input);
        }

        #[test]
        fn well_formed_lines_round_trip(
            name in "[A-Z]{1,6}\\.[a-z_]{1,12}",
            value in any::<u64>(),
            description in "[A-Za-z][A-Za-z ()]{0,30}[A-Za-z)]",
        ) {
            let line = format!("{name:<24} {value:>12} . {description}\n");
            prop_assert_eq!(
                parse(&line),
                vec![Counter::uint64(name.as_str(), description.as_str(), value)]
            );
        }
    }
}
