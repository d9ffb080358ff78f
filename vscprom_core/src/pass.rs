//! One render pass: counters in, exposition text out
//!
//! Each counter is parsed, classified and inserted into a fresh [`Registry`],
//! one at a time and in order. Counters that cannot be classified are logged
//! and counted, never fatal. The registry is rendered and dropped at the end of
//! the pass.

use std::borrow::Borrow;

use metrics::{counter, gauge};
use tracing::{debug, info};

use crate::{
    classify::{self, classify},
    counter::Counter,
    name,
    registry::Registry,
    render,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Accounting for one pass.
pub struct Summary {
    /// Counters that produced a sample
    pub classified: u64,
    /// Counters skipped for a kind other than `uint64_t`
    pub unsupported_kind: u64,
    /// Counters skipped for a name without a dot
    pub unparsable_name: u64,
    /// Families rendered
    pub families: usize,
}

impl Summary {
    /// Counters skipped for any reason.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.unsupported_kind + self.unparsable_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of a pass.
pub struct Output {
    /// Prometheus text exposition
    pub text: String,
    /// What happened to the input counters
    pub summary: Summary,
}

/// Classify `counters` into a new registry and render it.
///
/// # Errors
///
/// Only rendering can fail, see [`render::Error`]. No partial text is
/// returned on failure.
pub fn run<I>(counters: I) -> Result<Output, render::Error>
where
    I: IntoIterator,
    I::Item: Borrow<Counter>,
{
    let mut registry = Registry::new();
    let summary = collect(&mut registry, counters);
    let text = render::render(&mut registry)?;

    info!(
        classified = summary.classified,
        skipped = summary.skipped(),
        families = summary.families,
        bytes = text.len(),
        "render pass complete"
    );

    Ok(Output { text, summary })
}

/// Classify `counters` into `registry`, returning the pass accounting.
pub fn collect<I>(registry: &mut Registry, counters: I) -> Summary
where
    I: IntoIterator,
    I::Item: Borrow<Counter>,
{
    let mut summary = Summary::default();

    for counter in counters {
        let counter = counter.borrow();
        let parsed = name::parse(&counter.name);
        match classify(counter, &parsed) {
            Ok(classified) => {
                summary.classified += 1;
                registry.insert_classified(classified);
            }
            Err(err) => {
                debug!("skipping counter: {err}");
                match err {
                    classify::Error::UnsupportedKind { .. } => summary.unsupported_kind += 1,
                    classify::Error::UnparsableName(_) => summary.unparsable_name += 1,
                }
            }
        }
    }
    summary.families = registry.len();

    counter!("vscprom_counters_total", "outcome" => "classified").increment(summary.classified);
    counter!("vscprom_counters_total", "outcome" => "unsupported_kind")
        .increment(summary.unsupported_kind);
    counter!("vscprom_counters_total", "outcome" => "unparsable_name")
        .increment(summary.unparsable_name);
    gauge!("vscprom_families").set(summary.families as f64);

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use proptest::prelude::*;

    fn snapshot() -> Vec<Counter> {
        vec![
            Counter::uint64("MAIN.uptime", "Child process uptime", 3600),
            Counter::uint64("MAIN.fetch_head", "Fetch no body (HEAD)", 2),
            Counter::uint64("MAIN.fetch_length", "Fetch with Length", 5),
            Counter::uint64("LCK.sma.creat", "Created locks", 1),
            Counter::uint64("LCK.sms.creat", "Created locks", 1),
            Counter::new("MAIN.bitmap", "A bitmap", "bitmap", 7),
            Counter::uint64("nodot", "No dot here", 7),
            Counter::uint64("VBE.boot.default(127.0.0.1,,8080).happy", "Happy health probes", 255),
        ]
    }

    #[test]
    fn full_pass() {
        let output = run(snapshot()).unwrap();

        let expected = "\
# HELP varnish_main_uptime Child process uptime
# TYPE varnish_main_uptime gauge
varnish_main_uptime 3600
# HELP varnish_main_fetch Number of fetches
# TYPE varnish_main_fetch gauge
varnish_main_fetch{type=\"head\"} 2
varnish_main_fetch{type=\"length\"} 5
# HELP varnish_lck_creat Created locks
# TYPE varnish_lck_creat gauge
varnish_lck_creat{id=\"sma\"} 1
varnish_lck_creat{id=\"sms\"} 1
# HELP varnish_backend_happy Happy health probes
# TYPE varnish_backend_happy gauge
varnish_backend_happy{server=\"boot.default\", backend=\"127.0.0.1,,8080\"} 255
";
        assert_eq!(output.text, expected);
        assert_eq!(
            output.summary,
            Summary {
                classified: 6,
                unsupported_kind: 1,
                unparsable_name: 1,
                families: 4,
            }
        );
        assert_eq!(output.summary.skipped(), 2);
    }

    #[test]
    fn empty_input_renders_nothing() {
        let output = run(Vec::<Counter>::new()).unwrap();
        assert_eq!(output.text, "");
        assert_eq!(output.summary, Summary::default());
    }

    #[test]
    fn counters_without_a_dot_leave_no_trace() {
        let output = run(vec![
            Counter::uint64("uptime", "", 1),
            Counter::uint64("VBE", "", 1),
        ])
        .unwrap();
        assert_eq!(output.text, "");
        assert_eq!(output.summary.unparsable_name, 2);
    }

    #[test]
    fn accepts_borrowed_counters() {
        let counters = snapshot();
        let by_ref = run(&counters).unwrap();
        let by_value = run(counters).unwrap();
        assert_eq!(by_ref, by_value);
    }

    #[test]
    fn records_self_telemetry() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            let _ = run(snapshot()).unwrap();
        });

        let snapshot = snapshotter.snapshot().into_vec();
        let outcome = |outcome: &str| {
            snapshot
                .iter()
                .find(|(key, _, _, _)| {
                    key.key().name() == "vscprom_counters_total"
                        && key
                            .key()
                            .labels()
                            .any(|label| label.key() == "outcome" && label.value() == outcome)
                })
                .map(|(_, _, _, value)| value)
        };

        assert_eq!(outcome("classified"), Some(&DebugValue::Counter(6)));
        assert_eq!(outcome("unsupported_kind"), Some(&DebugValue::Counter(1)));
        assert_eq!(outcome("unparsable_name"), Some(&DebugValue::Counter(1)));

        let families = snapshot
            .iter()
            .find(|(key, _, _, _)| key.key().name() == "vscprom_families")
            .map(|(_, _, _, value)| value)
            .expect("metric not found");
        match families {
            DebugValue::Gauge(v) => assert_eq!(v.into_inner(), 4.0),
            _ => panic!("unexpected metric type"),
        }
    }

    proptest! {
        #[test]
        fn every_counter_is_accounted_for(
            counters in prop::collection::vec(
                (
                    "[A-Z]{0,4}\\.?[a-z0-9_.()]{0,12}",
                    prop_oneof![Just("uint64_t"), Just("double")],
                    any::<u64>(),
                ),
                0..32,
            ),
        ) {
            let counters: Vec<Counter> = counters
                .into_iter()
                .map(|(name, kind, value)| Counter::new(name, "d", kind, value))
                .collect();
            let output = run(&counters).unwrap();
            let summary = output.summary;

            prop_assert_eq!(summary.classified + summary.skipped(), counters.len() as u64);

            let samples = output.text.lines().filter(|l| !l.starts_with('#')).count();
            prop_assert_eq!(samples as u64, summary.classified);
            let helps = output.text.lines().filter(|l| l.starts_with("# HELP ")).count();
            prop_assert_eq!(helps, summary.families);
        }
    }
}
