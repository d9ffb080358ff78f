//! Prometheus text exposition of a [`Registry`]
//!
//! Every family becomes a `# HELP` line, a `# TYPE <name> gauge` line and one
//! line per sample. Values are printed in their shortest round-trip form.
//! Rendering drains the registry.
//! <https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md>

use std::{collections::TryReserveError, fmt::Write};

use crate::{
    classify::{Labels, Sample},
    registry::{MetricFamily, Registry},
};

/// Prefixes stripped from a rendered `backend` label.
const BACKEND_PREFIXES: [&str; 2] = ["boot.", "root:"];

/// Room for the fixed text of a `# HELP`/`# TYPE` pair.
const FAMILY_OVERHEAD: usize = 24;
/// Room for label punctuation and a formatted value.
const SAMPLE_OVERHEAD: usize = 48;

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`render`]
pub enum Error {
    /// The output buffer could not be allocated.
    #[error("Failed to reserve output buffer: {0}")]
    Allocation(#[from] TryReserveError),
    /// Formatting into the output buffer failed.
    #[error("Failed to format output: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Render and drain `registry`.
///
/// An empty registry renders to an empty string, so a second call on the same
/// registry returns nothing.
///
/// # Errors
///
/// Returns [`Error::Allocation`] if the output buffer cannot be reserved. The
/// registry is left untouched in that case.
pub fn render(registry: &mut Registry) -> Result<String, Error> {
    let mut out = String::new();
    out.try_reserve(estimate(registry.families()))?;

    for family in registry.drain() {
        write_family(&mut out, &family)?;
    }

    Ok(out)
}

/// The backend label as rendered: without a leading `boot.` or `root:`.
#[must_use]
pub fn clean_backend(backend: &str) -> &str {
    BACKEND_PREFIXES
        .iter()
        .find_map(|prefix| backend.strip_prefix(prefix))
        .unwrap_or(backend)
}

fn estimate(families: &[MetricFamily]) -> usize {
    families
        .iter()
        .map(|family| {
            let samples: usize = family
                .samples
                .iter()
                .map(|sample| {
                    let labels: usize = sample
                        .labels
                        .pairs()
                        .iter()
                        .map(|(k, v)| k.len() + v.len())
                        .sum();
                    family.name.len() + labels + SAMPLE_OVERHEAD
                })
                .sum();
            2 * family.name.len() + family.description.len() + FAMILY_OVERHEAD + samples
        })
        .sum()
}

fn write_family(out: &mut String, family: &MetricFamily) -> Result<(), Error> {
    let name = &family.name;
    writeln!(out, "# HELP {name} {}", family.description)?;
    writeln!(out, "# TYPE {name} gauge")?;

    for sample in &family.samples {
        write_sample(out, name, sample)?;
    }

    Ok(())
}

fn write_sample(out: &mut String, name: &str, sample: &Sample) -> Result<(), Error> {
    out.push_str(name);

    match &sample.labels {
        Labels::Backend { server, backend } => {
            let backend = clean_backend(backend);
            write!(out, "{{server=\"{server}\", backend=\"{backend}\"}}")?;
        }
        Labels::Generic(Some((role, value))) => {
            write!(out, "{{{role}=\"{value}\"}}")?;
        }
        Labels::Generic(None) => {}
    }

    writeln!(out, " {}", sample.value)?;
    Ok(())
}
