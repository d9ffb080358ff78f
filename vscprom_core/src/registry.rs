//! Metric family registry
//!
//! Accumulates classified samples into families keyed by the exact
//! `(name, description)` pair. Families keep first-seen order and samples keep
//! insertion order. A registry lives for one render pass; rendering drains it.

use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use crate::classify::{Classified, Sample};

#[derive(Debug, Clone, PartialEq)]
/// A Prometheus metric family: one name, one help text, its samples.
pub struct MetricFamily {
    /// Family name
    pub name: String,
    /// Family help text
    pub description: String,
    /// Samples in insertion order
    pub samples: Vec<Sample>,
}

#[derive(Debug, Default)]
/// Insertion-ordered collection of [`MetricFamily`].
pub struct Registry {
    families: Vec<MetricFamily>,
    index: FxHashMap<(String, String), usize>,
}

impl Registry {
    /// Create an empty [`Registry`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `sample` to the family keyed by `(name, description)`, creating
    /// the family at the end of the registry if it does not exist yet.
    ///
    /// Samples are never merged; identical label sets produce separate lines.
    pub fn insert(&mut self, name: String, description: String, sample: Sample) {
        match self.index.entry((name, description)) {
            Entry::Occupied(entry) => self.families[*entry.get()].samples.push(sample),
            Entry::Vacant(entry) => {
                let (name, description) = entry.key().clone();
                entry.insert(self.families.len());
                self.families.push(MetricFamily {
                    name,
                    description,
                    samples: vec![sample],
                });
            }
        }
    }

    /// Insert the output of [`crate::classify::classify`].
    pub fn insert_classified(&mut self, classified: Classified) {
        let Classified {
            name,
            description,
            sample,
        } = classified;
        self.insert(name, description, sample);
    }

    /// Families in first-seen order.
    #[must_use]
    pub fn families(&self) -> &[MetricFamily] {
        &self.families
    }

    /// Number of families.
    #[must_use]
    pub fn len(&self) -> usize {
        self.families.len()
    }

    /// Whether the registry holds no family.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Take every family out of the registry, leaving it empty.
    pub fn drain(&mut self) -> Vec<MetricFamily> {
        self.index.clear();
        std::mem::take(&mut self.families)
    }
}
