//! Counter classification
//!
//! Maps one [`Counter`] to a metric family name, a family description and a
//! label set. Backend counters (`VBE.*`) carry `server` and `backend` labels
//! pulled out of the identifier between the first and last dot. Every other
//! counter carries at most one of `id`, `target` or `type`, chosen by the fixed
//! tables in this module.

use std::fmt;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::{
    counter::{Counter, Kind},
    name::ParsedName,
};

/// Prefix of backend connection counters.
pub const BACKEND_PREFIX: &str = "VBE";

/// Placeholder for a backend label that could not be extracted.
pub const UNKNOWN: &str = "UNKNOWN";

/// Families that fold an underscore-delimited field into a `type` label.
///
/// A counter matches an entry when its `varnish_<prefix>_<head>` name, with
/// `head` being the field up to the first underscore, is a prefix of the entry.
pub const GROUPS: [(&str, &str); 3] = [
    ("varnish_main_fetch", "Number of fetches"),
    ("varnish_main_sessions", "Number of sessions"),
    ("varnish_main_worker_threads", "Number of worker threads"),
];

/// Families whose identifier is exposed as a `target` label.
pub const TARGET_FAMILIES: [&str; 4] = [
    "varnish_lck_collisions",
    "varnish_lck_created",
    "varnish_lck_destroyed",
    "varnish_lck_operations",
];

/// Families whose identifier is exposed as a `type` label.
pub const TYPE_FAMILIES: [&str; 17] = [
    "varnish_sma_c_bytes",
    "varnish_sma_c_fail",
    "varnish_sma_c_freed",
    "varnish_sma_c_req",
    "varnish_sma_g_alloc",
    "varnish_sma_g_bytes",
    "varnish_sma_g_space",
    "varnish_smf_c_bytes",
    "varnish_smf_c_fail",
    "varnish_smf_c_freed",
    "varnish_smf_c_req",
    "varnish_smf_g_alloc",
    "varnish_smf_g_bytes",
    "varnish_smf_g_smf_frag",
    "varnish_smf_g_smf_large",
    "varnish_smf_g_smf",
    "varnish_smf_g_space",
];

static ROLES: Lazy<FxHashMap<&'static str, LabelRole>> = Lazy::new(|| {
    let mut roles = FxHashMap::default();
    // Target wins should a name ever land in both tables.
    for name in TYPE_FAMILIES {
        roles.insert(name, LabelRole::Type);
    }
    for name in TARGET_FAMILIES {
        roles.insert(name, LabelRole::Target);
    }
    roles
});

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Reasons a counter is left out of a render pass
pub enum Error {
    /// The counter is not a `uint64_t`.
    #[error("counter {name} has unsupported kind {kind}")]
    UnsupportedKind {
        /// Counter name
        name: String,
        /// Declared kind
        kind: Kind,
    },
    /// The counter name has no dot.
    #[error("counter name {0:?} has no dot")]
    UnparsableName(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// The key of the single label a non-backend sample may carry.
///
/// Variants are ordered as they are rendered.
pub enum LabelRole {
    /// The identifier between the first and last dot, the default.
    Id,
    /// Lock class of `LCK` counters.
    Target,
    /// Storage backend of `SMA`/`SMF` counters, or the grouped field suffix.
    Type,
}

impl LabelRole {
    /// The label key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LabelRole::Id => "id",
            LabelRole::Target => "target",
            LabelRole::Type => "type",
        }
    }
}

impl fmt::Display for LabelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Labels of a sample. The two shapes never mix.
pub enum Labels {
    /// Backend connection counters.
    Backend {
        /// Server part of the identifier, [`UNKNOWN`] if absent.
        server: String,
        /// Backend part of the identifier, [`UNKNOWN`] if absent.
        backend: String,
    },
    /// Everything else: no label, or one label under a [`LabelRole`].
    Generic(Option<(LabelRole, String)>),
}

impl Labels {
    /// Labels as ordered key/value pairs, values exactly as stored.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        match self {
            Labels::Backend { server, backend } => {
                vec![("server", server.as_str()), ("backend", backend.as_str())]
            }
            Labels::Generic(Some((role, value))) => vec![(role.as_str(), value.as_str())],
            Labels::Generic(None) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// One labeled value of a metric family.
pub struct Sample {
    /// Sample labels
    pub labels: Labels,
    /// Raw counter value as a float
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
/// A classified counter, ready for the registry.
pub struct Classified {
    /// Family name, `varnish_` prefixed
    pub name: String,
    /// Family help text
    pub description: String,
    /// The sample for this counter
    pub sample: Sample,
}

/// Classify `counter` from its parsed name.
///
/// # Errors
///
/// Returns [`Error::UnsupportedKind`] when the counter is not a `uint64_t` and
/// [`Error::UnparsableName`] when its name has no dot. Neither is fatal to a
/// render pass; the counter is simply left out.
pub fn classify(counter: &Counter, parsed: &ParsedName<'_>) -> Result<Classified, Error> {
    if counter.kind != Kind::Uint64 {
        return Err(Error::UnsupportedKind {
            name: counter.name.clone(),
            kind: counter.kind.clone(),
        });
    }

    let (Some(prefix), Some(suffix)) = (parsed.prefix(), parsed.suffix()) else {
        return Err(Error::UnparsableName(counter.name.clone()));
    };

    let value = counter.value as f64;

    if prefix == BACKEND_PREFIX {
        return Ok(Classified {
            name: format!("varnish_backend_{suffix}"),
            description: counter.description.clone(),
            sample: Sample {
                labels: backend_labels(parsed),
                value,
            },
        });
    }

    let base = format!("varnish_{}_", prefix.to_ascii_lowercase());

    if let Some((name, description, kind)) = group(&base, parsed) {
        return Ok(Classified {
            name,
            description: description.to_string(),
            sample: Sample {
                labels: Labels::Generic(Some((LabelRole::Type, kind.to_string()))),
                value,
            },
        });
    }

    let name = format!("{base}{suffix}");
    let role = ROLES.get(name.as_str()).copied().unwrap_or(LabelRole::Id);
    let labels = Labels::Generic(parsed.ident().map(|ident| (role, ident.to_string())));

    Ok(Classified {
        name,
        description: counter.description.clone(),
        sample: Sample { labels, value },
    })
}

/// Pull `server` and `backend` out of a `VBE` counter name.
///
/// Tried in order: `VBE.<server>(<backend>).field`,
/// `VBE.<server>.<backend>.field`, then `VBE.<backend>.field`.
fn backend_labels(parsed: &ParsedName<'_>) -> Labels {
    let parens = match (parsed.first_dot, parsed.paren_open, parsed.paren_close) {
        (Some(first), Some(open), Some(close)) if first < open && open < close => {
            Some((parsed.between(first, open), parsed.between(open, close)))
        }
        _ => None,
    };
    let dots = match (parsed.first_dot, parsed.second_dot, parsed.last_dot) {
        (Some(first), Some(second), Some(last)) if first < second && second < last => {
            Some((parsed.between(first, second), parsed.between(second, last)))
        }
        _ => None,
    };

    let (server, backend) = match parens.or(dots) {
        Some((server, backend)) => (Some(server), Some(backend)),
        None => (None, parsed.ident()),
    };

    Labels::Backend {
        server: server.unwrap_or(UNKNOWN).to_string(),
        backend: backend.unwrap_or(UNKNOWN).to_string(),
    }
}

/// Match the field head against [`GROUPS`], returning the family name, the
/// fixed description and the remainder after the underscore.
fn group<'a>(base: &str, parsed: &ParsedName<'a>) -> Option<(String, &'static str, &'a str)> {
    let last = parsed.last_dot?;
    let underscore = parsed.underscore?;
    let head = parsed.between(last, underscore);
    // `varnish_<prefix>_` alone is a prefix of every entry.
    if head.is_empty() {
        return None;
    }

    let name = format!("{base}{head}");
    let &(_, description) = GROUPS.iter().find(|(group, _)| group.starts_with(&name))?;
    let kind = &parsed.name()[underscore + 1..];

    Some((name, description, kind))
}
