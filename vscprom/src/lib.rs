//! Render varnishstat counter snapshots as Prometheus text exposition.
//!
//! This library supports the `vscprom` binary found elsewhere in this project:
//! configuration, the adapters that fetch counters from varnishstat, counter
//! selection, a check of the rendered text and the export run tying them
//! together. The classification itself lives in `vscprom-core`.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod exporter;
pub mod exposition;
pub mod filter;
pub mod source;
