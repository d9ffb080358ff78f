//! Classify Varnish shared memory counters into Prometheus metric families.
//!
//! A render pass takes an ordered sequence of [`counter::Counter`] values,
//! derives a family name, description and label set for each, groups them into
//! families in first-seen order and serializes the result in the Prometheus
//! text exposition format. Nothing in this crate performs I/O; acquiring the
//! counters is the job of the host.

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
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod classify;
pub mod counter;
pub mod name;
pub mod pass;
pub mod registry;
pub mod render;

pub use counter::{Counter, Kind};
pub use pass::{Output, Summary};
pub use registry::Registry;
