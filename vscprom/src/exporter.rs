//! One export run
//!
//! Read a snapshot from the configured source, select counters, render them
//! and, when enabled, check the text before anyone sees it. Writing to a path
//! goes through a sibling temporary file so readers never see partial output.

use std::{
    ffi::OsString,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, info};
use vscprom_core::{Counter, pass, render};

use crate::{
    config::{Config, Output},
    exposition,
    filter::{self, Filter},
    source::{self, Source, Stats},
};

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`run`] and [`write`]
pub enum Error {
    /// Neither configuration nor flags name a source.
    #[error("No counter source configured")]
    NoSource,
    /// See [`filter::Error`]
    #[error("Filter failed: {0}")]
    Filter(#[from] filter::Error),
    /// See [`source::Error`]
    #[error("Source failed: {0}")]
    Source(#[from] source::Error),
    /// See [`render::Error`]
    #[error("Render failed: {0}")]
    Render(#[from] render::Error),
    /// See [`exposition::Error`]
    #[error("Rendered text is malformed: {0}")]
    Exposition(#[from] exposition::Error),
    /// Writing the output failed.
    #[error("Failed to write {path:?}: {source}")]
    Write {
        /// Destination, `None` for stdout
        path: Option<PathBuf>,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },
}

/// Take one snapshot and render it.
///
/// # Errors
///
/// Returns an error if no source is configured, a filter pattern is invalid,
/// the source fails, rendering fails or, with `check` enabled, the rendered
/// text is malformed.
pub fn run(config: &Config) -> Result<pass::Output, Error> {
    let source = config.source.as_ref().ok_or(Error::NoSource)?;
    let filter = Filter::new(&config.filter)?;
    let counters = Stats::new(source).counters()?;

    let output = if filter.is_empty() {
        pass::run(&counters)?
    } else {
        let selected: Vec<&Counter> = counters
            .iter()
            .filter(|counter| filter.matches(&counter.name))
            .collect();
        debug!(
            total = counters.len(),
            selected = selected.len(),
            "filtered counters"
        );
        pass::run(selected)?
    };

    if config.check {
        let stats = exposition::check(&output.text)?;
        debug!(
            families = stats.families,
            samples = stats.samples,
            "exposition check passed"
        );
    }

    Ok(output)
}

/// Write `text` to `output`.
///
/// # Errors
///
/// Returns an error if the text cannot be written. A path destination keeps
/// its previous content in that case.
pub fn write(output: &Output, text: &str) -> Result<(), Error> {
    match output {
        Output::Stdout => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|source| Error::Write { path: None, source })
        }
        Output::Path(path) => {
            replace(path, text).map_err(|source| Error::Write {
                path: Some(path.clone()),
                source,
            })?;
            info!("wrote {} bytes to {}", text.len(), path.display());
            Ok(())
        }
    }
}

fn replace(path: &Path, text: &str) -> io::Result<()> {
    let tmp = staging_path(path)?;
    if let Err(err) = fs::write(&tmp, text).and_then(|()| fs::rename(&tmp, path)) {
        // best effort, the original error is what matters
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

/// `dir/.name.tmp` for `dir/name`
fn staging_path(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "output path has no file name",
        )
    })?;
    let mut staged = OsString::from(".");
    staged.push(name);
    staged.push(".tmp");
    Ok(path.with_file_name(staged))
}
