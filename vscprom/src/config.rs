//! This module controls configuration parsing from the end user. Every field
//! but `source` has a default, and command line flags may stand in for a
//! missing `source`.
use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::source;

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<std::io::Error>,
    },
}

fn default_check() -> bool {
    true
}

/// Main configuration struct for this program
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Where counters come from and in which format
    #[serde(default)]
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub source: Option<source::Config>,
    /// `varnishstat -f` style patterns selecting counters, see
    /// [`crate::filter::Filter`]
    #[serde(default)]
    pub filter: Vec<String>,
    /// Where exposition text is written
    #[serde(default)]
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub output: Output,
    /// Whether rendered text is checked before it is written
    #[serde(default = "default_check")]
    pub check: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: None,
            filter: Vec::new(),
            output: Output::default(),
            check: default_check(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
/// Destination of rendered text
pub enum Output {
    /// Standard output
    #[default]
    Stdout,
    /// A file, replaced whole on every run
    Path(PathBuf),
}

impl Config {
    /// Parse configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if `contents` is not valid configuration.
    pub fn parse(contents: &str) -> Result<Self, Error> {
        serde_yaml::from_str(contents).map_err(Error::from)
    }
}

/// Load configuration from the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not hold valid
/// configuration.
pub fn load_config_from_path(path: &Path) -> Result<Config, Error> {
    let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    Config::parse(&contents)
}
