//! Stats sources
//!
//! A source hands an ordered snapshot of counters to a render pass. Counters
//! come from varnishstat output, read from a file, from stdin or by running
//! the command directly.

use std::{
    fmt, fs,
    io::{self, Read},
    path::PathBuf,
    process::{Command, ExitStatus, Stdio},
    str::FromStr,
    string::FromUtf8Error,
};

use serde::Deserialize;
use tracing::debug;
use vscprom_core::Counter;

pub mod json;
pub mod text;

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Source`] implementations
pub enum Error {
    /// Reading the input failed.
    #[error("Failed to read counters from {input}: {source}")]
    Io {
        /// The input being read
        input: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },
    /// The command exited unsuccessfully.
    #[error("{program} exited with {status}")]
    Command {
        /// Program name
        program: String,
        /// Exit status
        status: ExitStatus,
    },
    /// The command printed something other than UTF-8.
    #[error("Command output is not UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
    /// The varnishstat JSON could not be decoded.
    #[error("Failed to decode varnishstat JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Something that produces a counter snapshot.
pub trait Source {
    /// Take one snapshot, in source order.
    ///
    /// # Errors
    ///
    /// Implementations return an error if the snapshot cannot be read or
    /// decoded at all. Individual malformed counters are skipped instead.
    fn counters(&mut self) -> Result<Vec<Counter>, Error>;
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// The varnishstat output format of an [`Input`].
pub enum Format {
    /// `varnishstat -j`
    Json,
    /// `varnishstat -1`
    Text,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            _ => Err(format!("unknown format {s:?}, expected json or text")),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
/// Where varnishstat output is read from.
pub enum Input {
    /// Standard input
    Stdin,
    /// A file on disk
    Path(PathBuf),
    /// Run a program and read its standard output
    Command {
        /// The program, looked up in `PATH`
        program: String,
        /// Arguments to the program
        #[serde(default)]
        args: Vec<String>,
    },
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Stdin => f.write_str("stdin"),
            Input::Path(path) => write!(f, "{}", path.display()),
            Input::Command { program, args } => {
                f.write_str(program)?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Input {
    /// `-` is stdin, anything else a path.
    fn from(s: &str) -> Self {
        if s == "-" {
            Self::Stdin
        } else {
            Self::Path(PathBuf::from(s))
        }
    }
}

impl Input {
    /// Read the whole input as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read, the command fails or its
    /// output is not UTF-8.
    pub fn read(&self) -> Result<String, Error> {
        debug!("reading counters from {self}");
        let io_err = |source: io::Error| Error::Io {
            input: self.to_string(),
            source,
        };

        match self {
            Input::Stdin => {
                let mut text = String::new();
                io::stdin().read_to_string(&mut text).map_err(io_err)?;
                Ok(text)
            }
            Input::Path(path) => fs::read_to_string(path).map_err(io_err),
            Input::Command { program, args } => {
                let output = Command::new(program)
                    .args(args)
                    .stdin(Stdio::null())
                    .stderr(Stdio::inherit())
                    .output()
                    .map_err(io_err)?;
                if !output.status.success() {
                    return Err(Error::Command {
                        program: program.clone(),
                        status: output.status,
                    });
                }
                Ok(String::from_utf8(output.stdout)?)
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
/// Configuration for [`Stats`]
pub struct Config {
    /// Output format of the input
    pub format: Format,
    /// Where to read from
    pub input: Input,
}

/// The configured stats source.
#[derive(Debug)]
pub enum Stats {
    /// See [`json::Json`] for details.
    Json(json::Json),
    /// See [`text::Text`] for details.
    Text(text::Text),
}

impl Stats {
    /// Create a new [`Stats`] from its configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let input = config.input.clone();
        match config.format {
            Format::Json => Self::Json(json::Json::new(input)),
            Format::Text => Self::Text(text::Text::new(input)),
        }
    }
}

impl Source for Stats {
    fn counters(&mut self) -> Result<Vec<Counter>, Error> {
        match self {
            Stats::Json(inner) => inner.counters(),
            Stats::Text(inner) => inner.counters(),
        }
    }
}
