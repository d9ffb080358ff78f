use std::{env, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};
use vscprom::{
    config::{self, Config, Output},
    exporter,
    filter::{self, Filter},
    source::{self, Format, Input},
};

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    #[error("Export failed: {0}")]
    Exporter(#[from] exporter::Error),
    #[error("Invalid filter: {0}")]
    Filter(#[from] filter::Error),
}

fn default_config_path() -> String {
    "/etc/vscprom/vscprom.yaml".to_string()
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one counter snapshot as Prometheus text
    Render(RenderArgs),
    /// Validate configuration file and exit
    ConfigCheck(ConfigCheckCommand),
}

#[derive(Args)]
struct RenderArgs {
    /// path on disk to the configuration file, optional
    #[clap(long)]
    config_path: Option<String>,
    /// varnishstat output to read, `-` for stdin, overrides the configured input
    #[clap(long)]
    input: Option<String>,
    /// format of the input, json or text, overrides the configured format
    #[clap(long)]
    format: Option<Format>,
    /// path to write exposition text to, overrides the configured output
    #[clap(long)]
    output: Option<PathBuf>,
    /// skip the check of rendered text
    #[clap(long)]
    no_check: bool,
}

#[derive(Args)]
struct ConfigCheckCommand {
    /// path on disk to the configuration file
    #[clap(long, default_value_t = default_config_path())]
    config_path: String,
}

fn load_config_contents(config_path: &str) -> Result<String, Error> {
    if let Ok(env_var_value) = env::var("VSCPROM_CONFIG") {
        debug!("Using config from env var 'VSCPROM_CONFIG'");
        Ok(env_var_value)
    } else {
        debug!("Attempting to open configuration file at: {config_path}");
        let path = PathBuf::from(config_path);
        std::fs::read_to_string(&path).map_err(|source| {
            error!("Could not read config file '{config_path}': {source}");
            Error::Config(config::Error::ReadFile {
                path,
                source: Box::new(source),
            })
        })
    }
}

fn parse_config(contents: &str) -> Result<Config, Error> {
    Config::parse(contents).map_err(|err| {
        error!("Configuration validation failed: {err}");
        Error::Config(err)
    })
}

fn validate_config(config_path: &str) -> Result<Config, Error> {
    let contents = load_config_contents(config_path)?;
    let config = parse_config(&contents)?;
    Filter::new(&config.filter).map_err(|err| {
        error!("Configuration validation failed: {err}");
        Error::Filter(err)
    })?;
    if config.source.is_none() {
        info!("Configuration has no source, render will need --input and --format");
    }
    info!("Configuration file is valid");
    Ok(config)
}

fn get_config(args: &RenderArgs, config: Option<String>) -> Result<Config, Error> {
    let contents = match (config, &args.config_path) {
        (Some(config), _) => Some(config),
        (None, Some(path)) => Some(load_config_contents(path)?),
        (None, None) => env::var("VSCPROM_CONFIG").ok(),
    };
    let mut config = match contents {
        Some(contents) => parse_config(&contents)?,
        None => Config::default(),
    };

    let input = args.input.as_deref().map(Input::from);
    config.source = match (config.source.take(), input, args.format) {
        (Some(mut source), input, format) => {
            if let Some(input) = input {
                source.input = input;
            }
            if let Some(format) = format {
                source.format = format;
            }
            Some(source)
        }
        (None, Some(input), format) => Some(source::Config {
            format: format.unwrap_or(Format::Json),
            input,
        }),
        (None, None, _) => None,
    };
    if let Some(path) = &args.output {
        config.output = Output::Path(path.clone());
    }
    if args.no_check {
        config.check = false;
    }

    Ok(config)
}

fn render(args: &RenderArgs) -> Result<(), Error> {
    let config = get_config(args, None)?;
    let output = exporter::run(&config)?;
    exporter::write(&config.output, &output.text)?;
    Ok(())
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .finish()
        .init();

    let version = env!("CARGO_PKG_VERSION");
    debug!("Starting vscprom {version}.");

    match Cli::parse().command {
        Commands::Render(args) => render(&args),
        Commands::ConfigCheck(config_check_cmd) => {
            match validate_config(&config_check_cmd.config_path) {
                Ok(_) => std::process::exit(0),
                Err(_) => std::process::exit(1),
            }
        }
    }
}
