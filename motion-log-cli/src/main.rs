//! Motion Log Reader CLI Application
//!
//! This is the command-line interface for the motion log replay reader.
//! It uses the motion-log-decoder library and adds:
//! - TOML configuration with command-line overrides
//! - Fixed-interval sampling of any number of datasets
//! - CSV output

use anyhow::{bail, Context, Result};
use clap::Parser;
use motion_log_decoder::signals::CATEGORIES;
use motion_log_decoder::Session;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

mod config;
mod sampler;

use config::AppConfig;

/// Motion Log Reader - Reconstruct motion signals from data logger captures
#[derive(Parser, Debug)]
#[command(name = "motion-log-cli")]
#[command(about = "Sample motion datasets from data logger captures", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log prefix: reads <PREFIX>.json.gz and <PREFIX>.index.gz
    #[arg(short, long, value_name = "PREFIX")]
    log: Option<PathBuf>,

    /// Dataset to sample, e.g. trapq:toolhead:velocity (can be repeated)
    #[arg(short, long, value_name = "NAME")]
    dataset: Vec<String>,

    /// Seconds after the start of the log to begin sampling
    #[arg(long, value_name = "SECONDS")]
    start: Option<f64>,

    /// Seconds to sample for
    #[arg(long, value_name = "SECONDS")]
    duration: Option<f64>,

    /// Seconds between samples
    #[arg(long, value_name = "SECONDS")]
    interval: Option<f64>,

    /// Output file for the CSV (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// List dataset categories and selectors, then exit
    #[arg(long)]
    list: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    log::info!("Motion Log Reader CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", motion_log_decoder::VERSION);

    if args.list {
        list_datasets();
        return Ok(());
    }

    let config = resolve_config(&args)?;
    sample_mode(&config)
}

/// Merge the optional config file with command-line flags (flags win)
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    if let Some(log) = &args.log {
        config.input.log = Some(log.clone());
    }
    if !args.dataset.is_empty() {
        config.input.datasets = args.dataset.clone();
    }
    if let Some(output) = &args.output {
        config.input.output = Some(output.clone());
    }
    if let Some(start) = args.start {
        config.sampling.start = start;
    }
    if let Some(duration) = args.duration {
        config.sampling.duration = duration;
    }
    if let Some(interval) = args.interval {
        config.sampling.interval = interval;
    }
    Ok(config)
}

fn list_datasets() {
    println!("Dataset categories:");
    for category in CATEGORIES {
        let selectors = category.selectors();
        if selectors.is_empty() {
            println!("  {}:<name>", category.name());
        } else {
            println!("  {}:<name>:<selector>", category.name());
            for selector in selectors {
                println!("      {}", selector);
            }
        }
    }
}

/// Open the log, resolve the datasets, and write the CSV
fn sample_mode(config: &AppConfig) -> Result<()> {
    let Some(prefix) = &config.input.log else {
        bail!("No log specified; use --log <PREFIX> or set input.log in the config file");
    };
    if config.input.datasets.is_empty() {
        bail!("No datasets specified; use --dataset <NAME> (see --list)");
    }

    let mut session = Session::open_with_config(prefix, config.decoder.clone())
        .with_context(|| format!("Failed to open log: {:?}", prefix))?;
    let status = session
        .initialize()
        .with_context(|| format!("Failed to read index of log: {:?}", prefix))?;
    log::debug!("Initial status: {}", status.as_value());

    let datasets = config
        .input
        .datasets
        .iter()
        .map(|name| {
            session
                .select_dataset(name)
                .with_context(|| format!("Invalid dataset: {}", name))
        })
        .collect::<Result<Vec<_>>>()?;

    let rows = match &config.input.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            let mut out = BufWriter::new(file);
            let rows = sampler::write_csv(&mut session, &datasets, &config.sampling, &mut out)?;
            out.flush()?;
            rows
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let rows = sampler::write_csv(&mut session, &datasets, &config.sampling, &mut out)?;
            out.flush()?;
            rows
        }
    };
    log::info!("Sampled {} rows", rows);
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[input]\nlog = \"/tmp/a\"\ndatasets = [\"stepq:stepper_x\"]\n\n[sampling]\nduration = 5.0"
        )
        .unwrap();

        let args = Args::parse_from([
            "motion-log-cli",
            "--config",
            file.path().to_str().unwrap(),
            "--log",
            "/tmp/b",
            "--interval",
            "0.01",
        ]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.input.log, Some(PathBuf::from("/tmp/b")));
        assert_eq!(config.input.datasets, vec!["stepq:stepper_x".to_string()]);
        assert_eq!(config.sampling.duration, 5.0);
        assert_eq!(config.sampling.interval, 0.01);
    }

    #[test]
    fn test_repeated_dataset_flags() {
        let args = Args::parse_from([
            "motion-log-cli",
            "-d",
            "trapq:toolhead:velocity",
            "-d",
            "stepq:stepper_y",
            "-vv",
        ]);
        assert_eq!(args.dataset.len(), 2);
        assert_eq!(args.verbose, 2);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_missing_log_is_an_error() {
        let err = sample_mode(&AppConfig::default()).unwrap_err();
        assert!(err.to_string().contains("No log specified"));
    }
}
