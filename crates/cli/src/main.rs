//! `rfq-clean`: load an RFQ export, deduplicate it, drop quantity outliers
//! and save the cleaned table next to a JSON report.

use anyhow::{bail, Context, Result};
use clap::Parser;
use rfq_cleaning::{profile_entities, CleaningPipeline};
use rfq_core::Config;
use rfq_ingestion::{read_table, resolve_entity_column, resolve_quantity_column, save_table};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rfq-clean")]
#[command(about = "Deduplicate RFQ records and remove quantity outliers")]
#[command(version)]
struct Args {
    /// Input table (.csv or .xlsx)
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Directory for the cleaned table (defaults to the input's directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// File name of the cleaned table (defaults to <input>_cleaned.<ext>)
    #[arg(long)]
    output_name: Option<String>,

    /// TOML configuration file
    #[arg(long, short = 'c', env = "RFQ_CLEAN_CONFIG")]
    config: Option<PathBuf>,

    /// Dedup window in days
    #[arg(long)]
    window_days: Option<f64>,

    /// Hard cap on every entity's quantity threshold
    #[arg(long)]
    absolute_ceiling: Option<f64>,

    /// Skip deduplication
    #[arg(long)]
    skip_dedup: bool,

    /// Skip quantity outlier removal
    #[arg(long)]
    skip_outliers: bool,

    /// Write a JSON report of the run to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write per-entity quantity profiles (JSON) to this path
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Args {
    /// Load the configuration file, then apply flag overrides.
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(days) = self.window_days {
            config.dedup.window_days = days;
        }
        if let Some(ceiling) = self.absolute_ceiling {
            config.outliers.absolute_ceiling = Some(ceiling);
        }
        if self.skip_dedup {
            config.pipeline.deduplicate = false;
        }
        if self.skip_outliers {
            config.pipeline.remove_outliers = false;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => self
                .input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }

    fn output_name(&self) -> Result<String> {
        if let Some(name) = &self.output_name {
            return Ok(name.clone());
        }
        let stem = self
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .context("input path has no file name")?;
        let ext = self
            .input
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("csv");
        Ok(format!("{stem}_cleaned.{ext}"))
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<serde_json::Value> {
    let config = args.load_config()?;

    let table = read_table(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    // Entity and quantity columns are only read by outlier removal and profiling
    let columns = if config.pipeline.remove_outliers || args.profile.is_some() {
        let entity = resolve_entity_column(&table, &config.columns)?;
        let quantity = resolve_quantity_column(&table, &config.columns)?;
        info!(entity = %entity, quantity = %quantity, "using columns");
        Some((entity, quantity))
    } else {
        None
    };

    if let (Some(path), Some((entity, quantity))) = (&args.profile, &columns) {
        let profiles = profile_entities(&table, entity, quantity, &config.outliers)?;
        std::fs::write(path, serde_json::to_string_pretty(&profiles)?)
            .with_context(|| format!("failed to write profiles {}", path.display()))?;
        info!(path = %path.display(), entities = profiles.len(), "wrote quantity profiles");
    }

    let pipeline = CleaningPipeline::new(
        &config,
        columns.as_ref().map(|(e, q)| (e.as_str(), q.as_str())),
    )?;
    if pipeline.is_noop() {
        bail!("both stages are disabled; nothing to do");
    }
    let outcome = pipeline.run(&table)?;

    let saved = save_table(&outcome.table, args.output_dir(), &args.output_name()?)?;

    let report = json!({
        "input": args.input,
        "output": saved.path(),
        "written": saved.was_written(),
        "input_rows": table.len(),
        "output_rows": outcome.table.len(),
        "entity_column": columns.as_ref().map(|(e, _)| e),
        "quantity_column": columns.as_ref().map(|(_, q)| q),
        "dedup": outcome.dedup,
        "outliers": outcome.outliers,
    });

    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("failed to write report {}", path.display()))?;
    }

    Ok(report)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(report) => {
            info!(
                output = %report["output"],
                rows = %report["output_rows"],
                "cleaning finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
