use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use safe2tiff::config::{Config, ConfigError, FailurePolicy, Layout};
use safe2tiff::{Pipeline, RunReport};

#[derive(Debug, Parser)]
#[command(
    name = "safe2tiff",
    version,
    about = "Convert Sentinel-1 SAFE zip archives to TIFF with an external converter"
)]
pub struct CliArgs {
    /// A zip archive, or a directory whose zip archives are all processed
    pub input: PathBuf,

    /// Directory passed to the converter for its TIFF output
    pub output_dir: PathBuf,

    /// JSON configuration file
    #[arg(short, long, env = "SAFE2TIFF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory under which archives are staged
    #[arg(long, env = "SAFE2TIFF_STAGING_ROOT")]
    pub staging_root: Option<PathBuf>,

    /// Expand straight into the staging root instead of a per-run directory
    #[arg(long)]
    pub shared_staging: bool,

    /// Keep the per-run staging directory afterwards
    #[arg(long)]
    pub keep_staging: bool,

    /// Only convert measurements of this product identifier (without .SAFE)
    #[arg(long)]
    pub product: Option<String>,

    /// Fail when an archive does not hold <id>.SAFE/measurement/<file>.nc
    #[arg(long)]
    pub strict_layout: bool,

    /// Filename pattern of measurement files
    #[arg(long)]
    pub measurement_pattern: Option<String>,

    /// What to do when the converter fails: abort, continue or ignore
    #[arg(long)]
    pub on_failure: Option<FailurePolicy>,

    /// Converter program; replaces the default arguments too, so pass the script with
    /// --converter-arg when needed
    #[arg(long)]
    pub converter: Option<String>,

    /// Argument placed before the input and output paths (repeatable)
    #[arg(long = "converter-arg", allow_hyphen_values = true)]
    pub converter_args: Vec<String>,

    /// Check every TIFF in the output directory after conversion
    #[arg(long)]
    pub verify_outputs: bool,

    /// Write a JSON report of the run
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Log debug output, including everything the converter prints
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Loads the configuration file, if any, and applies command-line overrides.
    pub fn to_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(root) = &self.staging_root {
            config = config.with_staging_root(root);
        }
        if self.shared_staging {
            config = config.with_shared_staging(true);
        }
        if self.keep_staging {
            config = config.with_keep_staging(true);
        }
        if self.product.is_some() {
            config = config.with_product(self.product.clone());
        }
        if self.strict_layout {
            config = config.with_layout(Layout::Strict);
        }
        if let Some(pattern) = &self.measurement_pattern {
            config = config.with_measurement_pattern(pattern);
        }
        if let Some(policy) = self.on_failure {
            config = config.with_on_failure(policy);
        }
        if self.verify_outputs {
            config = config.with_verify_outputs(true);
        }

        if self.converter.is_some() || !self.converter_args.is_empty() {
            let mut converter = config.converter().clone();
            if let Some(program) = &self.converter {
                converter.program = program.clone();
                converter.args = Vec::new();
            }
            if !self.converter_args.is_empty() {
                converter.args = self.converter_args.clone();
            }
            config = config.with_converter(converter);
        }

        config.validate()?;
        Ok(config)
    }
}

pub fn run(args: CliArgs) -> Result<ExitCode> {
    let config = args.to_config().context("Invalid configuration")?;
    info!(
        "Converting {} into {} with '{}' (on failure: {})",
        args.input.display(),
        args.output_dir.display(),
        config.converter().program,
        config.on_failure()
    );

    let pipeline = Pipeline::new(config);
    match pipeline.run(&args.input, &args.output_dir) {
        Ok(report) => {
            finish(&report, args.report.as_deref())?;
            if report.succeeded() {
                Ok(ExitCode::SUCCESS)
            } else {
                error!(
                    "{} conversion(s) failed",
                    report.failed_conversions().count()
                );
                Ok(ExitCode::FAILURE)
            }
        }
        Err(failure) => {
            // The run's own error is the one to surface.
            if let Err(e) = finish(&failure.report, args.report.as_deref()) {
                error!("{e:#}");
            }
            Err(failure.into())
        }
    }
}

fn finish(report: &RunReport, path: Option<&Path>) -> Result<()> {
    report.log_summary();
    if let Some(path) = path {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }
    Ok(())
}
