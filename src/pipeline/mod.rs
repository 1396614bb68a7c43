use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::archive::{self, ArchiveError};
use crate::config::Config;
use crate::dispatch::{Converter, DispatchError, Dispatcher, ExternalConverter};
use crate::outputs::{self, OutputError};
use crate::report::{Measurement, RunReport};
use crate::resolver::{self, LayoutError};

pub mod staging;
pub use staging::Staging;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to prepare staging directory {path}: {source}")]
    Staging {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// A run that stopped early, with the report of what it got through.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    #[source]
    pub error: PipelineError,
    pub report: Box<RunReport>,
}

/// Expand, resolve, convert: each step runs to completion before the next.
#[derive(Debug)]
pub struct Pipeline<C: Converter = ExternalConverter> {
    config: Config,
    converter: C,
}

impl Pipeline<ExternalConverter> {
    pub fn new(config: Config) -> Self {
        let converter = ExternalConverter::new(config.converter());
        Pipeline { config, converter }
    }
}

impl<C: Converter> Pipeline<C> {
    pub fn with_converter(config: Config, converter: C) -> Self {
        Pipeline { config, converter }
    }

    pub fn run(&self, input: &Path, output_dir: &Path) -> Result<RunReport, RunFailure> {
        let mut report = RunReport::new(input, output_dir, self.config.on_failure());

        match self.run_steps(input, output_dir, &mut report) {
            Ok(()) => {
                report.finish();
                Ok(report)
            }
            Err(error) => {
                report.finish();
                Err(RunFailure {
                    error,
                    report: Box::new(report),
                })
            }
        }
    }

    fn run_steps(
        &self,
        input: &Path,
        output_dir: &Path,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        outputs::ensure_output_dir(output_dir)?;

        let staging = self.prepare_staging()?;
        report.staging_dir = Some(staging.path().to_path_buf());
        info!("Staging archives in {}", staging.path().display());

        let archives = archive::list_archives(input)?;
        info!("Found {} archive(s) in {}", archives.len(), input.display());
        report.archives = archive::expand_all(&archives, staging.path())?;

        let files = resolver::locate(
            self.config.layout(),
            staging.path(),
            self.config.product(),
            self.config.measurement_pattern(),
        )?;
        info!("Resolved {} measurement file(s)", files.len());
        report.measurements = files.iter().cloned().map(Measurement::new).collect();

        Dispatcher::new(&self.converter, self.config.on_failure()).run(
            &files,
            output_dir,
            &mut report.conversions,
        )?;

        if self.config.verify_outputs() {
            report.tiffs = outputs::verify_outputs(output_dir)?;
            info!("Verified {} TIFF file(s) in {}", report.tiffs.len(), output_dir.display());
        }

        Ok(())
    }

    fn prepare_staging(&self) -> Result<Staging, PipelineError> {
        let root = self.config.staging_root();
        let staging = if self.config.shared_staging() {
            Staging::shared(root)
        } else {
            Staging::scoped(root, self.config.keep_staging())
        };
        staging.map_err(|source| PipelineError::Staging {
            path: root.to_path_buf(),
            source,
        })
    }
}
