use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::FailurePolicy;

pub mod external;
pub use external::ExternalConverter;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to start converter '{program}' for {input}: {source}")]
    Spawn {
        program: String,
        input: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("converter failed for {input} ({status})")]
    Failed { input: PathBuf, status: String },
}

/// Result of one converter invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub input: PathBuf,
    pub exit_code: Option<i32>,
    pub success: bool,
    pub elapsed_ms: u64,
    pub stdout: String,
    pub stderr: String,
}

impl Conversion {
    pub fn status(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

pub trait Converter {
    fn convert(&self, input: &Path, output_dir: &Path) -> Result<Conversion, DispatchError>;
}

/// Runs the converter once per measurement file, sequentially and in the given order.
pub struct Dispatcher<'a, C: Converter + ?Sized> {
    converter: &'a C,
    policy: FailurePolicy,
}

impl<'a, C: Converter + ?Sized> Dispatcher<'a, C> {
    pub fn new(converter: &'a C, policy: FailurePolicy) -> Self {
        Self { converter, policy }
    }

    /// Under `Abort` the first failed conversion ends the run with an error. `Continue` and
    /// `Ignore` run every file and return all outcomes; whether failures fail the run is
    /// decided by the caller.
    pub fn run(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        conversions: &mut Vec<Conversion>,
    ) -> Result<(), DispatchError> {
        for (index, input) in inputs.iter().enumerate() {
            info!(
                "Converting [{}/{}] {}",
                index + 1,
                inputs.len(),
                input.display()
            );
            let conversion = self.converter.convert(input, output_dir)?;

            if conversion.success {
                info!(
                    "✓ Converted {} in {} ms",
                    input.display(),
                    conversion.elapsed_ms
                );
                conversions.push(conversion);
                continue;
            }

            warn!(
                "✗ Converter failed for {} ({})",
                input.display(),
                conversion.status()
            );
            let status = conversion.status();
            conversions.push(conversion);

            if self.policy == FailurePolicy::Abort {
                return Err(DispatchError::Failed {
                    input: input.clone(),
                    status,
                });
            }
        }

        Ok(())
    }
}
