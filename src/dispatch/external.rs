use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use tracing::debug;

use super::{Conversion, Converter, DispatchError};
use crate::config::ConverterConfig;

/// Trailing lines of converter output kept per conversion.
const OUTPUT_TAIL_LINES: usize = 20;

/// Runs `program args... <input> <output_dir>` as a blocking subprocess.
#[derive(Debug, Clone)]
pub struct ExternalConverter {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: Vec<(String, OsString)>,
}

impl ExternalConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        let mut env = Vec::new();
        if let Some(var) = &config.search_path_var {
            let dir = config
                .working_dir
                .clone()
                .or_else(|| std::env::current_dir().ok());
            if let Some(dir) = dir {
                env.push((var.clone(), extend_search_path(std::env::var_os(var), &dir)));
            }
        }

        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            working_dir: config.working_dir.clone(),
            env,
        }
    }

    fn command(&self, input: &Path, output_dir: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(input).arg(output_dir);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command
    }
}

impl Converter for ExternalConverter {
    fn convert(&self, input: &Path, output_dir: &Path) -> Result<Conversion, DispatchError> {
        let mut command = self.command(input, output_dir);
        debug!("Command: {:?}", command);

        let started = Instant::now();
        let output = command.output().map_err(|source| DispatchError::Spawn {
            program: self.program.clone(),
            input: input.to_path_buf(),
            source,
        })?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines().chain(stderr.lines()) {
            debug!("{}", line.trim());
        }

        Ok(Conversion {
            input: input.to_path_buf(),
            exit_code: output.status.code(),
            success: output.status.success(),
            elapsed_ms,
            stdout: tail(&stdout, OUTPUT_TAIL_LINES),
            stderr: tail(&stderr, OUTPUT_TAIL_LINES),
        })
    }
}

/// Appends `dir` to an existing search path value, or starts a new one.
pub fn extend_search_path(current: Option<OsString>, dir: &Path) -> OsString {
    let mut paths: Vec<PathBuf> = current
        .as_deref()
        .map(|value| std::env::split_paths(value).collect())
        .unwrap_or_default();
    paths.push(dir.to_path_buf());

    // join_paths only fails for entries containing the separator; keep the directory alone then.
    std::env::join_paths(&paths).unwrap_or_else(|_| dir.as_os_str().to_os_string())
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
