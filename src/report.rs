use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::archive::Extraction;
use crate::config::FailurePolicy;
use crate::dispatch::Conversion;
use crate::outputs::TiffSummary;
use crate::product::ProductId;

#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    pub path: PathBuf,
    pub product: Option<ProductId>,
}

impl Measurement {
    pub fn new(path: PathBuf) -> Self {
        let product = ProductId::from_measurement_path(&path);
        Self { path, product }
    }
}

/// Everything a run did, in the order it did it.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub staging_dir: Option<PathBuf>,
    pub policy: FailurePolicy,
    pub archives: Vec<Extraction>,
    pub measurements: Vec<Measurement>,
    pub conversions: Vec<Conversion>,
    pub tiffs: Vec<TiffSummary>,
}

impl RunReport {
    pub fn new(input: &Path, output_dir: &Path, policy: FailurePolicy) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            input: input.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            staging_dir: None,
            policy,
            archives: Vec::new(),
            measurements: Vec::new(),
            conversions: Vec::new(),
            tiffs: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn failed_conversions(&self) -> impl Iterator<Item = &Conversion> {
        self.conversions.iter().filter(|c| !c.success)
    }

    /// Whether the run should exit successfully. Converter failures only count when the
    /// policy inspects them.
    pub fn succeeded(&self) -> bool {
        match self.policy {
            FailurePolicy::Ignore => true,
            FailurePolicy::Abort | FailurePolicy::Continue => {
                self.failed_conversions().next().is_none()
            }
        }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn log_summary(&self) {
        let extracted: usize = self.archives.iter().map(|a| a.files_extracted).sum();
        info!(
            "Archives: {}, extracted files: {}, measurement files: {}",
            self.archives.len(),
            extracted,
            self.measurements.len()
        );

        for measurement in &self.measurements {
            if let Some(product) = &measurement.product {
                info!(
                    "  {} {} {} orbit {} acquired {}",
                    product.mission,
                    product.mode,
                    product.product_type,
                    product.absolute_orbit,
                    product.start
                );
            }
        }

        let failed: Vec<&Conversion> = self.failed_conversions().collect();
        info!(
            "Conversions: {} run, {} failed",
            self.conversions.len(),
            failed.len()
        );
        for conversion in failed {
            warn!(
                "  {} ({}): {}",
                conversion.input.display(),
                conversion.status(),
                conversion.stderr.lines().last().unwrap_or("")
            );
        }

        for tiff in &self.tiffs {
            info!("  {} ({}x{})", tiff.path.display(), tiff.width, tiff.height);
        }

        if let Some(finished) = self.finished_at {
            let elapsed = finished - self.started_at;
            info!("Finished in {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn conversion(input: &str, success: bool) -> Conversion {
        Conversion {
            input: PathBuf::from(input),
            exit_code: Some(if success { 0 } else { 2 }),
            success,
            elapsed_ms: 5,
            stdout: String::new(),
            stderr: "Traceback".to_string(),
        }
    }

    #[test]
    fn test_succeeded_depends_on_policy() {
        let mut report =
            RunReport::new(Path::new("zips"), Path::new("out"), FailurePolicy::Continue);
        report.conversions.push(conversion("a.nc", true));
        assert!(report.succeeded());

        report.conversions.push(conversion("b.nc", false));
        assert!(!report.succeeded());

        report.policy = FailurePolicy::Ignore;
        assert!(report.succeeded());
    }

    #[test]
    fn test_empty_run_succeeds() {
        let report = RunReport::new(Path::new("zips"), Path::new("out"), FailurePolicy::Abort);
        assert!(report.succeeded());
        assert_eq!(report.failed_conversions().count(), 0);
    }

    #[test]
    fn test_measurement_parses_product() {
        let path = PathBuf::from("/s")
            .join("S1A_IW_OCN__2SDV_20190101T053012_20190101T053037_025273_02CB6E_1234.SAFE")
            .join("measurement/a.nc");
        let measurement = Measurement::new(path);
        assert_eq!(measurement.product.unwrap().product_type, "OCN");

        assert!(Measurement::new(PathBuf::from("/s/X.SAFE/measurement/a.nc"))
            .product
            .is_none());
    }

    #[test]
    fn test_write_json() {
        let dir = tempdir().unwrap();
        let mut report = RunReport::new(Path::new("zips"), Path::new("out"), FailurePolicy::Abort);
        report.conversions.push(conversion("a.nc", true));
        report.finish();

        let path = dir.path().join("report.json");
        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["policy"], "abort");
        assert_eq!(value["conversions"][0]["exit_code"], 0);
        assert!(value["finished_at"].is_string());
    }
}
