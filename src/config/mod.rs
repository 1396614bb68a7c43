use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize};

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub mod error;
pub use error::ConfigError;

pub mod policy;
pub use policy::{FailurePolicy, Layout};

pub const DEFAULT_MEASUREMENT_PATTERN: &str = "*.nc";
pub const DEFAULT_SEARCH_PATH_VAR: &str = "PYTHONPATH";

/// External program invoked once per measurement file as
/// `program args... <measurement file> <output dir>`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConverterConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Environment variable extended with the current working directory
    /// before the converter runs, so a script next to the caller is found.
    pub search_path_var: Option<String>,
    pub working_dir: Option<PathBuf>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["nc2tiff.py".to_string()],
            search_path_var: Some(DEFAULT_SEARCH_PATH_VAR.to_string()),
            working_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    staging_root: PathBuf,
    shared_staging: bool,
    keep_staging: bool,
    converter: ConverterConfig,
    on_failure: FailurePolicy,
    layout: Layout,
    product: Option<String>,
    measurement_pattern: String,
    verify_outputs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            staging_root: std::env::temp_dir(),
            shared_staging: false,
            keep_staging: false,
            converter: ConverterConfig::default(),
            on_failure: FailurePolicy::default(),
            layout: Layout::default(),
            product: None,
            measurement_pattern: DEFAULT_MEASUREMENT_PATTERN.to_string(),
            verify_outputs: false,
        }
    }
}

// Deserializes a Config from JSON, filling unset fields with defaults and rejecting patterns
// or product identifiers that would escape the SAFE layout.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(default)]
        struct ConfigHelper {
            staging_root: Option<PathBuf>,
            shared_staging: bool,
            keep_staging: bool,
            converter: ConverterConfig,
            on_failure: FailurePolicy,
            layout: Layout,
            product: Option<String>,
            measurement_pattern: Option<String>,
            verify_outputs: bool,
        }

        impl Default for ConfigHelper {
            fn default() -> Self {
                Self {
                    staging_root: None,
                    shared_staging: false,
                    keep_staging: false,
                    converter: ConverterConfig::default(),
                    on_failure: FailurePolicy::default(),
                    layout: Layout::default(),
                    product: None,
                    measurement_pattern: None,
                    verify_outputs: false,
                }
            }
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        let config = Config {
            staging_root: helper.staging_root.unwrap_or_else(std::env::temp_dir),
            shared_staging: helper.shared_staging,
            keep_staging: helper.keep_staging,
            converter: helper.converter,
            on_failure: helper.on_failure,
            layout: helper.layout,
            product: helper.product,
            measurement_pattern: helper
                .measurement_pattern
                .unwrap_or_else(|| DEFAULT_MEASUREMENT_PATTERN.to_string()),
            verify_outputs: helper.verify_outputs,
        };

        config.validate().map_err(D::Error::custom)?;

        Ok(config)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader)?;

        Ok(config)
    }

    /// Checks the invariants `from_file` enforces. Call again after applying overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.converter.program.trim().is_empty() {
            return Err(ConfigError::EmptyProgram);
        }

        let pattern = &self.measurement_pattern;
        if pattern.contains('/') || pattern.contains(std::path::MAIN_SEPARATOR) {
            return Err(ConfigError::PatternSeparator(pattern.clone()));
        }
        glob::Pattern::new(pattern).map_err(|source| ConfigError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;

        if let Some(product) = &self.product {
            let bad = product.is_empty()
                || product.contains('/')
                || product.contains(std::path::MAIN_SEPARATOR)
                || product.ends_with(".SAFE");
            if bad {
                return Err(ConfigError::Product(product.clone()));
            }
        }

        Ok(())
    }

    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    pub fn shared_staging(&self) -> bool {
        self.shared_staging
    }

    pub fn keep_staging(&self) -> bool {
        self.keep_staging
    }

    pub fn converter(&self) -> &ConverterConfig {
        &self.converter
    }

    pub fn on_failure(&self) -> FailurePolicy {
        self.on_failure
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }

    pub fn measurement_pattern(&self) -> &str {
        &self.measurement_pattern
    }

    pub fn verify_outputs(&self) -> bool {
        self.verify_outputs
    }

    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = root.into();
        self
    }

    pub fn with_shared_staging(mut self, shared: bool) -> Self {
        self.shared_staging = shared;
        self
    }

    pub fn with_keep_staging(mut self, keep: bool) -> Self {
        self.keep_staging = keep;
        self
    }

    pub fn with_converter(mut self, converter: ConverterConfig) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_product(mut self, product: Option<String>) -> Self {
        self.product = product;
        self
    }

    pub fn with_measurement_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.measurement_pattern = pattern.into();
        self
    }

    pub fn with_verify_outputs(mut self, verify: bool) -> Self {
        self.verify_outputs = verify;
        self
    }
}
