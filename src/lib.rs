//! Expand Sentinel-1 SAFE zip archives, locate their NetCDF measurement files and hand
//! each one to an external NetCDF-to-TIFF converter.

pub mod archive;
pub mod config;
pub mod dispatch;
pub mod outputs;
pub mod pipeline;
pub mod product;
pub mod report;
pub mod resolver;

pub use config::Config;
pub use pipeline::{Pipeline, PipelineError, RunFailure};
pub use report::RunReport;
