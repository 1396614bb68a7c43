use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Layout;
use crate::product::{MEASUREMENT_DIR, SAFE_EXTENSION};

pub mod layout;
pub use layout::validate_layout;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("no .SAFE product directory found in {0}")]
    NoProducts(PathBuf),
    #[error("malformed archive layout in {product}: {reason}")]
    MalformedArchiveLayout { product: String, reason: String },
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Builds `<staging>/<product>.SAFE/measurement/<pattern>`, with `*` standing in for the
/// product when none is requested. The staging part is escaped so only the template
/// segments act as wildcards.
pub fn glob_pattern(staging: &Path, product: Option<&str>, measurement_pattern: &str) -> String {
    let staging = glob::Pattern::escape(&staging.to_string_lossy());
    let product = product.map(glob::Pattern::escape);
    format!(
        "{}/{}.{}/{}/{}",
        staging.trim_end_matches('/'),
        product.as_deref().unwrap_or("*"),
        SAFE_EXTENSION,
        MEASUREMENT_DIR,
        measurement_pattern
    )
}

/// Evaluates the layout glob against the staging directory. No match is an empty result.
pub fn resolve(
    staging: &Path,
    product: Option<&str>,
    measurement_pattern: &str,
) -> Result<Vec<PathBuf>, LayoutError> {
    let pattern = glob_pattern(staging, product, measurement_pattern);
    debug!("Resolving measurement files with {}", pattern);

    let paths = glob::glob(&pattern).map_err(|source| LayoutError::Pattern {
        pattern: pattern.clone(),
        source,
    })?;

    let mut matches = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => matches.push(path),
            Ok(_) => {}
            Err(e) => warn!("Unreadable path while resolving {}: {}", pattern, e),
        }
    }

    Ok(matches)
}

/// Locates measurement files the way `layout` asks for.
pub fn locate(
    layout: Layout,
    staging: &Path,
    product: Option<&str>,
    measurement_pattern: &str,
) -> Result<Vec<PathBuf>, LayoutError> {
    match layout {
        Layout::Glob => resolve(staging, product, measurement_pattern),
        Layout::Strict => validate_layout(staging, product, measurement_pattern),
    }
}
