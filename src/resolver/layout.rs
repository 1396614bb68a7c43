use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::LayoutError;
use crate::product::{MEASUREMENT_DIR, is_safe_dir_name};

/// Walks the staging directory and checks every SAFE product (or only `product`, when
/// given) has a `measurement` directory holding at least one file matching
/// `measurement_pattern`. Returns the matching files, sorted.
pub fn validate_layout(
    staging: &Path,
    product: Option<&str>,
    measurement_pattern: &str,
) -> Result<Vec<PathBuf>, LayoutError> {
    let pattern = glob::Pattern::new(measurement_pattern).map_err(|source| {
        LayoutError::Pattern {
            pattern: measurement_pattern.to_string(),
            source,
        }
    })?;

    let products = safe_products(staging, product)?;
    if products.is_empty() {
        return match product {
            Some(id) => Err(LayoutError::MalformedArchiveLayout {
                product: id.to_string(),
                reason: format!("{id}.SAFE not found in {}", staging.display()),
            }),
            None => Err(LayoutError::NoProducts(staging.to_path_buf())),
        };
    }

    let mut files = Vec::new();
    for product_dir in products {
        let name = product_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let measurement = product_dir.join(MEASUREMENT_DIR);
        if !measurement.is_dir() {
            return Err(LayoutError::MalformedArchiveLayout {
                product: name,
                reason: format!("missing {MEASUREMENT_DIR}/ directory"),
            });
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(&measurement).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|source| LayoutError::Walk {
                path: measurement.clone(),
                source,
            })?;
            if entry.file_type().is_file()
                && pattern.matches(&entry.file_name().to_string_lossy())
            {
                found.push(entry.into_path());
            }
        }

        if found.is_empty() {
            return Err(LayoutError::MalformedArchiveLayout {
                product: name,
                reason: format!("no file in {MEASUREMENT_DIR}/ matches '{measurement_pattern}'"),
            });
        }
        files.append(&mut found);
    }

    files.sort();
    Ok(files)
}

/// `*.SAFE` directories directly under `staging`.
fn safe_products(staging: &Path, product: Option<&str>) -> Result<Vec<PathBuf>, LayoutError> {
    let wanted = product.map(|id| format!("{id}.SAFE"));

    let mut products = Vec::new();
    for entry in WalkDir::new(staging).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| LayoutError::Walk {
            path: staging.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        let selected = match &wanted {
            Some(wanted) => name == wanted.as_str(),
            None => is_safe_dir_name(&name),
        };
        if selected {
            products.push(entry.into_path());
        }
    }

    products.sort();
    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_valid_layout_returns_sorted_files() {
        let staging = tempdir().unwrap();
        let b = touch(staging.path(), "Y.SAFE/measurement/s1b-bar.nc");
        let a = touch(staging.path(), "X.SAFE/measurement/s1a-foo.nc");
        touch(staging.path(), "X.SAFE/annotation/notes.xml");

        let files = validate_layout(staging.path(), None, "*.nc").unwrap();
        assert_eq!(files, vec![a, b]);
    }

    #[test]
    fn test_missing_measurement_dir() {
        let staging = tempdir().unwrap();
        touch(staging.path(), "X.SAFE/annotation/s1a-foo.nc");

        let err = validate_layout(staging.path(), None, "*.nc").unwrap_err();
        match err {
            LayoutError::MalformedArchiveLayout { product, reason } => {
                assert_eq!(product, "X.SAFE");
                assert!(reason.contains("measurement"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_measurement_without_netcdf() {
        let staging = tempdir().unwrap();
        touch(staging.path(), "X.SAFE/measurement/s1a-foo.tiff");

        let err = validate_layout(staging.path(), None, "*.nc").unwrap_err();
        assert!(matches!(err, LayoutError::MalformedArchiveLayout { .. }));
    }

    #[test]
    fn test_no_safe_directory() {
        let staging = tempdir().unwrap();
        touch(staging.path(), "X/measurement/s1a-foo.nc");

        let err = validate_layout(staging.path(), None, "*.nc").unwrap_err();
        assert!(matches!(err, LayoutError::NoProducts(_)));
    }

    #[test]
    fn test_requested_product_missing() {
        let staging = tempdir().unwrap();
        touch(staging.path(), "X.SAFE/measurement/s1a-foo.nc");

        let err = validate_layout(staging.path(), Some("Y"), "*.nc").unwrap_err();
        assert!(matches!(err, LayoutError::MalformedArchiveLayout { .. }));

        let files = validate_layout(staging.path(), Some("X"), "*.nc").unwrap();
        assert_eq!(files.len(), 1);
    }
}
