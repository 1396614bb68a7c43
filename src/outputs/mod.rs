use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tiff::decoder::Decoder;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to scan output directory {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a readable TIFF: {reason}")]
    InvalidTiff { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TiffSummary {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

pub fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
}

pub fn ensure_output_dir(path: &Path) -> Result<(), OutputError> {
    std::fs::create_dir_all(path).map_err(|source| OutputError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// All TIFF files below `dir`, sorted.
pub fn scan_tiffs(dir: &Path) -> Result<Vec<PathBuf>, OutputError> {
    let mut tiffs = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| OutputError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_tiff(entry.path()) {
            tiffs.push(entry.into_path());
        }
    }
    Ok(tiffs)
}

/// Decodes the TIFF header to check the converter produced a usable raster.
pub fn inspect_tiff(path: &Path) -> Result<TiffSummary, OutputError> {
    let file = File::open(path).map_err(|source| OutputError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let invalid = |e: tiff::TiffError| OutputError::InvalidTiff {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut decoder = Decoder::new(BufReader::new(file)).map_err(invalid)?;
    let (width, height) = decoder.dimensions().map_err(invalid)?;

    if width == 0 || height == 0 {
        return Err(OutputError::InvalidTiff {
            path: path.to_path_buf(),
            reason: format!("empty raster ({width}x{height})"),
        });
    }

    Ok(TiffSummary {
        path: path.to_path_buf(),
        width,
        height,
    })
}

pub fn verify_outputs(dir: &Path) -> Result<Vec<TiffSummary>, OutputError> {
    scan_tiffs(dir)?.iter().map(|p| inspect_tiff(p)).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use tiff::encoder::{TiffEncoder, colortype};

    pub(crate) fn write_test_tiff(path: &Path, width: u32, height: u32) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let data = vec![0.5f32; (width * height) as usize];
        encoder
            .write_image::<colortype::Gray32Float>(width, height, &data)
            .unwrap();
    }

    #[test]
    fn test_is_tiff() {
        assert!(is_tiff(Path::new("TestTiff.tiff")));
        assert!(is_tiff(Path::new("wind.tif")));
        assert!(is_tiff(Path::new("wind.Tif")));
        assert!(is_tiff(Path::new("WIND.TIFF")));
        assert!(!is_tiff(Path::new("wind.nc")));
    }

    #[test]
    fn test_inspect_valid_tiff() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("TestTiff.tiff");
        write_test_tiff(&path, 4, 3);

        let summary = inspect_tiff(&path).unwrap();
        assert_eq!((summary.width, summary.height), (4, 3));
    }

    #[test]
    fn test_inspect_garbage_is_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.tif");
        fs::write(&path, b"not a tiff at all").unwrap();

        assert!(matches!(inspect_tiff(&path), Err(OutputError::InvalidTiff { .. })));
    }

    #[test]
    fn test_verify_outputs_scans_nested() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("TiffExample")).unwrap();
        write_test_tiff(&dir.path().join("TiffExample/a.tiff"), 2, 2);
        write_test_tiff(&dir.path().join("b.tif"), 3, 1);
        fs::write(dir.path().join("log.txt"), b"").unwrap();

        let summaries = verify_outputs(dir.path()).unwrap();
        assert_eq!(summaries.len(), 2);
    }

    #[test]
    fn test_ensure_output_dir_creates_parents() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("a/b/TiffExample");
        ensure_output_dir(&out).unwrap();
        assert!(out.is_dir());
    }
}
