use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const ZIP_EXTENSION: &str = "zip";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("input path {0} does not exist")]
    MissingInput(PathBuf),
    #[error("failed to read input directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid or corrupt zip {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("failed to write {path} while extracting {archive}: {source}")]
    Write {
        archive: PathBuf,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One archive expanded into the staging directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub archive: PathBuf,
    pub files_extracted: usize,
}

pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ZIP_EXTENSION))
}

/// Lists the archives to expand. A file input is taken as the single archive; a directory
/// input yields every zip file directly inside it, sorted by name.
pub fn list_archives(input: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(ArchiveError::MissingInput(input.to_path_buf()));
    }

    let read_dir_err = |source| ArchiveError::ReadDir {
        path: input.to_path_buf(),
        source,
    };

    let mut archives = Vec::new();
    for entry in fs::read_dir(input).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();
        if path.is_file() && is_zip(&path) {
            archives.push(path);
        } else {
            debug!("Skipping non-archive entry {}", path.display());
        }
    }
    archives.sort();

    Ok(archives)
}

/// Extracts every entry of `archive` below `staging`, replacing files that already exist
/// at the same relative path.
pub fn extract_archive(archive: &Path, staging: &Path) -> Result<Extraction, ArchiveError> {
    let file = fs::File::open(archive).map_err(|source| ArchiveError::Open {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = zip::ZipArchive::new(file).map_err(|source| ArchiveError::Corrupt {
        path: archive.to_path_buf(),
        source,
    })?;

    let write_err = |path: &Path, source| ArchiveError::Write {
        archive: archive.to_path_buf(),
        path: path.to_path_buf(),
        source,
    };

    let mut count = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|source| ArchiveError::Corrupt {
            path: archive.to_path_buf(),
            source,
        })?;

        let Some(entry_path) = entry.enclosed_name() else {
            warn!(
                "Skipping unsafe entry '{}' in {}",
                entry.name(),
                archive.display()
            );
            continue;
        };
        let output_path = staging.join(entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&output_path).map_err(|e| write_err(&output_path, e))?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
        }
        // File::create truncates, which gives overwrite-on-existing semantics.
        let mut outfile =
            fs::File::create(&output_path).map_err(|e| write_err(&output_path, e))?;
        io::copy(&mut entry, &mut outfile).map_err(|e| write_err(&output_path, e))?;
        count += 1;
    }

    Ok(Extraction {
        archive: archive.to_path_buf(),
        files_extracted: count,
    })
}

/// Expands archives one after the other. The first failure aborts and leaves whatever was
/// already extracted in place.
pub fn expand_all(archives: &[PathBuf], staging: &Path) -> Result<Vec<Extraction>, ArchiveError> {
    let mut extractions = Vec::with_capacity(archives.len());
    for archive in archives {
        let extraction = extract_archive(archive, staging)?;
        info!(
            "Extracted {} files from {}",
            extraction.files_extracted,
            archive.display()
        );
        extractions.push(extraction);
    }
    Ok(extractions)
}
