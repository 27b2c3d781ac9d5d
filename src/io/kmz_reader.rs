use crate::types::{ConversionError, KmzResult};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipArchive;

/// KMZ (zipped KML bundle) reader
pub struct KmzReader {
    kmz_path: PathBuf,
    archive: Option<ZipArchive<File>>,
}

/// Extracted contents of one archive.
///
/// The working directory is removed when this value is dropped, unless it was
/// created with `keep` set.
pub struct ExtractedKmz {
    root: PathBuf,
    work_dir: Option<TempDir>,
}

impl ExtractedKmz {
    /// Directory holding the archive members
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for ExtractedKmz {
    fn drop(&mut self) {
        if let Some(dir) = self.work_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                log::warn!("Failed to remove working directory {}: {}", path.display(), e);
            }
        }
    }
}

impl KmzReader {
    /// Create a new reader for a KMZ archive
    pub fn new<P: AsRef<Path>>(kmz_path: P) -> KmzResult<Self> {
        let kmz_path = kmz_path.as_ref().to_path_buf();

        if !kmz_path.is_file() {
            return Err(ConversionError::Extraction(format!(
                "File not found: {}",
                kmz_path.display()
            )));
        }

        Ok(Self {
            kmz_path,
            archive: None,
        })
    }

    /// Open the ZIP archive
    fn open_archive(&mut self) -> KmzResult<&mut ZipArchive<File>> {
        let archive = match self.archive.take() {
            Some(archive) => archive,
            None => {
                let file = File::open(&self.kmz_path).map_err(|e| {
                    ConversionError::Extraction(format!(
                        "Failed to read {}: {}",
                        self.kmz_path.display(),
                        e
                    ))
                })?;
                ZipArchive::new(file).map_err(|e| {
                    ConversionError::Extraction(format!(
                        "Failed to open ZIP {}: {}",
                        self.kmz_path.display(),
                        e
                    ))
                })?
            }
        };
        Ok(self.archive.insert(archive))
    }

    /// Extract every member into a fresh working directory.
    ///
    /// The directory name is unique per call, so archives sharing a base name
    /// never collide. `work_parent` defaults to the system temp directory.
    pub fn extract(&mut self, work_parent: Option<&Path>, keep: bool) -> KmzResult<ExtractedKmz> {
        let start_time = std::time::Instant::now();
        let prefix = format!("{}_", archive_stem(&self.kmz_path));

        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let work_dir = match work_parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        let archive = self.open_archive()?;
        archive.extract(work_dir.path()).map_err(|e| {
            ConversionError::Extraction(format!("Failed to extract archive: {}", e))
        })?;

        log::debug!(
            "Extracted {} members to {} in {:?}",
            archive.len(),
            work_dir.path().display(),
            start_time.elapsed()
        );

        let root = work_dir.path().to_path_buf();
        let work_dir = if keep {
            let kept = work_dir.into_path();
            log::debug!("Keeping working directory {}", kept.display());
            None
        } else {
            Some(work_dir)
        };

        Ok(ExtractedKmz { root, work_dir })
    }
}

/// File name without its extension, e.g. `overlay` for `/data/overlay.kmz`
pub fn archive_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string())
}
