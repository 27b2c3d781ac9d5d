//! Conversion settings shared by the library, the CLI and the Python bindings

use crate::types::{ConversionError, KmzResult, RasterError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the output folder created next to the input archives
pub const DEFAULT_OUTPUT_FOLDER: &str = "Converted GeoTIFFs";

/// GeoTIFF encoding parameters for the warped output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Target reference system, as understood by `gdalwarp -t_srs`
    pub target_srs: String,
    /// Tile edge length in pixels (square tiles)
    pub block_size: u32,
    /// JPEG quality factor, 1-100
    pub jpeg_quality: u8,
    /// GTiff `BIGTIFF` policy
    pub bigtiff: String,
    /// Warp with a thin plate spline instead of a polynomial fit
    pub use_tps: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            target_srs: "EPSG:4326".to_string(),
            block_size: 512,
            jpeg_quality: 50,
            bigtiff: "IF_SAFER".to_string(),
            use_tps: true,
        }
    }
}

impl EncodeOptions {
    /// GTiff creation options for the final raster
    pub fn creation_options(&self) -> Vec<(String, String)> {
        vec![
            ("TILED".to_string(), "YES".to_string()),
            ("COMPRESS".to_string(), "JPEG".to_string()),
            ("JPEG_QUALITY".to_string(), self.jpeg_quality.to_string()),
            ("BIGTIFF".to_string(), self.bigtiff.clone()),
            ("BLOCKXSIZE".to_string(), self.block_size.to_string()),
            ("BLOCKYSIZE".to_string(), self.block_size.to_string()),
        ]
    }

    pub fn validate(&self) -> Result<(), RasterError> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(RasterError::InvalidOptions(format!(
                "JPEG quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        // TIFF tile dimensions must be multiples of 16
        if self.block_size == 0 || self.block_size % 16 != 0 {
            return Err(RasterError::InvalidOptions(format!(
                "block size must be a positive multiple of 16, got {}",
                self.block_size
            )));
        }
        if self.target_srs.trim().is_empty() {
            return Err(RasterError::InvalidOptions("target SRS is empty".to_string()));
        }
        Ok(())
    }
}

/// Batch conversion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Directory scanned for archives
    pub input_dir: PathBuf,
    /// Directory receiving GeoTIFFs and the conversion log
    pub output_dir: PathBuf,
    pub log_file_name: String,
    pub archive_extension: String,
    pub descriptor_extension: String,
    pub output_extension: String,
    /// Parent directory for per-archive extraction directories (system temp when unset)
    pub work_dir: Option<PathBuf>,
    /// Leave extraction directories on disk for inspection
    pub keep_work_dirs: bool,
    /// Number of archives converted concurrently
    pub jobs: usize,
    pub encode: EncodeOptions,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ConverterConfig {
    /// Settings for `input_dir`, writing into its `Converted GeoTIFFs` folder
    pub fn new<P: AsRef<Path>>(input_dir: P) -> Self {
        let input_dir = input_dir.as_ref().to_path_buf();
        let output_dir = input_dir.join(DEFAULT_OUTPUT_FOLDER);
        Self {
            input_dir,
            output_dir,
            log_file_name: "conversion_log.txt".to_string(),
            archive_extension: "kmz".to_string(),
            descriptor_extension: "kml".to_string(),
            output_extension: "tif".to_string(),
            work_dir: None,
            keep_work_dirs: false,
            jobs: 1,
            encode: EncodeOptions::default(),
        }
    }

    pub fn with_output_dir<P: AsRef<Path>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.as_ref().to_path_buf();
        self
    }

    /// Load settings from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> KmzResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            ConversionError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Invalid config {}: {}", path.as_ref().display(), e),
            ))
        })?;
        Ok(config)
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.output_dir.join(&self.log_file_name)
    }

    pub fn validate(&self) -> KmzResult<()> {
        if !self.input_dir.is_dir() {
            return Err(ConversionError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Input directory not found: {}", self.input_dir.display()),
            )));
        }
        if self.jobs == 0 {
            return Err(ConversionError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "jobs must be at least 1",
            )));
        }
        self.encode.validate()?;
        Ok(())
    }
}
