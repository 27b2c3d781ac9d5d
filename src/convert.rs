//! Single-archive pipeline: extract, parse, rectify, encode

use crate::config::ConverterConfig;
use crate::core::{GeoTiffEncoder, Rectifier};
use crate::io::kmz_reader::archive_stem;
use crate::io::{parse_overlay, KmzReader};
use crate::types::{ConversionOutcome, KmzResult};
use std::path::{Path, PathBuf};

/// Deterministic output location: `<output_dir>/<archive stem>.<output_extension>`
pub fn output_path_for(archive: &Path, config: &ConverterConfig) -> PathBuf {
    config
        .output_dir
        .join(format!("{}.{}", archive_stem(archive), config.output_extension))
}

/// Reusable converter holding the validated settings
pub struct Converter {
    config: ConverterConfig,
    rectifier: Rectifier,
    encoder: GeoTiffEncoder,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> KmzResult<Self> {
        let encoder = GeoTiffEncoder::new(config.encode.clone())?;
        let rectifier = Rectifier::new();
        Ok(Self {
            config,
            rectifier,
            encoder,
        })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert one archive.
    ///
    /// Returns `Skipped` without touching the archive when the output already
    /// exists. Working directories and intermediate rasters are removed on
    /// every exit path.
    pub fn convert(&self, archive: &Path) -> KmzResult<ConversionOutcome> {
        let base = archive_stem(archive);
        let output_path = output_path_for(archive, &self.config);

        if output_path.exists() {
            log::info!("⏭️ Skipping {} (already exists)", base);
            return Ok(ConversionOutcome::Skipped(output_path));
        }

        log::info!("Processing {} ...", base);
        let start_time = std::time::Instant::now();
        std::fs::create_dir_all(&self.config.output_dir)?;

        let extracted = KmzReader::new(archive)?
            .extract(self.config.work_dir.as_deref(), self.config.keep_work_dirs)?;

        let overlay = parse_overlay(extracted.root(), &self.config.descriptor_extension)?;
        let rectified = self.rectifier.rectify(&overlay.image_path, &overlay.quad)?;
        self.encoder.encode(&rectified, &output_path)?;

        log::info!("  ✅ Saved GeoTIFF: {}", output_path.display());
        log::debug!("{} converted in {:?}", base, start_time.elapsed());
        Ok(ConversionOutcome::Converted(output_path))
    }
}

/// Convert a single archive with the given settings
pub fn convert_kmz(archive: &Path, config: &ConverterConfig) -> KmzResult<ConversionOutcome> {
    Converter::new(config.clone())?.convert(archive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_for() {
        let config = ConverterConfig::new("/in").with_output_dir("/out");
        assert_eq!(
            output_path_for(Path::new("/in/Golden Gate.kmz"), &config),
            PathBuf::from("/out/Golden Gate.tif")
        );
        assert_eq!(
            output_path_for(Path::new("/in/upper.KMZ"), &config),
            PathBuf::from("/out/upper.tif")
        );
    }

    #[test]
    fn test_target_srs_only_affects_warp() {
        let mut config = ConverterConfig::new("/in");
        config.encode.target_srs = "EPSG:3857".to_string();
        let converter = Converter::new(config).unwrap();

        let warp = converter.encoder.warp_args();
        let t_srs = warp.iter().position(|a| a == "-t_srs").unwrap();
        assert_eq!(warp[t_srs + 1], "EPSG:3857");
        assert_eq!(crate::core::rectify::GCP_SRS, "EPSG:4326");
    }

    #[test]
    fn test_existing_output_is_skipped_without_reading_archive() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConverterConfig::new(dir.path());
        std::fs::create_dir_all(&config.output_dir).unwrap();

        // The archive does not exist at all; the skip check must come first
        let archive = dir.path().join("done.kmz");
        let existing = config.output_dir.join("done.tif");
        std::fs::write(&existing, b"previous result").unwrap();

        let outcome = convert_kmz(&archive, &config).unwrap();
        assert_eq!(outcome, ConversionOutcome::Skipped(existing.clone()));
        assert_eq!(std::fs::read(&existing).unwrap(), b"previous result");
    }
}
