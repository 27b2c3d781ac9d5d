use crate::config::EncodeOptions;
use crate::core::gdal_app;
use crate::core::rectify::RectifiedRaster;
use crate::types::RasterError;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Writes rectified overlays as tiled, JPEG-compressed GeoTIFFs
pub struct GeoTiffEncoder {
    options: EncodeOptions,
}

impl GeoTiffEncoder {
    pub fn new(options: EncodeOptions) -> Result<Self, RasterError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// `gdal_translate` arguments producing the GCP-tagged intermediate
    pub fn translate_args(&self, raster: &RectifiedRaster) -> Vec<String> {
        let mut args = vec![
            "-of".to_string(),
            "GTiff".to_string(),
            "-a_srs".to_string(),
            raster.srs.clone(),
        ];
        for gcp in &raster.gcps {
            args.push("-gcp".to_string());
            args.extend(
                [gcp.pixel_x, gcp.pixel_y, gcp.geo_x, gcp.geo_y, gcp.geo_z]
                    .iter()
                    .map(|v| v.to_string()),
            );
        }
        args
    }

    /// `gdalwarp` arguments for the final raster
    pub fn warp_args(&self) -> Vec<String> {
        let mut args = vec![
            "-of".to_string(),
            "GTiff".to_string(),
            "-t_srs".to_string(),
            self.options.target_srs.clone(),
        ];
        if self.options.use_tps {
            args.push("-tps".to_string());
        } else {
            args.extend(["-order".to_string(), "2".to_string()]);
        }
        for (key, value) in self.options.creation_options() {
            args.push("-co".to_string());
            args.push(format!("{}={}", key, value));
        }
        args
    }

    /// Warp `raster` onto the target grid and write it to `output_path`.
    ///
    /// The GCP-tagged intermediate lives next to the output and is removed on
    /// every exit path. A partially written output is removed on failure.
    pub fn encode(&self, raster: &RectifiedRaster, output_path: &Path) -> Result<(), RasterError> {
        let start_time = std::time::Instant::now();
        let intermediate = intermediate_path(output_path)?;

        let result = self.encode_via(raster, &intermediate, output_path);
        if result.is_err() && output_path.exists() {
            if let Err(e) = std::fs::remove_file(output_path) {
                log::warn!("Failed to remove partial output {}: {}", output_path.display(), e);
            }
        }

        let intermediate_display = intermediate.display().to_string();
        if let Err(e) = intermediate.close() {
            log::warn!("Failed to remove intermediate {}: {}", intermediate_display, e);
        }

        if result.is_ok() {
            log::debug!("Encoded {} in {:?}", output_path.display(), start_time.elapsed());
        }
        result
    }

    fn encode_via(
        &self,
        raster: &RectifiedRaster,
        intermediate: &Path,
        output_path: &Path,
    ) -> Result<(), RasterError> {
        let with_gcps = gdal_app::translate(&raster.dataset, intermediate, &self.translate_args(raster))?;
        let warped = gdal_app::warp(&with_gcps, output_path, &self.warp_args())?;

        let (width, height) = warped.raster_size();
        log::debug!("Warped raster is {}x{}", width, height);

        // Closing flushes the tiles to disk
        drop(warped);
        drop(with_gcps);
        Ok(())
    }
}

/// Unique `<stem>_with_gcps*.tif` path in the output directory, deleted on drop
fn intermediate_path(output_path: &Path) -> Result<TempPath, RasterError> {
    let dir: PathBuf = match output_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "overlay".to_string());

    tempfile::Builder::new()
        .prefix(&format!("{}_with_gcps", stem))
        .suffix(".tif")
        .tempfile_in(&dir)
        .map(|file| file.into_temp_path())
        .map_err(|e| {
            RasterError::WarpFailed(format!(
                "cannot create intermediate file in {}: {}",
                dir.display(),
                e
            ))
        })
}
