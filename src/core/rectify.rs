use crate::types::{CornerQuad, GroundControlPoint, RasterError};
use gdal::Dataset;
use std::path::{Path, PathBuf};

/// Bind the quad corners to the image's pixel corners.
///
/// Corner 0 maps to pixel `(0, height)`, corner 1 to `(width, height)`,
/// corner 2 to `(width, 0)` and corner 3 to `(0, 0)`. Pixel row 0 is the top
/// row of the decoded image.
pub fn derive_gcps(quad: &CornerQuad, width: usize, height: usize) -> [GroundControlPoint; 4] {
    let (w, h) = (width as f64, height as f64);
    let pixels = [(0.0, h), (w, h), (w, 0.0), (0.0, 0.0)];

    let mut gcps = [GroundControlPoint {
        geo_x: 0.0,
        geo_y: 0.0,
        geo_z: 0.0,
        pixel_x: 0.0,
        pixel_y: 0.0,
    }; 4];
    for ((gcp, corner), (px, py)) in gcps.iter_mut().zip(quad.corners.iter()).zip(pixels) {
        *gcp = GroundControlPoint {
            geo_x: corner.lon,
            geo_y: corner.lat,
            geo_z: 0.0,
            pixel_x: px,
            pixel_y: py,
        };
    }
    gcps
}

/// Source image with its ground control points attached, not yet resampled
pub struct RectifiedRaster {
    pub dataset: Dataset,
    pub source_path: PathBuf,
    pub gcps: [GroundControlPoint; 4],
    /// Reference system of the GCP coordinates
    pub srs: String,
    pub width: usize,
    pub height: usize,
}

/// KML coordinates are always WGS84 longitude/latitude
pub const GCP_SRS: &str = "EPSG:4326";

/// Opens overlay images and attaches the corner correspondence
#[derive(Debug, Default)]
pub struct Rectifier;

impl Rectifier {
    pub fn new() -> Self {
        Self
    }

    pub fn rectify(&self, image_path: &Path, quad: &CornerQuad) -> Result<RectifiedRaster, RasterError> {
        let open_failed = |reason: String| RasterError::OpenFailed {
            path: image_path.to_path_buf(),
            reason,
        };

        let dataset = Dataset::open(image_path).map_err(|e| open_failed(e.to_string()))?;
        let (width, height) = dataset.raster_size();
        if width == 0 || height == 0 || dataset.raster_count() < 1 {
            return Err(open_failed(format!(
                "empty raster ({}x{}, {} bands)",
                width,
                height,
                dataset.raster_count()
            )));
        }

        let gcps = derive_gcps(quad, width, height);
        log::debug!(
            "Image {}x{} with {} bands, GCPs: {:?}",
            width,
            height,
            dataset.raster_count(),
            gcps
        );

        Ok(RectifiedRaster {
            dataset,
            source_path: image_path.to_path_buf(),
            gcps,
            srs: GCP_SRS.to_string(),
            width,
            height,
        })
    }
}
