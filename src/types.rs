use std::path::PathBuf;

/// A (longitude, latitude) position in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// The four ground corners of an overlay, in descriptor order.
///
/// KML lists `gx:LatLonQuad` corners counter-clockwise starting at the
/// lower-left corner of the image. Corner N is bound to pixel corner N by
/// [`crate::core::derive_gcps`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerQuad {
    pub corners: [LonLat; 4],
}

impl CornerQuad {
    pub fn new(corners: [LonLat; 4]) -> Self {
        Self { corners }
    }

    /// Build a quad from parsed coordinate tuples, enforcing the point count
    pub fn from_points(points: &[LonLat]) -> Result<Self, ParseError> {
        let corners: [LonLat; 4] = points
            .try_into()
            .map_err(|_| ParseError::WrongPointCount(points.len()))?;
        Ok(Self { corners })
    }

    /// Axis-aligned extent as (min_lon, min_lat, max_lon, max_lat)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_lon, min_lat, max_lon, max_lat), c| {
                (min_lon.min(c.lon), min_lat.min(c.lat), max_lon.max(c.lon), max_lat.max(c.lat))
            },
        )
    }
}

/// Binding between an image pixel position and a geographic coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundControlPoint {
    pub geo_x: f64,
    pub geo_y: f64,
    pub geo_z: f64,
    pub pixel_x: f64,
    pub pixel_y: f64,
}

/// Terminal state of a single archive conversion that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// A new GeoTIFF was written
    Converted(PathBuf),
    /// The output already existed; nothing was read or written
    Skipped(PathBuf),
}

impl ConversionOutcome {
    pub fn output_path(&self) -> &PathBuf {
        match self {
            ConversionOutcome::Converted(p) | ConversionOutcome::Skipped(p) => p,
        }
    }
}

/// Failures while reading the KML descriptor of an overlay
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No KML found")]
    NoDescriptorFound,

    #[error("Malformed KML: {0}")]
    MalformedDescriptor(String),

    #[error("No LatLonQuad found")]
    NoQuadFound,

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("LatLonQuad does not have 4 points (found {0})")]
    WrongPointCount(usize),

    #[error("No GroundOverlay found")]
    NoOverlayFound,

    #[error("GroundOverlay has no Icon/href")]
    NoImageRef,

    #[error("Image file not found: {}", .0.display())]
    ImageNotFound(PathBuf),
}

/// Failures while decoding, warping or encoding rasters
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("Failed to open image file {}: {reason}", path.display())]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Warp failed: {0}")]
    WarpFailed(String),

    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("Invalid encode options: {0}")]
    InvalidOptions(String),
}

/// Error types for a single archive conversion
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Result type for conversion operations
pub type KmzResult<T> = Result<T, ConversionError>;
