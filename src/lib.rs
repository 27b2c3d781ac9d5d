//! kmz2geotiff: batch conversion of KMZ ground overlays into GeoTIFFs
//!
//! Each archive is extracted into its own working directory, its KML
//! descriptor is searched for a `gx:LatLonQuad` and the overlay image, the
//! image corners are bound to the quad as ground control points, and the
//! image is warped with a thin plate spline onto EPSG:4326. The result is a
//! tiled, JPEG-compressed GeoTIFF.

pub mod types;
pub mod config;
pub mod io;
pub mod core;
pub mod convert;
pub mod batch;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    CornerQuad, LonLat, GroundControlPoint, ConversionOutcome,
    ConversionError, ParseError, RasterError, KmzResult
};

pub use config::{ConverterConfig, EncodeOptions};
pub use io::{KmzReader, KmlDocument, OverlayDescriptor};
pub use core::{derive_gcps, GeoTiffEncoder, RectifiedRaster, Rectifier};
pub use convert::{convert_kmz, output_path_for, Converter};
pub use batch::{convert_directory, BatchDriver, BatchResult, CancelFlag, ConversionLog};
