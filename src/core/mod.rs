//! Core georeferencing modules

pub mod gdal_app;
pub mod rectify;
pub mod encode;

// Re-export main types
pub use rectify::{derive_gcps, RectifiedRaster, Rectifier};
pub use encode::GeoTiffEncoder;
