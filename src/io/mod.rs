//! I/O modules for reading KMZ archives and their KML descriptors

pub mod kmz_reader;
pub mod kml;

pub use kmz_reader::{KmzReader, ExtractedKmz};
pub use kml::{KmlDocument, OverlayDescriptor, parse_overlay};
