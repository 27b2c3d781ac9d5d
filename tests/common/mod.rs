//! Fixtures: KML documents, PNG overlays and KMZ archives built on the fly

#![allow(dead_code)]

use gdal::raster::Buffer;
use gdal::DriverManager;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;

pub const BAY_AREA_QUAD: &str = "-122.5,37.8,0 -122.4,37.8,0 -122.4,37.7,0 -122.5,37.7,0";

/// KML with a single ground overlay
pub fn kml_document(coordinates: Option<&str>, href: Option<&str>) -> String {
    let icon = href
        .map(|h| format!("<Icon><href>{}</href></Icon>", h))
        .unwrap_or_default();
    let quad = coordinates
        .map(|c| format!("<gx:LatLonQuad><coordinates>{}</coordinates></gx:LatLonQuad>", c))
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2" xmlns:gx="http://www.google.com/kml/ext/2.2">
  <Document>
    <name>Test overlay</name>
    <GroundOverlay>
      <name>overlay</name>
      {}
      {}
    </GroundOverlay>
  </Document>
</kml>"#,
        icon, quad
    )
}

/// Write an RGB gradient PNG of the given size
pub fn write_png(path: &Path, width: usize, height: usize) {
    let mem = DriverManager::get_driver_by_name("MEM").unwrap();
    let dataset = mem
        .create_with_band_type::<u8, _>("", width as isize, height as isize, 3)
        .unwrap();

    for band_index in 1..=3isize {
        let data: Vec<u8> = (0..height)
            .flat_map(|y| {
                (0..width).map(move |x| match band_index {
                    1 => (x * 255 / width.max(1)) as u8,
                    2 => (y * 255 / height.max(1)) as u8,
                    _ => 128,
                })
            })
            .collect();
        let mut band = dataset.rasterband(band_index).unwrap();
        band.write((0, 0), (width, height), &Buffer::new((width, height), data))
            .unwrap();
    }

    let png = DriverManager::get_driver_by_name("PNG").unwrap();
    dataset.create_copy(&png, path, &[]).unwrap();
}

pub fn png_bytes(width: usize, height: usize) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.png");
    write_png(&path, width, height);
    std::fs::read(&path).unwrap()
}

/// Zip `members` into `dir/name`
pub fn write_kmz(dir: &Path, name: &str, members: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (member, data) in members {
        zip.start_file(*member, FileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// KMZ with `doc.kml` and `files/overlay.png`
pub fn overlay_kmz(dir: &Path, name: &str, coordinates: &str, width: usize, height: usize) -> PathBuf {
    let kml = kml_document(Some(coordinates), Some("files/overlay.png"));
    let png = png_bytes(width, height);
    write_kmz(
        dir,
        name,
        &[("doc.kml", kml.as_bytes()), ("files/overlay.png", png.as_slice())],
    )
}

/// Regular files directly inside `dir`, sorted by name
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
