mod common;

use common::{kml_document, BAY_AREA_QUAD};
use kmz2geotiff::io::kml::parse_overlay;
use kmz2geotiff::{ConversionError, LonLat, ParseError};
use std::path::Path;

fn extracted_dir(kml: Option<&str>, image: Option<&str>) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    if let Some(kml) = kml {
        std::fs::write(dir.path().join("doc.kml"), kml).unwrap();
    }
    if let Some(image) = image {
        let path = dir.path().join(image);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"image bytes").unwrap();
    }
    dir
}

fn parse_error(root: &Path) -> ParseError {
    match parse_overlay(root, "kml") {
        Err(ConversionError::Parse(e)) => e,
        other => panic!("expected a parse error, got {:?}", other.map(|d| d.image_path)),
    }
}

#[test]
fn test_valid_descriptor() {
    let kml = kml_document(Some(BAY_AREA_QUAD), Some("files/overlay.png"));
    let dir = extracted_dir(Some(&kml), Some("files/overlay.png"));

    let overlay = parse_overlay(dir.path(), "kml").expect("Failed to parse overlay");
    assert_eq!(overlay.descriptor_path, dir.path().join("doc.kml"));
    assert_eq!(overlay.image_path, dir.path().join("files").join("overlay.png"));
    assert_eq!(
        overlay.quad.corners,
        [
            LonLat::new(-122.5, 37.8),
            LonLat::new(-122.4, 37.8),
            LonLat::new(-122.4, 37.7),
            LonLat::new(-122.5, 37.7),
        ]
    );
}

#[test]
fn test_wrong_point_counts() {
    let three = "-122.5,37.8,0 -122.4,37.8,0 -122.4,37.7,0";
    let five = "-122.5,37.8,0 -122.4,37.8,0 -122.4,37.7,0 -122.5,37.7,0 -122.5,37.8,0";

    for (coords, expected) in [(three, 3), (five, 5)] {
        let kml = kml_document(Some(coords), Some("overlay.png"));
        let dir = extracted_dir(Some(&kml), Some("overlay.png"));
        match parse_error(dir.path()) {
            ParseError::WrongPointCount(n) => assert_eq!(n, expected),
            other => panic!("expected WrongPointCount, got {:?}", other),
        }
    }
}

#[test]
fn test_missing_quad() {
    let kml = kml_document(None, Some("overlay.png"));
    let dir = extracted_dir(Some(&kml), Some("overlay.png"));
    assert!(matches!(parse_error(dir.path()), ParseError::NoQuadFound));
}

#[test]
fn test_invalid_coordinate() {
    let kml = kml_document(Some("-122.5,north -122.4,37.8 -122.4,37.7 -122.5,37.7"), Some("overlay.png"));
    let dir = extracted_dir(Some(&kml), Some("overlay.png"));
    assert!(matches!(parse_error(dir.path()), ParseError::InvalidCoordinate(_)));
}

#[test]
fn test_missing_image_reference() {
    let kml = kml_document(Some(BAY_AREA_QUAD), None);
    let dir = extracted_dir(Some(&kml), None);
    assert!(matches!(parse_error(dir.path()), ParseError::NoImageRef));
}

#[test]
fn test_missing_ground_overlay() {
    let kml = format!(
        r#"<kml xmlns="http://www.opengis.net/kml/2.2" xmlns:gx="http://www.google.com/kml/ext/2.2">
             <Document><gx:LatLonQuad><coordinates>{}</coordinates></gx:LatLonQuad></Document>
           </kml>"#,
        BAY_AREA_QUAD
    );
    let dir = extracted_dir(Some(&kml), None);
    assert!(matches!(parse_error(dir.path()), ParseError::NoOverlayFound));
}

#[test]
fn test_image_not_found() {
    let kml = kml_document(Some(BAY_AREA_QUAD), Some("files/missing.png"));
    let dir = extracted_dir(Some(&kml), Some("files/other.png"));
    match parse_error(dir.path()) {
        ParseError::ImageNotFound(path) => assert!(path.ends_with("files/missing.png")),
        other => panic!("expected ImageNotFound, got {:?}", other),
    }
}

#[test]
fn test_no_descriptor() {
    let dir = extracted_dir(None, Some("overlay.png"));
    assert!(matches!(parse_error(dir.path()), ParseError::NoDescriptorFound));
}

#[test]
fn test_malformed_descriptor() {
    let dir = extracted_dir(Some("<kml><GroundOverlay></kml>"), None);
    assert!(matches!(parse_error(dir.path()), ParseError::MalformedDescriptor(_)));
}
