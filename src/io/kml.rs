use crate::types::{CornerQuad, KmzResult, LonLat, ParseError};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use std::path::{Component, Path, PathBuf};

/// OGC KML 2.2 namespace
pub const KML_NS: &str = "http://www.opengis.net/kml/2.2";
/// Google extension namespace hosting `gx:LatLonQuad`
pub const GX_NS: &str = "http://www.google.com/kml/ext/2.2";

/// Namespace-resolved name of an open element
#[derive(Debug, Clone, PartialEq, Eq)]
struct QualifiedName {
    namespace: Option<String>,
    name: String,
}

impl QualifiedName {
    fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }
}

/// Element whose text is being collected, with its depth in the open-element stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Quad(usize),
    Href(usize),
}

/// A `<GroundOverlay>` element
#[derive(Debug, Clone, Copy)]
pub struct GroundOverlay<'a> {
    href: Option<&'a str>,
}

impl<'a> GroundOverlay<'a> {
    /// Text of `Icon/href`, if present and non-empty
    pub fn image_href(&self) -> Option<&'a str> {
        self.href.map(str::trim).filter(|href| !href.is_empty())
    }
}

/// The ground overlay parts of a KML document, collected in one streaming pass.
///
/// Only the open-element path is kept while reading, so nesting depth costs
/// heap, never stack.
#[derive(Debug, Clone, Default)]
pub struct KmlDocument {
    quad: Option<String>,
    overlay_found: bool,
    href: Option<String>,
}

impl KmlDocument {
    pub fn parse(xml_content: &str) -> Result<Self, ParseError> {
        let mut reader = NsReader::from_str(xml_content);

        let mut doc = KmlDocument::default();
        let mut stack: Vec<QualifiedName> = Vec::new();
        let mut capture: Option<Capture> = None;
        // Depth of the first GroundOverlay while it is still open
        let mut overlay_depth: Option<usize> = None;
        let mut root_seen = false;

        loop {
            let (ns, event) = reader
                .read_resolved_event()
                .map_err(|e| ParseError::MalformedDescriptor(e.to_string()))?;

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    if stack.is_empty() {
                        if root_seen {
                            return Err(ParseError::MalformedDescriptor(
                                "multiple root elements".to_string(),
                            ));
                        }
                        root_seen = true;
                    }

                    let element = QualifiedName {
                        namespace: namespace_of(&ns),
                        name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    };
                    doc.open(&element, &stack, &mut capture, &mut overlay_depth);
                    stack.push(element);

                    if matches!(event, Event::Empty(_)) {
                        doc.close(&mut stack, &mut capture, &mut overlay_depth);
                    }
                }
                Event::End(_) => {
                    if stack.is_empty() {
                        return Err(ParseError::MalformedDescriptor(
                            "unexpected closing tag".to_string(),
                        ));
                    }
                    doc.close(&mut stack, &mut capture, &mut overlay_depth);
                }
                Event::Text(t) => {
                    if let Some(target) = doc.capture_target(capture, stack.len()) {
                        let text = t
                            .unescape()
                            .map_err(|e| ParseError::MalformedDescriptor(e.to_string()))?;
                        target.push_str(&text);
                    }
                }
                Event::CData(c) => {
                    if let Some(target) = doc.capture_target(capture, stack.len()) {
                        target.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ParseError::MalformedDescriptor(format!(
                "unclosed element <{}>",
                open.name
            )));
        }
        if !root_seen {
            return Err(ParseError::MalformedDescriptor(
                "document has no root element".to_string(),
            ));
        }
        Ok(doc)
    }

    /// Start collecting text if `element` is one of the wanted parts
    fn open(
        &mut self,
        element: &QualifiedName,
        stack: &[QualifiedName],
        capture: &mut Option<Capture>,
        overlay_depth: &mut Option<usize>,
    ) {
        let depth = stack.len() + 1;
        let parent = stack.last();

        if !self.overlay_found && element.is(KML_NS, "GroundOverlay") {
            self.overlay_found = true;
            *overlay_depth = Some(depth);
        }
        if capture.is_some() {
            return;
        }

        if self.quad.is_none()
            && element.is(KML_NS, "coordinates")
            && parent.map_or(false, |p| p.is(GX_NS, "LatLonQuad"))
        {
            self.quad = Some(String::new());
            *capture = Some(Capture::Quad(depth));
        } else if self.href.is_none()
            && element.is(KML_NS, "href")
            && parent.map_or(false, |p| p.is(KML_NS, "Icon"))
            && *overlay_depth == Some(depth - 2)
        {
            self.href = Some(String::new());
            *capture = Some(Capture::Href(depth));
        }
    }

    fn close(
        &mut self,
        stack: &mut Vec<QualifiedName>,
        capture: &mut Option<Capture>,
        overlay_depth: &mut Option<usize>,
    ) {
        let depth = stack.len();
        if matches!(*capture, Some(Capture::Quad(d)) | Some(Capture::Href(d)) if d == depth) {
            *capture = None;
        }
        if *overlay_depth == Some(depth) {
            *overlay_depth = None;
        }
        stack.pop();
    }

    /// Buffer receiving text at `depth`, if the innermost open element is captured
    fn capture_target(&mut self, capture: Option<Capture>, depth: usize) -> Option<&mut String> {
        match capture {
            Some(Capture::Quad(d)) if d == depth => self.quad.as_mut(),
            Some(Capture::Href(d)) if d == depth => self.href.as_mut(),
            _ => None,
        }
    }

    /// Text of the first `gx:LatLonQuad/kml:coordinates`
    pub fn find_quad(&self) -> Option<&str> {
        self.quad.as_deref()
    }

    /// First `kml:GroundOverlay` in the document
    pub fn find_ground_overlay(&self) -> Option<GroundOverlay<'_>> {
        self.overlay_found.then(|| GroundOverlay {
            href: self.href.as_deref(),
        })
    }

    /// `Icon/href` of the first ground overlay
    pub fn find_overlay_image_ref(&self) -> Option<&str> {
        self.find_ground_overlay()?.image_href()
    }
}

fn namespace_of(ns: &ResolveResult) -> Option<String> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        _ => None,
    }
}

/// Parse a KML `coordinates` string: whitespace-separated `lon,lat[,alt]` tuples
pub fn parse_coordinates(text: &str) -> Result<Vec<LonLat>, ParseError> {
    text.split_whitespace()
        .map(|tuple| {
            let fields = tuple
                .split(',')
                .map(|f| f.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(|| ParseError::InvalidCoordinate(tuple.to_string()))?;

            match fields.as_slice() {
                [lon, lat] | [lon, lat, _] => Ok(LonLat::new(*lon, *lat)),
                _ => Err(ParseError::InvalidCoordinate(tuple.to_string())),
            }
        })
        .collect()
}

/// Result of reading an extracted archive's descriptor
#[derive(Debug, Clone)]
pub struct OverlayDescriptor {
    pub descriptor_path: PathBuf,
    pub quad: CornerQuad,
    pub image_path: PathBuf,
}

/// Locate the descriptor at the top level of `root`.
///
/// Matching is case-insensitive on the extension. Candidates are sorted and
/// the first one wins.
pub fn find_descriptor(root: &Path, extension: &str) -> KmzResult<PathBuf> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches && path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    if candidates.len() > 1 {
        log::warn!(
            "Found {} descriptors in {}, using {}",
            candidates.len(),
            root.display(),
            candidates[0].display()
        );
    }

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::NoDescriptorFound.into())
}

/// Resolve an `href` against the extraction root.
///
/// Both `/` and `\` separate components. Parent-directory components are
/// rejected so the result always lies inside `root`.
pub fn resolve_image_path(root: &Path, href: &str) -> Result<PathBuf, ParseError> {
    let mut path = root.to_path_buf();
    for part in href.split(['/', '\\']).filter(|p| !p.is_empty() && *p != ".") {
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => path.push(part),
            _ => return Err(ParseError::ImageNotFound(root.join(href))),
        }
    }

    if path == root || !path.is_file() {
        return Err(ParseError::ImageNotFound(path));
    }
    Ok(path)
}

/// Read the quad and image reference from an extracted archive
pub fn parse_overlay(root: &Path, descriptor_extension: &str) -> KmzResult<OverlayDescriptor> {
    let descriptor_path = find_descriptor(root, descriptor_extension)?;
    log::debug!("Parsing descriptor {}", descriptor_path.display());

    let xml_content = std::fs::read(&descriptor_path)?;
    let xml_content = String::from_utf8(xml_content)
        .map_err(|e| ParseError::MalformedDescriptor(format!("invalid UTF-8: {}", e)))?;
    let document = KmlDocument::parse(&xml_content)?;

    let quad_text = document.find_quad().ok_or(ParseError::NoQuadFound)?;
    let points = parse_coordinates(quad_text)?;
    let quad = CornerQuad::from_points(&points)?;

    let overlay = document.find_ground_overlay().ok_or(ParseError::NoOverlayFound)?;
    let href = overlay.image_href().ok_or(ParseError::NoImageRef)?;
    let image_path = resolve_image_path(root, href)?;

    log::debug!(
        "Overlay image {} with corners {:?}, extent {:?}",
        image_path.display(),
        quad.corners,
        quad.bounds()
    );

    Ok(OverlayDescriptor {
        descriptor_path,
        quad,
        image_path,
    })
}
