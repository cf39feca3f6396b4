use std::fmt::Write as _;

use serde_json::Value;

use crate::constants;
use crate::types::{Feature, GeographicFeatures, Geometry, Polygon, Ring};

/// Renders the geographic feature set as a KML document.
///
/// One `Placemark` per feature, named after its `name` or `title` property or
/// `AOI <n>` by position. Multi-part features become a `MultiGeometry`.
pub fn to_kml(features: &GeographicFeatures) -> String {
    let mut out = String::new();
    let _ = write!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = write!(out, r#"<kml xmlns="{}"><Document>"#, constants::KML_NAMESPACE);
    let _ = write!(out, "<name>{}</name>", escape_xml(constants::KML_DOCUMENT_NAME));

    for (index, feature) in features.features.iter().enumerate() {
        let name = placemark_name(feature, index + 1);
        let _ = write!(out, "<Placemark><name>{}</name>", escape_xml(&name));
        match &feature.geometry {
            Geometry::Polygon(polygon) => write_polygon(&mut out, polygon),
            Geometry::MultiPolygon(parts) => {
                out.push_str("<MultiGeometry>");
                for polygon in parts {
                    write_polygon(&mut out, polygon);
                }
                out.push_str("</MultiGeometry>");
            }
        }
        out.push_str("</Placemark>");
    }

    out.push_str("</Document></kml>");
    out
}

/// Escapes the five XML special characters.
pub fn escape_xml(input: &str) -> String {
    let mut s = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => s.push_str("&amp;"),
            '<' => s.push_str("&lt;"),
            '>' => s.push_str("&gt;"),
            '"' => s.push_str("&quot;"),
            '\'' => s.push_str("&apos;"),
            _ => s.push(ch),
        }
    }
    s
}

fn placemark_name(feature: &Feature, ordinal: usize) -> String {
    ["name", "title"]
        .iter()
        .filter_map(|key| feature.properties.get(*key))
        .find(|v| is_truthy(v))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| format!("AOI {ordinal}"))
}

/// Empty strings, zero, `false` and `null` do not count as a name.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn write_polygon(out: &mut String, polygon: &Polygon) {
    let Some(outer) = polygon.outer() else {
        return;
    };
    let _ = write!(
        out,
        "<Polygon><outerBoundaryIs><LinearRing><coordinates>{}</coordinates></LinearRing></outerBoundaryIs>",
        ring_coordinates(outer)
    );
    for hole in polygon.holes() {
        let _ = write!(
            out,
            "<innerBoundaryIs><LinearRing><coordinates>{}</coordinates></LinearRing></innerBoundaryIs>",
            ring_coordinates(hole)
        );
    }
    out.push_str("</Polygon>");
}

fn ring_coordinates(ring: &Ring) -> String {
    let coords: Vec<String> = ring
        .closed_positions()
        .iter()
        .map(|p| format!("{},{},0", p.x, p.y))
        .collect();
    coords.join(" ")
}
