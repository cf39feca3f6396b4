use crate::types::{EpsgCode, FeatureSet, Polygon, Ring};

/// Encodes every polygon of the set as one WKT geometry.
///
/// One polygon gives `POLYGON(...)`, several give `MULTIPOLYGON(...)` in
/// feature order with multi-part features flattened. An empty set gives an
/// empty string, which callers treat as "not available".
pub fn to_wkt(features: &FeatureSet) -> String {
    let polygons: Vec<&Polygon> = features.polygons().collect();
    match polygons.as_slice() {
        [] => String::new(),
        [single] => format!("POLYGON{}", polygon_body(single)),
        many => {
            let parts: Vec<String> = many.iter().map(|p| polygon_body(p)).collect();
            format!("MULTIPOLYGON({})", parts.join(", "))
        }
    }
}

/// `SRID=<code>;` followed by [`to_wkt`], or empty when there is nothing to encode.
pub fn to_ewkt(features: &FeatureSet, epsg: EpsgCode) -> String {
    let wkt = to_wkt(features);
    if wkt.is_empty() {
        return wkt;
    }
    format!("SRID={};{}", epsg.code(), wkt)
}

fn polygon_body(polygon: &Polygon) -> String {
    let rings: Vec<String> = polygon.rings.iter().map(ring_body).collect();
    format!("({})", rings.join(", "))
}

fn ring_body(ring: &Ring) -> String {
    let coords: Vec<String> = ring
        .closed_positions()
        .iter()
        .map(|p| format!("{} {}", p.x, p.y))
        .collect();
    format!("({})", coords.join(", "))
}
