//! Turns drawn shapes into the canonical geographic feature set.

use log::debug;

use crate::drawing::{DrawingState, DrawnShape, LatLng, ShapeKind};
use crate::types::{
    EpsgCode, Feature, FeatureSet, GeographicFeatures, Geometry, LonLat, Polygon, Position, Ring,
};

/// Reads every drawn shape and converts the area shapes into EPSG:4326 features.
///
/// Lines, markers and circles are skipped, as are polygons whose outer ring has
/// fewer than three distinct vertices. Every ring in the result is closed.
pub fn collect(state: &DrawingState) -> GeographicFeatures {
    let features = state.shapes().iter().filter_map(feature_from_shape).collect();
    GeographicFeatures::new_unchecked(FeatureSet::from_features(features))
}

/// Center of the bounding box enclosing every feature, or `None` when there are none.
///
/// This is the middle of the aggregate extent, not an area-weighted centroid.
pub fn centroid_of(features: &FeatureSet) -> Option<LonLat> {
    let mut positions = features.features.iter().flat_map(|f| f.geometry.positions());
    let first = positions.next()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in positions {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(LonLat {
        lon: (min_x + max_x) / 2.0,
        lat: (min_y + max_y) / 2.0,
    })
}

fn feature_from_shape(shape: &DrawnShape) -> Option<Feature> {
    if !shape.kind.is_area() {
        debug!("Skipping non-area shape {}: {:?}", shape.id, shape.kind);
        return None;
    }
    let geometry = match &shape.kind {
        ShapeKind::Rectangle { corner_a, corner_b } => {
            Geometry::Polygon(rectangle_polygon(*corner_a, *corner_b))
        }
        ShapeKind::Polygon { vertices } => {
            let ring = Ring::new(vertices.iter().map(to_position).collect());
            Geometry::Polygon(Polygon::new(ring))
        }
        ShapeKind::Area(geometry) => geometry.clone(),
        ShapeKind::Polyline { .. } | ShapeKind::Marker { .. } | ShapeKind::Circle { .. } => {
            return None
        }
    };

    let Some(geometry) = normalize(geometry) else {
        debug!("Skipping degenerate shape {}", shape.id);
        return None;
    };

    let mut feature = Feature::new(geometry, shape.properties.clone());
    feature.set_code_property("epsg", EpsgCode::WGS84);
    Some(feature)
}

/// Ring order follows the drawing tool: south-west, north-west, north-east, south-east.
fn rectangle_polygon(a: LatLng, b: LatLng) -> Polygon {
    let (south, north) = (a.lat.min(b.lat), a.lat.max(b.lat));
    let (west, east) = (a.lng.min(b.lng), a.lng.max(b.lng));
    Polygon::new(Ring::new(vec![
        Position::new(west, south),
        Position::new(west, north),
        Position::new(east, north),
        Position::new(east, south),
    ]))
}

fn to_position(v: &LatLng) -> Position {
    Position::new(v.lng, v.lat)
}

/// Closes every ring and drops polygons that cannot bound an area.
fn normalize(geometry: Geometry) -> Option<Geometry> {
    match geometry {
        Geometry::Polygon(p) => normalize_polygon(p).map(Geometry::Polygon),
        Geometry::MultiPolygon(parts) => {
            let parts: Vec<Polygon> = parts.into_iter().filter_map(normalize_polygon).collect();
            if parts.is_empty() {
                None
            } else {
                Some(Geometry::MultiPolygon(parts))
            }
        }
    }
}

fn normalize_polygon(polygon: Polygon) -> Option<Polygon> {
    let outer = polygon.outer()?;
    if outer.distinct_vertex_count() < 3 {
        return None;
    }
    let rings = polygon
        .rings
        .iter()
        .filter(|r| r.distinct_vertex_count() >= 3)
        .map(|r| Ring::new(r.closed_positions()))
        .collect();
    Some(Polygon { rings })
}
