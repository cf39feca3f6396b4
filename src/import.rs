//! Reads drawn shapes from GeoJSON documents.
//!
//! Accepts a FeatureCollection, a single Feature or a bare Geometry. Polygons
//! keep their holes; points and lines become non-area shapes that the collector
//! will later skip. Only geographic input is accepted: a feature whose `epsg`
//! property names another CRS, or any position outside ±180/±90, is rejected.

use geojson::{GeoJson, Value};
use log::debug;

use crate::drawing::{DrawingState, DrawnShape, LatLng, ShapeKind};
use crate::types::{EpsgCode, Geometry, Polygon, Position, Properties, Ring};

/// Errors raised while reading a GeoJSON document.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The text is not valid GeoJSON
    #[error("invalid GeoJSON: {0}")]
    Parse(#[from] geojson::Error),
    /// A position has fewer than two ordinates
    #[error("position with {0} ordinate(s), expected at least 2")]
    InvalidPosition(usize),
    /// The feature declares a CRS other than EPSG:4326
    #[error("feature is tagged epsg {epsg}, only EPSG:4326 can be imported")]
    NotGeographic {
        /// Declared `epsg` property, as written
        epsg: String,
    },
    /// A position is not a longitude/latitude pair
    #[error("position ({x}, {y}) is outside longitude ±180 / latitude ±90")]
    OutOfRange {
        /// First ordinate
        x: f64,
        /// Second ordinate
        y: f64,
    },
}

/// Parses a GeoJSON document into a drawing state, keeping document order.
pub fn load_drawing(text: &str) -> Result<DrawingState, ImportError> {
    let mut state = DrawingState::new();
    for shape in shapes_from_geojson(text)? {
        state.add(shape);
    }
    Ok(state)
}

/// Parses a GeoJSON document into shapes, one per feature (or one for a bare geometry).
pub fn shapes_from_geojson(text: &str) -> Result<Vec<DrawnShape>, ImportError> {
    let geojson: GeoJson = text.parse()?;
    let mut shapes = Vec::new();
    match geojson {
        GeoJson::FeatureCollection(collection) => {
            for feature in collection.features {
                push_shape(&mut shapes, feature.geometry.map(|g| g.value), feature.properties)?;
            }
        }
        GeoJson::Feature(feature) => {
            push_shape(&mut shapes, feature.geometry.map(|g| g.value), feature.properties)?;
        }
        GeoJson::Geometry(geometry) => push_shape(&mut shapes, Some(geometry.value), None)?,
    }
    Ok(shapes)
}

fn push_shape(
    shapes: &mut Vec<DrawnShape>,
    value: Option<Value>,
    properties: Option<Properties>,
) -> Result<(), ImportError> {
    if let Some(properties) = &properties {
        check_declared_crs(properties)?;
    }
    let Some(value) = value else {
        debug!("Skipping feature without geometry");
        return Ok(());
    };
    let Some(kind) = shape_kind(value)? else {
        return Ok(());
    };
    let mut shape = DrawnShape::new(kind);
    shape.properties = properties.unwrap_or_default();
    shapes.push(shape);
    Ok(())
}

fn check_declared_crs(properties: &Properties) -> Result<(), ImportError> {
    let declared = match properties.get("epsg") {
        None | Some(serde_json::Value::Null) => return Ok(()),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    match declared.parse::<EpsgCode>() {
        Ok(code) if code.is_geographic() => Ok(()),
        _ => Err(ImportError::NotGeographic { epsg: declared }),
    }
}

fn shape_kind(value: Value) -> Result<Option<ShapeKind>, ImportError> {
    let kind = match value {
        Value::Polygon(rings) => ShapeKind::Area(Geometry::Polygon(polygon(&rings)?)),
        Value::MultiPolygon(parts) => ShapeKind::Area(Geometry::MultiPolygon(
            parts.iter().map(|rings| polygon(rings)).collect::<Result<_, _>>()?,
        )),
        Value::Point(p) => ShapeKind::Marker {
            position: lat_lng(&p)?,
        },
        Value::LineString(line) => ShapeKind::Polyline {
            vertices: line.iter().map(|p| lat_lng(p)).collect::<Result<_, _>>()?,
        },
        _ => {
            debug!("Skipping geometry that is neither an area, a line nor a point");
            return Ok(None);
        }
    };
    Ok(Some(kind))
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon, ImportError> {
    let rings = rings
        .iter()
        .map(|ring| {
            ring.iter()
                .map(|p| position(p))
                .collect::<Result<Vec<_>, _>>()
                .map(Ring::new)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon { rings })
}

fn position(ordinates: &[f64]) -> Result<Position, ImportError> {
    let p = match ordinates {
        [x, y] => Position::new(*x, *y),
        [x, y, z, ..] => Position::with_z(*x, *y, *z),
        short => return Err(ImportError::InvalidPosition(short.len())),
    };
    if !(-180.0..=180.0).contains(&p.x) || !(-90.0..=90.0).contains(&p.y) {
        return Err(ImportError::OutOfRange { x: p.x, y: p.y });
    }
    Ok(p)
}

fn lat_lng(ordinates: &[f64]) -> Result<LatLng, ImportError> {
    let p = position(ordinates)?;
    Ok(LatLng::new(p.y, p.x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::collect;
    use crate::crs::Proj4Projector;
    use crate::pipeline::run_export;
    use crate::types::{CrsMode, ExportFormat, ExportSpec};

    const EXAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"epsg": 4326, "name": "example"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[8.64,49.88],[8.67,49.88],[8.67,49.86],[8.64,49.86],[8.64,49.88]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"radius": 120.0},
                "geometry": {"type": "Point", "coordinates": [8.65, 49.87]}
            },
            {
                "type": "Feature",
                "properties": null,
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[13.3,52.5,34.0],[13.4,52.5,35.0],[13.4,52.4,36.0]]]]
                }
            }
        ]
    }"#;

    #[test]
    fn test_feature_collection_import() {
        let shapes = shapes_from_geojson(EXAMPLE).unwrap();
        assert_eq!(shapes.len(), 3);
        assert_eq!(shapes[0].properties["name"], "example");
        assert!(matches!(shapes[1].kind, ShapeKind::Marker { .. }));
        assert!(shapes[2].properties.is_empty());

        let ShapeKind::Area(Geometry::MultiPolygon(parts)) = &shapes[2].kind else {
            panic!("expected multipolygon, got {:?}", shapes[2].kind);
        };
        assert_eq!(parts[0].rings[0].positions()[0], Position::with_z(13.3, 52.5, 34.0));
    }

    #[test]
    fn test_imported_points_are_not_exported() {
        let state = load_drawing(EXAMPLE).unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(collect(&state).len(), 2);
    }

    #[test]
    fn test_bare_geometry_import() {
        let shapes = shapes_from_geojson(
            r#"{"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}"#,
        )
        .unwrap();
        assert_eq!(shapes.len(), 1);
        assert!(shapes[0].kind.is_area());
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        assert!(matches!(shapes_from_geojson("not json"), Err(ImportError::Parse(_))));
        let short = r#"{"type": "Point", "coordinates": [1.0]}"#;
        assert!(shapes_from_geojson(short).is_err());
    }

    #[test]
    fn test_projected_export_is_not_reimported() {
        let projector = Proj4Projector::new().unwrap();
        let spec = ExportSpec::new(CrsMode::AutoUtm, ExportFormat::Wkt);
        let exported = run_export(&DrawingState::example(), spec, &projector);
        assert_eq!(exported.resolved.epsg, EpsgCode::UTM_32N);

        let err = load_drawing(&exported.geojson).unwrap_err();
        assert!(matches!(&err, ImportError::NotGeographic { epsg } if epsg == "25832"), "{err}");
    }

    #[test]
    fn test_geographic_export_reimports_unchanged() {
        let projector = Proj4Projector::new().unwrap();
        let spec = ExportSpec::new(CrsMode::AutoUtm, ExportFormat::Wkt);
        let first = run_export(&DrawingState::example(), spec, &projector);

        let wgs84 = run_export(&DrawingState::example(), ExportSpec::default(), &projector);
        let reloaded = load_drawing(&wgs84.geojson).unwrap();
        assert_eq!(run_export(&reloaded, spec, &projector).wkt, first.wkt);
    }

    #[test]
    fn test_untagged_meter_coordinates_are_rejected() {
        let text = r#"{"type": "Polygon", "coordinates": [[[474135.72,5525350.83],[476291.07,5525340.9],[476281.28,5523117.27],[474135.72,5525350.83]]]}"#;
        let err = shapes_from_geojson(text).unwrap_err();
        assert!(matches!(err, ImportError::OutOfRange { x, .. } if x == 474135.72));
        let string_tag = r#"{"type": "Feature", "properties": {"epsg": "EPSG:3857"},
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}"#;
        assert!(matches!(
            shapes_from_geojson(string_tag),
            Err(ImportError::NotGeographic { .. })
        ));
    }
}
