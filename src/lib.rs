//! # AOI Studio
//!
//! Turns drawn areas of interest into exportable geometry text in a chosen
//! coordinate reference system:
//! - **GeoJSON**: a FeatureCollection in the export CRS
//! - **WKT / EWKT**: one `POLYGON` or `MULTIPOLYGON` covering every AOI
//! - **KML**: one `Placemark` per AOI, always in EPSG:4326
//!
//! ## Pipeline
//! - Drawn rectangles and polygons are collected into an EPSG:4326 feature set
//! - The export CRS is resolved (WGS84, automatic UTM 32N/33N, or a fixed code)
//! - Coordinates are reprojected through a [`Projector`] and rounded
//! - Every format is re-encoded after each drawing or settings change
//!
//! ## Example
//!
//! ```no_run
//! use aoi_studio::{run_export, CrsMode, DrawingState, ExportFormat, ExportSpec, Proj4Projector};
//!
//! let projector = Proj4Projector::new().unwrap();
//! let spec = ExportSpec::new(CrsMode::AutoUtm, ExportFormat::Ewkt);
//! let snapshot = run_export(&DrawingState::example(), spec, &projector);
//! println!("{}", snapshot.wkt);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod collector;
pub mod config;
pub mod constants;
pub mod crs;
pub mod drawing;
pub mod encode;
pub mod import;
pub mod pipeline;
mod types;

// Re-export public types and functions
pub use collector::{centroid_of, collect};
pub use config::{ConfigError, StudioConfig};
pub use crs::{geographic_copy, reproject, resolve, Proj4Projector, ProjectionError, Projector};
pub use drawing::{DrawingState, DrawnShape, LatLng, ShapeId, ShapeKind};
pub use encode::{to_ewkt, to_geojson, to_kml, to_wkt};
pub use import::{load_drawing, ImportError};
pub use pipeline::{run_export, DrawEvent, Download, ExportMeta, ExportPipeline, ExportSnapshot, ExportStatus};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_exports_through_public_api() {
        let projector = Proj4Projector::new().unwrap();
        let spec = ExportSpec::new(CrsMode::AutoUtm, ExportFormat::Ewkt);
        let snapshot = run_export(&DrawingState::example(), spec, &projector);
        assert!(snapshot.wkt.starts_with("SRID=25832;POLYGON(("));
        assert!(snapshot.kml.contains("<name>example</name>"));
    }

    #[test]
    fn test_default_spec() {
        let spec = ExportSpec::default();
        assert_eq!(spec.crs, CrsMode::Wgs84);
        assert_eq!(spec.format, ExportFormat::Wkt);
    }
}
