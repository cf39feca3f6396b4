//! Text encoders for exported AOIs.
//!
//! - GeoJSON keeps one feature per AOI and the CRS the features are in.
//! - WKT/EWKT merge every polygon into one `POLYGON` or `MULTIPOLYGON`.
//! - KML only accepts geographic input and always writes `lon,lat,0`.

mod feature_collection;
mod kml;
mod well_known_text;

pub use feature_collection::to_geojson;
pub use kml::{escape_xml, to_kml};
pub use well_known_text::{to_ewkt, to_wkt};
