//! Shared application-wide constants.
//! Centralizes fixed values used by CRS resolution, encoding and export naming.

// CRS resolution
/// Longitude (degrees) separating UTM 32N (west of it) from UTM 33N (at or east of it).
pub const AUTO_UTM_SPLIT_LON: f64 = 12.0;

// Rounding
/// Decimal places kept for geographic coordinates (~0.11 m at the equator).
pub const GEOGRAPHIC_DECIMALS: u32 = 6;
/// Decimal places kept for projected coordinates (centimeters).
pub const PROJECTED_DECIMALS: u32 = 2;
/// Decimal places used when displaying the centroid.
pub const CENTROID_DISPLAY_DECIMALS: usize = 5;

// KML
/// Fixed title of the KML `Document` element.
pub const KML_DOCUMENT_NAME: &str = "aoi-studio export";
/// KML 2.2 namespace.
pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

// Downloads
/// File name of the KML download; its CRS never changes.
pub const KML_FILE_NAME: &str = "aoi.kml";
/// MIME type for GeoJSON downloads.
pub const GEOJSON_MIME: &str = "application/geo+json;charset=utf-8";
/// MIME type for WKT/EWKT downloads.
pub const TEXT_MIME: &str = "text/plain;charset=utf-8";
/// MIME type for KML downloads.
pub const KML_MIME: &str = "application/vnd.google-earth.kml+xml;charset=utf-8";

// Configuration defaults
/// Default application title.
pub const DEFAULT_TITLE: &str = "AOI Studio – Zeichnen & Export";
/// Default map center latitude (Darmstadt).
pub const DEFAULT_START_LAT: f64 = 49.8728;
/// Default map center longitude (Darmstadt).
pub const DEFAULT_START_LON: f64 = 8.6512;
/// Default map zoom level.
pub const DEFAULT_START_ZOOM: u8 = 12;
