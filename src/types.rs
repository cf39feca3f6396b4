//! Core data types for the AOI export pipeline.
//!
//! This module defines the coordinate tree (positions, rings, polygons and
//! multi-part geometries), features and feature sets, and the export settings
//! that select a target CRS and text format.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants;

/// Property bag attached to every feature. Keys serialize in sorted order.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A single coordinate: longitude/latitude or easting/northing, with optional altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Longitude or easting
    pub x: f64,
    /// Latitude or northing
    pub y: f64,
    /// Optional altitude, carried through transforms untouched
    pub z: Option<f64>,
}

impl Position {
    /// Creates a 2D position.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// Creates a 3D position.
    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Same planar location, ignoring altitude.
    pub fn same_xy(&self, other: &Position) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.z.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.x)?;
        seq.serialize_element(&self.y)?;
        if let Some(z) = self.z {
            seq.serialize_element(&z)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PositionVisitor;

        impl<'de> Visitor<'de> for PositionVisitor {
            type Value = Position;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an array of two or three numbers")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Position, A::Error> {
                let x = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let y = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let z = seq.next_element()?;
                // Extra ordinates (e.g. measure values) are ignored
                while seq.next_element::<de::IgnoredAny>()?.is_some() {}
                Ok(Position { x, y, z })
            }
        }

        deserializer.deserialize_seq(PositionVisitor)
    }
}

/// Ordered sequence of positions bounding a polygon or hole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Ring(pub Vec<Position>);

impl Ring {
    /// Creates a ring from its positions, as given (no closure applied).
    pub fn new(positions: Vec<Position>) -> Self {
        Self(positions)
    }

    /// The positions of this ring.
    pub fn positions(&self) -> &[Position] {
        &self.0
    }

    /// Whether the first and last positions coincide.
    pub fn is_closed(&self) -> bool {
        match (self.0.first(), self.0.last()) {
            (Some(first), Some(last)) => self.0.len() > 1 && first.same_xy(last),
            _ => false,
        }
    }

    /// Returns the positions with the first one re-appended when the ring is open.
    ///
    /// Rings with fewer than three positions are returned unchanged; they cannot
    /// bound an area and closing them would only hide the degenerate input.
    pub fn closed_positions(&self) -> Vec<Position> {
        let mut positions = self.0.clone();
        if positions.len() < 3 || self.is_closed() {
            return positions;
        }
        let first = positions[0];
        positions.push(Position { z: None, ..first });
        positions
    }

    /// Number of distinct planar vertices, ignoring a closing duplicate.
    pub fn distinct_vertex_count(&self) -> usize {
        let mut seen: Vec<&Position> = Vec::with_capacity(self.0.len());
        for p in &self.0 {
            if !seen.iter().any(|q| q.same_xy(p)) {
                seen.push(p);
            }
        }
        seen.len()
    }

    fn try_map<E>(&self, f: &mut impl FnMut(&Position) -> Result<Position, E>) -> Result<Ring, E> {
        self.0.iter().map(|p| f(p)).collect::<Result<Vec<_>, E>>().map(Ring)
    }
}

/// An outer ring plus zero or more holes, all in one CRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Polygon {
    /// Outer ring first, holes after
    pub rings: Vec<Ring>,
}

impl Polygon {
    /// Creates a polygon from an outer ring without holes.
    pub fn new(outer: Ring) -> Self {
        Self { rings: vec![outer] }
    }

    /// Creates a polygon with holes.
    pub fn with_holes(outer: Ring, holes: Vec<Ring>) -> Self {
        let mut rings = Vec::with_capacity(holes.len() + 1);
        rings.push(outer);
        rings.extend(holes);
        Self { rings }
    }

    /// The outer ring, if any.
    pub fn outer(&self) -> Option<&Ring> {
        self.rings.first()
    }

    /// The hole rings.
    pub fn holes(&self) -> &[Ring] {
        self.rings.get(1..).unwrap_or(&[])
    }

    fn try_map<E>(&self, f: &mut impl FnMut(&Position) -> Result<Position, E>) -> Result<Polygon, E> {
        let rings = self
            .rings
            .iter()
            .map(|r| r.try_map(f))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Polygon { rings })
    }
}

/// Tagged coordinate tree for area geometries.
///
/// Serializes as a GeoJSON geometry object: `{"type": ..., "coordinates": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// Single polygon with optional holes
    Polygon(Polygon),
    /// Multi-part polygon
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    /// Every polygon in this geometry, in order. Multi-part geometries are decomposed.
    pub fn polygons(&self) -> &[Polygon] {
        match self {
            Geometry::Polygon(p) => std::slice::from_ref(p),
            Geometry::MultiPolygon(parts) => parts,
        }
    }

    /// Iterates over every position of every ring of every polygon.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.polygons()
            .iter()
            .flat_map(|p| p.rings.iter())
            .flat_map(|r| r.0.iter())
    }

    /// Rebuilds the tree with `f` applied to every position.
    ///
    /// Stops at the first error; no partially transformed geometry is returned.
    pub fn try_map_positions<E>(
        &self,
        mut f: impl FnMut(&Position) -> Result<Position, E>,
    ) -> Result<Geometry, E> {
        match self {
            Geometry::Polygon(p) => Ok(Geometry::Polygon(p.try_map(&mut f)?)),
            Geometry::MultiPolygon(parts) => parts
                .iter()
                .map(|p| p.try_map(&mut f))
                .collect::<Result<Vec<_>, E>>()
                .map(Geometry::MultiPolygon),
        }
    }
}

/// One AOI: geometry plus properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Always "Feature"
    #[serde(rename = "type")]
    pub kind: FeatureTag,
    /// Property bag (`epsg`, optional `name`/`title`, ...)
    pub properties: Properties,
    /// Area geometry
    pub geometry: Geometry,
}

impl Feature {
    /// Creates a feature from a geometry and property bag.
    pub fn new(geometry: Geometry, properties: Properties) -> Self {
        Self {
            kind: FeatureTag::Feature,
            properties,
            geometry,
        }
    }

    /// Sets a numeric property, replacing any previous value.
    pub fn set_code_property(&mut self, key: &str, code: EpsgCode) {
        self.properties
            .insert(key.to_string(), serde_json::Value::from(code.0));
    }
}

/// GeoJSON type tag for a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureTag {
    /// The only variant
    Feature,
}

/// GeoJSON type tag for a feature collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionTag {
    /// The only variant
    FeatureCollection,
}

/// Ordered set of AOIs. Order is drawing order and is kept through every export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Always "FeatureCollection"
    #[serde(rename = "type")]
    pub kind: CollectionTag,
    /// Features in insertion order
    pub features: Vec<Feature>,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            kind: CollectionTag::FeatureCollection,
            features: Vec::new(),
        }
    }
}

impl FeatureSet {
    /// Creates an empty feature set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a feature set from features, keeping their order.
    pub fn from_features(features: Vec<Feature>) -> Self {
        Self {
            kind: CollectionTag::FeatureCollection,
            features,
        }
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether there are no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Every polygon across every feature, multi-part features decomposed.
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> {
        self.features.iter().flat_map(|f| f.geometry.polygons().iter())
    }
}

/// A feature set known to be in EPSG:4326.
///
/// Produced by the collector, or checked on conversion from a plain
/// [`FeatureSet`]. KML encoding only accepts this type, so a reprojected set
/// can never reach it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeographicFeatures(FeatureSet);

impl GeographicFeatures {
    pub(crate) fn new_unchecked(features: FeatureSet) -> Self {
        Self(features)
    }

    /// The underlying feature set.
    pub fn into_inner(self) -> FeatureSet {
        self.0
    }
}

impl std::ops::Deref for GeographicFeatures {
    type Target = FeatureSet;

    fn deref(&self) -> &FeatureSet {
        &self.0
    }
}

impl TryFrom<FeatureSet> for GeographicFeatures {
    type Error = FeatureSet;

    /// Accepts the set when no feature is tagged with an `epsg` other than 4326.
    fn try_from(features: FeatureSet) -> Result<Self, FeatureSet> {
        let geographic = features.features.iter().all(|f| {
            f.properties
                .get("epsg")
                .map_or(true, |v| v.as_u64() == Some(u64::from(EpsgCode::WGS84.0)))
        });
        if geographic {
            Ok(Self(features))
        } else {
            Err(features)
        }
    }
}

/// Numeric EPSG code identifying a CRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpsgCode(pub u32);

impl EpsgCode {
    /// WGS84 geographic coordinates.
    pub const WGS84: EpsgCode = EpsgCode(4326);
    /// ETRS89 / UTM zone 32N.
    pub const UTM_32N: EpsgCode = EpsgCode(25832);
    /// ETRS89 / UTM zone 33N.
    pub const UTM_33N: EpsgCode = EpsgCode(25833);
    /// Spherical Web Mercator.
    pub const WEB_MERCATOR: EpsgCode = EpsgCode(3857);

    /// The numeric code.
    pub fn code(self) -> u32 {
        self.0
    }

    /// Whether this is the geographic WGS84 CRS.
    pub fn is_geographic(self) -> bool {
        self == Self::WGS84
    }

    /// Decimal places kept for coordinates in this CRS.
    pub fn precision(self) -> u32 {
        if self.is_geographic() {
            constants::GEOGRAPHIC_DECIMALS
        } else {
            constants::PROJECTED_DECIMALS
        }
    }
}

impl fmt::Display for EpsgCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for EpsgCode {
    type Err = SettingsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .get(..5)
            .filter(|prefix| prefix.eq_ignore_ascii_case("EPSG:"))
            .map(|_| &trimmed[5..])
            .unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .map(EpsgCode)
            .map_err(|_| SettingsParseError::Crs(s.to_string()))
    }
}

/// Error returned when parsing a CRS mode or export format string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsParseError {
    /// Not `WGS84`, `AUTO_UTM` or an `EPSG:<n>` code
    #[error("unknown CRS selection {0:?}")]
    Crs(String),
    /// Not one of `WKT`, `EWKT`, `KML`
    #[error("unknown export format {0:?}")]
    Format(String),
}

/// How the export CRS is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrsMode {
    /// Geographic WGS84 (EPSG:4326)
    #[default]
    Wgs84,
    /// UTM 32N or 33N picked from the AOI centroid
    AutoUtm,
    /// A fixed projected code
    Fixed(EpsgCode),
}

impl fmt::Display for CrsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsMode::Wgs84 => write!(f, "{}", EpsgCode::WGS84),
            CrsMode::AutoUtm => f.write_str("AUTO_UTM"),
            CrsMode::Fixed(code) => write!(f, "{code}"),
        }
    }
}

impl FromStr for CrsMode {
    type Err = SettingsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("AUTO_UTM") {
            return Ok(CrsMode::AutoUtm);
        }
        if trimmed.eq_ignore_ascii_case("WGS84") {
            return Ok(CrsMode::Wgs84);
        }
        let code: EpsgCode = s.parse()?;
        if code.is_geographic() {
            Ok(CrsMode::Wgs84)
        } else {
            Ok(CrsMode::Fixed(code))
        }
    }
}

/// Additional text format shown next to GeoJSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Well-known text
    #[default]
    Wkt,
    /// WKT with an SRID prefix
    Ewkt,
    /// KML, always WGS84
    Kml,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Wkt => "WKT",
            ExportFormat::Ewkt => "EWKT",
            ExportFormat::Kml => "KML",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = SettingsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WKT" => Ok(ExportFormat::Wkt),
            "EWKT" => Ok(ExportFormat::Ewkt),
            "KML" => Ok(ExportFormat::Kml),
            _ => Err(SettingsParseError::Format(s.to_string())),
        }
    }
}

/// CRS mode and text format for one export cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportSpec {
    /// How the target CRS is chosen
    pub crs: CrsMode,
    /// Which additional text format is selected
    pub format: ExportFormat,
}

impl ExportSpec {
    /// Creates an export spec.
    pub fn new(crs: CrsMode, format: ExportFormat) -> Self {
        Self { crs, format }
    }
}

/// Geographic point used for CRS selection and display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    /// Longitude in degrees
    pub lon: f64,
    /// Latitude in degrees
    pub lat: f64,
}

/// Result of resolving and reprojecting one export cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedExport {
    /// CRS actually used, after AUTO_UTM resolution and any fallback
    pub epsg: EpsgCode,
    /// The feature set in `epsg` coordinates
    pub features: FeatureSet,
    /// Center of the aggregate bounding box, if any features exist
    pub centroid: Option<LonLat>,
}
