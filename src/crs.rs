//! CRS selection and reprojection.
//!
//! The export CRS is resolved from the selected [`CrsMode`] and the AOI
//! centroid; coordinates are then pushed through a [`Projector`] and rounded to
//! the precision that suits the target units (degrees or meters).

use std::collections::HashMap;
use std::convert::Infallible;

use log::debug;
use proj4rs::proj::Proj;

use crate::constants;
use crate::types::{CrsMode, EpsgCode, Feature, FeatureSet, LonLat, Position};

/// Why a coordinate could not be reprojected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    /// The projector has no definition for this code
    #[error("no projection definition for {0}")]
    UnsupportedCrs(EpsgCode),
    /// A built-in definition string was rejected by the engine
    #[error("invalid projection definition for {code}: {reason}")]
    InvalidDefinition {
        /// Code whose definition failed
        code: EpsgCode,
        /// Engine message
        reason: String,
    },
    /// The engine failed while transforming a point
    #[error("transform {from} -> {to} failed: {reason}")]
    Engine {
        /// Source CRS
        from: EpsgCode,
        /// Target CRS
        to: EpsgCode,
        /// Engine message
        reason: String,
    },
    /// The engine produced NaN or infinite coordinates
    #[error("transform {from} -> {to} produced a non-finite coordinate")]
    NonFinite {
        /// Source CRS
        from: EpsgCode,
        /// Target CRS
        to: EpsgCode,
    },
}

/// Point transform capability. Implementations must not keep partial state
/// between calls; a failure only affects the point being transformed.
pub trait Projector {
    /// Transforms a single planar point from one CRS to another.
    fn project(&self, from: EpsgCode, to: EpsgCode, point: Position)
        -> Result<Position, ProjectionError>;
}

/// PROJ.4 definitions for the codes the studio offers.
const DEFINITIONS: &[(EpsgCode, &str)] = &[
    (EpsgCode::WGS84, "+proj=longlat +ellps=WGS84 +no_defs"),
    (EpsgCode::UTM_32N, "+proj=utm +zone=32 +ellps=GRS80 +units=m +no_defs"),
    (EpsgCode::UTM_33N, "+proj=utm +zone=33 +ellps=GRS80 +units=m +no_defs"),
    (
        EpsgCode::WEB_MERCATOR,
        "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs",
    ),
];

/// [`Projector`] backed by the pure-Rust `proj4rs` engine.
pub struct Proj4Projector {
    projections: HashMap<EpsgCode, Proj>,
}

impl Proj4Projector {
    /// Parses every built-in definition up front.
    pub fn new() -> Result<Self, ProjectionError> {
        let mut projections = HashMap::with_capacity(DEFINITIONS.len());
        for (code, definition) in DEFINITIONS {
            let proj = Proj::from_proj_string(definition).map_err(|e| {
                ProjectionError::InvalidDefinition {
                    code: *code,
                    reason: e.to_string(),
                }
            })?;
            projections.insert(*code, proj);
        }
        Ok(Self { projections })
    }

    fn lookup(&self, code: EpsgCode) -> Result<&Proj, ProjectionError> {
        self.projections
            .get(&code)
            .ok_or(ProjectionError::UnsupportedCrs(code))
    }
}

impl Projector for Proj4Projector {
    fn project(
        &self,
        from: EpsgCode,
        to: EpsgCode,
        point: Position,
    ) -> Result<Position, ProjectionError> {
        let src = self.lookup(from)?;
        let dst = self.lookup(to)?;

        // proj4rs works in radians for geographic systems
        let (x, y) = if from.is_geographic() {
            (point.x.to_radians(), point.y.to_radians())
        } else {
            (point.x, point.y)
        };
        let mut xyz = (x, y, 0.0);
        proj4rs::transform::transform(src, dst, &mut xyz).map_err(|e| ProjectionError::Engine {
            from,
            to,
            reason: e.to_string(),
        })?;
        let (x, y) = if to.is_geographic() {
            (xyz.0.to_degrees(), xyz.1.to_degrees())
        } else {
            (xyz.0, xyz.1)
        };

        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::NonFinite { from, to });
        }
        Ok(Position { x, y, z: point.z })
    }
}

/// Picks the concrete export CRS.
///
/// `AutoUtm` chooses UTM 32N west of 12°E and UTM 33N from 12°E on; with no
/// centroid (nothing drawn) it falls back to UTM 32N.
pub fn resolve(mode: CrsMode, centroid: Option<LonLat>) -> EpsgCode {
    match mode {
        CrsMode::Wgs84 => EpsgCode::WGS84,
        CrsMode::Fixed(code) => code,
        CrsMode::AutoUtm => match centroid {
            None => EpsgCode::UTM_32N,
            Some(c) if c.lon < constants::AUTO_UTM_SPLIT_LON => EpsgCode::UTM_32N,
            Some(_) => EpsgCode::UTM_33N,
        },
    }
}

/// Rounds to a fixed number of decimal places. Never returns `-0.0`.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor + 0.0
}

/// Reprojects a geographic feature set into `target`.
///
/// EPSG:4326 is an identity copy rounded to 6 decimals. Any other target is
/// checked with a single origin transform first, then every position is
/// transformed and rounded to 2 decimals. Altitudes pass through untouched.
/// On failure nothing is returned but the error.
pub fn reproject(
    features: &FeatureSet,
    target: EpsgCode,
    projector: &dyn Projector,
) -> Result<FeatureSet, ProjectionError> {
    if target.is_geographic() {
        return Ok(geographic_copy(features));
    }
    let decimals = target.precision();

    projector.project(EpsgCode::WGS84, target, Position::new(0.0, 0.0))?;
    debug!("Projection sanity check {} -> {} passed", EpsgCode::WGS84, target);

    let out = features
        .features
        .iter()
        .map(|f| {
            let geometry = f.geometry.try_map_positions(|p| {
                let projected = projector.project(EpsgCode::WGS84, target, Position::new(p.x, p.y))?;
                Ok::<_, ProjectionError>(round_position(
                    Position {
                        z: p.z,
                        ..projected
                    },
                    decimals,
                ))
            })?;
            let mut feature = Feature::new(geometry, f.properties.clone());
            feature.set_code_property("epsg", target);
            feature.set_code_property("source_epsg", EpsgCode::WGS84);
            Ok(feature)
        })
        .collect::<Result<Vec<_>, ProjectionError>>()?;
    Ok(FeatureSet::from_features(out))
}

/// Deep copy of a geographic feature set, rounded to 6 decimals and tagged `epsg: 4326`.
///
/// This is the EPSG:4326 branch of [`reproject`]; it cannot fail.
pub fn geographic_copy(features: &FeatureSet) -> FeatureSet {
    let decimals = EpsgCode::WGS84.precision();
    let out = features
        .features
        .iter()
        .map(|f| {
            let geometry = f
                .geometry
                .try_map_positions(|p| Ok::<_, Infallible>(round_position(*p, decimals)));
            let geometry = match geometry {
                Ok(g) => g,
                Err(never) => match never {},
            };
            let mut feature = Feature::new(geometry, f.properties.clone());
            feature.set_code_property("epsg", EpsgCode::WGS84);
            feature
        })
        .collect();
    FeatureSet::from_features(out)
}

fn round_position(p: Position, decimals: u32) -> Position {
    Position {
        x: round_to(p.x, decimals),
        y: round_to(p.y, decimals),
        z: p.z,
    }
}
