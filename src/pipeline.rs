//! Export pipeline: drawing state in, encoded text and display metadata out.
//!
//! Every event mutates the owned drawing state or export settings and then
//! recomputes the whole snapshot synchronously:
//! 1. Collect area shapes into an EPSG:4326 feature set
//! 2. Resolve the export CRS from the centroid and selected mode
//! 3. Reproject, falling back to EPSG:4326 if the projector fails
//! 4. Encode GeoJSON, WKT/EWKT and KML

use log::{info, warn};

use crate::collector::{centroid_of, collect};
use crate::constants;
use crate::crs::{geographic_copy, reproject, resolve, Projector};
use crate::drawing::{DrawingState, DrawnShape, ShapeId, ShapeKind};
use crate::encode::{to_ewkt, to_geojson, to_kml, to_wkt};
use crate::types::{CrsMode, EpsgCode, ExportFormat, ExportSpec, LonLat, ResolvedExport};

/// Discrete changes coming from the drawing surface or the export settings.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    /// A new shape was drawn
    ShapeCreated(DrawnShape),
    /// An existing shape was reshaped
    ShapeEdited {
        /// Shape being edited
        id: ShapeId,
        /// New geometry
        kind: ShapeKind,
    },
    /// One or more shapes were deleted
    ShapesDeleted(Vec<ShapeId>),
    /// Every shape was removed
    Cleared,
    /// A different export CRS was selected
    CrsModeChanged(CrsMode),
    /// A different text format was selected
    FormatChanged(ExportFormat),
}

/// Outcome of the last recomputation.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportStatus {
    /// Nothing drawn; exports are unavailable
    Idle,
    /// Exports are available in the resolved CRS
    Ready,
    /// Reprojection failed; exports fell back to EPSG:4326
    ProjectionFailed {
        /// CRS that could not be produced
        requested: EpsgCode,
        /// Projector error message
        reason: String,
    },
}

impl ExportStatus {
    /// Whether the last reprojection failed.
    pub fn is_error(&self) -> bool {
        matches!(self, ExportStatus::ProjectionFailed { .. })
    }

    /// Status line for this outcome, using `meta` for the ready case.
    pub fn message(&self, meta: &ExportMeta) -> String {
        match self {
            ExportStatus::Idle => {
                "Draw a polygon or rectangle to enable export, copy and download.".to_string()
            }
            ExportStatus::ProjectionFailed { requested, reason } => format!(
                "CRS transformation to {requested} failed. Falling back to {}. ({reason})",
                EpsgCode::WGS84
            ),
            ExportStatus::Ready => {
                let target = match meta.requested {
                    CrsMode::AutoUtm => format!("Auto UTM → {}", meta.epsg),
                    _ => meta.epsg.to_string(),
                };
                let mut line = format!("AOI set: {} · export: {target}", feature_label(meta.feature_count));
                if let Some(c) = meta.centroid {
                    line.push_str(&format!(" · center: {}", format_center(c)));
                }
                line
            }
        }
    }
}

/// Display metadata for the current export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMeta {
    /// Number of exported AOIs
    pub feature_count: usize,
    /// Mode the user selected
    pub requested: CrsMode,
    /// CRS actually used for GeoJSON/WKT/EWKT
    pub epsg: EpsgCode,
    /// Center of the AOI extent, if anything is drawn
    pub centroid: Option<LonLat>,
}

impl ExportMeta {
    /// One-line summary, e.g. `1 feature · export EPSG:25832 · center 49.87000, 8.65500`.
    pub fn summary(&self) -> String {
        if self.feature_count == 0 {
            return "No AOI yet".to_string();
        }
        let center = self
            .centroid
            .map(format_center)
            .unwrap_or_else(|| "–".to_string());
        format!(
            "{} · export {} · center {}",
            feature_label(self.feature_count),
            self.epsg,
            center
        )
    }
}

fn feature_label(count: usize) -> String {
    format!("{count} feature{}", if count == 1 { "" } else { "s" })
}

fn format_center(c: LonLat) -> String {
    let d = constants::CENTROID_DISPLAY_DECIMALS;
    format!("{:.d$}, {:.d$}", c.lat, c.lon)
}

/// A file the collaborator can offer for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Suggested file name
    pub file_name: String,
    /// MIME type including charset
    pub mime: &'static str,
    /// File contents
    pub contents: String,
}

/// Everything derived from one drawing state and export spec.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSnapshot {
    /// Settings this snapshot was computed with
    pub spec: ExportSpec,
    /// Display metadata
    pub meta: ExportMeta,
    /// Outcome of reprojection
    pub status: ExportStatus,
    /// Resolved CRS and reprojected features
    pub resolved: ResolvedExport,
    /// GeoJSON FeatureCollection in the resolved CRS
    pub geojson: String,
    /// WKT, or EWKT when that format is selected
    pub wkt: String,
    /// KML in EPSG:4326
    pub kml: String,
}

impl ExportSnapshot {
    /// Text for the selected additional format (WKT, EWKT or KML).
    pub fn alternate_text(&self) -> &str {
        match self.spec.format {
            ExportFormat::Kml => &self.kml,
            ExportFormat::Wkt | ExportFormat::Ewkt => &self.wkt,
        }
    }

    /// Whether there is anything to export.
    pub fn is_available(&self) -> bool {
        self.meta.feature_count > 0
    }

    /// GeoJSON download named after the resolved CRS, e.g. `aoi_epsg25832.geojson`.
    pub fn geojson_download(&self) -> Option<Download> {
        if self.geojson.trim().is_empty() {
            return None;
        }
        Some(Download {
            file_name: format!("aoi_epsg{}.geojson", self.resolved.epsg.code()),
            mime: constants::GEOJSON_MIME,
            contents: self.geojson.clone(),
        })
    }

    /// Download for the selected additional format.
    pub fn alternate_download(&self) -> Option<Download> {
        let contents = self.alternate_text();
        if contents.trim().is_empty() {
            return None;
        }
        let code = self.resolved.epsg.code();
        let (file_name, mime) = match self.spec.format {
            ExportFormat::Kml => (constants::KML_FILE_NAME.to_string(), constants::KML_MIME),
            ExportFormat::Ewkt => (format!("aoi_epsg{code}.ewkt.txt"), constants::TEXT_MIME),
            ExportFormat::Wkt => (format!("aoi_epsg{code}.wkt.txt"), constants::TEXT_MIME),
        };
        Some(Download {
            file_name,
            mime,
            contents: contents.to_string(),
        })
    }
}

/// Runs collect, resolve, reproject and encode once.
pub fn run_export(drawing: &DrawingState, spec: ExportSpec, projector: &dyn Projector) -> ExportSnapshot {
    let geographic = collect(drawing);
    let centroid = centroid_of(&geographic);

    if geographic.is_empty() {
        return ExportSnapshot {
            spec,
            meta: ExportMeta {
                feature_count: 0,
                requested: spec.crs,
                epsg: EpsgCode::WGS84,
                centroid: None,
            },
            status: ExportStatus::Idle,
            resolved: ResolvedExport {
                epsg: EpsgCode::WGS84,
                features: geographic.into_inner(),
                centroid: None,
            },
            geojson: String::new(),
            wkt: String::new(),
            kml: String::new(),
        };
    }

    let requested = resolve(spec.crs, centroid);
    let (epsg, features, status) = match reproject(&geographic, requested, projector) {
        Ok(features) => (requested, features, ExportStatus::Ready),
        Err(e) => {
            warn!("Reprojection to {requested} failed, exporting {} instead: {e}", EpsgCode::WGS84);
            (
                EpsgCode::WGS84,
                geographic_copy(&geographic),
                ExportStatus::ProjectionFailed {
                    requested,
                    reason: e.to_string(),
                },
            )
        }
    };

    let geojson = to_geojson(&features, epsg);
    let wkt = match spec.format {
        ExportFormat::Ewkt => to_ewkt(&features, epsg),
        ExportFormat::Wkt | ExportFormat::Kml => to_wkt(&features),
    };
    let kml = to_kml(&geographic);

    info!(
        "Exported {} feature(s) as {} (requested {}, format {})",
        geographic.len(),
        epsg,
        spec.crs,
        spec.format
    );

    ExportSnapshot {
        spec,
        meta: ExportMeta {
            feature_count: geographic.len(),
            requested: spec.crs,
            epsg,
            centroid,
        },
        status,
        resolved: ResolvedExport {
            epsg,
            features,
            centroid,
        },
        geojson,
        wkt,
        kml,
    }
}

/// Owns the drawing state and export settings, and keeps the snapshot current.
pub struct ExportPipeline {
    drawing: DrawingState,
    spec: ExportSpec,
    projector: Box<dyn Projector>,
    snapshot: ExportSnapshot,
}

impl ExportPipeline {
    /// Creates a pipeline with an empty drawing.
    pub fn new(spec: ExportSpec, projector: Box<dyn Projector>) -> Self {
        Self::with_drawing(DrawingState::new(), spec, projector)
    }

    /// Creates a pipeline over an existing drawing state.
    pub fn with_drawing(drawing: DrawingState, spec: ExportSpec, projector: Box<dyn Projector>) -> Self {
        let snapshot = run_export(&drawing, spec, projector.as_ref());
        Self {
            drawing,
            spec,
            projector,
            snapshot,
        }
    }

    /// Applies one event and recomputes every output before returning.
    pub fn apply(&mut self, event: DrawEvent) -> &ExportSnapshot {
        match event {
            DrawEvent::ShapeCreated(shape) => {
                self.drawing.add(shape);
            }
            DrawEvent::ShapeEdited { id, kind } => {
                if !self.drawing.replace(&id, kind) {
                    warn!("Ignoring edit of unknown shape {id}");
                }
            }
            DrawEvent::ShapesDeleted(ids) => {
                for id in ids {
                    if !self.drawing.remove(&id) {
                        warn!("Ignoring delete of unknown shape {id}");
                    }
                }
            }
            DrawEvent::Cleared => self.drawing.clear(),
            DrawEvent::CrsModeChanged(crs) => self.spec.crs = crs,
            DrawEvent::FormatChanged(format) => self.spec.format = format,
        }
        self.snapshot = run_export(&self.drawing, self.spec, self.projector.as_ref());
        &self.snapshot
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> &ExportSnapshot {
        &self.snapshot
    }

    /// Current drawing state.
    pub fn drawing(&self) -> &DrawingState {
        &self.drawing
    }

    /// Current export settings.
    pub fn spec(&self) -> ExportSpec {
        self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{Proj4Projector, ProjectionError};
    use crate::drawing::LatLng;
    use crate::types::Position;

    /// Multiplies coordinates by 1000; never fails.
    struct KiloProjector;

    impl Projector for KiloProjector {
        fn project(&self, _from: EpsgCode, _to: EpsgCode, p: Position) -> Result<Position, ProjectionError> {
            Ok(Position::new(p.x * 1000.0, p.y * 1000.0))
        }
    }

    fn proj4() -> Box<dyn Projector> {
        Box::new(Proj4Projector::new().unwrap())
    }

    fn rectangle(west: f64, south: f64, east: f64, north: f64) -> DrawnShape {
        DrawnShape::new(ShapeKind::Rectangle {
            corner_a: LatLng::new(south, west),
            corner_b: LatLng::new(north, east),
        })
    }

    fn wkt_coordinates(wkt: &str) -> Vec<(String, String)> {
        wkt.trim_start_matches("POLYGON((")
            .trim_end_matches("))")
            .split(", ")
            .map(|pair| {
                let (x, y) = pair.split_once(' ').unwrap();
                (x.to_string(), y.to_string())
            })
            .collect()
    }

    fn decimals(s: &str) -> usize {
        s.split_once('.').map(|(_, f)| f.len()).unwrap_or(0)
    }

    #[test]
    fn test_example_rectangle_auto_utm_wkt() {
        let spec = ExportSpec::new(CrsMode::AutoUtm, ExportFormat::Wkt);
        let pipeline = ExportPipeline::with_drawing(DrawingState::example(), spec, proj4());
        let snapshot = pipeline.snapshot();

        assert_eq!(snapshot.status, ExportStatus::Ready);
        assert_eq!(snapshot.resolved.epsg, EpsgCode::UTM_32N);
        let centroid = snapshot.meta.centroid.unwrap();
        assert!((centroid.lon - 8.655).abs() < 1e-9);

        assert_eq!(
            snapshot.wkt,
            "POLYGON((474135.72 5525350.83, 476291.07 5525340.9, 476281.28 5523117.27, \
             474125.04 5523127.19, 474135.72 5525350.83))"
        );
        for (x, y) in wkt_coordinates(&snapshot.wkt) {
            assert!(decimals(&x) <= 2 && decimals(&y) <= 2, "{x} {y}");
        }
    }

    #[test]
    fn test_empty_drawing_disables_exports() {
        let pipeline = ExportPipeline::new(ExportSpec::default(), proj4());
        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.status, ExportStatus::Idle);
        assert!(!snapshot.is_available());
        assert_eq!(snapshot.alternate_text(), "");
        assert_eq!(snapshot.resolved.epsg, EpsgCode::WGS84);
        assert_eq!(snapshot.meta.summary(), "No AOI yet");
        assert!(snapshot.geojson_download().is_none());
        assert!(snapshot.alternate_download().is_none());
    }

    #[test]
    fn test_projection_failure_falls_back_to_wgs84() {
        let spec = ExportSpec::new(CrsMode::Fixed(EpsgCode(31467)), ExportFormat::Ewkt);
        let pipeline = ExportPipeline::with_drawing(DrawingState::example(), spec, proj4());
        let snapshot = pipeline.snapshot();

        assert!(snapshot.status.is_error());
        assert!(matches!(
            &snapshot.status,
            ExportStatus::ProjectionFailed { requested, .. } if *requested == EpsgCode(31467)
        ));
        assert_eq!(snapshot.resolved.epsg, EpsgCode::WGS84);
        assert!(snapshot.wkt.starts_with("SRID=4326;POLYGON((8.64 49.88, "));
        assert!(snapshot.geojson.contains("\"epsg\": 4326"));
        assert!(!snapshot.geojson.contains("source_epsg"));
        assert_eq!(
            snapshot.geojson_download().unwrap().file_name,
            "aoi_epsg4326.geojson"
        );
        let message = snapshot.status.message(&snapshot.meta);
        assert!(message.contains("EPSG:31467"));
    }

    #[test]
    fn test_events_keep_drawing_order() {
        let spec = ExportSpec::new(CrsMode::Wgs84, ExportFormat::Wkt);
        let mut pipeline = ExportPipeline::new(spec, Box::new(KiloProjector));
        let a = rectangle(8.0, 49.0, 8.1, 49.1);
        let a_id = a.id;
        let b = rectangle(9.0, 50.0, 9.1, 50.1);
        let b_id = b.id;
        pipeline.apply(DrawEvent::ShapeCreated(a));
        pipeline.apply(DrawEvent::ShapeCreated(b));
        let snapshot = pipeline.apply(DrawEvent::ShapeEdited {
            id: a_id,
            kind: rectangle(7.0, 48.0, 7.1, 48.1).kind,
        });
        assert!(snapshot.wkt.starts_with("MULTIPOLYGON(((7 48, "));
        assert_eq!(snapshot.meta.feature_count, 2);

        let snapshot = pipeline.apply(DrawEvent::ShapesDeleted(vec![a_id]));
        assert!(snapshot.wkt.starts_with("POLYGON((9 50, "));
        assert_eq!(pipeline.drawing().shapes()[0].id, b_id);

        let snapshot = pipeline.apply(DrawEvent::Cleared);
        assert_eq!(snapshot.status, ExportStatus::Idle);
    }

    #[test]
    fn test_settings_events_recompute_outputs() {
        let mut pipeline = ExportPipeline::with_drawing(
            DrawingState::example(),
            ExportSpec::default(),
            Box::new(KiloProjector),
        );
        assert_eq!(pipeline.snapshot().resolved.epsg, EpsgCode::WGS84);
        let kml_before = pipeline.snapshot().kml.clone();

        let snapshot = pipeline.apply(DrawEvent::CrsModeChanged(CrsMode::Fixed(EpsgCode::WEB_MERCATOR)));
        assert_eq!(snapshot.resolved.epsg, EpsgCode::WEB_MERCATOR);
        assert!(snapshot.wkt.starts_with("POLYGON((8640 49880, "));
        assert_eq!(snapshot.kml, kml_before);
        assert!(snapshot.geojson.contains("\"source_epsg\": 4326"));

        let snapshot = pipeline.apply(DrawEvent::FormatChanged(ExportFormat::Kml));
        assert_eq!(snapshot.alternate_text(), kml_before);
        let download = snapshot.alternate_download().unwrap();
        assert_eq!(download.file_name, "aoi.kml");
        assert_eq!(download.mime, constants::KML_MIME);
        assert_eq!(pipeline.spec().format, ExportFormat::Kml);
    }

    #[test]
    fn test_download_names_embed_resolved_code() {
        let spec = ExportSpec::new(CrsMode::AutoUtm, ExportFormat::Ewkt);
        let mut state = DrawingState::new();
        state.add(rectangle(13.0, 52.0, 13.5, 52.5));
        let snapshot = run_export(&state, spec, &KiloProjector);

        assert_eq!(snapshot.resolved.epsg, EpsgCode::UTM_33N);
        assert!(snapshot.wkt.starts_with("SRID=25833;POLYGON(("));
        assert_eq!(snapshot.geojson_download().unwrap().file_name, "aoi_epsg25833.geojson");
        let alt = snapshot.alternate_download().unwrap();
        assert_eq!(alt.file_name, "aoi_epsg25833.ewkt.txt");
        assert_eq!(alt.mime, constants::TEXT_MIME);
    }

    #[test]
    fn test_meta_summary_and_status_lines() {
        let spec = ExportSpec::new(CrsMode::AutoUtm, ExportFormat::Wkt);
        let snapshot = run_export(&DrawingState::example(), spec, &KiloProjector);
        assert_eq!(
            snapshot.meta.summary(),
            "1 feature · export EPSG:25832 · center 49.87000, 8.65500"
        );
        assert_eq!(
            snapshot.status.message(&snapshot.meta),
            "AOI set: 1 feature · export: Auto UTM → EPSG:25832 · center: 49.87000, 8.65500"
        );
    }
}
