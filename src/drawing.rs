//! Live drawing state fed by the map collaborator.
//!
//! Shapes are kept in drawing order. Edits replace a shape in place so its
//! position in the export never changes; deletes remove it outright.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Geometry, Properties};

/// Unique identifier for a drawn shape.
pub type ShapeId = Uuid;

/// A geographic vertex as delivered by the drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl LatLng {
    /// Creates a vertex from latitude and longitude.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Kinds of shapes the drawing surface can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Axis-aligned rectangle given by two opposite corners
    Rectangle {
        /// One corner
        corner_a: LatLng,
        /// The opposite corner
        corner_b: LatLng,
    },
    /// Polygon given by its outer vertices, open or closed
    Polygon {
        /// Vertices in drawing order
        vertices: Vec<LatLng>,
    },
    /// Area geometry that arrived fully formed (e.g. from a GeoJSON import)
    Area(Geometry),
    /// Line string; not an area, never exported
    Polyline {
        /// Vertices in drawing order
        vertices: Vec<LatLng>,
    },
    /// Single point; not an area, never exported
    Marker {
        /// Marker location
        position: LatLng,
    },
    /// Circle; the drawing tool reports it as a point, so it is never exported
    Circle {
        /// Circle center
        center: LatLng,
        /// Radius in meters
        radius_m: f64,
    },
}

impl ShapeKind {
    /// Whether this shape bounds an area that can be exported.
    pub fn is_area(&self) -> bool {
        matches!(
            self,
            ShapeKind::Rectangle { .. } | ShapeKind::Polygon { .. } | ShapeKind::Area(_)
        )
    }
}

/// A single shape on the drawing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawnShape {
    /// Stable identifier, kept across edits
    pub id: ShapeId,
    /// Geometry as drawn
    pub kind: ShapeKind,
    /// User properties (`name`, `title`, ...)
    #[serde(default)]
    pub properties: Properties,
}

impl DrawnShape {
    /// Creates a new shape with a fresh ID and no properties.
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            properties: Properties::new(),
        }
    }

    /// Sets the `name` property.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.properties
            .insert("name".to_string(), serde_json::Value::String(name.into()));
        self
    }
}

/// Every shape currently on the map, in drawing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawingState {
    shapes: Vec<DrawnShape>,
}

impl DrawingState {
    /// Creates an empty drawing state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drawing state holding the built-in example AOI (a rectangle over Darmstadt).
    pub fn example() -> Self {
        let mut state = Self::new();
        state.add(
            DrawnShape::new(ShapeKind::Polygon {
                vertices: vec![
                    LatLng::new(49.88, 8.64),
                    LatLng::new(49.88, 8.67),
                    LatLng::new(49.86, 8.67),
                    LatLng::new(49.86, 8.64),
                    LatLng::new(49.88, 8.64),
                ],
            })
            .named("example"),
        );
        state
    }

    /// Serialize the drawing state to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a drawing state from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Appends a shape and returns its ID.
    pub fn add(&mut self, shape: DrawnShape) -> ShapeId {
        let id = shape.id;
        self.shapes.push(shape);
        id
    }

    /// Replaces the geometry of an existing shape, keeping its position and properties.
    ///
    /// Returns `false` if no shape has the given ID.
    pub fn replace(&mut self, id: &ShapeId, kind: ShapeKind) -> bool {
        match self.shapes.iter_mut().find(|s| s.id == *id) {
            Some(shape) => {
                shape.kind = kind;
                true
            }
            None => false,
        }
    }

    /// Removes a shape. Returns `false` if it did not exist.
    pub fn remove(&mut self, id: &ShapeId) -> bool {
        let before = self.shapes.len();
        self.shapes.retain(|s| s.id != *id);
        self.shapes.len() != before
    }

    /// Removes every shape.
    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    /// Shapes in drawing order.
    pub fn shapes(&self) -> &[DrawnShape] {
        &self.shapes
    }

    /// Number of shapes, including ones that will not be exported.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Whether the surface is empty.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
