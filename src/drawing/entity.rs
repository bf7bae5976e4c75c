//! Drawing entities

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::bounds::{arc_bounds, BoundingBox, Coord};
use super::Block;

/// Layer every entity lands on unless told otherwise
pub const DEFAULT_LAYER: &str = "0";

/// Line-style that defers to the layer's style
pub const BY_LAYER: &str = "BYLAYER";

/// Nested block references deeper than this are ignored when measuring
pub(crate) const MAX_BLOCK_DEPTH: usize = 16;

fn default_layer() -> String {
    DEFAULT_LAYER.to_string()
}

fn default_linetype() -> String {
    BY_LAYER.to_string()
}

fn unit_scale() -> f64 {
    1.0
}

/// One geometric entity with its layer, line-style and free-form side-data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default = "default_layer")]
    pub layer: String,
    #[serde(default = "default_linetype")]
    pub linetype: String,
    /// Annotation strings attached to the entity (`c:2*w`, `line:10 5`, ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub xdata: Vec<String>,
    pub shape: Shape,
}

/// Geometry of an entity. Angles are in degrees, counter-clockwise from +x.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Line {
        start: Coord,
        end: Coord,
    },
    Circle {
        center: Coord,
        radius: f64,
    },
    Arc {
        center: Coord,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    Point {
        location: Coord,
    },
    /// Reference to a named block definition
    Insert {
        block: String,
        insert: Coord,
        #[serde(default = "unit_scale")]
        x_scale: f64,
        #[serde(default = "unit_scale")]
        y_scale: f64,
    },
    /// Multi-line text; paragraphs are separated by `\P` or newlines
    Text {
        insert: Coord,
        text: String,
        #[serde(default)]
        char_height: f64,
    },
}

/// Entity kinds, for diagnostics and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Line,
    Circle,
    Arc,
    Point,
    Insert,
    Text,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Line => "line",
            ShapeKind::Circle => "circle",
            ShapeKind::Arc => "arc",
            ShapeKind::Point => "point",
            ShapeKind::Insert => "block reference",
            ShapeKind::Text => "text",
        };
        f.write_str(name)
    }
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Line { .. } => ShapeKind::Line,
            Shape::Circle { .. } => ShapeKind::Circle,
            Shape::Arc { .. } => ShapeKind::Arc,
            Shape::Point { .. } => ShapeKind::Point,
            Shape::Insert { .. } => ShapeKind::Insert,
            Shape::Text { .. } => ShapeKind::Text,
        }
    }

    /// Move the shape by `delta`
    pub fn translate(&mut self, delta: Coord) {
        match self {
            Shape::Line { start, end } => {
                *start = *start + delta;
                *end = *end + delta;
            }
            Shape::Circle { center, .. } | Shape::Arc { center, .. } => {
                *center = *center + delta;
            }
            Shape::Point { location } => *location = *location + delta,
            Shape::Insert { insert, .. } | Shape::Text { insert, .. } => {
                *insert = *insert + delta;
            }
        }
    }

    /// Axis-aligned extents. Block references are measured through `blocks`;
    /// an unknown block contributes only its insertion point.
    pub fn bounds(&self, blocks: &BTreeMap<String, Block>) -> Option<BoundingBox> {
        self.bounds_at_depth(blocks, 0)
    }

    fn bounds_at_depth(
        &self,
        blocks: &BTreeMap<String, Block>,
        depth: usize,
    ) -> Option<BoundingBox> {
        match self {
            Shape::Line { start, end } => BoundingBox::from_points([*start, *end]),
            Shape::Circle { center, radius } => Some(BoundingBox::new(
                center.x - radius.abs(),
                center.y - radius.abs(),
                2.0 * radius.abs(),
                2.0 * radius.abs(),
            )),
            Shape::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => Some(arc_bounds(*center, radius.abs(), *start_angle, *end_angle)),
            Shape::Point { location } => Some(BoundingBox::at(*location)),
            Shape::Text { insert, .. } => Some(BoundingBox::at(*insert)),
            Shape::Insert {
                block,
                insert,
                x_scale,
                y_scale,
            } => {
                let inner = match blocks.get(block) {
                    Some(def) if depth < MAX_BLOCK_DEPTH => def
                        .entities
                        .iter()
                        .filter_map(|e| e.shape.bounds_at_depth(blocks, depth + 1))
                        .reduce(|a, b| a.union(&b))
                        .map(|bb| (bb, def.base)),
                    _ => None,
                };
                match inner {
                    // Axis-aligned scaling maps the box corners onto the scaled box
                    Some((bb, base)) => BoundingBox::from_points(bb.corners().map(|c| {
                        Coord::new(
                            insert.x + (c.x - base.x) * x_scale,
                            insert.y + (c.y - base.y) * y_scale,
                        )
                    })),
                    None => Some(BoundingBox::at(*insert)),
                }
            }
        }
    }
}

impl Entity {
    pub fn new(shape: Shape) -> Self {
        Self {
            layer: default_layer(),
            linetype: default_linetype(),
            xdata: Vec::new(),
            shape,
        }
    }

    pub fn line(start: impl Into<Coord>, end: impl Into<Coord>) -> Self {
        Self::new(Shape::Line {
            start: start.into(),
            end: end.into(),
        })
    }

    pub fn circle(center: impl Into<Coord>, radius: f64) -> Self {
        Self::new(Shape::Circle {
            center: center.into(),
            radius,
        })
    }

    pub fn arc(center: impl Into<Coord>, radius: f64, start_angle: f64, end_angle: f64) -> Self {
        Self::new(Shape::Arc {
            center: center.into(),
            radius,
            start_angle,
            end_angle,
        })
    }

    pub fn point(location: impl Into<Coord>) -> Self {
        Self::new(Shape::Point {
            location: location.into(),
        })
    }

    pub fn insert(block: impl Into<String>, insert: impl Into<Coord>, x_scale: f64, y_scale: f64) -> Self {
        Self::new(Shape::Insert {
            block: block.into(),
            insert: insert.into(),
            x_scale,
            y_scale,
        })
    }

    pub fn text(insert: impl Into<Coord>, text: impl Into<String>, char_height: f64) -> Self {
        Self::new(Shape::Text {
            insert: insert.into(),
            text: text.into(),
            char_height,
        })
    }

    /// Set the layer
    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    /// Set the line-style
    pub fn with_linetype(mut self, linetype: impl Into<String>) -> Self {
        self.linetype = linetype.into();
        self
    }

    /// Append one side-data string
    pub fn with_xdata(mut self, xdata: impl Into<String>) -> Self {
        self.xdata.push(xdata.into());
        self
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }
}
