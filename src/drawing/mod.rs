//! In-memory 2D drawing store
//!
//! A [`Drawing`] holds named layers, line-styles, block definitions and a flat
//! list of entities. It is the input and output of both pipelines and can be
//! loaded from and saved to TOML (see [`io`]).

pub mod bounds;
pub mod entity;
pub mod io;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use bounds::{arc_bounds, BoundingBox, Coord};
pub use entity::{Entity, Shape, ShapeKind, BY_LAYER, DEFAULT_LAYER};

/// Errors raised by drawing store operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DrawingError {
    #[error("block '{name}' is not defined in the source drawing")]
    UnknownBlock { name: String },

    #[error("line-style '{name}' is already defined")]
    DuplicateLinetype { name: String },
}

impl DrawingError {
    pub fn unknown_block(name: impl Into<String>) -> Self {
        Self::UnknownBlock { name: name.into() }
    }
}

fn default_plot() -> bool {
    true
}

fn default_color() -> u8 {
    7
}

/// A named layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Color index
    #[serde(default = "default_color")]
    pub color: u8,
    /// Whether entities on this layer appear in printed output
    #[serde(default = "default_plot")]
    pub plot: bool,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            color: default_color(),
            plot: true,
        }
    }
}

impl Layer {
    pub fn with_color(color: u8) -> Self {
        Self { color, plot: true }
    }

    pub fn hidden() -> Self {
        Self {
            color: default_color(),
            plot: false,
        }
    }
}

/// A dash line-style. Positive pattern entries are dashes, negative are gaps;
/// the first entry is the total pattern length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linetype {
    pub pattern: Vec<f64>,
    #[serde(default)]
    pub description: String,
}

impl Linetype {
    /// Simple dash-gap style
    pub fn dashed(dash: f64, space: f64) -> Self {
        Self {
            pattern: vec![dash + space, dash, -space],
            description: "- - - - - -".to_string(),
        }
    }

    /// Dash and gap lengths, skipping the leading total
    pub fn segments(&self) -> &[f64] {
        self.pattern.get(1..).unwrap_or(&[])
    }
}

/// A named reusable group of entities, placed via `Shape::Insert`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub base: Coord,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// A complete drawing
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Drawing {
    #[serde(default)]
    pub layers: BTreeMap<String, Layer>,
    #[serde(default)]
    pub linetypes: BTreeMap<String, Linetype>,
    #[serde(default)]
    pub blocks: BTreeMap<String, Block>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl Drawing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity and return its index
    pub fn add(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    /// Create a layer unless one with that name exists. Returns true when created.
    pub fn ensure_layer(&mut self, name: &str, layer: Layer) -> bool {
        if self.layers.contains_key(name) {
            return false;
        }
        self.layers.insert(name.to_string(), layer);
        true
    }

    pub fn add_linetype(&mut self, name: &str, linetype: Linetype) -> Result<(), DrawingError> {
        if self.linetypes.contains_key(name) {
            return Err(DrawingError::DuplicateLinetype {
                name: name.to_string(),
            });
        }
        self.linetypes.insert(name.to_string(), linetype);
        Ok(())
    }

    pub fn add_block(&mut self, name: impl Into<String>, block: Block) {
        self.blocks.insert(name.into(), block);
    }

    /// Whether a layer is plotted. Unknown layers plot.
    pub fn is_plotted(&self, layer: &str) -> bool {
        self.layers.get(layer).map_or(true, |l| l.plot)
    }

    /// Bounds over an explicit subset of entities, measured against this
    /// drawing's block definitions
    pub fn bounds_of<'a>(&self, entities: impl IntoIterator<Item = &'a Entity>) -> Option<BoundingBox> {
        entities
            .into_iter()
            .filter_map(|e| e.shape.bounds(&self.blocks))
            .reduce(|a, b| a.union(&b))
    }

    /// Bounds over every entity
    pub fn extents(&self) -> Option<BoundingBox> {
        self.bounds_of(&self.entities)
    }

    /// Width and height of the drawing, zero when empty
    pub fn dimensions(&self) -> (f64, f64) {
        self.extents()
            .map_or((0.0, 0.0), |bb| (bb.width, bb.height))
    }

    /// Move every entity by `delta`
    pub fn translate(&mut self, delta: Coord) {
        for entity in &mut self.entities {
            entity.shape.translate(delta);
        }
    }

    /// Copy block `name` from `source` into this drawing, once. Interior
    /// entities on `from_layer` are moved onto `to_layer`. Returns true when
    /// the block was imported by this call.
    pub fn import_block(
        &mut self,
        source: &Drawing,
        name: &str,
        from_layer: &str,
        to_layer: &str,
    ) -> Result<bool, DrawingError> {
        if self.blocks.contains_key(name) {
            return Ok(false);
        }
        let block = source
            .blocks
            .get(name)
            .ok_or_else(|| DrawingError::unknown_block(name))?;

        let mut imported = block.clone();
        for entity in &mut imported.entities {
            if entity.layer == from_layer {
                entity.layer = to_layer.to_string();
            }
            if entity.layer != DEFAULT_LAYER && !self.layers.contains_key(&entity.layer) {
                let layer = source.layers.get(&entity.layer).cloned().unwrap_or_default();
                self.layers.insert(entity.layer.clone(), layer);
            }
        }
        self.blocks.insert(name.to_string(), imported);
        Ok(true)
    }
}
