//! Top-level error types

use std::fmt;

use thiserror::Error;

use crate::config::SettingsError;
use crate::drawing::io::DrawingIoError;
use crate::drawing::{Entity, ShapeKind};
use crate::graph::builder::GraphError;
use crate::graph::{MissingEdge, Point};
use crate::repair::RepairError;
use crate::variables::VariableError;

/// Identifies a source entity in diagnostics: `line #3 on layer 'walls'`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    /// Position in the drawing's entity list
    pub index: usize,
    pub kind: ShapeKind,
    pub layer: String,
}

impl EntityRef {
    pub fn new(index: usize, entity: &Entity) -> Self {
        Self {
            index,
            kind: entity.kind(),
            layer: entity.layer.clone(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{} on layer '{}'", self.kind, self.index, self.layer)
    }
}

/// Errors that abort a render
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("in the variables text: {0}")]
    Variables(#[from] VariableError),

    /// Some nodes are not reachable from the root through resolved lines
    #[error("drawing is not connected: {count} point(s) unreachable from {root}, first at {first}")]
    Disconnected { root: Point, first: Point, count: usize },

    /// A line was never materialized by traversal or the deferred pass
    #[error("line on layer '{layer}' between {from} and {to} was never drawn")]
    UnconsumedEdge { from: Point, to: Point, layer: String },

    /// The pending-edge bookkeeping went out of sync
    #[error("traversal invariant violated: {0}")]
    Traversal(#[from] MissingEdge),
}

impl RenderError {
    pub fn disconnected(root: Point, first: Point, count: usize) -> Self {
        Self::Disconnected { root, first, count }
    }

    pub fn unconsumed(from: Point, to: Point, layer: impl Into<String>) -> Self {
        Self::UnconsumedEdge {
            from,
            to,
            layer: layer.into(),
        }
    }
}

/// Any error surfaced by the command-line tool
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Repair(#[from] RepairError),

    #[error(transparent)]
    Drawing(#[from] DrawingIoError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn test_entity_ref_display() {
        let entity = Entity::arc((0.0, 0.0), 1.0, 0.0, 90.0).on_layer("walls");
        assert_snapshot!(EntityRef::new(3, &entity).to_string(), @"arc #3 on layer 'walls'");
    }

    #[test]
    fn test_disconnected_display() {
        let err = RenderError::disconnected(Point::new(0.0, 0.0, 3), Point::new(5.0, 5.0, 3), 2);
        assert_snapshot!(
            err.to_string(),
            @"drawing is not connected: 2 point(s) unreachable from (0, 0), first at (5, 5)"
        );
    }
}
