//! Turning a freehand drawing into a parametric one
//!
//! [`parameterize`] keeps only lines, circles and arcs, snaps their
//! coordinates, annotates each with the default expression, links every
//! disconnected cluster to the rest with auxiliary connector lines, moves
//! the drawing to the origin and adds an empty variables text. The result
//! renders unchanged until its annotations are edited.

pub mod connect;
pub mod union_find;

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::annotation::{AnnotationError, Annotations, CONSTRAINT_KEY};
use crate::config::RepairConfig;
use crate::drawing::{Coord, Drawing, Entity, Layer, Shape};
use crate::graph::{round_to, Point};
use crate::variables::CUSTOM_MARKER;

pub use connect::Connector;
pub use union_find::DisjointSet;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepairError {
    #[error("default annotation '{annotation}' is invalid: {source}")]
    InvalidDefault {
        annotation: String,
        #[source]
        source: AnnotationError,
    },
}

/// What [`parameterize`] changed
#[derive(Debug, Clone, PartialEq)]
pub struct RepairReport {
    /// Lines, circles and arcs kept
    pub kept: usize,
    /// Entities of other kinds that were deleted
    pub removed: usize,
    /// Clusters found before connecting
    pub components: usize,
    pub connectors: Vec<Connector>,
    /// Translation applied to move the drawing to the origin
    pub shift: Coord,
}

fn round_coord(c: Coord, precision: u32) -> Coord {
    Coord::new(round_to(c.x, precision), round_to(c.y, precision))
}

/// Header of the variables text; user declarations go after the marker
fn variables_header() -> String {
    format!(
        "Available variables:\\P\\P----- built in -----\\P\\Pc: const\\P?: undefined\\P\\P{}\\P\\P",
        CUSTOM_MARKER
    )
}

/// Parameterize `drawing` in place
pub fn parameterize(drawing: &mut Drawing, config: &RepairConfig) -> Result<RepairReport, RepairError> {
    let annotation = format!("{}:{}", CONSTRAINT_KEY, config.default_annotation);
    Annotations::parse(&[annotation.as_str()]).map_err(|source| RepairError::InvalidDefault {
        annotation: annotation.clone(),
        source,
    })?;

    let precision = config.precision;
    let before = drawing.entities.len();
    let mut adjacency: BTreeMap<Point, Vec<Point>> = BTreeMap::new();

    drawing.entities.retain_mut(|entity| {
        match &mut entity.shape {
            Shape::Line { start, end } => {
                *start = round_coord(*start, precision);
                *end = round_coord(*end, precision);
                let (a, b) = (Point::from_coord(*start, precision), Point::from_coord(*end, precision));
                adjacency.entry(a).or_default().push(b);
                adjacency.entry(b).or_default().push(a);
            }
            Shape::Circle { center, .. } | Shape::Arc { center, .. } => {
                *center = round_coord(*center, precision);
                adjacency
                    .entry(Point::from_coord(*center, precision))
                    .or_default();
            }
            _ => return false,
        }
        entity.xdata = vec![annotation.clone()];
        true
    });
    let kept = drawing.entities.len();
    debug!(kept, removed = before - kept, "kept supported entities");

    let mut forest = DisjointSet::new();
    connect::union_adjacent(&mut forest, &adjacency);
    let components = forest.roots().len();
    let connectors = connect::connect_components(&mut forest, precision);

    drawing.ensure_layer(&config.aux_layer, Layer::with_color(config.aux_color));
    for connector in &connectors {
        for (start, end) in &connector.legs {
            drawing.add(
                Entity::line(*start, *end)
                    .on_layer(config.aux_layer.as_str())
                    .with_xdata(annotation.as_str()),
            );
        }
    }

    let shift = drawing.extents().map_or(Coord::ORIGIN, |bb| -bb.min());
    drawing.translate(shift);

    drawing.add(Entity::text(
        config.text_insert,
        variables_header(),
        config.text_height,
    ));

    info!(
        components,
        connectors = connectors.len(),
        removed = before - kept,
        "parameterized drawing"
    );
    Ok(RepairReport {
        kept,
        removed: before - kept,
        components,
        connectors,
        shift,
    })
}
