//! Moves freshly rendered geometry so its bounding box starts at the origin

use std::collections::BTreeMap;

use tracing::debug;

use crate::drawing::{Block, BoundingBox, Coord, Entity};
use crate::graph::round_to;

/// Translate `entities` so their bounding box's minimum corner lands on the
/// origin, then by `offset`. Landmarks get the same normalizing shift but not
/// the offset, and are rounded to `precision`. Returns the normalizing shift.
pub(crate) fn normalize(
    entities: &mut [Entity],
    landmarks: &mut BTreeMap<String, Coord>,
    blocks: &BTreeMap<String, Block>,
    offset: Coord,
    precision: u32,
) -> Coord {
    let bounds = entities
        .iter()
        .filter_map(|e| e.shape.bounds(blocks))
        .reduce(|a, b| a.union(&b));
    let shift = bounds.as_ref().map_or(Coord::ORIGIN, |bb: &BoundingBox| -bb.min());
    debug!(?bounds, %shift, %offset, "normalizing rendered geometry");

    let delta = shift + offset;
    for entity in entities.iter_mut() {
        entity.shape.translate(delta);
    }
    for position in landmarks.values_mut() {
        let moved = *position + shift;
        *position = Coord::new(round_to(moved.x, precision), round_to(moved.y, precision));
    }
    shift
}
