//! Materializes deferred (`c:?`) lines once every node has a position

use std::collections::BTreeMap;

use tracing::debug;

use crate::drawing::{Coord, Entity};
use crate::error::RenderError;
use crate::graph::{EdgeKind, Graph, Length, PendingEdges, Point};

/// Emit every still-pending deferred line between its endpoints' final
/// positions, then fail if any line is left pending at all
pub(crate) fn resolve_deferred(
    graph: &Graph,
    pending: &mut PendingEdges,
    positions: &BTreeMap<Point, Coord>,
    aux_layer: &str,
    entities: &mut Vec<Entity>,
) -> Result<usize, RenderError> {
    let mut created = 0;
    for (node, edges) in graph.iter() {
        for edge in edges {
            let EdgeKind::Line {
                length: Length::Deferred,
                anchor,
            } = edge.kind
            else {
                continue;
            };
            if !pending.contains(node, &edge.layer, &edge.target) {
                continue;
            }
            let (Some(&here), Some(&there)) = (positions.get(node), positions.get(&edge.target)) else {
                return Err(RenderError::unconsumed(*node, edge.target, edge.layer.as_str()));
            };
            pending.consume(*node, edge.target, &edge.layer)?;

            if edge.layer != aux_layer {
                let (start, end) = if anchor { (here, there) } else { (there, here) };
                entities.push(
                    Entity::line(start, end)
                        .on_layer(edge.layer.as_str())
                        .with_linetype(edge.linetype.as_str()),
                );
            }
            created += 1;
        }
    }

    if let Some((from, layer, to)) = pending.remaining().next() {
        return Err(RenderError::unconsumed(*from, *to, layer));
    }
    debug!(created, "resolved deferred lines");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::drawing::Shape;

    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y, 3)
    }

    #[test]
    fn test_deferred_line_follows_endpoints() {
        let mut graph = Graph::new();
        let mut pending = PendingEdges::new();
        graph.add_line(p(1.0, 1.0), p(0.0, 0.0), Length::Deferred, "0", "BYLAYER");
        pending.insert(p(1.0, 1.0), p(0.0, 0.0), "0");

        let positions = BTreeMap::from([
            (p(0.0, 0.0), Coord::new(0.0, 0.0)),
            (p(1.0, 1.0), Coord::new(4.0, 4.0)),
        ]);
        let mut entities = Vec::new();
        let created = resolve_deferred(&graph, &mut pending, &positions, "VIRTUAL_LAYER", &mut entities).unwrap();

        assert_eq!(created, 1);
        assert!(pending.is_empty());
        assert_eq!(
            entities[0].shape,
            Shape::Line {
                start: Coord::new(4.0, 4.0),
                end: Coord::new(0.0, 0.0)
            }
        );
    }

    #[test]
    fn test_leftover_resolved_line_is_a_leak() {
        let mut graph = Graph::new();
        let mut pending = PendingEdges::new();
        graph.add_line(p(0.0, 0.0), p(1.0, 0.0), Length::Resolved(1.0), "walls", "BYLAYER");
        pending.insert(p(0.0, 0.0), p(1.0, 0.0), "walls");

        let err = resolve_deferred(&graph, &mut pending, &BTreeMap::new(), "VIRTUAL_LAYER", &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, RenderError::UnconsumedEdge { ref layer, .. } if layer == "walls"));
    }
}
