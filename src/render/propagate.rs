//! Depth-first offset propagation
//!
//! Starting at the root with a zero offset, every resolved line leaving a node
//! stretches along its original direction to its target length. The change
//! in the far endpoint's position is added to the offset carried into that
//! endpoint's subtree, so everything hanging off a line moves with it.
//!
//! A resolved line that closes a cycle is stretched the same way. Its far
//! endpoint is moved to the new position and re-entered so the lines still
//! pending there follow it. Circles, arcs, block references and landmarks
//! stay where the node's first visit placed them.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::drawing::{Coord, Entity};
use crate::error::RenderError;
use crate::graph::{Edge, EdgeKind, Graph, Length, PendingEdges, Point};

/// Result of a traversal: final node positions, materialized entities (not
/// yet normalized) and landmark positions
#[derive(Debug, Clone, Default)]
pub struct Propagation {
    pub positions: BTreeMap<Point, Coord>,
    pub entities: Vec<Entity>,
    pub landmarks: BTreeMap<String, Coord>,
}

struct Frame {
    node: Point,
    offset: Coord,
    next: usize,
    /// Set when the node already had a position; only lines are followed
    reentry: bool,
}

/// Mutable state of one traversal
pub(crate) struct Traversal<'a> {
    graph: &'a Graph,
    pending: &'a mut PendingEdges,
    aux_layer: &'a str,
    tolerance: f64,
    out: Propagation,
}

impl<'a> Traversal<'a> {
    pub fn new(graph: &'a Graph, pending: &'a mut PendingEdges, aux_layer: &'a str, precision: u32) -> Self {
        Self {
            graph,
            pending,
            aux_layer,
            tolerance: 10f64.powi(-(precision as i32)),
            out: Propagation::default(),
        }
    }

    /// Run from the graph's minimum point. Fails if any node is left without
    /// a position.
    pub fn run(mut self) -> Result<Propagation, RenderError> {
        let Some(root) = self.graph.root() else {
            return Ok(self.out);
        };
        debug!(%root, nodes = self.graph.node_count(), "propagating from root");

        self.out.positions.insert(root, root.coord());
        let mut stack = vec![Frame {
            node: root,
            offset: Coord::ORIGIN,
            next: 0,
            reentry: false,
        }];

        while let Some(frame) = stack.last_mut() {
            let edges = self.graph.edges(&frame.node);
            let Some(edge) = edges.get(frame.next) else {
                stack.pop();
                continue;
            };
            frame.next += 1;
            let (node, offset) = (frame.node, frame.offset);
            if frame.reentry && !matches!(edge.kind, EdgeKind::Line { .. }) {
                continue;
            }

            if let Some(child) = self.visit(node, offset, edge)? {
                stack.push(child);
            }
        }

        let unreached: Vec<&Point> = self
            .graph
            .nodes()
            .filter(|p| !self.out.positions.contains_key(*p))
            .collect();
        if let Some(first) = unreached.first() {
            return Err(RenderError::disconnected(root, **first, unreached.len()));
        }

        debug!(
            entities = self.out.entities.len(),
            landmarks = self.out.landmarks.len(),
            "propagation finished"
        );
        Ok(self.out)
    }

    /// Handle one edge at `node`; returns the frame to descend into, if any
    fn visit(&mut self, node: Point, offset: Coord, edge: &Edge) -> Result<Option<Frame>, RenderError> {
        let here = node.coord() + offset;
        let styled = |e: Entity| e.on_layer(edge.layer.as_str()).with_linetype(edge.linetype.as_str());

        match &edge.kind {
            EdgeKind::Circle { radius } => {
                self.out.entities.push(styled(Entity::circle(here, *radius)));
            }
            EdgeKind::Arc {
                radius,
                start_angle,
                end_angle,
            } => {
                self.out
                    .entities
                    .push(styled(Entity::arc(here, *radius, *start_angle, *end_angle)));
            }
            EdgeKind::Block {
                name,
                x_scale,
                y_scale,
            } => {
                self.out
                    .entities
                    .push(styled(Entity::insert(name.as_str(), here, *x_scale, *y_scale)));
            }
            EdgeKind::Landmark { label } => {
                self.out.landmarks.insert(label.clone(), here);
            }
            EdgeKind::Line {
                length: Length::Deferred,
                ..
            } => {}
            EdgeKind::Line {
                length: Length::Resolved(length),
                anchor,
            } => {
                let target = edge.target;
                if !self.pending.contains(&node, &edge.layer, &target) {
                    return Ok(None);
                }
                self.pending.consume(node, target, &edge.layer)?;

                let delta = target.coord() - node.coord();
                let factor = length / node.distance(&target);
                let increment = delta * factor - delta;
                let child_offset = offset + increment;
                let there = target.coord() + child_offset;
                trace!(from = %node, to = %target, factor, "stretched line");

                let previous = self.out.positions.insert(target, there);
                if let Some(previous) = previous {
                    if previous.distance(there) > self.tolerance {
                        warn!(
                            from = %node,
                            to = %target,
                            moved = previous.distance(there),
                            "cycle-closing line moves an already placed point"
                        );
                    }
                }
                self.emit_line(edge, *anchor, here, there);
                return Ok(Some(Frame {
                    node: target,
                    offset: child_offset,
                    next: 0,
                    reentry: previous.is_some(),
                }));
            }
        }
        Ok(None)
    }

    fn emit_line(&mut self, edge: &Edge, anchor: bool, here: Coord, there: Coord) {
        if edge.layer == self.aux_layer {
            return;
        }
        let (start, end) = if anchor { (here, there) } else { (there, here) };
        self.out.entities.push(
            Entity::line(start, end)
                .on_layer(edge.layer.as_str())
                .with_linetype(edge.linetype.as_str()),
        );
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::config::RenderConfig;
    use crate::drawing::{Block, Drawing, Shape};
    use crate::graph::builder::GraphBuilder;
    use crate::variables::Environment;

    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y, 3)
    }

    fn line(graph: &mut Graph, pending: &mut PendingEdges, a: Point, b: Point, length: Length, layer: &str) {
        graph.add_line(a, b, length, layer, "BYLAYER");
        pending.insert(a, b, layer);
    }

    fn run(graph: &Graph, pending: &mut PendingEdges) -> Result<Propagation, RenderError> {
        Traversal::new(graph, pending, "VIRTUAL_LAYER", 3).run()
    }

    #[test]
    fn test_chain_is_stretched_and_carried() {
        let (mut g, mut pending) = (Graph::new(), PendingEdges::new());
        line(&mut g, &mut pending, p(0.0, 0.0), p(1.0, 0.0), Length::Resolved(3.0), "0");
        line(&mut g, &mut pending, p(1.0, 0.0), p(1.0, 1.0), Length::Resolved(2.0), "0");
        let result = run(&g, &mut pending).unwrap();

        assert_eq!(result.positions[&p(1.0, 0.0)], Coord::new(3.0, 0.0));
        assert_eq!(result.positions[&p(1.0, 1.0)], Coord::new(3.0, 2.0));
        assert_eq!(
            result.entities[1].shape,
            Shape::Line {
                start: Coord::new(3.0, 0.0),
                end: Coord::new(3.0, 2.0)
            }
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn test_anchor_side_first() {
        let (mut g, mut pending) = (Graph::new(), PendingEdges::new());
        // Original start is the right-hand point, so the root holds the non-anchor record
        line(&mut g, &mut pending, p(2.0, 0.0), p(0.0, 0.0), Length::Resolved(4.0), "0");
        let result = run(&g, &mut pending).unwrap();
        assert_eq!(
            result.entities[0].shape,
            Shape::Line {
                start: Coord::new(4.0, 0.0),
                end: Coord::new(0.0, 0.0)
            }
        );
    }

    #[test]
    fn test_aux_lines_move_but_are_not_drawn() {
        let (mut g, mut pending) = (Graph::new(), PendingEdges::new());
        line(&mut g, &mut pending, p(0.0, 0.0), p(0.0, 1.0), Length::Resolved(5.0), "VIRTUAL_LAYER");
        g.add_edge(
            p(0.0, 1.0),
            Edge {
                target: p(0.0, 1.0),
                kind: EdgeKind::Circle { radius: 1.0 },
                layer: "0".to_string(),
                linetype: "BYLAYER".to_string(),
            },
        );
        let result = run(&g, &mut pending).unwrap();
        assert_eq!(result.entities.len(), 1);
        assert_eq!(
            result.entities[0].shape,
            Shape::Circle {
                center: Coord::new(0.0, 5.0),
                radius: 1.0
            }
        );
    }

    #[test]
    fn test_landmark_records_corrected_position() {
        let (mut g, mut pending) = (Graph::new(), PendingEdges::new());
        line(&mut g, &mut pending, p(0.0, 0.0), p(2.0, 0.0), Length::Resolved(4.0), "0");
        g.add_edge(
            p(2.0, 0.0),
            Edge {
                target: p(2.0, 0.0),
                kind: EdgeKind::Landmark {
                    label: "tip".to_string(),
                },
                layer: "VIRTUAL_LAYER".to_string(),
                linetype: "BYLAYER".to_string(),
            },
        );
        let result = run(&g, &mut pending).unwrap();
        assert_eq!(result.landmarks["tip"], Coord::new(4.0, 0.0));
    }

    #[test]
    fn test_deferred_lines_are_left_pending() {
        let (mut g, mut pending) = (Graph::new(), PendingEdges::new());
        line(&mut g, &mut pending, p(0.0, 0.0), p(1.0, 0.0), Length::Resolved(2.0), "0");
        line(&mut g, &mut pending, p(1.0, 0.0), p(1.0, 1.0), Length::Resolved(2.0), "0");
        line(&mut g, &mut pending, p(0.0, 0.0), p(1.0, 1.0), Length::Deferred, "0");
        let result = run(&g, &mut pending).unwrap();
        assert_eq!(result.entities.len(), 2);
        assert_eq!(pending.len(), 2);
    }

    fn self_loop(graph: &mut Graph, at: Point, kind: EdgeKind) {
        graph.add_edge(
            at,
            Edge {
                target: at,
                kind,
                layer: "0".to_string(),
                linetype: "BYLAYER".to_string(),
            },
        );
    }

    /// 1x1 square whose first two sides double while the last two keep length 1
    fn overconstrained_square(g: &mut Graph, pending: &mut PendingEdges) {
        line(g, pending, p(0.0, 0.0), p(1.0, 0.0), Length::Resolved(2.0), "0");
        line(g, pending, p(1.0, 0.0), p(1.0, 1.0), Length::Resolved(2.0), "0");
        line(g, pending, p(1.0, 1.0), p(0.0, 1.0), Length::Resolved(1.0), "0");
        line(g, pending, p(0.0, 1.0), p(0.0, 0.0), Length::Resolved(1.0), "0");
    }

    #[test]
    fn test_cycle_closing_line_keeps_length_and_direction() {
        let (mut g, mut pending) = (Graph::new(), PendingEdges::new());
        overconstrained_square(&mut g, &mut pending);
        let result = run(&g, &mut pending).unwrap();

        assert_eq!(result.entities.len(), 4);
        assert_eq!(
            result.entities[3].shape,
            Shape::Line {
                start: Coord::new(1.0, 2.0),
                end: Coord::new(1.0, 1.0)
            }
        );
        // The root is moved to where the closing line ends
        assert_eq!(result.positions[&p(0.0, 0.0)], Coord::new(1.0, 1.0));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_reentered_node_emits_shapes_once() {
        let (mut g, mut pending) = (Graph::new(), PendingEdges::new());
        overconstrained_square(&mut g, &mut pending);
        self_loop(&mut g, p(0.0, 0.0), EdgeKind::Circle { radius: 0.5 });
        self_loop(
            &mut g,
            p(0.0, 0.0),
            EdgeKind::Landmark {
                label: "corner".to_string(),
            },
        );
        let result = run(&g, &mut pending).unwrap();

        let circles: Vec<_> = result
            .entities
            .iter()
            .filter(|e| matches!(e.shape, Shape::Circle { .. }))
            .collect();
        assert_eq!(circles.len(), 1);
        assert_eq!(
            circles[0].shape,
            Shape::Circle {
                center: Coord::new(0.0, 0.0),
                radius: 0.5
            }
        );
        assert_eq!(result.landmarks["corner"], Coord::new(0.0, 0.0));
    }

    #[test]
    fn test_deferred_line_uses_moved_position() {
        let (mut g, mut pending) = (Graph::new(), PendingEdges::new());
        overconstrained_square(&mut g, &mut pending);
        line(&mut g, &mut pending, p(0.0, 0.0), p(1.0, 1.0), Length::Deferred, "0");
        let result = run(&g, &mut pending).unwrap();
        assert_eq!(result.positions[&p(0.0, 0.0)], Coord::new(1.0, 1.0));
        assert_eq!(result.positions[&p(1.0, 1.0)], Coord::new(2.0, 2.0));
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_shapes_follow_stretched_line() {
        let mut source = Drawing::new();
        source.add_block(
            "door",
            Block {
                base: Coord::ORIGIN,
                entities: vec![Entity::line((0.0, 0.0), (2.0, 0.0)), Entity::line((2.0, 0.0), (2.0, 1.0))],
            },
        );
        source.add(Entity::line((0.0, 0.0), (1.0, 0.0)).with_xdata("c:3"));
        source.add(Entity::arc((1.0, 0.0), 0.5, 30.0, 120.0).with_xdata("c:c*2"));
        source.add(Entity::insert("door", (1.0, 0.0), 1.0, 1.0).with_xdata("c:4@?"));

        let config = RenderConfig::default();
        let mut env = Environment::new();
        let mut output = Drawing::new();
        let mut built = GraphBuilder::new(&config, &mut env, &mut output).build(&source).unwrap();
        let result = Traversal::new(&built.graph, &mut built.pending, "VIRTUAL_LAYER", 3)
            .run()
            .unwrap();

        assert_eq!(result.entities.len(), 3);
        assert_eq!(
            result.entities[1].shape,
            Shape::Arc {
                center: Coord::new(3.0, 0.0),
                radius: 1.0,
                start_angle: 30.0,
                end_angle: 120.0
            }
        );
        assert_eq!(
            result.entities[2].shape,
            Shape::Insert {
                block: "door".to_string(),
                insert: Coord::new(3.0, 0.0),
                x_scale: 2.0,
                y_scale: 2.0
            }
        );
    }

    #[test]
    fn test_disconnected_graph() {
        let (mut g, mut pending) = (Graph::new(), PendingEdges::new());
        line(&mut g, &mut pending, p(0.0, 0.0), p(1.0, 0.0), Length::Resolved(1.0), "0");
        line(&mut g, &mut pending, p(5.0, 5.0), p(6.0, 5.0), Length::Resolved(1.0), "0");
        let err = run(&g, &mut pending).unwrap_err();
        assert_eq!(err, RenderError::disconnected(p(0.0, 0.0), p(5.0, 5.0), 2));
    }

    #[test]
    fn test_empty_graph() {
        let result = run(&Graph::new(), &mut PendingEdges::new()).unwrap();
        assert!(result.entities.is_empty());
    }
}
