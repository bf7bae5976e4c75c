//! Joining disconnected clusters with axis-aligned connectors

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::drawing::Coord;
use crate::graph::Point;

use super::union_find::DisjointSet;

/// An L-shaped link from a point of one cluster to the nearest point of
/// another. `legs` holds one or two segments meeting at `corner`.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub from: Point,
    pub to: Point,
    pub corner: Point,
    pub legs: Vec<(Coord, Coord)>,
}

impl Connector {
    /// Horizontal leg from `from` to `(to.x, from.y)` when x differs, vertical
    /// leg from `to` to the same corner when y differs
    pub fn between(from: Point, to: Point, precision: u32) -> Self {
        let corner = Point::new(to.x(), from.y(), precision);
        let mut legs = Vec::with_capacity(2);
        if from.x() != to.x() {
            legs.push((from.coord(), corner.coord()));
        }
        if from.y() != to.y() {
            legs.push((to.coord(), corner.coord()));
        }
        Self {
            from,
            to,
            corner,
            legs,
        }
    }
}

/// Union every pair of points joined by a line, walking each cluster
/// depth-first
pub fn union_adjacent(forest: &mut DisjointSet, adjacency: &BTreeMap<Point, Vec<Point>>) {
    let mut visited = BTreeSet::new();
    for start in adjacency.keys() {
        forest.insert(*start);
        if !visited.insert(*start) {
            continue;
        }
        let mut stack = vec![*start];
        while let Some(node) = stack.pop() {
            for next in adjacency.get(&node).into_iter().flatten() {
                if visited.insert(*next) {
                    forest.union(node, *next);
                    stack.push(*next);
                }
            }
        }
    }
}

fn compare(a: &(f64, Point, Point), b: &(f64, Point, Point)) -> Ordering {
    a.0.total_cmp(&b.0)
        .then_with(|| a.1.cmp(&b.1))
        .then_with(|| a.2.cmp(&b.2))
}

/// Repeatedly link each point's cluster to the globally closest point of any
/// other cluster until one cluster remains. Candidates are compared by
/// distance, then own point, then other point. Connector corners are not
/// added to the forest and never become candidates.
pub fn connect_components(forest: &mut DisjointSet, precision: u32) -> Vec<Connector> {
    let points: Vec<Point> = forest.points().copied().collect();
    let mut connectors = Vec::new();

    for p in &points {
        let components = forest.components();
        if components.len() <= 1 {
            break;
        }
        let own_root = forest.find(*p);
        let own = &components[&own_root];
        let others: Vec<Point> = components
            .iter()
            .filter(|(root, _)| **root != own_root)
            .flat_map(|(_, members)| members.iter().copied())
            .collect();

        let best = own
            .iter()
            .flat_map(|s| others.iter().map(move |j| (s.distance(j), *s, *j)))
            .min_by(compare);

        if let Some((distance, from, to)) = best {
            forest.union(from, to);
            trace!(%from, %to, distance, "connecting clusters");
            connectors.push(Connector::between(from, to, precision));
        }
    }

    debug!(connectors = connectors.len(), "clusters connected");
    connectors
}
