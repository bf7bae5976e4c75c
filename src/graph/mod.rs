//! Geometric graph keyed by rounded coordinates
//!
//! Nodes are [`Point`]s; each node owns the ordered list of its incident
//! [`Edge`] records. Lines appear twice (once per endpoint); circles, arcs,
//! landmarks and block references are self-loops on their anchor point.

pub mod builder;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use thiserror::Error;

use crate::drawing::Coord;

pub use builder::{BuildOutput, GraphBuilder};

/// Round `value` to `precision` decimal places
pub fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    let rounded = (value * scale).round() / scale;
    // Collapse -0.0 so equal keys hash equally
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// A coordinate rounded to a fixed precision. Equality, hashing and ordering
/// (x, then y) are defined on the rounded pair only.
#[derive(Debug, Clone, Copy)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, precision: u32) -> Self {
        Self {
            x: round_to(x, precision),
            y: round_to(y, precision),
        }
    }

    pub fn from_coord(c: Coord, precision: u32) -> Self {
        Self::new(c.x, c.y, precision)
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.coord().distance(other.coord())
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Target length of a line edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Resolved(f64),
    /// Created after traversal between the final endpoint positions
    Deferred,
}

/// What an edge represents
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeKind {
    /// `anchor` is true on the record held by the line's original start point
    Line { length: Length, anchor: bool },
    Circle { radius: f64 },
    Arc {
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    Landmark { label: String },
    Block {
        name: String,
        x_scale: f64,
        y_scale: f64,
    },
}

/// One incident edge record of a node
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub target: Point,
    pub kind: EdgeKind,
    pub layer: String,
    pub linetype: String,
}

impl Edge {
    /// Whether this edge feeds the traversal (everything except deferred lines)
    pub fn is_resolved(&self) -> bool {
        !matches!(
            self.kind,
            EdgeKind::Line {
                length: Length::Deferred,
                ..
            }
        )
    }

    pub fn is_line(&self) -> bool {
        matches!(self.kind, EdgeKind::Line { .. })
    }
}

/// Adjacency map from node to its incident edges, iterated in point order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: BTreeMap<Point, Vec<Edge>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, from: Point, edge: Edge) {
        self.nodes.entry(from).or_default().push(edge);
    }

    /// Insert both records of a line
    pub fn add_line(&mut self, start: Point, end: Point, length: Length, layer: &str, linetype: &str) {
        self.add_edge(
            end,
            Edge {
                target: start,
                kind: EdgeKind::Line {
                    length,
                    anchor: false,
                },
                layer: layer.to_string(),
                linetype: linetype.to_string(),
            },
        );
        self.add_edge(
            start,
            Edge {
                target: end,
                kind: EdgeKind::Line {
                    length,
                    anchor: true,
                },
                layer: layer.to_string(),
                linetype: linetype.to_string(),
            },
        );
    }

    pub fn edges(&self, node: &Point) -> &[Edge] {
        self.nodes.get(node).map_or(&[], Vec::as_slice)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Point> {
        self.nodes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Point, &[Edge])> {
        self.nodes.iter().map(|(p, e)| (p, e.as_slice()))
    }

    pub fn contains(&self, node: &Point) -> bool {
        self.nodes.contains_key(node)
    }

    /// The minimum point (x, then y), where traversal starts
    pub fn root(&self) -> Option<Point> {
        self.nodes.keys().next().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("no pending {layer} edge between {from} and {to}")]
pub struct MissingEdge {
    pub from: Point,
    pub to: Point,
    pub layer: String,
}

/// Line edges not yet materialized: per node, a multiset of `(layer, neighbor)`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingEdges {
    pending: BTreeMap<Point, Vec<(String, Point)>>,
}

impl PendingEdges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a line between `a` and `b` at both ends
    pub fn insert(&mut self, a: Point, b: Point, layer: &str) {
        self.pending
            .entry(b)
            .or_default()
            .push((layer.to_string(), a));
        self.pending
            .entry(a)
            .or_default()
            .push((layer.to_string(), b));
    }

    pub fn contains(&self, node: &Point, layer: &str, neighbor: &Point) -> bool {
        self.pending
            .get(node)
            .is_some_and(|v| v.iter().any(|(l, p)| l == layer && p == neighbor))
    }

    /// Remove one occurrence of the line from both endpoint lists
    pub fn consume(&mut self, a: Point, b: Point, layer: &str) -> Result<(), MissingEdge> {
        self.remove_one(a, b, layer)?;
        self.remove_one(b, a, layer)
    }

    fn remove_one(&mut self, node: Point, neighbor: Point, layer: &str) -> Result<(), MissingEdge> {
        let missing = || MissingEdge {
            from: node,
            to: neighbor,
            layer: layer.to_string(),
        };
        let list = self.pending.get_mut(&node).ok_or_else(missing)?;
        let idx = list
            .iter()
            .position(|(l, p)| l == layer && *p == neighbor)
            .ok_or_else(missing)?;
        list.remove(idx);
        Ok(())
    }

    /// Every remaining `(node, layer, neighbor)` entry
    pub fn remaining(&self) -> impl Iterator<Item = (&Point, &str, &Point)> {
        self.pending
            .iter()
            .flat_map(|(n, v)| v.iter().map(move |(l, p)| (n, l.as_str(), p)))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.values().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }
}
