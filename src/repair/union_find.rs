//! Disjoint-set forest over graph points

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::Point;

/// Union-find with path compression. Points must be inserted before use;
/// unknown points are treated as their own singleton set.
#[derive(Debug, Clone, Default)]
pub struct DisjointSet {
    parent: BTreeMap<Point, Point>,
}

impl DisjointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `p` as a singleton unless already present
    pub fn insert(&mut self, p: Point) {
        self.parent.entry(p).or_insert(p);
    }

    pub fn contains(&self, p: &Point) -> bool {
        self.parent.contains_key(p)
    }

    /// Representative of `p`'s set; every point on the path is re-pointed
    /// straight at it
    pub fn find(&mut self, p: Point) -> Point {
        let mut root = p;
        while let Some(&next) = self.parent.get(&root) {
            if next == root {
                break;
            }
            root = next;
        }

        let mut current = p;
        while current != root {
            match self.parent.insert(current, root) {
                Some(next) => current = next,
                None => break,
            }
        }
        root
    }

    /// Merge the sets of `a` and `b`; `b`'s representative is attached under
    /// `a`'s. Returns false if they were already joined.
    pub fn union(&mut self, a: Point, b: Point) -> bool {
        self.insert(a);
        self.insert(b);
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        self.parent.insert(rb, ra);
        true
    }

    pub fn points(&self) -> impl Iterator<Item = &Point> {
        self.parent.keys()
    }

    pub fn roots(&mut self) -> BTreeSet<Point> {
        let points: Vec<Point> = self.parent.keys().copied().collect();
        points.into_iter().map(|p| self.find(p)).collect()
    }

    /// Members of each set, keyed by representative
    pub fn components(&mut self) -> BTreeMap<Point, Vec<Point>> {
        let points: Vec<Point> = self.parent.keys().copied().collect();
        let mut out: BTreeMap<Point, Vec<Point>> = BTreeMap::new();
        for p in points {
            let root = self.find(p);
            out.entry(root).or_default().push(p);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}
