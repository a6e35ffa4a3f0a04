//! Nearest-neighbor strategies over the distinct colors of an index
//!
//! Every strategy resolves ties by insertion order: among colors at the
//! same minimal distance, the one inserted first wins. Both strategies
//! therefore answer identically for the same insertion sequence.

use crate::color::Color;
use crate::io::configuration::MIN_SEARCH_TAIL;
use std::fmt;

/// Nearest-color lookup over a growing set of distinct colors
pub trait ColorSearch: fmt::Debug + Send + Sync {
    /// Register a color not seen before
    fn insert(&mut self, color: Color);

    /// Closest registered color, earliest inserted on ties
    fn nearest(&self, query: Color) -> Option<Color>;

    /// Number of registered colors
    fn len(&self) -> usize;

    /// Whether no color has been registered
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Selects the search structure backing a color index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SearchStrategy {
    /// Scan all colors on every query
    Linear,
    /// Periodically rebuilt k-d tree plus a short linear tail
    #[default]
    KdTree,
}

impl SearchStrategy {
    /// Create an empty search structure of this kind
    pub fn create(self) -> Box<dyn ColorSearch> {
        match self {
            Self::Linear => Box::new(LinearSearch::default()),
            Self::KdTree => Box::new(KdTreeSearch::default()),
        }
    }
}

/// O(n) scan in insertion order
#[derive(Debug, Clone, Default)]
pub struct LinearSearch {
    colors: Vec<Color>,
}

impl ColorSearch for LinearSearch {
    fn insert(&mut self, color: Color) {
        self.colors.push(color);
    }

    fn nearest(&self, query: Color) -> Option<Color> {
        // min_by_key keeps the first of several equal minima
        self.colors
            .iter()
            .copied()
            .min_by_key(|color| color.distance(query))
    }

    fn len(&self) -> usize {
        self.colors.len()
    }
}

#[derive(Debug, Clone, Copy)]
struct Point {
    color: Color,
    channels: [u8; 3],
    ordinal: usize,
}

impl Point {
    const fn axis(&self, axis: usize) -> i32 {
        let [r, g, b] = self.channels;
        match axis % 3 {
            0 => r as i32,
            1 => g as i32,
            _ => b as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    distance: u32,
    ordinal: usize,
}

/// Implicit k-d tree over (R, G, B) with an unindexed tail
///
/// New colors land in the tail. Once the tail grows past
/// `max(MIN_SEARCH_TAIL, sqrt(n))` the whole tree is rebuilt from every
/// distinct color. Queries descend the tree and scan the tail.
#[derive(Debug, Clone, Default)]
pub struct KdTreeSearch {
    tree: Vec<Point>,
    tail: Vec<Point>,
}

impl KdTreeSearch {
    /// Number of colors not yet folded into the tree
    pub const fn pending(&self) -> usize {
        self.tail.len()
    }

    fn tail_limit(&self) -> usize {
        let total = self.tree.len() + self.tail.len();
        MIN_SEARCH_TAIL.max(total.isqrt())
    }

    fn rebuild(&mut self) {
        self.tree.append(&mut self.tail);
        build(&mut self.tree, 0);
        tracing::trace!(colors = self.tree.len(), "Rebuilt color k-d tree");
    }
}

impl ColorSearch for KdTreeSearch {
    fn insert(&mut self, color: Color) {
        let ordinal = self.tree.len() + self.tail.len();
        self.tail.push(Point {
            color,
            channels: color.channels(),
            ordinal,
        });
        if self.tail.len() > self.tail_limit() {
            self.rebuild();
        }
    }

    fn nearest(&self, query: Color) -> Option<Color> {
        let target = Point {
            color: query,
            channels: query.channels(),
            ordinal: 0,
        };

        let mut best: Option<(Candidate, Color)> = None;
        search(&self.tree, 0, &target, &mut best);
        for point in &self.tail {
            consider(point, &target, &mut best);
        }
        best.map(|(_, color)| color)
    }

    fn len(&self) -> usize {
        self.tree.len() + self.tail.len()
    }
}

// Median of each subslice sits at its midpoint; the left half holds
// smaller (axis value, ordinal) keys and the right half larger ones.
fn build(points: &mut [Point], depth: usize) {
    if points.len() <= 1 {
        return;
    }
    let mid = points.len() / 2;
    points.select_nth_unstable_by_key(mid, |p| (p.axis(depth), p.ordinal));

    let (left, rest) = points.split_at_mut(mid);
    build(left, depth + 1);
    if let Some((_, right)) = rest.split_first_mut() {
        build(right, depth + 1);
    }
}

fn consider(point: &Point, target: &Point, best: &mut Option<(Candidate, Color)>) {
    let candidate = Candidate {
        distance: point.color.distance(target.color),
        ordinal: point.ordinal,
    };
    if best.is_none_or(|(current, _)| candidate < current) {
        *best = Some((candidate, point.color));
    }
}

fn search(points: &[Point], depth: usize, target: &Point, best: &mut Option<(Candidate, Color)>) {
    let (left, rest) = points.split_at(points.len() / 2);
    let Some((node, right)) = rest.split_first() else {
        return;
    };

    consider(node, target, best);

    let diff = target.axis(depth) - node.axis(depth);
    let (near, far) = if diff < 0 {
        (left, right)
    } else {
        (right, left)
    };

    search(near, depth + 1, target, best);

    // Equal distances must still be visited so lower ordinals can win ties
    let plane = diff.unsigned_abs().pow(2);
    if best.is_none_or(|(current, _)| plane <= current.distance) {
        search(far, depth + 1, target, best);
    }
}
