//! Balanced k-d tree over particle positions
//!
//! The tree is stored implicitly in a single permutation of the input points.
//! A node covers a half-open range `[lo, hi)`; its splitting point sits at
//! the range midpoint, points before it are not greater along the split axis
//! and points after it are not smaller. The split axis of every node is kept
//! in a parallel array indexed by the node's midpoint.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    /// Minimum corner
    pub min: [f32; 3],
    /// Maximum corner
    pub max: [f32; 3],
}

impl BBox {
    /// An empty box that any point will grow
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
        }
    }

    /// Box with the given corners
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// Extend the box to include `p`
    #[inline]
    pub fn grow(&mut self, p: [f32; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }

    /// True if `p` lies within the box, boundary included
    #[inline]
    pub fn contains(&self, p: [f32; 3]) -> bool {
        (0..3).all(|axis| p[axis] >= self.min[axis] && p[axis] <= self.max[axis])
    }

    /// True if the two boxes overlap
    #[inline]
    pub fn intersects(&self, other: &BBox) -> bool {
        (0..3).all(|axis| self.min[axis] <= other.max[axis] && self.max[axis] >= other.min[axis])
    }

    /// Axis with the largest extent
    pub fn longest_axis(&self) -> usize {
        let extent = |axis: usize| self.max[axis] - self.min[axis];
        let mut best = 0;
        for axis in 1..3 {
            if extent(axis) > extent(best) {
                best = axis;
            }
        }
        best
    }
}

/// One nearest-neighbor candidate, ordered by squared distance
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_squared: f32,
    id: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_squared.total_cmp(&other.distance_squared)
    }
}

/// Result of a k-nearest query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighbors {
    /// Particle indices, nearest first
    pub indices: Vec<usize>,
    /// Squared distances matching `indices`
    pub distances_squared: Vec<f32>,
    /// Squared radius spanned by the result
    pub max_radius_squared: f32,
}

/// Static k-d tree answering box and k-nearest queries
#[derive(Debug, Clone)]
pub struct KdTree {
    points: Vec<[f32; 3]>,
    ids: Vec<usize>,
    axes: Vec<u8>,
    bbox: BBox,
}

impl KdTree {
    /// Build a tree over `points`; query results report positions in this slice
    pub fn build(points: &[[f32; 3]]) -> Self {
        let mut items: Vec<([f32; 3], usize)> = points.iter().copied().zip(0..).collect();
        let mut axes = vec![0u8; items.len()];
        let mut bbox = BBox::empty();
        for &(p, _) in &items {
            bbox.grow(p);
        }

        Self::split(&mut items, &mut axes, 0);

        log::trace!("built k-d tree over {} points", axes.len());
        let (points, ids) = items.into_iter().unzip();
        Self {
            points,
            ids,
            axes,
            bbox,
        }
    }

    fn split(items: &mut [([f32; 3], usize)], axes: &mut [u8], offset: usize) {
        if items.len() <= 1 {
            return;
        }

        let mut bounds = BBox::empty();
        for &(p, _) in items.iter() {
            bounds.grow(p);
        }
        let axis = bounds.longest_axis();
        let mid = items.len() / 2;
        items.select_nth_unstable_by(mid, |a, b| a.0[axis].total_cmp(&b.0[axis]));
        axes[offset + mid] = axis as u8;

        let (left, rest) = items.split_at_mut(mid);
        Self::split(left, axes, offset);
        Self::split(&mut rest[1..], axes, offset + mid + 1);
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the tree holds no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounds of all indexed points
    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    /// Append the ids of all points inside `[min, max]` to `out`
    pub fn find_points(&self, min: [f32; 3], max: [f32; 3], out: &mut Vec<usize>) {
        let query = BBox::new(min, max);
        if self.is_empty() || !query.intersects(&self.bbox) {
            return;
        }
        self.box_search(&query, 0, self.points.len(), out);
    }

    fn box_search(&self, query: &BBox, lo: usize, hi: usize, out: &mut Vec<usize>) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let p = self.points[mid];
        if query.contains(p) {
            out.push(self.ids[mid]);
        }
        if hi - lo == 1 {
            return;
        }

        let axis = self.axes[mid] as usize;
        if query.min[axis] <= p[axis] {
            self.box_search(query, lo, mid, out);
        }
        if query.max[axis] >= p[axis] {
            self.box_search(query, mid + 1, hi, out);
        }
    }

    /// Find up to `k` points closest to `center` and strictly within `max_radius`
    ///
    /// Results are appended to `points` and `distances_squared`, nearest first.
    /// Returns the squared radius the result spans: the distance of the k-th
    /// point when `k` points were found, otherwise `max_radius²`. The order
    /// among equidistant points is not specified.
    pub fn find_n_points(
        &self,
        center: [f32; 3],
        k: usize,
        max_radius: f32,
        points: &mut Vec<usize>,
        distances_squared: &mut Vec<f32>,
    ) -> f32 {
        let max_radius_squared = max_radius * max_radius;
        if k == 0 || self.is_empty() {
            return max_radius_squared;
        }

        let mut heap = BinaryHeap::with_capacity(k.min(self.len()) + 1);
        self.nearest_search(center, k, max_radius_squared, 0, self.points.len(), &mut heap);

        let found = heap.into_sorted_vec();
        let spanned = if found.len() == k {
            found.last().map_or(max_radius_squared, |c| c.distance_squared)
        } else {
            max_radius_squared
        };
        for candidate in found {
            points.push(candidate.id);
            distances_squared.push(candidate.distance_squared);
        }
        spanned
    }

    fn nearest_search(
        &self,
        center: [f32; 3],
        k: usize,
        max_radius_squared: f32,
        lo: usize,
        hi: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let p = self.points[mid];

        let distance_squared = distance_squared(center, p);
        if distance_squared < current_radius(heap, k, max_radius_squared) {
            heap.push(Candidate {
                distance_squared,
                id: self.ids[mid],
            });
            if heap.len() > k {
                heap.pop();
            }
        }
        if hi - lo == 1 {
            return;
        }

        let axis = self.axes[mid] as usize;
        let delta = center[axis] - p[axis];
        let (near, far) = if delta <= 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.nearest_search(center, k, max_radius_squared, near.0, near.1, heap);
        if delta * delta < current_radius(heap, k, max_radius_squared) {
            self.nearest_search(center, k, max_radius_squared, far.0, far.1, heap);
        }
    }
}

#[inline]
fn current_radius(heap: &BinaryHeap<Candidate>, k: usize, max_radius_squared: f32) -> f32 {
    if heap.len() < k {
        max_radius_squared
    } else {
        heap.peek()
            .map_or(max_radius_squared, |c| c.distance_squared)
    }
}

#[inline]
fn distance_squared(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> Vec<[f32; 3]> {
        let step = 1.0 / (n - 1) as f32;
        let mut points = Vec::with_capacity(n * n * n);
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    points.push([i as f32 * step, j as f32 * step, k as f32 * step]);
                }
            }
        }
        points
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::build(&[]);
        let mut out = Vec::new();
        tree.find_points([0.0; 3], [1.0; 3], &mut out);
        assert!(out.is_empty());

        let mut dist = Vec::new();
        let r2 = tree.find_n_points([0.0; 3], 3, 2.0, &mut out, &mut dist);
        assert!(out.is_empty());
        assert!((r2 - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_box_query_on_grid() {
        let points = grid(9);
        let tree = KdTree::build(&points);
        let mut out = Vec::new();
        tree.find_points([0.3, 0.3, 0.3], [0.7, 0.7, 0.7], &mut out);

        let mut expected: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| BBox::new([0.3; 3], [0.7; 3]).contains(**p))
            .map(|(i, _)| i)
            .collect();
        out.sort_unstable();
        expected.sort_unstable();
        assert_eq!(out, expected);
        // 0.375, 0.5, 0.625 on each axis
        assert_eq!(out.len(), 27);
    }

    #[test]
    fn test_box_query_appends() {
        let points = grid(3);
        let tree = KdTree::build(&points);
        let mut out = vec![usize::MAX];
        tree.find_points([-1.0; 3], [2.0; 3], &mut out);
        assert_eq!(out.len(), 28);
        assert_eq!(out[0], usize::MAX);
    }

    #[test]
    fn test_nearest_on_grid() {
        let points = grid(9);
        let tree = KdTree::build(&points);
        let mut ids = Vec::new();
        let mut dist = Vec::new();
        tree.find_n_points([0.51, 0.52, 0.53], 5, 0.15, &mut ids, &mut dist);

        let mut found: Vec<[f32; 3]> = ids.iter().map(|&i| points[i]).collect();
        found.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mut expected = vec![
            [0.375, 0.5, 0.5],
            [0.5, 0.5, 0.5],
            [0.5, 0.5, 0.625],
            [0.5, 0.625, 0.5],
            [0.625, 0.5, 0.5],
        ];
        expected.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        assert_eq!(found, expected);
        assert!(dist.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_nearest_respects_radius() {
        let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [3.0, 0.0, 0.0]];
        let tree = KdTree::build(&points);
        let mut ids = Vec::new();
        let mut dist = Vec::new();
        let r2 = tree.find_n_points([0.0; 3], 5, 2.0, &mut ids, &mut dist);
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(dist, vec![0.0, 1.0]);
        assert!((r2 - 4.0).abs() < 1e-6);

        ids.clear();
        dist.clear();
        let r2 = tree.find_n_points([0.0; 3], 1, 2.0, &mut ids, &mut dist);
        assert_eq!(ids, vec![0]);
        assert_eq!(r2, 0.0);
    }

    #[test]
    fn test_duplicate_points() {
        let points = vec![[0.5; 3]; 16];
        let tree = KdTree::build(&points);
        let mut out = Vec::new();
        tree.find_points([0.5; 3], [0.5; 3], &mut out);
        out.sort_unstable();
        assert_eq!(out, (0..16).collect::<Vec<_>>());
    }
}
