//! 2D k-d tree for nearest-sample queries
//!
//! Used for the nearest-sample fallback outside the triangulation hull and
//! for choosing the local neighbourhood of each thin-plate spline node.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::SamplePoint;

/// A 2D k-d tree over sample points.
///
/// Ties in distance are broken by the sample's index in the input slice,
/// so queries are deterministic regardless of tree layout.
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<SamplePoint>,
}

#[derive(Debug)]
struct KdNode {
    /// Index into `points`
    point_idx: usize,
    /// Split axis: false = x, true = y
    split_y: bool,
    left: Option<usize>,
    right: Option<usize>,
}

/// Result of a nearest-neighbour query
#[derive(Debug, Clone, Copy)]
pub struct NearestResult {
    pub point: SamplePoint,
    pub distance_sq: f64,
    /// Index of the point in the slice the tree was built from
    pub index: usize,
}

/// Max-heap entry ordered by (distance, index)
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_sq: f64,
    index: usize,
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
        self.distance_sq
            .total_cmp(&other.distance_sq)
            .then(self.index.cmp(&other.index))
    }
}

impl KdTree {
    /// Build a tree with median splits, alternating x and y.
    pub fn build(points: &[SamplePoint]) -> Self {
        let mut nodes = Vec::with_capacity(points.len());
        let mut indices: Vec<usize> = (0..points.len()).collect();
        if !indices.is_empty() {
            build_recursive(points, &mut indices, false, &mut nodes);
        }
        Self {
            nodes,
            points: points.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The single nearest point to (qx, qy), `None` if the tree is empty.
    pub fn nearest(&self, qx: f64, qy: f64) -> Option<NearestResult> {
        self.k_nearest(qx, qy, 1).into_iter().next()
    }

    /// Up to `k` nearest points, sorted by ascending distance.
    pub fn k_nearest(&self, qx: f64, qy: f64, k: usize) -> Vec<NearestResult> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.knn_recursive(0, qx, qy, k, &mut heap);

        heap.into_sorted_vec()
            .into_iter()
            .map(|c| NearestResult {
                point: self.points[c.index],
                distance_sq: c.distance_sq,
                index: c.index,
            })
            .collect()
    }

    fn knn_recursive(
        &self,
        node_idx: usize,
        qx: f64,
        qy: f64,
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        let candidate = Candidate {
            distance_sq: p.dist_sq(qx, qy),
            index: node.point_idx,
        };
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }

        let diff = if node.split_y { qy - p.y } else { qx - p.x };
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = near {
            self.knn_recursive(child, qx, qy, k, heap);
        }

        // Equal distances still need the far side for the index tie-break
        let bound = if heap.len() < k {
            f64::INFINITY
        } else {
            heap.peek().map_or(f64::INFINITY, |worst| worst.distance_sq)
        };
        if diff * diff <= bound {
            if let Some(child) = far {
                self.knn_recursive(child, qx, qy, k, heap);
            }
        }
    }
}

fn build_recursive(
    points: &[SamplePoint],
    indices: &mut [usize],
    split_y: bool,
    nodes: &mut Vec<KdNode>,
) -> usize {
    let key = |i: usize| if split_y { points[i].y } else { points[i].x };
    indices.sort_by(|&a, &b| key(a).total_cmp(&key(b)));

    let median = indices.len() / 2;
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_y,
        left: None,
        right: None,
    });

    let (left, rest) = indices.split_at_mut(median);
    let right = &mut rest[1..];

    if !left.is_empty() {
        let child = build_recursive(points, left, !split_y, nodes);
        nodes[node_idx].left = Some(child);
    }
    if !right.is_empty() {
        let child = build_recursive(points, right, !split_y, nodes);
        nodes[node_idx].right = Some(child);
    }

    node_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<SamplePoint> {
        vec![
            SamplePoint::new(2.0, 3.0, 10.0),
            SamplePoint::new(5.0, 4.0, 20.0),
            SamplePoint::new(9.0, 6.0, 30.0),
            SamplePoint::new(4.0, 7.0, 40.0),
            SamplePoint::new(8.0, 1.0, 50.0),
            SamplePoint::new(7.0, 2.0, 60.0),
            SamplePoint::new(1.0, 8.0, 70.0),
            SamplePoint::new(6.0, 5.0, 80.0),
        ]
    }

    fn brute_force(pts: &[SamplePoint], qx: f64, qy: f64, k: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..pts.len()).collect();
        order.sort_by(|&a, &b| {
            pts[a]
                .dist_sq(qx, qy)
                .total_cmp(&pts[b].dist_sq(qx, qy))
                .then(a.cmp(&b))
        });
        order.truncate(k);
        order
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.nearest(0.0, 0.0).is_none());
        assert!(tree.k_nearest(0.0, 0.0, 3).is_empty());
    }

    #[test]
    fn test_nearest_exact() {
        let tree = KdTree::build(&sample_points());
        let result = tree.nearest(5.0, 4.0).unwrap();
        assert_eq!(result.distance_sq, 0.0);
        assert_eq!(result.point.value, 20.0);
        assert_eq!(result.index, 1);
    }

    #[test]
    fn test_k_nearest_matches_brute_force() {
        let pts = sample_points();
        let tree = KdTree::build(&pts);
        for qx in 0..10 {
            for qy in 0..10 {
                let (qx, qy) = (qx as f64 + 0.5, qy as f64 + 0.5);
                let got: Vec<usize> = tree.k_nearest(qx, qy, 3).iter().map(|r| r.index).collect();
                assert_eq!(got, brute_force(&pts, qx, qy, 3), "query ({qx}, {qy})");
            }
        }
    }

    #[test]
    fn test_ties_break_by_index() {
        // Four points equidistant from the origin
        let pts = vec![
            SamplePoint::new(0.0, 1.0, 0.0),
            SamplePoint::new(1.0, 0.0, 1.0),
            SamplePoint::new(0.0, -1.0, 2.0),
            SamplePoint::new(-1.0, 0.0, 3.0),
        ];
        let tree = KdTree::build(&pts);
        let got: Vec<usize> = tree.k_nearest(0.0, 0.0, 2).iter().map(|r| r.index).collect();
        assert_eq!(got, vec![0, 1]);
        assert_eq!(tree.nearest(0.0, 0.0).unwrap().index, 0);
    }

    #[test]
    fn test_k_larger_than_tree() {
        let pts = sample_points();
        let tree = KdTree::build(&pts);
        assert_eq!(tree.k_nearest(5.0, 5.0, 100).len(), pts.len());
    }

    #[test]
    fn test_regular_grid() {
        let pts: Vec<SamplePoint> = (0..400)
            .map(|i| SamplePoint::new((i % 20) as f64, (i / 20) as f64, i as f64))
            .collect();
        let tree = KdTree::build(&pts);
        for &(qx, qy) in &[(3.2, 7.9), (19.5, 0.0), (-4.0, 25.0), (10.0, 10.0)] {
            let got: Vec<usize> = tree.k_nearest(qx, qy, 7).iter().map(|r| r.index).collect();
            assert_eq!(got, brute_force(&pts, qx, qy, 7));
        }
    }
}
