//! Nearest-node spatial index
//!
//! A 2D k-d tree over a network's node cell centers, used to snap
//! arbitrary query coordinates to the nearest network node. Replaces
//! O(n·m) brute-force search in the coordinate query loop.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use crate::network::StreamNetwork;

/// A node record held by the locator.
///
/// Snap matches are reported through the node's linear grid position, not
/// its index in the locator's internal ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeEntry {
    /// World x of the node's cell center
    pub x: f64,
    /// World y of the node's cell center
    pub y: f64,
    /// Row-major linear position of the node in the originating grid
    pub position: usize,
}

impl NodeEntry {
    /// Squared Euclidean distance to a query point
    #[inline]
    pub fn dist_sq(&self, qx: f64, qy: f64) -> f64 {
        let dx = self.x - qx;
        let dy = self.y - qy;
        dx * dx + dy * dy
    }
}

/// Result of a nearest-node query
#[derive(Debug, Clone, Copy)]
pub struct SnapResult {
    /// The snapped node
    pub node: NodeEntry,
    /// Squared distance from the query to the snapped node
    pub distance_sq: f64,
}

impl SnapResult {
    /// Snap residual: Euclidean distance from the query to the node
    pub fn residual(&self) -> f64 {
        self.distance_sq.sqrt()
    }
}

/// A 2D k-d tree over the node cell centers of a network.
#[derive(Debug)]
pub struct NodeLocator {
    nodes: Vec<LocatorNode>,
    entries: Vec<NodeEntry>,
}

#[derive(Debug)]
struct LocatorNode {
    /// Index into `entries`
    entry: usize,
    /// Split axis: 0 = x, 1 = y
    axis: u8,
    /// Subtree roots, `[low side, high side]` of the splitting line
    children: [Option<usize>; 2],
}

impl NodeLocator {
    /// Build the index over a network's nodes.
    ///
    /// Construction is O(n log n) using median-of-coordinate splitting.
    pub fn build(network: &StreamNetwork) -> Self {
        let mut entries = Vec::with_capacity(network.len());
        for (node, &position) in network.node_positions().iter().enumerate() {
            if let Some((x, y)) = network.node_coord(node) {
                entries.push(NodeEntry { x, y, position });
            }
        }
        Self::from_entries(entries)
    }

    fn from_entries(entries: Vec<NodeEntry>) -> Self {
        let mut nodes = Vec::with_capacity(entries.len());
        if !entries.is_empty() {
            let mut order: Vec<usize> = (0..entries.len()).collect();
            build_subtree(&entries, &mut order, 0, &mut nodes);
        }
        Self { nodes, entries }
    }

    /// Number of nodes in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the nearest node to (qx, qy).
    ///
    /// Returns `None` when the index holds no nodes. Average-case
    /// O(log n).
    pub fn nearest(&self, qx: f64, qy: f64) -> Option<SnapResult> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best_d2 = f64::MAX;
        let mut best = 0;
        self.descend_nearest(0, qx, qy, &mut best_d2, &mut best);

        Some(SnapResult {
            node: self.entries[best],
            distance_sq: best_d2,
        })
    }

    /// Find the k nearest nodes to (qx, qy).
    ///
    /// Up to k matches, closest first. Average-case O(k log n).
    pub fn k_nearest(&self, qx: f64, qy: f64, k: usize) -> Vec<SnapResult> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }

        // Candidates kept sorted worst-first so the cutoff sits at index 0
        let mut worst_first: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
        self.descend_k(0, qx, qy, k, &mut worst_first);

        worst_first.reverse();
        worst_first
            .into_iter()
            .map(|(d2, idx)| SnapResult {
                node: self.entries[idx],
                distance_sq: d2,
            })
            .collect()
    }

    fn descend_nearest(&self, at: usize, qx: f64, qy: f64, best_d2: &mut f64, best: &mut usize) {
        let node = &self.nodes[at];
        let entry = &self.entries[node.entry];

        let d2 = entry.dist_sq(qx, qy);
        if d2 < *best_d2 {
            *best_d2 = d2;
            *best = node.entry;
        }

        // Signed offset from the splitting line picks the near half
        let gap = if node.axis == 0 {
            qx - entry.x
        } else {
            qy - entry.y
        };
        let near = node.children[(gap >= 0.0) as usize];
        let far = node.children[(gap < 0.0) as usize];

        if let Some(child) = near {
            self.descend_nearest(child, qx, qy, best_d2, best);
        }

        // The far half can only hold a closer node if the splitting
        // line itself is closer than the current best
        if gap * gap < *best_d2 {
            if let Some(child) = far {
                self.descend_nearest(child, qx, qy, best_d2, best);
            }
        }
    }

    fn descend_k(&self, at: usize, qx: f64, qy: f64, k: usize, worst_first: &mut Vec<(f64, usize)>) {
        let node = &self.nodes[at];
        let entry = &self.entries[node.entry];

        let d2 = entry.dist_sq(qx, qy);
        if worst_first.len() < k || d2 < worst_first[0].0 {
            if worst_first.len() == k {
                worst_first.remove(0);
            }
            let slot = worst_first.partition_point(|&(other, _)| other > d2);
            worst_first.insert(slot, (d2, node.entry));
        }

        let gap = if node.axis == 0 {
            qx - entry.x
        } else {
            qy - entry.y
        };
        let near = node.children[(gap >= 0.0) as usize];
        let far = node.children[(gap < 0.0) as usize];

        if let Some(child) = near {
            self.descend_k(child, qx, qy, k, worst_first);
        }

        let cutoff = if worst_first.len() == k {
            worst_first[0].0
        } else {
            f64::MAX
        };
        if gap * gap < cutoff {
            if let Some(child) = far {
                self.descend_k(child, qx, qy, k, worst_first);
            }
        }
    }
}

/// Lay out the subtree over `order`, returning its root's index in `nodes`.
fn build_subtree(
    entries: &[NodeEntry],
    order: &mut [usize],
    depth: usize,
    nodes: &mut Vec<LocatorNode>,
) -> usize {
    let axis = (depth % 2) as u8;
    let key = |i: usize| {
        let e = &entries[i];
        if axis == 0 {
            e.x
        } else {
            e.y
        }
    };
    order.sort_by(|&a, &b| key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal));

    let mid = order.len() / 2;
    let at = nodes.len();
    nodes.push(LocatorNode {
        entry: order[mid],
        axis,
        children: [None, None],
    });

    if mid > 0 {
        let low = build_subtree(entries, &mut order[..mid].to_vec(), depth + 1, nodes);
        nodes[at].children[0] = Some(low);
    }
    if mid + 1 < order.len() {
        let high = build_subtree(entries, &mut order[mid + 1..].to_vec(), depth + 1, nodes);
        nodes[at].children[1] = Some(high);
    }

    at
}

#[cfg(test)]
mod tests {
    use super::*;
    use thalweg_core::{GeoTransform, Raster};

    fn sample_entries() -> Vec<NodeEntry> {
        [
            (2.0, 3.0, 10),
            (5.0, 4.0, 20),
            (9.0, 6.0, 30),
            (4.0, 7.0, 40),
            (8.0, 1.0, 50),
            (7.0, 2.0, 60),
            (1.0, 8.0, 70),
            (6.0, 5.0, 80),
        ]
        .iter()
        .map(|&(x, y, position)| NodeEntry { x, y, position })
        .collect()
    }

    #[test]
    fn test_empty_locator() {
        let locator = NodeLocator::from_entries(Vec::new());
        assert!(locator.is_empty());
        assert!(locator.nearest(0.0, 0.0).is_none());
        assert!(locator.k_nearest(0.0, 0.0, 3).is_empty());
    }

    #[test]
    fn test_nearest_exact_node() {
        let locator = NodeLocator::from_entries(sample_entries());
        let result = locator.nearest(5.0, 4.0).unwrap();
        assert!(result.distance_sq < 1e-10);
        assert_eq!(result.node.position, 20);
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let entries = sample_entries();
        let locator = NodeLocator::from_entries(entries.clone());

        for qx in 0..10 {
            for qy in 0..10 {
                let qx = qx as f64 + 0.5;
                let qy = qy as f64 + 0.5;

                let result = locator.nearest(qx, qy).unwrap();

                let best = entries
                    .iter()
                    .map(|e| e.dist_sq(qx, qy))
                    .fold(f64::MAX, f64::min);

                assert!(
                    (result.distance_sq - best).abs() < 1e-10,
                    "mismatch at ({}, {}): tree={:.4}, brute={:.4}",
                    qx,
                    qy,
                    result.distance_sq,
                    best
                );
            }
        }
    }

    #[test]
    fn test_k_nearest_sorted_and_correct() {
        let entries = sample_entries();
        let locator = NodeLocator::from_entries(entries.clone());

        let results = locator.k_nearest(5.0, 5.0, 3);
        assert_eq!(results.len(), 3);
        for i in 1..results.len() {
            assert!(results[i].distance_sq >= results[i - 1].distance_sq);
        }

        let mut dists: Vec<f64> = entries.iter().map(|e| e.dist_sq(5.0, 5.0)).collect();
        dists.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for (i, r) in results.iter().enumerate() {
            assert!((r.distance_sq - dists[i]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_k_nearest_more_than_nodes() {
        let locator = NodeLocator::from_entries(sample_entries());
        let results = locator.k_nearest(5.0, 5.0, 100);
        assert_eq!(results.len(), 8);
    }

    #[test]
    fn test_single_entry() {
        let locator = NodeLocator::from_entries(vec![NodeEntry {
            x: 3.0,
            y: 4.0,
            position: 0,
        }]);
        let result = locator.nearest(0.0, 0.0).unwrap();
        assert!((result.distance_sq - 25.0).abs() < 1e-10);
        assert!((result.residual() - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_build_from_network() {
        let mut grid: Raster<f64> = Raster::new(4, 4);
        grid.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        let network = StreamNetwork::new(
            &grid,
            vec![1, 6, 11],
            vec![Some(1), Some(2), None],
            vec![2.0, 1.0, 0.0],
        )
        .unwrap();

        let locator = NodeLocator::build(&network);
        assert_eq!(locator.len(), 3);

        // Query next to the cell center of position 6 = subscript (1, 2)
        let result = locator.nearest(2.6, 2.4).unwrap();
        assert_eq!(result.node.position, 6);
        assert!(result.residual() < 0.2);
    }
}
