//! Stream network graph over grid cells
//!
//! An ordered collection of grid positions forming a directed acyclic
//! graph with at most one downstream successor per node. The node order
//! is the alignment contract for every attribute list attached to the
//! network; reordering a network invalidates its lists.

use crate::network::NodeAttributeList;
use ndarray::Array2;
use std::collections::HashSet;
use thalweg_core::error::{Error, Result};
use thalweg_core::raster::{GeoTransform, Raster, RasterValue};

/// A directed stream network built over the cells of an originating grid.
///
/// Networks are constructed once by an external builder and read-only
/// afterwards. `distance` holds the cumulative Euclidean along-network
/// distance from the outlet(s); it grows upstream. The originating grid's
/// shape and transform are carried so nodes can be placed in the world.
#[derive(Debug, Clone)]
pub struct StreamNetwork {
    /// Shape (rows, cols) of the originating grid
    grid_shape: (usize, usize),
    /// Transform of the originating grid
    transform: GeoTransform,
    /// Row-major linear positions of the nodes, unique
    node_positions: Vec<usize>,
    /// Downstream successor per node, index into the node order
    downstream: Vec<Option<usize>>,
    /// Cumulative distance from the outlet per node
    distance: Vec<f64>,
}

impl StreamNetwork {
    /// Build a network over an originating grid.
    ///
    /// Validates the builder contract: non-empty parallel arrays, unique
    /// in-range node positions, in-range non-self downstream links, no
    /// cycles, finite distances that do not increase downstream.
    pub fn new<T: RasterValue>(
        grid: &Raster<T>,
        node_positions: Vec<usize>,
        downstream: Vec<Option<usize>>,
        distance: Vec<f64>,
    ) -> Result<Self> {
        Self::from_parts(
            grid.shape(),
            *grid.transform(),
            node_positions,
            downstream,
            distance,
        )
    }

    /// Build a network from raw grid geometry, for builders that do not
    /// hold the originating grid itself.
    pub fn from_parts(
        grid_shape: (usize, usize),
        transform: GeoTransform,
        node_positions: Vec<usize>,
        downstream: Vec<Option<usize>>,
        distance: Vec<f64>,
    ) -> Result<Self> {
        let n = node_positions.len();
        if n == 0 {
            return Err(Error::InvalidNetwork("network has no nodes".to_string()));
        }
        if downstream.len() != n || distance.len() != n {
            return Err(Error::InvalidNetwork(format!(
                "node arrays must be parallel: {} positions, {} links, {} distances",
                n,
                downstream.len(),
                distance.len()
            )));
        }

        let cells = grid_shape.0 * grid_shape.1;
        let mut seen = HashSet::with_capacity(n);
        for &pos in &node_positions {
            if pos >= cells {
                return Err(Error::InvalidNetwork(format!(
                    "node position {} is out of range for a grid of {} cells",
                    pos, cells
                )));
            }
            if !seen.insert(pos) {
                return Err(Error::InvalidNetwork(format!(
                    "node position {} appears more than once",
                    pos
                )));
            }
        }

        for (node, &link) in downstream.iter().enumerate() {
            if let Some(next) = link {
                if next >= n {
                    return Err(Error::InvalidNetwork(format!(
                        "downstream link {} -> {} points outside the node order",
                        node, next
                    )));
                }
                if next == node {
                    return Err(Error::InvalidNetwork(format!(
                        "node {} links to itself",
                        node
                    )));
                }
            }
        }

        for (node, &d) in distance.iter().enumerate() {
            if !d.is_finite() {
                return Err(Error::InvalidNetwork(format!(
                    "distance at node {} is not finite",
                    node
                )));
            }
            if let Some(next) = downstream[node] {
                if distance[next] > d {
                    return Err(Error::InvalidNetwork(format!(
                        "distance increases downstream at node {}: {} -> {}",
                        node, d, distance[next]
                    )));
                }
            }
        }

        // 0 = unvisited, 1 = on the current walk, 2 = finished
        let mut state = vec![0u8; n];
        for start in 0..n {
            if state[start] != 0 {
                continue;
            }
            let mut walk = Vec::new();
            let mut current = start;
            loop {
                if state[current] == 1 {
                    return Err(Error::InvalidNetwork(
                        "downstream links contain a cycle".to_string(),
                    ));
                }
                if state[current] == 2 {
                    break;
                }
                state[current] = 1;
                walk.push(current);
                match downstream[current] {
                    Some(next) => current = next,
                    None => break,
                }
            }
            for node in walk {
                state[node] = 2;
            }
        }

        Ok(Self {
            grid_shape,
            transform,
            node_positions,
            downstream,
            distance,
        })
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.node_positions.len()
    }

    /// Whether the network has no nodes. Always false for a validated network.
    pub fn is_empty(&self) -> bool {
        self.node_positions.is_empty()
    }

    /// Node positions in network order
    pub fn node_positions(&self) -> &[usize] {
        &self.node_positions
    }

    /// Cumulative distance from the outlet, parallel to the node order
    pub fn distance(&self) -> &[f64] {
        &self.distance
    }

    /// Transform of the originating grid
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Shape of the originating grid
    pub fn grid_shape(&self) -> (usize, usize) {
        self.grid_shape
    }

    /// Cell size inherited from the originating grid
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Downstream successor of a node, `None` at an outlet or for an
    /// out-of-range node index
    pub fn downstream(&self, node: usize) -> Option<usize> {
        self.downstream.get(node).copied().flatten()
    }

    /// Subscript of a node in the originating grid
    pub fn node_subscript(&self, node: usize) -> Option<(usize, usize)> {
        let cols = self.grid_shape.1;
        self.node_positions
            .get(node)
            .map(|&pos| (pos / cols, pos % cols))
    }

    /// World coordinate of a node's cell center
    pub fn node_coord(&self, node: usize) -> Option<(f64, f64)> {
        self.node_subscript(node)
            .map(|(row, col)| self.transform.cell_center(row, col))
    }

    /// Nodes without an upstream neighbor, in node order
    pub fn channel_heads(&self) -> Vec<usize> {
        let mut has_inflow = vec![false; self.len()];
        for &link in &self.downstream {
            if let Some(next) = link {
                has_inflow[next] = true;
            }
        }
        (0..self.len()).filter(|&node| !has_inflow[node]).collect()
    }

    /// Nodes without a downstream successor, in node order
    pub fn outlets(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&node| self.downstream[node].is_none())
            .collect()
    }

    fn subscript_of(&self, node: usize) -> (usize, usize) {
        let cols = self.grid_shape.1;
        let pos = self.node_positions[node];
        (pos / cols, pos % cols)
    }

    /// Flatten a single-head network into head-to-outlet ordered samples.
    ///
    /// The samples carry world coordinates, outlet distance, and the
    /// attribute row of each node, followed by one trailing sample that
    /// repeats the outlet and terminates the segment. Networks with more
    /// or fewer than one channel head fail with `UnsupportedTopology`.
    pub fn path_profile(&self, attrs: &NodeAttributeList) -> Result<PathProfile> {
        attrs.validate_for(self)?;

        let heads = self.channel_heads();
        if heads.len() != 1 {
            return Err(Error::UnsupportedTopology { heads: heads.len() });
        }

        let n = self.len();
        let mut order = Vec::with_capacity(n + 1);
        let mut current = heads[0];
        loop {
            order.push(current);
            match self.downstream[current] {
                Some(next) => current = next,
                None => break,
            }
        }
        // One head in an acyclic network with at most one successor per
        // node puts every node on this walk.
        debug_assert_eq!(order.len(), n);

        if let Some(&outlet) = order.last() {
            order.push(outlet);
        }

        let count = order.len();
        let columns = attrs.attribute_count();
        let attr_values = attrs.values();

        let mut x = Vec::with_capacity(count);
        let mut y = Vec::with_capacity(count);
        let mut distance = Vec::with_capacity(count);
        let mut values = Array2::zeros((count, columns));
        for (sample, &node) in order.iter().enumerate() {
            let (row, col) = self.subscript_of(node);
            let (cx, cy) = self.transform.cell_center(row, col);
            x.push(cx);
            y.push(cy);
            distance.push(self.distance[node]);
            for column in 0..columns {
                values[(sample, column)] = attr_values[(node, column)];
            }
        }

        Ok(PathProfile {
            x,
            y,
            distance,
            values,
        })
    }
}

/// A single-head network flattened to head-to-outlet ordered samples.
///
/// The final sample repeats the outlet as a segment terminator.
#[derive(Debug, Clone)]
pub struct PathProfile {
    /// World x of each sample's cell center
    pub x: Vec<f64>,
    /// World y of each sample's cell center
    pub y: Vec<f64>,
    /// Cumulative distance from the outlet at each sample
    pub distance: Vec<f64>,
    /// Attribute rows aligned to the samples, shape (samples, columns)
    pub values: Array2<f64>,
}

impl PathProfile {
    /// Number of samples, including the trailing outlet repeat
    pub fn len(&self) -> usize {
        self.distance.len()
    }

    /// Whether the profile has no samples
    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }
}
