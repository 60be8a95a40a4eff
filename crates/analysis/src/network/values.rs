//! Attribute queries against network nodes
//!
//! Reads per-node values out of an attribute list three ways: linearly
//! interpolated along a single head-to-outlet path by outlet distance,
//! snapped to the nearest node by world coordinate, or matched exactly
//! by linear grid position.

use crate::maybe_rayon::*;
use crate::network::{NodeAttributeList, NodeLocator, SnapResult, StreamNetwork};
use ndarray::Array2;
use std::collections::HashMap;
use thalweg_core::error::{Error, Result};
use thalweg_core::Algorithm;

/// How query slots address network nodes. One mode per call.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeQuery {
    /// Cumulative outlet distances, interpolated along a single path.
    /// The distances need not be sorted.
    ByDistance(Vec<f64>),
    /// World coordinates, snapped to the nearest node
    ByCoordinate(Vec<(f64, f64)>),
    /// Linear grid positions, matched exactly
    ByPosition(Vec<usize>),
}

impl Default for NodeQuery {
    fn default() -> Self {
        Self::ByPosition(Vec::new())
    }
}

impl NodeQuery {
    /// Number of query slots
    pub fn len(&self) -> usize {
        match self {
            Self::ByDistance(distances) => distances.len(),
            Self::ByCoordinate(coords) => coords.len(),
            Self::ByPosition(positions) => positions.len(),
        }
    }

    /// Whether the query has no slots
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parameters for node value queries
#[derive(Debug, Clone, Default)]
pub struct NodeValuesParams {
    /// Query selector. Defaults to an empty position query.
    pub query: NodeQuery,
}

/// Non-fatal condition reported by a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryDiagnostic {
    /// At least one coordinate query snapped to a node farther away than
    /// the tolerance. The result row is still the snapped node's row.
    SnapBeyondTolerance { worst_residual: f64, tolerance: f64 },
}

/// Result of a node value query
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// One row per query slot, one column per attribute
    pub values: Array2<f64>,
    /// Non-fatal conditions encountered while querying
    pub diagnostics: Vec<QueryDiagnostic>,
}

/// Node value query operation exposing the uniform algorithm surface
pub struct NodeValues;

impl Algorithm for NodeValues {
    type Input = (StreamNetwork, NodeAttributeList);
    type Output = QueryResult;
    type Params = NodeValuesParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "NodeValues"
    }

    fn description(&self) -> &'static str {
        "Read per-node attribute values by outlet distance, world coordinate, or grid position"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (network, attrs) = input;
        node_values(&network, &attrs, &params)
    }
}

/// Read attribute values for a list of query slots.
///
/// The attribute list must align with the network's node order. Each
/// query slot yields one output row; slots that address nothing yield
/// NaN rows. Only distance queries constrain the topology: they require
/// exactly one channel head.
///
/// # Arguments
/// * `network` - The network holding the queried nodes
/// * `attrs` - Attribute list aligned to the network
/// * `params` - Query selector
pub fn node_values(
    network: &StreamNetwork,
    attrs: &NodeAttributeList,
    params: &NodeValuesParams,
) -> Result<QueryResult> {
    attrs.validate_for(network)?;

    match &params.query {
        NodeQuery::ByDistance(distances) => by_distance(network, attrs, distances),
        NodeQuery::ByCoordinate(coords) => by_coordinate(network, attrs, coords),
        NodeQuery::ByPosition(positions) => by_position(network, attrs, positions),
    }
}

/// Interpolate attribute columns against outlet distance along the
/// network's single head-to-outlet path.
fn by_distance(
    network: &StreamNetwork,
    attrs: &NodeAttributeList,
    queries: &[f64],
) -> Result<QueryResult> {
    let profile = network.path_profile(attrs)?;

    // The trailing outlet repeat terminates the path; as a sample it
    // would form a zero-width segment, so it is dropped here.
    let samples = profile.len() - 1;
    let columns = profile.values.ncols();

    // Reorder ascending by distance: the profile runs head (max) to
    // outlet (0)
    let xs: Vec<f64> = (0..samples).rev().map(|i| profile.distance[i]).collect();
    let mut ys = Array2::zeros((samples, columns));
    for sample in 0..samples {
        let source = samples - 1 - sample;
        for column in 0..columns {
            ys[(sample, column)] = profile.values[(source, column)];
        }
    }

    let data: Vec<f64> = (0..queries.len())
        .into_par_iter()
        .flat_map(|i| interpolate_row(&xs, &ys, queries[i]))
        .collect();

    let values = Array2::from_shape_vec((queries.len(), columns), data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(QueryResult {
        values,
        diagnostics: Vec::new(),
    })
}

/// One output row for a distance query: piecewise-linear within the
/// sample domain, NaN outside it.
fn interpolate_row(xs: &[f64], ys: &Array2<f64>, q: f64) -> Vec<f64> {
    let columns = ys.ncols();
    let last = xs.len() - 1;

    // Also rejects NaN queries
    if !(q >= xs[0] && q <= xs[last]) {
        return vec![f64::NAN; columns];
    }

    // First sample strictly beyond q; q >= xs[0] puts hi in 1..=len
    let hi = xs.partition_point(|&x| x <= q);
    if hi == xs.len() {
        return ys.row(last).to_vec();
    }

    // xs[hi] > q >= xs[hi - 1], so the segment has positive width and
    // a query at a sample distance lands on t = 0 exactly
    let lo = hi - 1;
    let t = (q - xs[lo]) / (xs[hi] - xs[lo]);
    (0..columns)
        .map(|column| {
            let v0 = ys[(lo, column)];
            let v1 = ys[(hi, column)];
            v0 + t * (v1 - v0)
        })
        .collect()
}

/// Snap coordinate queries to the nearest node and read that node's row.
fn by_coordinate(
    network: &StreamNetwork,
    attrs: &NodeAttributeList,
    queries: &[(f64, f64)],
) -> Result<QueryResult> {
    let columns = attrs.attribute_count();
    let attr_values = attrs.values();
    let locator = NodeLocator::build(network);
    let rows_by_position = position_rows(network);
    let tolerance = (2.0 * network.cell_size()).sqrt() + f64::EPSILON;

    let snaps: Vec<Option<SnapResult>> = (0..queries.len())
        .into_par_iter()
        .map(|i| {
            let (x, y) = queries[i];
            if x.is_finite() && y.is_finite() {
                locator.nearest(x, y)
            } else {
                None
            }
        })
        .collect();

    let mut data = Vec::with_capacity(queries.len() * columns);
    let mut worst_residual = 0.0f64;
    for snap in &snaps {
        // The snapped node is looked up by its grid position, not by the
        // locator's internal ordering
        let node = snap
            .as_ref()
            .and_then(|s| rows_by_position.get(&s.node.position).copied());
        match node {
            Some(node) => {
                for column in 0..columns {
                    data.push(attr_values[(node, column)]);
                }
            }
            None => {
                for _ in 0..columns {
                    data.push(f64::NAN);
                }
            }
        }
        if let Some(snap) = snap {
            worst_residual = worst_residual.max(snap.residual());
        }
    }

    let values = Array2::from_shape_vec((queries.len(), columns), data)
        .map_err(|e| Error::Other(e.to_string()))?;

    let mut diagnostics = Vec::new();
    if worst_residual > tolerance {
        diagnostics.push(QueryDiagnostic::SnapBeyondTolerance {
            worst_residual,
            tolerance,
        });
    }

    Ok(QueryResult {
        values,
        diagnostics,
    })
}

/// Match position queries exactly against the node positions.
fn by_position(
    network: &StreamNetwork,
    attrs: &NodeAttributeList,
    queries: &[usize],
) -> Result<QueryResult> {
    let columns = attrs.attribute_count();
    let attr_values = attrs.values();
    let rows_by_position = position_rows(network);

    let data: Vec<f64> = (0..queries.len())
        .into_par_iter()
        .flat_map(|i| match rows_by_position.get(&queries[i]) {
            Some(&node) => attr_values.row(node).to_vec(),
            None => vec![f64::NAN; columns],
        })
        .collect();

    let values = Array2::from_shape_vec((queries.len(), columns), data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(QueryResult {
        values,
        diagnostics: Vec::new(),
    })
}

/// Map each node's grid position to its row in the node order.
fn position_rows(network: &StreamNetwork) -> HashMap<usize, usize> {
    network
        .node_positions()
        .iter()
        .enumerate()
        .map(|(node, &pos)| (pos, node))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use thalweg_core::{GeoTransform, Raster};

    fn base_grid() -> Raster<f64> {
        let mut grid: Raster<f64> = Raster::new(4, 4);
        grid.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        grid
    }

    /// Path up column 1: outlet (3,1)=13, then (2,1)=9, head (1,1)=5,
    /// with outlet distances 0, 5, 10 and attributes 100, 200, 300.
    fn path_fixture() -> (StreamNetwork, NodeAttributeList) {
        let grid = base_grid();
        let network = StreamNetwork::new(
            &grid,
            vec![13, 9, 5],
            vec![None, Some(0), Some(1)],
            vec![0.0, 5.0, 10.0],
        )
        .unwrap();
        let attrs = NodeAttributeList::from_column(vec![100.0, 200.0, 300.0], &network).unwrap();
        (network, attrs)
    }

    /// The same path with the node order permuted; attribute rows follow
    /// the new order.
    fn permuted_fixture() -> (StreamNetwork, NodeAttributeList) {
        let grid = base_grid();
        let network = StreamNetwork::new(
            &grid,
            vec![5, 13, 9],
            vec![Some(2), None, Some(1)],
            vec![10.0, 0.0, 5.0],
        )
        .unwrap();
        let attrs = NodeAttributeList::from_column(vec![300.0, 100.0, 200.0], &network).unwrap();
        (network, attrs)
    }

    fn query(
        network: &StreamNetwork,
        attrs: &NodeAttributeList,
        query: NodeQuery,
    ) -> Result<QueryResult> {
        node_values(network, attrs, &NodeValuesParams { query })
    }

    #[test]
    fn test_by_distance_worked_example() {
        let (network, attrs) = path_fixture();
        let result = query(&network, &attrs, NodeQuery::ByDistance(vec![7.5, 15.0])).unwrap();

        assert_eq!(result.values.dim(), (2, 1));
        assert_relative_eq!(result.values[(0, 0)], 250.0, epsilon = 1e-12);
        assert!(result.values[(1, 0)].is_nan(), "no extrapolation past the head");
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_by_distance_exact_at_samples() {
        let (network, attrs) = path_fixture();
        let result = query(
            &network,
            &attrs,
            NodeQuery::ByDistance(vec![0.0, 5.0, 10.0]),
        )
        .unwrap();

        assert_eq!(result.values[(0, 0)], 100.0);
        assert_eq!(result.values[(1, 0)], 200.0);
        assert_eq!(result.values[(2, 0)], 300.0);
    }

    #[test]
    fn test_by_distance_unsorted_queries() {
        let (network, attrs) = path_fixture();
        let result = query(
            &network,
            &attrs,
            NodeQuery::ByDistance(vec![10.0, 2.5, f64::NAN]),
        )
        .unwrap();

        assert_relative_eq!(result.values[(0, 0)], 300.0, epsilon = 1e-12);
        assert_relative_eq!(result.values[(1, 0)], 150.0, epsilon = 1e-12);
        assert!(result.values[(2, 0)].is_nan());
    }

    #[test]
    fn test_by_distance_interpolates_all_columns() {
        let (network, _) = path_fixture();
        let matrix = Array2::from_shape_vec(
            (3, 2),
            vec![100.0, 1.0, 200.0, 2.0, 300.0, 3.0],
        )
        .unwrap();
        let attrs = NodeAttributeList::from_matrix(matrix, &network).unwrap();

        let result = query(&network, &attrs, NodeQuery::ByDistance(vec![7.5])).unwrap();
        assert_eq!(result.values.dim(), (1, 2));
        assert_relative_eq!(result.values[(0, 0)], 250.0, epsilon = 1e-12);
        assert_relative_eq!(result.values[(0, 1)], 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_by_distance_rejects_multiple_heads() {
        let grid = base_grid();
        let network = StreamNetwork::new(
            &grid,
            vec![0, 2, 6, 10],
            vec![Some(2), Some(2), Some(3), None],
            vec![2.5, 2.5, 1.0, 0.0],
        )
        .unwrap();
        let attrs = NodeAttributeList::from_column(vec![1.0, 2.0, 3.0, 4.0], &network).unwrap();

        let err = query(&network, &attrs, NodeQuery::ByDistance(vec![1.0])).unwrap_err();
        assert!(matches!(err, Error::UnsupportedTopology { heads: 2 }));
    }

    #[test]
    fn test_by_position_worked_example() {
        let grid = base_grid();
        let network = StreamNetwork::new(
            &grid,
            vec![3, 7, 9],
            vec![Some(1), Some(2), None],
            vec![2.0, 1.0, 0.0],
        )
        .unwrap();
        let attrs = NodeAttributeList::from_column(vec![1.0, 2.0, 3.0], &network).unwrap();

        let result = query(&network, &attrs, NodeQuery::ByPosition(vec![7, 4])).unwrap();
        assert_eq!(result.values.dim(), (2, 1));
        assert_relative_eq!(result.values[(0, 0)], 2.0, epsilon = 1e-12);
        assert!(
            result.values[(1, 0)].is_nan(),
            "unmatched position yields NaN, not an error"
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_by_position_order_independent() {
        let (network, attrs) = path_fixture();
        let (permuted, permuted_attrs) = permuted_fixture();
        let slots = NodeQuery::ByPosition(vec![9, 5, 13, 2]);

        let a = query(&network, &attrs, slots.clone()).unwrap();
        let b = query(&permuted, &permuted_attrs, slots).unwrap();

        for i in 0..3 {
            assert_relative_eq!(a.values[(i, 0)], b.values[(i, 0)], epsilon = 1e-12);
        }
        assert_relative_eq!(a.values[(0, 0)], 200.0, epsilon = 1e-12);
        assert!(a.values[(3, 0)].is_nan());
        assert!(b.values[(3, 0)].is_nan());
    }

    #[test]
    fn test_by_coordinate_snaps_by_grid_position() {
        // Node order differs from the locator's spatial ordering; the
        // answer must still come from the node at the snapped position
        let (network, attrs) = permuted_fixture();

        // Near the cell center of position 9 = subscript (2, 1) = (1.5, 1.5)
        let result = query(
            &network,
            &attrs,
            NodeQuery::ByCoordinate(vec![(1.4, 1.6)]),
        )
        .unwrap();

        assert_relative_eq!(result.values[(0, 0)], 200.0, epsilon = 1e-12);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_by_coordinate_reports_worst_residual() {
        let (network, attrs) = path_fixture();

        // (1.5, 10.0) is 7.5 from the head cell center, past tolerance;
        // the nearer query must not mask the worst residual
        let result = query(
            &network,
            &attrs,
            NodeQuery::ByCoordinate(vec![(1.5, 2.4), (1.5, 10.0)]),
        )
        .unwrap();

        assert_relative_eq!(result.values[(0, 0)], 300.0, epsilon = 1e-12);
        assert_relative_eq!(result.values[(1, 0)], 300.0, epsilon = 1e-12);

        assert_eq!(result.diagnostics.len(), 1);
        match result.diagnostics[0] {
            QueryDiagnostic::SnapBeyondTolerance {
                worst_residual,
                tolerance,
            } => {
                assert_relative_eq!(worst_residual, 7.5, epsilon = 1e-9);
                assert_relative_eq!(tolerance, 2.0_f64.sqrt(), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_by_coordinate_nonfinite_query_yields_nan() {
        let (network, attrs) = path_fixture();
        let result = query(
            &network,
            &attrs,
            NodeQuery::ByCoordinate(vec![(f64::NAN, 1.5), (1.5, 1.5)]),
        )
        .unwrap();

        assert!(result.values[(0, 0)].is_nan());
        assert_relative_eq!(result.values[(1, 0)], 200.0, epsilon = 1e-12);
    }

    #[test]
    fn test_misaligned_attrs_rejected() {
        let (network, _) = path_fixture();
        let grid = base_grid();
        let smaller = StreamNetwork::new(
            &grid,
            vec![13, 9],
            vec![None, Some(0)],
            vec![0.0, 5.0],
        )
        .unwrap();
        let attrs = NodeAttributeList::from_column(vec![1.0, 2.0], &smaller).unwrap();

        let err = query(&network, &attrs, NodeQuery::ByPosition(vec![13])).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidAttributeList {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_algorithm_surface() {
        let (network, attrs) = path_fixture();
        let algorithm = NodeValues;
        assert_eq!(algorithm.name(), "NodeValues");
        assert!(NodeValuesParams::default().query.is_empty());

        // Default params: empty position query
        let result = algorithm.execute_default((network, attrs)).unwrap();
        assert_eq!(result.values.dim(), (0, 1));
        assert!(result.diagnostics.is_empty());
    }
}
