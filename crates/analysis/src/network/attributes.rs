//! Node attribute lists
//!
//! A value matrix aligned 1:1, by row, with a network's node ordering.
//! This is an alignment contract, not a storage engine: lists are built
//! against a network and validated against it again at query time.

use crate::network::StreamNetwork;
use ndarray::Array2;
use thalweg_core::error::{Error, Result};
use thalweg_core::raster::{Raster, RasterValue};

/// Per-node values aligned to a network's node order.
///
/// Row `i` of the matrix belongs to node `i` of the network the list was
/// built against. Lists are never resized independently of their network.
#[derive(Debug, Clone)]
pub struct NodeAttributeList {
    values: Array2<f64>,
}

impl NodeAttributeList {
    /// Wrap a single attribute column.
    pub fn from_column(values: Vec<f64>, network: &StreamNetwork) -> Result<Self> {
        if values.len() != network.len() {
            return Err(Error::InvalidAttributeList {
                expected: network.len(),
                actual: values.len(),
            });
        }
        let rows = values.len();
        let values = Array2::from_shape_vec((rows, 1), values)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self { values })
    }

    /// Wrap an (N, M) attribute matrix.
    pub fn from_matrix(values: Array2<f64>, network: &StreamNetwork) -> Result<Self> {
        if values.nrows() != network.len() {
            return Err(Error::InvalidAttributeList {
                expected: network.len(),
                actual: values.nrows(),
            });
        }
        Ok(Self { values })
    }

    /// Extract one attribute column from a grid, aligned to the network.
    ///
    /// The grid must share the originating grid's shape. Missing cells
    /// extract as NaN.
    pub fn from_grid<T: RasterValue>(grid: &Raster<T>, network: &StreamNetwork) -> Result<Self> {
        Self::from_column(extract_column(grid, network)?, network)
    }

    /// Extract one column per grid into an (N, M) matrix in a single
    /// aligned step, column order following the slice order.
    pub fn from_grids<T: RasterValue>(
        grids: &[&Raster<T>],
        network: &StreamNetwork,
    ) -> Result<Self> {
        let mut values = Array2::zeros((network.len(), grids.len()));
        for (column, grid) in grids.iter().enumerate() {
            let extracted = extract_column(grid, network)?;
            for (node, value) in extracted.into_iter().enumerate() {
                values[(node, column)] = value;
            }
        }
        Ok(Self { values })
    }

    /// Number of node rows
    pub fn node_count(&self) -> usize {
        self.values.nrows()
    }

    /// Number of attribute columns
    pub fn attribute_count(&self) -> usize {
        self.values.ncols()
    }

    /// The (N, M) value matrix
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Check that this list is aligned with a network's node order.
    pub fn validate_for(&self, network: &StreamNetwork) -> Result<()> {
        if self.node_count() != network.len() {
            return Err(Error::InvalidAttributeList {
                expected: network.len(),
                actual: self.node_count(),
            });
        }
        Ok(())
    }
}

/// Read the grid value under every node, in node order. The shared
/// extraction step behind `from_grid` and `from_grids`.
fn extract_column<T: RasterValue>(grid: &Raster<T>, network: &StreamNetwork) -> Result<Vec<f64>> {
    let (rows, cols) = network.grid_shape();
    if grid.shape() != (rows, cols) {
        return Err(Error::SizeMismatch {
            expected_rows: rows,
            expected_cols: cols,
            actual_rows: grid.rows(),
            actual_cols: grid.cols(),
        });
    }

    Ok(network
        .node_positions()
        .iter()
        .map(|&pos| {
            let (row, col) = (pos / cols, pos % cols);
            let value = unsafe { grid.get_unchecked(row, col) };
            if grid.is_nodata(value) {
                f64::NAN
            } else {
                value.to_f64().unwrap_or(f64::NAN)
            }
        })
        .collect())
}
