//! Selection forms accepted by `crop`
//!
//! Every form is normalized to a canonical set of row-major linear
//! positions before the shared bounding-box step, so the box computation
//! exists exactly once.

use crate::maybe_rayon::*;
use ndarray::Array2;
use thalweg_core::error::{Error, Result};
use thalweg_core::raster::{Raster, RasterValue};

/// Cells to keep when cropping a grid.
///
/// Variants differ in how the caller names the cells; all of them resolve
/// to linear positions into the input grid.
#[derive(Debug, Clone)]
pub enum Selection {
    /// All cells holding valid (non-missing) data. The default.
    NonMissing,
    /// Boolean mask aligned with the input grid; `true` = selected.
    Mask(Array2<bool>),
    /// Mask supplied as a grid aligned with the input; nonzero = selected.
    MaskGrid(Raster<u8>),
    /// Explicit row-major linear positions into the input grid.
    Positions(Vec<usize>),
    /// Axis-aligned coordinate extent; its four corners select cells.
    /// Bounds may be given in either order and are clamped to the grid.
    Extent { x: (f64, f64), y: (f64, f64) },
    /// Paired coordinate lists; each (x, y) selects the cell it falls in
    /// after clamping to the grid's coordinate range.
    Coordinates { xs: Vec<f64>, ys: Vec<f64> },
}

impl Default for Selection {
    fn default() -> Self {
        Self::NonMissing
    }
}

/// A selection normalized against a concrete grid.
#[derive(Debug)]
pub(crate) struct Resolved {
    /// Row-major linear positions of the selected cells
    pub positions: Vec<usize>,
    /// Full-shape mask for the mask-shaped variants; drives fill substitution
    pub mask: Option<Array2<bool>>,
}

impl Selection {
    /// Normalize this selection to linear positions into `grid`.
    pub(crate) fn resolve<T: RasterValue>(&self, grid: &Raster<T>) -> Result<Resolved> {
        match self {
            Selection::NonMissing => resolve_non_missing(grid),
            Selection::Mask(mask) => resolve_mask(grid, mask),
            Selection::MaskGrid(mask_grid) => {
                let (rows, cols) = grid.shape();
                if mask_grid.shape() != (rows, cols) {
                    return Err(size_mismatch(grid, mask_grid.shape()));
                }
                let mask = Array2::from_shape_fn((rows, cols), |(row, col)| {
                    let value = unsafe { mask_grid.get_unchecked(row, col) };
                    !mask_grid.is_nodata(value) && value != 0
                });
                resolve_mask(grid, &mask)
            }
            Selection::Positions(positions) => resolve_positions(grid, positions),
            Selection::Extent { x, y } => resolve_extent(grid, *x, *y),
            Selection::Coordinates { xs, ys } => resolve_coordinates(grid, xs, ys),
        }
    }
}

fn size_mismatch<T: RasterValue>(grid: &Raster<T>, actual: (usize, usize)) -> Error {
    let (expected_rows, expected_cols) = grid.shape();
    Error::SizeMismatch {
        expected_rows,
        expected_cols,
        actual_rows: actual.0,
        actual_cols: actual.1,
    }
}

fn too_few(found: usize) -> Error {
    Error::InvalidSelection(format!(
        "selection must contain at least 2 cells, found {}",
        found
    ))
}

fn resolve_non_missing<T: RasterValue>(grid: &Raster<T>) -> Result<Resolved> {
    let (rows, cols) = grid.shape();

    let positions: Vec<usize> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_positions = Vec::new();
            for col in 0..cols {
                let value = unsafe { grid.get_unchecked(row, col) };
                if !grid.is_nodata(value) {
                    row_positions.push(row * cols + col);
                }
            }
            row_positions
        })
        .collect();

    if positions.len() < 2 {
        return Err(too_few(positions.len()));
    }

    Ok(Resolved {
        positions,
        mask: None,
    })
}

fn resolve_mask<T: RasterValue>(grid: &Raster<T>, mask: &Array2<bool>) -> Result<Resolved> {
    let (rows, cols) = grid.shape();
    if mask.dim() != (rows, cols) {
        return Err(size_mismatch(grid, mask.dim()));
    }

    let positions: Vec<usize> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_positions = Vec::new();
            for col in 0..cols {
                if mask[(row, col)] {
                    row_positions.push(row * cols + col);
                }
            }
            row_positions
        })
        .collect();

    if positions.len() < 2 {
        return Err(too_few(positions.len()));
    }

    Ok(Resolved {
        positions,
        mask: Some(mask.clone()),
    })
}

fn resolve_positions<T: RasterValue>(grid: &Raster<T>, positions: &[usize]) -> Result<Resolved> {
    if positions.len() < 2 {
        return Err(too_few(positions.len()));
    }

    let len = grid.len();
    for &pos in positions {
        if pos >= len {
            return Err(Error::InvalidSelection(format!(
                "position {} is out of range for a grid of {} cells",
                pos, len
            )));
        }
    }

    Ok(Resolved {
        positions: positions.to_vec(),
        mask: None,
    })
}

fn resolve_extent<T: RasterValue>(
    grid: &Raster<T>,
    x: (f64, f64),
    y: (f64, f64),
) -> Result<Resolved> {
    for v in [x.0, x.1, y.0, y.1] {
        if !v.is_finite() {
            return Err(Error::InvalidSelection(format!(
                "extent bounds must be finite, got x: {:?}, y: {:?}",
                x, y
            )));
        }
    }

    let (x_lo, x_hi) = (x.0.min(x.1), x.0.max(x.1));
    let (y_lo, y_hi) = (y.0.min(y.1), y.0.max(y.1));

    let corner_xs = [x_lo, x_lo, x_hi, x_hi];
    let corner_ys = [y_lo, y_hi, y_lo, y_hi];
    resolve_coordinates(grid, &corner_xs, &corner_ys)
}

fn resolve_coordinates<T: RasterValue>(
    grid: &Raster<T>,
    xs: &[f64],
    ys: &[f64],
) -> Result<Resolved> {
    if xs.len() != ys.len() {
        return Err(Error::InvalidSelection(format!(
            "coordinate lists differ in length: {} x values, {} y values",
            xs.len(),
            ys.len()
        )));
    }
    if xs.is_empty() {
        return Err(Error::InvalidSelection(
            "no coordinates supplied".to_string(),
        ));
    }

    let ((x_min, x_max), (y_min, y_max)) = grid.coordinate_range();
    if !(x_min <= x_max && y_min <= y_max) {
        return Err(Error::InvalidSelection(
            "grid coordinate range is not finite".to_string(),
        ));
    }

    let mut positions = Vec::with_capacity(xs.len());
    for (&x, &y) in xs.iter().zip(ys) {
        let cx = x.clamp(x_min, x_max);
        let cy = y.clamp(y_min, y_max);
        match grid.coord_to_position(cx, cy) {
            Some(pos) => positions.push(pos),
            None => {
                return Err(Error::InvalidSelection(format!(
                    "coordinate ({}, {}) cannot be resolved to a grid cell",
                    x, y
                )))
            }
        }
    }

    Ok(Resolved {
        positions,
        mask: None,
    })
}
