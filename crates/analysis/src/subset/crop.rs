//! Crop a grid to the bounding box of a selection
//!
//! The selection is normalized to linear positions (see `Selection`), the
//! minimum axis-aligned bounding rectangle of those positions is computed,
//! and a new grid restricted to that rectangle is returned. The output
//! transform is re-derived from the input transform so every surviving
//! cell keeps its original world coordinate.

use crate::maybe_rayon::*;
use crate::subset::Selection;
use ndarray::Array2;
use thalweg_core::error::{Error, Result};
use thalweg_core::raster::{Raster, RasterValue};
use thalweg_core::Algorithm;

/// Parameters for grid cropping
#[derive(Debug, Clone, Default)]
pub struct CropParams {
    /// Cells to keep. Defaults to all non-missing cells.
    pub selection: Selection,
    /// Value substituted at unselected cells of the input before cropping.
    /// Applies to the mask selection forms only.
    pub fill: Option<f64>,
    /// Also return the selection mask, cropped to the same box.
    pub return_mask: bool,
}

/// Non-fatal condition reported by a crop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropDiagnostic {
    /// The requested fill marker is not representable in the grid's storage
    /// type; `substituted` was written instead.
    FillFallback { requested: f64, substituted: f64 },
}

/// Result of a crop
#[derive(Debug, Clone)]
pub struct CropResult<T: RasterValue> {
    /// The cropped grid
    pub grid: Raster<T>,
    /// Selection mask over the cropped box (1 = selected). `None` unless requested.
    pub mask: Option<Raster<u8>>,
    /// Non-fatal conditions encountered while cropping
    pub diagnostics: Vec<CropDiagnostic>,
}

/// Crop operation exposing the uniform algorithm surface
pub struct Crop;

impl Algorithm for Crop {
    type Input = Raster<f64>;
    type Output = CropResult<f64>;
    type Params = CropParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Crop"
    }

    fn description(&self) -> &'static str {
        "Crop a grid to the bounding box of a selection, re-deriving the georeferencing"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        crop(&input, &params)
    }
}

/// Crop a grid to the minimum bounding rectangle of a selection.
///
/// The selection is resolved to linear positions first; see [`Selection`]
/// for the accepted forms and their validation rules. With the default
/// selection and a grid holding no missing values the crop is a no-op
/// copy. The output keeps the input's nodata marker, and its transform
/// origin is the world coordinate of the box's upper-left cell corner in
/// the input grid.
///
/// # Arguments
/// * `grid` - Input grid
/// * `params` - Selection, optional fill value, optional mask output
///
/// # Returns
/// [`CropResult`] with the cropped grid, the optional cropped selection
/// mask, and any non-fatal diagnostics.
pub fn crop<T: RasterValue>(grid: &Raster<T>, params: &CropParams) -> Result<CropResult<T>> {
    let (rows, cols) = grid.shape();
    let resolved = params.selection.resolve(grid)?;
    let positions = resolved.positions;
    let selection_mask = resolved.mask;

    // Full grid selected with the default selector: nothing to crop
    if matches!(params.selection, Selection::NonMissing) && positions.len() == grid.len() {
        let mask = if params.return_mask {
            let mut mask_grid = grid.with_same_meta::<u8>(rows, cols);
            mask_grid.data_mut().fill(1);
            Some(mask_grid)
        } else {
            None
        };
        return Ok(CropResult {
            grid: grid.clone(),
            mask,
            diagnostics: Vec::new(),
        });
    }

    let mut diagnostics = Vec::new();

    // Substitute the fill value at unselected cells before extracting
    let filled = match (params.fill, &selection_mask) {
        (Some(fill), Some(mask)) => {
            let (filled, diagnostic) = fill_unselected(grid, mask, fill)?;
            diagnostics.extend(diagnostic);
            Some(filled)
        }
        _ => None,
    };
    let source = filled.as_ref().unwrap_or(grid);

    // Minimum bounding rectangle of the selected positions. Every resolved
    // position is in range, and at least one exists, so cols > 0 here.
    let mut row_min = usize::MAX;
    let mut row_max = 0;
    let mut col_min = usize::MAX;
    let mut col_max = 0;
    for &pos in &positions {
        let (row, col) = (pos / cols, pos % cols);
        row_min = row_min.min(row);
        row_max = row_max.max(row);
        col_min = col_min.min(col);
        col_max = col_max.max(col);
    }

    let out_rows = row_max - row_min + 1;
    let out_cols = col_max - col_min + 1;

    let output_data: Vec<T> = (0..out_rows)
        .into_par_iter()
        .flat_map(|r| {
            let mut row_data = Vec::with_capacity(out_cols);
            for c in 0..out_cols {
                row_data.push(unsafe { source.get_unchecked(row_min + r, col_min + c) });
            }
            row_data
        })
        .collect();

    let sub_transform = grid.transform().for_subgrid(row_min, col_min);

    let mut output = Raster::from_array(
        Array2::from_shape_vec((out_rows, out_cols), output_data)
            .map_err(|e| Error::Other(e.to_string()))?,
    );
    output.set_transform(sub_transform);
    output.set_nodata(grid.nodata());

    let mask = if params.return_mask {
        let flags = match selection_mask {
            Some(mask) => mask,
            None => {
                let mut flags = Array2::from_elem((rows, cols), false);
                for &pos in &positions {
                    flags[(pos / cols, pos % cols)] = true;
                }
                flags
            }
        };

        let mut mask_data = Array2::<u8>::zeros((out_rows, out_cols));
        for r in 0..out_rows {
            for c in 0..out_cols {
                if flags[(row_min + r, col_min + c)] {
                    mask_data[(r, c)] = 1;
                }
            }
        }

        let mut mask_grid = Raster::from_array(mask_data);
        mask_grid.set_transform(sub_transform);
        Some(mask_grid)
    } else {
        None
    };

    Ok(CropResult {
        grid: output,
        mask,
        diagnostics,
    })
}

/// Substitute a fill value at every cell where the mask is false.
///
/// Returns a new grid; the input is untouched. A fill marker the storage
/// type cannot represent (NaN into an integer grid, or out of range)
/// substitutes zero and reports a [`CropDiagnostic::FillFallback`].
pub fn fill_unselected<T: RasterValue>(
    grid: &Raster<T>,
    mask: &Array2<bool>,
    fill: f64,
) -> Result<(Raster<T>, Option<CropDiagnostic>)> {
    let (rows, cols) = grid.shape();
    if mask.dim() != (rows, cols) {
        return Err(Error::SizeMismatch {
            expected_rows: rows,
            expected_cols: cols,
            actual_rows: mask.nrows(),
            actual_cols: mask.ncols(),
        });
    }

    let mut diagnostic = None;
    let fill_value = match T::from_f64(fill) {
        Some(value) => value,
        None => {
            diagnostic = Some(CropDiagnostic::FillFallback {
                requested: fill,
                substituted: 0.0,
            });
            T::zero()
        }
    };

    let data: Vec<T> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                let value = if mask[(row, col)] {
                    unsafe { grid.get_unchecked(row, col) }
                } else {
                    fill_value
                };
                row_data.push(value);
            }
            row_data
        })
        .collect();

    let mut output = grid.with_same_meta::<T>(rows, cols);
    output.set_nodata(grid.nodata());
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok((output, diagnostic))
}
