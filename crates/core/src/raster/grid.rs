//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterValue};
use ndarray::Array2;

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a row-major 2D grid with an
/// affine [`GeoTransform`] and an optional nodata marker. Grids are value
/// objects: operations that derive a new grid (cropping, filling) return a
/// fresh instance and never mutate their input.
///
/// Three addressing schemes are supported and kept consistent:
/// - subscripts `(row, col)`,
/// - linear positions `row * cols + col` (row-major, matching storage),
/// - world coordinates through the transform.
///
/// # Example
///
/// ```ignore
/// use thalweg_core::Raster;
///
/// let mut grid: Raster<f64> = Raster::new(100, 100);
/// grid.set(10, 20, 42.0)?;
/// let value = grid.get(10, 20)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterValue> {
    /// Cell values stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterValue> Raster<T> {
    /// Allocate a zeroed raster with an identity transform and no nodata
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Allocate a raster with every cell set to `value`
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Wrap row-major cell data, checking its length against the shape
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions { rows, cols });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Wrap an existing array with default georeferencing
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Zeroed raster of another cell type carrying over this grid's transform
    pub fn with_same_meta<U: RasterValue>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            nodata: None,
        }
    }

    /// Same shape, transform and nodata marker, every cell set to `fill_value`
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            nodata: self.nodata,
        }
    }

    // Shape

    /// Row count
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Column count
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Shape as a (rows, cols) pair
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Cell count, rows times cols
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Cell access

    fn out_of_bounds(&self, row: usize, col: usize) -> Error {
        Error::IndexOutOfBounds {
            row,
            col,
            rows: self.rows(),
            cols: self.cols(),
        }
    }

    /// Bounds-checked read of the cell at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or_else(|| self.out_of_bounds(row, col))
    }

    /// Read the cell at (row, col) without bounds checking
    ///
    /// # Safety
    /// The subscript must lie inside the grid.
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Bounds-checked write of the cell at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(self.out_of_bounds(row, col));
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Write the cell at (row, col) without bounds checking
    ///
    /// # Safety
    /// The subscript must lie inside the grid.
    pub unsafe fn set_unchecked(&mut self, row: usize, col: usize, value: T) {
        unsafe {
            *self.data.uget_mut((row, col)) = value;
        }
    }

    /// Borrow the backing array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Mutably borrow the backing array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    /// Unwrap into the backing array, discarding georeferencing
    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    // Georeferencing

    /// The affine transform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Replace the affine transform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// The nodata marker, if one is set
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Replace the nodata marker
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Edge length of a cell in world units (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    // Linear positions
    //
    // A linear position indexes the grid in row-major order, matching the
    // storage layout: position = row * cols + col.

    /// Convert a subscript to a linear position. `None` if out of bounds.
    pub fn subscript_to_position(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.rows() && col < self.cols() {
            Some(row * self.cols() + col)
        } else {
            None
        }
    }

    /// Convert a linear position to a subscript. `None` if out of bounds.
    pub fn position_to_subscript(&self, position: usize) -> Option<(usize, usize)> {
        if position < self.len() && self.cols() > 0 {
            Some((position / self.cols(), position % self.cols()))
        } else {
            None
        }
    }

    // Coordinate conversion

    /// World coordinate of the center of cell `(row, col)`.
    ///
    /// Pure function of the transform; the subscript is not bounds-checked.
    pub fn subscript_to_coord(&self, row: usize, col: usize) -> (f64, f64) {
        self.transform.cell_center(row, col)
    }

    /// World coordinate of the center of the cell at a linear position
    pub fn position_to_coord(&self, position: usize) -> Option<(f64, f64)> {
        self.position_to_subscript(position)
            .map(|(row, col)| self.subscript_to_coord(row, col))
    }

    /// Subscript of the cell whose center is nearest to a world coordinate.
    ///
    /// Inverse transform, then rounding to the nearest cell center. Returns
    /// `None` (the not-a-position sentinel) when the rounded subscript falls
    /// outside the grid, including for non-finite coordinates; callers must
    /// check. A coordinate exactly on the outer grid boundary ties away from
    /// the grid and resolves to `None`.
    pub fn coord_to_subscript(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (row_f, col_f) = self.transform.world_to_fractional(x, y);
        if !row_f.is_finite() || !col_f.is_finite() {
            return None;
        }

        let row = (row_f - 0.5).round();
        let col = (col_f - 0.5).round();

        if row < 0.0 || col < 0.0 || row >= self.rows() as f64 || col >= self.cols() as f64 {
            None
        } else {
            Some((row as usize, col as usize))
        }
    }

    /// Linear position of the cell whose center is nearest to a world
    /// coordinate. Same sentinel contract as [`coord_to_subscript`].
    ///
    /// [`coord_to_subscript`]: Raster::coord_to_subscript
    pub fn coord_to_position(&self, x: f64, y: f64) -> Option<usize> {
        self.coord_to_subscript(x, y)
            .and_then(|(row, col)| self.subscript_to_position(row, col))
    }

    /// Range of cell-center coordinates as `((min_x, max_x), (min_y, max_y))`.
    ///
    /// This is the domain coordinate selectors are clamped to: any clamped
    /// finite coordinate resolves to a valid cell.
    pub fn coordinate_range(&self) -> ((f64, f64), (f64, f64)) {
        let (rows, cols) = self.shape();
        let last_row = rows.saturating_sub(1);
        let last_col = cols.saturating_sub(1);

        let corners = [
            self.subscript_to_coord(0, 0),
            self.subscript_to_coord(0, last_col),
            self.subscript_to_coord(last_row, 0),
            self.subscript_to_coord(last_row, last_col),
        ];

        let mut min_x = f64::MAX;
        let mut max_x = f64::MIN;
        let mut min_y = f64::MAX;
        let mut max_y = f64::MIN;
        for (x, y) in corners {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        ((min_x, max_x), (min_y, max_y))
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y) of the full cell area
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let (rows, cols) = self.shape();
        let corners = [
            self.transform.fractional_to_world(0.0, 0.0),
            self.transform.fractional_to_world(0.0, cols as f64),
            self.transform.fractional_to_world(rows as f64, 0.0),
            self.transform.fractional_to_world(rows as f64, cols as f64),
        ];

        let mut min_x = f64::MAX;
        let mut max_x = f64::MIN;
        let mut min_y = f64::MAX;
        let mut max_y = f64::MIN;
        for (x, y) in corners {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        (min_x, min_y, max_x, max_y)
    }

    // Missing values

    /// Whether a value counts as missing for this grid
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Whether the cell at (row, col) holds a missing value
    pub fn is_nodata_at(&self, row: usize, col: usize) -> Result<bool> {
        let value = self.get(row, col)?;
        Ok(self.is_nodata(value))
    }

    // Statistics

    /// Summarize the valid cells: min, max, mean and counts
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum = 0.0_f64;
        let mut valid = 0_usize;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            min = Some(match min {
                Some(m) if m < value => m,
                _ => value,
            });
            max = Some(match max {
                Some(m) if m > value => m,
                _ => value,
            });

            if let Some(v) = value.to_f64() {
                sum += v;
                valid += 1;
            }
        }

        let mean = if valid > 0 {
            Some(sum / valid as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: valid,
            nodata_count: self.len() - valid,
        }
    }
}

/// Summary of the valid cells of a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    /// Smallest valid value, `None` for an all-nodata grid
    pub min: Option<T>,
    /// Largest valid value, `None` for an all-nodata grid
    pub max: Option<T>,
    /// Mean of the valid values
    pub mean: Option<f64>,
    /// Cells holding a usable value
    pub valid_count: usize,
    /// Cells holding the nodata marker (or NaN for float grids)
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_raster_shape_and_zero_fill() {
        let raster: Raster<f32> = Raster::new(48, 75);
        assert_eq!(raster.rows(), 48);
        assert_eq!(raster.cols(), 75);
        assert_eq!(raster.shape(), (48, 75));
        assert_eq!(raster.len(), 3600);
        assert!(!raster.is_empty());
        assert_eq!(raster.get(47, 74).unwrap(), 0.0);
    }

    #[test]
    fn test_get_set_bounds_checked() {
        let mut raster: Raster<f32> = Raster::new(6, 9);
        raster.set(2, 7, -3.5).unwrap();
        assert_eq!(raster.get(2, 7).unwrap(), -3.5);

        assert!(matches!(
            raster.get(6, 0),
            Err(Error::IndexOutOfBounds { row: 6, col: 0, rows: 6, cols: 9 })
        ));
        assert!(raster.set(0, 9, 1.0).is_err());
    }

    #[test]
    fn test_from_vec_roundtrips_through_array() {
        let raster = Raster::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3).unwrap();
        assert_eq!(raster.get(0, 2).unwrap(), 3.0);
        assert_eq!(raster.get(1, 0).unwrap(), 4.0);

        let array = raster.into_array();
        assert_eq!(array.dim(), (2, 3));
        assert_eq!(array[(1, 2)], 6.0);

        let err = Raster::from_vec(vec![1.0, 2.0], 2, 3).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { rows: 2, cols: 3 }));
    }

    #[test]
    fn test_bounds_extend_half_a_cell_past_centers() {
        let mut raster: Raster<f64> = Raster::new(3, 4);
        raster.set_transform(GeoTransform::new(10.0, 20.0, 2.0, -2.0));

        let (min_x, min_y, max_x, max_y) = raster.bounds();
        assert_relative_eq!(min_x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(max_x, 18.0, epsilon = 1e-12);
        assert_relative_eq!(min_y, 14.0, epsilon = 1e-12);
        assert_relative_eq!(max_y, 20.0, epsilon = 1e-12);

        let ((cmin_x, cmax_x), (cmin_y, cmax_y)) = raster.coordinate_range();
        assert_relative_eq!(cmin_x - min_x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(max_x - cmax_x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(cmin_y - min_y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(max_y - cmax_y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_linear_positions_row_major() {
        let raster: Raster<f64> = Raster::new(4, 5);

        assert_eq!(raster.subscript_to_position(0, 0), Some(0));
        assert_eq!(raster.subscript_to_position(1, 2), Some(7));
        assert_eq!(raster.subscript_to_position(3, 4), Some(19));
        assert_eq!(raster.subscript_to_position(4, 0), None);

        assert_eq!(raster.position_to_subscript(7), Some((1, 2)));
        assert_eq!(raster.position_to_subscript(19), Some((3, 4)));
        assert_eq!(raster.position_to_subscript(20), None);
    }

    #[test]
    fn test_coordinate_roundtrip_all_subscripts() {
        let mut raster: Raster<f64> = Raster::new(6, 9);
        raster.set_transform(GeoTransform::new(250.0, 1200.0, 25.0, -25.0));

        for row in 0..6 {
            for col in 0..9 {
                let (x, y) = raster.subscript_to_coord(row, col);
                assert_eq!(
                    raster.coord_to_subscript(x, y),
                    Some((row, col)),
                    "roundtrip failed at ({}, {})",
                    row,
                    col
                );
                let pos = raster.subscript_to_position(row, col).unwrap();
                assert_eq!(raster.coord_to_position(x, y), Some(pos));

                let (px, py) = raster.position_to_coord(pos).unwrap();
                assert_relative_eq!(px, x, epsilon = 1e-12);
                assert_relative_eq!(py, y, epsilon = 1e-12);
            }
        }
        assert_eq!(raster.position_to_coord(raster.len()), None);
    }

    #[test]
    fn test_coord_outside_grid_is_none() {
        let mut raster: Raster<f64> = Raster::new(4, 4);
        raster.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));

        // Well outside
        assert_eq!(raster.coord_to_position(-3.0, 2.0), None);
        assert_eq!(raster.coord_to_position(2.0, 9.0), None);
        // Non-finite
        assert_eq!(raster.coord_to_position(f64::NAN, 2.0), None);
        assert_eq!(raster.coord_to_position(2.0, f64::INFINITY), None);
        // Just inside the first cell
        assert_eq!(raster.coord_to_position(0.4, 3.6), Some(0));
    }

    #[test]
    fn test_coordinate_range_covers_centers() {
        let mut raster: Raster<f64> = Raster::new(3, 4);
        raster.set_transform(GeoTransform::new(10.0, 20.0, 2.0, -2.0));

        let ((min_x, max_x), (min_y, max_y)) = raster.coordinate_range();
        assert_relative_eq!(min_x, 11.0, epsilon = 1e-12);
        assert_relative_eq!(max_x, 17.0, epsilon = 1e-12);
        assert_relative_eq!(min_y, 15.0, epsilon = 1e-12);
        assert_relative_eq!(max_y, 19.0, epsilon = 1e-12);

        // The extremes resolve to the corner cells
        assert_eq!(raster.coord_to_subscript(min_x, max_y), Some((0, 0)));
        assert_eq!(raster.coord_to_subscript(max_x, min_y), Some((2, 3)));
    }

    #[test]
    fn test_statistics_over_a_ramp() {
        let mut raster: Raster<f32> = Raster::new(6, 8);
        for row in 0..6 {
            for col in 0..8 {
                raster.set(row, col, 10.0 + (row * 8 + col) as f32).unwrap();
            }
        }

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(10.0));
        assert_eq!(stats.max, Some(57.0));
        assert_eq!(stats.valid_count, 48);
        assert_eq!(stats.nodata_count, 0);
        assert_relative_eq!(stats.mean.unwrap(), 33.5, epsilon = 1e-6);
    }

    #[test]
    fn test_statistics_skips_nodata() {
        let mut raster: Raster<f64> = Raster::new(2, 2);
        raster.set(0, 0, 1.0).unwrap();
        raster.set(0, 1, f64::NAN).unwrap();
        raster.set(1, 0, 3.0).unwrap();
        raster.set(1, 1, 5.0).unwrap();

        let stats = raster.statistics();
        assert_eq!(stats.valid_count, 3);
        assert_eq!(stats.nodata_count, 1);
        assert_relative_eq!(stats.mean.unwrap(), 3.0, epsilon = 1e-12);

        assert!(raster.is_nodata_at(0, 1).unwrap());
        assert!(!raster.is_nodata_at(1, 0).unwrap());
        assert!(raster.is_nodata_at(5, 0).is_err());
    }
}
