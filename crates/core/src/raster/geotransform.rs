//! Affine georeferencing for raster grids

use serde::{Deserialize, Serialize};

/// Affine transform tying array subscripts to world coordinates.
///
/// Continuous (fractional) subscripts map to world coordinates as:
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
/// `(origin_x, origin_y)` is the world coordinate of the corner of cell
/// `(0, 0)`. For north-up grids the rotation terms are 0 and `pixel_height`
/// is negative. The operations in this crate assume axis-aligned transforms;
/// the rotation terms are carried so externally built transforms survive a
/// round trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the corner of cell (0, 0)
    pub origin_x: f64,
    /// Y coordinate of the corner of cell (0, 0)
    pub origin_y: f64,
    /// Cell size in the X direction
    pub pixel_width: f64,
    /// Cell size in the Y direction (negative for north-up grids)
    pub pixel_height: f64,
    /// Rotation about the X axis (usually 0)
    pub row_rotation: f64,
    /// Rotation about the Y axis (usually 0)
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create an axis-aligned transform
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Create from a GDAL-style coefficient array
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`
    pub fn from_coefficients(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    /// The six coefficients in GDAL order
    pub fn coefficients(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// World coordinate of the center of cell `(row, col)`
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.fractional_to_world(row as f64 + 0.5, col as f64 + 0.5)
    }

    /// World coordinate of the corner of cell `(row, col)`
    pub fn cell_corner(&self, row: usize, col: usize) -> (f64, f64) {
        self.fractional_to_world(row as f64, col as f64)
    }

    /// Forward transform for continuous subscripts
    pub fn fractional_to_world(&self, row: f64, col: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Inverse transform: world coordinate to continuous `(row, col)`.
    ///
    /// Integer values land on cell corners, so the center of cell `(r, c)`
    /// comes back as `(r + 0.5, c + 0.5)`. Returns `(NaN, NaN)` for a
    /// degenerate transform.
    pub fn world_to_fractional(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;

        if det.abs() < 1e-10 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (self.pixel_width * dy - self.col_rotation * dx) / det;

        (row, col)
    }

    /// Transform for a sub-grid whose cell `(0, 0)` is cell `(row0, col0)`
    /// of this grid.
    ///
    /// The origin is recomputed from this transform rather than patched, so
    /// every surviving cell of the sub-grid keeps its world coordinate.
    pub fn for_subgrid(&self, row0: usize, col0: usize) -> Self {
        let (origin_x, origin_y) = self.cell_corner(row0, col0);
        Self {
            origin_x,
            origin_y,
            ..*self
        }
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
