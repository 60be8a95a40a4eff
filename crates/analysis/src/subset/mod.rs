//! Grid subsetting
//!
//! Crop a grid to the minimum bounding rectangle of a selection, with the
//! georeferencing re-derived so surviving cells keep their world
//! coordinates. Selections are given as a mask, a mask grid, explicit
//! linear positions, a coordinate extent, or paired coordinate lists.

mod crop;
mod selection;

pub use crop::{crop, fill_unselected, Crop, CropDiagnostic, CropParams, CropResult};
pub use selection::Selection;
