//! Raster data structures and operations

mod geotransform;
mod grid;
mod value;

pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use value::RasterValue;
