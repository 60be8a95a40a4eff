//! Cell value trait for generic raster grids

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Bounds the cell types a [`Raster`](crate::Raster) accepts and carries the
/// missing-value semantics every grid operation relies on: floating-point
/// storage uses NaN as its natural marker, integer storage needs an explicit
/// nodata value.
pub trait RasterValue:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Marker used for missing cells when the caller does not set one
    fn default_nodata() -> Self;

    /// Whether this value is missing under the grid's nodata marker
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this storage type can represent NaN
    fn nan_capable() -> bool;

    /// Widen to f64, e.g. for attribute extraction and interpolation
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Narrow from f64, e.g. for fill values supplied as plain numbers.
    /// Returns `None` when the value is not representable (NaN or out of
    /// range for integer storage).
    fn from_f64(value: f64) -> Option<Self> {
        NumCast::from(value)
    }
}

macro_rules! impl_raster_value_int {
    ($t:ty) => {
        impl RasterValue for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }

            fn nan_capable() -> bool {
                false
            }
        }
    };
}

macro_rules! impl_raster_value_float {
    ($t:ty) => {
        impl RasterValue for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                // NaN cells are missing whether or not a marker is set
                self.is_nan()
                    || nodata.map_or(false, |marker| (self - marker).abs() < <$t>::EPSILON * 100.0)
            }

            fn nan_capable() -> bool {
                true
            }
        }
    };
}

impl_raster_value_int!(i8);
impl_raster_value_int!(i16);
impl_raster_value_int!(i32);
impl_raster_value_int!(i64);
impl_raster_value_int!(u8);
impl_raster_value_int!(u16);
impl_raster_value_int!(u32);
impl_raster_value_int!(u64);
impl_raster_value_float!(f32);
impl_raster_value_float!(f64);
