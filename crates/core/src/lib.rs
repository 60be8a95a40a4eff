//! # Thalweg Core
//!
//! Core types and traits for the Thalweg stream-network analysis library.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - Subscript, linear-position and world-coordinate addressing
//! - Algorithm traits for consistent API

pub mod error;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterValue};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterValue};
    pub use crate::Algorithm;
}

/// Common interface shared by the operations in this workspace.
///
/// Implementations are pure: they read their input and parameters and
/// return a fresh output, leaving the input untouched.
pub trait Algorithm {
    /// Data consumed by a run
    type Input;
    /// Data produced by a successful run
    type Output;
    /// Tuning knobs, with usable defaults
    type Params: Default;
    /// Failure type surfaced by `execute`
    type Error: std::error::Error;

    /// Short identifier used in messages
    fn name(&self) -> &'static str;

    /// One-line summary of what the operation computes
    fn description(&self) -> &'static str;

    /// Run on `input` with explicit `params`
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Run with `Params::default()`
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
