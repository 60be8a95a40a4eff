//! # Thalweg Analysis
//!
//! Stream-network analysis over georeferenced raster grids.
//!
//! ## Modules
//!
//! - **subset**: Crop a grid to the bounding box of a selection (mask,
//!   explicit positions, coordinate extent, coordinate lists) with the
//!   georeferencing re-derived so surviving cells keep their world
//!   coordinates
//! - **network**: Ordered stream-network graph over grid cells, node
//!   attribute lists aligned to it, and value retrieval by downstream
//!   distance, by coordinate snap, or by raw grid position

pub mod network;
pub mod subset;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::network::{
        node_values, NodeAttributeList, NodeLocator, NodeQuery, NodeValues, NodeValuesParams,
        PathProfile, QueryDiagnostic, QueryResult, StreamNetwork,
    };
    pub use crate::subset::{crop, Crop, CropDiagnostic, CropParams, CropResult, Selection};
    pub use thalweg_core::prelude::*;
}
