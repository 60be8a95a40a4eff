//! Stream network representation and node-level queries
//!
//! A `StreamNetwork` is an ordered list of grid cells with downstream
//! links and outlet distances, built by an external flow-routing step.
//! `NodeAttributeList` aligns per-node values to that order,
//! `NodeLocator` snaps world coordinates to nodes, and `node_values`
//! reads attributes back out by distance, coordinate, or position.

mod attributes;
mod snap;
mod stream;
mod values;

pub use attributes::NodeAttributeList;
pub use snap::{NodeEntry, NodeLocator, SnapResult};
pub use stream::{PathProfile, StreamNetwork};
pub use values::{
    node_values, NodeQuery, NodeValues, NodeValuesParams, QueryDiagnostic, QueryResult,
};
