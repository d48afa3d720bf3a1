//! Supply graph model and fallback topology.

pub mod model;
pub mod topology;

pub use model::{
    resolve_anchor, AnchorResolution, GraphError, GraphOptions, SupplierNode, SupplyGraph,
    ANCHOR_ID_WHITELIST,
};
pub use topology::scale_free_dependencies;
