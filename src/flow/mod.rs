//! Vertex-capacity flow networks and exact max-flow.

pub mod max_flow;
pub mod network;

pub use max_flow::{max_flow, FLOW_EPSILON};
pub use network::{FlowEdge, FlowNetwork, FlowNetworkBuilder, SplitNetwork, Vertex};
