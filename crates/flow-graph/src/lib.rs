//! Adapter graph model for the flow studio
//!
//! An adapter is edited as a graph: pipes, senders, receivers and exits as
//! nodes, forwards as edges, plus one synthetic entry node standing for
//! the pipeline's `firstPipe`. This crate owns that model and its
//! round-trip to configuration XML:
//!
//! - [`GraphModel`]: schema-validated mutations; every operation either
//!   applies fully or leaves the graph untouched
//! - [`xml`]: deterministic serialization, strict parsing and byte-exact
//!   splicing of adapters in and out of configuration documents
//! - [`ConfigStore`]: async boundary to wherever configuration files live
//! - [`validate_graph`]: whole-graph issue report, schema-aware

pub mod builder;
pub mod clone;
pub mod error;
pub mod model;
pub mod store;
pub mod types;
pub mod validate;
pub mod xml;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types
pub use builder::{GraphBuilder, ENTRY_KEY};
pub use clone::CloneOutcome;
pub use error::{GraphError, Result, TransportError};
pub use model::{GraphModel, ENTRY_NODE_NAME};
pub use store::{
    load_adapter, save_adapter_to_store, ConfigStore, DirConfigStore, MemoryConfigStore,
    SaveAdapter, StoreResult, StoredConfiguration, StoredProject, EMPTY_CONFIGURATION,
};
pub use types::{AdapterGraph, ChildElement, EdgeId, FlowEdge, FlowNode, NodeId};
pub use validate::{validate_graph, ValidationIssue};
