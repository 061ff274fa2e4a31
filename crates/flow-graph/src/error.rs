//! Error types for graph mutation and translation

use thiserror::Error;

pub use frank_doc::TransportError;

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while mutating or translating an adapter graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// Element type missing from the schema
    #[error("unknown element type '{0}'")]
    UnknownElementType(String),

    /// Attribute not declared for the element type
    #[error("attribute '{attribute}' is not declared for element type '{element}'")]
    InvalidAttribute { element: String, attribute: String },

    /// Value outside the attribute's enumeration
    #[error("'{value}' is not a valid value for attribute '{attribute}' ({enum_name})")]
    InvalidEnumValue {
        attribute: String,
        value: String,
        enum_name: String,
    },

    /// Handle not offered by the source node
    #[error("node '{node}' has no handle '{handle}'")]
    InvalidHandle { node: String, handle: String },

    /// Edge with the same source, handle and target already exists.
    ///
    /// The field is `node` rather than `source`: thiserror reserves that
    /// name for the error chain.
    #[error("edge {node}:{handle} -> {target} already exists")]
    DuplicateEdge {
        node: String,
        handle: String,
        target: String,
    },

    /// Node id not present in the graph
    #[error("node '{0}' not found")]
    NodeNotFound(String),

    /// Edge id not present in the graph
    #[error("edge '{0}' not found")]
    EdgeNotFound(String),

    /// Child element id not present under the node
    #[error("child '{child}' not found under node '{node}'")]
    ChildNotFound { node: String, child: String },

    /// Parent element type has no slot for the child element
    #[error("element type '{parent}' does not accept '{child}' as a child")]
    ChildNotAllowed { parent: String, child: String },

    /// Node name already taken within the adapter
    #[error("a node named '{0}' already exists")]
    DuplicateNodeName(String),

    /// The pipeline entry node cannot be removed
    #[error("node '{0}' is the pipeline entry and cannot be removed")]
    EntryNodeRemoval(String),

    /// The pipeline entry node cannot be an edge target
    #[error("node '{0}' is the pipeline entry and cannot be an edge target")]
    EntryNodeTarget(String),

    /// The pipeline entry node supports a single outgoing edge
    #[error("the pipeline entry already has an outgoing edge")]
    EntryEdgeExists,

    /// Configuration text is not well-formed XML
    #[error("configuration is not well-formed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Configuration parsed but its structure is not a usable fragment
    #[error("configuration fragment is malformed: {0}")]
    Parse(String),

    /// Forward path referencing no node in the fragment
    #[error("forward '{handle}' on '{node}' points at undeclared node '{path}'")]
    DanglingForward {
        node: String,
        handle: String,
        path: String,
    },

    /// Adapter name not present in the configuration document
    #[error("no adapter named '{0}' in the configuration")]
    AdapterNotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Boundary failure from the configuration store or schema host
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn duplicate_edge_names_the_offending_endpoints() {
        let error = GraphError::DuplicateEdge {
            node: "3".to_string(),
            handle: "success".to_string(),
            target: "7".to_string(),
        };
        assert_eq!(error.to_string(), "edge 3:success -> 7 already exists");
        // Data-only fields must not be mistaken for an error chain.
        assert!(error.source().is_none());
    }

    #[test]
    fn dangling_forward_names_the_node_and_path() {
        let error = GraphError::DanglingForward {
            node: "CallBackend".to_string(),
            handle: "timeout".to_string(),
            path: "Nowhere".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "forward 'timeout' on 'CallBackend' points at undeclared node 'Nowhere'"
        );
        assert!(error.source().is_none());
    }
}
