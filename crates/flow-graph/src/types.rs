//! Core types for adapter graphs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// A node instance in an adapter graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Serialized identity; unique within the adapter
    pub name: String,
    /// Element type name, or `None` for the synthetic entry node
    pub element: Option<String>,
    /// Attribute values keyed by declared attribute name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Nested configuration elements, e.g. the listener inside a receiver
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildElement>,
    /// Canvas position as (x, y); owned by the rendering layer
    pub position: (f64, f64),
}

impl FlowNode {
    /// Whether this node is the synthetic pipeline entry
    pub fn is_entry(&self) -> bool {
        self.element.is_none()
    }
}

/// Nested configuration element carried by a node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildElement {
    pub id: NodeId,
    /// Element type name
    pub element: String,
    /// Optional name attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildElement>,
}

/// An edge connecting a source handle to a target node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Source node ID
    pub source: NodeId,
    /// Handle on the source node this edge leaves through
    pub source_handle: String,
    /// Target node ID
    pub target: NodeId,
    /// Display label; defaults to the uppercased handle name
    pub label: String,
}

/// One adapter's node/edge structure plus its persistence identity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterGraph {
    /// Adapter name as it appears in the configuration
    pub name: String,
    /// Optional description attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Configuration file this adapter loads from and saves to
    #[serde(default)]
    pub path: String,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

impl AdapterGraph {
    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find a node by ID (mutable)
    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut FlowNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Find a node by its serialized name
    pub fn find_node_by_name(&self, name: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// The synthetic entry node
    pub fn entry_node(&self) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.is_entry())
    }

    /// Find an edge by ID
    pub fn find_edge(&self, id: &str) -> Option<&FlowEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Get edges coming into a node
    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a FlowEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Get edges going out of a node
    pub fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a FlowEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }
}
