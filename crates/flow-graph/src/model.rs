//! Mutable graph model for one adapter
//!
//! `GraphModel` owns the node/edge set and is the only place that mutates
//! it. Every operation validates against the schema the caller passes in,
//! so a schema reload is picked up on the next call without touching stored
//! state. A failed operation leaves the graph exactly as it was.
//!
//! Three representation rules keep serialization canonical:
//!
//! - attribute values equal to their schema default are never stored
//! - an exit state equal to what the exit's name derives is never stored
//! - the `name` attribute lives on the node itself, never in the attribute
//!   map

use std::collections::BTreeMap;

use frank_doc::{resolve_handles, ElementDefinition, ElementKind, SchemaIndex};
use log::debug;

use crate::error::{GraphError, Result};
use crate::types::{AdapterGraph, ChildElement, EdgeId, FlowEdge, FlowNode, NodeId};

/// Name given to the synthetic entry node
pub const ENTRY_NODE_NAME: &str = "Start";

/// Invariant-enforcing wrapper around one adapter graph
#[derive(Debug, Clone)]
pub struct GraphModel {
    pub(crate) graph: AdapterGraph,
    pub(crate) entry: NodeId,
    pub(crate) next_id: u64,
}

impl GraphModel {
    /// Create an empty adapter graph holding only its synthetic entry node.
    pub fn new(name: impl Into<String>) -> Self {
        let mut model = Self {
            graph: AdapterGraph {
                name: name.into(),
                description: None,
                path: String::new(),
                nodes: Vec::new(),
                edges: Vec::new(),
            },
            entry: NodeId::new(),
            next_id: 1,
        };
        let id = model.fresh_id();
        model.graph.nodes.push(FlowNode {
            id: id.clone(),
            name: ENTRY_NODE_NAME.to_string(),
            element: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
            position: (0.0, 0.0),
        });
        model.entry = id;
        model
    }

    /// Read access to the underlying graph
    pub fn graph(&self) -> &AdapterGraph {
        &self.graph
    }

    /// Consume the model, returning the graph
    pub fn into_graph(self) -> AdapterGraph {
        self.graph
    }

    /// Id of the synthetic entry node
    pub fn entry_id(&self) -> &str {
        &self.entry
    }

    /// Rename the adapter itself
    pub fn set_adapter_name(&mut self, name: impl Into<String>) {
        self.graph.name = name.into();
    }

    /// Set or clear the adapter description
    pub fn set_description(&mut self, description: Option<String>) {
        self.graph.description = description;
    }

    /// Record which configuration file this adapter belongs to
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.graph.path = path.into();
    }

    pub(crate) fn fresh_id(&mut self) -> NodeId {
        let id = self.next_id.to_string();
        self.next_id += 1;
        id
    }

    pub(crate) fn unique_name(&self, base: &str) -> String {
        if self.graph.find_node_by_name(base).is_none() {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if self.graph.find_node_by_name(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Add a node of the given element type.
    ///
    /// The node gets a fresh id and a unique default name derived from the
    /// element type. Initial attributes are validated exactly like
    /// [`set_attribute`](Self::set_attribute).
    pub fn add_node(
        &mut self,
        schema: &SchemaIndex,
        element_type: &str,
        initial_attributes: BTreeMap<String, String>,
    ) -> Result<NodeId> {
        let definition = schema
            .lookup(element_type)
            .ok_or_else(|| GraphError::UnknownElementType(element_type.to_string()))?;

        for (name, value) in &initial_attributes {
            validate_attribute(schema, definition, name, value)?;
        }

        let id = self.fresh_id();
        let name = self.unique_name(&format!("{element_type}{id}"));
        let mut attributes = BTreeMap::new();
        for (attribute, value) in initial_attributes {
            if is_schema_default(definition, &attribute, &value)
                || is_derived_exit_state(element_type, &name, &attribute, &value)
            {
                continue;
            }
            attributes.insert(attribute, value);
        }
        debug!("add node {id} ({element_type}) as '{name}'");
        self.graph.nodes.push(FlowNode {
            id: id.clone(),
            name,
            element: Some(element_type.to_string()),
            attributes,
            children: Vec::new(),
            position: (0.0, 0.0),
        });
        Ok(id)
    }

    /// Remove a node and every edge referencing it.
    pub fn remove_node(&mut self, node_id: &str) -> Result<()> {
        if node_id == self.entry {
            return Err(GraphError::EntryNodeRemoval(node_id.to_string()));
        }
        let position = self
            .graph
            .nodes
            .iter()
            .position(|n| n.id == node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;

        let before = self.graph.edges.len();
        self.graph
            .edges
            .retain(|e| e.source != node_id && e.target != node_id);
        let cascaded = before - self.graph.edges.len();
        self.graph.nodes.remove(position);
        debug!("removed node {node_id} and {cascaded} incident edge(s)");
        Ok(())
    }

    /// Ordered handle set for a node, derived from the current schema.
    ///
    /// Never cached: a node outlives schema reloads, its handles do not.
    pub fn handles_for(&self, schema: &SchemaIndex, node_id: &str) -> Result<Vec<String>> {
        let node = self
            .graph
            .find_node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;

        let Some(element_type) = node.element.as_deref() else {
            // The entry node has exactly the implicit success handle.
            return Ok(resolve_handles(None));
        };

        let definition = schema
            .lookup(element_type)
            .ok_or_else(|| GraphError::UnknownElementType(element_type.to_string()))?;
        Ok(resolve_handles(Some(definition.forwards.as_slice())))
    }

    /// Connect a source handle to a target node.
    ///
    /// The label defaults to the uppercased handle name. Edges leaving the
    /// entry node always carry the default label because the serialized
    /// form has no label slot for the entry edge.
    pub fn add_edge(
        &mut self,
        schema: &SchemaIndex,
        source: &str,
        source_handle: &str,
        target: &str,
        label: Option<&str>,
    ) -> Result<EdgeId> {
        if self.graph.find_node(source).is_none() {
            return Err(GraphError::NodeNotFound(source.to_string()));
        }
        if self.graph.find_node(target).is_none() {
            return Err(GraphError::NodeNotFound(target.to_string()));
        }
        if target == self.entry {
            return Err(GraphError::EntryNodeTarget(target.to_string()));
        }
        if source == self.entry && self.graph.outgoing_edges(source).next().is_some() {
            return Err(GraphError::EntryEdgeExists);
        }

        let handles = self.handles_for(schema, source)?;
        if !handles.iter().any(|h| h == source_handle) {
            return Err(GraphError::InvalidHandle {
                node: source.to_string(),
                handle: source_handle.to_string(),
            });
        }

        let duplicate = self.graph.edges.iter().any(|e| {
            e.source == source && e.source_handle == source_handle && e.target == target
        });
        if duplicate {
            return Err(GraphError::DuplicateEdge {
                node: source.to_string(),
                handle: source_handle.to_string(),
                target: target.to_string(),
            });
        }

        let default_label = source_handle.to_uppercase();
        let label = if source == self.entry {
            default_label
        } else {
            label.map(str::to_string).unwrap_or(default_label)
        };

        let id = self.fresh_id();
        debug!("add edge {id}: {source}:{source_handle} -> {target} [{label}]");
        self.graph.edges.push(FlowEdge {
            id: id.clone(),
            source: source.to_string(),
            source_handle: source_handle.to_string(),
            target: target.to_string(),
            label,
        });
        Ok(id)
    }

    /// Remove an edge by id.
    pub fn remove_edge(&mut self, edge_id: &str) -> Result<()> {
        let position = self
            .graph
            .edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or_else(|| GraphError::EdgeNotFound(edge_id.to_string()))?;
        self.graph.edges.remove(position);
        Ok(())
    }

    /// Set an attribute value on a node.
    ///
    /// Storing the schema default resets the attribute to implicit, as does
    /// storing the state an exit's name already derives.
    pub fn set_attribute(
        &mut self,
        schema: &SchemaIndex,
        node_id: &str,
        attribute: &str,
        value: &str,
    ) -> Result<()> {
        let node = self
            .graph
            .find_node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        let node_name = node.name.clone();
        let Some(element_type) = node.element.clone() else {
            return Err(GraphError::InvalidAttribute {
                element: ENTRY_NODE_NAME.to_string(),
                attribute: attribute.to_string(),
            });
        };
        let definition = schema
            .lookup(&element_type)
            .ok_or_else(|| GraphError::UnknownElementType(element_type.clone()))?;
        validate_attribute(schema, definition, attribute, value)?;
        let implicit = is_schema_default(definition, attribute, value)
            || is_derived_exit_state(&element_type, &node_name, attribute, value);

        let Some(node) = self.graph.find_node_mut(node_id) else {
            return Err(GraphError::NodeNotFound(node_id.to_string()));
        };
        if implicit {
            node.attributes.remove(attribute);
        } else {
            node.attributes.insert(attribute.to_string(), value.to_string());
        }
        Ok(())
    }

    /// Remove an attribute value from a node.
    pub fn clear_attribute(&mut self, node_id: &str, attribute: &str) -> Result<()> {
        let Some(node) = self.graph.find_node_mut(node_id) else {
            return Err(GraphError::NodeNotFound(node_id.to_string()));
        };
        node.attributes.remove(attribute);
        Ok(())
    }

    /// Rename a node. Names are the serialized identity and must be unique.
    pub fn set_name(&mut self, node_id: &str, name: &str) -> Result<()> {
        if self.graph.find_node(node_id).is_none() {
            return Err(GraphError::NodeNotFound(node_id.to_string()));
        }
        if self
            .graph
            .nodes
            .iter()
            .any(|n| n.name == name && n.id != node_id)
        {
            return Err(GraphError::DuplicateNodeName(name.to_string()));
        }
        let Some(node) = self.graph.find_node_mut(node_id) else {
            return Err(GraphError::NodeNotFound(node_id.to_string()));
        };
        node.name = name.to_string();
        // A stored exit state the new name derives on its own goes implicit.
        let stale_state = match (node.element.as_deref(), node.attributes.get("state")) {
            (Some(element), Some(state)) => is_derived_exit_state(element, name, "state", state),
            _ => false,
        };
        if stale_state {
            node.attributes.remove("state");
        }
        Ok(())
    }

    /// Move a node on the canvas.
    pub fn set_position(&mut self, node_id: &str, position: (f64, f64)) -> Result<()> {
        let Some(node) = self.graph.find_node_mut(node_id) else {
            return Err(GraphError::NodeNotFound(node_id.to_string()));
        };
        node.position = position;
        Ok(())
    }

    /// Attach a child element to a node, or nest it under one of the node's
    /// existing children when `parent_child` is given.
    pub fn add_child(
        &mut self,
        schema: &SchemaIndex,
        node_id: &str,
        parent_child: Option<&str>,
        element_type: &str,
        initial_attributes: BTreeMap<String, String>,
    ) -> Result<NodeId> {
        let child_definition = schema
            .lookup(element_type)
            .ok_or_else(|| GraphError::UnknownElementType(element_type.to_string()))?;

        let mut attributes = BTreeMap::new();
        for (name, value) in initial_attributes {
            validate_attribute(schema, child_definition, &name, &value)?;
            if !is_schema_default(child_definition, &name, &value) {
                attributes.insert(name, value);
            }
        }

        let node = self
            .graph
            .find_node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;

        // Acceptance is checked against the element the child nests under.
        let host_type = match parent_child {
            None => node
                .element
                .as_deref()
                .ok_or_else(|| GraphError::ChildNotAllowed {
                    parent: ENTRY_NODE_NAME.to_string(),
                    child: element_type.to_string(),
                })?
                .to_string(),
            Some(parent_id) => find_child(&node.children, parent_id)
                .ok_or_else(|| GraphError::ChildNotFound {
                    node: node_id.to_string(),
                    child: parent_id.to_string(),
                })?
                .element
                .clone(),
        };
        if !schema.accepts_child(&host_type, element_type) {
            return Err(GraphError::ChildNotAllowed {
                parent: host_type,
                child: element_type.to_string(),
            });
        }

        let id = self.fresh_id();
        let child = ChildElement {
            id: id.clone(),
            element: element_type.to_string(),
            name: None,
            attributes,
            children: Vec::new(),
        };

        let Some(node) = self.graph.find_node_mut(node_id) else {
            return Err(GraphError::NodeNotFound(node_id.to_string()));
        };
        match parent_child {
            None => node.children.push(child),
            Some(parent_id) => {
                if let Some(parent) = find_child_mut(&mut node.children, parent_id) {
                    parent.children.push(child);
                }
            }
        }
        debug!("add child {id} ({element_type}) under node {node_id}");
        Ok(id)
    }

    /// Remove a child element (and everything nested in it) from a node.
    pub fn remove_child(&mut self, node_id: &str, child_id: &str) -> Result<()> {
        let Some(node) = self.graph.find_node_mut(node_id) else {
            return Err(GraphError::NodeNotFound(node_id.to_string()));
        };
        if remove_child_recursive(&mut node.children, child_id) {
            Ok(())
        } else {
            Err(GraphError::ChildNotFound {
                node: node_id.to_string(),
                child: child_id.to_string(),
            })
        }
    }

    /// Set an attribute on a nested child element.
    pub fn set_child_attribute(
        &mut self,
        schema: &SchemaIndex,
        node_id: &str,
        child_id: &str,
        attribute: &str,
        value: &str,
    ) -> Result<()> {
        let node = self
            .graph
            .find_node(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        let child = find_child(&node.children, child_id).ok_or_else(|| GraphError::ChildNotFound {
            node: node_id.to_string(),
            child: child_id.to_string(),
        })?;
        let definition = schema
            .lookup(&child.element)
            .ok_or_else(|| GraphError::UnknownElementType(child.element.clone()))?;
        validate_attribute(schema, definition, attribute, value)?;
        let implicit = is_schema_default(definition, attribute, value);

        let Some(node) = self.graph.find_node_mut(node_id) else {
            return Err(GraphError::NodeNotFound(node_id.to_string()));
        };
        if let Some(child) = find_child_mut(&mut node.children, child_id) {
            if implicit {
                child.attributes.remove(attribute);
            } else {
                child.attributes.insert(attribute.to_string(), value.to_string());
            }
        }
        Ok(())
    }

    /// Name a nested child element. Child names are optional and carry no
    /// uniqueness requirement.
    pub fn set_child_name(
        &mut self,
        node_id: &str,
        child_id: &str,
        name: Option<String>,
    ) -> Result<()> {
        let Some(node) = self.graph.find_node_mut(node_id) else {
            return Err(GraphError::NodeNotFound(node_id.to_string()));
        };
        let Some(child) = find_child_mut(&mut node.children, child_id) else {
            return Err(GraphError::ChildNotFound {
                node: node_id.to_string(),
                child: child_id.to_string(),
            });
        };
        child.name = name;
        Ok(())
    }

    /// Locate a nested child element under a node.
    pub fn find_child(&self, node_id: &str, child_id: &str) -> Option<&ChildElement> {
        self.graph
            .find_node(node_id)
            .and_then(|node| find_child(&node.children, child_id))
    }
}

fn validate_attribute(
    schema: &SchemaIndex,
    definition: &ElementDefinition,
    attribute: &str,
    value: &str,
) -> Result<()> {
    // The name attribute is the node's identity and lives on the node
    // itself; storing it here would serialize it twice.
    if attribute == "name" {
        return Err(GraphError::InvalidAttribute {
            element: definition.name.clone(),
            attribute: attribute.to_string(),
        });
    }

    let declared =
        definition
            .attribute(attribute)
            .ok_or_else(|| GraphError::InvalidAttribute {
                element: definition.name.clone(),
                attribute: attribute.to_string(),
            })?;

    if let Some(enum_name) = &declared.enum_ref {
        let allowed = schema
            .enum_values(enum_name)
            .map(|e| e.contains(value))
            .unwrap_or(false);
        if !allowed {
            return Err(GraphError::InvalidEnumValue {
                attribute: attribute.to_string(),
                value: value.to_string(),
                enum_name: enum_name.clone(),
            });
        }
    }
    Ok(())
}

fn is_schema_default(definition: &ElementDefinition, attribute: &str, value: &str) -> bool {
    definition
        .attribute(attribute)
        .and_then(|a| a.default.as_deref())
        .map(|default| default == value)
        .unwrap_or(false)
}

/// Exit state when none is set explicitly: failure-sounding names map to
/// `error`, everything else to `success`.
pub(crate) fn derived_exit_state(name: &str) -> &'static str {
    let lowered = name.to_lowercase();
    if lowered.contains("bad") || lowered.contains("fail") {
        "error"
    } else {
        "success"
    }
}

fn is_derived_exit_state(element_type: &str, node_name: &str, attribute: &str, value: &str) -> bool {
    attribute == "state"
        && ElementKind::from_element_name(element_type) == ElementKind::Exit
        && value == derived_exit_state(node_name)
}

fn find_child<'a>(children: &'a [ChildElement], id: &str) -> Option<&'a ChildElement> {
    for child in children {
        if child.id == id {
            return Some(child);
        }
        if let Some(found) = find_child(&child.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_child_mut<'a>(children: &'a mut [ChildElement], id: &str) -> Option<&'a mut ChildElement> {
    for child in children {
        if child.id == id {
            return Some(child);
        }
        if let Some(found) = find_child_mut(&mut child.children, id) {
            return Some(found);
        }
    }
    None
}

fn remove_child_recursive(children: &mut Vec<ChildElement>, id: &str) -> bool {
    if let Some(position) = children.iter().position(|c| c.id == id) {
        children.remove(position);
        return true;
    }
    children
        .iter_mut()
        .any(|child| remove_child_recursive(&mut child.children, id))
}
