//! Fluent construction of adapter graphs
//!
//! Mostly a test convenience: nodes are addressed by a caller-chosen key so
//! edges can be declared before the generated ids are known. Everything
//! still goes through [`GraphModel`] operations, so a built graph satisfies
//! the same invariants as an interactively built one.

use std::collections::BTreeMap;

use frank_doc::SchemaIndex;

use crate::error::{GraphError, Result};
use crate::model::GraphModel;
use crate::types::NodeId;

/// Key automatically bound to the entry node
pub const ENTRY_KEY: &str = "start";

pub struct GraphBuilder<'a> {
    schema: &'a SchemaIndex,
    model: GraphModel,
    keys: BTreeMap<String, NodeId>,
    pending_error: Option<GraphError>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(schema: &'a SchemaIndex, adapter_name: impl Into<String>) -> Self {
        let model = GraphModel::new(adapter_name);
        let mut keys = BTreeMap::new();
        keys.insert(ENTRY_KEY.to_string(), model.entry_id().to_string());
        Self {
            schema,
            model,
            keys,
            pending_error: None,
        }
    }

    /// Add a node of `element_type`, addressable by `key`.
    pub fn node(mut self, key: &str, element_type: &str) -> Self {
        if self.pending_error.is_some() {
            return self;
        }
        match self.model.add_node(self.schema, element_type, BTreeMap::new()) {
            Ok(id) => {
                self.keys.insert(key.to_string(), id);
            }
            Err(error) => self.pending_error = Some(error),
        }
        self
    }

    /// Add a node with an explicit serialized name.
    pub fn named_node(mut self, key: &str, element_type: &str, name: &str) -> Self {
        self = self.node(key, element_type);
        if self.pending_error.is_some() {
            return self;
        }
        if let Some(id) = self.keys.get(key).cloned() {
            if let Err(error) = self.model.set_name(&id, name) {
                self.pending_error = Some(error);
            }
        }
        self
    }

    /// Set an attribute on a node added earlier.
    pub fn attr(mut self, key: &str, attribute: &str, value: &str) -> Self {
        if self.pending_error.is_some() {
            return self;
        }
        let Some(id) = self.keys.get(key).cloned() else {
            self.pending_error = Some(GraphError::NodeNotFound(key.to_string()));
            return self;
        };
        if let Err(error) = self.model.set_attribute(self.schema, &id, attribute, value) {
            self.pending_error = Some(error);
        }
        self
    }

    /// Attach a child element to a node added earlier.
    pub fn child(mut self, key: &str, element_type: &str) -> Self {
        if self.pending_error.is_some() {
            return self;
        }
        let Some(id) = self.keys.get(key).cloned() else {
            self.pending_error = Some(GraphError::NodeNotFound(key.to_string()));
            return self;
        };
        if let Err(error) = self
            .model
            .add_child(self.schema, &id, None, element_type, BTreeMap::new())
        {
            self.pending_error = Some(error);
        }
        self
    }

    /// Connect two nodes added earlier. `ENTRY_KEY` addresses the entry node.
    pub fn edge(self, source: &str, handle: &str, target: &str) -> Self {
        self.connect(source, handle, target, None)
    }

    /// Connect two nodes with an explicit edge label.
    pub fn labeled_edge(self, source: &str, handle: &str, target: &str, label: &str) -> Self {
        self.connect(source, handle, target, Some(label))
    }

    fn connect(mut self, source: &str, handle: &str, target: &str, label: Option<&str>) -> Self {
        if self.pending_error.is_some() {
            return self;
        }
        let Some(source_id) = self.keys.get(source).cloned() else {
            self.pending_error = Some(GraphError::NodeNotFound(source.to_string()));
            return self;
        };
        let Some(target_id) = self.keys.get(target).cloned() else {
            self.pending_error = Some(GraphError::NodeNotFound(target.to_string()));
            return self;
        };
        if let Err(error) = self
            .model
            .add_edge(self.schema, &source_id, handle, &target_id, label)
        {
            self.pending_error = Some(error);
        }
        self
    }

    /// Node id allocated for a key, once the node was added.
    pub fn id(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }

    /// Finish building; the first error from any step surfaces here.
    pub fn build(self) -> Result<GraphModel> {
        match self.pending_error {
            None => Ok(self.model),
            Some(error) => Err(error),
        }
    }
}
