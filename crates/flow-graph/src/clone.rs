//! Subgraph duplication with id remapping

use std::collections::HashMap;

use log::debug;

use crate::error::{GraphError, Result};
use crate::model::GraphModel;
use crate::types::{ChildElement, EdgeId, FlowEdge, FlowNode, NodeId};

/// Fresh ids produced by a [`GraphModel::clone_subgraph`] call
#[derive(Debug, Clone, Default)]
pub struct CloneOutcome {
    /// Source node id to cloned node id
    pub node_ids: HashMap<NodeId, NodeId>,
    /// Ids of the cloned edges
    pub edge_ids: Vec<EdgeId>,
}

impl GraphModel {
    /// Deep-copy the given nodes and the edges running between them.
    ///
    /// Every node, child and edge id is re-minted through the graph's own
    /// allocator, and an id referenced twice maps to the same fresh id.
    /// The entry node is never cloned, and edges touching a node outside
    /// the selection are skipped. Cloned nodes keep their position and
    /// attributes and get a uniquified name.
    pub fn clone_subgraph(&mut self, node_ids: &[&str]) -> Result<CloneOutcome> {
        for &node_id in node_ids {
            if self.graph.find_node(node_id).is_none() {
                return Err(GraphError::NodeNotFound(node_id.to_string()));
            }
        }

        let mut outcome = CloneOutcome::default();

        for &node_id in node_ids {
            let Some(node) = self.graph.find_node(node_id) else {
                continue;
            };
            if node.is_entry() || outcome.node_ids.contains_key(node_id) {
                continue;
            }
            let node = node.clone();

            let new_id = self.fresh_id();
            outcome.node_ids.insert(node.id.clone(), new_id.clone());
            let name = self.unique_name(&node.name);
            let children = self.remap_children(&node.children);
            self.graph.nodes.push(FlowNode {
                id: new_id,
                name,
                element: node.element,
                attributes: node.attributes,
                children,
                position: node.position,
            });
        }

        let selected: Vec<FlowEdge> = self
            .graph
            .edges
            .iter()
            .filter(|e| {
                outcome.node_ids.contains_key(e.source.as_str())
                    && outcome.node_ids.contains_key(e.target.as_str())
            })
            .cloned()
            .collect();
        for edge in selected {
            let id = self.fresh_id();
            outcome.edge_ids.push(id.clone());
            self.graph.edges.push(FlowEdge {
                id,
                source: outcome.node_ids[edge.source.as_str()].clone(),
                source_handle: edge.source_handle,
                target: outcome.node_ids[edge.target.as_str()].clone(),
                label: edge.label,
            });
        }

        debug!(
            "cloned {} node(s) and {} edge(s)",
            outcome.node_ids.len(),
            outcome.edge_ids.len()
        );
        Ok(outcome)
    }

    fn remap_children(&mut self, children: &[ChildElement]) -> Vec<ChildElement> {
        children
            .iter()
            .map(|child| ChildElement {
                id: self.fresh_id(),
                element: child.element.clone(),
                name: child.name.clone(),
                attributes: child.attributes.clone(),
                children: self.remap_children(&child.children),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::test_support::schema;

    #[test]
    fn clone_remaps_nodes_and_internal_edges() {
        let schema = schema();
        let mut model = GraphModel::new("Test");
        let a = model.add_node(&schema, "EchoPipe", BTreeMap::new()).unwrap();
        let b = model.add_node(&schema, "Exit", BTreeMap::new()).unwrap();
        model.set_attribute(&schema, &a, "charset", "ISO-8859-1").unwrap();
        model.add_edge(&schema, &a, "success", &b, None).unwrap();

        let outcome = model.clone_subgraph(&[&a, &b]).unwrap();
        assert_eq!(outcome.node_ids.len(), 2);
        assert_eq!(outcome.edge_ids.len(), 1);

        let cloned_a = &outcome.node_ids[a.as_str()];
        let cloned_b = &outcome.node_ids[b.as_str()];
        assert_ne!(cloned_a, &a);
        assert_ne!(cloned_b, &b);

        let clone = model.graph().find_node(cloned_a).unwrap();
        assert_eq!(clone.attributes.get("charset"), Some(&"ISO-8859-1".to_string()));

        let edge = model.graph().find_edge(&outcome.edge_ids[0]).unwrap();
        assert_eq!(&edge.source, cloned_a);
        assert_eq!(&edge.target, cloned_b);
        assert_eq!(edge.source_handle, "success");
    }

    #[test]
    fn edges_leaving_the_selection_are_not_cloned() {
        let schema = schema();
        let mut model = GraphModel::new("Test");
        let a = model.add_node(&schema, "EchoPipe", BTreeMap::new()).unwrap();
        let b = model.add_node(&schema, "Exit", BTreeMap::new()).unwrap();
        model.add_edge(&schema, &a, "success", &b, None).unwrap();

        let edges_before = model.graph().edges.len();
        let outcome = model.clone_subgraph(&[&b]).unwrap();
        assert_eq!(outcome.node_ids.len(), 1);
        assert!(outcome.edge_ids.is_empty());
        assert_eq!(model.graph().edges.len(), edges_before);
    }

    #[test]
    fn the_entry_node_is_never_cloned() {
        let schema = schema();
        let mut model = GraphModel::new("Test");
        let entry = model.entry_id().to_string();
        let a = model.add_node(&schema, "EchoPipe", BTreeMap::new()).unwrap();

        let outcome = model.clone_subgraph(&[&entry, &a]).unwrap();
        assert_eq!(outcome.node_ids.len(), 1);
        assert!(outcome.node_ids.contains_key(a.as_str()));
        assert_eq!(
            model.graph().nodes.iter().filter(|n| n.is_entry()).count(),
            1
        );
    }

    #[test]
    fn cloned_names_are_uniquified() {
        let schema = schema();
        let mut model = GraphModel::new("Test");
        let a = model.add_node(&schema, "EchoPipe", BTreeMap::new()).unwrap();
        model.set_name(&a, "Untangle").unwrap();

        let outcome = model.clone_subgraph(&[&a]).unwrap();
        let clone = model.graph().find_node(&outcome.node_ids[a.as_str()]).unwrap();
        assert_ne!(clone.name, "Untangle");
        assert!(clone.name.starts_with("Untangle"));
    }

    #[test]
    fn child_ids_are_re_minted() {
        let schema = schema();
        let mut model = GraphModel::new("Test");
        let receiver = model.add_node(&schema, "Receiver", BTreeMap::new()).unwrap();
        let listener = model
            .add_child(&schema, &receiver, None, "JavaListener", BTreeMap::new())
            .unwrap();

        let outcome = model.clone_subgraph(&[&receiver]).unwrap();
        let clone = model.graph().find_node(&outcome.node_ids[receiver.as_str()]).unwrap();
        assert_eq!(clone.children.len(), 1);
        assert_ne!(clone.children[0].id, listener);
        assert_eq!(clone.children[0].element, "JavaListener");
    }

    #[test]
    fn unknown_selection_ids_fail_without_side_effects() {
        let schema = schema();
        let mut model = GraphModel::new("Test");
        let a = model.add_node(&schema, "EchoPipe", BTreeMap::new()).unwrap();
        let nodes_before = model.graph().nodes.len();

        let result = model.clone_subgraph(&[&a, "unminted"]);
        assert!(matches!(result, Err(GraphError::NodeNotFound(_))));
        assert_eq!(model.graph().nodes.len(), nodes_before);
    }
}
