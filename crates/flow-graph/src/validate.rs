//! Whole-graph validation
//!
//! Collects every problem instead of failing on the first. Run with a
//! schema, this doubles as the staleness report after a schema reload:
//! nodes whose element type disappeared stay in the graph and show up here
//! as issues rather than hard failures.

use std::collections::HashSet;
use std::fmt;

use frank_doc::{resolve_handles, SchemaIndex};

use crate::types::AdapterGraph;

/// Validation issue with location context
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    /// An edge references a node id that does not exist
    UnknownNode { edge_id: String, node_id: String },
    /// Two nodes or two edges share an id
    DuplicateId { id: String },
    /// Two nodes share a serialized name
    DuplicateName { name: String },
    /// The graph has no entry node
    MissingEntryNode,
    /// The graph has more than one entry node
    MultipleEntryNodes,
    /// An edge points at the entry node
    EdgeIntoEntry { edge_id: String },
    /// A node's element type is missing from the schema
    UnknownElementType { node_id: String, element: String },
    /// An edge uses a handle its source does not offer
    UnknownHandle { edge_id: String, handle: String },
    /// A node carries an attribute its element type does not declare
    UndeclaredAttribute { node_id: String, attribute: String },
    /// An attribute value is outside its enumeration
    InvalidEnumValue {
        node_id: String,
        attribute: String,
        value: String,
    },
    /// A required attribute without a schema default has no value
    MissingRequiredAttribute { node_id: String, attribute: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::UnknownNode { edge_id, node_id } => {
                write!(f, "edge '{edge_id}' references unknown node '{node_id}'")
            }
            ValidationIssue::DuplicateId { id } => {
                write!(f, "id '{id}' is used more than once")
            }
            ValidationIssue::DuplicateName { name } => {
                write!(f, "node name '{name}' is used more than once")
            }
            ValidationIssue::MissingEntryNode => {
                write!(f, "the graph has no entry node")
            }
            ValidationIssue::MultipleEntryNodes => {
                write!(f, "the graph has more than one entry node")
            }
            ValidationIssue::EdgeIntoEntry { edge_id } => {
                write!(f, "edge '{edge_id}' points at the entry node")
            }
            ValidationIssue::UnknownElementType { node_id, element } => {
                write!(f, "node '{node_id}' has element type '{element}' which is not in the schema")
            }
            ValidationIssue::UnknownHandle { edge_id, handle } => {
                write!(f, "edge '{edge_id}' leaves through unknown handle '{handle}'")
            }
            ValidationIssue::UndeclaredAttribute { node_id, attribute } => {
                write!(f, "node '{node_id}' carries undeclared attribute '{attribute}'")
            }
            ValidationIssue::InvalidEnumValue {
                node_id,
                attribute,
                value,
            } => {
                write!(f, "node '{node_id}' attribute '{attribute}' has invalid value '{value}'")
            }
            ValidationIssue::MissingRequiredAttribute { node_id, attribute } => {
                write!(f, "node '{node_id}' is missing required attribute '{attribute}'")
            }
        }
    }
}

impl std::error::Error for ValidationIssue {}

/// Validate a whole graph, optionally against a schema.
///
/// Without a schema only structural rules are checked; with one, element
/// types, attributes and handle usage are checked as well.
pub fn validate_graph(graph: &AdapterGraph, schema: Option<&SchemaIndex>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    check_identities(graph, &mut issues);
    check_edge_references(graph, &mut issues);
    check_entry_node(graph, &mut issues);

    if let Some(schema) = schema {
        check_against_schema(graph, schema, &mut issues);
    }

    issues
}

fn check_identities(graph: &AdapterGraph, issues: &mut Vec<ValidationIssue>) {
    let mut ids: HashSet<&str> = HashSet::new();
    for node in &graph.nodes {
        if !ids.insert(node.id.as_str()) {
            issues.push(ValidationIssue::DuplicateId {
                id: node.id.clone(),
            });
        }
    }
    for edge in &graph.edges {
        if !ids.insert(edge.id.as_str()) {
            issues.push(ValidationIssue::DuplicateId {
                id: edge.id.clone(),
            });
        }
    }

    let mut names: HashSet<&str> = HashSet::new();
    for node in &graph.nodes {
        if !names.insert(node.name.as_str()) {
            issues.push(ValidationIssue::DuplicateName {
                name: node.name.clone(),
            });
        }
    }
}

fn check_edge_references(graph: &AdapterGraph, issues: &mut Vec<ValidationIssue>) {
    let node_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &graph.edges {
        for node_id in [&edge.source, &edge.target] {
            if !node_ids.contains(node_id.as_str()) {
                issues.push(ValidationIssue::UnknownNode {
                    edge_id: edge.id.clone(),
                    node_id: node_id.clone(),
                });
            }
        }
    }
}

fn check_entry_node(graph: &AdapterGraph, issues: &mut Vec<ValidationIssue>) {
    let entries: Vec<&str> = graph
        .nodes
        .iter()
        .filter(|n| n.is_entry())
        .map(|n| n.id.as_str())
        .collect();
    match entries.len() {
        0 => issues.push(ValidationIssue::MissingEntryNode),
        1 => {}
        _ => issues.push(ValidationIssue::MultipleEntryNodes),
    }

    for entry in entries {
        for edge in graph.incoming_edges(entry) {
            issues.push(ValidationIssue::EdgeIntoEntry {
                edge_id: edge.id.clone(),
            });
        }
    }
}

fn check_against_schema(
    graph: &AdapterGraph,
    schema: &SchemaIndex,
    issues: &mut Vec<ValidationIssue>,
) {
    for node in &graph.nodes {
        let Some(element_type) = &node.element else {
            continue;
        };
        let Some(definition) = schema.lookup(element_type) else {
            issues.push(ValidationIssue::UnknownElementType {
                node_id: node.id.clone(),
                element: element_type.clone(),
            });
            continue;
        };

        for (attribute, value) in &node.attributes {
            match definition.attribute(attribute) {
                None => issues.push(ValidationIssue::UndeclaredAttribute {
                    node_id: node.id.clone(),
                    attribute: attribute.clone(),
                }),
                Some(declared) => {
                    if let Some(enum_name) = &declared.enum_ref {
                        let allowed = schema
                            .enum_values(enum_name)
                            .map(|e| e.contains(value))
                            .unwrap_or(true);
                        if !allowed {
                            issues.push(ValidationIssue::InvalidEnumValue {
                                node_id: node.id.clone(),
                                attribute: attribute.clone(),
                                value: value.clone(),
                            });
                        }
                    }
                }
            }
        }

        for declared in &definition.attributes {
            if declared.required
                && declared.default.is_none()
                && !node.attributes.contains_key(&declared.name)
            {
                issues.push(ValidationIssue::MissingRequiredAttribute {
                    node_id: node.id.clone(),
                    attribute: declared.name.clone(),
                });
            }
        }
    }

    for edge in &graph.edges {
        let Some(source) = graph.find_node(&edge.source) else {
            continue;
        };
        let handles = match &source.element {
            None => resolve_handles(None),
            Some(element_type) => match schema.lookup(element_type) {
                Some(definition) => resolve_handles(Some(definition.forwards.as_slice())),
                // Already reported as an unknown element type.
                None => continue,
            },
        };
        if !handles.iter().any(|h| h == &edge.source_handle) {
            issues.push(ValidationIssue::UnknownHandle {
                edge_id: edge.id.clone(),
                handle: edge.source_handle.clone(),
            });
        }
    }
}
