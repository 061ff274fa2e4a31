//! Deterministic adapter serialization
//!
//! Serializing the same graph twice yields byte-identical text, so
//! everything here has a fixed order: receivers before the pipeline, exits
//! before pipes, pipes in traversal order from the entry edge, attributes
//! in sorted key order, forwards in edge insertion order.

use std::collections::HashSet;

use log::debug;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use frank_doc::{ElementKind, SchemaIndex};

use crate::error::{GraphError, Result};
use crate::model::derived_exit_state;
use crate::types::{AdapterGraph, ChildElement, FlowEdge, FlowNode};

/// Serialize a graph to its `<Adapter>` configuration fragment.
pub fn serialize_adapter(graph: &AdapterGraph, schema: &SchemaIndex) -> Result<String> {
    let mut seen = HashSet::new();
    for node in graph.nodes.iter().filter(|n| !n.is_entry()) {
        if !seen.insert(node.name.as_str()) {
            return Err(GraphError::DuplicateNodeName(node.name.clone()));
        }
    }

    let entry_target = graph
        .entry_node()
        .and_then(|node| graph.outgoing_edges(&node.id).next())
        .map(|edge| edge.target.clone());

    let mut receivers: Vec<&FlowNode> = Vec::new();
    let mut exits: Vec<&FlowNode> = Vec::new();
    let mut pipes: Vec<&FlowNode> = Vec::new();
    for node in traversal_order(graph, entry_target.as_deref()) {
        match node.element.as_deref().map(ElementKind::from_element_name) {
            Some(ElementKind::Receiver) => receivers.push(node),
            Some(ElementKind::Exit) => exits.push(node),
            Some(_) => pipes.push(node),
            None => {}
        }
    }

    let first_pipe = entry_target
        .as_deref()
        .and_then(|id| graph.find_node(id))
        .map(|node| node.name.clone());

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let mut adapter = BytesStart::new("Adapter");
    adapter.push_attribute(("name", graph.name.as_str()));
    if let Some(description) = &graph.description {
        adapter.push_attribute(("description", description.as_str()));
    }
    writer.write_event(Event::Start(adapter))?;

    for node in &receivers {
        write_node(&mut writer, graph, schema, node)?;
    }

    let mut pipeline = BytesStart::new("Pipeline");
    if let Some(first_pipe) = &first_pipe {
        pipeline.push_attribute(("firstPipe", first_pipe.as_str()));
    }
    writer.write_event(Event::Start(pipeline))?;

    if !exits.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("Exits")))?;
        for node in &exits {
            write_exit(&mut writer, graph, node)?;
        }
        writer.write_event(Event::End(BytesEnd::new("Exits")))?;
    }

    for node in &pipes {
        write_node(&mut writer, graph, schema, node)?;
    }

    writer.write_event(Event::End(BytesEnd::new("Pipeline")))?;
    writer.write_event(Event::End(BytesEnd::new("Adapter")))?;

    let text = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    debug!("serialized adapter '{}' ({} bytes)", graph.name, text.len());
    Ok(text)
}

/// Depth-first order over outgoing edges, starting at the entry edge's
/// target; whatever stays unreached keeps node insertion order.
fn traversal_order<'a>(graph: &'a AdapterGraph, entry_target: Option<&str>) -> Vec<&'a FlowNode> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut order: Vec<&FlowNode> = Vec::new();
    let mut stack: Vec<&FlowNode> = Vec::new();

    let mut roots: Vec<&FlowNode> = Vec::new();
    if let Some(target) = entry_target {
        if let Some(node) = graph.find_node(target) {
            roots.push(node);
        }
    }
    for node in graph.nodes.iter().filter(|n| !n.is_entry()) {
        roots.push(node);
    }

    for root in roots {
        stack.push(root);
        while let Some(node) = stack.pop() {
            if !visited.insert(node.id.as_str()) {
                continue;
            }
            order.push(node);
            let mut targets: Vec<&FlowNode> = graph
                .edges
                .iter()
                .filter(|e| e.source == node.id)
                .filter_map(|e| graph.find_node(&e.target))
                .collect();
            targets.reverse();
            stack.extend(targets);
        }
    }
    order
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    graph: &AdapterGraph,
    schema: &SchemaIndex,
    node: &FlowNode,
) -> Result<()> {
    let Some(element_type) = node.element.as_deref() else {
        return Ok(());
    };

    let mut start = BytesStart::new(element_type);
    start.push_attribute(("name", node.name.as_str()));
    let definition = schema.lookup(element_type);
    for (attribute, value) in &node.attributes {
        // Attributes sitting at their schema default stay implicit.
        let is_default = definition
            .and_then(|d| d.attribute(attribute))
            .and_then(|a| a.default.as_deref())
            .map(|default| default == value.as_str())
            .unwrap_or(false);
        if !is_default {
            start.push_attribute((attribute.as_str(), value.as_str()));
        }
    }

    let forwards: Vec<&FlowEdge> = graph.edges.iter().filter(|e| e.source == node.id).collect();

    if node.children.is_empty() && forwards.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &node.children {
        write_child(writer, child)?;
    }
    for edge in forwards {
        write_forward(writer, graph, edge)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element_type)))?;
    Ok(())
}

fn write_child(writer: &mut Writer<Vec<u8>>, child: &ChildElement) -> Result<()> {
    let mut start = BytesStart::new(child.element.as_str());
    if let Some(name) = &child.name {
        start.push_attribute(("name", name.as_str()));
    }
    for (attribute, value) in &child.attributes {
        start.push_attribute((attribute.as_str(), value.as_str()));
    }
    if child.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for nested in &child.children {
        write_child(writer, nested)?;
    }
    writer.write_event(Event::End(BytesEnd::new(child.element.as_str())))?;
    Ok(())
}

/// Every edge serializes as a forward under its source element. The label
/// attribute is only written when it differs from the default (the
/// uppercased handle), keeping round-trips exact.
fn write_forward(writer: &mut Writer<Vec<u8>>, graph: &AdapterGraph, edge: &FlowEdge) -> Result<()> {
    let Some(target) = graph.find_node(&edge.target) else {
        return Ok(());
    };
    let mut forward = BytesStart::new("Forward");
    forward.push_attribute(("name", edge.source_handle.as_str()));
    forward.push_attribute(("path", target.name.as_str()));
    if edge.label != edge.source_handle.to_uppercase() {
        forward.push_attribute(("label", edge.label.as_str()));
    }
    writer.write_event(Event::Empty(forward))?;
    Ok(())
}

fn write_exit(writer: &mut Writer<Vec<u8>>, graph: &AdapterGraph, node: &FlowNode) -> Result<()> {
    let mut start = BytesStart::new("Exit");
    start.push_attribute(("name", node.name.as_str()));
    let state = node
        .attributes
        .get("state")
        .cloned()
        .unwrap_or_else(|| derived_exit_state(&node.name).to_string());
    start.push_attribute(("state", state.as_str()));
    for (attribute, value) in &node.attributes {
        if attribute != "state" {
            start.push_attribute((attribute.as_str(), value.as_str()));
        }
    }

    let forwards: Vec<&FlowEdge> = graph.edges.iter().filter(|e| e.source == node.id).collect();
    if forwards.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for edge in forwards {
        write_forward(writer, graph, edge)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Exit")))?;
    Ok(())
}
