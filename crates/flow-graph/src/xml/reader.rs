//! Adapter configuration parsing
//!
//! Builds the graph strictly through [`GraphModel`] operations, so a parsed
//! graph satisfies the same invariants as an interactively built one. The
//! parse is all-or-nothing: any failure drops the partial graph.

use std::collections::BTreeMap;

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use frank_doc::{ElementKind, SchemaIndex, SUCCESS_HANDLE};

use crate::error::{GraphError, Result};
use crate::model::GraphModel;
use crate::types::NodeId;

struct RawElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<RawElement>,
}

impl RawElement {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse one `<Adapter>` fragment into a graph model.
pub fn parse_adapter(text: &str, schema: &SchemaIndex) -> Result<GraphModel> {
    let root = read_tree(text)?;
    if root.tag != "Adapter" {
        return Err(GraphError::Parse(format!(
            "expected an Adapter fragment, found <{}>",
            root.tag
        )));
    }
    let name = root
        .attr("name")
        .ok_or_else(|| GraphError::Parse("adapter has no name attribute".to_string()))?
        .to_string();

    let mut model = GraphModel::new(name);
    if let Some(description) = root.attr("description") {
        model.set_description(Some(description.to_string()));
    }

    // Node names resolve forward paths, so nodes come first, edges second.
    let mut names: BTreeMap<String, NodeId> = BTreeMap::new();
    let mut placed: Vec<(NodeId, &RawElement)> = Vec::new();

    for element in root.children.iter().filter(|c| c.tag == "Receiver") {
        let id = add_element_node(&mut model, schema, element, &mut names)?;
        placed.push((id, element));
    }

    let pipeline = root.children.iter().find(|c| c.tag == "Pipeline");
    let mut first_pipe: Option<&str> = None;
    if let Some(pipeline) = pipeline {
        first_pipe = pipeline.attr("firstPipe");
        for element in &pipeline.children {
            if element.tag == "Exits" {
                for exit in &element.children {
                    let id = add_exit_node(&mut model, schema, exit, &mut names)?;
                    placed.push((id, exit));
                }
            } else {
                let id = add_element_node(&mut model, schema, element, &mut names)?;
                placed.push((id, element));
            }
        }
    }

    for (source_id, element) in &placed {
        connect_forwards(&mut model, schema, source_id, element, &names)?;
    }

    if let Some(first_pipe) = first_pipe {
        let Some(target_id) = names.get(first_pipe).cloned() else {
            return Err(GraphError::DanglingForward {
                node: "Pipeline".to_string(),
                handle: SUCCESS_HANDLE.to_string(),
                path: first_pipe.to_string(),
            });
        };
        let entry = model.entry_id().to_string();
        model.add_edge(schema, &entry, SUCCESS_HANDLE, &target_id, None)?;
    }

    debug!(
        "parsed adapter '{}': {} node(s), {} edge(s)",
        model.graph().name,
        model.graph().nodes.len(),
        model.graph().edges.len()
    );
    Ok(model)
}

fn add_element_node(
    model: &mut GraphModel,
    schema: &SchemaIndex,
    element: &RawElement,
    names: &mut BTreeMap<String, NodeId>,
) -> Result<NodeId> {
    let mut attributes = collect_attributes(element);
    // An exit's state canonicalizes against its final name, so it is held
    // back until the name from the fragment is in place.
    let deferred_state = match ElementKind::from_element_name(&element.tag) {
        ElementKind::Exit => attributes.remove("state"),
        _ => None,
    };

    let id = model.add_node(schema, &element.tag, attributes)?;
    if let Some(name) = element.attr("name") {
        model.set_name(&id, name)?;
    }
    if let Some(state) = deferred_state {
        model.set_attribute(schema, &id, "state", &state)?;
    }
    if let Some(node) = model.graph().find_node(&id) {
        names.insert(node.name.clone(), id.clone());
    }

    for child in &element.children {
        add_child_tree(model, schema, &id, None, child)?;
    }
    Ok(id)
}

fn add_exit_node(
    model: &mut GraphModel,
    schema: &SchemaIndex,
    exit: &RawElement,
    names: &mut BTreeMap<String, NodeId>,
) -> Result<NodeId> {
    if exit.tag != "Exit" {
        return Err(GraphError::Parse(format!(
            "unexpected <{}> inside Exits",
            exit.tag
        )));
    }
    if exit.attr("name").is_none() {
        return Err(GraphError::Parse("exit has no name attribute".to_string()));
    }
    add_element_node(model, schema, exit, names)
}

fn add_child_tree(
    model: &mut GraphModel,
    schema: &SchemaIndex,
    node_id: &str,
    parent_child: Option<&str>,
    element: &RawElement,
) -> Result<()> {
    if element.tag == "Forward" {
        return Ok(());
    }
    let child_id = model.add_child(
        schema,
        node_id,
        parent_child,
        &element.tag,
        collect_attributes(element),
    )?;
    if let Some(name) = element.attr("name") {
        model.set_child_name(node_id, &child_id, Some(name.to_string()))?;
    }
    for nested in &element.children {
        add_child_tree(model, schema, node_id, Some(&child_id), nested)?;
    }
    Ok(())
}

fn connect_forwards(
    model: &mut GraphModel,
    schema: &SchemaIndex,
    source_id: &str,
    element: &RawElement,
    names: &BTreeMap<String, NodeId>,
) -> Result<()> {
    for forward in element.children.iter().filter(|c| c.tag == "Forward") {
        let handle = forward.attr("name").unwrap_or(SUCCESS_HANDLE);
        let Some(path) = forward.attr("path") else {
            return Err(GraphError::Parse(format!(
                "forward '{handle}' has no path attribute"
            )));
        };
        let Some(target_id) = names.get(path).cloned() else {
            let node = model
                .graph()
                .find_node(source_id)
                .map(|n| n.name.clone())
                .unwrap_or_default();
            return Err(GraphError::DanglingForward {
                node,
                handle: handle.to_string(),
                path: path.to_string(),
            });
        };
        let label = forward.attr("label");
        model.add_edge(schema, source_id, handle, &target_id, label)?;
    }
    Ok(())
}

fn collect_attributes(element: &RawElement) -> BTreeMap<String, String> {
    element
        .attributes
        .iter()
        .filter(|(key, _)| key.as_str() != "name")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn read_tree(text: &str) -> Result<RawElement> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut stack: Vec<RawElement> = Vec::new();
    let mut root: Option<RawElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(GraphError::Parse("unbalanced closing tag".to_string()));
                };
                attach(&mut stack, &mut root, element)?;
            }
            Event::Eof => break,
            // Text, comments and declarations carry nothing the graph keeps.
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(GraphError::Parse("unclosed element".to_string()));
    }
    root.ok_or_else(|| GraphError::Parse("no root element".to_string()))
}

fn attach(
    stack: &mut [RawElement],
    root: &mut Option<RawElement>,
    element: RawElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_some() {
                return Err(GraphError::Parse("multiple root elements".to_string()));
            }
            *root = Some(element);
        }
    }
    Ok(())
}

fn element_from_start(start: &BytesStart<'_>) -> Result<RawElement> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| GraphError::Parse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| GraphError::Parse(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(RawElement {
        tag,
        attributes,
        children: Vec::new(),
    })
}
