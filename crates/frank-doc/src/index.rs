//! Normalized schema index
//!
//! Parses the raw FrankDoc document once into flattened element definitions
//! plus palette filters. Building is all-or-nothing: a structurally
//! malformed document produces an error and no partial index. Lesser
//! irregularities (dangling enum or parent references, duplicate element
//! names) degrade with a warning so one bad entry cannot take the whole
//! schema down.

use std::collections::HashMap;

use log::{debug, warn};
use serde::Serialize;

use crate::definition::{
    AttributeDefinition, AttributeKind, ChildRule, ElementDefinition, ElementKind, EnumDefinition,
    EnumSymbol, ForwardDefinition,
};
use crate::document::{ElementClass, FrankDoc, RawAttribute};
use crate::error::{Result, SchemaError};

/// Name of the label group driving palette navigation and child acceptance
pub const COMPONENTS_GROUP: &str = "Components";

/// Bucket for elements that carry no label for a group
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Palette grouping of element type names, derived from the label tables
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    pub groups: Vec<FilterGroup>,
}

/// One label group, e.g. `Components`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroup {
    pub name: String,
    pub categories: Vec<FilterCategory>,
}

/// One category within a group, holding element type names
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCategory {
    pub name: String,
    pub elements: Vec<String>,
}

impl Filters {
    pub fn group(&self, name: &str) -> Option<&FilterGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}

impl FilterGroup {
    pub fn category(&self, name: &str) -> Option<&FilterCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Category the element was sorted into, if any
    pub fn category_of(&self, element: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.elements.iter().any(|e| e == element))
            .map(|c| c.name.as_str())
    }
}

/// Normalized, immutable lookup over one loaded schema document
#[derive(Debug, Clone)]
pub struct SchemaIndex {
    version: String,
    elements: Vec<ElementDefinition>,
    by_name: HashMap<String, usize>,
    enums: Vec<EnumDefinition>,
    enums_by_name: HashMap<String, usize>,
    filters: Filters,
}

impl SchemaIndex {
    /// Parse and normalize a raw schema document.
    ///
    /// Fails when the document is not valid JSON or lacks the element
    /// table; nothing is retained from a failed build.
    pub fn build(raw: &str) -> Result<Self> {
        let doc: FrankDoc =
            serde_json::from_str(raw).map_err(|e| SchemaError::Malformed(e.to_string()))?;
        Ok(Self::from_document(doc))
    }

    fn from_document(doc: FrankDoc) -> Self {
        let mut enums = Vec::new();
        let mut enums_by_name = HashMap::new();
        for (name, values) in doc.enums.iter() {
            let symbols = values
                .iter()
                .map(|(symbol, value)| EnumSymbol {
                    name: symbol.to_string(),
                    description: value.description.clone(),
                    deprecated: value.deprecated,
                })
                .collect();
            enums_by_name.insert(name.to_string(), enums.len());
            enums.push(EnumDefinition {
                name: name.to_string(),
                values: symbols,
            });
        }

        let mut elements: Vec<ElementDefinition> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        for (class_name, class) in doc.elements.iter() {
            if class.is_abstract {
                continue;
            }
            if by_name.contains_key(&class.name) {
                warn!(
                    "duplicate element type '{}' ({class_name}), keeping the first definition",
                    class.name
                );
                continue;
            }
            let definition = normalize_element(&doc, class_name, class, &enums_by_name);
            by_name.insert(definition.name.clone(), elements.len());
            elements.push(definition);
        }

        let filters = derive_filters(&doc, &elements);

        debug!(
            "schema indexed: {} element types, {} enums, {} filter groups (version {})",
            elements.len(),
            enums.len(),
            filters.groups.len(),
            if doc.metadata.version.is_empty() {
                "unknown"
            } else {
                doc.metadata.version.as_str()
            },
        );

        Self {
            version: doc.metadata.version,
            elements,
            by_name,
            enums,
            enums_by_name,
            filters,
        }
    }

    /// Schema version string from the document metadata
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Look up an element type by its simple name
    pub fn lookup(&self, element_type: &str) -> Option<&ElementDefinition> {
        self.by_name.get(element_type).map(|&i| &self.elements[i])
    }

    /// All element type names in schema document order
    pub fn all_type_names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|e| e.name.as_str())
    }

    /// All element definitions in schema document order
    pub fn all_elements(&self) -> impl Iterator<Item = &ElementDefinition> {
        self.elements.iter()
    }

    /// Palette filters derived from the label tables
    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Enumeration referenced by an attribute definition
    pub fn enum_values(&self, name: &str) -> Option<&EnumDefinition> {
        self.enums_by_name.get(name).map(|&i| &self.enums[i])
    }

    /// Number of instantiable element types
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether `parent_type` declares a slot accepting `child_type`.
    ///
    /// A slot matches on its role name directly (case-insensitive), or when
    /// the child belongs to the category of the `Components` group named
    /// after the pluralized role, e.g. role `sender` matching anything in
    /// the `Senders` category.
    pub fn accepts_child(&self, parent_type: &str, child_type: &str) -> bool {
        let Some(parent) = self.lookup(parent_type) else {
            return false;
        };
        let child_lower = child_type.to_lowercase();
        let components = self.filters.group(COMPONENTS_GROUP);

        parent.children.iter().any(|rule| {
            let role = rule.role_name.to_lowercase();
            if role == child_lower {
                return true;
            }
            let Some(group) = components else {
                return false;
            };
            group
                .category(&pluralize_role(&role))
                .map(|category| category.elements.iter().any(|e| e.to_lowercase() == child_lower))
                .unwrap_or(false)
        })
    }
}

/// `sender` -> `Senders`, the category naming convention of the label table
fn pluralize_role(role: &str) -> String {
    let mut key = String::with_capacity(role.len() + 1);
    let mut chars = role.chars();
    if let Some(first) = chars.next() {
        key.extend(first.to_uppercase());
        key.push_str(chars.as_str());
    }
    if !key.ends_with('s') {
        key.push('s');
    }
    key
}

fn normalize_element(
    doc: &FrankDoc,
    class_name: &str,
    class: &ElementClass,
    enums_by_name: &HashMap<String, usize>,
) -> ElementDefinition {
    // Collect the inheritance chain, derived class first.
    let mut chain: Vec<&ElementClass> = vec![class];
    let mut visited: Vec<&str> = vec![class_name];
    let mut parent = class.parent.as_deref();
    while let Some(parent_name) = parent {
        if visited.iter().any(|v| *v == parent_name) {
            warn!(
                "inheritance cycle at '{parent_name}' while resolving '{}'",
                class.name
            );
            break;
        }
        visited.push(parent_name);
        match doc.elements.get(parent_name) {
            Some(parent_class) => {
                chain.push(parent_class);
                parent = parent_class.parent.as_deref();
            }
            None => {
                warn!("unknown parent '{parent_name}' while resolving '{}'", class.name);
                break;
            }
        }
    }

    // Walking derived-to-base with first-wins merging keeps the derived
    // declaration order and lets subclasses shadow inherited declarations.
    let mut attributes: Vec<AttributeDefinition> = Vec::new();
    let mut forwards: Vec<ForwardDefinition> = Vec::new();
    let mut children: Vec<ChildRule> = Vec::new();
    for link in &chain {
        for (name, raw) in link.attributes.iter() {
            if attributes.iter().any(|a| a.name == name) {
                continue;
            }
            attributes.push(normalize_attribute(name, raw, &class.name, enums_by_name));
        }
        for (name, raw) in link.forwards.iter() {
            if forwards.iter().any(|f| f.name == name) {
                continue;
            }
            forwards.push(ForwardDefinition {
                name: name.to_string(),
                description: raw.description.clone(),
            });
        }
        for child in &link.children {
            if children.iter().any(|c| c.role_name == child.role_name) {
                continue;
            }
            children.push(ChildRule {
                role_name: child.role_name.clone(),
                multiple: child.multiple,
                type_ref: child.type_ref.clone(),
            });
        }
    }

    let labels = doc
        .element_names
        .get(&class.name)
        .map(|info| {
            info.labels
                .iter()
                .map(|(group, value)| (group.to_string(), value.clone()))
                .collect()
        })
        .unwrap_or_default();

    ElementDefinition {
        name: class.name.clone(),
        kind: ElementKind::from_element_name(&class.name),
        description: class.description.clone(),
        deprecated: class.deprecated.as_ref().map(Into::into),
        attributes,
        forwards,
        children,
        labels,
    }
}

fn normalize_attribute(
    name: &str,
    raw: &RawAttribute,
    element: &str,
    enums_by_name: &HashMap<String, usize>,
) -> AttributeDefinition {
    let enum_ref = match &raw.enum_ref {
        Some(reference) if enums_by_name.contains_key(reference) => Some(reference.clone()),
        Some(reference) => {
            warn!(
                "attribute '{name}' on '{element}' references unknown enum '{reference}', \
                 treating it as plain text"
            );
            None
        }
        None => None,
    };

    AttributeDefinition {
        name: name.to_string(),
        kind: AttributeKind::from_raw(raw.kind.as_deref()),
        required: raw.mandatory,
        default: raw.default.clone(),
        enum_ref,
        description: raw.description.clone(),
        deprecated: raw.deprecated.as_ref().map(Into::into),
    }
}

fn derive_filters(doc: &FrankDoc, elements: &[ElementDefinition]) -> Filters {
    let mut groups = Vec::new();
    for (group_name, declared) in doc.labels.iter() {
        let mut categories: Vec<FilterCategory> = declared
            .iter()
            .map(|value| FilterCategory {
                name: value.clone(),
                elements: Vec::new(),
            })
            .collect();
        let mut uncategorized = Vec::new();

        for element in elements {
            match element.label(group_name) {
                Some(value) => match categories.iter_mut().find(|c| c.name == value) {
                    Some(category) => category.elements.push(element.name.clone()),
                    None => {
                        // Label values can appear on elements without being
                        // declared in the group's value list.
                        categories.push(FilterCategory {
                            name: value.to_string(),
                            elements: vec![element.name.clone()],
                        });
                    }
                },
                None => uncategorized.push(element.name.clone()),
            }
        }

        if !uncategorized.is_empty() {
            categories.push(FilterCategory {
                name: UNCATEGORIZED.to_string(),
                elements: uncategorized,
            });
        }
        groups.push(FilterGroup {
            name: group_name.to_string(),
            categories,
        });
    }
    Filters { groups }
}
