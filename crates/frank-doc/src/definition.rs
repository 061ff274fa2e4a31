//! Normalized schema records
//!
//! The wire document is keyed by class name and spreads declarations over a
//! parent chain. These are the flattened, instantiable records the rest of
//! the system works with.

use serde::Serialize;

use crate::document::DeprecationInfo;

/// Kind of pipeline component, classified from the element name suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Pipe,
    Listener,
    Receiver,
    Sender,
    Validator,
    Wrapper,
    Job,
    Exit,
    Other,
}

impl ElementKind {
    const SUFFIXES: [(&'static str, ElementKind); 8] = [
        ("pipe", ElementKind::Pipe),
        ("listener", ElementKind::Listener),
        ("receiver", ElementKind::Receiver),
        ("sender", ElementKind::Sender),
        ("validator", ElementKind::Validator),
        ("wrapper", ElementKind::Wrapper),
        ("job", ElementKind::Job),
        ("exit", ElementKind::Exit),
    ];

    /// Classify an element type name by its suffix, e.g. `HttpSender` -> `Sender`
    pub fn from_element_name(name: &str) -> Self {
        let lowered = name.to_lowercase();
        for (suffix, kind) in Self::SUFFIXES {
            if lowered.ends_with(suffix) {
                return kind;
            }
        }
        ElementKind::Other
    }
}

/// Declared value kind of an attribute.
///
/// Informational only; attribute values are stored and serialized as text
/// either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    #[default]
    String,
    Int,
    Bool,
}

impl AttributeKind {
    pub(crate) fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some("int") | Some("integer") | Some("long") | Some("number") => AttributeKind::Int,
            Some("bool") | Some("boolean") => AttributeKind::Bool,
            _ => AttributeKind::String,
        }
    }
}

/// Deprecation metadata on an element or attribute
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deprecation {
    pub for_removal: bool,
    pub since: Option<String>,
    pub description: Option<String>,
}

impl From<&DeprecationInfo> for Deprecation {
    fn from(raw: &DeprecationInfo) -> Self {
        Self {
            for_removal: raw.for_removal,
            since: raw.since.clone(),
            description: raw.description.clone(),
        }
    }
}

/// Fully resolved attribute declaration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    pub name: String,
    pub kind: AttributeKind,
    pub required: bool,
    /// Value the runtime assumes when the attribute is absent
    pub default: Option<String>,
    /// Name of the enumeration restricting this attribute, if any
    pub enum_ref: Option<String>,
    pub description: Option<String>,
    pub deprecated: Option<Deprecation>,
}

/// Declared outgoing branch of an element
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardDefinition {
    pub name: String,
    pub description: Option<String>,
}

/// Slot for a nested configuration element
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRule {
    /// Role the nested element plays, e.g. `listener` or `sender`
    pub role_name: String,
    /// Whether the slot accepts more than one element
    pub multiple: bool,
    pub type_ref: Option<String>,
}

/// One instantiable element type
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    /// Simple element name as used in configurations, e.g. `HttpSender`
    pub name: String,
    pub kind: ElementKind,
    pub description: Option<String>,
    pub deprecated: Option<Deprecation>,
    /// Own and inherited attributes, derived declarations first
    pub attributes: Vec<AttributeDefinition>,
    /// Own and inherited forwards in declared order
    pub forwards: Vec<ForwardDefinition>,
    /// Slots for nested configuration elements
    pub children: Vec<ChildRule>,
    /// Palette labels as (group, label) pairs
    pub labels: Vec<(String, String)>,
}

impl ElementDefinition {
    /// Look up a declared attribute by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Whether the element declares any explicit forwards
    pub fn has_forwards(&self) -> bool {
        !self.forwards.is_empty()
    }

    /// Label value for a group, if the element carries one
    pub fn label(&self, group: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(g, _)| g.as_str() == group)
            .map(|(_, v)| v.as_str())
    }
}

/// Enumeration referenced by attribute definitions
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDefinition {
    pub name: String,
    pub values: Vec<EnumSymbol>,
}

impl EnumDefinition {
    /// Exact, case-sensitive membership test
    pub fn contains(&self, symbol: &str) -> bool {
        self.values.iter().any(|v| v.name == symbol)
    }
}

/// One symbolic constant of an enumeration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumSymbol {
    pub name: String,
    pub description: Option<String>,
    pub deprecated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_kind_classification() {
        assert_eq!(ElementKind::from_element_name("EchoPipe"), ElementKind::Pipe);
        assert_eq!(ElementKind::from_element_name("JavaListener"), ElementKind::Listener);
        assert_eq!(ElementKind::from_element_name("Receiver"), ElementKind::Receiver);
        assert_eq!(ElementKind::from_element_name("HttpSender"), ElementKind::Sender);
        assert_eq!(ElementKind::from_element_name("XmlValidator"), ElementKind::Validator);
        assert_eq!(ElementKind::from_element_name("SoapWrapper"), ElementKind::Wrapper);
        assert_eq!(ElementKind::from_element_name("CleanupDatabaseJob"), ElementKind::Job);
        assert_eq!(ElementKind::from_element_name("Exit"), ElementKind::Exit);
        assert_eq!(ElementKind::from_element_name("Configuration"), ElementKind::Other);
    }

    #[test]
    fn classification_ignores_case() {
        assert_eq!(ElementKind::from_element_name("ECHOPIPE"), ElementKind::Pipe);
        assert_eq!(ElementKind::from_element_name("httpsender"), ElementKind::Sender);
    }

    #[test]
    fn attribute_kind_from_raw() {
        assert_eq!(AttributeKind::from_raw(Some("int")), AttributeKind::Int);
        assert_eq!(AttributeKind::from_raw(Some("number")), AttributeKind::Int);
        assert_eq!(AttributeKind::from_raw(Some("bool")), AttributeKind::Bool);
        assert_eq!(AttributeKind::from_raw(Some("string")), AttributeKind::String);
        assert_eq!(AttributeKind::from_raw(None), AttributeKind::String);
    }
}
