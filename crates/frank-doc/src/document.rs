//! Raw FrankDoc document types
//!
//! These records mirror the schema JSON as served by the FrankDoc generator.
//! Declaration order of elements, attributes, forwards and labels is
//! semantically meaningful (palette ordering, handle ordering), so the
//! map-shaped tables are parsed into insertion-ordered key/value lists
//! instead of hash maps.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// JSON object parsed as an ordered list of key/value pairs
#[derive(Debug, Clone)]
pub struct OrderedMap<V>(Vec<(String, V)>);

// Not derived: the derive would demand V: Default, and absent tables must
// default to empty for payload types without one.
impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    /// Iterate entries in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Linear lookup by key
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k.as_str() == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k.as_str() == key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Top-level FrankDoc document.
///
/// The element table is the one part the index cannot live without; every
/// other table degrades to empty when absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrankDoc {
    #[serde(default)]
    pub metadata: Metadata,
    pub elements: OrderedMap<ElementClass>,
    #[serde(default)]
    pub element_names: OrderedMap<ElementInfo>,
    #[serde(default)]
    pub enums: OrderedMap<EnumValues>,
    #[serde(default)]
    pub labels: OrderedMap<Vec<String>>,
}

/// Document metadata
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub version: String,
}

/// One class entry in the element table, keyed by fully qualified class name
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementClass {
    pub name: String,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub deprecated: Option<DeprecationInfo>,
    #[serde(default)]
    pub description: Option<String>,
    /// Fully qualified class name of the parent, if any
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub attributes: OrderedMap<RawAttribute>,
    #[serde(default)]
    pub children: Vec<RawChild>,
    #[serde(default)]
    pub forwards: OrderedMap<RawForward>,
}

/// Deprecation marker carried by elements and attributes
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeprecationInfo {
    #[serde(default)]
    pub for_removal: bool,
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Attribute declaration as it appears on the wire
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttribute {
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
    /// Name of the enumeration restricting this attribute's values
    #[serde(default, rename = "enum")]
    pub enum_ref: Option<String>,
    #[serde(default)]
    pub deprecated: Option<DeprecationInfo>,
}

/// Nested element slot declaration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChild {
    #[serde(default)]
    pub multiple: bool,
    pub role_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub type_ref: Option<String>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub deprecated: bool,
}

/// Forward declaration; the forward name is the key in the owning map
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawForward {
    #[serde(default)]
    pub description: Option<String>,
}

/// Label assignments and owning class for one element name
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    /// Label per label group, e.g. `Components` -> `Senders`
    #[serde(default)]
    pub labels: OrderedMap<String>,
    pub class_name: String,
}

/// One symbolic constant of an enumeration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValue {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

/// Map of symbolic value to its metadata, in declared order
pub type EnumValues = OrderedMap<EnumValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_map_preserves_document_order() {
        let doc: FrankDoc = serde_json::from_str(
            r#"{
                "metadata": { "version": "1.0" },
                "elements": {
                    "org.example.ZebraPipe": { "name": "ZebraPipe" },
                    "org.example.AlphaPipe": { "name": "AlphaPipe" },
                    "org.example.MiddlePipe": { "name": "MiddlePipe" }
                }
            }"#,
        )
        .unwrap();

        let keys: Vec<&str> = doc.elements.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "org.example.ZebraPipe",
                "org.example.AlphaPipe",
                "org.example.MiddlePipe"
            ]
        );
    }

    #[test]
    fn missing_element_table_is_an_error() {
        let result = serde_json::from_str::<FrankDoc>(r#"{ "metadata": { "version": "1.0" } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn abstract_keyword_maps_onto_flag() {
        let doc: FrankDoc = serde_json::from_str(
            r#"{
                "elements": {
                    "org.example.AbstractPipe": { "name": "AbstractPipe", "abstract": true },
                    "org.example.EchoPipe": { "name": "EchoPipe" }
                }
            }"#,
        )
        .unwrap();

        assert!(doc.elements.get("org.example.AbstractPipe").unwrap().is_abstract);
        assert!(!doc.elements.get("org.example.EchoPipe").unwrap().is_abstract);
    }

    #[test]
    fn enum_values_keep_declared_order() {
        let doc: FrankDoc = serde_json::from_str(
            r#"{
                "elements": {},
                "enums": {
                    "org.example.HttpMethod": {
                        "POST": { "description": "Request with a body" },
                        "GET": {},
                        "DELETE": { "deprecated": true }
                    }
                }
            }"#,
        )
        .unwrap();

        let values = doc.enums.get("org.example.HttpMethod").unwrap();
        let names: Vec<&str> = values.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["POST", "GET", "DELETE"]);
        assert!(values.get("DELETE").unwrap().deprecated);
    }

    #[test]
    fn absent_tables_default_to_empty() {
        let doc: FrankDoc = serde_json::from_str(
            r#"{ "elements": { "org.example.EchoPipe": { "name": "EchoPipe" } } }"#,
        )
        .unwrap();

        assert_eq!(doc.elements.len(), 1);
        assert!(doc.element_names.is_empty());
        assert!(doc.enums.is_empty());
        assert!(doc.labels.is_empty());
        assert_eq!(doc.metadata.version, "");
    }

    #[test]
    fn unknown_top_level_tables_are_ignored() {
        let doc: FrankDoc = serde_json::from_str(
            r#"{
                "elements": {},
                "types": { "whatever": ["org.example.EchoPipe"] },
                "properties": [],
                "credentialProviders": []
            }"#,
        )
        .unwrap();
        assert!(doc.elements.is_empty());
    }
}
