//! FrankDoc schema support for the flow studio
//!
//! The Frank!Framework publishes a generated JSON document (the FrankDoc)
//! describing every configurable element: attributes, enumerated values,
//! nested element slots and declared forwards. This crate ingests that
//! document and serves it to the graph model:
//!
//! - [`SchemaIndex`]: all-or-nothing parse into flattened element
//!   definitions, with inheritance resolved and palette filters derived
//! - [`resolve_handles`]: the ordered handle set for an element's forwards
//! - [`SchemaProvider`]: fetch-once/refresh lifecycle with single-flight
//!   loads and last-good retention

pub mod definition;
pub mod document;
pub mod error;
pub mod handles;
pub mod index;
pub mod provider;

// Re-export key types
pub use definition::{
    AttributeDefinition, AttributeKind, ChildRule, Deprecation, ElementDefinition, ElementKind,
    EnumDefinition, EnumSymbol, ForwardDefinition,
};
pub use error::{Result, SchemaError, TransportError};
pub use handles::{resolve_handles, CUSTOM_HANDLE, SUCCESS_HANDLE, WILDCARD_FORWARD};
pub use index::{FilterCategory, FilterGroup, Filters, SchemaIndex, COMPONENTS_GROUP, UNCATEGORIZED};
pub use provider::{ProviderStatus, SchemaProvider, SchemaSource};
