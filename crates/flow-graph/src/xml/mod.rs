//! Bidirectional mapping between adapter graphs and configuration XML
//!
//! [`serialize_adapter`] and [`parse_adapter`] translate a single adapter;
//! the document functions splice adapter fragments in and out of a larger
//! configuration file without disturbing any other byte of it.

mod document;
mod reader;
mod writer;

pub use document::{adapter_names, extract_adapter, insert_adapter, replace_adapter};
pub use reader::parse_adapter;
pub use writer::serialize_adapter;
