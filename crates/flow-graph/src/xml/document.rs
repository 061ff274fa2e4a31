//! Whole-configuration splicing
//!
//! A configuration document holds many adapters, but the editor only ever
//! rewrites one at a time. Everything outside the edited adapter's byte
//! span (comments, sibling adapters, whitespace) must come through a save
//! untouched, so the document is never reserialized. Adapters are located
//! by byte offset and spliced as raw text.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{GraphError, Result};

struct AdapterSpan {
    name: String,
    start: usize,
    end: usize,
}

/// Names of the adapters in a configuration, in document order.
pub fn adapter_names(text: &str) -> Result<Vec<String>> {
    Ok(adapter_spans(text)?.into_iter().map(|span| span.name).collect())
}

/// The exact `<Adapter>` fragment for one adapter, byte for byte.
pub fn extract_adapter(text: &str, name: &str) -> Result<Option<String>> {
    let span = adapter_spans(text)?.into_iter().find(|span| span.name == name);
    Ok(span.map(|span| text[span.start..span.end].to_string()))
}

/// Replace one adapter's fragment, leaving every other byte of the
/// document as it was.
pub fn replace_adapter(text: &str, name: &str, fragment: &str) -> Result<String> {
    let span = adapter_spans(text)?
        .into_iter()
        .find(|span| span.name == name)
        .ok_or_else(|| GraphError::AdapterNotFound(name.to_string()))?;
    Ok(format!(
        "{}{}{}",
        &text[..span.start],
        fragment,
        &text[span.end..]
    ))
}

/// Insert a new adapter fragment just before the configuration's closing
/// tag.
pub fn insert_adapter(text: &str, fragment: &str) -> Result<String> {
    let mut reader = Reader::from_str(text);
    let mut close_at: Option<usize> = None;
    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::End(end) if end.name().as_ref() == b"Configuration" => {
                close_at = Some(before);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    let Some(close_at) = close_at else {
        return Err(GraphError::Parse(
            "document has no closing Configuration tag".to_string(),
        ));
    };
    Ok(format!(
        "{}{}\n{}",
        &text[..close_at],
        fragment,
        &text[close_at..]
    ))
}

/// Byte spans of every top-level adapter. Text is read without trimming
/// so offsets index the original document exactly.
fn adapter_spans(text: &str) -> Result<Vec<AdapterSpan>> {
    let mut reader = Reader::from_str(text);
    let mut spans = Vec::new();
    let mut open: Option<(String, usize)> = None;
    let mut depth = 0usize;

    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(start) if start.name().as_ref() == b"Adapter" => {
                if open.is_none() {
                    open = Some((adapter_name(&start)?, before));
                } else {
                    depth += 1;
                }
            }
            Event::Empty(start) if start.name().as_ref() == b"Adapter" => {
                if open.is_none() {
                    spans.push(AdapterSpan {
                        name: adapter_name(&start)?,
                        start: before,
                        end: reader.buffer_position() as usize,
                    });
                }
            }
            Event::End(end) if end.name().as_ref() == b"Adapter" => {
                if depth > 0 {
                    depth -= 1;
                } else if let Some((name, start)) = open.take() {
                    spans.push(AdapterSpan {
                        name,
                        start,
                        end: reader.buffer_position() as usize,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(spans)
}

fn adapter_name(start: &BytesStart<'_>) -> Result<String> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| GraphError::Parse(e.to_string()))?;
        if attr.key.as_ref() == b"name" {
            return Ok(attr
                .unescape_value()
                .map_err(|e| GraphError::Parse(e.to_string()))?
                .into_owned());
        }
    }
    Err(GraphError::Parse("adapter has no name attribute".to_string()))
}
