//! Handle derivation for graph nodes
//!
//! The handle set of a node is computed from its element type's declared
//! forwards on every call and never cached on the node, so a schema reload
//! is reflected immediately.

use crate::definition::ForwardDefinition;

/// Name of the implicit happy-path handle every node carries
pub const SUCCESS_HANDLE: &str = "success";

/// Handle surfaced in place of a declared `*` wildcard forward
pub const CUSTOM_HANDLE: &str = "custom";

/// Wildcard forward name as it appears in the schema
pub const WILDCARD_FORWARD: &str = "*";

/// Compute the ordered handle set for an element's declared forwards.
///
/// Every element gets the implicit `success` handle, even with no declared
/// forwards at all. A `*` wildcard declaration surfaces as `custom`, never
/// as a literal `*`. The remaining forwards keep their declared order, with
/// duplicates collapsed.
pub fn resolve_handles(forwards: Option<&[ForwardDefinition]>) -> Vec<String> {
    let mut handles = vec![SUCCESS_HANDLE.to_string()];

    let Some(forwards) = forwards else {
        return handles;
    };

    if forwards.iter().any(|f| f.name == WILDCARD_FORWARD) {
        handles.push(CUSTOM_HANDLE.to_string());
    }

    for forward in forwards {
        if forward.name == WILDCARD_FORWARD {
            continue;
        }
        if !handles.iter().any(|h| *h == forward.name) {
            handles.push(forward.name.clone());
        }
    }

    handles
}
