//! Emit string templates.
//!
//! Every instruction pattern carries a template describing the assembly text
//! to emit for a match of it. A template is an ordered list of lines, each
//! an ordered list of parts; a part is either verbatim text or a reference
//! to a pattern node whose assigned constant, location, or block is spliced
//! in at emission time.

use serde::{Deserialize, Serialize};

use crate::ir::NodeId;

/// One part of an emit string line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmitStringPart {
    /// Literal text emitted as-is
    Verbatim(String),
    /// The integer constant bound to the given value node
    IntConstOf(NodeId),
    /// The location assigned to the given value node
    LocationOf(NodeId),
    /// The name of the block represented by the given block node
    NameOfBlock(NodeId),
    /// The block a given datum is defined in
    BlockOf(NodeId),
    /// A local temporary; identical indices within one template resolve to
    /// the same freshly uniqued name at emission time
    LocalTemporary(usize),
    /// The callee name of the given call node
    FuncOfCall(NodeId),
}

impl EmitStringPart {
    /// Returns the pattern node this part references, if any.
    #[must_use]
    pub fn referenced_node(&self) -> Option<NodeId> {
        match self {
            EmitStringPart::Verbatim(_) | EmitStringPart::LocalTemporary(_) => None,
            EmitStringPart::IntConstOf(n)
            | EmitStringPart::LocationOf(n)
            | EmitStringPart::NameOfBlock(n)
            | EmitStringPart::BlockOf(n)
            | EmitStringPart::FuncOfCall(n) => Some(*n),
        }
    }
}

/// An emit template: ordered lines of ordered parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitStringTemplate {
    /// The lines of the template
    pub lines: Vec<Vec<EmitStringPart>>,
}

impl EmitStringTemplate {
    /// Creates an empty template.
    #[must_use]
    pub fn new() -> Self {
        EmitStringTemplate::default()
    }

    /// Returns, line by line and part by part, the pattern node referenced
    /// by each part (`None` for verbatim parts and local temporaries).
    ///
    /// This is the shape the model builder turns into the per-match
    /// `asm-str-node-maps` once pattern nodes are translated to function
    /// nodes.
    #[must_use]
    pub fn node_references(&self) -> Vec<Vec<Option<NodeId>>> {
        self.lines
            .iter()
            .map(|line| line.iter().map(EmitStringPart::referenced_node).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_references_align_with_parts() {
        let template = EmitStringTemplate {
            lines: vec![vec![
                EmitStringPart::Verbatim("add ".into()),
                EmitStringPart::LocationOf(NodeId::new(2)),
                EmitStringPart::Verbatim(", ".into()),
                EmitStringPart::LocationOf(NodeId::new(0)),
                EmitStringPart::LocalTemporary(0),
            ]],
        };
        assert_eq!(
            template.node_references(),
            vec![vec![
                None,
                Some(NodeId::new(2)),
                None,
                Some(NodeId::new(0)),
                None
            ]]
        );
    }
}
