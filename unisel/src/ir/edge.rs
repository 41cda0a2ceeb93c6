//! Edge kinds and per-endpoint edge numbering.
//!
//! Every edge carries a kind plus two *edge numbers*: its position among the
//! out-edges of its source and among the in-edges of its target. Numbers are
//! scoped per (endpoint, kind): within one kind at one endpoint they are
//! unique, but the same number may appear again under another kind or at
//! another endpoint. For a freshly built graph the numbers of each
//! (endpoint, kind) scope are contiguous starting at 0; batch mutations may
//! leave gaps that are only re-packed explicitly.

use serde::{Deserialize, Serialize};

/// The kind of a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeKind {
    /// A value flowing from a definition to a use
    DataFlow,
    /// Control transferring between blocks and control operations
    ControlFlow,
    /// Program state threading between side-effecting operations
    StateFlow,
    /// Placement of an entity's definition into a block
    DefPlacement,
    /// A value tied to the location of another value
    Reuse,
}

impl EdgeKind {
    /// All edge kinds, in a fixed order.
    pub const ALL: [EdgeKind; 5] = [
        EdgeKind::DataFlow,
        EdgeKind::ControlFlow,
        EdgeKind::StateFlow,
        EdgeKind::DefPlacement,
        EdgeKind::Reuse,
    ];
}

/// Direction of an edge relative to an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Edges entering the endpoint
    In,
    /// Edges leaving the endpoint
    Out,
}

/// The label of an edge: its kind and its per-endpoint numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeLabel {
    /// Kind of the edge
    pub kind: EdgeKind,
    /// Position among the out-edges of the source, scoped to `kind`
    pub out_nr: u32,
    /// Position among the in-edges of the target, scoped to `kind`
    pub in_nr: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_lists_every_kind() {
        assert_eq!(EdgeKind::ALL.len(), 5);
        assert!(EdgeKind::ALL.contains(&EdgeKind::Reuse));
    }
}
