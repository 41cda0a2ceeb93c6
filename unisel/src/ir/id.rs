//! Public identifier newtypes.
//!
//! Every entity that crosses the boundary of the selector — graph nodes,
//! matches, patterns, instructions, locations — is named by a small
//! non-negative integer identifier. Identifiers are not necessarily
//! contiguous, and two nodes of one graph may deliberately share a node
//! identifier (see the duplication pre-pass in the matcher). The newtype
//! wrappers prevent accidental mixing of the namespaces.
//!
//! [`ArrayIndex`] is the dense counterpart: a position in one of the ordered
//! array-index map lists used by the low-level model.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Creates an identifier from a raw value.
            #[must_use]
            #[inline]
            pub const fn new(raw: u32) -> Self {
                $name(raw)
            }

            /// Returns the raw identifier value.
            #[must_use]
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<u32> for $name {
            #[inline]
            fn from(raw: u32) -> Self {
                $name(raw)
            }
        }

        impl From<$name> for u32 {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

id_type!(
    /// Public identifier of a graph node.
    ///
    /// Node identifiers are stable across graph transformations: a rewrite
    /// that replaces a node structurally may keep its public identifier. Two
    /// node instances sharing one `NodeId` denote "the same logical node";
    /// internal identity within a [`Graph`](crate::ir::Graph) is the
    /// per-instance [`NodeRef`](crate::ir::NodeRef).
    NodeId,
    "n"
);

id_type!(
    /// Identifier of a pattern match produced by the matcher.
    ///
    /// Match identifiers are assigned densely starting at 0 once the full,
    /// deterministically ordered match list for a (function, target) pair is
    /// known.
    MatchId,
    "m"
);

id_type!(
    /// Identifier of a pattern graph within an instruction.
    PatternId,
    "p"
);

id_type!(
    /// Identifier of an instruction of the target machine.
    InstructionId,
    "i"
);

id_type!(
    /// Identifier of a location (register or similar) of the target machine.
    LocationId,
    "l"
);

/// A position in one of the six ordered array-index map lists.
///
/// The low-level model addresses every entity by such a dense index; the
/// [`ArrayIndexMaplists`](crate::model::ArrayIndexMaplists) record the
/// bijection back to the public identifiers above.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArrayIndex(pub(crate) u32);

impl ArrayIndex {
    /// Creates an array index from a raw position.
    #[must_use]
    #[inline]
    pub const fn new(raw: u32) -> Self {
        ArrayIndex(raw)
    }

    /// Returns the raw position.
    #[must_use]
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the position as a `usize` suitable for slice indexing.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ArrayIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArrayIndex({})", self.0)
    }
}

impl fmt::Display for ArrayIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_distinct_namespaces() {
        // Same raw value, different types; comparisons only compile within
        // one namespace.
        let n = NodeId::new(5);
        let m = MatchId::new(5);
        assert_eq!(n.raw(), m.raw());
    }

    #[test]
    fn test_node_id_ordering_and_hash() {
        let mut ids = vec![NodeId::new(3), NodeId::new(1), NodeId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)]);

        let set: HashSet<NodeId> = ids.into_iter().collect();
        assert!(set.contains(&NodeId::new(2)));
    }

    #[test]
    fn test_display_prefixes() {
        assert_eq!(NodeId::new(7).to_string(), "n7");
        assert_eq!(MatchId::new(7).to_string(), "m7");
        assert_eq!(LocationId::new(0).to_string(), "l0");
        assert_eq!(ArrayIndex::new(4).to_string(), "#4");
    }

    #[test]
    fn test_array_index_slice_access() {
        let data = vec![10, 20, 30];
        let ai = ArrayIndex::new(1);
        assert_eq!(data[ai.index()], 20);
    }
}
