//! Array-index map lists: the bijection between public identifiers and
//! dense array indices.
//!
//! Six namespaces are indexed independently: operation nodes, entity
//! (value and state) nodes, block nodes, matches, locations, and
//! instructions. Within each namespace the identifiers are sorted ascending
//! at construction, so indices are stable and reproducible across runs.
//! Lookups work in both directions: identifier to index through a hash map,
//! index to identifier through the ordered array.

use std::hash::Hash;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    ir::{ArrayIndex, InstructionId, LocationId, MatchId, NodeId},
    model::HighLevelModel,
    Error, Result,
};

/// An ordered identifier list with constant-time lookup in both directions.
#[derive(Debug, Clone, Default)]
pub struct IdIndexMap<T: Copy + Eq + Hash> {
    forward: Vec<T>,
    reverse: FxHashMap<T, ArrayIndex>,
}

impl<T: Copy + Eq + Hash + Ord> IdIndexMap<T> {
    /// Builds a map from the given identifiers, sorted ascending and
    /// deduplicated.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = T>) -> Self {
        let mut forward: Vec<T> = ids.into_iter().collect();
        forward.sort_unstable();
        forward.dedup();
        Self::from_ordered(forward)
    }

    fn from_ordered(forward: Vec<T>) -> Self {
        let reverse = forward
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, ArrayIndex::new(i as u32)))
            .collect();
        IdIndexMap { forward, reverse }
    }
}

impl<T: Copy + Eq + Hash> IdIndexMap<T> {
    /// Returns the array index of an identifier.
    #[must_use]
    pub fn index_of(&self, id: T) -> Option<ArrayIndex> {
        self.reverse.get(&id).copied()
    }

    /// Returns the identifier at an array index.
    #[must_use]
    pub fn id_at(&self, index: ArrayIndex) -> Option<T> {
        self.forward.get(index.index()).copied()
    }

    /// Returns the identifiers in index order.
    #[must_use]
    pub fn ids(&self) -> &[T] {
        &self.forward
    }

    /// Returns the number of identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Returns `true` if the namespace is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl<T: Copy + Eq + Hash + Serialize> Serialize for IdIndexMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.forward.serialize(serializer)
    }
}

impl<'de, T: Copy + Eq + Hash + Deserialize<'de>> Deserialize<'de> for IdIndexMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // The persisted order is authoritative; it is not re-sorted.
        let forward = Vec::<T>::deserialize(deserializer)?;
        let reverse = forward
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, ArrayIndex::new(i as u32)))
            .collect();
        Ok(IdIndexMap { forward, reverse })
    }
}

/// The six per-namespace map lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayIndexMaplists {
    /// Operation node identifiers
    pub operations: IdIndexMap<NodeId>,
    /// Entity (value and state) node identifiers
    pub data: IdIndexMap<NodeId>,
    /// Block node identifiers
    pub blocks: IdIndexMap<NodeId>,
    /// Match identifiers
    pub matches: IdIndexMap<MatchId>,
    /// Location identifiers
    pub locations: IdIndexMap<LocationId>,
    /// Instruction identifiers
    pub instructions: IdIndexMap<InstructionId>,
}

impl ArrayIndexMaplists {
    /// Builds the map lists for a high-level model.
    #[must_use]
    pub fn from_model(model: &HighLevelModel) -> Self {
        let f = &model.function_params;
        ArrayIndexMaplists {
            operations: IdIndexMap::from_ids(f.operation_nodes.iter().copied()),
            data: IdIndexMap::from_ids(
                f.data_nodes
                    .iter()
                    .chain(f.state_nodes.iter())
                    .copied(),
            ),
            blocks: IdIndexMap::from_ids(f.block_nodes.iter().copied()),
            matches: IdIndexMap::from_ids(model.match_params.iter().map(|m| m.match_id)),
            locations: IdIndexMap::from_ids(model.machine_params.locations.iter().copied()),
            instructions: IdIndexMap::from_ids(model.match_params.iter().map(|m| m.instruction)),
        }
    }

    /// Returns the array index of a node identifier, searching the
    /// operation, entity, and block namespaces in that order.
    ///
    /// Node identifiers are unique across the three namespaces of one
    /// function, so the search order is immaterial.
    #[must_use]
    pub fn node_array_index(&self, id: NodeId) -> Option<ArrayIndex> {
        self.operations
            .index_of(id)
            .or_else(|| self.data.index_of(id))
            .or_else(|| self.blocks.index_of(id))
    }

    /// Returns the array index of a node identifier, as an error when the
    /// node is unknown.
    pub(crate) fn require_node(&self, id: NodeId) -> Result<ArrayIndex> {
        self.node_array_index(id).ok_or(Error::MissingEntity {
            kind: "node in the array-index map lists",
            id: u64::from(id.raw()),
        })
    }
}
