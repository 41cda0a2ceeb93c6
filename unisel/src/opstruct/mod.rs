//! Op-structures: a graph bundled with its constraints and metadata.
//!
//! An [`OpStructure`] is the unit both functions and instruction patterns
//! are expressed in: the graph itself, an optional entry block, the
//! permitted locations of value nodes, a list of constraints, and pairs of
//! values required to share a location. The constraint *builders* on
//! [`OpStructure`] produce the canned expressions the model builder and the
//! front-end attach in bulk.

pub mod transform;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    constraints::{
        referenced_node_ids, BlockExpr, BoolExpr, Constraint, LocationExpr, MatchExpr, NodeExpr,
        NumExpr, SetElemExpr, SetExpr,
    },
    ir::{Graph, LocationId, NodeId, NodeRef},
    Error, Result,
};

/// A graph plus its associated constraints and metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpStructure {
    /// The graph
    pub graph: Graph,
    /// The entry block node, if the structure has one
    #[serde(rename = "entry-block")]
    pub entry_block: Option<NodeId>,
    /// Permitted location identifiers per value node; a value node absent
    /// from the map is unrestricted
    #[serde(rename = "valid-locations", default)]
    pub valid_locations: FxHashMap<NodeId, Vec<LocationId>>,
    /// Constraints that must hold
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    /// Pairs of value nodes required to be assigned the same location
    #[serde(rename = "same-locations", default)]
    pub same_locations: Vec<(NodeId, NodeId)>,
}

impl OpStructure {
    /// Creates an op-structure over the given graph with no entry block, no
    /// location restrictions, and no constraints.
    #[must_use]
    pub fn new(graph: Graph) -> Self {
        OpStructure {
            graph,
            entry_block: None,
            valid_locations: FxHashMap::default(),
            constraints: Vec::new(),
            same_locations: Vec::new(),
        }
    }

    /// Appends a constraint.
    pub fn add_constraint(&mut self, c: Constraint) {
        self.constraints.push(c);
    }

    /// Appends several constraints.
    pub fn add_constraints(&mut self, cs: impl IntoIterator<Item = Constraint>) {
        self.constraints.extend(cs);
    }

    /// Returns the ref of the entry block node, if one is set and present.
    #[must_use]
    pub fn entry_block_ref(&self) -> Option<NodeRef> {
        self.entry_block.and_then(|id| self.graph.find_node(id))
    }

    /// Checks the structural invariants of the op-structure.
    ///
    /// Verified: every node identifier mentioned by a constraint, a
    /// valid-location entry, or a same-location pair refers to a node
    /// present in the graph, and the entry block (if set) names a block
    /// node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] naming the first dangling identifier.
    pub fn check_integrity(&self) -> Result<()> {
        for c in &self.constraints {
            for id in referenced_node_ids(c) {
                if self.graph.find_node(id).is_none() {
                    return Err(Error::GraphError(format!(
                        "constraint references node {id} which is not in the graph"
                    )));
                }
            }
        }
        for &id in self.valid_locations.keys() {
            if self.graph.find_node(id).is_none() {
                return Err(Error::GraphError(format!(
                    "valid-location entry references node {id} which is not in the graph"
                )));
            }
        }
        for &(a, b) in &self.same_locations {
            for id in [a, b] {
                if self.graph.find_node(id).is_none() {
                    return Err(Error::GraphError(format!(
                        "same-location pair references node {id} which is not in the graph"
                    )));
                }
            }
        }
        if let Some(entry) = self.entry_block {
            match self.graph.find_node(entry) {
                Some(node) if self.graph.node_kind(node).is_block() => {}
                Some(_) => {
                    return Err(Error::GraphError(format!(
                        "entry block {entry} is not a block node"
                    )))
                }
                None => {
                    return Err(Error::GraphError(format!(
                        "entry block {entry} is not in the graph"
                    )))
                }
            }
        }
        Ok(())
    }

    /// Rewrites every reference to `from` in the constraints, valid-location
    /// map, and same-location pairs so that it names `to` instead.
    ///
    /// Used by transformations that merge value nodes. When both nodes carry
    /// a valid-location entry, the entries are intersected.
    pub fn rename_node_references(&mut self, from: NodeId, to: NodeId) {
        struct Renamer {
            from: NodeId,
            to: NodeId,
        }
        impl crate::constraints::Reconstructor for Renamer {
            fn mk_node_expr(&mut self, expr: NodeExpr) -> NodeExpr {
                match expr {
                    NodeExpr::Id(id) if id == self.from => NodeExpr::Id(self.to),
                    other => other,
                }
            }
        }
        let mut renamer = Renamer { from, to };
        self.constraints = self
            .constraints
            .iter()
            .map(|c| crate::constraints::reconstruct_constraint(&mut renamer, c))
            .collect();

        if let Some(from_locs) = self.valid_locations.remove(&from) {
            match self.valid_locations.get_mut(&to) {
                Some(to_locs) => to_locs.retain(|l| from_locs.contains(l)),
                None => {
                    self.valid_locations.insert(to, from_locs);
                }
            }
        }
        for pair in &mut self.same_locations {
            if pair.0 == from {
                pair.0 = to;
            }
            if pair.1 == from {
                pair.1 = to;
            }
        }
        self.same_locations.retain(|&(a, b)| a != b);
    }

    // ------------------------------------------------------------------
    // Constraint builders
    // ------------------------------------------------------------------

    /// Builds the match-placement constraint: this match is placed in the
    /// block of the given block node.
    #[must_use]
    pub fn placed_in_block_constraint(block_node: NodeId) -> Constraint {
        Constraint(BoolExpr::Eq(
            NumExpr::BlockToNum(BlockExpr::WhereinMatchIsPlaced(MatchExpr::This)),
            NumExpr::BlockToNum(BlockExpr::OfBlockNode(NodeExpr::Id(block_node))),
        ))
    }

    /// Builds the fall-through constraint: control falls through from this
    /// match to the block of the given block node.
    #[must_use]
    pub fn fall_through_constraint(block_node: NodeId) -> Constraint {
        Constraint(BoolExpr::FallThrough(
            MatchExpr::This,
            BlockExpr::OfBlockNode(NodeExpr::Id(block_node)),
        ))
    }

    /// Builds the constraint restricting a value node to a set of locations.
    #[must_use]
    pub fn value_location_constraint(value_node: NodeId, locations: &[LocationId]) -> Constraint {
        Constraint(BoolExpr::InSet(
            SetElemExpr::Location(LocationExpr::OfValueNode(NodeExpr::Id(value_node))),
            SetExpr::LocationClass(locations.iter().copied().map(LocationExpr::Id).collect()),
        ))
    }

    /// Builds the no-reuse constraint pinning a value node to the null
    /// location.
    #[must_use]
    pub fn no_reuse_constraint(value_node: NodeId, null_location: LocationId) -> Constraint {
        Constraint(BoolExpr::Eq(
            NumExpr::LocationToNum(LocationExpr::OfValueNode(NodeExpr::Id(value_node))),
            NumExpr::LocationToNum(LocationExpr::Id(null_location)),
        ))
    }

    /// Builds the constraint forcing two value nodes into the same location.
    #[must_use]
    pub fn same_location_constraint(a: NodeId, b: NodeId) -> Constraint {
        Constraint(BoolExpr::Eq(
            NumExpr::LocationToNum(LocationExpr::OfValueNode(NodeExpr::Id(a))),
            NumExpr::LocationToNum(LocationExpr::OfValueNode(NodeExpr::Id(b))),
        ))
    }
}
