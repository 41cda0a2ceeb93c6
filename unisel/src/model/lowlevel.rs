//! The low-level (array-indexed) model and the two solution forms.
//!
//! The low-level model is what the external solver consumes: every entity
//! is addressed by its dense array index, every list indexed by an entity
//! is ordered by ascending index, and the counts the solver needs to size
//! its variable arrays are explicit. The low-level solution mirrors the
//! solver's output arrays; the high-level solution names original graph
//! nodes, matches, and locations again.

use serde::{Deserialize, Serialize};

use crate::{
    constraints::Constraint,
    ir::{ArrayIndex, LocationId, MatchId, NodeId},
};

/// The dense, array-indexed model handed to the solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowLevelModel {
    /// Number of operation nodes
    #[serde(rename = "fun-num-operations")]
    pub fun_num_operations: usize,
    /// Number of entity (value and state) nodes
    #[serde(rename = "fun-num-data")]
    pub fun_num_data: usize,
    /// Number of block nodes
    #[serde(rename = "fun-num-blocks")]
    pub fun_num_blocks: usize,
    /// Entity indices that are state nodes
    #[serde(rename = "fun-states")]
    pub fun_states: Vec<ArrayIndex>,
    /// Block index of the entry block
    #[serde(rename = "fun-entry-block")]
    pub fun_entry_block: ArrayIndex,
    /// Dominator sets, outer list indexed by block index
    #[serde(rename = "fun-block-dom-sets")]
    pub fun_block_dom_sets: Vec<Vec<ArrayIndex>>,
    /// Definition placement edges as (block index, entity index) pairs
    #[serde(rename = "fun-def-edges")]
    pub fun_def_edges: Vec<(ArrayIndex, ArrayIndex)>,
    /// Execution frequencies, indexed by block index
    #[serde(rename = "fun-bb-exec-freqs")]
    pub fun_bb_exec_freqs: Vec<u64>,
    /// Function-level constraints over array indices
    #[serde(rename = "fun-constraints")]
    pub fun_constraints: Vec<Constraint>,
    /// Number of locations
    #[serde(rename = "num-locations")]
    pub num_locations: usize,
    /// Number of matches
    #[serde(rename = "num-matches")]
    pub num_matches: usize,
    /// Covered operation indices, outer list indexed by match index
    #[serde(rename = "match-operations-covered")]
    pub match_operations_covered: Vec<Vec<ArrayIndex>>,
    /// Defined entity indices, outer list indexed by match index
    #[serde(rename = "match-data-defined")]
    pub match_data_defined: Vec<Vec<ArrayIndex>>,
    /// Used entity indices, outer list indexed by match index
    #[serde(rename = "match-data-used")]
    pub match_data_used: Vec<Vec<ArrayIndex>>,
    /// Entry block index per match, none for matches without one
    #[serde(rename = "match-entry-blocks")]
    pub match_entry_blocks: Vec<Option<ArrayIndex>>,
    /// Spanned block indices, outer list indexed by match index
    #[serde(rename = "match-spanned-blocks")]
    pub match_spanned_blocks: Vec<Vec<ArrayIndex>>,
    /// Code size per match index
    #[serde(rename = "match-code-sizes")]
    pub match_code_sizes: Vec<u64>,
    /// Latency per match index
    #[serde(rename = "match-latencies")]
    pub match_latencies: Vec<u64>,
    /// Whether the def-dom-use constraint applies, per match index
    #[serde(rename = "match-adduc-settings")]
    pub match_adduc_settings: Vec<bool>,
    /// Match indices whose instruction is not a plain copy
    #[serde(rename = "match-non-copy-instructions")]
    pub match_non_copy_instructions: Vec<ArrayIndex>,
    /// Per-match constraints over array indices, outer list indexed by
    /// match index
    #[serde(rename = "match-constraints")]
    pub match_constraints: Vec<Vec<Constraint>>,
}

/// The solver's output, in array-indexed form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowLevelSolution {
    /// Placement order of the blocks, by block index
    #[serde(rename = "order-of-bbs")]
    pub order_of_bbs: Vec<ArrayIndex>,
    /// Whether the match at each index was selected
    #[serde(rename = "is-match-selected")]
    pub is_match_selected: Vec<bool>,
    /// Block index allocated to each match (meaningful only where
    /// selected)
    #[serde(rename = "bb-allocated-for-match")]
    pub bb_allocated_for_match: Vec<ArrayIndex>,
    /// Whether each entity index has a location assigned
    #[serde(rename = "has-data-loc")]
    pub has_data_loc: Vec<bool>,
    /// Location index selected per entity index (meaningful only where the
    /// flag is set)
    #[serde(rename = "loc-selected-for-data")]
    pub loc_selected_for_data: Vec<ArrayIndex>,
    /// Whether each entity index has an immediate value
    #[serde(rename = "has-data-imm-value")]
    pub has_data_imm_value: Vec<bool>,
    /// Immediate value per entity index (meaningful only where the flag is
    /// set)
    #[serde(rename = "imm-value-of-data")]
    pub imm_value_of_data: Vec<i64>,
    /// Cost of the solution
    pub cost: i64,
}

/// The raised solution, speaking in original identifiers.
///
/// A missing entry in any of the association lists means "no assignment
/// made", never "assigned to zero".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighLevelSolution {
    /// Block nodes in placement order
    #[serde(rename = "order-of-bbs")]
    pub order_of_bbs: Vec<NodeId>,
    /// Identifiers of the selected matches
    #[serde(rename = "selected-matches")]
    pub selected_matches: Vec<MatchId>,
    /// Block node allocated to each selected match
    #[serde(rename = "bbs-allocated-for-sel-matches")]
    pub blocks_allocated_for_selected_matches: Vec<(MatchId, NodeId)>,
    /// Location assigned per value node, where one was assigned
    #[serde(rename = "locs-of-data-nodes")]
    pub locations_of_data_nodes: Vec<(NodeId, LocationId)>,
    /// Immediate value per value node, where one was assigned
    #[serde(rename = "imm-values-of-data-nodes")]
    pub imm_values_of_data_nodes: Vec<(NodeId, i64)>,
    /// Cost of the solution
    pub cost: i64,
}
