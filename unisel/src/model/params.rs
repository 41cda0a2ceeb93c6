//! The high-level constraint model.
//!
//! The high-level model speaks in original public identifiers throughout.
//! Its three parts — function parameters, machine parameters, and one
//! parameter block per match — carry everything the solver-side encoding
//! needs, and the serde attributes pin the exact wire key names the model
//! is persisted under between core stages.

use serde::{Deserialize, Serialize};

use crate::{
    constraints::Constraint,
    ir::{InstructionId, LocationId, MatchId, NodeId, PatternId},
};

/// Parameters describing the function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionParams {
    /// Operation node identifiers
    #[serde(rename = "operation-nodes")]
    pub operation_nodes: Vec<NodeId>,
    /// Value node identifiers
    #[serde(rename = "data-nodes")]
    pub data_nodes: Vec<NodeId>,
    /// State node identifiers
    #[serde(rename = "state-nodes")]
    pub state_nodes: Vec<NodeId>,
    /// Block node identifiers
    #[serde(rename = "block-nodes")]
    pub block_nodes: Vec<NodeId>,
    /// The entry block node
    #[serde(rename = "entry-block")]
    pub entry_block: NodeId,
    /// Dominator set per block, as (block, dominators) pairs
    #[serde(rename = "block-dom-sets")]
    pub block_dom_sets: Vec<(NodeId, Vec<NodeId>)>,
    /// Definition placement edges as (block, entity) pairs, block first
    #[serde(rename = "def-edges")]
    pub def_edges: Vec<(NodeId, NodeId)>,
    /// Per-block parameters
    #[serde(rename = "block-params")]
    pub block_params: Vec<BlockParams>,
    /// Integer-constant bindings of value nodes
    #[serde(rename = "int-const-data")]
    pub int_const_data: Vec<(NodeId, i64)>,
    /// Function-level constraints
    pub constraints: Vec<Constraint>,
}

/// Per-block parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockParams {
    /// Name of the block
    #[serde(rename = "block-name")]
    pub name: String,
    /// The block node
    #[serde(rename = "block-node")]
    pub node: NodeId,
    /// Estimated execution frequency
    #[serde(rename = "exec-frequency")]
    pub exec_frequency: u64,
}

/// Parameters describing the target machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineParams {
    /// Identifier of the target machine
    #[serde(rename = "target-machine-id")]
    pub target_machine_id: String,
    /// Location identifiers, ascending
    pub locations: Vec<LocationId>,
}

/// Parameters of one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchParams {
    /// The instruction the match belongs to
    #[serde(rename = "instruction-id")]
    pub instruction: InstructionId,
    /// The pattern that was embedded
    #[serde(rename = "pattern-id")]
    pub pattern: PatternId,
    /// The match identifier
    #[serde(rename = "match-id")]
    pub match_id: MatchId,
    /// Function operation nodes covered by the match
    #[serde(rename = "operations-covered")]
    pub operations_covered: Vec<NodeId>,
    /// Function data nodes defined by the match
    #[serde(rename = "data-defined")]
    pub data_defined: Vec<NodeId>,
    /// Function data nodes used by the match
    #[serde(rename = "data-used")]
    pub data_used: Vec<NodeId>,
    /// The function block the match must be placed in, if its pattern has
    /// an entry block
    #[serde(rename = "entry-block")]
    pub entry_block: Option<NodeId>,
    /// Function blocks spanned by the match
    #[serde(rename = "spanned-blocks")]
    pub spanned_blocks: Vec<NodeId>,
    /// Code size of the instruction
    #[serde(rename = "code-size")]
    pub code_size: u64,
    /// Latency of the instruction
    pub latency: u64,
    /// Whether the def-dom-use constraint applies (false only for generic
    /// phi patterns)
    #[serde(rename = "apply-def-dom-use-constraint")]
    pub apply_def_dom_use_constraint: bool,
    /// Whether the instruction is not a plain copy
    #[serde(rename = "is-non-copy-instruction")]
    pub is_non_copy_instruction: bool,
    /// Whether the pattern contains control nodes
    #[serde(rename = "has-control-flow")]
    pub has_control_flow: bool,
    /// Function data nodes consumed by phi operations of the pattern
    #[serde(rename = "data-used-by-phis")]
    pub data_used_by_phis: Vec<NodeId>,
    /// For each emit template line and part, the function node the part
    /// references under this match (none for verbatim parts)
    #[serde(rename = "asm-str-node-maps")]
    pub asm_str_node_maps: Vec<Vec<Option<NodeId>>>,
    /// The pattern's constraints, bound to this match
    pub constraints: Vec<Constraint>,
}

/// The complete high-level model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighLevelModel {
    /// Function parameters
    #[serde(rename = "function-params")]
    pub function_params: FunctionParams,
    /// Machine parameters
    #[serde(rename = "machine-params")]
    pub machine_params: MachineParams,
    /// One parameter block per match
    #[serde(rename = "match-params")]
    pub match_params: Vec<MatchParams>,
}
