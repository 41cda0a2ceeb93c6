//! The pattern matcher: enumeration of all subgraph-isomorphic embeddings
//! of every instruction pattern into a function graph.
//!
//! The entry point is [`find_matches`]: for each (instruction, pattern)
//! pair of the target it runs the VF2-based search (SIMD instructions go
//! through component-wise composition instead), applies the
//! cyclic-data-dependency and duplicate-cover filters, and assigns dense
//! match identifiers over a deterministically ordered result list.
//!
//! Per-pattern enumeration is independent, so the (instruction, pattern)
//! fan-out runs on a rayon pool; determinism is restored by sorting the
//! combined list by (instruction, pattern, canonical match serialization)
//! before identifiers are assigned.

mod compat;
mod filters;
mod simd;
mod state;

pub use compat::{do_edges_match, do_nodes_match, has_corresponding_edges, is_intermediate_block};

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    function::Function,
    ir::{extract_ssa, Graph, InstructionId, MatchId, NodeId, NodeRef, PatternId},
    matcher::{
        filters::{
            dedup_by_cover, duplicate_def_blocks, has_cyclic_data_dependency, ssa_refs_of,
            undo_duplication,
        },
        state::Vf2Search,
    },
    target::{InstrFlags, TargetMachine},
    Result,
};

/// One pair of a match: a pattern node and the function node it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPair {
    /// The pattern node
    #[serde(rename = "pattern-node")]
    pub pattern_node: NodeId,
    /// The function node it is mapped to
    #[serde(rename = "function-node")]
    pub function_node: NodeId,
}

/// An ordered collection of pattern-to-function node pairs forming one
/// embedding.
///
/// Every pattern node appears exactly once; distinct pattern nodes map to
/// distinct function nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Matching {
    pairs: Vec<MatchPair>,
}

impl Matching {
    /// Creates a matching from (pattern node, function node) pairs.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (NodeId, NodeId)>) -> Self {
        Matching {
            pairs: pairs
                .into_iter()
                .map(|(pattern_node, function_node)| MatchPair {
                    pattern_node,
                    function_node,
                })
                .collect(),
        }
    }

    /// Returns the pairs in order.
    #[must_use]
    pub fn pairs(&self) -> &[MatchPair] {
        &self.pairs
    }

    /// Returns the number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if the matching has no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the function node a pattern node is mapped to.
    #[must_use]
    pub fn function_node_of(&self, pattern_node: NodeId) -> Option<NodeId> {
        self.pairs
            .iter()
            .find(|p| p.pattern_node == pattern_node)
            .map(|p| p.function_node)
    }

    /// Returns the mapping as a hash map from pattern to function nodes.
    #[must_use]
    pub fn as_map(&self) -> FxHashMap<NodeId, NodeId> {
        self.pairs
            .iter()
            .map(|p| (p.pattern_node, p.function_node))
            .collect()
    }

    /// Returns an iterator over the covered function nodes, in pair order.
    pub fn function_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.pairs.iter().map(|p| p.function_node)
    }

    /// Returns an iterator over the pattern nodes, in pair order.
    pub fn pattern_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.pairs.iter().map(|p| p.pattern_node)
    }

    /// A canonical, order-independent serialization of the matching, used
    /// to make the final match list deterministic.
    #[must_use]
    pub fn canonical_key(&self) -> Vec<(u32, u32)> {
        let mut key: Vec<(u32, u32)> = self
            .pairs
            .iter()
            .map(|p| (p.pattern_node.raw(), p.function_node.raw()))
            .collect();
        key.sort_unstable();
        key
    }
}

/// A match of one instruction pattern, with its dense identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatch {
    /// The instruction the pattern belongs to
    #[serde(rename = "instruction-id")]
    pub instruction: InstructionId,
    /// The pattern that was embedded
    #[serde(rename = "pattern-id")]
    pub pattern: PatternId,
    /// Dense match identifier, assigned from 0
    #[serde(rename = "match-id")]
    pub match_id: MatchId,
    /// The node-level embedding
    pub matching: Matching,
}

/// Enumerates the embeddings of a single pattern graph into a function
/// graph.
///
/// Runs the duplication pre-pass on both graphs, the VF2 search, the
/// cyclic-data-dependency post-filter, and duplicate-cover removal. The
/// result order is deterministic.
#[must_use]
pub fn find_pattern_matches(function_graph: &Graph, pattern_graph: &Graph) -> Vec<Matching> {
    let (fg_dup, f_twins) = duplicate_def_blocks(function_graph);
    let (pg_dup, p_twins) = duplicate_def_blocks(pattern_graph);
    let raw = Vf2Search::run(&fg_dup, &pg_dup);

    let (ssa, ssa_map) = extract_ssa(function_graph);

    let mut matchings = Vec::new();
    'mappings: for mapping in raw {
        // Fold duplicated nodes back onto their originals. A mapping whose
        // twin halves land on inconsistent function nodes is not an
        // embedding of the original pattern.
        let mut by_pattern: FxHashMap<NodeRef, NodeRef> = FxHashMap::default();
        for (p_dup, f_dup) in mapping {
            let p = undo_duplication(&p_twins, p_dup);
            let f = undo_duplication(&f_twins, f_dup);
            if let Some(prev) = by_pattern.insert(p, f) {
                if prev != f {
                    continue 'mappings;
                }
            }
        }
        let mut pairs: Vec<(NodeRef, NodeRef)> = by_pattern.into_iter().collect();
        pairs.sort_unstable_by_key(|&(p, _)| p);
        let matching = Matching::from_pairs(
            pairs
                .into_iter()
                .map(|(p, f)| (pattern_graph.node_id(p), function_graph.node_id(f))),
        );

        let covered = ssa_refs_of(function_graph, &ssa_map, &matching);
        if has_cyclic_data_dependency(&ssa, &covered) {
            continue;
        }
        matchings.push(matching);
    }
    dedup_by_cover(pattern_graph, matchings)
}

/// Enumerates all matches of every pattern of every instruction of the
/// target into the function, assigning dense match identifiers.
///
/// # Errors
///
/// Returns an error if a SIMD instruction's pattern graph is malformed
/// (components that are not copies of each other) or if the function graph
/// lacks the structure the SIMD selectability filter needs.
pub fn find_matches(function: &Function, target: &TargetMachine) -> Result<Vec<PatternMatch>> {
    let mut work: Vec<(InstructionId, PatternId)> = Vec::new();
    for instr_id in target.instruction_ids() {
        let instr = target.instruction(instr_id)?;
        for pattern in &instr.patterns {
            work.push((instr_id, pattern.id));
        }
    }

    let per_pattern: Vec<Result<Vec<(InstructionId, PatternId, Matching)>>> = work
        .par_iter()
        .map(|&(instr_id, pattern_id)| {
            let instr = target.instruction(instr_id)?;
            let pattern = instr.pattern(pattern_id)?;
            let matchings = if instr.properties.flags.contains(InstrFlags::SIMD) {
                simd::find_simd_matches(function, &pattern.op_structure.graph)?
            } else {
                find_pattern_matches(&function.op_structure.graph, &pattern.op_structure.graph)
            };
            log::debug!(
                "instruction {} pattern {}: {} match(es)",
                instr_id,
                pattern_id,
                matchings.len()
            );
            Ok(matchings
                .into_iter()
                .map(|m| (instr_id, pattern_id, m))
                .collect())
        })
        .collect();

    let mut flat: Vec<(InstructionId, PatternId, Matching)> = Vec::new();
    for chunk in per_pattern {
        flat.extend(chunk?);
    }
    flat.sort_by_cached_key(|(instr, pattern, matching)| {
        (instr.raw(), pattern.raw(), matching.canonical_key())
    });

    Ok(flat
        .into_iter()
        .enumerate()
        .map(|(i, (instruction, pattern, matching))| PatternMatch {
            instruction,
            pattern,
            match_id: MatchId::new(i as u32),
            matching,
        })
        .collect())
}
