//! SIMD pattern matching.
//!
//! A SIMD instruction's pattern graph consists of several weakly connected
//! components that are copies of one scalar pattern, one per lane. Instead
//! of embedding the whole multi-component graph at once, the first
//! component is matched as an ordinary pattern; every combination of k
//! pairwise-independent scalar matches then forms one SIMD match, with the
//! scalar pattern nodes reassigned to the nodes of the component each lane
//! stands for.
//!
//! Two filters keep the combination count honest: the pairwise
//! data-dependency relation is precomputed as a matrix over the scalar
//! match set and combinations are extended incrementally (a partial
//! combination with an incompatible pair is never completed), and the
//! block-placement selectability filter drops combinations whose operations
//! share no legal block.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    function::Function,
    ir::{
        dominators::{dom_sets, dominatees},
        extract_cfg, extract_ssa, root_of_cfg, EdgeKind, Graph, NodeId, NodeKind, NodeRef,
    },
    matcher::{
        filters::{is_reachable, ssa_refs_of, weakly_connected_components},
        find_pattern_matches,
        state::Vf2Search,
        Matching,
    },
    Error, Result,
};

/// Enumerates the SIMD matches of a multi-component pattern graph.
///
/// # Errors
///
/// Returns [`Error::Precondition`] if the pattern's components are not
/// copies of each other.
pub(crate) fn find_simd_matches(
    function: &Function,
    pattern_graph: &Graph,
) -> Result<Vec<Matching>> {
    let fg = &function.op_structure.graph;

    let all: FxHashSet<NodeRef> = pattern_graph.node_refs().collect();
    let mut components = weakly_connected_components(pattern_graph, &all);
    components.sort_by_key(|c| c.iter().min().copied());
    let lanes = components.len();
    if lanes <= 1 {
        return Ok(find_pattern_matches(fg, pattern_graph));
    }

    let (scalar_pattern, _) = pattern_graph.extract_subgraph(&components[0]);

    // One node-identifier isomorphism per lane, from the scalar pattern onto
    // that lane's component.
    let mut lane_isos: Vec<FxHashMap<NodeId, NodeId>> = Vec::with_capacity(lanes);
    lane_isos.push(
        scalar_pattern
            .node_refs()
            .map(|n| (scalar_pattern.node_id(n), scalar_pattern.node_id(n)))
            .collect(),
    );
    for component in components.iter().skip(1) {
        let (lane_graph, _) = pattern_graph.extract_subgraph(component);
        if lane_graph.node_count() != scalar_pattern.node_count() {
            return Err(Error::precondition(
                "find_simd_matches",
                "SIMD pattern components differ in size",
            ));
        }
        let embeddings = Vf2Search::run(&lane_graph, &scalar_pattern);
        let Some(first) = embeddings.first() else {
            return Err(Error::precondition(
                "find_simd_matches",
                "SIMD pattern component is not a copy of the first component",
            ));
        };
        lane_isos.push(
            first
                .iter()
                .map(|&(p0, lane_node)| {
                    (scalar_pattern.node_id(p0), lane_graph.node_id(lane_node))
                })
                .collect(),
        );
    }

    let scalar_matches = find_pattern_matches(fg, &scalar_pattern);
    if scalar_matches.len() < lanes {
        return Ok(Vec::new());
    }

    // Pairwise compatibility: lanes must neither overlap nor depend on each
    // other through the data-flow graph.
    let (ssa, ssa_map) = extract_ssa(fg);
    let ssa_sets: Vec<FxHashSet<NodeRef>> = scalar_matches
        .iter()
        .map(|m| ssa_refs_of(fg, &ssa_map, m))
        .collect();
    let covers: Vec<BTreeSet<NodeId>> = scalar_matches
        .iter()
        .map(|m| m.function_nodes().collect())
        .collect();
    let n = scalar_matches.len();
    let mut compatible = vec![vec![false; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let overlaps = covers[i].intersection(&covers[j]).next().is_some();
            let dependent = overlaps
                || is_reachable(&ssa, &ssa_sets[i], &ssa_sets[j])
                || is_reachable(&ssa, &ssa_sets[j], &ssa_sets[i]);
            compatible[i][j] = !dependent;
            compatible[j][i] = !dependent;
        }
    }

    let placement = PlacementAnalysis::new(function)?;

    let mut out = Vec::new();
    let mut chosen: Vec<usize> = Vec::with_capacity(lanes);
    combine(
        &mut chosen,
        0,
        lanes,
        &compatible,
        &mut |combo: &[usize]| {
            let mut pairs: Vec<(NodeId, NodeId)> = Vec::new();
            for (lane, &scalar_idx) in combo.iter().enumerate() {
                let iso = &lane_isos[lane];
                for pair in scalar_matches[scalar_idx].pairs() {
                    pairs.push((iso[&pair.pattern_node], pair.function_node));
                }
            }
            pairs.sort_unstable();
            let matching = Matching::from_pairs(pairs);
            if placement.is_selectable(&matching) {
                out.push(matching);
            }
        },
    );
    Ok(out)
}

/// Extends partial combinations index by index, skipping any extension
/// incompatible with an already-chosen member.
fn combine(
    chosen: &mut Vec<usize>,
    next: usize,
    want: usize,
    compatible: &[Vec<bool>],
    emit: &mut impl FnMut(&[usize]),
) {
    if chosen.len() == want {
        emit(chosen);
        return;
    }
    let n = compatible.len();
    // Not enough candidates left to complete the combination.
    if n - next < want - chosen.len() {
        return;
    }
    for candidate in next..n {
        if chosen.iter().all(|&c| compatible[c][candidate]) {
            chosen.push(candidate);
            combine(chosen, candidate + 1, want, compatible, emit);
            chosen.pop();
        }
    }
}

/// Block-placement analysis for the SIMD selectability filter.
///
/// For every operation of a candidate match, the set of blocks it could
/// legally be placed in is the intersection of, downward, the blocks
/// dominated by the definitions of its inputs (walked through the SSA graph,
/// stopping at phis) and, upward, the blocks dominating the uses of its
/// outputs. A SIMD match is selectable only if its operations share at
/// least one legal block.
struct PlacementAnalysis {
    graph: Graph,
    all_blocks: FxHashSet<NodeId>,
    dominators_of: FxHashMap<NodeId, FxHashSet<NodeId>>,
    dominated_by: FxHashMap<NodeId, FxHashSet<NodeId>>,
}

impl PlacementAnalysis {
    fn new(function: &Function) -> Result<Self> {
        let graph = function.op_structure.graph.clone();
        let all_blocks: FxHashSet<NodeId> = graph
            .node_refs()
            .filter(|&n| graph.node_kind(n).is_block())
            .map(|n| graph.node_id(n))
            .collect();

        let mut dominators_of: FxHashMap<NodeId, FxHashSet<NodeId>> = FxHashMap::default();
        let mut dominated_by: FxHashMap<NodeId, FxHashSet<NodeId>> = FxHashMap::default();
        if !all_blocks.is_empty() {
            let view = extract_cfg(&graph)?;
            let root = match function
                .op_structure
                .entry_block
                .and_then(|id| view.graph.find_node(id))
            {
                Some(root) => root,
                None => root_of_cfg(&view.graph)?,
            };
            let doms = dom_sets(&view.graph, root);
            let inverse = dominatees(&doms);
            let to_ids = |set: &FxHashSet<NodeRef>| {
                set.iter().map(|&r| view.graph.node_id(r)).collect::<FxHashSet<NodeId>>()
            };
            for (&block, doms_of_block) in &doms {
                dominators_of.insert(view.graph.node_id(block), to_ids(doms_of_block));
            }
            for (&block, dominated) in &inverse {
                dominated_by.insert(view.graph.node_id(block), to_ids(dominated));
            }
        }

        Ok(PlacementAnalysis {
            graph,
            all_blocks,
            dominators_of,
            dominated_by,
        })
    }

    fn is_selectable(&self, matching: &Matching) -> bool {
        if self.all_blocks.is_empty() {
            return true;
        }
        let mut legal: Option<FxHashSet<NodeId>> = None;
        for id in matching.function_nodes() {
            let Some(node) = self.graph.find_node(id) else {
                continue;
            };
            if !self.graph.node_kind(node).is_operation() {
                continue;
            }
            let blocks = self.placeable_blocks(node);
            legal = Some(match legal {
                None => blocks,
                Some(acc) => acc.intersection(&blocks).copied().collect(),
            });
            if legal.as_ref().is_some_and(|set| set.is_empty()) {
                return false;
            }
        }
        legal.map_or(true, |set| !set.is_empty())
    }

    fn placeable_blocks(&self, op: NodeRef) -> FxHashSet<NodeId> {
        let mut legal = self.all_blocks.clone();
        for input in self.graph.predecessors_via(op, EdgeKind::DataFlow) {
            let mut visited = FxHashSet::default();
            let down = self.downward(input, &mut visited);
            legal.retain(|b| down.contains(b));
        }
        for output in self.graph.successors_via(op, EdgeKind::DataFlow) {
            let mut visited = FxHashSet::default();
            let up = self.upward(output, &mut visited);
            legal.retain(|b| up.contains(b));
        }
        legal
    }

    /// Blocks a consumer of `value` may be placed in: those dominated by the
    /// block the value's definition is placed in, walked downward through
    /// producing operations when no placement is recorded.
    fn downward(&self, value: NodeRef, visited: &mut FxHashSet<NodeRef>) -> FxHashSet<NodeId> {
        if !visited.insert(value) {
            return self.all_blocks.clone();
        }
        if let Some(block) = self.def_block_of(value) {
            return self
                .dominated_by
                .get(&block)
                .cloned()
                .unwrap_or_else(|| self.all_blocks.clone());
        }
        let Some(producer) = self.graph.predecessors_via(value, EdgeKind::DataFlow).next() else {
            return self.all_blocks.clone();
        };
        if matches!(self.graph.node_kind(producer), NodeKind::Phi) {
            return self.all_blocks.clone();
        }
        let mut legal = self.all_blocks.clone();
        for input in self.graph.predecessors_via(producer, EdgeKind::DataFlow) {
            let down = self.downward(input, visited);
            legal.retain(|b| down.contains(b));
        }
        legal
    }

    /// Blocks a producer of `value` may be placed in: those dominating the
    /// blocks the value's uses are placed in, walked upward through
    /// consuming operations when no placement is recorded.
    fn upward(&self, value: NodeRef, visited: &mut FxHashSet<NodeRef>) -> FxHashSet<NodeId> {
        if !visited.insert(value) {
            return self.all_blocks.clone();
        }
        let mut legal = self.all_blocks.clone();
        for consumer in self.graph.successors_via(value, EdgeKind::DataFlow) {
            if matches!(self.graph.node_kind(consumer), NodeKind::Phi) {
                continue;
            }
            let mut consumer_blocks: Option<FxHashSet<NodeId>> = None;
            for output in self.graph.successors_via(consumer, EdgeKind::DataFlow) {
                let set = match self.def_block_of(output) {
                    Some(block) => self
                        .dominators_of
                        .get(&block)
                        .cloned()
                        .unwrap_or_else(|| self.all_blocks.clone()),
                    None => self.upward(output, visited),
                };
                consumer_blocks = Some(match consumer_blocks {
                    None => set,
                    Some(acc) => acc.intersection(&set).copied().collect(),
                });
            }
            if let Some(set) = consumer_blocks {
                legal.retain(|b| set.contains(b));
            }
        }
        legal
    }

    fn def_block_of(&self, value: NodeRef) -> Option<NodeId> {
        self.graph
            .predecessors_via(value, EdgeKind::DefPlacement)
            .chain(self.graph.successors_via(value, EdgeKind::DefPlacement))
            .find(|&n| self.graph.node_kind(n).is_block())
            .map(|n| self.graph.node_id(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ComputeOp, DataType, ValueInfo};
    use crate::opstruct::OpStructure;

    fn value(g: &mut Graph, bits: u16) -> NodeRef {
        g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntTemp { bits })))
    }

    fn scalar_add(g: &mut Graph) -> (NodeRef, NodeRef, NodeRef, NodeRef) {
        let add = g.add_node(NodeKind::Computation(ComputeOp::Add));
        let a = value(g, 32);
        let b = value(g, 32);
        let out = value(g, 32);
        g.add_edge(EdgeKind::DataFlow, a, add).unwrap();
        g.add_edge(EdgeKind::DataFlow, b, add).unwrap();
        g.add_edge(EdgeKind::DataFlow, add, out).unwrap();
        (add, a, b, out)
    }

    fn two_lane_pattern() -> Graph {
        let mut pg = Graph::new();
        scalar_add(&mut pg);
        scalar_add(&mut pg);
        pg
    }

    fn function_with_independent_adds() -> Function {
        let mut fg = Graph::new();
        scalar_add(&mut fg);
        scalar_add(&mut fg);
        Function::new("f", OpStructure::new(fg))
    }

    #[test]
    fn test_two_independent_adds_combine() {
        let function = function_with_independent_adds();
        let pattern = two_lane_pattern();
        let matches = find_simd_matches(&function, &pattern).unwrap();
        // Two independent scalar matches, two lanes: exactly one
        // combination.
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].len(), 8);
    }

    #[test]
    fn test_dependent_adds_do_not_combine() {
        // Second add consumes the first add's result.
        let mut fg = Graph::new();
        let (_, _, _, out1) = scalar_add(&mut fg);
        let add2 = fg.add_node(NodeKind::Computation(ComputeOp::Add));
        let b2 = value(&mut fg, 32);
        let out2 = value(&mut fg, 32);
        fg.add_edge(EdgeKind::DataFlow, out1, add2).unwrap();
        fg.add_edge(EdgeKind::DataFlow, b2, add2).unwrap();
        fg.add_edge(EdgeKind::DataFlow, add2, out2).unwrap();
        let function = Function::new("f", OpStructure::new(fg));

        let pattern = two_lane_pattern();
        let matches = find_simd_matches(&function, &pattern).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_mismatched_components_are_rejected() {
        let mut pg = Graph::new();
        scalar_add(&mut pg);
        // Second component is a lone value, not a copy of the first.
        value(&mut pg, 32);

        let function = function_with_independent_adds();
        let err = find_simd_matches(&function, &pg).unwrap_err();
        assert!(err.to_string().contains("SIMD"));
    }

    #[test]
    fn test_three_scalars_two_lanes_yield_three_combinations() {
        let mut fg = Graph::new();
        scalar_add(&mut fg);
        scalar_add(&mut fg);
        scalar_add(&mut fg);
        let function = Function::new("f", OpStructure::new(fg));

        let pattern = two_lane_pattern();
        let matches = find_simd_matches(&function, &pattern).unwrap();
        // C(3, 2) pairings of independent scalar matches.
        assert_eq!(matches.len(), 3);
    }
}
