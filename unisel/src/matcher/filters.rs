//! Pre- and post-processing around the VF2 search.
//!
//! Three concerns live here: the definition-placement duplication pre-pass
//! (blocks carrying both inbound and outbound definition edges are split
//! into two nodes sharing one public identifier, so the one-to-one mapping
//! rule does not forbid legitimate embeddings), the cyclic-data-dependency
//! post-filter, and removal of matches covering an identical function node
//! set.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

use crate::ir::{EdgeKind, Graph, NodeId, NodeRef};
use crate::matcher::Matching;

/// Splits every block node that has both inbound and outbound
/// definition-placement edges into two nodes sharing the block's public
/// identifier, moving the outbound definition edges to the twin.
///
/// Returns the rewritten copy and the map from twin refs to the refs of the
/// original nodes (which are identical in the copy and in `graph`).
pub(crate) fn duplicate_def_blocks(graph: &Graph) -> (Graph, FxHashMap<NodeRef, NodeRef>) {
    let mut out = graph.clone();
    let mut twins: FxHashMap<NodeRef, NodeRef> = FxHashMap::default();
    let blocks: Vec<NodeRef> = graph
        .node_refs()
        .filter(|&n| graph.node_kind(n).is_block())
        .collect();
    for block in blocks {
        let has_def_in = out.in_edges_of_kind(block, EdgeKind::DefPlacement).next().is_some();
        let def_out: Vec<_> = out.out_edges_of_kind(block, EdgeKind::DefPlacement).collect();
        if !has_def_in || def_out.is_empty() {
            continue;
        }
        let twin = out.add_node_with_id(out.node_id(block), out.node_kind(block).clone());
        for edge in def_out {
            out.update_edge_source(edge, twin)
                .expect("twin was just added");
        }
        twins.insert(twin, block);
    }
    (out, twins)
}

/// Resolves a ref of a duplicated graph back to the original node it stands
/// for.
pub(crate) fn undo_duplication(twins: &FxHashMap<NodeRef, NodeRef>, node: NodeRef) -> NodeRef {
    twins.get(&node).copied().unwrap_or(node)
}

/// Computes the weakly connected components of the subgraph induced by
/// `nodes`.
pub(crate) fn weakly_connected_components(
    graph: &Graph,
    nodes: &FxHashSet<NodeRef>,
) -> Vec<FxHashSet<NodeRef>> {
    let mut remaining: BTreeSet<NodeRef> = nodes.iter().copied().collect();
    let mut components = Vec::new();
    while let Some(&start) = remaining.iter().next() {
        let mut component: FxHashSet<NodeRef> = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(n) = stack.pop() {
            if !component.insert(n) {
                continue;
            }
            remaining.remove(&n);
            stack.extend(
                graph
                    .predecessors(n)
                    .chain(graph.successors(n))
                    .filter(|m| nodes.contains(m) && !component.contains(m)),
            );
        }
        components.push(component);
    }
    components
}

/// Returns `true` if any node of `to` is forward-reachable from `from`
/// (overlapping sets count as reachable).
pub(crate) fn is_reachable(graph: &Graph, from: &FxHashSet<NodeRef>, to: &FxHashSet<NodeRef>) -> bool {
    if from.iter().any(|n| to.contains(n)) {
        return true;
    }
    let mut seen: FxHashSet<NodeRef> = from.clone();
    let mut stack: Vec<NodeRef> = from.iter().copied().collect();
    while let Some(n) = stack.pop() {
        for succ in graph.successors(n) {
            if to.contains(&succ) {
                return true;
            }
            if seen.insert(succ) {
                stack.push(succ);
            }
        }
    }
    false
}

/// Checks a match for cyclic data dependencies.
///
/// The function nodes covered by the match are projected onto the SSA view;
/// value nodes acting as pure inputs (no producer within the match) are
/// dropped; the remainder splits into weakly connected components. If any
/// component can reach another through the surrounding data-flow graph, the
/// covering instruction would depend on its own output, and the match is
/// rejected.
pub(crate) fn has_cyclic_data_dependency(ssa: &Graph, match_nodes: &FxHashSet<NodeRef>) -> bool {
    let core: FxHashSet<NodeRef> = match_nodes
        .iter()
        .copied()
        .filter(|&n| {
            if !ssa.node_kind(n).is_value() {
                return true;
            }
            ssa.predecessors(n).any(|p| match_nodes.contains(&p))
        })
        .collect();
    let components = weakly_connected_components(ssa, &core);
    if components.len() < 2 {
        return false;
    }
    for (i, a) in components.iter().enumerate() {
        for (j, b) in components.iter().enumerate() {
            if i != j && is_reachable(ssa, a, b) {
                return true;
            }
        }
    }
    false
}

/// Translates the function side of a match into refs of the SSA view.
///
/// Function nodes without a counterpart in the view (blocks, states) are
/// skipped.
pub(crate) fn ssa_refs_of(
    function_graph: &Graph,
    ssa_map: &FxHashMap<NodeRef, NodeRef>,
    matching: &Matching,
) -> FxHashSet<NodeRef> {
    matching
        .function_nodes()
        .filter_map(|id| function_graph.find_node(id))
        .filter_map(|r| ssa_map.get(&r).copied())
        .collect()
}

/// Drops every match that duplicates an earlier match in the list.
///
/// Two matches are duplicates when they cover the identical set of function
/// nodes and agree on every *order-significant* pattern node. Value nodes
/// consumed exclusively by commutative computations are order-insignificant:
/// the two operand orderings of a commutative operation describe the same
/// embedding, and only one representative is kept. Operand orderings of
/// non-commutative operations are distinct matches.
pub(crate) fn dedup_by_cover(pattern_graph: &Graph, matches: Vec<Matching>) -> Vec<Matching> {
    let insignificant: FxHashSet<NodeId> = pattern_graph
        .node_refs()
        .filter(|&n| {
            if !pattern_graph.node_kind(n).is_value() {
                return false;
            }
            let mut consumers = pattern_graph
                .successors_via(n, EdgeKind::DataFlow)
                .peekable();
            if consumers.peek().is_none() {
                return false;
            }
            consumers.all(|c| {
                matches!(
                    pattern_graph.node_kind(c),
                    crate::ir::NodeKind::Computation(op) if op.is_commutative()
                )
            })
        })
        .map(|n| pattern_graph.node_id(n))
        .collect();

    type Key = (BTreeSet<NodeId>, BTreeSet<(NodeId, NodeId)>);
    let mut seen: FxHashSet<Key> = FxHashSet::default();
    matches
        .into_iter()
        .filter(|m| {
            let cover: BTreeSet<NodeId> = m.function_nodes().collect();
            let significant: BTreeSet<(NodeId, NodeId)> = m
                .pairs()
                .iter()
                .filter(|p| !insignificant.contains(&p.pattern_node))
                .map(|p| (p.pattern_node, p.function_node))
                .collect();
            seen.insert((cover, significant))
        })
        .collect()
}
