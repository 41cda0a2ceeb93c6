//! Dominator and post-dominator sets over a CFG view.
//!
//! A block `d` dominates a block `n` if every path from the root to `n`
//! passes through `d`; it post-dominates `n` if every path from `n` to an
//! exit passes through `d`. The selector needs full dominator *sets* per
//! block (they become `block-dom-sets` in the model), the inverse mapping
//! (dominatees), and closest-common-dominator queries for phi invariant
//! enforcement.
//!
//! Computed by iterative set intersection to a fixed point. The graphs here
//! are block-level CFGs of single functions; quadratic set work is
//! irrelevant at that size.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::graph::{Graph, NodeRef};

/// Computes the dominator set of every node reachable from `root`.
///
/// Each set contains the node itself; the root's set is `{root}`.
/// Unreachable nodes are absent from the result.
#[must_use]
pub fn dom_sets(cfg: &Graph, root: NodeRef) -> FxHashMap<NodeRef, FxHashSet<NodeRef>> {
    let reachable = reachable_from(cfg, root, false);
    fixpoint_sets(cfg, &reachable, root)
}

/// Computes the post-dominator set of every node that reaches some exit.
///
/// Exits are the nodes with no successors; each exit post-dominates itself.
#[must_use]
pub fn post_dom_sets(cfg: &Graph) -> FxHashMap<NodeRef, FxHashSet<NodeRef>> {
    let exits: Vec<NodeRef> = cfg
        .node_refs()
        .filter(|&n| cfg.successors(n).next().is_none())
        .collect();
    let mut reachable: FxHashSet<NodeRef> = FxHashSet::default();
    for &exit in &exits {
        reachable.extend(reachable_from(cfg, exit, true));
    }

    let mut sets: FxHashMap<NodeRef, FxHashSet<NodeRef>> = FxHashMap::default();
    for &n in &reachable {
        if exits.contains(&n) {
            sets.insert(n, [n].into_iter().collect());
        } else {
            sets.insert(n, reachable.clone());
        }
    }
    let mut changed = true;
    while changed {
        changed = false;
        for &n in &reachable {
            if exits.contains(&n) {
                continue;
            }
            let mut new_set: Option<FxHashSet<NodeRef>> = None;
            for succ in cfg.successors(n) {
                let Some(succ_set) = sets.get(&succ) else {
                    continue;
                };
                new_set = Some(match new_set {
                    None => succ_set.clone(),
                    Some(acc) => acc.intersection(succ_set).copied().collect(),
                });
            }
            let mut new_set = new_set.unwrap_or_default();
            new_set.insert(n);
            if sets[&n] != new_set {
                sets.insert(n, new_set);
                changed = true;
            }
        }
    }
    sets
}

/// Computes the inverse of [`dom_sets`]: for every block, the set of blocks
/// it dominates (including itself).
#[must_use]
pub fn dominatees(doms: &FxHashMap<NodeRef, FxHashSet<NodeRef>>) -> FxHashMap<NodeRef, FxHashSet<NodeRef>> {
    let mut inverse: FxHashMap<NodeRef, FxHashSet<NodeRef>> = FxHashMap::default();
    for (&node, dominators) in doms {
        inverse.entry(node).or_default();
        for &d in dominators {
            inverse.entry(d).or_default().insert(node);
        }
    }
    inverse
}

/// Returns the closest common dominator of two blocks: the dominator shared
/// by both whose own dominator set is largest (i.e. the deepest one).
///
/// Returns `None` if either block is absent from `doms` or no common
/// dominator exists.
#[must_use]
pub fn closest_common_dominator(
    doms: &FxHashMap<NodeRef, FxHashSet<NodeRef>>,
    a: NodeRef,
    b: NodeRef,
) -> Option<NodeRef> {
    let da = doms.get(&a)?;
    let db = doms.get(&b)?;
    da.intersection(db)
        .copied()
        .max_by_key(|d| doms.get(d).map_or(0, FxHashSet::len))
}

fn reachable_from(graph: &Graph, start: NodeRef, backwards: bool) -> FxHashSet<NodeRef> {
    let mut seen: FxHashSet<NodeRef> = FxHashSet::default();
    let mut stack = vec![start];
    while let Some(node) = stack.pop() {
        if !seen.insert(node) {
            continue;
        }
        if backwards {
            stack.extend(graph.predecessors(node));
        } else {
            stack.extend(graph.successors(node));
        }
    }
    seen
}

fn fixpoint_sets(
    cfg: &Graph,
    reachable: &FxHashSet<NodeRef>,
    root: NodeRef,
) -> FxHashMap<NodeRef, FxHashSet<NodeRef>> {
    let mut sets: FxHashMap<NodeRef, FxHashSet<NodeRef>> = FxHashMap::default();
    for &n in reachable {
        if n == root {
            sets.insert(n, [n].into_iter().collect());
        } else {
            sets.insert(n, reachable.clone());
        }
    }
    let mut changed = true;
    while changed {
        changed = false;
        for &n in reachable {
            if n == root {
                continue;
            }
            let mut new_set: Option<FxHashSet<NodeRef>> = None;
            for pred in cfg.predecessors(n) {
                let Some(pred_set) = sets.get(&pred) else {
                    continue;
                };
                new_set = Some(match new_set {
                    None => pred_set.clone(),
                    Some(acc) => acc.intersection(pred_set).copied().collect(),
                });
            }
            let mut new_set = new_set.unwrap_or_default();
            new_set.insert(n);
            if sets[&n] != new_set {
                sets.insert(n, new_set);
                changed = true;
            }
        }
    }
    sets
}
