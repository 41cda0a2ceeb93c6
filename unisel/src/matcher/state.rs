//! The VF2 search state and recursion.
//!
//! A classical VF2 subgraph-isomorphism search, specialized in three ways:
//!
//! - the semantic feasibility tests come from [`compat`](super::compat)
//!   (node kinds, data types, edge counts, edge ordering);
//! - the `pred`/`succ` consistency checks are applied *pattern-side only* —
//!   the function graph may carry edges the pattern does not mention;
//! - candidate pattern nodes are preferred from the out-terminal set, then
//!   the in-terminal set, then the remainder restricted to operation and
//!   block nodes (falling back to any remaining node when a pattern has
//!   none, e.g. a pattern consisting of a single value node).
//!
//! Enumeration order is deterministic: node candidates are tried in
//! ascending internal ref order, so the same inputs always yield the same
//! match list.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::{Graph, NodeRef};
use crate::matcher::compat::{do_edges_match, do_nodes_match, has_corresponding_edges};

/// One complete embedding: pattern node -> function node, in mapping order.
pub(crate) type RefMapping = Vec<(NodeRef, NodeRef)>;

pub(crate) struct Vf2Search<'a> {
    fg: &'a Graph,
    pg: &'a Graph,
    pattern_size: usize,
    /// function -> pattern
    core_f: FxHashMap<NodeRef, NodeRef>,
    /// pattern -> function
    core_p: FxHashMap<NodeRef, NodeRef>,
    order: RefMapping,
    results: Vec<RefMapping>,
}

impl<'a> Vf2Search<'a> {
    /// Enumerates every embedding of `pg` into `fg`.
    pub(crate) fn run(fg: &'a Graph, pg: &'a Graph) -> Vec<RefMapping> {
        let pattern_size = pg.node_count();
        let mut search = Vf2Search {
            fg,
            pg,
            pattern_size,
            core_f: FxHashMap::default(),
            core_p: FxHashMap::default(),
            order: Vec::new(),
            results: Vec::new(),
        };
        if pattern_size > 0 {
            search.search();
        }
        search.results
    }

    fn search(&mut self) {
        if self.order.len() == self.pattern_size {
            self.results.push(self.order.clone());
            return;
        }
        let Some((pc, candidates)) = self.next_candidates() else {
            return;
        };
        for fc in candidates {
            if self.is_feasible(pc, fc) {
                self.core_p.insert(pc, fc);
                self.core_f.insert(fc, pc);
                self.order.push((pc, fc));
                self.search();
                self.order.pop();
                self.core_f.remove(&fc);
                self.core_p.remove(&pc);
            }
        }
    }

    /// Terminal sets: unmapped successors (or predecessors) of the mapped
    /// nodes of one side.
    fn terminal_out(&self, graph: &Graph, mapped: &FxHashMap<NodeRef, NodeRef>) -> Vec<NodeRef> {
        let mut set: FxHashSet<NodeRef> = FxHashSet::default();
        for &n in mapped.keys() {
            set.extend(graph.successors(n).filter(|s| !mapped.contains_key(s)));
        }
        let mut out: Vec<NodeRef> = set.into_iter().collect();
        out.sort_unstable();
        out
    }

    fn terminal_in(&self, graph: &Graph, mapped: &FxHashMap<NodeRef, NodeRef>) -> Vec<NodeRef> {
        let mut set: FxHashSet<NodeRef> = FxHashSet::default();
        for &n in mapped.keys() {
            set.extend(graph.predecessors(n).filter(|p| !mapped.contains_key(p)));
        }
        let mut out: Vec<NodeRef> = set.into_iter().collect();
        out.sort_unstable();
        out
    }

    /// Picks the next pattern node and the function candidates to try for
    /// it.
    fn next_candidates(&self) -> Option<(NodeRef, Vec<NodeRef>)> {
        let p_tout = self.terminal_out(self.pg, &self.core_p);
        if let Some(&pc) = p_tout.first() {
            return Some((pc, self.terminal_out(self.fg, &self.core_f)));
        }
        let p_tin = self.terminal_in(self.pg, &self.core_p);
        if let Some(&pc) = p_tin.first() {
            return Some((pc, self.terminal_in(self.fg, &self.core_f)));
        }

        // Both terminal sets empty: pick from the disconnected remainder,
        // preferring operation and block nodes to prune the search.
        let remainder: Vec<NodeRef> = self
            .pg
            .node_refs()
            .filter(|n| !self.core_p.contains_key(n))
            .collect();
        let pc = remainder
            .iter()
            .copied()
            .find(|&n| {
                let kind = self.pg.node_kind(n);
                kind.is_operation() || kind.is_block()
            })
            .or_else(|| remainder.first().copied())?;

        let f_tout: FxHashSet<NodeRef> = self
            .terminal_out(self.fg, &self.core_f)
            .into_iter()
            .collect();
        let f_tin: FxHashSet<NodeRef> = self
            .terminal_in(self.fg, &self.core_f)
            .into_iter()
            .collect();
        let f_rest: Vec<NodeRef> = self
            .fg
            .node_refs()
            .filter(|n| {
                !self.core_f.contains_key(n) && !f_tout.contains(n) && !f_tin.contains(n)
            })
            .collect();
        Some((pc, f_rest))
    }

    fn is_feasible(&self, pc: NodeRef, fc: NodeRef) -> bool {
        if !do_nodes_match(self.fg, self.pg, fc, pc)
            || !do_edges_match(self.fg, self.pg, fc, pc)
        {
            return false;
        }

        // Consistency with every mapped pair, pattern-side: each pattern
        // edge to or from the candidate must have function counterparts
        // between the mapped endpoints.
        for &(pm, fm) in &self.order {
            if !has_corresponding_edges(self.fg, self.pg, fm, fc, pm, pc)
                || !has_corresponding_edges(self.fg, self.pg, fc, fm, pc, pm)
            {
                return false;
            }
        }

        self.lookahead_ok(pc, fc)
    }

    /// The `in`/`out` lookahead rules, weakened to inequalities: the pattern
    /// may not require more terminal neighbours than the function node has
    /// on offer. The `new` rule degenerates to the same inequality over
    /// untouched neighbours; since the function graph may carry arbitrary
    /// surplus edges, only the pattern-bounded direction prunes.
    fn lookahead_ok(&self, pc: NodeRef, fc: NodeRef) -> bool {
        let p_tout: FxHashSet<NodeRef> =
            self.terminal_out(self.pg, &self.core_p).into_iter().collect();
        let p_tin: FxHashSet<NodeRef> =
            self.terminal_in(self.pg, &self.core_p).into_iter().collect();
        let f_tout: FxHashSet<NodeRef> =
            self.terminal_out(self.fg, &self.core_f).into_iter().collect();
        let f_tin: FxHashSet<NodeRef> =
            self.terminal_in(self.fg, &self.core_f).into_iter().collect();

        let count_in = |nodes: &FxHashSet<NodeRef>, set: &FxHashSet<NodeRef>| {
            nodes.iter().filter(|n| set.contains(n)).count()
        };

        let p_succ: FxHashSet<NodeRef> = self
            .pg
            .successors(pc)
            .filter(|n| !self.core_p.contains_key(n))
            .collect();
        let f_succ: FxHashSet<NodeRef> = self
            .fg
            .successors(fc)
            .filter(|n| !self.core_f.contains_key(n))
            .collect();
        if count_in(&p_succ, &p_tout) > count_in(&f_succ, &f_tout)
            || count_in(&p_succ, &p_tin) > count_in(&f_succ, &f_tin)
        {
            return false;
        }

        let p_pred: FxHashSet<NodeRef> = self
            .pg
            .predecessors(pc)
            .filter(|n| !self.core_p.contains_key(n))
            .collect();
        let f_pred: FxHashSet<NodeRef> = self
            .fg
            .predecessors(fc)
            .filter(|n| !self.core_f.contains_key(n))
            .collect();
        count_in(&p_pred, &p_tout) <= count_in(&f_pred, &f_tout)
            && count_in(&p_pred, &p_tin) <= count_in(&f_pred, &f_tin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ComputeOp, DataType, EdgeKind, NodeKind, ValueInfo};

    fn value(g: &mut Graph, dt: DataType) -> NodeRef {
        g.add_node(NodeKind::Value(ValueInfo::new(dt)))
    }

    fn add_op(g: &mut Graph) -> NodeRef {
        g.add_node(NodeKind::Computation(ComputeOp::Add))
    }

    /// v1, v2 -> add -> v3
    fn add_graph() -> Graph {
        let mut g = Graph::new();
        let add = add_op(&mut g);
        let v1 = value(&mut g, DataType::IntTemp { bits: 32 });
        let v2 = value(&mut g, DataType::IntTemp { bits: 32 });
        let v3 = value(&mut g, DataType::IntTemp { bits: 32 });
        g.add_edge(EdgeKind::DataFlow, v1, add).unwrap();
        g.add_edge(EdgeKind::DataFlow, v2, add).unwrap();
        g.add_edge(EdgeKind::DataFlow, add, v3).unwrap();
        g
    }

    #[test]
    fn test_identical_graphs_match() {
        let fg = add_graph();
        let pg = add_graph();
        let results = Vf2Search::run(&fg, &pg);
        assert!(!results.is_empty());
        for mapping in &results {
            assert_eq!(mapping.len(), pg.node_count());
        }
    }

    #[test]
    fn test_commutative_swap_yields_two_embeddings() {
        let fg = add_graph();
        let pg = add_graph();
        let results = Vf2Search::run(&fg, &pg);
        // The two operand orderings are both embeddings; they cover the same
        // function nodes (deduplicated later by the match driver).
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_sub_pattern_in_larger_graph() {
        // Function: (v1 + v2) * v4, pattern: just the add.
        let mut fg = add_graph();
        let mul = fg.add_node(NodeKind::Computation(ComputeOp::Mul));
        let v3 = fg.find_node(crate::ir::NodeId::new(3)).unwrap();
        let v4 = value(&mut fg, DataType::IntTemp { bits: 32 });
        let v5 = value(&mut fg, DataType::IntTemp { bits: 32 });
        fg.add_edge(EdgeKind::DataFlow, v3, mul).unwrap();
        fg.add_edge(EdgeKind::DataFlow, v4, mul).unwrap();
        fg.add_edge(EdgeKind::DataFlow, mul, v5).unwrap();

        let pg = add_graph();
        let results = Vf2Search::run(&fg, &pg);
        assert_eq!(results.len(), 2); // the two commutative orderings
    }

    #[test]
    fn test_no_match_for_absent_operator() {
        let fg = add_graph();
        let mut pg = Graph::new();
        let sub = pg.add_node(NodeKind::Computation(ComputeOp::Sub));
        let v1 = value(&mut pg, DataType::Any);
        let v2 = value(&mut pg, DataType::Any);
        let v3 = value(&mut pg, DataType::Any);
        pg.add_edge(EdgeKind::DataFlow, v1, sub).unwrap();
        pg.add_edge(EdgeKind::DataFlow, v2, sub).unwrap();
        pg.add_edge(EdgeKind::DataFlow, sub, v3).unwrap();

        assert!(Vf2Search::run(&fg, &pg).is_empty());
    }

    #[test]
    fn test_single_value_pattern_matches_every_value() {
        let fg = add_graph();
        let mut pg = Graph::new();
        value(&mut pg, DataType::IntTemp { bits: 32 });

        // Falls back past the operation/block preference since the pattern
        // has no such node.
        let results = Vf2Search::run(&fg, &pg);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_empty_pattern_yields_nothing() {
        let fg = add_graph();
        let pg = Graph::new();
        assert!(Vf2Search::run(&fg, &pg).is_empty());
    }
}
