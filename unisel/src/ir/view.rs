//! Projections of a function graph.
//!
//! The selector never analyzes the full mixed graph directly. Control-flow
//! questions (roots, dominators) are answered on the *CFG view* — the
//! projection to block nodes with every control node collapsed into its
//! block — and data-dependency questions on the *SSA view* — the projection
//! to operation and value nodes connected by data flow.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    ir::{
        edge::EdgeKind,
        graph::{Graph, NodeRef},
    },
    Error, Result,
};

/// The CFG view of a graph together with the ref translation for block
/// nodes.
#[derive(Debug, Clone)]
pub struct CfgView {
    /// The projected graph; contains block nodes only, connected by
    /// control-flow edges
    pub graph: Graph,
    /// Translation from block refs of the source graph to refs of
    /// [`CfgView::graph`]
    pub block_map: FxHashMap<NodeRef, NodeRef>,
}

/// Extracts the control-flow view: block and control nodes projected out of
/// the graph, with every control node collapsed into its unique predecessor
/// block.
///
/// The result contains only block nodes; an edge `a -> b` means control may
/// transfer from block `a` to block `b`.
///
/// # Errors
///
/// Returns [`Error::GraphError`] if some control node does not have exactly
/// one predecessor block in the projection (a malformed function graph).
pub fn extract_cfg(graph: &Graph) -> Result<CfgView> {
    let keep: FxHashSet<NodeRef> = graph
        .node_refs()
        .filter(|&n| {
            let kind = graph.node_kind(n);
            kind.is_block() || matches!(kind, crate::ir::NodeKind::Control(_))
        })
        .collect();
    let (mut cfg, map) = graph.extract_subgraph(&keep);

    // The projection keeps only control-flow structure.
    let non_cf: Vec<_> = cfg
        .edge_refs()
        .filter(|&e| cfg.edge_label(e).kind != EdgeKind::ControlFlow)
        .collect();
    for edge in non_cf {
        cfg.delete_edge(edge);
    }

    let controls: Vec<NodeRef> = cfg
        .node_refs()
        .filter(|&n| !cfg.node_kind(n).is_block())
        .collect();
    for control in controls {
        cfg.delete_node_keep_edges(control).map_err(|_| {
            Error::GraphError(format!(
                "control node {} has no unique predecessor block",
                cfg.node_id(control)
            ))
        })?;
    }

    let block_map = map
        .into_iter()
        .filter(|(orig, _)| graph.node_kind(*orig).is_block())
        .collect();
    Ok(CfgView {
        graph: cfg,
        block_map,
    })
}

/// Extracts the SSA view: operation and value nodes connected by data-flow
/// edges.
///
/// State nodes, block nodes, and every non-data-flow edge are dropped.
#[must_use]
pub fn extract_ssa(graph: &Graph) -> (Graph, FxHashMap<NodeRef, NodeRef>) {
    let keep: FxHashSet<NodeRef> = graph
        .node_refs()
        .filter(|&n| {
            let kind = graph.node_kind(n);
            kind.is_operation() || kind.is_value()
        })
        .collect();
    let (mut ssa, map) = graph.extract_subgraph(&keep);
    let non_df: Vec<_> = ssa
        .edge_refs()
        .filter(|&e| ssa.edge_label(e).kind != EdgeKind::DataFlow)
        .collect();
    for edge in non_df {
        ssa.delete_edge(edge);
    }
    (ssa, map)
}

/// Returns the unique root of a CFG view: the block node with no
/// predecessors.
///
/// # Errors
///
/// Returns [`Error::GraphError`] if no block or more than one block
/// qualifies.
pub fn root_of_cfg(cfg: &Graph) -> Result<NodeRef> {
    let mut roots = cfg
        .node_refs()
        .filter(|&n| cfg.predecessors(n).next().is_none());
    match (roots.next(), roots.next()) {
        (Some(root), None) => Ok(root),
        (None, _) => Err(Error::GraphError(
            "control-flow graph has no root block".into(),
        )),
        (Some(a), Some(b)) => Err(Error::GraphError(format!(
            "control-flow graph has several root blocks ({} and {})",
            cfg.node_id(a),
            cfg.node_id(b)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::node::{ComputeOp, ControlOp, DataType, NodeKind, ValueInfo};

    /// Builds `A -(br)-> B` with one computation in between:
    /// block A, control Branch fed by A, targeting block B, plus an add
    /// consuming two values.
    fn branchy_graph() -> (Graph, NodeRef, NodeRef) {
        let mut g = Graph::new();
        let a = g.add_node(NodeKind::Block { name: "A".into() });
        let b = g.add_node(NodeKind::Block { name: "B".into() });
        let br = g.add_node(NodeKind::Control(ControlOp::Branch));
        g.add_edge(EdgeKind::ControlFlow, a, br).unwrap();
        g.add_edge(EdgeKind::ControlFlow, br, b).unwrap();

        let add = g.add_node(NodeKind::Computation(ComputeOp::Add));
        let v1 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntTemp { bits: 32 })));
        let v2 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntTemp { bits: 32 })));
        let v3 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntTemp { bits: 32 })));
        g.add_edge(EdgeKind::DataFlow, v1, add).unwrap();
        g.add_edge(EdgeKind::DataFlow, v2, add).unwrap();
        g.add_edge(EdgeKind::DataFlow, add, v3).unwrap();
        g.add_edge(EdgeKind::DefPlacement, a, v3).unwrap();

        (g, a, b)
    }

    #[test]
    fn test_extract_cfg_collapses_control_nodes() {
        let (g, a, b) = branchy_graph();
        let view = extract_cfg(&g).unwrap();

        assert_eq!(view.graph.node_count(), 2);
        let ca = view.block_map[&a];
        let cb = view.block_map[&b];
        let succs: Vec<NodeRef> = view.graph.successors(ca).collect();
        assert_eq!(succs, vec![cb]);
    }

    #[test]
    fn test_root_of_cfg_finds_entry() {
        let (g, a, _) = branchy_graph();
        let view = extract_cfg(&g).unwrap();
        let root = root_of_cfg(&view.graph).unwrap();
        assert_eq!(view.graph.node_id(root), g.node_id(a));
    }

    #[test]
    fn test_root_of_cfg_rejects_two_roots() {
        let mut g = Graph::new();
        g.add_node(NodeKind::Block { name: "A".into() });
        g.add_node(NodeKind::Block { name: "B".into() });
        let view = extract_cfg(&g).unwrap();
        assert!(root_of_cfg(&view.graph).is_err());
    }

    #[test]
    fn test_extract_ssa_keeps_data_flow_only() {
        let (g, _, _) = branchy_graph();
        let (ssa, _) = extract_ssa(&g);

        // add + 3 values + the control node (an operation) survive; blocks do
        // not.
        assert!(ssa.node_refs().all(|n| !ssa.node_kind(n).is_block()));
        assert!(ssa
            .edge_refs()
            .all(|e| ssa.edge_label(e).kind == EdgeKind::DataFlow));
        assert_eq!(ssa.edge_count(), 3);
    }
}
