//! Node and edge compatibility rules for the matcher.
//!
//! These are the *semantic* feasibility tests layered on top of the VF2
//! search. Node compatibility checks kinds, operator compatibility, data
//! types, and — where it matters for the pattern node kind — the number of
//! distinct edge numbers per kind and direction. Edge compatibility checks
//! that the edges running between a candidate pair and an already-mapped
//! pair agree in multiplicity and, where ordering matters, in their edge
//! numbers.

use crate::ir::{Direction, EdgeKind, Graph, NodeKind, NodeRef};

/// Returns `true` if the block node is *intermediate*: it has at least one
/// inbound control-flow edge from a control node and at least one outbound
/// control-flow edge to a control node.
#[must_use]
pub fn is_intermediate_block(graph: &Graph, block: NodeRef) -> bool {
    if !graph.node_kind(block).is_block() {
        return false;
    }
    let has_control_in = graph
        .predecessors_via(block, EdgeKind::ControlFlow)
        .any(|p| matches!(graph.node_kind(p), NodeKind::Control(_)));
    let has_control_out = graph
        .successors_via(block, EdgeKind::ControlFlow)
        .any(|s| matches!(graph.node_kind(s), NodeKind::Control(_)));
    has_control_in && has_control_out
}

/// The (kind, direction) scopes whose edge counts must agree for a pattern
/// node of the given kind.
fn counted_scopes(pg: &Graph, pn: NodeRef) -> &'static [(EdgeKind, Direction)] {
    use Direction::{In, Out};
    use EdgeKind::{ControlFlow, DataFlow, StateFlow};

    const COMPUTATION: &[(EdgeKind, Direction)] = &[
        (ControlFlow, In),
        (ControlFlow, Out),
        (DataFlow, In),
        (DataFlow, Out),
        (StateFlow, In),
        (StateFlow, Out),
    ];
    const CONTROL: &[(EdgeKind, Direction)] =
        &[(ControlFlow, In), (ControlFlow, Out), (DataFlow, In)];
    const BLOCK: &[(EdgeKind, Direction)] = &[(ControlFlow, In), (ControlFlow, Out)];

    match pg.node_kind(pn) {
        NodeKind::Computation(_) => COMPUTATION,
        NodeKind::Control(_) => CONTROL,
        NodeKind::Block { .. } if is_intermediate_block(pg, pn) => BLOCK,
        _ => &[],
    }
}

/// Checks whether a function node may be covered by a pattern node.
///
/// Kinds must be pairwise compatible, and for the edge scopes that matter at
/// the pattern node's kind, the number of distinct edge numbers must agree
/// on both sides (parallel edges sharing a number count once).
#[must_use]
pub fn do_nodes_match(fg: &Graph, pg: &Graph, fn_: NodeRef, pn: NodeRef) -> bool {
    let compatible = match (fg.node_kind(fn_), pg.node_kind(pn)) {
        (NodeKind::Computation(f_op), NodeKind::Computation(p_op)) => {
            p_op.is_compatible_with(*f_op)
        }
        (NodeKind::Control(f_op), NodeKind::Control(p_op)) => f_op == p_op,
        (NodeKind::Call(_), NodeKind::Call(_)) => true,
        (NodeKind::IndirCall, NodeKind::IndirCall) => true,
        (NodeKind::Phi, NodeKind::Phi) => true,
        (NodeKind::Copy, NodeKind::Copy) => true,
        (NodeKind::Reuse, NodeKind::Reuse) => true,
        (NodeKind::State, NodeKind::State) => true,
        (NodeKind::Value(f_info), NodeKind::Value(p_info)) => {
            p_info.data_type.is_compatible_with(&f_info.data_type)
        }
        (NodeKind::Block { .. }, NodeKind::Block { .. }) => true,
        _ => false,
    };
    if !compatible {
        return false;
    }
    counted_scopes(pg, pn).iter().all(|&(kind, dir)| {
        pg.distinct_edge_numbers(pn, kind, dir) == fg.distinct_edge_numbers(fn_, kind, dir)
    })
}

/// Returns `true` if edge order matters at the given pattern endpoint for
/// the given kind and direction.
fn order_matters(pg: &Graph, endpoint: NodeRef, kind: EdgeKind, dir: Direction) -> bool {
    match (pg.node_kind(endpoint), kind, dir) {
        (NodeKind::Block { .. }, EdgeKind::ControlFlow, Direction::In) => {
            is_intermediate_block(pg, endpoint)
        }
        (NodeKind::Control(_), EdgeKind::ControlFlow, Direction::Out) => true,
        (NodeKind::Control(_), EdgeKind::DataFlow, Direction::In) => true,
        (NodeKind::Computation(op), EdgeKind::DataFlow, Direction::In) => !op.is_commutative(),
        (NodeKind::Computation(_), EdgeKind::DataFlow, Direction::Out) => true,
        (NodeKind::Phi, EdgeKind::DataFlow, Direction::In) => true,
        _ => false,
    }
}

/// Checks edge-ordering compatibility of a candidate pair.
///
/// For every edge kind and direction where order matters at the pattern
/// node's kind, the sorted multisets of edge numbers on the pattern side
/// and the function side must be equal — not merely equinumerous, so a
/// function node whose numbering has gaps the pattern's does not is
/// rejected. Where order does not matter, nothing is compared here.
///
/// This is a check on the node pair's labels, not on operand
/// correspondence: the two operand orderings of a computation both pass it,
/// and duplicate removal decides which survive.
#[must_use]
pub fn do_edges_match(fg: &Graph, pg: &Graph, fn_: NodeRef, pn: NodeRef) -> bool {
    for kind in EdgeKind::ALL {
        for dir in [Direction::In, Direction::Out] {
            if !order_matters(pg, pn, kind, dir) {
                continue;
            }
            if pg.edge_numbers(pn, kind, dir) != fg.edge_numbers(fn_, kind, dir) {
                return false;
            }
        }
    }
    true
}

/// Checks that the pattern edges between a candidate pair and a mapped pair
/// all have function counterparts: for every edge kind, the function graph
/// must carry at least as many parallel edges between the mapped endpoints
/// as the pattern does.
#[must_use]
pub fn has_corresponding_edges(
    fg: &Graph,
    pg: &Graph,
    f_src: NodeRef,
    f_dst: NodeRef,
    p_src: NodeRef,
    p_dst: NodeRef,
) -> bool {
    for kind in EdgeKind::ALL {
        let p_count = pg
            .edges_between(p_src, p_dst)
            .into_iter()
            .filter(|&e| pg.edge_label(e).kind == kind)
            .count();
        if p_count == 0 {
            continue;
        }
        let f_count = fg
            .edges_between(f_src, f_dst)
            .into_iter()
            .filter(|&e| fg.edge_label(e).kind == kind)
            .count();
        if f_count < p_count {
            return false;
        }
    }
    true
}
