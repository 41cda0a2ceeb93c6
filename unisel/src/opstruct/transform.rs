//! Op-structure transformations.
//!
//! A small pipeline of graph rewrites the front-end output is pushed
//! through before matching. Every transformation is pure: it takes an
//! op-structure by reference and returns a new one. Inputs violating a
//! transformation's precondition abort the operation with a fatal error;
//! none of them reports a recoverable condition.

use rustc_hash::FxHashMap;

use crate::{
    ir::{
        dominators::{closest_common_dominator, dom_sets},
        extract_cfg, root_of_cfg, ComputeOp, ConstRange, DataType, EdgeKind, Graph, NodeId,
        NodeKind, NodeRef, PointerKind, ValueInfo,
    },
    opstruct::OpStructure,
    target::TargetMachine,
    Error, Result,
};

fn df_pred(graph: &Graph, node: NodeRef) -> Option<NodeRef> {
    graph.predecessors_via(node, EdgeKind::DataFlow).next()
}

fn df_succ(graph: &Graph, node: NodeRef) -> Option<NodeRef> {
    graph.successors_via(node, EdgeKind::DataFlow).next()
}

fn singleton_const_of(graph: &Graph, node: NodeRef) -> Option<i64> {
    graph.node_kind(node).data_type()?.as_int_const()
}

/// The identity constant of an operator, if eliding an operand equal to it
/// turns the operation into a copy.
fn identity_const(op: ComputeOp) -> Option<i64> {
    match op {
        ComputeOp::Add | ComputeOp::Or => Some(0),
        ComputeOp::Mul => Some(1),
        ComputeOp::And => Some(-1),
        _ => None,
    }
}

/// Rewrites computations with an identity-constant operand into copies.
///
/// `add x, 0`, `mul x, 1`, `or x, 0`, and `and x, -1` all produce their
/// other operand unchanged; the computation node becomes a [`NodeKind::Copy`]
/// and the edge from the constant operand is elided (the constant node
/// itself is left for dead-code elimination).
#[must_use]
pub fn canonicalize_copies(os: &OpStructure) -> OpStructure {
    let mut os = os.clone();
    let candidates: Vec<NodeRef> = os
        .graph
        .node_refs()
        .filter(|&n| {
            matches!(os.graph.node_kind(n), NodeKind::Computation(op) if identity_const(*op).is_some())
        })
        .collect();
    let mut rewritten = 0usize;
    for node in candidates {
        let NodeKind::Computation(op) = *os.graph.node_kind(node) else {
            continue;
        };
        let identity = identity_const(op).expect("candidate operator has an identity");
        let inputs: Vec<_> = os
            .graph
            .in_edges_of_kind(node, EdgeKind::DataFlow)
            .collect();
        if inputs.len() != 2 {
            continue;
        }
        let const_edge = inputs.iter().copied().find(|&e| {
            singleton_const_of(&os.graph, os.graph.edge_source(e)) == Some(identity)
        });
        if let Some(edge) = const_edge {
            os.graph.delete_edge(edge);
            os.graph.set_node_kind(node, NodeKind::Copy);
            rewritten += 1;
        }
    }
    if rewritten > 0 {
        log::debug!("canonicalize_copies: rewrote {rewritten} computation(s)");
    }
    os
}

/// Rewrites pointer-typed values into integers of the target's pointer
/// size and eliminates pointer conversions.
///
/// Null pointers become the target's null-pointer constant; pointer
/// temporaries become integer temporaries; pointer constants keep their
/// address range. Conversions whose operand and result widths end up equal
/// are deleted with their adjacent value nodes merged (references in the
/// constraints and metadata follow the surviving node); the rest are
/// rewritten into [`ComputeOp::ZExt`] or [`ComputeOp::Trunc`] by width.
///
/// # Errors
///
/// Returns [`Error::Precondition`] if a conversion lacks a data-flow
/// operand or result.
pub fn lower_pointers(os: &OpStructure, target: &TargetMachine) -> Result<OpStructure> {
    let mut os = os.clone();
    let bits = target.pointer_size;

    let values: Vec<NodeRef> = os.graph.node_refs().collect();
    for node in values {
        let NodeKind::Value(info) = os.graph.node_kind(node) else {
            continue;
        };
        let DataType::Pointer(kind) = info.data_type else {
            continue;
        };
        let lowered = match kind {
            PointerKind::Null => DataType::IntConst {
                range: ConstRange::singleton(target.null_pointer_value),
                bits: Some(bits),
            },
            PointerKind::Temp => DataType::IntTemp { bits },
            PointerKind::Const(range) => DataType::IntConst {
                range,
                bits: Some(bits),
            },
        };
        let origin = info.origin.clone();
        os.graph.set_node_kind(
            node,
            NodeKind::Value(ValueInfo {
                data_type: lowered,
                origin,
            }),
        );
    }

    let conversions: Vec<NodeRef> = os
        .graph
        .node_refs()
        .filter(|&n| {
            matches!(
                os.graph.node_kind(n),
                NodeKind::Computation(ComputeOp::IntToPtr | ComputeOp::PtrToInt)
            )
        })
        .collect();
    for conv in conversions {
        let input = df_pred(&os.graph, conv).ok_or_else(|| {
            Error::precondition(
                "lower_pointers",
                format!(
                    "conversion {} has no data-flow operand",
                    os.graph.node_id(conv)
                ),
            )
        })?;
        let output = df_succ(&os.graph, conv).ok_or_else(|| {
            Error::precondition(
                "lower_pointers",
                format!(
                    "conversion {} has no data-flow result",
                    os.graph.node_id(conv)
                ),
            )
        })?;
        let width_of = |n: NodeRef| {
            os.graph
                .node_kind(n)
                .data_type()
                .and_then(DataType::bits)
                .unwrap_or(bits)
        };
        let in_bits = width_of(input);
        let out_bits = width_of(output);
        if in_bits == out_bits {
            let keep_id = os.graph.node_id(input);
            let discard_id = os.graph.node_id(output);
            os.graph.delete_node(conv);
            os.graph.merge_nodes(input, output)?;
            os.rename_node_references(discard_id, keep_id);
        } else if out_bits > in_bits {
            os.graph
                .set_node_kind(conv, NodeKind::Computation(ComputeOp::ZExt));
        } else {
            os.graph
                .set_node_kind(conv, NodeKind::Computation(ComputeOp::Trunc));
        }
    }
    Ok(os)
}

/// Enforces the structural invariants of phi nodes.
///
/// (a) A phi consuming the same value over several data-flow edges is
/// collapsed to a single edge, and the value's definition edges are
/// replaced by one edge to the closest common dominator of the blocks they
/// named. (b) When several values enter a phi from the same block, only the
/// first is kept.
///
/// The entry block is derived from the control-flow root and recorded on
/// the op-structure when it was unset.
///
/// # Errors
///
/// Returns an error if the control-flow view is malformed or has no unique
/// root.
pub fn enforce_phi_node_invariants(os: &OpStructure) -> Result<OpStructure> {
    let mut os = os.clone();

    let view = extract_cfg(&os.graph)?;
    let root = match os.entry_block.and_then(|id| view.graph.find_node(id)) {
        Some(root) => root,
        None => root_of_cfg(&view.graph)?,
    };
    if os.entry_block.is_none() {
        os.entry_block = Some(view.graph.node_id(root));
    }
    let doms = dom_sets(&view.graph, root);
    let cfg_ref_of_id: FxHashMap<NodeId, NodeRef> = view
        .graph
        .node_refs()
        .map(|r| (view.graph.node_id(r), r))
        .collect();

    let phis: Vec<NodeRef> = os
        .graph
        .node_refs()
        .filter(|&n| matches!(os.graph.node_kind(n), NodeKind::Phi))
        .collect();

    for phi in phis {
        // (a) Collapse repeated uses of one value.
        let in_edges = os
            .graph
            .sorted_by_in_number(os.graph.in_edges_of_kind(phi, EdgeKind::DataFlow));
        let mut first_edge_of: FxHashMap<NodeRef, crate::ir::EdgeRef> = FxHashMap::default();
        let mut repeated: Vec<NodeRef> = Vec::new();
        for edge in in_edges {
            let value = os.graph.edge_source(edge);
            if first_edge_of.insert(value, edge).is_some() {
                os.graph.delete_edge(edge);
                if !repeated.contains(&value) {
                    repeated.push(value);
                }
            }
        }
        for value in repeated {
            let def_edges: Vec<_> = os
                .graph
                .out_edges_of_kind(value, EdgeKind::DefPlacement)
                .collect();
            let def_blocks: Vec<NodeId> = def_edges
                .iter()
                .map(|&e| os.graph.node_id(os.graph.edge_target(e)))
                .collect();
            let Some(&first_block) = def_blocks.first() else {
                continue;
            };
            let mut common = *cfg_ref_of_id.get(&first_block).ok_or_else(|| {
                Error::GraphError(format!("block {first_block} is not in the control-flow view"))
            })?;
            for block in def_blocks.iter().skip(1) {
                let cfg_block = *cfg_ref_of_id.get(block).ok_or_else(|| {
                    Error::GraphError(format!("block {block} is not in the control-flow view"))
                })?;
                common = closest_common_dominator(&doms, common, cfg_block).ok_or_else(|| {
                    Error::GraphError(format!(
                        "blocks {} and {} have no common dominator",
                        view.graph.node_id(common),
                        block
                    ))
                })?;
            }
            let common_id = view.graph.node_id(common);
            for edge in def_edges {
                os.graph.delete_edge(edge);
            }
            let block_ref = os.graph.find_node(common_id).ok_or_else(|| {
                Error::GraphError(format!("block {common_id} vanished from the graph"))
            })?;
            os.graph
                .add_edge(EdgeKind::DefPlacement, value, block_ref)?;
        }

        // (b) Keep one entering value per block.
        let in_edges = os
            .graph
            .sorted_by_in_number(os.graph.in_edges_of_kind(phi, EdgeKind::DataFlow));
        let mut seen_blocks: FxHashMap<NodeId, NodeRef> = FxHashMap::default();
        for edge in in_edges {
            let value = os.graph.edge_source(edge);
            let Some(block) = os
                .graph
                .successors_via(value, EdgeKind::DefPlacement)
                .next()
            else {
                continue;
            };
            let block_id = os.graph.node_id(block);
            if let Some(&kept) = seen_blocks.get(&block_id) {
                if kept != value {
                    os.graph.delete_edge(edge);
                    let still_feeds_phi = os
                        .graph
                        .successors_via(value, EdgeKind::DataFlow)
                        .any(|s| s == phi);
                    if !still_feeds_phi {
                        let stale: Vec<_> = os
                            .graph
                            .out_edges_of_kind(value, EdgeKind::DefPlacement)
                            .filter(|&e| os.graph.edge_target(e) == block)
                            .collect();
                        for e in stale {
                            os.graph.delete_edge(e);
                        }
                    }
                }
            } else {
                seen_blocks.insert(block_id, value);
            }
        }
    }
    Ok(os)
}

/// Deletes phi nodes with a single input, merging the input and output
/// values.
///
/// The merged value keeps the input's identifier; constraints, valid
/// locations, and same-location pairs referencing the output are rewritten
/// to the survivor.
///
/// # Errors
///
/// Returns [`Error::Precondition`] if such a phi lacks an output value.
pub fn remove_redundant_phis(os: &OpStructure) -> Result<OpStructure> {
    let mut os = os.clone();
    loop {
        let single_input_phi = os.graph.node_refs().find(|&n| {
            matches!(os.graph.node_kind(n), NodeKind::Phi)
                && os.graph.in_edges_of_kind(n, EdgeKind::DataFlow).count() == 1
        });
        let Some(phi) = single_input_phi else {
            return Ok(os);
        };
        let input = df_pred(&os.graph, phi).expect("phi has one data-flow input");
        let output = df_succ(&os.graph, phi).ok_or_else(|| {
            Error::precondition(
                "remove_redundant_phis",
                format!("phi {} has no output value", os.graph.node_id(phi)),
            )
        })?;
        let keep_id = os.graph.node_id(input);
        let discard_id = os.graph.node_id(output);

        // The phi's placement edges disappear with it; the output's
        // definition edge does too, since the surviving value keeps its own
        // definition site.
        os.graph.delete_node(phi);
        let output_defs: Vec<_> = os
            .graph
            .in_edges_of_kind(output, EdgeKind::DefPlacement)
            .collect();
        for edge in output_defs {
            os.graph.delete_edge(edge);
        }
        let feeds_other_phi = os
            .graph
            .successors_via(input, EdgeKind::DataFlow)
            .any(|s| matches!(os.graph.node_kind(s), NodeKind::Phi));
        if !feeds_other_phi {
            let input_phi_defs: Vec<_> = os
                .graph
                .out_edges_of_kind(input, EdgeKind::DefPlacement)
                .collect();
            for edge in input_phi_defs {
                os.graph.delete_edge(edge);
            }
        }
        os.graph.merge_nodes(input, output)?;
        os.rename_node_references(discard_id, keep_id);
        log::debug!("remove_redundant_phis: merged {discard_id} into {keep_id}");
    }
}

/// Iteratively removes value nodes that have no users, together with their
/// defining operations and definition edges.
///
/// Values produced by calls are kept (the call's side effects must still
/// happen). Runs to a fixed point: removing an operation may strand its
/// operand values, which the next round collects.
#[must_use]
pub fn dead_code_elimination(os: &OpStructure) -> OpStructure {
    let mut os = os.clone();
    loop {
        let dead = os.graph.node_refs().find(|&n| {
            if !os.graph.node_kind(n).is_value() {
                return false;
            }
            let has_users = os
                .graph
                .out_edges(n)
                .any(|e| {
                    matches!(
                        os.graph.edge_label(e).kind,
                        EdgeKind::DataFlow | EdgeKind::Reuse
                    )
                });
            if has_users {
                return false;
            }
            !matches!(
                df_pred(&os.graph, n).map(|p| os.graph.node_kind(p).clone()),
                Some(NodeKind::Call(_)) | Some(NodeKind::IndirCall)
            )
        });
        let Some(value) = dead else {
            return os;
        };
        let id = os.graph.node_id(value);
        let producer = df_pred(&os.graph, value);
        os.graph.delete_node(value);
        if let Some(op) = producer {
            os.graph.delete_node(op);
        }
        os.valid_locations.remove(&id);
        os.same_locations.retain(|&(a, b)| a != id && b != id);
        log::debug!("dead_code_elimination: removed value {id}");
    }
}

/// Rewrites masking operations that only reproduce a prior extension into
/// copies.
///
/// A `ZExt`/`SExt` from `n` bits followed by an `and`/`xor` with the
/// constant `(1 << n) - 1` leaves the extended value unchanged; the masking
/// node becomes a copy and the mask operand is elided.
#[must_use]
pub fn remove_redundant_conversions(os: &OpStructure) -> OpStructure {
    let mut os = os.clone();
    let extensions: Vec<NodeRef> = os
        .graph
        .node_refs()
        .filter(|&n| {
            matches!(
                os.graph.node_kind(n),
                NodeKind::Computation(ComputeOp::ZExt | ComputeOp::SExt)
            )
        })
        .collect();
    for ext in extensions {
        let Some(input) = df_pred(&os.graph, ext) else {
            continue;
        };
        let Some(orig_bits) = os
            .graph
            .node_kind(input)
            .data_type()
            .and_then(DataType::bits)
        else {
            continue;
        };
        let Some(mask) = 1i64
            .checked_shl(u32::from(orig_bits))
            .map(|shifted| shifted - 1)
        else {
            continue;
        };
        let Some(extended) = df_succ(&os.graph, ext) else {
            continue;
        };
        let consumers: Vec<NodeRef> = os
            .graph
            .successors_via(extended, EdgeKind::DataFlow)
            .filter(|&c| {
                matches!(
                    os.graph.node_kind(c),
                    NodeKind::Computation(ComputeOp::And | ComputeOp::XOr)
                )
            })
            .collect();
        for masker in consumers {
            let mask_edge = os
                .graph
                .in_edges_of_kind(masker, EdgeKind::DataFlow)
                .find(|&e| {
                    let src = os.graph.edge_source(e);
                    src != extended && singleton_const_of(&os.graph, src) == Some(mask)
                });
            if let Some(edge) = mask_edge {
                os.graph.delete_edge(edge);
                os.graph.set_node_kind(masker, NodeKind::Copy);
                log::debug!(
                    "remove_redundant_conversions: masking node {} became a copy",
                    os.graph.node_id(masker)
                );
            }
        }
    }
    os
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ControlOp;
    use rustc_hash::FxHashMap as Map;

    fn int_value(g: &mut Graph, bits: u16) -> NodeRef {
        g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntTemp { bits })))
    }

    fn const_value(g: &mut Graph, value: i64, bits: u16) -> NodeRef {
        g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntConst {
            range: ConstRange::singleton(value),
            bits: Some(bits),
        })))
    }

    fn target_64() -> TargetMachine {
        TargetMachine {
            id: "t".into(),
            instructions: Map::default(),
            locations: Map::default(),
            pointer_size: 64,
            null_pointer_value: 0,
        }
    }

    #[test]
    fn test_add_zero_becomes_copy() {
        let mut g = Graph::new();
        let add = g.add_node(NodeKind::Computation(ComputeOp::Add));
        let x = int_value(&mut g, 32);
        let zero = const_value(&mut g, 0, 32);
        let out = int_value(&mut g, 32);
        g.add_edge(EdgeKind::DataFlow, x, add).unwrap();
        g.add_edge(EdgeKind::DataFlow, zero, add).unwrap();
        g.add_edge(EdgeKind::DataFlow, add, out).unwrap();

        let os = canonicalize_copies(&OpStructure::new(g));

        let add = os.graph.find_node(NodeId::new(0)).unwrap();
        assert_eq!(*os.graph.node_kind(add), NodeKind::Copy);
        assert_eq!(
            os.graph.in_edges_of_kind(add, EdgeKind::DataFlow).count(),
            1
        );
    }

    #[test]
    fn test_and_minus_one_becomes_copy_but_sub_zero_does_not() {
        let mut g = Graph::new();
        let and = g.add_node(NodeKind::Computation(ComputeOp::And));
        let x = int_value(&mut g, 32);
        let ones = const_value(&mut g, -1, 32);
        g.add_edge(EdgeKind::DataFlow, x, and).unwrap();
        g.add_edge(EdgeKind::DataFlow, ones, and).unwrap();

        let sub = g.add_node(NodeKind::Computation(ComputeOp::Sub));
        let y = int_value(&mut g, 32);
        let zero = const_value(&mut g, 0, 32);
        g.add_edge(EdgeKind::DataFlow, y, sub).unwrap();
        g.add_edge(EdgeKind::DataFlow, zero, sub).unwrap();

        let os = canonicalize_copies(&OpStructure::new(g));

        let and = os.graph.find_node(NodeId::new(0)).unwrap();
        let sub = os.graph.find_node(NodeId::new(3)).unwrap();
        assert_eq!(*os.graph.node_kind(and), NodeKind::Copy);
        assert_eq!(
            *os.graph.node_kind(sub),
            NodeKind::Computation(ComputeOp::Sub)
        );
    }

    #[test]
    fn test_lower_pointers_retypes_values() {
        let mut g = Graph::new();
        let null = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Pointer(
            PointerKind::Null,
        ))));
        let temp = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Pointer(
            PointerKind::Temp,
        ))));

        let os = lower_pointers(&OpStructure::new(g), &target_64()).unwrap();

        let null = os.graph.find_node(NodeId::new(0)).unwrap();
        let temp = os.graph.find_node(NodeId::new(1)).unwrap();
        assert_eq!(
            os.graph.node_kind(null).data_type(),
            Some(&DataType::IntConst {
                range: ConstRange::singleton(0),
                bits: Some(64),
            })
        );
        assert_eq!(
            os.graph.node_kind(temp).data_type(),
            Some(&DataType::IntTemp { bits: 64 })
        );
    }

    #[test]
    fn test_equal_width_conversion_deleted_and_merged() {
        let mut g = Graph::new();
        let input = g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntTemp {
            bits: 64,
        })));
        let conv = g.add_node(NodeKind::Computation(ComputeOp::IntToPtr));
        let output = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Pointer(
            PointerKind::Temp,
        ))));
        let user = g.add_node(NodeKind::Computation(ComputeOp::Add));
        g.add_edge(EdgeKind::DataFlow, input, conv).unwrap();
        g.add_edge(EdgeKind::DataFlow, conv, output).unwrap();
        g.add_edge(EdgeKind::DataFlow, output, user).unwrap();
        let input_id = g.node_id(input);
        let output_id = g.node_id(output);

        let mut os = OpStructure::new(g);
        os.valid_locations
            .insert(output_id, vec![crate::ir::LocationId::new(1)]);

        let os = lower_pointers(&os, &target_64()).unwrap();

        // The conversion and the output value are gone; the input value now
        // feeds the user, and the metadata follows the survivor.
        assert!(os.graph.find_node(output_id).is_none());
        let input = os.graph.find_node(input_id).unwrap();
        let user = os.graph.find_node(NodeId::new(3)).unwrap();
        assert_eq!(os.graph.edges_between(input, user).len(), 1);
        assert!(os.valid_locations.contains_key(&input_id));
    }

    #[test]
    fn test_narrowing_conversion_becomes_trunc() {
        let mut g = Graph::new();
        let input = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Pointer(
            PointerKind::Temp,
        ))));
        let conv = g.add_node(NodeKind::Computation(ComputeOp::PtrToInt));
        let output = int_value(&mut g, 32);
        g.add_edge(EdgeKind::DataFlow, input, conv).unwrap();
        g.add_edge(EdgeKind::DataFlow, conv, output).unwrap();

        let os = lower_pointers(&OpStructure::new(g), &target_64()).unwrap();

        let conv = os.graph.find_node(NodeId::new(1)).unwrap();
        assert_eq!(
            *os.graph.node_kind(conv),
            NodeKind::Computation(ComputeOp::Trunc)
        );
    }

    /// Builds a diamond CFG (B0 -> B1, B0 -> B2, both -> B3) with a phi in
    /// B3 consuming `value` twice, with definition edges to B1 and B2.
    fn phi_diamond() -> (OpStructure, NodeId, NodeId) {
        let mut g = Graph::new();
        let b0 = g.add_node(NodeKind::Block { name: "B0".into() });
        let b1 = g.add_node(NodeKind::Block { name: "B1".into() });
        let b2 = g.add_node(NodeKind::Block { name: "B2".into() });
        let b3 = g.add_node(NodeKind::Block { name: "B3".into() });
        let br0 = g.add_node(NodeKind::Control(ControlOp::CondBranch));
        let br1 = g.add_node(NodeKind::Control(ControlOp::Branch));
        let br2 = g.add_node(NodeKind::Control(ControlOp::Branch));
        g.add_edge(EdgeKind::ControlFlow, b0, br0).unwrap();
        g.add_edge(EdgeKind::ControlFlow, br0, b1).unwrap();
        g.add_edge(EdgeKind::ControlFlow, br0, b2).unwrap();
        g.add_edge(EdgeKind::ControlFlow, b1, br1).unwrap();
        g.add_edge(EdgeKind::ControlFlow, br1, b3).unwrap();
        g.add_edge(EdgeKind::ControlFlow, b2, br2).unwrap();
        g.add_edge(EdgeKind::ControlFlow, br2, b3).unwrap();

        let phi = g.add_node(NodeKind::Phi);
        let value = int_value(&mut g, 32);
        let out = int_value(&mut g, 32);
        g.add_edge(EdgeKind::DataFlow, value, phi).unwrap();
        g.add_edge(EdgeKind::DataFlow, value, phi).unwrap();
        g.add_edge(EdgeKind::DataFlow, phi, out).unwrap();
        g.add_edge(EdgeKind::DefPlacement, value, b1).unwrap();
        g.add_edge(EdgeKind::DefPlacement, value, b2).unwrap();
        g.add_edge(EdgeKind::DefPlacement, b3, out).unwrap();

        let value_id = g.node_id(value);
        let b0_id = g.node_id(b0);
        (OpStructure::new(g), value_id, b0_id)
    }

    #[test]
    fn test_phi_duplicate_value_collapses_to_common_dominator() {
        let (os, value_id, b0_id) = phi_diamond();
        let os = enforce_phi_node_invariants(&os).unwrap();

        let phi = os
            .graph
            .node_refs()
            .find(|&n| matches!(os.graph.node_kind(n), NodeKind::Phi))
            .unwrap();
        assert_eq!(os.graph.in_edges_of_kind(phi, EdgeKind::DataFlow).count(), 1);

        let value = os.graph.find_node(value_id).unwrap();
        let def_blocks: Vec<NodeId> = os
            .graph
            .successors_via(value, EdgeKind::DefPlacement)
            .map(|b| os.graph.node_id(b))
            .collect();
        assert_eq!(def_blocks, vec![b0_id]);
    }

    #[test]
    fn test_entry_block_set_when_unset() {
        let (os, _, b0_id) = phi_diamond();
        assert!(os.entry_block.is_none());
        let os = enforce_phi_node_invariants(&os).unwrap();
        assert_eq!(os.entry_block, Some(b0_id));
    }

    #[test]
    fn test_single_input_phi_removed_and_values_merged() {
        let mut g = Graph::new();
        let b = g.add_node(NodeKind::Block { name: "B".into() });
        let phi = g.add_node(NodeKind::Phi);
        let input = int_value(&mut g, 32);
        let output = int_value(&mut g, 32);
        let user = g.add_node(NodeKind::Computation(ComputeOp::Add));
        g.add_edge(EdgeKind::DataFlow, input, phi).unwrap();
        g.add_edge(EdgeKind::DataFlow, phi, output).unwrap();
        g.add_edge(EdgeKind::DataFlow, output, user).unwrap();
        g.add_edge(EdgeKind::DefPlacement, input, b).unwrap();
        g.add_edge(EdgeKind::DefPlacement, b, output).unwrap();
        let input_id = g.node_id(input);
        let output_id = g.node_id(output);

        let mut os = OpStructure::new(g);
        os.same_locations.push((output_id, input_id));

        let os = remove_redundant_phis(&os).unwrap();

        assert!(os
            .graph
            .node_refs()
            .all(|n| !matches!(os.graph.node_kind(n), NodeKind::Phi)));
        assert!(os.graph.find_node(output_id).is_none());
        let input = os.graph.find_node(input_id).unwrap();
        let user = os.graph.find_node(NodeId::new(4)).unwrap();
        assert_eq!(os.graph.edges_between(input, user).len(), 1);
        // The (output, input) pair collapsed onto one node and was dropped.
        assert!(os.same_locations.is_empty());
    }

    #[test]
    fn test_dce_removes_unused_chain_but_keeps_call_results() {
        let mut g = Graph::new();
        let x = int_value(&mut g, 32);
        let add = g.add_node(NodeKind::Computation(ComputeOp::Add));
        let y = int_value(&mut g, 32);
        let dead = int_value(&mut g, 32);
        g.add_edge(EdgeKind::DataFlow, x, add).unwrap();
        g.add_edge(EdgeKind::DataFlow, y, add).unwrap();
        g.add_edge(EdgeKind::DataFlow, add, dead).unwrap();

        let call = g.add_node(NodeKind::Call("ext".into()));
        let call_out = int_value(&mut g, 32);
        g.add_edge(EdgeKind::DataFlow, call, call_out).unwrap();

        let os = dead_code_elimination(&OpStructure::new(g));

        // The dead add chain is gone entirely; the call result stays.
        assert!(os
            .graph
            .node_refs()
            .all(|n| !matches!(os.graph.node_kind(n), NodeKind::Computation(_))));
        assert!(os
            .graph
            .node_refs()
            .any(|n| matches!(os.graph.node_kind(n), NodeKind::Call(_))));
        assert_eq!(
            os.graph
                .node_refs()
                .filter(|&n| os.graph.node_kind(n).is_value())
                .count(),
            1
        );
    }

    #[test]
    fn test_masking_after_zext_becomes_copy() {
        let mut g = Graph::new();
        let narrow = int_value(&mut g, 8);
        let zext = g.add_node(NodeKind::Computation(ComputeOp::ZExt));
        let wide = int_value(&mut g, 32);
        let and = g.add_node(NodeKind::Computation(ComputeOp::And));
        let mask = const_value(&mut g, 0xff, 32);
        let out = int_value(&mut g, 32);
        g.add_edge(EdgeKind::DataFlow, narrow, zext).unwrap();
        g.add_edge(EdgeKind::DataFlow, zext, wide).unwrap();
        g.add_edge(EdgeKind::DataFlow, wide, and).unwrap();
        g.add_edge(EdgeKind::DataFlow, mask, and).unwrap();
        g.add_edge(EdgeKind::DataFlow, and, out).unwrap();

        let os = remove_redundant_conversions(&OpStructure::new(g));

        let and = os.graph.find_node(NodeId::new(3)).unwrap();
        assert_eq!(*os.graph.node_kind(and), NodeKind::Copy);
        assert_eq!(os.graph.in_edges_of_kind(and, EdgeKind::DataFlow).count(), 1);
    }

    #[test]
    fn test_wrong_mask_is_left_alone() {
        let mut g = Graph::new();
        let narrow = int_value(&mut g, 8);
        let zext = g.add_node(NodeKind::Computation(ComputeOp::ZExt));
        let wide = int_value(&mut g, 32);
        let and = g.add_node(NodeKind::Computation(ComputeOp::And));
        let mask = const_value(&mut g, 0x7f, 32);
        g.add_edge(EdgeKind::DataFlow, narrow, zext).unwrap();
        g.add_edge(EdgeKind::DataFlow, zext, wide).unwrap();
        g.add_edge(EdgeKind::DataFlow, wide, and).unwrap();
        g.add_edge(EdgeKind::DataFlow, mask, and).unwrap();

        let os = remove_redundant_conversions(&OpStructure::new(g));
        let and = os.graph.find_node(NodeId::new(3)).unwrap();
        assert_eq!(
            *os.graph.node_kind(and),
            NodeKind::Computation(ComputeOp::And)
        );
    }
}
