//! Assembly of the high-level model from a function, a target machine, and
//! the match list.

use rustc_hash::FxHashMap;

use crate::{
    constraints::{replace_pattern_node_ids, replace_this_match_with, Constraint},
    function::Function,
    ir::{
        dominators::dom_sets, extract_cfg, root_of_cfg, EdgeKind, Graph, NodeId, NodeKind,
        NodeRef,
    },
    matcher::PatternMatch,
    model::{BlockParams, FunctionParams, HighLevelModel, MachineParams, MatchParams},
    target::{InstrFlags, InstrPattern, TargetMachine},
    Error, Result,
};

/// Builds the high-level model for a function on a target, given the
/// matches enumerated for the pair.
///
/// # Errors
///
/// Returns an error if the function has no identifiable entry block, if a
/// match references an instruction or pattern the target does not have, or
/// if a match lacks a mapping for a pattern node its parameters need.
pub fn build_high_level_model(
    function: &Function,
    target: &TargetMachine,
    matches: &[PatternMatch],
) -> Result<HighLevelModel> {
    let function_params = build_function_params(function)?;
    let machine_params = MachineParams {
        target_machine_id: target.id.clone(),
        locations: target.location_ids(),
    };
    let match_params = matches
        .iter()
        .map(|m| build_match_params(function, target, m))
        .collect::<Result<Vec<_>>>()?;
    Ok(HighLevelModel {
        function_params,
        machine_params,
        match_params,
    })
}

fn build_function_params(function: &Function) -> Result<FunctionParams> {
    let graph = &function.op_structure.graph;

    let mut operation_nodes = Vec::new();
    let mut data_nodes = Vec::new();
    let mut state_nodes = Vec::new();
    let mut block_nodes = Vec::new();
    for (node, kind) in graph.nodes() {
        let id = graph.node_id(node);
        match kind {
            k if k.is_block() => block_nodes.push(id),
            k if k.is_operation() => operation_nodes.push(id),
            NodeKind::Value(_) => data_nodes.push(id),
            NodeKind::State => state_nodes.push(id),
            _ => unreachable!("every node kind is classified"),
        }
    }
    operation_nodes.sort_unstable();
    data_nodes.sort_unstable();
    state_nodes.sort_unstable();
    block_nodes.sort_unstable();

    let view = extract_cfg(graph)?;
    let root = match function
        .op_structure
        .entry_block
        .and_then(|id| view.graph.find_node(id))
    {
        Some(root) => root,
        None => root_of_cfg(&view.graph)?,
    };
    let entry_block = view.graph.node_id(root);

    let doms = dom_sets(&view.graph, root);
    let mut block_dom_sets: Vec<(NodeId, Vec<NodeId>)> = doms
        .into_iter()
        .map(|(block, dominators)| {
            let mut ids: Vec<NodeId> =
                dominators.into_iter().map(|d| view.graph.node_id(d)).collect();
            ids.sort_unstable();
            (view.graph.node_id(block), ids)
        })
        .collect();
    block_dom_sets.sort_unstable_by_key(|(block, _)| *block);

    let mut def_edges: Vec<(NodeId, NodeId)> = graph
        .edge_refs()
        .filter(|&e| graph.edge_label(e).kind == EdgeKind::DefPlacement)
        .map(|e| normalized_def_edge(graph, e))
        .collect();
    def_edges.sort_unstable();
    def_edges.dedup();

    let block_params = block_nodes
        .iter()
        .map(|&id| {
            let node = graph.find_node(id).expect("listed block is in the graph");
            let NodeKind::Block { name } = graph.node_kind(node) else {
                unreachable!("listed block has block kind");
            };
            BlockParams {
                name: name.clone(),
                node: id,
                exec_frequency: function.exec_frequency(id),
            }
        })
        .collect();

    let mut int_const_data: Vec<(NodeId, i64)> = graph
        .nodes()
        .filter_map(|(node, kind)| {
            let value = kind.data_type()?.as_int_const()?;
            Some((graph.node_id(node), value))
        })
        .collect();
    int_const_data.sort_unstable();

    Ok(FunctionParams {
        operation_nodes,
        data_nodes,
        state_nodes,
        block_nodes,
        entry_block,
        block_dom_sets,
        def_edges,
        block_params,
        int_const_data,
        constraints: function.op_structure.constraints.clone(),
    })
}

fn normalized_def_edge(graph: &Graph, edge: crate::ir::EdgeRef) -> (NodeId, NodeId) {
    let (src, dst) = (graph.edge_source(edge), graph.edge_target(edge));
    if graph.node_kind(src).is_block() {
        (graph.node_id(src), graph.node_id(dst))
    } else {
        (graph.node_id(dst), graph.node_id(src))
    }
}

fn build_match_params(
    function: &Function,
    target: &TargetMachine,
    m: &PatternMatch,
) -> Result<MatchParams> {
    let instr = target.instruction(m.instruction)?;
    let pattern = instr.pattern(m.pattern)?;
    let pg = &pattern.op_structure.graph;
    let map = m.matching.as_map();

    let require = |pattern_id: NodeId| -> Result<NodeId> {
        map.get(&pattern_id).copied().ok_or_else(|| {
            Error::precondition(
                "build_match_params",
                format!(
                    "match {} has no mapping for pattern node {pattern_id}",
                    m.match_id
                ),
            )
        })
    };

    let mut operations_covered = map_pattern_nodes(pg, &require, |kind| kind.is_operation())?;
    operations_covered.sort_unstable();

    let mut data_defined = pattern
        .output_data
        .iter()
        .map(|&p| require(p))
        .collect::<Result<Vec<_>>>()?;
    data_defined.sort_unstable();
    let mut data_used = pattern
        .input_data
        .iter()
        .map(|&p| require(p))
        .collect::<Result<Vec<_>>>()?;
    data_used.sort_unstable();

    let entry_block = match pattern.op_structure.entry_block {
        Some(p) => Some(require(p)?),
        None => None,
    };

    let mut spanned_blocks = map_pattern_nodes(pg, &require, NodeKind::is_block)?;
    spanned_blocks.sort_unstable();

    let constraints = pattern
        .op_structure
        .constraints
        .iter()
        .map(|c| bind_constraint(c, m, &map))
        .collect::<Result<Vec<Constraint>>>()?;

    let mut data_used_by_phis: Vec<NodeId> = pg
        .node_refs()
        .filter(|&n| matches!(pg.node_kind(n), NodeKind::Phi))
        .flat_map(|phi| {
            pg.predecessors_via(phi, EdgeKind::DataFlow)
                .collect::<Vec<NodeRef>>()
        })
        .map(|v| require(pg.node_id(v)))
        .collect::<Result<Vec<_>>>()?;
    data_used_by_phis.sort_unstable();
    data_used_by_phis.dedup();

    let asm_str_node_maps = emit_node_maps(pattern, &require)?;

    Ok(MatchParams {
        instruction: m.instruction,
        pattern: m.pattern,
        match_id: m.match_id,
        operations_covered,
        data_defined,
        data_used,
        entry_block,
        spanned_blocks,
        code_size: instr.properties.code_size,
        latency: instr.properties.latency,
        apply_def_dom_use_constraint: !instr.properties.flags.contains(InstrFlags::PHI),
        is_non_copy_instruction: !instr.properties.flags.contains(InstrFlags::COPY),
        has_control_flow: pg
            .nodes()
            .any(|(_, kind)| matches!(kind, NodeKind::Control(_))),
        data_used_by_phis,
        asm_str_node_maps,
        constraints,
    })
}

fn map_pattern_nodes(
    pg: &Graph,
    require: &impl Fn(NodeId) -> Result<NodeId>,
    select: impl Fn(&NodeKind) -> bool,
) -> Result<Vec<NodeId>> {
    pg.nodes()
        .filter(|(_, kind)| select(kind))
        .map(|(node, _)| require(pg.node_id(node)))
        .collect()
}

fn bind_constraint(
    c: &Constraint,
    m: &PatternMatch,
    map: &FxHashMap<NodeId, NodeId>,
) -> Result<Constraint> {
    let with_match = replace_this_match_with(c, m.match_id);
    replace_pattern_node_ids(&with_match, map)
}

fn emit_node_maps(
    pattern: &InstrPattern,
    require: &impl Fn(NodeId) -> Result<NodeId>,
) -> Result<Vec<Vec<Option<NodeId>>>> {
    pattern
        .emit_template
        .node_references()
        .into_iter()
        .map(|line| {
            line.into_iter()
                .map(|part| part.map(require).transpose())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ComputeOp, ControlOp, DataType, LocationId, ValueInfo};
    use crate::matcher::{find_matches, Matching};
    use crate::opstruct::OpStructure;
    use crate::target::{
        EmitStringPart, EmitStringTemplate, InstrProperties, Instruction, Location,
    };
    use crate::ir::{InstructionId, MatchId, PatternId};
    use rustc_hash::FxHashMap as Map;

    /// A function with one block, a return, and a single add.
    fn simple_function() -> Function {
        let mut g = Graph::new();
        let entry = g.add_node(NodeKind::Block {
            name: "entry".into(),
        });
        let add = g.add_node(NodeKind::Computation(ComputeOp::Add));
        let v1 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntTemp { bits: 32 })));
        let v2 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntTemp { bits: 32 })));
        let v3 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntTemp { bits: 32 })));
        let ret = g.add_node(NodeKind::Control(ControlOp::Ret));
        g.add_edge(EdgeKind::DataFlow, v1, add).unwrap();
        g.add_edge(EdgeKind::DataFlow, v2, add).unwrap();
        g.add_edge(EdgeKind::DataFlow, add, v3).unwrap();
        g.add_edge(EdgeKind::ControlFlow, entry, ret).unwrap();
        g.add_edge(EdgeKind::DataFlow, v3, ret).unwrap();
        g.add_edge(EdgeKind::DefPlacement, entry, v3).unwrap();

        let entry_id = g.node_id(entry);
        let mut os = OpStructure::new(g);
        os.entry_block = Some(entry_id);
        let mut f = Function::new("simple", os);
        f.exec_frequencies.insert(entry_id, 10);
        f
    }

    /// A target with a single add instruction.
    fn add_target() -> TargetMachine {
        let mut pg = Graph::new();
        let add = pg.add_node(NodeKind::Computation(ComputeOp::Add));
        let v1 = pg.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
        let v2 = pg.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
        let v3 = pg.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
        pg.add_edge(EdgeKind::DataFlow, v1, add).unwrap();
        pg.add_edge(EdgeKind::DataFlow, v2, add).unwrap();
        pg.add_edge(EdgeKind::DataFlow, add, v3).unwrap();
        let v1 = pg.node_id(v1);
        let v2 = pg.node_id(v2);
        let v3 = pg.node_id(v3);

        let pattern = InstrPattern {
            id: PatternId::new(0),
            op_structure: OpStructure::new(pg),
            input_data: vec![v1, v2],
            output_data: vec![v3],
            emit_template: EmitStringTemplate {
                lines: vec![vec![
                    EmitStringPart::Verbatim("add ".into()),
                    EmitStringPart::LocationOf(v3),
                    EmitStringPart::Verbatim(", ".into()),
                    EmitStringPart::LocationOf(v1),
                ]],
            },
        };
        let instruction = Instruction {
            id: InstructionId::new(0),
            patterns: vec![pattern],
            properties: InstrProperties::new(4, 1),
        };

        let mut instructions = Map::default();
        instructions.insert(instruction.id, instruction);
        let mut locations = Map::default();
        for (i, name) in ["null", "r1", "r2"].iter().enumerate() {
            let id = LocationId::new(i as u32);
            locations.insert(
                id,
                Location {
                    id,
                    name: (*name).into(),
                    fixed_value: None,
                },
            );
        }
        TargetMachine {
            id: "toy".into(),
            instructions,
            locations,
            pointer_size: 64,
            null_pointer_value: 0,
        }
    }

    #[test]
    fn test_function_params_classify_nodes() {
        let function = simple_function();
        let target = add_target();
        let model = build_high_level_model(&function, &target, &[]).unwrap();

        let f = &model.function_params;
        assert_eq!(f.operation_nodes.len(), 2); // add + ret
        assert_eq!(f.data_nodes.len(), 3);
        assert!(f.state_nodes.is_empty());
        assert_eq!(f.block_nodes.len(), 1);
        assert_eq!(f.entry_block, f.block_nodes[0]);
        assert_eq!(f.block_params[0].exec_frequency, 10);
        assert_eq!(f.def_edges.len(), 1);
        assert_eq!(f.def_edges[0].0, f.entry_block);
    }

    #[test]
    fn test_match_params_from_real_match() {
        let function = simple_function();
        let target = add_target();
        let matches = find_matches(&function, &target).unwrap();
        assert_eq!(matches.len(), 1);

        let model = build_high_level_model(&function, &target, &matches).unwrap();
        let mp = &model.match_params[0];

        assert_eq!(mp.match_id, MatchId::new(0));
        assert_eq!(mp.operations_covered.len(), 1);
        assert_eq!(mp.data_used.len(), 2);
        assert_eq!(mp.data_defined.len(), 1);
        assert!(mp.apply_def_dom_use_constraint);
        assert!(mp.is_non_copy_instruction);
        assert!(!mp.has_control_flow);
        assert_eq!(mp.code_size, 4);
        assert_eq!(mp.latency, 1);
        // Verbatim parts map to none, node parts map to function nodes.
        assert_eq!(mp.asm_str_node_maps.len(), 1);
        assert_eq!(mp.asm_str_node_maps[0][0], None);
        assert!(mp.asm_str_node_maps[0][1].is_some());
    }

    #[test]
    fn test_phi_pattern_is_exempt_from_def_dom_use() {
        // A function whose phi merges two values.
        let mut g = Graph::new();
        let entry = g.add_node(NodeKind::Block {
            name: "entry".into(),
        });
        let phi = g.add_node(NodeKind::Phi);
        let v1 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntTemp { bits: 32 })));
        let v2 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntTemp { bits: 32 })));
        let out = g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntTemp { bits: 32 })));
        let ret = g.add_node(NodeKind::Control(ControlOp::Ret));
        g.add_edge(EdgeKind::DataFlow, v1, phi).unwrap();
        g.add_edge(EdgeKind::DataFlow, v2, phi).unwrap();
        g.add_edge(EdgeKind::DataFlow, phi, out).unwrap();
        g.add_edge(EdgeKind::ControlFlow, entry, ret).unwrap();
        g.add_edge(EdgeKind::DataFlow, out, ret).unwrap();
        let entry_id = g.node_id(entry);
        let mut os = OpStructure::new(g);
        os.entry_block = Some(entry_id);
        let function = Function::new("phis", os);

        // The generic phi instruction.
        let mut pg = Graph::new();
        let p_phi = pg.add_node(NodeKind::Phi);
        let p_v1 = pg.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
        let p_v2 = pg.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
        let p_out = pg.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
        pg.add_edge(EdgeKind::DataFlow, p_v1, p_phi).unwrap();
        pg.add_edge(EdgeKind::DataFlow, p_v2, p_phi).unwrap();
        pg.add_edge(EdgeKind::DataFlow, p_phi, p_out).unwrap();
        let inputs = vec![pg.node_id(p_v1), pg.node_id(p_v2)];
        let output = pg.node_id(p_out);
        let mut properties = InstrProperties::new(0, 0);
        properties.flags |= crate::target::InstrFlags::PHI;
        let instruction = Instruction {
            id: InstructionId::new(9),
            patterns: vec![InstrPattern {
                id: PatternId::new(0),
                op_structure: OpStructure::new(pg),
                input_data: inputs,
                output_data: vec![output],
                emit_template: EmitStringTemplate::new(),
            }],
            properties,
        };
        let mut target = add_target();
        target.instructions.clear();
        target.instructions.insert(instruction.id, instruction);

        let matches = find_matches(&function, &target).unwrap();
        assert!(!matches.is_empty());
        let model = build_high_level_model(&function, &target, &matches).unwrap();
        let mp = &model.match_params[0];
        assert!(!mp.apply_def_dom_use_constraint);
        assert_eq!(mp.data_used_by_phis.len(), 2);
    }

    #[test]
    fn test_missing_mapping_is_fatal() {
        let function = simple_function();
        let target = add_target();
        let bogus = PatternMatch {
            instruction: InstructionId::new(0),
            pattern: PatternId::new(0),
            match_id: MatchId::new(0),
            matching: Matching::from_pairs([]),
        };
        let err = build_high_level_model(&function, &target, &[bogus]).unwrap_err();
        assert!(err.to_string().contains("no mapping"));
    }
}
