//! End-to-end matching scenarios.

use rustc_hash::FxHashMap;

use unisel::{
    function::Function,
    ir::{
        ComputeOp, DataType, EdgeKind, Graph, InstructionId, LocationId, MatchId, NodeId,
        NodeKind, PatternId, ValueInfo,
    },
    matcher::{do_nodes_match, find_matches, find_pattern_matches},
    opstruct::OpStructure,
    target::{
        EmitStringTemplate, InstrFlags, InstrPattern, InstrProperties, Instruction, Location,
        TargetMachine,
    },
};

fn value(g: &mut Graph, dt: DataType) -> unisel::ir::NodeRef {
    g.add_node(NodeKind::Value(ValueInfo::new(dt)))
}

/// Builds `op(v1, v2) -> v3`, adding the operand edges in the order given.
fn binary_graph(op: ComputeOp, swap_inputs: bool) -> Graph {
    let mut g = Graph::new();
    let c = g.add_node(NodeKind::Computation(op));
    let v1 = value(&mut g, DataType::IntTemp { bits: 32 });
    let v2 = value(&mut g, DataType::IntTemp { bits: 32 });
    let v3 = value(&mut g, DataType::IntTemp { bits: 32 });
    let (first, second) = if swap_inputs { (v2, v1) } else { (v1, v2) };
    g.add_edge(EdgeKind::DataFlow, first, c).unwrap();
    g.add_edge(EdgeKind::DataFlow, second, c).unwrap();
    g.add_edge(EdgeKind::DataFlow, c, v3).unwrap();
    g
}

fn single_pattern_target(op: ComputeOp, simd: bool) -> TargetMachine {
    let graph = binary_graph(op, false);
    let pattern = InstrPattern {
        id: PatternId::new(0),
        op_structure: OpStructure::new(graph),
        input_data: vec![NodeId::new(1), NodeId::new(2)],
        output_data: vec![NodeId::new(3)],
        emit_template: EmitStringTemplate::new(),
    };
    let mut properties = InstrProperties::new(4, 1);
    if simd {
        properties.flags |= InstrFlags::SIMD;
    }
    let instruction = Instruction {
        id: InstructionId::new(0),
        patterns: vec![pattern],
        properties,
    };
    let mut instructions = FxHashMap::default();
    instructions.insert(instruction.id, instruction);
    let mut locations = FxHashMap::default();
    locations.insert(
        LocationId::new(0),
        Location {
            id: LocationId::new(0),
            name: "null".into(),
            fixed_value: None,
        },
    );
    TargetMachine {
        id: "test".into(),
        instructions,
        locations,
        pointer_size: 64,
        null_pointer_value: 0,
    }
}

#[test]
fn commutative_add_matches_once() {
    let fg = binary_graph(ComputeOp::Add, true);
    let pg = binary_graph(ComputeOp::Add, false);
    let matches = find_pattern_matches(&fg, &pg);
    assert_eq!(matches.len(), 1);
}

#[test]
fn non_commutative_add_matches_twice() {
    // The same shape with a non-commutative operator keeps both operand
    // orderings as distinct matches.
    let fg = binary_graph(ComputeOp::Sub, true);
    let pg = binary_graph(ComputeOp::Sub, false);
    let matches = find_pattern_matches(&fg, &pg);
    assert_eq!(matches.len(), 2);
}

#[test]
fn matches_are_well_formed() {
    let fg = binary_graph(ComputeOp::Add, false);
    let pg = binary_graph(ComputeOp::Add, false);
    for m in find_pattern_matches(&fg, &pg) {
        // Every pattern node appears exactly once.
        assert_eq!(m.len(), pg.node_count());
        let mut pattern_nodes: Vec<NodeId> = m.pattern_nodes().collect();
        pattern_nodes.sort();
        pattern_nodes.dedup();
        assert_eq!(pattern_nodes.len(), pg.node_count());

        // Node compatibility holds pairwise.
        for pair in m.pairs() {
            let pn = pg.find_node(pair.pattern_node).unwrap();
            let fn_ = fg.find_node(pair.function_node).unwrap();
            assert!(do_nodes_match(&fg, &pg, fn_, pn));
        }
    }
}

#[test]
fn match_ids_are_dense_and_deterministic() {
    let mut fg = Graph::new();
    {
        // Two independent subtractions.
        for _ in 0..2 {
            let c = fg.add_node(NodeKind::Computation(ComputeOp::Sub));
            let v1 = value(&mut fg, DataType::IntTemp { bits: 32 });
            let v2 = value(&mut fg, DataType::IntTemp { bits: 32 });
            let v3 = value(&mut fg, DataType::IntTemp { bits: 32 });
            fg.add_edge(EdgeKind::DataFlow, v1, c).unwrap();
            fg.add_edge(EdgeKind::DataFlow, v2, c).unwrap();
            fg.add_edge(EdgeKind::DataFlow, c, v3).unwrap();
        }
    }
    let function = Function::new("f", OpStructure::new(fg));
    let target = single_pattern_target(ComputeOp::Sub, false);

    let first = find_matches(&function, &target).unwrap();
    let second = find_matches(&function, &target).unwrap();

    let ids: Vec<MatchId> = first.iter().map(|m| m.match_id).collect();
    assert_eq!(ids, (0..first.len() as u32).map(MatchId::new).collect::<Vec<_>>());

    // Parallel enumeration does not perturb the result.
    let key = |ms: &[unisel::matcher::PatternMatch]| {
        ms.iter()
            .map(|m| (m.instruction, m.pattern, m.match_id, m.matching.canonical_key()))
            .collect::<Vec<_>>()
    };
    assert_eq!(key(&first), key(&second));
}

#[test]
fn simd_lanes_are_pairwise_independent() {
    // Three independent adds; a two-lane SIMD add must produce C(3,2)
    // combinations, none self-dependent.
    let mut fg = Graph::new();
    for _ in 0..3 {
        let c = fg.add_node(NodeKind::Computation(ComputeOp::Add));
        let v1 = value(&mut fg, DataType::IntTemp { bits: 32 });
        let v2 = value(&mut fg, DataType::IntTemp { bits: 32 });
        let v3 = value(&mut fg, DataType::IntTemp { bits: 32 });
        fg.add_edge(EdgeKind::DataFlow, v1, c).unwrap();
        fg.add_edge(EdgeKind::DataFlow, v2, c).unwrap();
        fg.add_edge(EdgeKind::DataFlow, c, v3).unwrap();
    }
    let function = Function::new("f", OpStructure::new(fg));

    // Build a two-lane SIMD pattern by doubling the scalar pattern.
    let mut pg = Graph::new();
    let mut outputs = Vec::new();
    let mut inputs = Vec::new();
    for _ in 0..2 {
        let c = pg.add_node(NodeKind::Computation(ComputeOp::Add));
        let v1 = value(&mut pg, DataType::Any);
        let v2 = value(&mut pg, DataType::Any);
        let v3 = value(&mut pg, DataType::Any);
        pg.add_edge(EdgeKind::DataFlow, v1, c).unwrap();
        pg.add_edge(EdgeKind::DataFlow, v2, c).unwrap();
        pg.add_edge(EdgeKind::DataFlow, c, v3).unwrap();
        inputs.extend([pg.node_id(v1), pg.node_id(v2)]);
        outputs.push(pg.node_id(v3));
    }
    let pattern = InstrPattern {
        id: PatternId::new(0),
        op_structure: OpStructure::new(pg),
        input_data: inputs,
        output_data: outputs,
        emit_template: EmitStringTemplate::new(),
    };
    let mut properties = InstrProperties::new(4, 1);
    properties.flags |= InstrFlags::SIMD;
    let instruction = Instruction {
        id: InstructionId::new(0),
        patterns: vec![pattern],
        properties,
    };
    let mut instructions = FxHashMap::default();
    instructions.insert(instruction.id, instruction);
    let target = TargetMachine {
        id: "test".into(),
        instructions,
        locations: FxHashMap::default(),
        pointer_size: 64,
        null_pointer_value: 0,
    };

    let matches = find_matches(&function, &target).unwrap();
    assert_eq!(matches.len(), 3);
    for m in &matches {
        // 2 lanes x 4 nodes, all function nodes distinct.
        assert_eq!(m.matching.len(), 8);
        let mut fn_nodes: Vec<NodeId> = m.matching.function_nodes().collect();
        fn_nodes.sort();
        fn_nodes.dedup();
        assert_eq!(fn_nodes.len(), 8);
    }
}
