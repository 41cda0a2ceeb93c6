//! Model lowering and solution raising, end to end.

use rustc_hash::FxHashMap;

use unisel::{
    constraints::{BoolExpr, Constraint, LocationExpr, NodeExpr, NumExpr},
    function::Function,
    ir::{
        ArrayIndex, ComputeOp, ControlOp, DataType, EdgeKind, Graph, InstructionId, LocationId,
        NodeId, NodeKind, PatternId, ValueInfo,
    },
    matcher::find_matches,
    model::{
        build_high_level_model, lower_constraint, lower_model, raise_solution,
        ArrayIndexMaplists, LowLevelSolution,
    },
    opstruct::OpStructure,
    target::{
        EmitStringPart, EmitStringTemplate, InstrPattern, InstrProperties, Instruction, Location,
        TargetMachine,
    },
};

/// One-block function computing `v3 = v1 + v2` and returning it.
fn function_under_test() -> Function {
    let mut g = Graph::new();
    let entry = g.add_node(NodeKind::Block {
        name: "entry".into(),
    });
    let add = g.add_node(NodeKind::Computation(ComputeOp::Add));
    let v1 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntTemp { bits: 32 })));
    let v2 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::IntConst {
        range: unisel::ir::ConstRange::singleton(7),
        bits: Some(32),
    })));
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
    os.add_constraint(OpStructure::value_location_constraint(
        NodeId::new(4),
        &[LocationId::new(1), LocationId::new(2)],
    ));
    let mut function = Function::new("f", os);
    function.exec_frequencies.insert(entry_id, 100);
    function.input_data = vec![NodeId::new(2)];
    function
}

fn target_under_test() -> TargetMachine {
    let mut pg = Graph::new();
    let add = pg.add_node(NodeKind::Computation(ComputeOp::Add));
    let v1 = pg.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
    let v2 = pg.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
    let v3 = pg.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
    pg.add_edge(EdgeKind::DataFlow, v1, add).unwrap();
    pg.add_edge(EdgeKind::DataFlow, v2, add).unwrap();
    pg.add_edge(EdgeKind::DataFlow, add, v3).unwrap();
    let ids = [pg.node_id(v1), pg.node_id(v2), pg.node_id(v3)];

    let pattern = InstrPattern {
        id: PatternId::new(0),
        op_structure: OpStructure::new(pg),
        input_data: vec![ids[0], ids[1]],
        output_data: vec![ids[2]],
        emit_template: EmitStringTemplate {
            lines: vec![vec![
                EmitStringPart::Verbatim("add ".into()),
                EmitStringPart::LocationOf(ids[2]),
            ]],
        },
    };
    let instruction = Instruction {
        id: InstructionId::new(3),
        patterns: vec![pattern],
        properties: InstrProperties::new(4, 1),
    };
    let mut instructions = FxHashMap::default();
    instructions.insert(instruction.id, instruction);

    let mut locations = FxHashMap::default();
    for i in 0..3u32 {
        locations.insert(
            LocationId::new(i),
            Location {
                id: LocationId::new(i),
                name: format!("l{i}"),
                fixed_value: None,
            },
        );
    }
    TargetMachine {
        id: "test".into(),
        instructions,
        locations,
        pointer_size: 64,
        null_pointer_value: 0,
    }
}

#[test]
fn constraint_ids_lower_to_array_indices() {
    // Value node 17 at entity index 4, location 3 at index 0.
    let model_stub = {
        let function = function_under_test();
        let target = target_under_test();
        build_high_level_model(&function, &target, &[]).unwrap()
    };
    let mut maps = ArrayIndexMaplists::from_model(&model_stub);
    maps.data = unisel::model::IdIndexMap::from_ids([
        NodeId::new(2),
        NodeId::new(5),
        NodeId::new(9),
        NodeId::new(11),
        NodeId::new(17),
    ]);
    maps.locations = unisel::model::IdIndexMap::from_ids([LocationId::new(3), LocationId::new(8)]);

    let constraint = Constraint(BoolExpr::Eq(
        NumExpr::LocationToNum(LocationExpr::OfValueNode(NodeExpr::Id(NodeId::new(17)))),
        NumExpr::LocationToNum(LocationExpr::Id(LocationId::new(3))),
    ));

    let lowered = lower_constraint(&constraint, &maps).unwrap();

    assert_eq!(
        lowered.0,
        BoolExpr::Eq(
            NumExpr::LocationToNum(LocationExpr::OfValueNode(NodeExpr::ArrayIndex(
                ArrayIndex::new(4)
            ))),
            NumExpr::LocationToNum(LocationExpr::ArrayIndex(ArrayIndex::new(0))),
        )
    );
}

#[test]
fn lowered_model_is_dense_and_complete() {
    let function = function_under_test();
    let target = target_under_test();
    let matches = find_matches(&function, &target).unwrap();
    assert_eq!(matches.len(), 1);

    let high = build_high_level_model(&function, &target, &matches).unwrap();
    let maps = ArrayIndexMaplists::from_model(&high);
    let low = lower_model(&high, &maps).unwrap();

    assert_eq!(low.fun_num_operations, 2); // add + ret
    assert_eq!(low.fun_num_data, 3);
    assert_eq!(low.fun_num_blocks, 1);
    assert_eq!(low.num_matches, 1);
    assert_eq!(low.num_locations, 3);
    assert_eq!(low.fun_bb_exec_freqs, vec![100]);
    assert_eq!(low.match_code_sizes, vec![4]);
    assert_eq!(low.match_latencies, vec![1]);
    assert_eq!(low.match_adduc_settings, vec![true]);
    assert_eq!(low.match_non_copy_instructions, vec![ArrayIndex::new(0)]);
    assert_eq!(low.match_entry_blocks, vec![None]);
    // The single match covers the add.
    assert_eq!(low.match_operations_covered[0].len(), 1);
    assert_eq!(low.match_data_used[0].len(), 2);
    assert_eq!(low.match_data_defined[0].len(), 1);
    // Dominator sets: the entry block dominates itself.
    assert_eq!(low.fun_block_dom_sets, vec![vec![ArrayIndex::new(0)]]);
}

#[test]
fn maps_are_a_bijection() {
    let function = function_under_test();
    let target = target_under_test();
    let matches = find_matches(&function, &target).unwrap();
    let high = build_high_level_model(&function, &target, &matches).unwrap();
    let maps = ArrayIndexMaplists::from_model(&high);

    for &id in maps.operations.ids() {
        let index = maps.operations.index_of(id).unwrap();
        assert_eq!(maps.operations.id_at(index), Some(id));
    }
    for &id in maps.data.ids() {
        let index = maps.data.index_of(id).unwrap();
        assert_eq!(maps.data.id_at(index), Some(id));
    }
    // The six namespaces cover exactly the model's entities.
    assert_eq!(maps.operations.len(), high.function_params.operation_nodes.len());
    assert_eq!(
        maps.data.len(),
        high.function_params.data_nodes.len() + high.function_params.state_nodes.len()
    );
    assert_eq!(maps.blocks.len(), high.function_params.block_nodes.len());
    assert_eq!(maps.matches.len(), high.match_params.len());
}

#[test]
fn raising_selects_matches_and_blocks() {
    let maps = ArrayIndexMaplists {
        operations: unisel::model::IdIndexMap::from_ids([]),
        data: unisel::model::IdIndexMap::from_ids([]),
        blocks: unisel::model::IdIndexMap::from_ids([NodeId::new(21), NodeId::new(22)]),
        matches: unisel::model::IdIndexMap::from_ids([
            unisel::ir::MatchId::new(7),
            unisel::ir::MatchId::new(11),
            unisel::ir::MatchId::new(13),
        ]),
        locations: unisel::model::IdIndexMap::from_ids([]),
        instructions: unisel::model::IdIndexMap::from_ids([]),
    };
    let solution = LowLevelSolution {
        order_of_bbs: vec![ArrayIndex::new(0), ArrayIndex::new(1)],
        is_match_selected: vec![false, true, true],
        bb_allocated_for_match: vec![ArrayIndex::new(0), ArrayIndex::new(0), ArrayIndex::new(1)],
        has_data_loc: vec![],
        loc_selected_for_data: vec![],
        has_data_imm_value: vec![],
        imm_value_of_data: vec![],
        cost: 7,
    };

    let raised = raise_solution(&solution, &maps).unwrap();

    assert_eq!(
        raised.selected_matches,
        vec![unisel::ir::MatchId::new(11), unisel::ir::MatchId::new(13)]
    );
    assert_eq!(
        raised.blocks_allocated_for_selected_matches,
        vec![
            (unisel::ir::MatchId::new(11), NodeId::new(21)),
            (unisel::ir::MatchId::new(13), NodeId::new(22)),
        ]
    );
}

#[test]
fn lower_then_raise_round_trips_through_the_maps() {
    let function = function_under_test();
    let target = target_under_test();
    let matches = find_matches(&function, &target).unwrap();
    let high = build_high_level_model(&function, &target, &matches).unwrap();
    let maps = ArrayIndexMaplists::from_model(&high);
    let low = lower_model(&high, &maps).unwrap();

    // A solution selecting everything, every entity in its first location
    // with its model-declared constant.
    let solution = LowLevelSolution {
        order_of_bbs: (0..low.fun_num_blocks as u32).map(ArrayIndex::new).collect(),
        is_match_selected: vec![true; low.num_matches],
        bb_allocated_for_match: vec![ArrayIndex::new(0); low.num_matches],
        has_data_loc: vec![true; low.fun_num_data],
        loc_selected_for_data: vec![ArrayIndex::new(1); low.fun_num_data],
        has_data_imm_value: vec![false; low.fun_num_data],
        imm_value_of_data: vec![0; low.fun_num_data],
        cost: 0,
    };
    let raised = raise_solution(&solution, &maps).unwrap();

    // Every raised identifier is one the high-level model knows.
    for block in &raised.order_of_bbs {
        assert!(high.function_params.block_nodes.contains(block));
    }
    for m in &raised.selected_matches {
        assert!(high.match_params.iter().any(|mp| mp.match_id == *m));
    }
    for (node, loc) in &raised.locations_of_data_nodes {
        assert!(high.function_params.data_nodes.contains(node));
        assert!(high.machine_params.locations.contains(loc));
    }
    assert!(raised.imm_values_of_data_nodes.is_empty());
}

#[test]
fn wire_keys_match_the_persisted_format() {
    let function = function_under_test();
    let target = target_under_test();
    let matches = find_matches(&function, &target).unwrap();
    let high = build_high_level_model(&function, &target, &matches).unwrap();
    let maps = ArrayIndexMaplists::from_model(&high);
    let low = lower_model(&high, &maps).unwrap();

    let high_json: serde_json::Value = serde_json::to_value(&high).unwrap();
    for key in ["function-params", "machine-params", "match-params"] {
        assert!(high_json.get(key).is_some(), "missing key {key}");
    }
    let fp = &high_json["function-params"];
    for key in [
        "operation-nodes",
        "data-nodes",
        "state-nodes",
        "block-nodes",
        "entry-block",
        "block-dom-sets",
        "def-edges",
        "block-params",
        "int-const-data",
        "constraints",
    ] {
        assert!(fp.get(key).is_some(), "missing function-params key {key}");
    }
    let mp = &high_json["match-params"][0];
    for key in [
        "instruction-id",
        "pattern-id",
        "match-id",
        "operations-covered",
        "data-defined",
        "data-used",
        "spanned-blocks",
        "code-size",
        "latency",
        "apply-def-dom-use-constraint",
        "is-non-copy-instruction",
        "has-control-flow",
        "data-used-by-phis",
        "asm-str-node-maps",
        "constraints",
    ] {
        assert!(mp.get(key).is_some(), "missing match-params key {key}");
    }

    let low_json: serde_json::Value = serde_json::to_value(&low).unwrap();
    for key in [
        "fun-num-operations",
        "fun-num-data",
        "fun-num-blocks",
        "fun-states",
        "fun-entry-block",
        "fun-block-dom-sets",
        "fun-def-edges",
        "fun-bb-exec-freqs",
        "fun-constraints",
        "num-locations",
        "num-matches",
        "match-operations-covered",
        "match-data-defined",
        "match-data-used",
        "match-entry-blocks",
        "match-spanned-blocks",
        "match-code-sizes",
        "match-latencies",
        "match-adduc-settings",
        "match-non-copy-instructions",
        "match-constraints",
    ] {
        assert!(low_json.get(key).is_some(), "missing low-level key {key}");
    }
}
