//! Built-in demo targets.
//!
//! Real target descriptions are machine-generated and handed to the library
//! as in-memory structures; the driver ships one small hand-written target
//! so the pipeline can be exercised end to end without a generator.

use anyhow::bail;
use rustc_hash::FxHashMap;

use unisel::{
    ir::{
        ComputeOp, ConstRange, DataType, EdgeKind, Graph, InstructionId, LocationId, NodeId,
        NodeKind, PatternId, ValueInfo,
    },
    opstruct::OpStructure,
    target::{
        EmitStringPart, EmitStringTemplate, InstrFlags, InstrPattern, InstrProperties, Instruction,
        Location, TargetMachine,
    },
};

/// Resolves a target by name.
pub fn by_name(name: &str) -> anyhow::Result<TargetMachine> {
    match name {
        "toy" => Ok(toy()),
        other => bail!("unknown target machine '{other}'"),
    }
}

/// Builds a binary computation pattern `op(v0, v1) -> v2` with the operand
/// types given, returning the graph and the three value node identifiers.
fn binary_pattern(op: ComputeOp, lhs: DataType, rhs: DataType) -> (Graph, [NodeId; 3]) {
    let mut g = Graph::new();
    let c = g.add_node(NodeKind::Computation(op));
    let v0 = g.add_node(NodeKind::Value(ValueInfo::new(lhs)));
    let v1 = g.add_node(NodeKind::Value(ValueInfo::new(rhs)));
    let v2 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
    g.add_edge(EdgeKind::DataFlow, v0, c).unwrap();
    g.add_edge(EdgeKind::DataFlow, v1, c).unwrap();
    g.add_edge(EdgeKind::DataFlow, c, v2).unwrap();
    let ids = [g.node_id(v0), g.node_id(v1), g.node_id(v2)];
    (g, ids)
}

fn three_reg_template(mnemonic: &str, [v0, v1, v2]: [NodeId; 3]) -> EmitStringTemplate {
    EmitStringTemplate {
        lines: vec![vec![
            EmitStringPart::Verbatim(format!("{mnemonic} ")),
            EmitStringPart::LocationOf(v2),
            EmitStringPart::Verbatim(", ".into()),
            EmitStringPart::LocationOf(v0),
            EmitStringPart::Verbatim(", ".into()),
            EmitStringPart::LocationOf(v1),
        ]],
    }
}

fn binary_instruction(
    id: u32,
    mnemonic: &str,
    op: ComputeOp,
    rhs: DataType,
    code_size: u64,
    latency: u64,
) -> Instruction {
    let (graph, ids) = binary_pattern(op, DataType::Any, rhs);
    let pattern = InstrPattern {
        id: PatternId::new(0),
        op_structure: OpStructure::new(graph),
        input_data: vec![ids[0], ids[1]],
        output_data: vec![ids[2]],
        emit_template: three_reg_template(mnemonic, ids),
    };
    Instruction {
        id: InstructionId::new(id),
        patterns: vec![pattern],
        properties: InstrProperties::new(code_size, latency),
    }
}

fn copy_instruction(id: u32) -> Instruction {
    let mut g = Graph::new();
    let c = g.add_node(NodeKind::Copy);
    let v0 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
    let v1 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
    g.add_edge(EdgeKind::DataFlow, v0, c).unwrap();
    g.add_edge(EdgeKind::DataFlow, c, v1).unwrap();
    let (v0, v1) = (g.node_id(v0), g.node_id(v1));

    let mut properties = InstrProperties::new(4, 1);
    properties.flags |= InstrFlags::COPY;
    Instruction {
        id: InstructionId::new(id),
        patterns: vec![InstrPattern {
            id: PatternId::new(0),
            op_structure: OpStructure::new(g),
            input_data: vec![v0],
            output_data: vec![v1],
            emit_template: EmitStringTemplate {
                lines: vec![vec![
                    EmitStringPart::Verbatim("mv ".into()),
                    EmitStringPart::LocationOf(v1),
                    EmitStringPart::Verbatim(", ".into()),
                    EmitStringPart::LocationOf(v0),
                ]],
            },
        }],
        properties,
    }
}

/// The generic phi instruction: emits nothing, exempt from the
/// def-dom-use constraint.
fn phi_instruction(id: u32) -> Instruction {
    let mut g = Graph::new();
    let phi = g.add_node(NodeKind::Phi);
    let v0 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
    let v1 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
    let out = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
    g.add_edge(EdgeKind::DataFlow, v0, phi).unwrap();
    g.add_edge(EdgeKind::DataFlow, v1, phi).unwrap();
    g.add_edge(EdgeKind::DataFlow, phi, out).unwrap();
    let inputs = vec![g.node_id(v0), g.node_id(v1)];
    let output = g.node_id(out);

    let mut properties = InstrProperties::new(0, 0);
    properties.flags |= InstrFlags::PHI;
    Instruction {
        id: InstructionId::new(id),
        patterns: vec![InstrPattern {
            id: PatternId::new(0),
            op_structure: OpStructure::new(g),
            input_data: inputs,
            output_data: vec![output],
            emit_template: EmitStringTemplate::new(),
        }],
        properties,
    }
}

/// The null instruction: covers a lone value and pins it to the null
/// location.
fn null_instruction(id: u32, null_location: LocationId) -> Instruction {
    let mut g = Graph::new();
    let v = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
    let v_id = g.node_id(v);
    let mut os = OpStructure::new(g);
    os.add_constraint(OpStructure::no_reuse_constraint(v_id, null_location));

    let mut properties = InstrProperties::new(0, 0);
    properties.flags |= InstrFlags::NULL | InstrFlags::INACTIVE;
    Instruction {
        id: InstructionId::new(id),
        patterns: vec![InstrPattern {
            id: PatternId::new(0),
            op_structure: os,
            input_data: vec![],
            output_data: vec![v_id],
            emit_template: EmitStringTemplate::new(),
        }],
        properties,
    }
}

fn simd_add2_instruction(id: u32) -> Instruction {
    // Two isomorphic add components, one per lane.
    let mut g = Graph::new();
    let mut lane_ids = Vec::new();
    for _ in 0..2 {
        let c = g.add_node(NodeKind::Computation(ComputeOp::Add));
        let v0 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
        let v1 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
        let v2 = g.add_node(NodeKind::Value(ValueInfo::new(DataType::Any)));
        g.add_edge(EdgeKind::DataFlow, v0, c).unwrap();
        g.add_edge(EdgeKind::DataFlow, v1, c).unwrap();
        g.add_edge(EdgeKind::DataFlow, c, v2).unwrap();
        lane_ids.push([g.node_id(v0), g.node_id(v1), g.node_id(v2)]);
    }

    let mut properties = InstrProperties::new(4, 2);
    properties.flags |= InstrFlags::SIMD;
    Instruction {
        id: InstructionId::new(id),
        patterns: vec![InstrPattern {
            id: PatternId::new(0),
            op_structure: OpStructure::new(g),
            input_data: lane_ids.iter().flat_map(|l| [l[0], l[1]]).collect(),
            output_data: lane_ids.iter().map(|l| l[2]).collect(),
            emit_template: EmitStringTemplate {
                lines: vec![vec![
                    EmitStringPart::Verbatim("add2 ".into()),
                    EmitStringPart::LocationOf(lane_ids[0][2]),
                    EmitStringPart::Verbatim(", ".into()),
                    EmitStringPart::LocationOf(lane_ids[1][2]),
                ]],
            },
        }],
        properties,
    }
}

/// A four-register demo machine with an immediate add, a copy, and a
/// two-lane SIMD add.
fn toy() -> TargetMachine {
    let imm16 = DataType::IntConst {
        range: ConstRange::new(-32768, 32767),
        bits: None,
    };

    let instructions = [
        binary_instruction(0, "add", ComputeOp::Add, DataType::Any, 4, 1),
        binary_instruction(1, "addi", ComputeOp::Add, imm16, 4, 1),
        binary_instruction(2, "sub", ComputeOp::Sub, DataType::Any, 4, 1),
        binary_instruction(3, "mul", ComputeOp::Mul, DataType::Any, 4, 3),
        copy_instruction(4),
        simd_add2_instruction(5),
        phi_instruction(6),
        null_instruction(7, LocationId::new(0)),
    ];
    let instructions: FxHashMap<InstructionId, Instruction> = instructions
        .into_iter()
        .map(|i| (i.id, i))
        .collect();

    let mut locations = FxHashMap::default();
    locations.insert(
        LocationId::new(0),
        Location {
            id: LocationId::new(0),
            name: "null".into(),
            fixed_value: None,
        },
    );
    for i in 0..4u32 {
        let id = LocationId::new(i + 1);
        locations.insert(
            id,
            Location {
                id,
                name: format!("r{i}"),
                fixed_value: (i == 0).then_some(0),
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
