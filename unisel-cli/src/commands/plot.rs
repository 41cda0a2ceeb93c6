use std::fmt::Write as _;
use std::path::Path;

use unisel::ir::{extract_cfg, extract_ssa, EdgeKind, Graph, NodeKind};

use crate::{
    app::{GlobalOptions, PlotAction},
    commands::load_function,
    output::{report, OutputWriter},
};

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

fn node_label(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Computation(op) => format!("{op:?}"),
        NodeKind::Control(op) => format!("{op:?}"),
        NodeKind::Call(callee) => format!("call {callee}"),
        NodeKind::IndirCall => "indir call".into(),
        NodeKind::Phi => "phi".into(),
        NodeKind::Copy => "copy".into(),
        NodeKind::Reuse => "reuse".into(),
        NodeKind::Value(info) => format!("{:?}", info.data_type),
        NodeKind::State => "state".into(),
        NodeKind::Block { name } => name.clone(),
    }
}

fn node_shape(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Block { .. } => "box",
        NodeKind::Value(_) | NodeKind::State => "ellipse",
        _ => "record",
    }
}

fn edge_style(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::DataFlow => "solid",
        EdgeKind::ControlFlow => "bold",
        EdgeKind::StateFlow => "dashed",
        EdgeKind::DefPlacement => "dotted",
        EdgeKind::Reuse => "tapered",
    }
}

/// Renders a graph in DOT format.
fn graph_to_dot(graph: &Graph) -> String {
    let mut dot = String::from("digraph {\n");
    for node in graph.node_refs() {
        let kind = graph.node_kind(node);
        let _ = writeln!(
            dot,
            "  n{} [label=\"{}: {}\", shape={}];",
            node.index(),
            graph.node_id(node),
            escape(&node_label(kind)),
            node_shape(kind),
        );
    }
    for edge in graph.edge_refs() {
        let label = graph.edge_label(edge);
        let _ = writeln!(
            dot,
            "  n{} -> n{} [label=\"{}:{}\", style={}];",
            graph.edge_source(edge).index(),
            graph.edge_target(edge).index(),
            label.out_nr,
            label.in_nr,
            edge_style(label.kind),
        );
    }
    dot.push_str("}\n");
    dot
}

pub fn run(
    action: PlotAction,
    function_path: &Path,
    output_dir: Option<&Path>,
    global: &GlobalOptions,
) -> anyhow::Result<()> {
    let function = load_function(function_path)?;
    let mut writer = OutputWriter::new(function_path, output_dir)?;

    let (kind, dot) = match action {
        PlotAction::FunGraph => ("fun-graph", graph_to_dot(&function.op_structure.graph)),
        PlotAction::Cfg => {
            let view = extract_cfg(&function.op_structure.graph)?;
            ("cfg", graph_to_dot(&view.graph))
        }
        PlotAction::Ssa => {
            let (ssa, _) = extract_ssa(&function.op_structure.graph);
            ("ssa", graph_to_dot(&ssa))
        }
    };

    let path = writer.write_text(kind, "dot", &dot)?;
    report(
        global.json,
        &format!("wrote {kind} plot to {}", path.display()),
        &serde_json::json!({ "path": path }),
    )
}
