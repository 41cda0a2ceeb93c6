use std::path::Path;

use unisel::{function::Function, opstruct::transform, target::TargetMachine};

use crate::{
    app::{GlobalOptions, TransformAction},
    commands::load_function,
    output::{report, OutputWriter},
    targets,
};

fn apply(
    action: TransformAction,
    function: &Function,
    target: &TargetMachine,
) -> anyhow::Result<Function> {
    let os = &function.op_structure;
    let rewritten = match action {
        TransformAction::CanonicalizeCopies => transform::canonicalize_copies(os),
        TransformAction::LowerPointers => transform::lower_pointers(os, target)?,
        TransformAction::EnforcePhiInvariants => transform::enforce_phi_node_invariants(os)?,
        TransformAction::RemoveRedundantPhis => transform::remove_redundant_phis(os)?,
        TransformAction::DeadCodeElimination => transform::dead_code_elimination(os),
        TransformAction::RemoveRedundantConversions => {
            transform::remove_redundant_conversions(os)
        }
        TransformAction::All => {
            let os = transform::canonicalize_copies(os);
            let os = transform::lower_pointers(&os, target)?;
            let os = transform::enforce_phi_node_invariants(&os)?;
            let os = transform::remove_redundant_phis(&os)?;
            let os = transform::dead_code_elimination(&os);
            transform::remove_redundant_conversions(&os)
        }
    };
    let mut out = function.clone();
    out.op_structure = rewritten;
    Ok(out)
}

pub fn run(
    action: TransformAction,
    function_path: &Path,
    target_name: &str,
    output_dir: Option<&Path>,
    global: &GlobalOptions,
) -> anyhow::Result<()> {
    let function = load_function(function_path)?;
    let target = targets::by_name(target_name)?;
    let mut writer = OutputWriter::new(function_path, output_dir)?;

    let before = function.op_structure.graph.node_count();
    let rewritten = apply(action, &function, &target)?;
    let after = rewritten.op_structure.graph.node_count();
    log::info!("transform: {before} node(s) before, {after} after");

    let path = writer.write_json("transformed", &rewritten)?;
    report(
        global.json,
        &format!(
            "wrote transformed function ({before} -> {after} nodes) to {}",
            path.display()
        ),
        &serde_json::json!({ "path": path, "nodes-before": before, "nodes-after": after }),
    )
}
