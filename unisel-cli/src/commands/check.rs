use std::path::Path;

use anyhow::bail;
use serde::Serialize;

use unisel::ir::{Direction, EdgeKind, Graph};

use crate::{
    app::{CheckAction, GlobalOptions},
    commands::load_function,
    output::report,
};

#[derive(Debug, Serialize)]
struct Finding {
    check: &'static str,
    message: String,
}

/// Verifies that edge numbers are contiguous from 0 within every
/// (node, kind, direction) scope.
fn check_edge_numbers(graph: &Graph, findings: &mut Vec<Finding>) {
    for node in graph.node_refs() {
        for kind in EdgeKind::ALL {
            for dir in [Direction::In, Direction::Out] {
                let numbers = graph.edge_numbers(node, kind, dir);
                let contiguous = numbers
                    .iter()
                    .enumerate()
                    .all(|(i, &nr)| nr as usize == i);
                if !contiguous {
                    findings.push(Finding {
                        check: "edge-numbers",
                        message: format!(
                            "node {} has non-contiguous {kind:?} {dir:?} numbers {numbers:?}",
                            graph.node_id(node)
                        ),
                    });
                }
            }
        }
    }
}

pub fn run(action: CheckAction, function_path: &Path, global: &GlobalOptions) -> anyhow::Result<()> {
    let function = load_function(function_path)?;
    let mut findings = Vec::new();

    if matches!(action, CheckAction::EdgeNumbers | CheckAction::All) {
        check_edge_numbers(&function.op_structure.graph, &mut findings);
    }
    if matches!(action, CheckAction::References | CheckAction::All) {
        if let Err(err) = function.op_structure.check_integrity() {
            findings.push(Finding {
                check: "references",
                message: err.to_string(),
            });
        }
    }

    if findings.is_empty() {
        report(
            global.json,
            "all checks passed",
            &serde_json::json!({ "findings": [] }),
        )
    } else {
        for finding in &findings {
            log::warn!("[{}] {}", finding.check, finding.message);
        }
        report(
            global.json,
            &format!("{} finding(s)", findings.len()),
            &serde_json::json!({ "findings": findings }),
        )?;
        bail!("{} check(s) failed", findings.len());
    }
}
