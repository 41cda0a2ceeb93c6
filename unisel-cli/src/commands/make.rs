use std::path::Path;

use anyhow::{bail, Context};

use unisel::{
    matcher::find_matches,
    model::{
        build_high_level_model, lower_model, raise_solution, ArrayIndexMaplists, LowLevelSolution,
    },
};

use crate::{
    app::{GlobalOptions, MakeAction},
    commands::load_function,
    output::{report, OutputWriter},
    targets,
};

pub fn run(
    action: MakeAction,
    function_path: &Path,
    target_name: &str,
    solution_path: Option<&Path>,
    output_dir: Option<&Path>,
    global: &GlobalOptions,
) -> anyhow::Result<()> {
    let function = load_function(function_path)?;
    let target = targets::by_name(target_name)?;
    let mut writer = OutputWriter::new(function_path, output_dir)?;

    let matches = find_matches(&function, &target)?;
    log::info!("found {} match(es)", matches.len());

    if action == MakeAction::Matches {
        let path = writer.write_json("matches", &matches)?;
        return report(
            global.json,
            &format!("wrote {} match(es) to {}", matches.len(), path.display()),
            &serde_json::json!({ "matches": matches.len(), "path": path }),
        );
    }

    let high = build_high_level_model(&function, &target, &matches)?;
    if action == MakeAction::HlModel {
        let path = writer.write_json("hl-model", &high)?;
        return report(
            global.json,
            &format!("wrote high-level model to {}", path.display()),
            &serde_json::json!({ "path": path }),
        );
    }

    let maps = ArrayIndexMaplists::from_model(&high);
    if action == MakeAction::Maps {
        let path = writer.write_json("maps", &maps)?;
        return report(
            global.json,
            &format!("wrote array-index map lists to {}", path.display()),
            &serde_json::json!({ "path": path }),
        );
    }

    if action == MakeAction::LlModel {
        let low = lower_model(&high, &maps)?;
        let model_path = writer.write_json("ll-model", &low)?;
        let maps_path = writer.write_json("maps", &maps)?;
        return report(
            global.json,
            &format!(
                "wrote low-level model to {} (maps at {})",
                model_path.display(),
                maps_path.display()
            ),
            &serde_json::json!({ "model-path": model_path, "maps-path": maps_path }),
        );
    }

    // MakeAction::HlSolution
    let Some(solution_path) = solution_path else {
        bail!("--solution is required for hl-solution");
    };
    let text = std::fs::read_to_string(solution_path)
        .with_context(|| format!("reading {}", solution_path.display()))?;
    // A solver that found no solution (or timed out) writes `null`; raising
    // is not attempted.
    let parsed: Option<LowLevelSolution> = serde_json::from_str(&text).map_err(|err| {
        unisel::Error::Serialization {
            path: format!("{}:{}:{}", solution_path.display(), err.line(), err.column()),
            message: err.to_string(),
        }
    })?;
    let low_solution = parsed.ok_or(unisel::Error::NoSolution)?;
    let raised = raise_solution(&low_solution, &maps)?;
    let path = writer.write_json("hl-solution", &raised)?;
    report(
        global.json,
        &format!(
            "raised solution with {} selected match(es) to {}",
            raised.selected_matches.len(),
            path.display()
        ),
        &serde_json::json!({ "path": path, "selected": raised.selected_matches.len() }),
    )
}
