pub mod check;
pub mod make;
pub mod plot;
pub mod transform;

use std::path::Path;

use anyhow::Context;

use unisel::function::Function;

/// Reads and parses a function file.
///
/// Parse failures are reported as [`unisel::Error::Serialization`] with the
/// offending location.
pub fn load_function(path: &Path) -> anyhow::Result<Function> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).map_err(|err| {
        unisel::Error::Serialization {
            path: format!("{}:{}:{}", path.display(), err.line(), err.column()),
            message: err.to_string(),
        }
        .into()
    })
}
