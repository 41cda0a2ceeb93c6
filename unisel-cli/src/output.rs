//! Output-file handling shared by the commands.
//!
//! Every command writes its results to files whose names carry a per-output
//! identifier, so repeated invocations never clobber earlier results:
//! `foo.matches.0.json`, `foo.matches.1.json`, and so on.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

/// Allocates suffixed output paths next to an input file (or under an
/// explicit directory) and writes JSON payloads to them.
pub struct OutputWriter {
    dir: PathBuf,
    stem: String,
    next_id: usize,
}

impl OutputWriter {
    /// Creates a writer for outputs derived from `input`.
    pub fn new(input: &Path, output_dir: Option<&Path>) -> anyhow::Result<Self> {
        let dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .context("input file has no usable name")?
            .to_string();
        Ok(OutputWriter {
            dir,
            stem,
            next_id: 0,
        })
    }

    fn next_path(&mut self, kind: &str, extension: &str) -> PathBuf {
        let id = self.next_id;
        self.next_id += 1;
        self.dir
            .join(format!("{}.{kind}.{id}.{extension}", self.stem))
    }

    /// Writes a JSON payload, returning the path it landed at.
    pub fn write_json<T: Serialize>(&mut self, kind: &str, payload: &T) -> anyhow::Result<PathBuf> {
        let path = self.next_path(kind, "json");
        let text = serde_json::to_string_pretty(payload)
            .with_context(|| format!("serializing {kind}"))?;
        std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Writes a plain-text payload, returning the path it landed at.
    pub fn write_text(&mut self, kind: &str, extension: &str, text: &str) -> anyhow::Result<PathBuf> {
        let path = self.next_path(kind, extension);
        std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

/// Prints a small report either as text or as JSON, per the global flag.
pub fn report<T: Serialize>(json: bool, human: &str, payload: &T) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(payload)?);
    } else {
        println!("{human}");
    }
    Ok(())
}
