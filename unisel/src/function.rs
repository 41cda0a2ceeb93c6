//! The function handed over by the front-end.
//!
//! A [`Function`] bundles the op-structure of one function with the two
//! pieces of information only the front-end knows: the estimated execution
//! frequency of every block and which value nodes are the function's formal
//! inputs.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{ir::NodeId, opstruct::OpStructure};

/// A function to select instructions for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    /// Name of the function
    pub name: String,
    /// The function's graph, constraints, and metadata
    #[serde(rename = "op-structure")]
    pub op_structure: OpStructure,
    /// Estimated execution frequency per block node
    #[serde(rename = "exec-frequencies", default)]
    pub exec_frequencies: FxHashMap<NodeId, u64>,
    /// Value nodes that are the function's formal inputs
    #[serde(rename = "input-data", default)]
    pub input_data: Vec<NodeId>,
}

impl Function {
    /// Creates a function over the given op-structure with no frequency or
    /// input information.
    #[must_use]
    pub fn new(name: impl Into<String>, op_structure: OpStructure) -> Self {
        Function {
            name: name.into(),
            op_structure,
            exec_frequencies: FxHashMap::default(),
            input_data: Vec::new(),
        }
    }

    /// Returns the execution frequency recorded for a block, defaulting
    /// to 1.
    #[must_use]
    pub fn exec_frequency(&self, block: NodeId) -> u64 {
        self.exec_frequencies.get(&block).copied().unwrap_or(1)
    }
}
