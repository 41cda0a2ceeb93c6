//! The constraint model: high-level assembly, index lowering, and solution
//! raising.
//!
//! [`build_high_level_model`] assembles the model from a function, a target
//! machine, and the match list. [`ArrayIndexMaplists`] fixes the bijection
//! between public identifiers and dense array indices; [`lower_model`]
//! produces the solver-facing [`LowLevelModel`], and [`raise_solution`]
//! translates the solver's [`LowLevelSolution`] back into original
//! identifiers.

mod builder;
mod lower;
mod lowlevel;
mod maps;
mod params;
mod raise;

pub use builder::build_high_level_model;
pub use lower::{lower_constraint, lower_model};
pub use lowlevel::{HighLevelSolution, LowLevelModel, LowLevelSolution};
pub use maps::{ArrayIndexMaplists, IdIndexMap};
pub use params::{BlockParams, FunctionParams, HighLevelModel, MachineParams, MatchParams};
pub use raise::raise_solution;
