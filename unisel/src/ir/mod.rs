//! The function/pattern graph model.
//!
//! This module is the foundation of the selector: a typed, labeled
//! multi-digraph ([`Graph`]) whose nodes are operations, entities, and
//! blocks, whose edges carry a kind and per-endpoint ordering numbers, plus
//! the projections ([`extract_cfg`], [`extract_ssa`]) and dominator queries
//! every later stage builds on.

pub mod dominators;
mod edge;
mod graph;
mod id;
mod node;
mod view;

pub use edge::{Direction, EdgeKind, EdgeLabel};
pub use graph::{EdgeRef, Graph, NodeRef};
pub use id::{ArrayIndex, InstructionId, LocationId, MatchId, NodeId, PatternId};
pub use node::{
    CmpPredicate, ComputeOp, ConstRange, ControlOp, DataType, NodeKind, PointerKind, ValueInfo,
};
pub use view::{extract_cfg, extract_ssa, root_of_cfg, CfgView};
