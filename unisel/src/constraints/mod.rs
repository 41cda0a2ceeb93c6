//! The constraint expression language.
//!
//! Constraints are symbolic boolean expressions over node, match, location,
//! and instruction identifiers. They are attached to op-structures (both of
//! functions and of instruction patterns), carried into the high-level
//! model, and rewritten on the way down to the low-level model.
//!
//! The language is layered by *sort*: [`BoolExpr`] at the root, [`NumExpr`]
//! for arithmetic, and one small expression type per identifier namespace.
//! Every identifier sort has two leaf forms — the original public identifier
//! (used in high-level models) and a dense [`ArrayIndex`] (used in low-level
//! models). No single constraint mixes both forms.
//!
//! Generic rewriting is provided by [`Reconstructor`]; read-only analyses by
//! [`Folder`].

mod fold;
mod reconstruct;

pub use fold::{fold_constraint, referenced_node_ids, Folder};
pub use reconstruct::{
    reconstruct_bool, reconstruct_constraint, replace_pattern_node_ids, replace_this_match_with,
    Reconstructor,
};

use serde::{Deserialize, Serialize};

use crate::ir::{ArrayIndex, InstructionId, LocationId, MatchId, NodeId};

/// A single constraint: a boolean expression that must hold in every
/// solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Constraint(pub BoolExpr);

/// Boolean-sorted expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolExpr {
    /// The two numbers are equal
    Eq(NumExpr, NumExpr),
    /// The two numbers differ
    Neq(NumExpr, NumExpr),
    /// Strictly greater
    Gt(NumExpr, NumExpr),
    /// Greater or equal
    Ge(NumExpr, NumExpr),
    /// Strictly less
    Lt(NumExpr, NumExpr),
    /// Less or equal
    Le(NumExpr, NumExpr),
    /// Conjunction
    And(Box<BoolExpr>, Box<BoolExpr>),
    /// Disjunction
    Or(Box<BoolExpr>, Box<BoolExpr>),
    /// Implication (left implies right)
    Imp(Box<BoolExpr>, Box<BoolExpr>),
    /// Equivalence
    Eqv(Box<BoolExpr>, Box<BoolExpr>),
    /// Negation
    Not(Box<BoolExpr>),
    /// Set membership
    InSet(SetElemExpr, SetExpr),
    /// The match falls through to the given block (the block is placed
    /// immediately after the block the match is placed in)
    FallThrough(MatchExpr, BlockExpr),
}

/// Number-sorted expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumExpr {
    /// Sum
    Plus(Box<NumExpr>, Box<NumExpr>),
    /// Difference
    Minus(Box<NumExpr>, Box<NumExpr>),
    /// An integer literal
    Int(i64),
    /// A node identifier lifted to a number
    NodeToNum(NodeExpr),
    /// A match identifier lifted to a number
    MatchToNum(MatchExpr),
    /// An instruction identifier lifted to a number
    InstructionToNum(InstructionExpr),
    /// A block lifted to a number
    BlockToNum(BlockExpr),
    /// A location identifier lifted to a number
    LocationToNum(LocationExpr),
    /// Distance, in blocks of the final ordering, between the block a match
    /// is placed in and the given block
    DistanceBetweenMatchAndBlock(MatchExpr, BlockExpr),
}

/// Node-sorted expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeExpr {
    /// A node named by its public identifier
    Id(NodeId),
    /// A node named by its dense array index
    ArrayIndex(ArrayIndex),
}

/// Match-sorted expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchExpr {
    /// A match named by its identifier
    Id(MatchId),
    /// A match named by its dense array index
    ArrayIndex(ArrayIndex),
    /// The match this constraint belongs to (only meaningful inside a
    /// pattern's own constraints; replaced by a concrete identifier when the
    /// model is built)
    This,
}

/// Instruction-sorted expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstructionExpr {
    /// An instruction named by its identifier
    Id(InstructionId),
    /// An instruction named by its dense array index
    ArrayIndex(ArrayIndex),
    /// The instruction of which the given match is an occurrence
    OfMatch(MatchExpr),
}

/// Block-sorted expressions.
///
/// Blocks are graph nodes, so this sort has no named-identifier leaf of its
/// own; every form is a structural accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockExpr {
    /// The block represented by the given block node
    OfBlockNode(NodeExpr),
    /// The block the given match is placed in
    WhereinMatchIsPlaced(MatchExpr),
    /// The block the definition of the given datum is placed in
    WhereinDataIsDefined(NodeExpr),
}

/// Location-sorted expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationExpr {
    /// A location named by its identifier
    Id(LocationId),
    /// A location named by its dense array index
    ArrayIndex(ArrayIndex),
    /// The location assigned to the given value node
    OfValueNode(NodeExpr),
}

/// Set-sorted expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetExpr {
    /// Union of two sets
    Union(Box<SetExpr>, Box<SetExpr>),
    /// Intersection of two sets
    Intersect(Box<SetExpr>, Box<SetExpr>),
    /// Difference of two sets
    Diff(Box<SetExpr>, Box<SetExpr>),
    /// The dominator set of a block
    DomSetOfBlock(BlockExpr),
    /// An explicit set of blocks
    BlockSet(Vec<BlockExpr>),
    /// An explicit class of locations
    LocationClass(Vec<LocationExpr>),
}

/// Element-sorted expressions for set membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetElemExpr {
    /// A block lifted to a set element
    Block(BlockExpr),
    /// A location lifted to a set element
    Location(LocationExpr),
}
