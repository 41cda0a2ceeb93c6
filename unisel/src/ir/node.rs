//! Node kinds and value data types.
//!
//! A graph node is either an *operation* (computation, control, call, phi,
//! copy, reuse), an *entity* (a value or a piece of program state), or a
//! *block* of the control-flow graph. The matcher's node compatibility rules
//! are driven entirely by these kinds plus the data-type compatibility
//! defined here.

use serde::{Deserialize, Serialize};

/// A computational operator.
///
/// The set follows the usual integer subset of a language-neutral IR. Two
/// properties matter to the selector: whether the operator is commutative
/// (which relaxes data-flow edge ordering during matching) and which
/// operators are compatible with each other during matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComputeOp {
    /// Integer addition
    Add,
    /// Integer subtraction
    Sub,
    /// Integer multiplication
    Mul,
    /// Signed division
    SDiv,
    /// Unsigned division
    UDiv,
    /// Signed remainder
    SRem,
    /// Unsigned remainder
    URem,
    /// Bitwise and
    And,
    /// Bitwise or
    Or,
    /// Bitwise exclusive or
    XOr,
    /// Shift left
    Shl,
    /// Logical shift right
    LShr,
    /// Arithmetic shift right
    AShr,
    /// Zero extension to a wider integer
    ZExt,
    /// Sign extension to a wider integer
    SExt,
    /// Truncation to a narrower integer
    Trunc,
    /// Integer-to-pointer conversion (removed by pointer lowering)
    IntToPtr,
    /// Pointer-to-integer conversion (removed by pointer lowering)
    PtrToInt,
    /// Integer comparison producing a boolean value
    ICmp(CmpPredicate),
}

/// Predicate of an [`ComputeOp::ICmp`] comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpPredicate {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Unsigned greater-than
    UGt,
    /// Unsigned greater-or-equal
    UGe,
    /// Unsigned less-than
    ULt,
    /// Unsigned less-or-equal
    ULe,
    /// Signed greater-than
    SGt,
    /// Signed greater-or-equal
    SGe,
    /// Signed less-than
    SLt,
    /// Signed less-or-equal
    SLe,
}

impl ComputeOp {
    /// Returns `true` if the operands of this operator may be swapped.
    ///
    /// Commutativity relaxes the in-edge ordering requirement during
    /// matching: the two orderings of a commutative computation describe the
    /// same embedding, so only one match is produced.
    #[must_use]
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            ComputeOp::Add | ComputeOp::Mul | ComputeOp::And | ComputeOp::Or | ComputeOp::XOr
        ) || matches!(
            self,
            ComputeOp::ICmp(CmpPredicate::Eq) | ComputeOp::ICmp(CmpPredicate::Ne)
        )
    }

    /// Returns `true` if a function-graph occurrence of `self` may be
    /// covered by a pattern-graph occurrence of `other`.
    #[must_use]
    pub fn is_compatible_with(self, other: ComputeOp) -> bool {
        self == other
    }
}

/// A control operator ending a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlOp {
    /// Unconditional branch to a single successor block
    Branch,
    /// Conditional branch consuming one value
    CondBranch,
    /// Return from the function, consuming zero or one value
    Ret,
}

/// Inclusive range of an integer constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstRange {
    /// Smallest admitted value
    pub lo: i64,
    /// Largest admitted value
    pub hi: i64,
}

impl ConstRange {
    /// Creates a range admitting every value between `lo` and `hi` inclusive.
    #[must_use]
    pub const fn new(lo: i64, hi: i64) -> Self {
        ConstRange { lo, hi }
    }

    /// Creates a range admitting exactly one value.
    #[must_use]
    pub const fn singleton(value: i64) -> Self {
        ConstRange {
            lo: value,
            hi: value,
        }
    }

    /// Returns `true` if this range contains every value of `other`.
    #[must_use]
    pub fn contains(&self, other: &ConstRange) -> bool {
        self.lo <= other.lo && other.hi <= self.hi
    }

    /// Returns the single admitted value, if the range is a singleton.
    #[must_use]
    pub fn as_singleton(&self) -> Option<i64> {
        (self.lo == self.hi).then_some(self.lo)
    }
}

/// Shape of a pointer-typed value before pointer lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerKind {
    /// The null pointer
    Null,
    /// A pointer temporary
    Temp,
    /// A pointer constant restricted to a range of addresses
    Const(ConstRange),
}

/// Data type of a value node.
///
/// Type compatibility drives value-node matching and is deliberately *not*
/// commutative: the pattern side must be at least as general as the function
/// side. See [`DataType::is_compatible_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Matches any data type
    Any,
    /// The absence of a value
    Void,
    /// An integer temporary of a fixed bit width
    IntTemp {
        /// Bit width
        bits: u16,
    },
    /// An integer constant restricted to a range, optionally with a known
    /// bit width
    IntConst {
        /// Admitted value range
        range: ConstRange,
        /// Bit width, if known
        bits: Option<u16>,
    },
    /// A pointer (rewritten into an integer type by pointer lowering)
    Pointer(PointerKind),
}

impl DataType {
    /// Returns `true` if `self` (the more general side, i.e. the pattern)
    /// admits `other` (the function side).
    ///
    /// The relation is not commutative:
    ///
    /// - [`DataType::Any`] admits anything;
    /// - `IntTemp { n }` admits exactly `IntTemp { n }`;
    /// - `IntConst { r1, .. }` admits `IntConst { r2, .. }` iff `r1`
    ///   contains `r2`;
    /// - [`DataType::Void`] admits only `Void`;
    /// - pointers admit pointers of the same shape (both sides are rewritten
    ///   away before matching in the normal pipeline).
    #[must_use]
    pub fn is_compatible_with(&self, other: &DataType) -> bool {
        match (self, other) {
            (DataType::Any, _) => true,
            (DataType::Void, DataType::Void) => true,
            (DataType::IntTemp { bits: b1 }, DataType::IntTemp { bits: b2 }) => b1 == b2,
            (DataType::IntConst { range: r1, .. }, DataType::IntConst { range: r2, .. }) => {
                r1.contains(r2)
            }
            (DataType::Pointer(p1), DataType::Pointer(p2)) => match (p1, p2) {
                (PointerKind::Null, PointerKind::Null) | (PointerKind::Temp, PointerKind::Temp) => {
                    true
                }
                (PointerKind::Const(r1), PointerKind::Const(r2)) => r1.contains(r2),
                _ => false,
            },
            _ => false,
        }
    }

    /// Returns the bit width carried by this type, if any.
    #[must_use]
    pub fn bits(&self) -> Option<u16> {
        match self {
            DataType::IntTemp { bits } => Some(*bits),
            DataType::IntConst { bits, .. } => *bits,
            _ => None,
        }
    }

    /// Returns the constant value of a singleton integer constant.
    #[must_use]
    pub fn as_int_const(&self) -> Option<i64> {
        match self {
            DataType::IntConst { range, .. } => range.as_singleton(),
            _ => None,
        }
    }
}

/// Payload of a value node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueInfo {
    /// Data type of the value
    pub data_type: DataType,
    /// Source-level names this value originates from, if the front-end
    /// provided any
    pub origin: Option<Vec<String>>,
}

impl ValueInfo {
    /// Creates a value payload with no origin information.
    #[must_use]
    pub fn new(data_type: DataType) -> Self {
        ValueInfo {
            data_type,
            origin: None,
        }
    }
}

/// The kind (and payload) of a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A computational operation
    Computation(ComputeOp),
    /// A control operation
    Control(ControlOp),
    /// A direct call to a named function
    Call(String),
    /// An indirect call through a value
    IndirCall,
    /// An SSA phi operation
    Phi,
    /// A copy operation
    Copy,
    /// A reuse operation tying a value to an existing location
    Reuse,
    /// A value entity
    Value(ValueInfo),
    /// A state entity threading side effects
    State,
    /// A basic block
    Block {
        /// Name of the block
        name: String,
    },
}

impl NodeKind {
    /// Returns `true` for operation nodes (computation, control, call,
    /// indirect call, phi, copy, reuse).
    #[must_use]
    pub fn is_operation(&self) -> bool {
        matches!(
            self,
            NodeKind::Computation(_)
                | NodeKind::Control(_)
                | NodeKind::Call(_)
                | NodeKind::IndirCall
                | NodeKind::Phi
                | NodeKind::Copy
                | NodeKind::Reuse
        )
    }

    /// Returns `true` for entity nodes (values and states).
    #[must_use]
    pub fn is_entity(&self) -> bool {
        matches!(self, NodeKind::Value(_) | NodeKind::State)
    }

    /// Returns `true` for value nodes.
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self, NodeKind::Value(_))
    }

    /// Returns `true` for block nodes.
    #[must_use]
    pub fn is_block(&self) -> bool {
        matches!(self, NodeKind::Block { .. })
    }

    /// Returns the data type of a value node, `None` otherwise.
    #[must_use]
    pub fn data_type(&self) -> Option<&DataType> {
        match self {
            NodeKind::Value(info) => Some(&info.data_type),
            _ => None,
        }
    }
}
