//! Generic folding (read-only analysis) of constraint expressions.
//!
//! [`Folder`] is the read-only counterpart of
//! [`Reconstructor`](crate::constraints::Reconstructor): one hook per sort,
//! each receiving the expression together with the already-combined value of
//! its children, plus a caller-supplied combine operator and unit value.

use rustc_hash::FxHashSet;

use crate::constraints::{
    BlockExpr, BoolExpr, Constraint, InstructionExpr, LocationExpr, MatchExpr, NodeExpr, NumExpr,
    SetElemExpr, SetExpr,
};
use crate::ir::NodeId;

/// A family of per-sort fold hooks over a user-chosen value.
///
/// Every hook defaults to passing the combined child value through, so an
/// analysis overrides exactly the hooks for the sorts it cares about.
pub trait Folder {
    /// The value folded out of the tree.
    type Value;

    /// The unit value for expressions with no children.
    fn empty(&mut self) -> Self::Value;

    /// Combines the values of two sibling subtrees.
    fn combine(&mut self, a: Self::Value, b: Self::Value) -> Self::Value;

    /// Folds a boolean expression given its combined child value.
    fn fold_bool_expr(&mut self, _expr: &BoolExpr, children: Self::Value) -> Self::Value {
        children
    }

    /// Folds a numeric expression given its combined child value.
    fn fold_num_expr(&mut self, _expr: &NumExpr, children: Self::Value) -> Self::Value {
        children
    }

    /// Folds a node expression.
    fn fold_node_expr(&mut self, _expr: &NodeExpr, children: Self::Value) -> Self::Value {
        children
    }

    /// Folds a match expression.
    fn fold_match_expr(&mut self, _expr: &MatchExpr, children: Self::Value) -> Self::Value {
        children
    }

    /// Folds an instruction expression given its combined child value.
    fn fold_instruction_expr(
        &mut self,
        _expr: &InstructionExpr,
        children: Self::Value,
    ) -> Self::Value {
        children
    }

    /// Folds a block expression given its combined child value.
    fn fold_block_expr(&mut self, _expr: &BlockExpr, children: Self::Value) -> Self::Value {
        children
    }

    /// Folds a location expression given its combined child value.
    fn fold_location_expr(&mut self, _expr: &LocationExpr, children: Self::Value) -> Self::Value {
        children
    }

    /// Folds a set expression given its combined child value.
    fn fold_set_expr(&mut self, _expr: &SetExpr, children: Self::Value) -> Self::Value {
        children
    }

    /// Folds a set-element expression given its combined child value.
    fn fold_set_elem_expr(&mut self, _expr: &SetElemExpr, children: Self::Value) -> Self::Value {
        children
    }
}

/// Folds a constraint bottom-up with the given folder.
pub fn fold_constraint<F: Folder + ?Sized>(f: &mut F, c: &Constraint) -> F::Value {
    fold_bool(f, &c.0)
}

fn fold_bool<F: Folder + ?Sized>(f: &mut F, expr: &BoolExpr) -> F::Value {
    let children = match expr {
        BoolExpr::Eq(a, b)
        | BoolExpr::Neq(a, b)
        | BoolExpr::Gt(a, b)
        | BoolExpr::Ge(a, b)
        | BoolExpr::Lt(a, b)
        | BoolExpr::Le(a, b) => {
            let va = fold_num(f, a);
            let vb = fold_num(f, b);
            f.combine(va, vb)
        }
        BoolExpr::And(a, b) | BoolExpr::Or(a, b) | BoolExpr::Imp(a, b) | BoolExpr::Eqv(a, b) => {
            let va = fold_bool(f, a);
            let vb = fold_bool(f, b);
            f.combine(va, vb)
        }
        BoolExpr::Not(a) => fold_bool(f, a),
        BoolExpr::InSet(elem, set) => {
            let ve = fold_set_elem(f, elem);
            let vs = fold_set(f, set);
            f.combine(ve, vs)
        }
        BoolExpr::FallThrough(m, b) => {
            let vm = fold_match(f, m);
            let vb = fold_block(f, b);
            f.combine(vm, vb)
        }
    };
    f.fold_bool_expr(expr, children)
}

fn fold_num<F: Folder + ?Sized>(f: &mut F, expr: &NumExpr) -> F::Value {
    let children = match expr {
        NumExpr::Plus(a, b) | NumExpr::Minus(a, b) => {
            let va = fold_num(f, a);
            let vb = fold_num(f, b);
            f.combine(va, vb)
        }
        NumExpr::Int(_) => f.empty(),
        NumExpr::NodeToNum(n) => fold_node(f, n),
        NumExpr::MatchToNum(m) => fold_match(f, m),
        NumExpr::InstructionToNum(i) => fold_instruction(f, i),
        NumExpr::BlockToNum(b) => fold_block(f, b),
        NumExpr::LocationToNum(l) => fold_location(f, l),
        NumExpr::DistanceBetweenMatchAndBlock(m, b) => {
            let vm = fold_match(f, m);
            let vb = fold_block(f, b);
            f.combine(vm, vb)
        }
    };
    f.fold_num_expr(expr, children)
}

fn fold_node<F: Folder + ?Sized>(f: &mut F, expr: &NodeExpr) -> F::Value {
    let children = f.empty();
    f.fold_node_expr(expr, children)
}

fn fold_match<F: Folder + ?Sized>(f: &mut F, expr: &MatchExpr) -> F::Value {
    let children = f.empty();
    f.fold_match_expr(expr, children)
}

fn fold_instruction<F: Folder + ?Sized>(f: &mut F, expr: &InstructionExpr) -> F::Value {
    let children = match expr {
        InstructionExpr::OfMatch(m) => fold_match(f, m),
        _ => f.empty(),
    };
    f.fold_instruction_expr(expr, children)
}

fn fold_block<F: Folder + ?Sized>(f: &mut F, expr: &BlockExpr) -> F::Value {
    let children = match expr {
        BlockExpr::OfBlockNode(n) | BlockExpr::WhereinDataIsDefined(n) => fold_node(f, n),
        BlockExpr::WhereinMatchIsPlaced(m) => fold_match(f, m),
    };
    f.fold_block_expr(expr, children)
}

fn fold_location<F: Folder + ?Sized>(f: &mut F, expr: &LocationExpr) -> F::Value {
    let children = match expr {
        LocationExpr::OfValueNode(n) => fold_node(f, n),
        _ => f.empty(),
    };
    f.fold_location_expr(expr, children)
}

fn fold_set<F: Folder + ?Sized>(f: &mut F, expr: &SetExpr) -> F::Value {
    let children = match expr {
        SetExpr::Union(a, b) | SetExpr::Intersect(a, b) | SetExpr::Diff(a, b) => {
            let va = fold_set(f, a);
            let vb = fold_set(f, b);
            f.combine(va, vb)
        }
        SetExpr::DomSetOfBlock(b) => fold_block(f, b),
        SetExpr::BlockSet(blocks) => {
            let mut acc = f.empty();
            for b in blocks {
                let v = fold_block(f, b);
                acc = f.combine(acc, v);
            }
            acc
        }
        SetExpr::LocationClass(locs) => {
            let mut acc = f.empty();
            for l in locs {
                let v = fold_location(f, l);
                acc = f.combine(acc, v);
            }
            acc
        }
    };
    f.fold_set_expr(expr, children)
}

fn fold_set_elem<F: Folder + ?Sized>(f: &mut F, expr: &SetElemExpr) -> F::Value {
    let children = match expr {
        SetElemExpr::Block(b) => fold_block(f, b),
        SetElemExpr::Location(l) => fold_location(f, l),
    };
    f.fold_set_elem_expr(expr, children)
}

struct NodeIdCollector;

impl Folder for NodeIdCollector {
    type Value = FxHashSet<NodeId>;

    fn empty(&mut self) -> Self::Value {
        FxHashSet::default()
    }

    fn combine(&mut self, mut a: Self::Value, b: Self::Value) -> Self::Value {
        a.extend(b);
        a
    }

    fn fold_node_expr(&mut self, expr: &NodeExpr, mut children: Self::Value) -> Self::Value {
        if let NodeExpr::Id(id) = expr {
            children.insert(*id);
        }
        children
    }
}

/// Returns every node identifier referenced by a constraint.
///
/// Nodes named by array index are not included; this is an analysis over
/// high-level constraints.
#[must_use]
pub fn referenced_node_ids(c: &Constraint) -> FxHashSet<NodeId> {
    fold_constraint(&mut NodeIdCollector, c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{LocationId, MatchId};

    #[test]
    fn test_collects_node_ids_across_sorts() {
        let c = Constraint(BoolExpr::And(
            Box::new(BoolExpr::Eq(
                NumExpr::LocationToNum(LocationExpr::OfValueNode(NodeExpr::Id(NodeId::new(1)))),
                NumExpr::LocationToNum(LocationExpr::Id(LocationId::new(0))),
            )),
            Box::new(BoolExpr::InSet(
                SetElemExpr::Block(BlockExpr::WhereinMatchIsPlaced(MatchExpr::Id(MatchId::new(
                    0,
                )))),
                SetExpr::DomSetOfBlock(BlockExpr::OfBlockNode(NodeExpr::Id(NodeId::new(2)))),
            )),
        ));
        let ids = referenced_node_ids(&c);
        assert_eq!(
            ids,
            [NodeId::new(1), NodeId::new(2)].into_iter().collect()
        );
    }

    struct LeafCounter;

    impl Folder for LeafCounter {
        type Value = usize;

        fn empty(&mut self) -> usize {
            0
        }

        fn combine(&mut self, a: usize, b: usize) -> usize {
            a + b
        }

        fn fold_num_expr(&mut self, expr: &NumExpr, children: usize) -> usize {
            match expr {
                NumExpr::Int(_) => children + 1,
                _ => children,
            }
        }
    }

    #[test]
    fn test_fold_counts_integer_leaves() {
        let c = Constraint(BoolExpr::Lt(
            NumExpr::Plus(Box::new(NumExpr::Int(1)), Box::new(NumExpr::Int(2))),
            NumExpr::Int(10),
        ));
        assert_eq!(fold_constraint(&mut LeafCounter, &c), 3);
    }
}
