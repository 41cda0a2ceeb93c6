//! Generic bottom-up rewriting of constraint expressions.
//!
//! [`Reconstructor`] carries one `mk_*` hook per expression sort. The
//! driver functions ([`reconstruct_constraint`] and friends) rebuild a tree
//! recursively: the children of a node are rewritten *first*, then the hook
//! for the node's sort is applied to the rebuilt node. A rewrite therefore
//! overrides exactly the hook for the sort it targets and sees subtrees that
//! are already rewritten; every other hook defaults to the identity.

use rustc_hash::FxHashMap;

use crate::{
    constraints::{
        BoolExpr, Constraint, InstructionExpr, LocationExpr, MatchExpr, NodeExpr, NumExpr,
        SetElemExpr, SetExpr,
    },
    ir::{MatchId, NodeId},
    Error, Result,
};

/// A family of per-sort rewrite hooks.
///
/// Implementations override the hook(s) for the sort(s) they rewrite; all
/// other sorts pass through unchanged. Hooks receive nodes whose children
/// have already been rewritten.
pub trait Reconstructor {
    /// Rewrites a rebuilt boolean expression.
    fn mk_bool_expr(&mut self, expr: BoolExpr) -> BoolExpr {
        expr
    }

    /// Rewrites a rebuilt numeric expression.
    fn mk_num_expr(&mut self, expr: NumExpr) -> NumExpr {
        expr
    }

    /// Rewrites a rebuilt node expression.
    fn mk_node_expr(&mut self, expr: NodeExpr) -> NodeExpr {
        expr
    }

    /// Rewrites a rebuilt match expression.
    fn mk_match_expr(&mut self, expr: MatchExpr) -> MatchExpr {
        expr
    }

    /// Rewrites a rebuilt instruction expression.
    fn mk_instruction_expr(&mut self, expr: InstructionExpr) -> InstructionExpr {
        expr
    }

    /// Rewrites a rebuilt block expression.
    fn mk_block_expr(&mut self, expr: super::BlockExpr) -> super::BlockExpr {
        expr
    }

    /// Rewrites a rebuilt location expression.
    fn mk_location_expr(&mut self, expr: LocationExpr) -> LocationExpr {
        expr
    }

    /// Rewrites a rebuilt set expression.
    fn mk_set_expr(&mut self, expr: SetExpr) -> SetExpr {
        expr
    }

    /// Rewrites a rebuilt set-element expression.
    fn mk_set_elem_expr(&mut self, expr: SetElemExpr) -> SetElemExpr {
        expr
    }
}

/// Rewrites a constraint with the given reconstructor.
pub fn reconstruct_constraint<R: Reconstructor + ?Sized>(r: &mut R, c: &Constraint) -> Constraint {
    Constraint(reconstruct_bool(r, &c.0))
}

/// Rewrites a boolean expression with the given reconstructor.
pub fn reconstruct_bool<R: Reconstructor + ?Sized>(r: &mut R, expr: &BoolExpr) -> BoolExpr {
    let rebuilt = match expr {
        BoolExpr::Eq(a, b) => BoolExpr::Eq(reconstruct_num(r, a), reconstruct_num(r, b)),
        BoolExpr::Neq(a, b) => BoolExpr::Neq(reconstruct_num(r, a), reconstruct_num(r, b)),
        BoolExpr::Gt(a, b) => BoolExpr::Gt(reconstruct_num(r, a), reconstruct_num(r, b)),
        BoolExpr::Ge(a, b) => BoolExpr::Ge(reconstruct_num(r, a), reconstruct_num(r, b)),
        BoolExpr::Lt(a, b) => BoolExpr::Lt(reconstruct_num(r, a), reconstruct_num(r, b)),
        BoolExpr::Le(a, b) => BoolExpr::Le(reconstruct_num(r, a), reconstruct_num(r, b)),
        BoolExpr::And(a, b) => BoolExpr::And(
            Box::new(reconstruct_bool(r, a)),
            Box::new(reconstruct_bool(r, b)),
        ),
        BoolExpr::Or(a, b) => BoolExpr::Or(
            Box::new(reconstruct_bool(r, a)),
            Box::new(reconstruct_bool(r, b)),
        ),
        BoolExpr::Imp(a, b) => BoolExpr::Imp(
            Box::new(reconstruct_bool(r, a)),
            Box::new(reconstruct_bool(r, b)),
        ),
        BoolExpr::Eqv(a, b) => BoolExpr::Eqv(
            Box::new(reconstruct_bool(r, a)),
            Box::new(reconstruct_bool(r, b)),
        ),
        BoolExpr::Not(a) => BoolExpr::Not(Box::new(reconstruct_bool(r, a))),
        BoolExpr::InSet(elem, set) => {
            BoolExpr::InSet(reconstruct_set_elem(r, elem), reconstruct_set(r, set))
        }
        BoolExpr::FallThrough(m, b) => {
            BoolExpr::FallThrough(reconstruct_match(r, m), reconstruct_block(r, b))
        }
    };
    r.mk_bool_expr(rebuilt)
}

fn reconstruct_num<R: Reconstructor + ?Sized>(r: &mut R, expr: &NumExpr) -> NumExpr {
    let rebuilt = match expr {
        NumExpr::Plus(a, b) => NumExpr::Plus(
            Box::new(reconstruct_num(r, a)),
            Box::new(reconstruct_num(r, b)),
        ),
        NumExpr::Minus(a, b) => NumExpr::Minus(
            Box::new(reconstruct_num(r, a)),
            Box::new(reconstruct_num(r, b)),
        ),
        NumExpr::Int(i) => NumExpr::Int(*i),
        NumExpr::NodeToNum(n) => NumExpr::NodeToNum(reconstruct_node(r, n)),
        NumExpr::MatchToNum(m) => NumExpr::MatchToNum(reconstruct_match(r, m)),
        NumExpr::InstructionToNum(i) => NumExpr::InstructionToNum(reconstruct_instruction(r, i)),
        NumExpr::BlockToNum(b) => NumExpr::BlockToNum(reconstruct_block(r, b)),
        NumExpr::LocationToNum(l) => NumExpr::LocationToNum(reconstruct_location(r, l)),
        NumExpr::DistanceBetweenMatchAndBlock(m, b) => NumExpr::DistanceBetweenMatchAndBlock(
            reconstruct_match(r, m),
            reconstruct_block(r, b),
        ),
    };
    r.mk_num_expr(rebuilt)
}

fn reconstruct_node<R: Reconstructor + ?Sized>(r: &mut R, expr: &NodeExpr) -> NodeExpr {
    r.mk_node_expr(*expr)
}

fn reconstruct_match<R: Reconstructor + ?Sized>(r: &mut R, expr: &MatchExpr) -> MatchExpr {
    r.mk_match_expr(*expr)
}

fn reconstruct_instruction<R: Reconstructor + ?Sized>(
    r: &mut R,
    expr: &InstructionExpr,
) -> InstructionExpr {
    let rebuilt = match expr {
        InstructionExpr::OfMatch(m) => InstructionExpr::OfMatch(reconstruct_match(r, m)),
        leaf => *leaf,
    };
    r.mk_instruction_expr(rebuilt)
}

fn reconstruct_block<R: Reconstructor + ?Sized>(
    r: &mut R,
    expr: &super::BlockExpr,
) -> super::BlockExpr {
    use super::BlockExpr;
    let rebuilt = match expr {
        BlockExpr::OfBlockNode(n) => BlockExpr::OfBlockNode(reconstruct_node(r, n)),
        BlockExpr::WhereinMatchIsPlaced(m) => {
            BlockExpr::WhereinMatchIsPlaced(reconstruct_match(r, m))
        }
        BlockExpr::WhereinDataIsDefined(n) => {
            BlockExpr::WhereinDataIsDefined(reconstruct_node(r, n))
        }
    };
    r.mk_block_expr(rebuilt)
}

fn reconstruct_location<R: Reconstructor + ?Sized>(r: &mut R, expr: &LocationExpr) -> LocationExpr {
    let rebuilt = match expr {
        LocationExpr::OfValueNode(n) => LocationExpr::OfValueNode(reconstruct_node(r, n)),
        leaf => *leaf,
    };
    r.mk_location_expr(rebuilt)
}

fn reconstruct_set<R: Reconstructor + ?Sized>(r: &mut R, expr: &SetExpr) -> SetExpr {
    let rebuilt = match expr {
        SetExpr::Union(a, b) => SetExpr::Union(
            Box::new(reconstruct_set(r, a)),
            Box::new(reconstruct_set(r, b)),
        ),
        SetExpr::Intersect(a, b) => SetExpr::Intersect(
            Box::new(reconstruct_set(r, a)),
            Box::new(reconstruct_set(r, b)),
        ),
        SetExpr::Diff(a, b) => SetExpr::Diff(
            Box::new(reconstruct_set(r, a)),
            Box::new(reconstruct_set(r, b)),
        ),
        SetExpr::DomSetOfBlock(b) => SetExpr::DomSetOfBlock(reconstruct_block(r, b)),
        SetExpr::BlockSet(blocks) => {
            SetExpr::BlockSet(blocks.iter().map(|b| reconstruct_block(r, b)).collect())
        }
        SetExpr::LocationClass(locs) => {
            SetExpr::LocationClass(locs.iter().map(|l| reconstruct_location(r, l)).collect())
        }
    };
    r.mk_set_expr(rebuilt)
}

fn reconstruct_set_elem<R: Reconstructor + ?Sized>(r: &mut R, expr: &SetElemExpr) -> SetElemExpr {
    let rebuilt = match expr {
        SetElemExpr::Block(b) => SetElemExpr::Block(reconstruct_block(r, b)),
        SetElemExpr::Location(l) => SetElemExpr::Location(reconstruct_location(r, l)),
    };
    r.mk_set_elem_expr(rebuilt)
}

// ----------------------------------------------------------------------
// Canned rewrites
// ----------------------------------------------------------------------

struct ThisMatchReplacer {
    id: MatchId,
}

impl Reconstructor for ThisMatchReplacer {
    fn mk_match_expr(&mut self, expr: MatchExpr) -> MatchExpr {
        match expr {
            MatchExpr::This => MatchExpr::Id(self.id),
            other => other,
        }
    }
}

/// Replaces every occurrence of "this match" with a concrete match
/// identifier.
#[must_use]
pub fn replace_this_match_with(c: &Constraint, id: MatchId) -> Constraint {
    reconstruct_constraint(&mut ThisMatchReplacer { id }, c)
}

struct PatternNodeBinder<'a> {
    map: &'a FxHashMap<NodeId, NodeId>,
    missing: Option<NodeId>,
}

impl Reconstructor for PatternNodeBinder<'_> {
    fn mk_node_expr(&mut self, expr: NodeExpr) -> NodeExpr {
        match expr {
            NodeExpr::Id(pattern_id) => match self.map.get(&pattern_id) {
                Some(&function_id) => NodeExpr::Id(function_id),
                None => {
                    self.missing.get_or_insert(pattern_id);
                    expr
                }
            },
            other => other,
        }
    }
}

/// Replaces every pattern node identifier in the constraint with the
/// function node identifier the match maps it to.
///
/// # Errors
///
/// Returns [`Error::Precondition`] if the constraint names a pattern node
/// the match does not cover.
pub fn replace_pattern_node_ids(
    c: &Constraint,
    map: &FxHashMap<NodeId, NodeId>,
) -> Result<Constraint> {
    let mut binder = PatternNodeBinder { map, missing: None };
    let rewritten = reconstruct_constraint(&mut binder, c);
    match binder.missing {
        None => Ok(rewritten),
        Some(id) => Err(Error::precondition(
            "replace_pattern_node_ids",
            format!("pattern node {id} is not covered by the match"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::BlockExpr;
    use crate::ir::LocationId;

    fn placement_constraint() -> Constraint {
        // The block this match is placed in equals the block of node 5.
        Constraint(BoolExpr::Eq(
            NumExpr::BlockToNum(BlockExpr::WhereinMatchIsPlaced(MatchExpr::This)),
            NumExpr::BlockToNum(BlockExpr::OfBlockNode(NodeExpr::Id(NodeId::new(5)))),
        ))
    }

    #[test]
    fn test_replace_this_match() {
        let c = placement_constraint();
        let rewritten = replace_this_match_with(&c, MatchId::new(9));
        assert_eq!(
            rewritten.0,
            BoolExpr::Eq(
                NumExpr::BlockToNum(BlockExpr::WhereinMatchIsPlaced(MatchExpr::Id(MatchId::new(
                    9
                )))),
                NumExpr::BlockToNum(BlockExpr::OfBlockNode(NodeExpr::Id(NodeId::new(5)))),
            )
        );
    }

    #[test]
    fn test_replace_this_match_leaves_concrete_ids() {
        let c = Constraint(BoolExpr::Eq(
            NumExpr::MatchToNum(MatchExpr::Id(MatchId::new(1))),
            NumExpr::MatchToNum(MatchExpr::This),
        ));
        let rewritten = replace_this_match_with(&c, MatchId::new(2));
        assert_eq!(
            rewritten.0,
            BoolExpr::Eq(
                NumExpr::MatchToNum(MatchExpr::Id(MatchId::new(1))),
                NumExpr::MatchToNum(MatchExpr::Id(MatchId::new(2))),
            )
        );
    }

    #[test]
    fn test_bind_pattern_nodes() {
        let c = placement_constraint();
        let map: FxHashMap<NodeId, NodeId> =
            [(NodeId::new(5), NodeId::new(42))].into_iter().collect();
        let rewritten = replace_pattern_node_ids(&c, &map).unwrap();
        assert_eq!(
            rewritten.0,
            BoolExpr::Eq(
                NumExpr::BlockToNum(BlockExpr::WhereinMatchIsPlaced(MatchExpr::This)),
                NumExpr::BlockToNum(BlockExpr::OfBlockNode(NodeExpr::Id(NodeId::new(42)))),
            )
        );
    }

    #[test]
    fn test_bind_pattern_nodes_missing_is_fatal() {
        let c = placement_constraint();
        let map: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        let err = replace_pattern_node_ids(&c, &map).unwrap_err();
        assert!(err.to_string().contains("replace_pattern_node_ids"));
    }

    #[test]
    fn test_rewrites_reach_nested_sets() {
        let c = Constraint(BoolExpr::InSet(
            SetElemExpr::Location(LocationExpr::OfValueNode(NodeExpr::Id(NodeId::new(3)))),
            SetExpr::Union(
                Box::new(SetExpr::LocationClass(vec![LocationExpr::Id(
                    LocationId::new(0),
                )])),
                Box::new(SetExpr::DomSetOfBlock(BlockExpr::OfBlockNode(NodeExpr::Id(
                    NodeId::new(3),
                )))),
            ),
        ));
        let map: FxHashMap<NodeId, NodeId> =
            [(NodeId::new(3), NodeId::new(8))].into_iter().collect();
        let rewritten = replace_pattern_node_ids(&c, &map).unwrap();
        let ids = crate::constraints::referenced_node_ids(&rewritten);
        assert!(ids.contains(&NodeId::new(8)));
        assert!(!ids.contains(&NodeId::new(3)));
    }
}
