//! Lowering of the high-level model to the array-indexed form.
//!
//! Lowering is purely structural: every identifier is replaced by its dense
//! array index through the map lists, every entity-indexed list is
//! reordered by ascending index, and the counts the solver needs are
//! filled in. Constraints are rewritten with the
//! [`Reconstructor`](crate::constraints::Reconstructor) machinery.

use rustc_hash::FxHashMap;

use crate::{
    constraints::{
        reconstruct_constraint, Constraint, InstructionExpr, LocationExpr, MatchExpr, NodeExpr,
        Reconstructor,
    },
    ir::{ArrayIndex, MatchId, NodeId},
    model::{ArrayIndexMaplists, HighLevelModel, LowLevelModel, MatchParams},
    Error, Result,
};

struct IdLowerer<'a> {
    maps: &'a ArrayIndexMaplists,
    missing: Option<Error>,
}

impl IdLowerer<'_> {
    fn record_missing(&mut self, kind: &'static str, id: u64) {
        if self.missing.is_none() {
            self.missing = Some(Error::MissingEntity { kind, id });
        }
    }
}

impl Reconstructor for IdLowerer<'_> {
    fn mk_node_expr(&mut self, expr: NodeExpr) -> NodeExpr {
        match expr {
            NodeExpr::Id(id) => match self.maps.node_array_index(id) {
                Some(index) => NodeExpr::ArrayIndex(index),
                None => {
                    self.record_missing("node in the array-index map lists", u64::from(id.raw()));
                    expr
                }
            },
            indexed => indexed,
        }
    }

    fn mk_match_expr(&mut self, expr: MatchExpr) -> MatchExpr {
        match expr {
            MatchExpr::Id(id) => match self.maps.matches.index_of(id) {
                Some(index) => MatchExpr::ArrayIndex(index),
                None => {
                    self.record_missing("match in the array-index map lists", u64::from(id.raw()));
                    expr
                }
            },
            other => other,
        }
    }

    fn mk_instruction_expr(&mut self, expr: InstructionExpr) -> InstructionExpr {
        match expr {
            InstructionExpr::Id(id) => match self.maps.instructions.index_of(id) {
                Some(index) => InstructionExpr::ArrayIndex(index),
                None => {
                    self.record_missing(
                        "instruction in the array-index map lists",
                        u64::from(id.raw()),
                    );
                    expr
                }
            },
            other => other,
        }
    }

    fn mk_location_expr(&mut self, expr: LocationExpr) -> LocationExpr {
        match expr {
            LocationExpr::Id(id) => match self.maps.locations.index_of(id) {
                Some(index) => LocationExpr::ArrayIndex(index),
                None => {
                    self.record_missing(
                        "location in the array-index map lists",
                        u64::from(id.raw()),
                    );
                    expr
                }
            },
            other => other,
        }
    }
}

/// Rewrites every identifier inside a constraint into its array index.
///
/// # Errors
///
/// Returns [`Error::MissingEntity`] if the constraint names an identifier
/// absent from the map lists.
pub fn lower_constraint(c: &Constraint, maps: &ArrayIndexMaplists) -> Result<Constraint> {
    let mut lowerer = IdLowerer {
        maps,
        missing: None,
    };
    let lowered = reconstruct_constraint(&mut lowerer, c);
    match lowerer.missing {
        None => Ok(lowered),
        Some(err) => Err(err),
    }
}

fn lower_constraints(cs: &[Constraint], maps: &ArrayIndexMaplists) -> Result<Vec<Constraint>> {
    cs.iter().map(|c| lower_constraint(c, maps)).collect()
}

/// Lowers a high-level model into the dense array-indexed form.
///
/// # Errors
///
/// Returns [`Error::MissingEntity`] if the model references an identifier
/// the map lists do not cover.
pub fn lower_model(model: &HighLevelModel, maps: &ArrayIndexMaplists) -> Result<LowLevelModel> {
    let f = &model.function_params;

    let mut fun_states: Vec<ArrayIndex> = f
        .state_nodes
        .iter()
        .map(|&id| maps.require_node(id))
        .collect::<Result<_>>()?;
    fun_states.sort_unstable();

    let fun_entry_block = maps.require_node(f.entry_block)?;

    let dom_by_id: FxHashMap<NodeId, &Vec<NodeId>> = f
        .block_dom_sets
        .iter()
        .map(|(block, doms)| (*block, doms))
        .collect();
    let mut fun_block_dom_sets: Vec<Vec<ArrayIndex>> = Vec::with_capacity(maps.blocks.len());
    for &block in maps.blocks.ids() {
        let doms = dom_by_id.get(&block).ok_or(Error::MissingEntity {
            kind: "block in the dominator sets",
            id: u64::from(block.raw()),
        })?;
        let mut lowered: Vec<ArrayIndex> = doms
            .iter()
            .map(|&d| maps.require_node(d))
            .collect::<Result<_>>()?;
        lowered.sort_unstable();
        fun_block_dom_sets.push(lowered);
    }

    let mut fun_def_edges: Vec<(ArrayIndex, ArrayIndex)> = f
        .def_edges
        .iter()
        .map(|&(block, entity)| Ok((maps.require_node(block)?, maps.require_node(entity)?)))
        .collect::<Result<_>>()?;
    fun_def_edges.sort_unstable();

    let freq_by_id: FxHashMap<NodeId, u64> = f
        .block_params
        .iter()
        .map(|bp| (bp.node, bp.exec_frequency))
        .collect();
    let fun_bb_exec_freqs: Vec<u64> = maps
        .blocks
        .ids()
        .iter()
        .map(|block| freq_by_id.get(block).copied().unwrap_or(1))
        .collect();

    let fun_constraints = lower_constraints(&f.constraints, maps)?;

    let match_by_id: FxHashMap<MatchId, &MatchParams> = model
        .match_params
        .iter()
        .map(|mp| (mp.match_id, mp))
        .collect();

    let mut match_operations_covered = Vec::with_capacity(maps.matches.len());
    let mut match_data_defined = Vec::with_capacity(maps.matches.len());
    let mut match_data_used = Vec::with_capacity(maps.matches.len());
    let mut match_entry_blocks = Vec::with_capacity(maps.matches.len());
    let mut match_spanned_blocks = Vec::with_capacity(maps.matches.len());
    let mut match_code_sizes = Vec::with_capacity(maps.matches.len());
    let mut match_latencies = Vec::with_capacity(maps.matches.len());
    let mut match_adduc_settings = Vec::with_capacity(maps.matches.len());
    let mut match_non_copy_instructions = Vec::new();
    let mut match_constraints = Vec::with_capacity(maps.matches.len());

    for (index, &match_id) in maps.matches.ids().iter().enumerate() {
        let mp = match_by_id.get(&match_id).ok_or(Error::MissingEntity {
            kind: "match in the model parameters",
            id: u64::from(match_id.raw()),
        })?;

        let lower_ids = |ids: &[NodeId]| -> Result<Vec<ArrayIndex>> {
            let mut lowered: Vec<ArrayIndex> = ids
                .iter()
                .map(|&id| maps.require_node(id))
                .collect::<Result<_>>()?;
            lowered.sort_unstable();
            Ok(lowered)
        };

        match_operations_covered.push(lower_ids(&mp.operations_covered)?);
        match_data_defined.push(lower_ids(&mp.data_defined)?);
        match_data_used.push(lower_ids(&mp.data_used)?);
        match_entry_blocks.push(match mp.entry_block {
            Some(block) => Some(maps.require_node(block)?),
            None => None,
        });
        match_spanned_blocks.push(lower_ids(&mp.spanned_blocks)?);
        match_code_sizes.push(mp.code_size);
        match_latencies.push(mp.latency);
        match_adduc_settings.push(mp.apply_def_dom_use_constraint);
        if mp.is_non_copy_instruction {
            match_non_copy_instructions.push(ArrayIndex::new(index as u32));
        }
        match_constraints.push(lower_constraints(&mp.constraints, maps)?);
    }

    Ok(LowLevelModel {
        fun_num_operations: maps.operations.len(),
        fun_num_data: maps.data.len(),
        fun_num_blocks: maps.blocks.len(),
        fun_states,
        fun_entry_block,
        fun_block_dom_sets,
        fun_def_edges,
        fun_bb_exec_freqs,
        fun_constraints,
        num_locations: maps.locations.len(),
        num_matches: maps.matches.len(),
        match_operations_covered,
        match_data_defined,
        match_data_used,
        match_entry_blocks,
        match_spanned_blocks,
        match_code_sizes,
        match_latencies,
        match_adduc_settings,
        match_non_copy_instructions,
        match_constraints,
    })
}
