//! Raising of a low-level solution back to original identifiers.
//!
//! Raising inverts the array-index encoding: block order positions become
//! block node identifiers, selected match indices become match identifiers,
//! and the per-entity location and immediate-value arrays are filtered by
//! their validity flags — an entity whose flag is unset simply does not
//! appear in the raised association lists.

use crate::{
    ir::ArrayIndex,
    model::{ArrayIndexMaplists, HighLevelSolution, LowLevelSolution},
    Error, Result,
};

/// Raises a low-level solution into the high-level form.
///
/// # Errors
///
/// Returns [`Error::MissingEntity`] if the solution references an array
/// index outside the map lists.
pub fn raise_solution(
    solution: &LowLevelSolution,
    maps: &ArrayIndexMaplists,
) -> Result<HighLevelSolution> {
    let block_at = |index: ArrayIndex| {
        maps.blocks.id_at(index).ok_or(Error::MissingEntity {
            kind: "block array index",
            id: u64::from(index.raw()),
        })
    };

    let order_of_bbs = solution
        .order_of_bbs
        .iter()
        .map(|&i| block_at(i))
        .collect::<Result<Vec<_>>>()?;

    let mut selected_matches = Vec::new();
    let mut blocks_allocated_for_selected_matches = Vec::new();
    for (index, &selected) in solution.is_match_selected.iter().enumerate() {
        if !selected {
            continue;
        }
        let array_index = ArrayIndex::new(index as u32);
        let match_id = maps.matches.id_at(array_index).ok_or(Error::MissingEntity {
            kind: "match array index",
            id: index as u64,
        })?;
        selected_matches.push(match_id);
        let block_index =
            solution
                .bb_allocated_for_match
                .get(index)
                .copied()
                .ok_or(Error::MissingEntity {
                    kind: "block allocation for match",
                    id: index as u64,
                })?;
        blocks_allocated_for_selected_matches.push((match_id, block_at(block_index)?));
    }

    let mut locations_of_data_nodes = Vec::new();
    for (index, &has_loc) in solution.has_data_loc.iter().enumerate() {
        if !has_loc {
            continue;
        }
        let data_id = maps
            .data
            .id_at(ArrayIndex::new(index as u32))
            .ok_or(Error::MissingEntity {
                kind: "entity array index",
                id: index as u64,
            })?;
        let loc_index =
            solution
                .loc_selected_for_data
                .get(index)
                .copied()
                .ok_or(Error::MissingEntity {
                    kind: "location selection for entity",
                    id: index as u64,
                })?;
        let loc_id = maps.locations.id_at(loc_index).ok_or(Error::MissingEntity {
            kind: "location array index",
            id: u64::from(loc_index.raw()),
        })?;
        locations_of_data_nodes.push((data_id, loc_id));
    }

    let mut imm_values_of_data_nodes = Vec::new();
    for (index, &has_imm) in solution.has_data_imm_value.iter().enumerate() {
        if !has_imm {
            continue;
        }
        let data_id = maps
            .data
            .id_at(ArrayIndex::new(index as u32))
            .ok_or(Error::MissingEntity {
                kind: "entity array index",
                id: index as u64,
            })?;
        let value = solution
            .imm_value_of_data
            .get(index)
            .copied()
            .ok_or(Error::MissingEntity {
                kind: "immediate value for entity",
                id: index as u64,
            })?;
        imm_values_of_data_nodes.push((data_id, value));
    }

    Ok(HighLevelSolution {
        order_of_bbs,
        selected_matches,
        blocks_allocated_for_selected_matches,
        locations_of_data_nodes,
        imm_values_of_data_nodes,
        cost: solution.cost,
    })
}
