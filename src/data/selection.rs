//! Best solutions and the representative models chosen for each of them.

use anyhow::{anyhow, Result};

use super::{Cell, Frame};

pub const SOLUTION_ID: &str = "solution_id";
pub const RM_PREFIX: &str = "RM";
pub const MODEL_KEY: &str = "ID";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestSolution {
    /// 1-based position in the configured solution list.
    pub rank: usize,
    pub solution_id: i64,
    pub rms: Vec<i64>,
}

impl BestSolution {
    /// Output directory for this solution's charts.
    pub fn dir_name(&self) -> String {
        format!("best_sol_{}_id_{}", self.rank, self.solution_id)
    }
}

/// Look up each requested solution in the results table and collect the
/// values of its `RM*` columns. Empty RM cells are skipped.
pub fn best_solutions(results: &Frame, solution_ids: &[i64]) -> Result<Vec<BestSolution>> {
    let id_col = results.require_column(SOLUTION_ID)?;
    let rm_cols = results.columns_with_prefix(RM_PREFIX);

    solution_ids
        .iter()
        .enumerate()
        .map(|(i, &solution_id)| {
            let row = results
                .rows_matching_int(id_col, solution_id)
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("solution {} not found in results", solution_id))?;
            let mut rms = Vec::with_capacity(rm_cols.len());
            for &col in &rm_cols {
                match results.cell(row, col) {
                    Some(Cell::Null) | None => {}
                    Some(cell) => {
                        let id = cell.as_i64().ok_or_else(|| {
                            anyhow!(
                                "solution {}: column '{}' holds '{}', expected an integer model id",
                                solution_id,
                                results.columns()[col],
                                cell
                            )
                        })?;
                        rms.push(id);
                    }
                }
            }
            Ok(BestSolution {
                rank: i + 1,
                solution_id,
                rms,
            })
        })
        .collect()
}

/// Resolves a model identifier to a dataset row: by the `ID` column when the
/// dataset has one, otherwise the identifier is a 0-based row position.
pub struct ModelIndex<'a> {
    frame: &'a Frame,
    key_col: Option<usize>,
}

impl<'a> ModelIndex<'a> {
    pub fn new(frame: &'a Frame) -> Self {
        Self {
            frame,
            key_col: frame.column_index(MODEL_KEY),
        }
    }

    pub fn row_of(&self, model_id: i64) -> Option<usize> {
        match self.key_col {
            Some(col) => self.frame.rows_matching_int(col, model_id).into_iter().next(),
            None => usize::try_from(model_id)
                .ok()
                .filter(|&r| r < self.frame.len()),
        }
    }

    /// Model id of a row, the inverse of `row_of`.
    pub fn id_of(&self, row: usize) -> Option<i64> {
        match self.key_col {
            Some(col) => self.frame.int(row, col),
            None => i64::try_from(row).ok(),
        }
    }

    pub fn row_of_required(&self, model_id: i64) -> Result<usize> {
        self.row_of(model_id)
            .ok_or_else(|| anyhow!("model {} not found in dataset", model_id))
    }
}
