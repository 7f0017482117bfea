//! Variable-pair cross-plots: the whole population in the background, each
//! RM on top in its own color, sized by its probability.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::ChartFile;
use crate::data::selection::{BestSolution, ModelIndex, SOLUTION_ID};
use crate::data::Frame;
use crate::figure::{Figure, Marker, Mode, Scatter, SubplotGrid};
use crate::palette::{color_or_default, colors_for, marker_sizes};
use crate::render::{style_panels, PAGE_WIDTH, PANEL_COLUMNS};

pub const FILE_NAME: &str = "cross_plot.html";
pub const PROBABILITY: &str = "probability";
/// Columns that, when present, tie a probability row to an RM id.
pub const RM_KEY_COLUMNS: [&str; 2] = ["ID", "rm_id"];
pub const DEFAULT_RM_SIZE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariablePair {
    pub x: String,
    pub y: String,
}

impl VariablePair {
    pub fn new(x: &str, y: &str) -> Self {
        Self {
            x: x.to_string(),
            y: y.to_string(),
        }
    }

    pub fn title(&self) -> String {
        format!("{} vs {}", self.x, self.y)
    }
}

/// Probability of each RM of `solution`, in RM order. Rows are matched by RM
/// id when the table has a key column, by position otherwise.
pub fn rm_probabilities(prob: &Frame, solution: &BestSolution) -> Result<Vec<Option<f64>>> {
    let sol_col = prob.require_column(SOLUTION_ID)?;
    let p_col = prob.require_column(PROBABILITY)?;
    let rows = prob.rows_matching_int(sol_col, solution.solution_id);

    let key_col = RM_KEY_COLUMNS.iter().find_map(|k| prob.column_index(k));
    let out = match key_col {
        Some(key) => solution
            .rms
            .iter()
            .map(|&rm| {
                rows.iter()
                    .find(|&&r| prob.int(r, key) == Some(rm))
                    .and_then(|&r| prob.num(r, p_col))
            })
            .collect(),
        None => (0..solution.rms.len())
            .map(|i| rows.get(i).and_then(|&r| prob.num(r, p_col)))
            .collect(),
    };
    Ok(out)
}

/// Vertical gap between panel rows; shrinks as rows are added.
pub fn vertical_spacing(rows: usize) -> f64 {
    (0.25 / rows.max(1) as f64).max(0.05)
}

pub fn build(
    dataset: &Frame,
    prob: &Frame,
    solutions: &[BestSolution],
    pairs: &[VariablePair],
) -> Result<Vec<ChartFile>> {
    solutions
        .iter()
        .map(|s| build_one(dataset, prob, s, pairs))
        .collect()
}

pub fn build_one(
    dataset: &Frame,
    prob: &Frame,
    solution: &BestSolution,
    pairs: &[VariablePair],
) -> Result<ChartFile> {
    if pairs.is_empty() {
        return Err(anyhow!("no variable pairs requested"));
    }
    let rows = pairs.len().div_ceil(PANEL_COLUMNS);
    let grid = SubplotGrid::new(rows, PANEL_COLUMNS)
        .vertical_spacing(vertical_spacing(rows))
        .horizontal_spacing(0.1)
        .titles(pairs.iter().map(VariablePair::title).collect());

    let index = ModelIndex::new(dataset);
    let rm_rows = solution
        .rms
        .iter()
        .map(|&rm| index.row_of_required(rm))
        .collect::<Result<Vec<_>>>()?;
    let colors = colors_for(&solution.rms);
    let sizes = rm_probabilities(prob, solution)?
        .into_iter()
        .collect::<Option<Vec<f64>>>()
        .map(|p| marker_sizes(&p))
        .unwrap_or_default();

    let mut fig = Figure::new();
    grid.install(&mut fig.layout);

    for (panel, pair) in pairs.iter().enumerate() {
        let cell = grid.cell(panel);
        let show_legend = panel == 0;
        let xs = dataset.numeric_column(&pair.x)?;
        let ys = dataset.numeric_column(&pair.y)?;

        let (bx, by): (Vec<f64>, Vec<f64>) = xs
            .iter()
            .zip(&ys)
            .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
            .unzip();
        fig.add_trace_at(
            Scatter::new(bx, by, Mode::Markers, "Models")
                .marker(Marker::new("black", 4.0))
                .legend(show_legend, "Models"),
            cell,
        );

        for (i, (&rm, &row)) in solution.rms.iter().zip(&rm_rows).enumerate() {
            let (Some(x), Some(y)) = (xs[row], ys[row]) else {
                continue;
            };
            let size = sizes.get(i).copied().unwrap_or(DEFAULT_RM_SIZE);
            fig.add_trace_at(
                Scatter::new(vec![x], vec![y], Mode::Markers, &format!("RM {}", rm))
                    .marker(Marker::new(&color_or_default(&colors, i), size).symbol("circle"))
                    .legend(show_legend, &format!("RM_{}", rm)),
                cell,
            );
        }

        fig.layout.set_axis_titles(cell, &pair.x, &pair.y);
    }

    style_panels(&mut fig.layout, pairs.len());

    Ok(ChartFile {
        subdir: Some(solution.dir_name()),
        file_name: FILE_NAME,
        width_px: PAGE_WIDTH,
        figure: fig,
    })
}
