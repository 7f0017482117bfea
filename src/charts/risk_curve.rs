//! Risk curves: cumulative probability against each variable for the whole
//! population, with the RM set drawn as a staircase through its own
//! cumulative probabilities.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::ChartFile;
use crate::data::selection::{BestSolution, ModelIndex, MODEL_KEY, SOLUTION_ID};
use crate::data::Frame;
use crate::figure::{Figure, Line, Marker, Mode, Scatter, SubplotGrid};
use crate::palette::{color_or_default, colors_for};
use crate::render::{style_panels, PAGE_WIDTH, PANEL_COLUMNS};

pub const FILE_NAME: &str = "risk_curve.html";
pub const Y_TITLE: &str = "acc";
const CURVE_COLOR: &str = "#888888";
const RM_MARKER_SIZE: f64 = 10.0;
const ROW_HEIGHT: u32 = 500;

/// How population values are paired with their cumulative probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pairing {
    /// Values sorted ascending and probabilities sorted descending, each on
    /// its own, then zipped by position.
    #[default]
    Positional,
    /// Values and probabilities joined on the shared `ID` key (row position
    /// when a table has no key), then sorted together by value.
    Joint,
}

/// Inputs shared by every solution's risk-curve chart.
pub struct RiskInputs<'a> {
    pub dataset: &'a Frame,
    pub models_cumulative_prob: &'a Frame,
    pub rms_cumulative_prob: &'a Frame,
    pub pairing: Pairing,
}

/// Vertical gap between panel rows, stepped down as rows are added so
/// subplot titles do not overlap.
pub fn vertical_spacing(rows: usize) -> f64 {
    let share = 1.0 / rows.max(1) as f64;
    if share >= 0.5 {
        0.1
    } else if share >= 0.1 {
        0.05
    } else {
        0.01
    }
}

/// Staircase through the RM points, `points` sorted by x. The line starts at
/// probability 1 on the first x, drops at each x through the midpoints with
/// its neighbours, and ends at 0 on the last x.
pub fn step_curve(points: &[(f64, f64)]) -> (Vec<f64>, Vec<f64>) {
    let mut line_x = Vec::with_capacity(points.len() * 3);
    let mut line_y = Vec::with_capacity(points.len() * 3);

    for (i, &(x, y)) in points.iter().enumerate() {
        if i == 0 {
            line_x.push(x);
            line_y.push(1.0);
        } else {
            let prev_y = points[i - 1].1;
            line_x.push(x);
            line_y.push((y + prev_y) / 2.0);
        }

        line_x.push(x);
        line_y.push(y);

        match points.get(i + 1) {
            Some(&(_, next_y)) => {
                line_x.push(x);
                line_y.push((y + next_y) / 2.0);
            }
            None => {
                line_x.push(x);
                line_y.push(0.0);
            }
        }
    }
    (line_x, line_y)
}

fn sorted_desc(mut v: Vec<f64>) -> Vec<f64> {
    v.sort_by(|a, b| b.total_cmp(a));
    v
}

/// Background points for one variable.
pub fn population_points(inputs: &RiskInputs<'_>, var: &str) -> Result<Vec<(f64, f64)>> {
    let xs = inputs.dataset.numeric_column(var)?;
    let ps = inputs.models_cumulative_prob.numeric_column(var)?;

    match inputs.pairing {
        Pairing::Positional => {
            let mut x: Vec<f64> = xs.into_iter().flatten().collect();
            x.sort_by(f64::total_cmp);
            let y = sorted_desc(ps.into_iter().flatten().collect());
            Ok(x.into_iter().zip(y).collect())
        }
        Pairing::Joint => {
            let data_idx = ModelIndex::new(inputs.dataset);
            let prob_idx = ModelIndex::new(inputs.models_cumulative_prob);
            let keyed = inputs.dataset.column_index(MODEL_KEY).is_some()
                && inputs.models_cumulative_prob.column_index(MODEL_KEY).is_some();
            let mut pts = Vec::with_capacity(xs.len());
            for (row, x) in xs.iter().enumerate() {
                let prob_row = if keyed {
                    data_idx.id_of(row).and_then(|id| prob_idx.row_of(id))
                } else {
                    Some(row)
                };
                if let (Some(x), Some(p)) = (x, prob_row.and_then(|r| ps.get(r).copied().flatten()))
                {
                    pts.push((*x, p));
                }
            }
            pts.sort_by(|a, b| a.0.total_cmp(&b.0));
            Ok(pts)
        }
    }
}

/// RM points for one variable as `(id, x, y)`, sorted by x.
pub fn rm_points(
    inputs: &RiskInputs<'_>,
    solution: &BestSolution,
    var: &str,
) -> Result<Vec<(i64, f64, f64)>> {
    let xs = inputs.dataset.numeric_column(var)?;
    let index = ModelIndex::new(inputs.dataset);

    let mut by_x = Vec::with_capacity(solution.rms.len());
    for &rm in &solution.rms {
        let row = index.row_of_required(rm)?;
        let x = xs[row].ok_or_else(|| anyhow!("model {} has no '{}' value", rm, var))?;
        by_x.push((rm, x));
    }
    by_x.sort_by(|a, b| a.1.total_cmp(&b.1));

    let rms_prob = inputs.rms_cumulative_prob;
    let sol_col = rms_prob.require_column(SOLUTION_ID)?;
    let p_col = rms_prob.require_column(var)?;
    let rows = rms_prob.rows_matching_int(sol_col, solution.solution_id);

    let key_col = rms_prob.column_index(MODEL_KEY);
    let ys: Vec<f64> = match (inputs.pairing, key_col) {
        (Pairing::Joint, Some(key)) => by_x
            .iter()
            .map(|&(rm, _)| {
                rows.iter()
                    .find(|&&r| rms_prob.int(r, key) == Some(rm))
                    .and_then(|&r| rms_prob.num(r, p_col))
                    .ok_or_else(|| anyhow!("no '{}' probability for RM {}", var, rm))
            })
            .collect::<Result<_>>()?,
        _ => sorted_desc(rows.iter().filter_map(|&r| rms_prob.num(r, p_col)).collect()),
    };

    if ys.len() < by_x.len() {
        return Err(anyhow!(
            "solution {}: {} '{}' cumulative probabilities for {} RMs",
            solution.solution_id,
            ys.len(),
            var,
            by_x.len()
        ));
    }

    Ok(by_x
        .into_iter()
        .zip(ys)
        .map(|((rm, x), y)| (rm, x, y))
        .collect())
}

pub fn build(
    inputs: &RiskInputs<'_>,
    solutions: &[BestSolution],
    variables: &[String],
) -> Result<Vec<ChartFile>> {
    solutions
        .iter()
        .map(|s| build_one(inputs, s, variables))
        .collect()
}

pub fn build_one(
    inputs: &RiskInputs<'_>,
    solution: &BestSolution,
    variables: &[String],
) -> Result<ChartFile> {
    if variables.is_empty() {
        return Err(anyhow!("no risk-curve variables requested"));
    }
    let rows = variables.len().div_ceil(PANEL_COLUMNS);
    let grid = SubplotGrid::new(rows, PANEL_COLUMNS)
        .vertical_spacing(vertical_spacing(rows))
        .horizontal_spacing(0.1)
        .titles(variables.to_vec());

    let mut fig = Figure::new();
    grid.install(&mut fig.layout);

    for (panel, var) in variables.iter().enumerate() {
        let cell = grid.cell(panel);
        let show_legend = panel == 0;

        let (px, py): (Vec<f64>, Vec<f64>) =
            population_points(inputs, var)?.into_iter().unzip();
        fig.add_trace_at(
            Scatter::new(px, py, Mode::Markers, "Models")
                .marker(Marker::new("black", 4.0))
                .legend(show_legend, "Models"),
            cell,
        );

        let points = rm_points(inputs, solution, var)?;
        let xy: Vec<(f64, f64)> = points.iter().map(|&(_, x, y)| (x, y)).collect();
        let (line_x, line_y) = step_curve(&xy);
        fig.add_trace_at(
            Scatter::new(line_x, line_y, Mode::Lines, "RMs curve")
                .line(Line::new(CURVE_COLOR, 2.0))
                .legend(show_legend, "Lines"),
            cell,
        );

        let ids: Vec<i64> = points.iter().map(|&(id, _, _)| id).collect();
        let colors = colors_for(&ids);
        let mut markers: Vec<(i64, f64, f64, String)> = points
            .iter()
            .enumerate()
            .map(|(i, &(id, x, y))| (id, x, y, color_or_default(&colors, i)))
            .collect();
        markers.sort_by_key(|m| m.0);
        for (id, x, y, color) in markers {
            fig.add_trace_at(
                Scatter::new(vec![x], vec![y], Mode::Markers, &format!("RM {}", id))
                    .marker(Marker::new(&color, RM_MARKER_SIZE).symbol("circle"))
                    .legend(show_legend, &format!("RM_{}", id)),
                cell,
            );
        }

        fig.layout.set_axis_titles(cell, var, Y_TITLE);
    }

    style_panels(&mut fig.layout, variables.len());
    fig.layout.height = Some(ROW_HEIGHT.max(rows as u32 * ROW_HEIGHT));

    Ok(ChartFile {
        subdir: Some(solution.dir_name()),
        file_name: FILE_NAME,
        width_px: PAGE_WIDTH,
        figure: fig,
    })
}
