//! Objective-function convergence across solutions.

use anyhow::{anyhow, Result};

use super::ChartFile;
use crate::data::selection::SOLUTION_ID;
use crate::data::Frame;
use crate::figure::{Figure, Line, Margin, Marker, Mode, Scatter, SubplotGrid, Title};
use crate::render::{BACKGROUND, PAGE_WIDTH};

pub const DEFAULT_OF_NAME: &str = "of_value";
pub const FILE_NAME: &str = "solutions_convergence.html";
const LINE_COLOR: &str = "#003C71";

/// `(solution_id, objective)` pairs where the objective improved: rows are
/// taken in ascending id order, the first is always kept, and a later row is
/// kept only when its value is strictly below the last kept one. Rows with an
/// empty objective are skipped.
pub fn improvement_points(results: &Frame, of_name: &str) -> Result<Vec<(i64, f64)>> {
    let id_col = results.require_column(SOLUTION_ID)?;
    let values = results.numeric_column(of_name)?;

    let mut rows = Vec::with_capacity(results.len());
    for (row, value) in values.into_iter().enumerate() {
        let Some(value) = value else { continue };
        let id = results
            .int(row, id_col)
            .ok_or_else(|| anyhow!("row {}: '{}' is not an integer", row + 1, SOLUTION_ID))?;
        rows.push((id, value));
    }
    if rows.is_empty() {
        return Err(anyhow!("no '{}' values to plot", of_name));
    }
    rows.sort_by_key(|&(id, _)| id);

    let mut kept: Vec<(i64, f64)> = Vec::new();
    for (id, value) in rows {
        match kept.last() {
            Some(&(_, best)) if value >= best => {}
            _ => kept.push((id, value)),
        }
    }
    Ok(kept)
}

pub fn build(results: &Frame, of_name: &str) -> Result<ChartFile> {
    let points = improvement_points(results, of_name)?;
    let (ids, values): (Vec<f64>, Vec<f64>) =
        points.iter().map(|&(id, v)| (id as f64, v)).unzip();

    let mut fig = Figure::new();
    fig.add_trace(
        Scatter::new(ids, values, Mode::LinesMarkers, "Evolution of the objective function")
            .line(Line::new(LINE_COLOR, 4.0))
            .marker(Marker::new(LINE_COLOR, 5.0))
            .legend(true, "convergence"),
    );

    let layout = &mut fig.layout;
    layout.title = Some(Title {
        text: "Convergence of the Optimization Method".to_string(),
        x: Some(0.5),
    });
    layout.set_axis_titles(SubplotGrid::new(1, 1).cell(0), "solutions", of_name);
    layout.autosize = Some(true);
    layout.margin = Some(Margin::uniform(50));
    layout.showlegend = Some(true);
    layout.plot_bgcolor = Some(BACKGROUND.to_string());
    layout.paper_bgcolor = Some(BACKGROUND.to_string());

    Ok(ChartFile {
        subdir: None,
        file_name: FILE_NAME,
        width_px: PAGE_WIDTH,
        figure: fig,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame_from_str;
    use crate::figure::Trace;

    #[test]
    fn keeps_only_strict_improvements() {
        let f = frame_from_str("solution_id,of_value\n1,10\n2,8\n3,9\n4,5\n");
        let pts = improvement_points(&f, DEFAULT_OF_NAME).unwrap();
        assert_eq!(pts, vec![(1, 10.0), (2, 8.0), (4, 5.0)]);
    }

    #[test]
    fn sorts_by_solution_id_first() {
        let f = frame_from_str("solution_id,of_value\n4,5\n2,8\n1,10\n3,8\n");
        let pts = improvement_points(&f, DEFAULT_OF_NAME).unwrap();
        assert_eq!(pts, vec![(1, 10.0), (2, 8.0), (4, 5.0)]);
        assert!(pts.windows(2).all(|w| w[0].0 < w[1].0 && w[0].1 >= w[1].1));
    }

    #[test]
    fn first_row_is_kept_even_when_worst() {
        let f = frame_from_str("solution_id,npv_of\n1,100\n2,\n3,200\n");
        let pts = improvement_points(&f, "npv_of").unwrap();
        assert_eq!(pts, vec![(1, 100.0)]);
    }

    #[test]
    fn missing_objective_column_is_an_error() {
        let f = frame_from_str("solution_id,other\n1,1\n");
        assert!(improvement_points(&f, DEFAULT_OF_NAME).is_err());
    }

    #[test]
    fn builds_single_trace_chart() {
        let f = frame_from_str("solution_id,of_value\n1,10\n2,8\n");
        let chart = build(&f, DEFAULT_OF_NAME).unwrap();
        assert!(chart.subdir.is_none());
        assert_eq!(chart.file_name, FILE_NAME);
        assert_eq!(chart.figure.data.len(), 1);
        match &chart.figure.data[0] {
            Trace::Scatter(s) => {
                assert_eq!(s.x, vec![1.0, 2.0]);
                assert_eq!(s.mode, Mode::LinesMarkers);
            }
            other => panic!("unexpected trace {:?}", other),
        }
    }
}
