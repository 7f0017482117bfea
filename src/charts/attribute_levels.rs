//! Attribute-level frequency histograms: population versus RM frequencies,
//! one subplot row per attribute.

use anyhow::{anyhow, Result};

use super::ChartFile;
use crate::data::selection::BestSolution;
use crate::data::Frame;
use crate::figure::{Bar, Figure, Legend, Margin, Marker, SubplotGrid, Title};
use crate::render::BACKGROUND;

pub const FILE_NAME: &str = "attribute_levels.html";
pub const SOLUTION_KEY: &str = "SOLUTION_ID";
pub const VARIABLE: &str = "Variable";
pub const MODEL_PREFIX: &str = "MODEL_FREQUENCY";
pub const RMS_PREFIX: &str = "RMS_FREQUENCY";
pub const WIDTH: u32 = 800;
const ROW_HEIGHT: u32 = 300;
const MODEL_COLOR: &str = "#FF6F00";
const RMS_COLOR: &str = "#003C71";

/// One attribute row: its name and the non-empty frequencies per level.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRow {
    pub variable: String,
    pub model: Vec<f64>,
    pub rms: Vec<f64>,
}

pub fn attribute_rows(results: &Frame, solution_id: i64) -> Result<Vec<AttributeRow>> {
    let sol_col = results.require_column(SOLUTION_KEY)?;
    let var_col = results.require_column(VARIABLE)?;
    let model_cols = results.columns_with_prefix(MODEL_PREFIX);
    let rms_cols = results.columns_with_prefix(RMS_PREFIX);

    let values = |row: usize, cols: &[usize]| -> Vec<f64> {
        cols.iter().filter_map(|&c| results.num(row, c)).collect()
    };

    Ok(results
        .rows_matching_int(sol_col, solution_id)
        .into_iter()
        .map(|row| AttributeRow {
            variable: results.text(row, var_col).unwrap_or_default(),
            model: values(row, &model_cols),
            rms: values(row, &rms_cols),
        })
        .collect())
}

fn levels(n: usize) -> Vec<f64> {
    (1..=n).map(|l| l as f64).collect()
}

pub fn build(results: &Frame, solutions: &[BestSolution]) -> Result<Vec<ChartFile>> {
    solutions.iter().map(|s| build_one(results, s)).collect()
}

pub fn build_one(results: &Frame, solution: &BestSolution) -> Result<ChartFile> {
    let rows = attribute_rows(results, solution.solution_id)?;
    if rows.is_empty() {
        return Err(anyhow!(
            "no attribute levels for solution {}",
            solution.solution_id
        ));
    }

    let grid = SubplotGrid::new(rows.len(), 1)
        .titles(rows.iter().map(|r| r.variable.clone()).collect());
    let mut fig = Figure::new();
    grid.install(&mut fig.layout);

    for (i, attr) in rows.iter().enumerate() {
        let cell = grid.cell(i);
        let show_legend = i == 0;
        let x = levels(attr.model.len());

        fig.add_trace_at(
            Bar::new(x.clone(), attr.model.clone(), "MODEL Frequencies")
                .marker(Marker::color(MODEL_COLOR))
                .opacity(0.6)
                .offsetgroup("0")
                .legend(show_legend, "model_frequencies"),
            cell,
        );
        fig.add_trace_at(
            Bar::new(x.clone(), attr.rms.clone(), "RMS Frequencies")
                .marker(Marker::color(RMS_COLOR))
                .opacity(0.6)
                .offsetgroup("1")
                .legend(show_legend, "rms_frequencies"),
            cell,
        );

        let xa = fig.layout.x_axis_mut(cell);
        xa.ticktext = Some(x.iter().map(|l| format!("{}", *l as i64)).collect());
        xa.tickvals = Some(x);
        xa.title = Some(Title::new("Levels"));
        fig.layout.y_axis_mut(cell).title = Some(Title::new("Frequency"));
    }

    let layout = &mut fig.layout;
    layout.barmode = Some("group".to_string());
    layout.legend = Some(Legend {
        title: Title::new("Frequency Type"),
    });
    layout.plot_bgcolor = Some(BACKGROUND.to_string());
    layout.height = Some(ROW_HEIGHT * rows.len() as u32);
    layout.width = Some(WIDTH);
    layout.margin = Some(Margin::uniform(50));
    layout.showlegend = Some(true);

    Ok(ChartFile {
        subdir: Some(solution.dir_name()),
        file_name: FILE_NAME,
        width_px: WIDTH,
        figure: fig,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame_from_str;
    use crate::figure::Trace;

    fn results() -> Frame {
        frame_from_str(
            "SOLUTION_ID,Variable,MODEL_FREQUENCY_1,MODEL_FREQUENCY_2,MODEL_FREQUENCY_3,RMS_FREQUENCY_1,RMS_FREQUENCY_2,RMS_FREQUENCY_3\n\
             11,PERM,0.2,0.5,0.3,0.25,0.5,0.25\n\
             11,PORO,0.6,0.4,,0.5,0.5,\n\
             12,PERM,0.1,0.8,0.1,0.0,1.0,0.0\n",
        )
    }

    fn solution(id: i64) -> BestSolution {
        BestSolution {
            rank: 1,
            solution_id: id,
            rms: vec![],
        }
    }

    #[test]
    fn rows_drop_empty_levels() {
        let rows = attribute_rows(&results(), 11).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].variable, "PERM");
        assert_eq!(rows[0].model, vec![0.2, 0.5, 0.3]);
        assert_eq!(rows[1].model, vec![0.6, 0.4]);
        assert_eq!(rows[1].rms, vec![0.5, 0.5]);
    }

    #[test]
    fn paired_bars_per_attribute_with_one_legend() {
        let chart = build_one(&results(), &solution(11)).unwrap();
        let fig = &chart.figure;
        assert_eq!(fig.data.len(), 4);
        assert_eq!(
            fig.legend_entries(),
            vec!["MODEL Frequencies", "RMS Frequencies"]
        );
        match (&fig.data[2], &fig.data[3]) {
            (Trace::Bar(m), Trace::Bar(r)) => {
                assert_eq!(m.x, vec![1.0, 2.0]);
                assert_eq!(m.offsetgroup.as_deref(), Some("0"));
                assert_eq!(r.offsetgroup.as_deref(), Some("1"));
                assert_eq!(m.xaxis.as_deref(), Some("x2"));
            }
            other => panic!("expected bars, got {:?}", other),
        }
        assert_eq!(fig.layout.height, Some(600));
        assert_eq!(fig.layout.barmode.as_deref(), Some("group"));
        assert_eq!(chart.width_px, WIDTH);
        assert_eq!(fig.layout.axes["xaxis"].ticktext.as_ref().unwrap(), &["1", "2", "3"]);
    }

    #[test]
    fn rms_bars_share_the_model_levels() {
        let results = frame_from_str(
            "SOLUTION_ID,Variable,MODEL_FREQUENCY_1,MODEL_FREQUENCY_2,MODEL_FREQUENCY_3,RMS_FREQUENCY_1,RMS_FREQUENCY_2,RMS_FREQUENCY_3\n\
             7,PERM,0.2,0.5,0.3,,1.0,\n\
             7,PORO,0.6,,,0.5,0.5,\n",
        );
        let chart = build_one(&results, &solution(7)).unwrap();
        for pair in chart.figure.data.chunks(2) {
            match pair {
                [Trace::Bar(m), Trace::Bar(r)] => {
                    assert_eq!(r.x, m.x);
                    assert_eq!(m.x.len(), m.y.len());
                }
                other => panic!("expected bar pairs, got {:?}", other),
            }
        }
        match &chart.figure.data[1] {
            Trace::Bar(r) => assert_eq!(r.y, vec![1.0]),
            other => panic!("expected bars, got {:?}", other),
        }
    }

    #[test]
    fn solution_without_rows_is_an_error() {
        assert!(build_one(&results(), &solution(99)).is_err());
    }
}
