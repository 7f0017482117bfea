//! Viewer facade: one entry point per chart kind, each isolated from the
//! others. A failing chart is logged and skipped; the rest still run.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::charts::cross_plot::VariablePair;
use crate::charts::risk_curve::{Pairing, RiskInputs};
use crate::charts::{attribute_levels, convergence, cross_plot, risk_curve, ChartFile, ChartKind};
use crate::data::selection::BestSolution;
use crate::data::Frame;
use crate::logging::{obj, v_num, v_str, Domain, Level, Logger};
use crate::render::write_chart;

/// Run `f`, and on error log `Error generating <chart> chart: <cause>` and
/// return `None`.
pub fn guarded<T>(log: &Logger, kind: ChartKind, f: impl FnOnce() -> Result<T>) -> Option<T> {
    match f() {
        Ok(v) => Some(v),
        Err(err) => {
            log.log(
                Level::Error,
                Domain::Chart,
                "chart_failed",
                obj(&[
                    (
                        "msg",
                        v_str(&format!("Error generating {} chart: {:#}", kind.label(), err)),
                    ),
                    ("chart", v_str(kind.label())),
                ]),
            );
            None
        }
    }
}

pub struct RmViewer<'a> {
    solutions: Vec<BestSolution>,
    dataset: &'a Frame,
    solutions_results: &'a Frame,
    charts_dir: PathBuf,
    log: &'a Logger,
}

impl<'a> RmViewer<'a> {
    pub fn new(
        solutions: Vec<BestSolution>,
        dataset: &'a Frame,
        solutions_results: &'a Frame,
        charts_dir: &Path,
        log: &'a Logger,
    ) -> Self {
        Self {
            solutions,
            dataset,
            solutions_results,
            charts_dir: charts_dir.to_path_buf(),
            log,
        }
    }

    pub fn generate_crossplot(
        &self,
        prob_rms: &Frame,
        variable_list: &[VariablePair],
    ) -> Option<Vec<PathBuf>> {
        self.run(ChartKind::CrossPlot, || {
            cross_plot::build(self.dataset, prob_rms, &self.solutions, variable_list)
        })
    }

    pub fn generate_risk_curve(
        &self,
        models_cumulative_prob: &Frame,
        rms_cumulative_prob: &Frame,
        variables: &[String],
        pairing: Pairing,
    ) -> Option<Vec<PathBuf>> {
        let inputs = RiskInputs {
            dataset: self.dataset,
            models_cumulative_prob,
            rms_cumulative_prob,
            pairing,
        };
        self.run(ChartKind::RiskCurve, || {
            risk_curve::build(&inputs, &self.solutions, variables)
        })
    }

    pub fn generate_histogram(&self, attribute_results: &Frame) -> Option<Vec<PathBuf>> {
        self.run(ChartKind::Histogram, || {
            attribute_levels::build(attribute_results, &self.solutions)
        })
    }

    pub fn generate_convergence_chart(&self, of_name: &str) -> Option<PathBuf> {
        self.run(ChartKind::Convergence, || {
            convergence::build(self.solutions_results, of_name).map(|c| vec![c])
        })
        .and_then(|paths| paths.into_iter().next())
    }

    /// Build every figure first, then write them. Nothing is written when
    /// any figure of this kind fails to build.
    fn run(
        &self,
        kind: ChartKind,
        build: impl FnOnce() -> Result<Vec<ChartFile>>,
    ) -> Option<Vec<PathBuf>> {
        let _scope = self.log.scope(Domain::Chart, kind.label());
        guarded(self.log, kind, || {
            let charts = build()?;
            let mut written = Vec::with_capacity(charts.len());
            for chart in &charts {
                let dir = chart.dir(&self.charts_dir);
                let path = write_chart(&dir, chart.file_name, &chart.figure, chart.width_px)?;
                self.log.debug(
                    Domain::Render,
                    "chart_written",
                    obj(&[
                        ("path", v_str(&path.display().to_string())),
                        ("traces", v_num(chart.figure.data.len() as f64)),
                    ]),
                );
                written.push(path);
            }
            self.log.info(
                Domain::Chart,
                "chart_done",
                &format!(
                    "Generated {} chart: {} file(s) under {}",
                    kind.label(),
                    written.len(),
                    self.charts_dir.display()
                ),
            );
            Ok(written)
        })
    }
}
