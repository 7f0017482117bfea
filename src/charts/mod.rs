//! Chart builders. Each one borrows the input frames, never mutates them, and
//! returns the figures to write; the viewer decides where and when.

pub mod attribute_levels;
pub mod convergence;
pub mod cross_plot;
pub mod risk_curve;

use std::path::{Path, PathBuf};

use crate::figure::Figure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    CrossPlot,
    RiskCurve,
    Histogram,
    Convergence,
}

impl ChartKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::CrossPlot => "cross plot",
            ChartKind::RiskCurve => "risk curve",
            ChartKind::Histogram => "attribute level",
            ChartKind::Convergence => "convergence",
        }
    }
}

/// A built figure and where it goes, relative to the charts directory.
#[derive(Debug, Clone)]
pub struct ChartFile {
    /// `best_sol_<rank>_id_<id>` for per-solution charts, `None` for charts
    /// written at the top of the charts directory.
    pub subdir: Option<String>,
    pub file_name: &'static str,
    pub width_px: u32,
    pub figure: Figure,
}

impl ChartFile {
    pub fn dir(&self, charts_dir: &Path) -> PathBuf {
        match &self.subdir {
            Some(sub) => charts_dir.join(sub),
            None => charts_dir.to_path_buf(),
        }
    }
}
