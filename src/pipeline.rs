//! One viewer run: validate the config, load every table it names, then
//! generate the requested charts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::charts::ChartKind;
use crate::config::{ConfigError, ViewerConfig};
use crate::data::selection::best_solutions;
use crate::data::{load_table, Frame};
use crate::logging::{obj, v_num, v_str, Domain, Level, Logger};
use crate::viewer::RmViewer;

/// What a run produced. Chart failures do not fail the run; they are listed
/// here and were already logged.
#[derive(Debug, Default)]
pub struct RunReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<ChartKind>,
}

/// Tables keyed by resolved path, each read once.
struct Tables(BTreeMap<PathBuf, Frame>);

impl Tables {
    fn load(cfg: &ViewerConfig, log: &Logger) -> Result<Self, ConfigError> {
        let mut tables = BTreeMap::new();
        for path in cfg.table_paths() {
            if tables.contains_key(path) {
                continue;
            }
            let (frame, manifest) = load_table(path).map_err(|e| ConfigError::Load {
                path: path.to_path_buf(),
                reason: format!("{:#}", e),
            })?;
            log.debug(
                Domain::Data,
                "table_loaded",
                obj(&[
                    ("path", v_str(&manifest.path)),
                    ("hash_sha256", v_str(&manifest.hash_sha256)),
                    ("rows", v_num(manifest.row_count as f64)),
                    ("columns", v_num(manifest.columns.len() as f64)),
                ]),
            );
            tables.insert(path.to_path_buf(), frame);
        }
        Ok(Self(tables))
    }

    fn get(&self, path: &Path) -> Result<&Frame, ConfigError> {
        self.0.get(path).ok_or_else(|| ConfigError::Load {
            path: path.to_path_buf(),
            reason: "table was not loaded".to_string(),
        })
    }
}

pub fn run(config_path: &Path, log: &Logger) -> Result<RunReport, ConfigError> {
    let cfg = ViewerConfig::load(config_path)?;
    log.info(
        Domain::Config,
        "config_loaded",
        &format!(
            "Loaded {} with {} solution(s)",
            config_path.display(),
            cfg.solutions.len()
        ),
    );
    run_config(&cfg, log)
}

/// Run an already validated config.
pub fn run_config(cfg: &ViewerConfig, log: &Logger) -> Result<RunReport, ConfigError> {
    let tables = Tables::load(cfg, log)?;
    let dataset = tables.get(&cfg.dataset)?;
    let results = tables.get(&cfg.solutions_results)?;

    let solutions =
        best_solutions(results, &cfg.solutions).map_err(|e| ConfigError::InvalidField {
            key: "solutions".to_string(),
            reason: format!("{:#}", e),
        })?;
    for s in &solutions {
        log.log(
            Level::Info,
            Domain::Data,
            "best_solution",
            obj(&[
                ("msg", v_str(&format!("Solution {} has {} RM(s)", s.solution_id, s.rms.len()))),
                ("rank", v_num(s.rank as f64)),
                ("dir", v_str(&s.dir_name())),
            ]),
        );
    }

    let charts_dir = cfg.charts_dir();
    let viewer = RmViewer::new(solutions, dataset, results, &charts_dir, log);
    let mut report = RunReport::default();
    let mut record = |kind: ChartKind, out: Option<Vec<PathBuf>>| match out {
        Some(paths) => report.written.extend(paths),
        None => report.failed.push(kind),
    };

    let plot = &cfg.plot;
    if let Some(c) = &plot.crossplot {
        let prob = tables.get(&c.prob_rms)?;
        record(
            ChartKind::CrossPlot,
            viewer.generate_crossplot(prob, &c.variable_list),
        );
    }
    if let Some(r) = &plot.risk_curve {
        let models = tables.get(&r.models_cumulative_prob)?;
        let rms = tables.get(&r.rms_cumulative_prob)?;
        record(
            ChartKind::RiskCurve,
            viewer.generate_risk_curve(models, rms, &r.variables, r.pairing),
        );
    }
    if let Some(h) = &plot.histogram {
        let attrs = tables.get(&h.results)?;
        record(ChartKind::Histogram, viewer.generate_histogram(attrs));
    }
    if let Some(c) = &plot.convergence {
        record(
            ChartKind::Convergence,
            viewer.generate_convergence_chart(&c.of_name).map(|p| vec![p]),
        );
    }

    log.info(
        Domain::System,
        "run_done",
        &format!(
            "{} chart file(s) written, {} chart kind(s) failed",
            report.written.len(),
            report.failed.len()
        ),
    );
    Ok(report)
}
