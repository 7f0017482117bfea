//! Viewer configuration: the JSON file named by `--config_view`.
//!
//! Everything here is pre-flight. Any problem is a `ConfigError`, and the
//! binary turns it into an `ERROR - ...` line and a non-zero exit before a
//! single chart is written.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::charts::convergence::DEFAULT_OF_NAME;
use crate::charts::cross_plot::VariablePair;
use crate::charts::risk_curve::Pairing;

pub const REQUIRED_KEYS: [&str; 5] = [
    "project_path",
    "solutions",
    "dataset",
    "solutions_results",
    "plot",
];
pub const CHARTS_DIR: &str = "charts";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid configuration: the top level must be a JSON object")]
    NotAnObject,
    #[error("Invalid configuration: Missing required key '{0}'")]
    MissingKey(String),
    #[error("Invalid configuration: 'solutions' must be a list of integers, got {0}")]
    InvalidSolutions(String),
    #[error("No solutions provided in the configuration.")]
    EmptySolutions,
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("{path}: expected a .{expected} file")]
    WrongExtension { path: PathBuf, expected: &'static str },
    #[error("Invalid configuration: malformed 'variable_list': {0}")]
    MalformedVariableList(String),
    #[error("Invalid configuration: '{key}': {reason}")]
    InvalidField { key: String, reason: String },
    #[error("cannot load {path}: {reason}")]
    Load { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossPlotConfig {
    pub variable_list: Vec<VariablePair>,
    pub prob_rms: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskCurveConfig {
    pub models_cumulative_prob: PathBuf,
    pub rms_cumulative_prob: PathBuf,
    pub variables: Vec<String>,
    pub pairing: Pairing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramConfig {
    pub results: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceConfig {
    pub of_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotConfig {
    pub crossplot: Option<CrossPlotConfig>,
    pub risk_curve: Option<RiskCurveConfig>,
    pub histogram: Option<HistogramConfig>,
    pub convergence: Option<ConvergenceConfig>,
}

/// Validated configuration. Table paths are already resolved against
/// `project_path`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub project_path: PathBuf,
    pub solutions: Vec<i64>,
    pub dataset: PathBuf,
    pub solutions_results: PathBuf,
    pub plot: PlotConfig,
}

#[derive(Deserialize)]
struct RawCrossPlot {
    variable_list: Value,
    prob_rms: String,
}

#[derive(Deserialize)]
struct RawRiskCurve {
    models_cumulative_prob: String,
    rms_cumulative_prob: String,
    variables: Vec<String>,
    #[serde(default)]
    pairing: Pairing,
}

#[derive(Deserialize)]
struct RawHistogram {
    results: String,
}

#[derive(Deserialize, Default)]
struct RawConvergence {
    of_name: Option<String>,
}

impl ViewerConfig {
    /// Read, parse and fully validate a config file, including the existence
    /// and extension of every table it references.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        check_extension(path, "json")?;
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_value(&value)?;
        cfg.validate_files()?;
        Ok(cfg)
    }

    /// Structural validation only; no filesystem access.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let root = value.as_object().ok_or(ConfigError::NotAnObject)?;
        for key in REQUIRED_KEYS {
            if !root.contains_key(key) {
                return Err(ConfigError::MissingKey(key.to_string()));
            }
        }

        let project_path = PathBuf::from(string_field(root, "project_path")?);
        let solutions = parse_solutions(&root["solutions"])?;
        let dataset = project_path.join(string_field(root, "dataset")?);
        let solutions_results = project_path.join(string_field(root, "solutions_results")?);
        let plot = parse_plot(&root["plot"], &project_path)?;

        Ok(Self {
            project_path,
            solutions,
            dataset,
            solutions_results,
            plot,
        })
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.project_path.join(CHARTS_DIR)
    }

    /// Every table path the config refers to.
    pub fn table_paths(&self) -> Vec<&Path> {
        let mut paths = vec![self.dataset.as_path(), self.solutions_results.as_path()];
        if let Some(c) = &self.plot.crossplot {
            paths.push(&c.prob_rms);
        }
        if let Some(r) = &self.plot.risk_curve {
            paths.push(&r.models_cumulative_prob);
            paths.push(&r.rms_cumulative_prob);
        }
        if let Some(h) = &self.plot.histogram {
            paths.push(&h.results);
        }
        paths
    }

    pub fn validate_files(&self) -> Result<(), ConfigError> {
        for path in self.table_paths() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            check_extension(path, "csv")?;
        }
        Ok(())
    }
}

fn check_extension(path: &Path, expected: &'static str) -> Result<(), ConfigError> {
    let ok = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(expected))
        .unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err(ConfigError::WrongExtension {
            path: path.to_path_buf(),
            expected,
        })
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Result<String, ConfigError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ConfigError::InvalidField {
            key: key.to_string(),
            reason: format!("expected a string, got {}", other),
        }),
        None => Err(ConfigError::MissingKey(key.to_string())),
    }
}

fn parse_solutions(value: &Value) -> Result<Vec<i64>, ConfigError> {
    let items = value
        .as_array()
        .ok_or_else(|| ConfigError::InvalidSolutions(value.to_string()))?;
    if items.is_empty() {
        return Err(ConfigError::EmptySolutions);
    }
    items
        .iter()
        .map(|v| v.as_i64().ok_or_else(|| ConfigError::InvalidSolutions(v.to_string())))
        .collect()
}

/// Accepts `[[x, y], ...]` or a single `[x, y]`, which is wrapped.
pub fn parse_variable_list(value: &Value) -> Result<Vec<VariablePair>, ConfigError> {
    let malformed = || ConfigError::MalformedVariableList(value.to_string());
    let items = value.as_array().ok_or_else(malformed)?;
    if items.is_empty() {
        return Err(malformed());
    }

    let pair_of = |v: &Value| -> Option<VariablePair> {
        match v.as_array()?.as_slice() {
            [Value::String(x), Value::String(y)] => Some(VariablePair::new(x, y)),
            _ => None,
        }
    };

    if items.iter().all(Value::is_string) {
        return pair_of(value).map(|p| vec![p]).ok_or_else(malformed);
    }
    items
        .iter()
        .map(|v| pair_of(v).ok_or_else(malformed))
        .collect()
}

fn sub_config<T: for<'de> Deserialize<'de>>(
    plot: &Map<String, Value>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match plot.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| ConfigError::InvalidField {
                key: format!("plot.{}", key),
                reason: e.to_string(),
            }),
    }
}

fn parse_plot(value: &Value, project: &Path) -> Result<PlotConfig, ConfigError> {
    let plot = value.as_object().ok_or_else(|| ConfigError::InvalidField {
        key: "plot".to_string(),
        reason: format!("expected an object, got {}", value),
    })?;

    let crossplot = match sub_config::<RawCrossPlot>(plot, "crossplot")? {
        Some(raw) => Some(CrossPlotConfig {
            variable_list: parse_variable_list(&raw.variable_list)?,
            prob_rms: project.join(raw.prob_rms),
        }),
        None => None,
    };

    let risk_curve = match sub_config::<RawRiskCurve>(plot, "risk_curve")? {
        Some(raw) => {
            if raw.variables.is_empty() {
                return Err(ConfigError::InvalidField {
                    key: "plot.risk_curve.variables".to_string(),
                    reason: "at least one variable is required".to_string(),
                });
            }
            Some(RiskCurveConfig {
                models_cumulative_prob: project.join(raw.models_cumulative_prob),
                rms_cumulative_prob: project.join(raw.rms_cumulative_prob),
                variables: raw.variables,
                pairing: raw.pairing,
            })
        }
        None => None,
    };

    let histogram = sub_config::<RawHistogram>(plot, "histogram")?.map(|raw| HistogramConfig {
        results: project.join(raw.results),
    });

    let convergence =
        sub_config::<RawConvergence>(plot, "convergence")?.map(|raw| ConvergenceConfig {
            of_name: raw.of_name.unwrap_or_else(|| DEFAULT_OF_NAME.to_string()),
        });

    Ok(PlotConfig {
        crossplot,
        risk_curve,
        histogram,
        convergence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Value {
        json!({
            "project_path": "/proj",
            "solutions": [4962, 17],
            "dataset": "dataset.csv",
            "solutions_results": "solutions.csv",
            "plot": {}
        })
    }

    #[test]
    fn resolves_paths_against_project() {
        let cfg = ViewerConfig::from_value(&base()).unwrap();
        assert_eq!(cfg.solutions, vec![4962, 17]);
        assert_eq!(cfg.dataset, PathBuf::from("/proj/dataset.csv"));
        assert_eq!(cfg.charts_dir(), PathBuf::from("/proj/charts"));
        assert_eq!(cfg.plot, PlotConfig::default());
    }

    #[test]
    fn each_required_key_is_checked() {
        for key in REQUIRED_KEYS {
            let mut v = base();
            v.as_object_mut().unwrap().remove(key);
            match ViewerConfig::from_value(&v) {
                Err(ConfigError::MissingKey(k)) => assert_eq!(k, key),
                other => panic!("expected missing {}, got {:?}", key, other),
            }
        }
    }

    #[test]
    fn solutions_must_be_non_empty_integers() {
        let mut v = base();
        v["solutions"] = json!([1, "two"]);
        assert!(matches!(
            ViewerConfig::from_value(&v),
            Err(ConfigError::InvalidSolutions(_))
        ));
        v["solutions"] = json!([1.5]);
        assert!(matches!(
            ViewerConfig::from_value(&v),
            Err(ConfigError::InvalidSolutions(_))
        ));
        v["solutions"] = json!([]);
        assert!(matches!(
            ViewerConfig::from_value(&v),
            Err(ConfigError::EmptySolutions)
        ));
    }

    #[test]
    fn single_variable_pair_is_wrapped() {
        let pairs = parse_variable_list(&json!(["NPV", "WP"])).unwrap();
        assert_eq!(pairs, vec![VariablePair::new("NPV", "WP")]);
        let pairs = parse_variable_list(&json!([["NPV", "WP"], ["NP", "WP"]])).unwrap();
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn malformed_variable_lists_are_rejected() {
        for bad in [
            json!([]),
            json!("NPV"),
            json!(["NPV"]),
            json!(["NPV", "WP", "NP"]),
            json!([["NPV", "WP"], ["NP"]]),
            json!([["NPV", 3]]),
        ] {
            assert!(
                matches!(
                    parse_variable_list(&bad),
                    Err(ConfigError::MalformedVariableList(_))
                ),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn plot_sections_parse_with_defaults() {
        let mut v = base();
        v["plot"] = json!({
            "crossplot": {"variable_list": ["NPV", "WP"], "prob_rms": "prob.csv"},
            "risk_curve": {
                "models_cumulative_prob": "cum.csv",
                "rms_cumulative_prob": "rms_cum.csv",
                "variables": ["NPV", "NP"]
            },
            "histogram": {"results": "attr.csv"},
            "convergence": {}
        });
        let cfg = ViewerConfig::from_value(&v).unwrap();
        let risk = cfg.plot.risk_curve.as_ref().unwrap();
        assert_eq!(risk.pairing, Pairing::Positional);
        assert_eq!(risk.rms_cumulative_prob, PathBuf::from("/proj/rms_cum.csv"));
        assert_eq!(cfg.plot.convergence.as_ref().unwrap().of_name, DEFAULT_OF_NAME);
        assert_eq!(cfg.table_paths().len(), 6);
    }

    #[test]
    fn joint_pairing_and_bad_sections() {
        let mut v = base();
        v["plot"] = json!({"risk_curve": {
            "models_cumulative_prob": "a.csv",
            "rms_cumulative_prob": "b.csv",
            "variables": ["NPV"],
            "pairing": "joint"
        }});
        let cfg = ViewerConfig::from_value(&v).unwrap();
        assert_eq!(cfg.plot.risk_curve.unwrap().pairing, Pairing::Joint);

        v["plot"] = json!({"histogram": {}});
        assert!(matches!(
            ViewerConfig::from_value(&v),
            Err(ConfigError::InvalidField { .. })
        ));
    }

    #[test]
    fn load_checks_files_and_extensions() {
        let dir = tempfile::TempDir::new().unwrap();
        let project = dir.path();
        fs::write(project.join("dataset.csv"), "ID,NPV\n0,1\n").unwrap();
        fs::write(project.join("solutions.txt"), "solution_id\n1\n").unwrap();

        let mut v = base();
        v["project_path"] = json!(project.to_str().unwrap());
        let cfg_path = project.join("view.json");
        fs::write(&cfg_path, v.to_string()).unwrap();
        assert!(matches!(
            ViewerConfig::load(&cfg_path),
            Err(ConfigError::FileNotFound(_))
        ));

        v["solutions_results"] = json!("solutions.txt");
        fs::write(&cfg_path, v.to_string()).unwrap();
        assert!(matches!(
            ViewerConfig::load(&cfg_path),
            Err(ConfigError::WrongExtension { expected: "csv", .. })
        ));

        assert!(matches!(
            ViewerConfig::load(&project.join("absent.json")),
            Err(ConfigError::NotFound(_))
        ));
    }
}
