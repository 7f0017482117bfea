use rmviewer::charts::ChartKind;
use rmviewer::config::ConfigError;
use rmviewer::logging::{Level, Logger};
use rmviewer::pipeline;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn write_csv(path: &Path, header: &[&str], rows: &[&str]) {
    let mut out = String::new();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(path, out).unwrap();
}

fn write_config(dir: &Path, config: &Value) -> PathBuf {
    let path = dir.join("view.json");
    fs::write(&path, serde_json::to_string_pretty(config).unwrap()).unwrap();
    path
}

/// Project with every table the viewer can use.
fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let p = dir.path();
    write_csv(
        &p.join("dataset.csv"),
        &["ID", "NPV", "WP", "NP"],
        &["1,100,5,10", "2,200,6,20", "3,150,7,30", "4,120,8,40"],
    );
    write_csv(
        &p.join("solutions.csv"),
        &["solution_id", "RM1", "RM2", "of_value"],
        &["1,1,3,10", "2,2,4,8", "3,1,4,9", "4,3,4,5"],
    );
    write_csv(
        &p.join("prob_rms.csv"),
        &["solution_id", "ID", "probability"],
        &["2,2,0.4", "2,4,0.6", "4,3,0.5", "4,4,0.5"],
    );
    write_csv(
        &p.join("models_cum.csv"),
        &["ID", "NPV", "WP"],
        &["1,0.25,0.5", "2,1.0,1.0", "3,0.5,0.75", "4,0.75,0.25"],
    );
    write_csv(
        &p.join("rms_cum.csv"),
        &["solution_id", "NPV", "WP"],
        &["2,0.8,0.7", "2,0.3,0.2", "4,0.9,0.6", "4,0.4,0.1"],
    );
    write_csv(
        &p.join("attributes.csv"),
        &[
            "SOLUTION_ID",
            "Variable",
            "MODEL_FREQUENCY_1",
            "MODEL_FREQUENCY_2",
            "RMS_FREQUENCY_1",
            "RMS_FREQUENCY_2",
        ],
        &[
            "2,PERM,0.4,0.6,0.5,0.5",
            "2,PORO,0.3,0.7,0.0,1.0",
            "4,PERM,0.4,0.6,1.0,0.0",
        ],
    );
    dir
}

fn base_config(project: &Path) -> Value {
    json!({
        "project_path": project.to_str().unwrap(),
        "solutions": [2, 4],
        "dataset": "dataset.csv",
        "solutions_results": "solutions.csv",
        "plot": {}
    })
}

#[test]
fn convergence_only_run_writes_centered_html() {
    let dir = project();
    let mut cfg = base_config(dir.path());
    cfg["plot"] = json!({"convergence": {"of_name": "of_value"}});
    let cfg_path = write_config(dir.path(), &cfg);

    let (log, buf) = Logger::in_memory(Level::Info);
    let report = pipeline::run(&cfg_path, &log).unwrap();
    assert!(report.failed.is_empty());

    let out = dir.path().join("charts").join("solutions_convergence.html");
    assert_eq!(report.written, vec![out.clone()]);
    let html = fs::read_to_string(&out).unwrap();
    assert!(html.contains("<html>"));
    assert!(html.contains("chart-container"));
    assert!(html.contains("<svg"));
    assert!(!html.contains("<script src=\"http"));
    assert!(html.contains("Convergence of the Optimization Method"));
    assert_eq!(buf.messages_containing("Generated convergence chart").len(), 1);
}

#[test]
fn missing_dataset_key_fails_before_any_output() {
    let dir = project();
    let mut cfg = base_config(dir.path());
    cfg.as_object_mut().unwrap().remove("dataset");
    cfg["plot"] = json!({"convergence": {}});
    let cfg_path = write_config(dir.path(), &cfg);

    let (log, _buf) = Logger::in_memory(Level::Info);
    match pipeline::run(&cfg_path, &log) {
        Err(ConfigError::MissingKey(key)) => assert_eq!(key, "dataset"),
        other => panic!("expected missing dataset, got {:?}", other),
    }
    assert!(!dir.path().join("charts").exists());
}

#[test]
fn unknown_solution_is_fatal() {
    let dir = project();
    let mut cfg = base_config(dir.path());
    cfg["solutions"] = json!([2, 99]);
    cfg["plot"] = json!({"convergence": {}});
    let cfg_path = write_config(dir.path(), &cfg);

    let (log, _buf) = Logger::in_memory(Level::Info);
    assert!(matches!(
        pipeline::run(&cfg_path, &log),
        Err(ConfigError::InvalidField { .. })
    ));
    assert!(!dir.path().join("charts").exists());
}

#[test]
fn full_run_writes_every_chart() {
    let dir = project();
    let mut cfg = base_config(dir.path());
    cfg["plot"] = json!({
        "crossplot": {"variable_list": [["NPV", "WP"], ["NP", "WP"]], "prob_rms": "prob_rms.csv"},
        "risk_curve": {
            "models_cumulative_prob": "models_cum.csv",
            "rms_cumulative_prob": "rms_cum.csv",
            "variables": ["NPV", "WP"]
        },
        "histogram": {"results": "attributes.csv"},
        "convergence": {}
    });
    let cfg_path = write_config(dir.path(), &cfg);

    let (log, _buf) = Logger::in_memory(Level::Info);
    let report = pipeline::run(&cfg_path, &log).unwrap();
    assert!(report.failed.is_empty(), "failed: {:?}", report.failed);
    assert_eq!(report.written.len(), 7);

    let charts = dir.path().join("charts");
    for sub in ["best_sol_1_id_2", "best_sol_2_id_4"] {
        for file in ["cross_plot.html", "risk_curve.html", "attribute_levels.html"] {
            let path = charts.join(sub).join(file);
            assert!(path.exists(), "missing {}", path.display());
        }
    }
    let risk = fs::read_to_string(charts.join("best_sol_1_id_2").join("risk_curve.html")).unwrap();
    assert!(risk.contains("RMs curve"));
    assert!(charts.join("solutions_convergence.html").exists());
}

#[test]
fn one_broken_chart_leaves_the_others() {
    let dir = project();
    let mut cfg = base_config(dir.path());
    cfg["plot"] = json!({
        "crossplot": {"variable_list": ["NPV", "MISSING"], "prob_rms": "prob_rms.csv"},
        "convergence": {}
    });
    let cfg_path = write_config(dir.path(), &cfg);

    let (log, buf) = Logger::in_memory(Level::Info);
    let report = pipeline::run(&cfg_path, &log).unwrap();
    assert_eq!(report.failed, vec![ChartKind::CrossPlot]);
    assert_eq!(buf.messages_containing("Error generating cross plot chart").len(), 1);
    assert!(dir
        .path()
        .join("charts")
        .join("solutions_convergence.html")
        .exists());
}

#[test]
fn binary_exits_non_zero_on_bad_config() {
    let dir = project();
    let mut cfg = base_config(dir.path());
    cfg["solutions"] = json!([]);
    let cfg_path = write_config(dir.path(), &cfg);

    let out = Command::new(env!("CARGO_BIN_EXE_rmviewer"))
        .arg("--config_view")
        .arg(&cfg_path)
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("ERROR - No solutions provided"));

    let missing = Command::new(env!("CARGO_BIN_EXE_rmviewer"))
        .arg("--config_view")
        .arg(dir.path().join("nope.json"))
        .output()
        .unwrap();
    assert_eq!(missing.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&missing.stderr).contains("Config file not found"));
}
