use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const CONFIG: &str = r#"
[predictand]
name = "flow"

[[predictors]]
name = "swe"

[[predictors]]
name = "precip"

[training]
start_year = 2000
end_year = 2011

[[regressors]]
regression = "ols"
cross_validation = { type = "k_fold", k = 4 }
feature_selection = "exhaustive"
scoring = "r2"

[settings]
n_bootstraps = 40
seed = 11
"#;

fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let config = dir.join("Flowcast.toml");
    std::fs::write(&config, CONFIG).expect("write config");

    let mut csv = String::from("year,swe,precip,flow\n");
    for year in 2000..=2013 {
        let swe = f64::from((year * 5) % 9) + 1.0;
        let precip = f64::from((year * 3) % 7) + 2.0;
        let flow = if year <= 2011 {
            format!("{}", 2.0 * swe + 0.5 * precip + f64::from(year % 2) * 0.1)
        } else {
            String::new()
        };
        csv.push_str(&format!("{year},{swe},{precip},{flow}\n"));
    }
    let data = dir.join("data.csv");
    std::fs::write(&data, csv).expect("write data");
    (config, data)
}

fn flowcast(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flowcast"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("flowcast runs")
}

#[test]
fn validate_accepts_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (config, _) = write_inputs(dir.path());

    let output = flowcast(&["validate", "--config", config.to_str().expect("utf8")]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Predictors: 2"));
}

#[test]
fn search_writes_ranked_candidates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (config, data) = write_inputs(dir.path());
    let json_path = dir.path().join("candidates.json");

    let output = flowcast(&[
        "search",
        "--config",
        config.to_str().expect("utf8"),
        "--data",
        data.to_str().expect("utf8"),
        "--output",
        json_path.to_str().expect("utf8"),
        "--top",
        "3",
    ]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).expect("json written"))
            .expect("valid json");
    assert_eq!(report["summary"]["evaluated"], 4);
    let candidates = report["candidates"].as_array().expect("array");
    assert_eq!(candidates.len(), 3);
    assert_eq!(candidates[0]["predictors"], serde_json::json!(["swe", "precip"]));
}

#[test]
fn forecast_prints_requested_years() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (config, data) = write_inputs(dir.path());

    let output = flowcast(&[
        "forecast",
        "--config",
        config.to_str().expect("utf8"),
        "--data",
        data.to_str().expect("utf8"),
        "--predictors",
        "swe,precip",
        "--years",
        "2012-2013,2020",
    ]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2012"));
    assert!(stdout.contains("2013"));
    assert!(stdout.contains("2020 skipped"));
}

#[test]
fn missing_dataset_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (config, _) = write_inputs(dir.path());

    let output = flowcast(&[
        "search",
        "--config",
        config.to_str().expect("utf8"),
        "--data",
        "no-such-file.csv",
    ]);

    assert!(!output.status.success());
}
