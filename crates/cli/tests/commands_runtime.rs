use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use spectrum_cli::commands::{config, doctor, home, recommend, segment};
use spectrum_core::config::LoadOptions;
use tempfile::TempDir;

#[test]
fn home_renders_welcome_page() {
    let result = home::run();
    assert_eq!(result.exit_code, 0);
    assert!(result.output.starts_with("Shopper Spectrum"));
    assert!(result.output.contains("Navigate between: Home, Clustering, Recommendation"));
}

#[test]
fn recommend_returns_neighbors_for_exact_match() {
    let dir = TempDir::new().expect("tempdir");
    let vars = artifact_env(dir.path());
    with_env(&borrowed(&vars), || {
        let result = recommend::run(&LoadOptions::default(), "  widget a ", true);
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["page"], "recommendation");
        assert_eq!(payload["outcome"], "rendered");
        assert_eq!(payload["lines"][0], "Matched Product: Widget A");
        assert_eq!(payload["lines"][2], "1. Widget B");
        assert_eq!(payload["lines"][3], "2. Widget C");
    });
}

#[test]
fn recommend_reports_fuzzy_substitution_in_text_output() {
    let dir = TempDir::new().expect("tempdir");
    let vars = artifact_env(dir.path());
    with_env(&borrowed(&vars), || {
        let result = recommend::run(&LoadOptions::default(), "Widdget A", false);
        assert_eq!(result.exit_code, 0);
        assert!(result
            .output
            .contains("[info] No exact match found. Using closest match: Widget A (score: "));
        assert!(result.output.contains("1. Widget B"));
    });
}

#[test]
fn recommend_unknown_product_is_a_domain_warning() {
    let dir = TempDir::new().expect("tempdir");
    let vars = artifact_env(dir.path());
    with_env(&borrowed(&vars), || {
        let result = recommend::run(&LoadOptions::default(), "nonexistent product xyz", true);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["outcome"], "not_found");
        assert_eq!(payload["notices"][0]["level"], "warning");
        assert_eq!(
            payload["notices"][0]["message"],
            "No suitable match found in product descriptions."
        );
    });
}

#[test]
fn recommend_without_fuzzy_reports_product_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let mut vars = artifact_env(dir.path());
    vars.push(("SPECTRUM_RECOMMENDATION_FUZZY_ENABLED", "false".to_owned()));
    with_env(&borrowed(&vars), || {
        let result = recommend::run(&LoadOptions::default(), "Widdget A", true);
        assert_eq!(result.exit_code, 1);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["notices"][0]["message"], "Product name not found.");
    });
}

#[test]
fn segment_prints_predicted_label() {
    let dir = TempDir::new().expect("tempdir");
    let vars = artifact_env(dir.path());
    with_env(&borrowed(&vars), || {
        let result = segment::run(&LoadOptions::default(), 2.0, 48.0, 5100.0, false);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("This customer belongs to: High-Value Customer"));
    });
}

#[test]
fn segment_honours_configured_label_order() {
    let dir = TempDir::new().expect("tempdir");
    let mut vars = artifact_env(dir.path());
    vars.push((
        "SPECTRUM_SEGMENTS_LABELS",
        "At-Risk Customer,Regular Buyer,High-Value Customer,Occasional Shopper".to_owned(),
    ));
    with_env(&borrowed(&vars), || {
        let result = segment::run(&LoadOptions::default(), 1.0, 1.0, 1.0, true);
        assert_eq!(result.exit_code, 0);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["notices"][0]["message"], "This customer belongs to: At-Risk Customer");
    });
}

#[test]
fn segment_rejects_negative_values() {
    let dir = TempDir::new().expect("tempdir");
    let vars = artifact_env(dir.path());
    with_env(&borrowed(&vars), || {
        let result = segment::run(&LoadOptions::default(), -1.0, 1.0, 1.0, true);
        assert_eq!(result.exit_code, 1);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["outcome"], "invalid_input");
    });
}

#[test]
fn missing_artifact_is_an_artifact_failure() {
    let dir = TempDir::new().expect("tempdir");
    let mut vars = artifact_env(dir.path());
    vars.retain(|(key, _)| *key != "SPECTRUM_ARTIFACTS_SIMILARITY_PATH");
    vars.push((
        "SPECTRUM_ARTIFACTS_SIMILARITY_PATH",
        dir.path().join("absent.json").display().to_string(),
    ));
    with_env(&borrowed(&vars), || {
        let result = recommend::run(&LoadOptions::default(), "Widget A", true);
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "recommend");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "artifact_load");
    });
}

#[test]
fn invalid_config_is_a_config_failure() {
    with_env(&[("SPECTRUM_RECOMMENDATION_TOP_K", "0")], || {
        let result = segment::run(&LoadOptions::default(), 1.0, 1.0, 1.0, true);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "segment");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn config_attributes_env_sources() {
    with_env(&[("SPECTRUM_SERVER_PORT", "9100"), ("SPECTRUM_LOG_LEVEL", "debug")], || {
        let result = config::run(&LoadOptions::default());
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("- server.port = 9100 (source: env (SPECTRUM_SERVER_PORT))"));
        assert!(result.output.contains("- logging.level = debug (source: env (SPECTRUM_LOG_LEVEL))"));
        assert!(result.output.contains("- recommendation.top_k = 5 (source: default)"));
    });
}

#[test]
fn config_attributes_file_sources() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("spectrum.toml");
    fs::write(&path, "[recommendation]\ntop_k = 3\n").expect("write config");

    with_env(&[], || {
        let options = LoadOptions { config_path: Some(path.clone()), ..LoadOptions::default() };
        let result = config::run(&options);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains(&format!(
            "- recommendation.top_k = 3 (source: file ({}))",
            path.display()
        )));
    });
}

#[test]
fn doctor_passes_with_loadable_artifacts() {
    let dir = TempDir::new().expect("tempdir");
    let vars = artifact_env(dir.path());
    with_env(&borrowed(&vars), || {
        let result = doctor::run(&LoadOptions::default(), true);
        assert_eq!(result.exit_code, 0, "unexpected report: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        let mapping = payload["checks"]
            .as_array()
            .and_then(|checks| checks.iter().find(|check| check["name"] == "segment_label_mapping"))
            .expect("mapping check present");
        assert_eq!(
            mapping["details"],
            "in effect: 0=Regular Buyer, 1=At-Risk Customer, 2=High-Value Customer, 3=Occasional Shopper"
        );
    });
}

#[test]
fn doctor_flags_identity_key_mismatch() {
    let dir = TempDir::new().expect("tempdir");
    let mut vars = artifact_env(dir.path());
    vars.push(("SPECTRUM_RECOMMENDATION_IDENTITY_KEY", "stock_code".to_owned()));
    with_env(&borrowed(&vars), || {
        let result = doctor::run(&LoadOptions::default(), false);
        assert_eq!(result.exit_code, 3);
        assert!(result.output.contains("- [fail] catalog_coverage:"));
    });
}

#[test]
fn doctor_skips_artifact_checks_when_config_is_invalid() {
    with_env(&[("SPECTRUM_SERVER_PORT", "0")], || {
        let result = doctor::run(&LoadOptions::default(), false);
        assert_eq!(result.exit_code, 2);
        assert!(result.output.contains("- [fail] config_validation:"));
        assert!(result.output.contains("- [skip] catalog_artifact:"));
    });
}

/// Description-keyed artifacts for three widgets and a four-cluster model.
fn artifact_env(dir: &Path) -> Vec<(&'static str, String)> {
    let catalog = dir.join("online_retail.csv");
    let similarity = dir.join("product_similarity.json");
    let model = dir.join("rfm_kmeans_model.json");

    fs::write(
        &catalog,
        "InvoiceNo,StockCode,Description,Quantity\n\
         536365,W001,Widget A,6\n\
         536366,W002,Widget B,2\n\
         536367,W003,Widget C,1\n\
         536368,W001,Widget A,4\n",
    )
    .expect("write catalog");
    fs::write(
        &similarity,
        r#"{"labels":["Widget A","Widget B","Widget C"],
            "scores":[[1.0,0.9,0.4],[0.9,1.0,0.3],[0.4,0.3,1.0]]}"#,
    )
    .expect("write similarity");
    fs::write(
        &model,
        r#"{"scaler":{"mean":[0,0,0],"scale":[1,1,1]},
            "centroids":[[0,0,0],[120,1,30],[2,50,5000],[40,4,300]]}"#,
    )
    .expect("write model");

    vec![
        ("SPECTRUM_ARTIFACTS_CATALOG_PATH", catalog.display().to_string()),
        ("SPECTRUM_ARTIFACTS_CATALOG_ENCODING", "utf8".to_owned()),
        ("SPECTRUM_ARTIFACTS_SIMILARITY_PATH", similarity.display().to_string()),
        ("SPECTRUM_ARTIFACTS_SEGMENT_MODEL_PATH", model.display().to_string()),
    ]
}

fn borrowed<'a>(vars: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    vars.iter().map(|(key, value)| (*key, value.as_str())).collect()
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SPECTRUM_ARTIFACTS_CATALOG_PATH",
        "SPECTRUM_ARTIFACTS_CATALOG_ENCODING",
        "SPECTRUM_ARTIFACTS_SIMILARITY_PATH",
        "SPECTRUM_ARTIFACTS_SEGMENT_MODEL_PATH",
        "SPECTRUM_RECOMMENDATION_IDENTITY_KEY",
        "SPECTRUM_RECOMMENDATION_FUZZY_ENABLED",
        "SPECTRUM_RECOMMENDATION_FUZZY_THRESHOLD",
        "SPECTRUM_RECOMMENDATION_TOP_K",
        "SPECTRUM_SEGMENTS_LABELS",
        "SPECTRUM_SERVER_BIND_ADDRESS",
        "SPECTRUM_SERVER_PORT",
        "SPECTRUM_LOGGING_LEVEL",
        "SPECTRUM_LOGGING_FORMAT",
        "SPECTRUM_LOG_LEVEL",
        "SPECTRUM_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
