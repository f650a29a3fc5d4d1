use serde::Serialize;
use spectrum_core::app::catalog_coverage;
use spectrum_core::artifacts;
use spectrum_core::catalog::Catalog;
use spectrum_core::config::{AppConfig, LoadOptions};
use spectrum_core::segment::KMeansClassifier;
use spectrum_core::similarity::{SimilarityMatrix, SimilaritySource};

use crate::commands::{CommandResult, EXIT_ARTIFACT_FAILURE, EXIT_CONFIG_FAILURE, EXIT_OK};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const ARTIFACT_CHECKS: [&str; 4] =
    ["catalog_artifact", "similarity_artifact", "segment_model_artifact", "catalog_coverage"];

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let (report, config_loaded) = build_report(options);
    let exit_code = match (report.overall_status, config_loaded) {
        (CheckStatus::Pass, _) => EXIT_OK,
        (_, false) => EXIT_CONFIG_FAILURE,
        (_, true) => EXIT_ARTIFACT_FAILURE,
    };

    if !json_output {
        return CommandResult { exit_code, output: render_human(&report) };
    }

    let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
        format!(
            "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
            escape_json(&error.to_string())
        )
    });
    CommandResult { exit_code, output }
}

fn build_report(options: &LoadOptions) -> (DoctorReport, bool) {
    let mut checks = Vec::new();

    let config_loaded = match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.extend(check_artifacts(&config));
            checks.push(check_label_mapping(&config));
            true
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.extend(
                ARTIFACT_CHECKS
                    .into_iter()
                    .map(|name| DoctorCheck::skipped(name, "configuration did not load")),
            );
            checks.push(DoctorCheck::skipped("segment_label_mapping", "configuration did not load"));
            false
        }
    };

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    (DoctorReport { overall_status, summary, checks }, config_loaded)
}

fn check_artifacts(config: &AppConfig) -> Vec<DoctorCheck> {
    let paths = &config.artifacts;
    let mut checks = Vec::with_capacity(ARTIFACT_CHECKS.len());

    let catalog = match artifacts::load_catalog(&paths.catalog_path, paths.catalog_encoding) {
        Ok(records) => {
            let catalog = Catalog::new(records, config.recommendation.identity_key);
            checks.push(DoctorCheck::pass(
                "catalog_artifact",
                format!(
                    "{} products ({} distinct descriptions) from `{}`",
                    catalog.len(),
                    catalog.distinct_descriptions().len(),
                    paths.catalog_path.display()
                ),
            ));
            Some(catalog)
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("catalog_artifact", error.to_string()));
            None
        }
    };

    let similarity: Option<SimilarityMatrix> =
        match artifacts::load_similarity(&paths.similarity_path) {
            Ok(matrix) => {
                checks.push(DoctorCheck::pass(
                    "similarity_artifact",
                    format!("{} labelled rows from `{}`", matrix.len(), paths.similarity_path.display()),
                ));
                Some(matrix)
            }
            Err(error) => {
                checks.push(DoctorCheck::fail("similarity_artifact", error.to_string()));
                None
            }
        };

    checks.push(check_segment_model(config));

    checks.push(match (catalog, similarity) {
        (Some(catalog), Some(similarity)) => check_coverage(config, &catalog, &similarity),
        _ => DoctorCheck::skipped("catalog_coverage", "an artifact did not load"),
    });

    checks
}

fn check_segment_model(config: &AppConfig) -> DoctorCheck {
    let path = &config.artifacts.segment_model_path;
    match artifacts::load_segment_model(path) {
        Ok(model) => DoctorCheck::pass(
            "segment_model_artifact",
            model_details(&model, &path.display().to_string()),
        ),
        Err(error) => DoctorCheck::fail("segment_model_artifact", error.to_string()),
    }
}

fn model_details(model: &KMeansClassifier, path: &str) -> String {
    let clusters = model.cluster_count();
    let labelled = clusters.min(4);
    if clusters > labelled {
        format!("{clusters} clusters from `{path}`; clusters {labelled}.. will be labelled Unknown")
    } else {
        format!("{clusters} clusters from `{path}`")
    }
}

fn check_coverage(
    config: &AppConfig,
    catalog: &Catalog,
    similarity: &SimilarityMatrix,
) -> DoctorCheck {
    let coverage = catalog_coverage(catalog, similarity);
    let key = config.recommendation.identity_key;

    if coverage.is_disjoint() {
        return DoctorCheck::fail(
            "catalog_coverage",
            format!("no similarity label matches a catalog {key:?}; check recommendation.identity_key"),
        );
    }

    DoctorCheck::pass(
        "catalog_coverage",
        format!(
            "{} of {} catalog identities have no similarity row (keyed by {key:?})",
            coverage.missing, coverage.identities
        ),
    )
}

fn check_label_mapping(config: &AppConfig) -> DoctorCheck {
    let labels = config.segment_labels();
    let mapping = labels
        .segments()
        .iter()
        .enumerate()
        .map(|(cluster, segment)| format!("{cluster}={}", segment.label()))
        .collect::<Vec<_>>()
        .join(", ");
    DoctorCheck::pass("segment_label_mapping", format!("in effect: {mapping}"))
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
