use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use spectrum_core::similarity::SimilaritySource;
use spectrum_core::App;

#[derive(Clone)]
pub struct HealthState {
    app: Arc<App>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub catalog: HealthCheck,
    pub similarity: HealthCheck,
    pub segment_model: HealthCheck,
}

pub fn router(app: Arc<App>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { app })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let recommender = state.app.recommender();
    let catalog = count_check(recommender.catalog().len(), "catalog products");
    let similarity = count_check(recommender.similarity().len(), "similarity rows");
    let segment_model =
        count_check(state.app.segments().classifier().cluster_count(), "segment clusters");

    let ready = [&catalog, &similarity, &segment_model].iter().all(|check| check.status == "ready");
    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        catalog,
        similarity,
        segment_model,
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn count_check(count: usize, noun: &str) -> HealthCheck {
    if count == 0 {
        HealthCheck { status: "degraded", detail: format!("no {noun} loaded") }
    } else {
        HealthCheck { status: "ready", detail: format!("{count} {noun} loaded") }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use spectrum_core::catalog::Catalog;
    use spectrum_core::recommend::Recommender;
    use spectrum_core::segment::{KMeansClassifier, SegmentLabels, SegmentService, StandardScaler};
    use spectrum_core::similarity::SimilarityMatrix;
    use spectrum_core::{App, IdentityKey, ProductRecord};

    use crate::health::{health, HealthState};

    fn app(records: Vec<ProductRecord>) -> Arc<App> {
        let matrix = SimilarityMatrix::new(vec!["Widget A".to_owned()], vec![vec![1.0]])
            .expect("valid matrix");
        let model = KMeansClassifier::new(StandardScaler::identity(), vec![vec![0.0, 0.0, 0.0]])
            .expect("valid model");
        Arc::new(App::new(
            Recommender::new(Catalog::new(records, IdentityKey::Description), matrix),
            SegmentService::new(model, SegmentLabels::default()),
        ))
    }

    #[tokio::test]
    async fn health_returns_ready_when_every_artifact_has_content() {
        let state = HealthState { app: app(vec![ProductRecord::new("Widget A", "W001")]) };

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.catalog.detail, "1 catalog products loaded");
        assert_eq!(payload.segment_model.status, "ready");
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_for_empty_catalog() {
        let state = HealthState { app: app(Vec::new()) };

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.catalog.status, "degraded");
        assert_eq!(payload.similarity.status, "ready");
    }
}
