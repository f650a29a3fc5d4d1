//! One route per page. Each handler dispatches into the shared [`App`] and
//! returns the rendered [`PageView`] as JSON, tagged with a correlation id.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use spectrum_core::errors::{ApplicationError, InterfaceError};
use spectrum_core::pages::{dispatch, Outcome, PageRequest, PageView};
use spectrum_core::App;
use tracing::{info, warn};
use uuid::Uuid;

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct PageState {
    app: Arc<App>,
}

#[derive(Debug, Deserialize)]
pub struct ClusteringRequest {
    pub recency: f64,
    pub frequency: f64,
    pub monetary: f64,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub product: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub enum PageResponse {
    View { status: StatusCode, correlation_id: String, view: PageView },
    Rejected { status: StatusCode, error: InterfaceError },
}

impl PageResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::View { status, .. } | Self::Rejected { status, .. } => *status,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::View { correlation_id, .. } => correlation_id,
            Self::Rejected { error, .. } => error.correlation_id(),
        }
    }
}

impl IntoResponse for PageResponse {
    fn into_response(self) -> Response {
        let correlation_id = self.correlation_id().to_owned();
        let headers = [(CORRELATION_HEADER, correlation_id)];
        match self {
            Self::View { status, view, .. } => (status, headers, Json(view)).into_response(),
            Self::Rejected { status, error } => {
                let body = ErrorBody {
                    error: error.user_message(),
                    detail: error.to_string(),
                    correlation_id: error.correlation_id().to_owned(),
                };
                (status, headers, Json(body)).into_response()
            }
        }
    }
}

pub fn router(app: Arc<App>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/clustering", post(clustering))
        .route("/recommendation", post(recommendation))
        .with_state(PageState { app })
}

pub async fn home(State(state): State<PageState>) -> PageResponse {
    render(&state, PageRequest::Home)
}

pub async fn clustering(
    State(state): State<PageState>,
    body: Result<Json<ClusteringRequest>, JsonRejection>,
) -> PageResponse {
    match body {
        Ok(Json(body)) => render(
            &state,
            PageRequest::Clustering {
                recency: body.recency,
                frequency: body.frequency,
                monetary: body.monetary,
            },
        ),
        Err(rejection) => reject(rejection),
    }
}

pub async fn recommendation(
    State(state): State<PageState>,
    body: Result<Json<RecommendationRequest>, JsonRejection>,
) -> PageResponse {
    match body {
        Ok(Json(body)) => render(&state, PageRequest::Recommendation { product: body.product }),
        Err(rejection) => reject(rejection),
    }
}

fn render(state: &PageState, request: PageRequest) -> PageResponse {
    let correlation_id = Uuid::new_v4().to_string();
    let view = dispatch(&state.app, &request);
    let status = match view.outcome {
        Outcome::Rendered => StatusCode::OK,
        Outcome::NotFound => StatusCode::NOT_FOUND,
        Outcome::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
        Outcome::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    };

    info!(
        event_name = "page.rendered",
        correlation_id = %correlation_id,
        page = %view.page,
        outcome = ?view.outcome,
        status = status.as_u16(),
        "page request handled"
    );

    PageResponse::View { status, correlation_id, view }
}

fn reject(rejection: JsonRejection) -> PageResponse {
    let correlation_id = Uuid::new_v4().to_string();
    warn!(
        event_name = "page.request.rejected",
        correlation_id = %correlation_id,
        error = %rejection.body_text(),
        "request body rejected"
    );

    PageResponse::Rejected {
        status: rejection.status(),
        error: ApplicationError::InvalidRequest(rejection.body_text())
            .into_interface(correlation_id),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::extract::{FromRequest, State};
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use axum::Json;
    use spectrum_core::catalog::Catalog;
    use spectrum_core::errors::InterfaceError;
    use spectrum_core::pages::{NoticeLevel, Page};
    use spectrum_core::recommend::Recommender;
    use spectrum_core::segment::{KMeansClassifier, SegmentLabels, SegmentService, StandardScaler};
    use spectrum_core::similarity::SimilarityMatrix;
    use spectrum_core::{App, IdentityKey, ProductRecord};

    use crate::pages::{
        clustering, home, recommendation, ClusteringRequest, PageResponse, PageState,
        RecommendationRequest,
    };

    fn state() -> State<PageState> {
        let catalog = Catalog::new(
            vec![
                ProductRecord::new("WHITE HANGING HEART T-LIGHT HOLDER", "85123A"),
                ProductRecord::new("WHITE METAL LANTERN", "71053"),
                ProductRecord::new("RED WOOLLY HOTTIE WHITE HEART.", "84029E"),
            ],
            IdentityKey::StockCode,
        )
        .with_fuzzy_matching(80);
        let matrix = SimilarityMatrix::new(
            vec!["85123A".to_owned(), "71053".to_owned(), "84029E".to_owned()],
            vec![vec![1.0, 0.61, 0.42], vec![0.61, 1.0, 0.18], vec![0.42, 0.18, 1.0]],
        )
        .expect("valid matrix");
        let model = KMeansClassifier::new(
            StandardScaler::identity(),
            vec![
                vec![30.0, 4.0, 600.0],
                vec![250.0, 1.0, 150.0],
                vec![10.0, 60.0, 20000.0],
                vec![90.0, 2.0, 300.0],
            ],
        )
        .expect("valid model");

        State(PageState {
            app: Arc::new(App::new(
                Recommender::new(catalog, matrix),
                SegmentService::new(model, SegmentLabels::default()),
            )),
        })
    }

    fn view(response: PageResponse) -> (StatusCode, spectrum_core::PageView) {
        match response {
            PageResponse::View { status, view, .. } => (status, view),
            PageResponse::Rejected { error, .. } => panic!("unexpected rejection: {error}"),
        }
    }

    #[tokio::test]
    async fn home_renders_welcome_view() {
        let (status, view) = view(home(state()).await);

        assert_eq!(status, StatusCode::OK);
        assert_eq!(view.page, Page::Home);
        assert_eq!(view.title, "Welcome to Shopper Spectrum");
    }

    #[tokio::test]
    async fn clustering_returns_segment_label() {
        let body = ClusteringRequest { recency: 280.0, frequency: 1.0, monetary: 120.0 };

        let response = clustering(state(), Ok(Json(body))).await;
        assert!(!response.correlation_id().is_empty());
        let (status, view) = view(response);

        assert_eq!(status, StatusCode::OK);
        assert_eq!(view.notices[0].level, NoticeLevel::Success);
        assert_eq!(view.notices[0].message, "This customer belongs to: At-Risk Customer");
    }

    #[tokio::test]
    async fn clustering_with_negative_input_is_unprocessable() {
        let body = ClusteringRequest { recency: 5.0, frequency: -2.0, monetary: 120.0 };

        let (status, view) = view(clustering(state(), Ok(Json(body))).await);

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(view.has_warning());
    }

    #[tokio::test]
    async fn recommendation_returns_ranked_descriptions() {
        let body = RecommendationRequest { product: "white hanging heart t-light holder".to_owned() };

        let (status, view) = view(recommendation(state(), Ok(Json(body))).await);

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            view.lines,
            vec![
                "Matched Product: WHITE HANGING HEART T-LIGHT HOLDER".to_owned(),
                "Recommended Products:".to_owned(),
                "1. WHITE METAL LANTERN".to_owned(),
                "2. RED WOOLLY HOTTIE WHITE HEART.".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn recommendation_for_unknown_product_is_not_found() {
        let body = RecommendationRequest { product: "nonexistent product xyz".to_owned() };

        let (status, view) = view(recommendation(state(), Ok(Json(body))).await);

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(view.notices[0].message, "No suitable match found in product descriptions.");
        assert!(view.lines.is_empty());
    }

    #[tokio::test]
    async fn empty_product_is_unprocessable() {
        let body = RecommendationRequest { product: "   ".to_owned() };

        let response = recommendation(state(), Ok(Json(body))).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_as_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/recommendation")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Widget A"}"#))
            .expect("valid request");
        let body = Json::<RecommendationRequest>::from_request(request, &()).await;

        let response = recommendation(state(), body).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        match response {
            PageResponse::Rejected { error, .. } => {
                assert!(matches!(error, InterfaceError::BadRequest { .. }));
                assert_ne!(error.correlation_id(), "unassigned");
                assert!(error.to_string().contains("product"));
            }
            PageResponse::View { .. } => panic!("malformed body should not render a page"),
        }
    }
}
