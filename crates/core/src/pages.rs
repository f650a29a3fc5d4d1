//! The three interaction modes and the view each one renders.
//!
//! Navigation is an explicit [`Page`] value carried by the request; front ends
//! hand a [`PageRequest`] to [`dispatch`] and render the returned [`PageView`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::App;
use crate::domain::segment::RfmFeatures;
use crate::errors::{ApplicationError, InterfaceError};
use crate::segment::SegmentClassifier;
use crate::similarity::SimilaritySource;

pub const APP_TITLE: &str = "Shopper Spectrum";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    #[default]
    Home,
    Clustering,
    Recommendation,
}

impl Page {
    /// Sidebar order.
    pub const ALL: [Page; 3] = [Page::Home, Page::Clustering, Page::Recommendation];

    pub fn title(&self) -> &'static str {
        match self {
            Page::Home => "Welcome to Shopper Spectrum",
            Page::Clustering => "Customer Segmentation",
            Page::Recommendation => "Get Product Recommendations",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Page::Home => "Home",
            Page::Clustering => "Clustering",
            Page::Recommendation => "Recommendation",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Page {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(Self::Home),
            "clustering" => Ok(Self::Clustering),
            "recommendation" => Ok(Self::Recommendation),
            other => Err(format!(
                "unknown page `{other}` (expected home|clustering|recommendation)"
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "page", rename_all = "snake_case")]
pub enum PageRequest {
    Home,
    Clustering { recency: f64, frequency: f64, monetary: f64 },
    Recommendation { product: String },
}

impl PageRequest {
    pub fn page(&self) -> Page {
        match self {
            PageRequest::Home => Page::Home,
            PageRequest::Clustering { .. } => Page::Clustering,
            PageRequest::Recommendation { .. } => Page::Recommendation,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }
}

/// Why a page stopped early.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Rendered,
    NotFound,
    InvalidInput,
    /// A loaded artifact could not serve the request.
    Failed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageView {
    pub page: Page,
    pub title: String,
    pub outcome: Outcome,
    pub notices: Vec<Notice>,
    pub lines: Vec<String>,
}

impl PageView {
    fn new(page: Page) -> Self {
        Self {
            page,
            title: page.title().to_string(),
            outcome: Outcome::Rendered,
            notices: Vec::new(),
            lines: Vec::new(),
        }
    }

    fn halted(mut self, error: ApplicationError) -> Self {
        let (outcome, message) = match InterfaceError::from(error) {
            InterfaceError::BadRequest { message, .. } => (Outcome::InvalidInput, message),
            InterfaceError::NotFound { message, .. } => (Outcome::NotFound, message),
            InterfaceError::Internal { message, .. } => (Outcome::Failed, message),
        };
        self.outcome = outcome;
        self.notices.push(Notice::warning(message));
        self
    }

    pub fn has_warning(&self) -> bool {
        self.notices.iter().any(|notice| notice.level == NoticeLevel::Warning)
    }

    /// Plain-text rendering for terminals.
    pub fn render_text(&self) -> String {
        let mut output = vec![APP_TITLE.to_string(), String::new(), self.title.clone()];
        for notice in &self.notices {
            let marker = match notice.level {
                NoticeLevel::Info => "info",
                NoticeLevel::Success => "ok",
                NoticeLevel::Warning => "warn",
            };
            output.push(format!("[{marker}] {}", notice.message));
        }
        output.extend(self.lines.iter().cloned());
        output.join("\n")
    }
}

pub fn dispatch<S, C>(app: &App<S, C>, request: &PageRequest) -> PageView
where
    S: SimilaritySource,
    C: SegmentClassifier,
{
    match request {
        PageRequest::Home => home_view(),
        PageRequest::Clustering { recency, frequency, monetary } => {
            clustering(app, *recency, *frequency, *monetary)
        }
        PageRequest::Recommendation { product } => recommendation(app, product),
    }
}

/// Home depends on nothing loaded.
pub fn home_view() -> PageView {
    let mut view = PageView::new(Page::Home);
    view.lines = vec![
        "This interactive tool allows you to:".to_string(),
        "- Segment customers using Recency, Frequency, and Monetary (RFM) values.".to_string(),
        "- Predict customer segments like High-Value, Occasional, At-Risk, etc.".to_string(),
        "- Recommend products similar to a chosen one using product name input.".to_string(),
        String::new(),
        format!(
            "Navigate between: {}",
            Page::ALL.iter().map(Page::to_string).collect::<Vec<_>>().join(", ")
        ),
    ];
    view
}

fn clustering<S, C>(app: &App<S, C>, recency: f64, frequency: f64, monetary: f64) -> PageView
where
    S: SimilaritySource,
    C: SegmentClassifier,
{
    let view = PageView::new(Page::Clustering);

    let prediction = RfmFeatures::new(recency, frequency, monetary)
        .and_then(|features| app.segments().predict(&features));

    match prediction {
        Ok(prediction) => {
            info!(
                event_name = "page.clustering.predicted",
                cluster = prediction.cluster,
                label = %prediction.label,
                "segment predicted"
            );
            let mut view = view;
            view.notices
                .push(Notice::success(format!("This customer belongs to: {}", prediction.label)));
            view.lines.push(format!("Cluster: {}", prediction.cluster));
            view
        }
        Err(error) => {
            warn!(event_name = "page.clustering.rejected", error = %error, "segment prediction failed");
            view.halted(error.into())
        }
    }
}

fn recommendation<S, C>(app: &App<S, C>, product: &str) -> PageView
where
    S: SimilaritySource,
    C: SegmentClassifier,
{
    let mut view = PageView::new(Page::Recommendation);

    let recommendation = match app.recommender().recommend(product) {
        Ok(recommendation) => recommendation,
        Err(error) => {
            warn!(
                event_name = "page.recommendation.halted",
                error = %error,
                "recommendation request halted"
            );
            return view.halted(error.into());
        }
    };

    if let Some(substitution) = &recommendation.substitution {
        view.notices.push(Notice::info(format!(
            "No exact match found. Using closest match: {} (score: {})",
            substitution.matched, substitution.score
        )));
    }

    view.lines.push(format!("Matched Product: {}", recommendation.matched));
    view.lines.push("Recommended Products:".to_string());
    view.lines.extend(
        recommendation.items.iter().map(|item| format!("{}. {}", item.rank, item.description)),
    );
    view
}
