use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum RecommendationError {
    #[error("product name is empty")]
    EmptyQuery,
    #[error("Product name not found: `{query}`")]
    ProductNotFound { query: String },
    #[error("no suitable match found in product descriptions for `{query}` (best score {best_score})")]
    NoFuzzyMatch { query: String, best_score: u8 },
    #[error("similarity data not found for this product: `{identity}`")]
    SimilarityNotFound { identity: String },
}

impl RecommendationError {
    /// Message shown to the person who typed the query.
    pub fn warning(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "Enter a product name to get recommendations.",
            Self::ProductNotFound { .. } => "Product name not found.",
            Self::NoFuzzyMatch { .. } => "No suitable match found in product descriptions.",
            Self::SimilarityNotFound { .. } => "Similarity data not found for this product.",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SegmentError {
    #[error("feature `{name}` must be a finite non-negative number, got {value}")]
    InvalidFeature { name: &'static str, value: f64 },
    #[error("segment model expects {expected} features per row, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("segment model has no centroids")]
    EmptyModel,
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("could not read artifact `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse csv artifact `{path}`: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("could not parse json artifact `{path}`: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
    #[error("artifact `{path}` is missing required column `{column}`")]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("malformed similarity matrix: {0}")]
    MalformedMatrix(String),
    #[error("malformed segment model: {0}")]
    MalformedModel(String),
    #[error("unsupported artifact format for `{0}` (expected .csv or .json)")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Recommendation(#[from] RecommendationError),
    #[error(transparent)]
    Segment(#[from] SegmentError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "No matching data was found for this request.",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Recommendation(RecommendationError::EmptyQuery) => Self::BadRequest {
                message: RecommendationError::EmptyQuery.warning().to_owned(),
                correlation_id,
            },
            ApplicationError::InvalidRequest(_)
            | ApplicationError::Segment(SegmentError::InvalidFeature { .. }) => {
                Self::BadRequest { message: value.to_string(), correlation_id }
            }
            ApplicationError::Recommendation(error) => {
                Self::NotFound { message: error.warning().to_owned(), correlation_id }
            }
            ApplicationError::Segment(_)
            | ApplicationError::Artifact(_)
            | ApplicationError::Configuration(_) => {
                Self::Internal { message: value.to_string(), correlation_id }
            }
        }
    }
}
