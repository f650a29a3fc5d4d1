pub mod app;
pub mod artifacts;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pages;
pub mod recommend;
pub mod segment;
pub mod similarity;

pub use app::App;
pub use catalog::{Catalog, Resolution, Substitution};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::product::{IdentityKey, ProductIdentity, ProductRecord, StockCode};
pub use domain::segment::{RfmFeatures, Segment};
pub use errors::{
    ApplicationError, ArtifactError, InterfaceError, RecommendationError, SegmentError,
};
pub use pages::{dispatch, home_view, Notice, NoticeLevel, Outcome, Page, PageRequest, PageView};
pub use recommend::{Recommendation, RecommendedProduct, Recommender};
pub use segment::{KMeansClassifier, SegmentClassifier, SegmentLabels, SegmentService};
pub use similarity::{Neighbor, SimilarityMatrix, SimilaritySource};
