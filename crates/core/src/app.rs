use std::collections::HashSet;

use tracing::info;

use crate::artifacts;
use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::domain::product::{IdentityKey, ProductIdentity};
use crate::errors::ArtifactError;
use crate::recommend::Recommender;
use crate::segment::{KMeansClassifier, SegmentClassifier, SegmentService};
use crate::similarity::{SimilarityMatrix, SimilaritySource};

/// Everything a page needs, loaded once and then only read.
pub struct App<S = SimilarityMatrix, C = KMeansClassifier> {
    recommender: Recommender<S>,
    segments: SegmentService<C>,
}

impl<S: SimilaritySource, C: SegmentClassifier> App<S, C> {
    pub fn new(recommender: Recommender<S>, segments: SegmentService<C>) -> Self {
        Self { recommender, segments }
    }

    pub fn recommender(&self) -> &Recommender<S> {
        &self.recommender
    }

    pub fn segments(&self) -> &SegmentService<C> {
        &self.segments
    }
}

impl App {
    pub fn load(config: &AppConfig) -> Result<Self, ArtifactError> {
        let artifacts = &config.artifacts;
        let records = artifacts::load_catalog(&artifacts.catalog_path, artifacts.catalog_encoding)?;
        let similarity = artifacts::load_similarity(&artifacts.similarity_path)?;
        let model = artifacts::load_segment_model(&artifacts.segment_model_path)?;

        let recommendation = &config.recommendation;
        let mut catalog = Catalog::new(records, recommendation.identity_key);
        if recommendation.fuzzy_active() {
            catalog = catalog.with_fuzzy_matching(recommendation.fuzzy_threshold);
        }

        let coverage = catalog_coverage(&catalog, &similarity);
        info!(
            event_name = "system.app.loaded",
            catalog_size = catalog.len(),
            similarity_size = similarity.len(),
            catalog_entries_without_similarity = coverage.missing,
            identity_key = ?recommendation.identity_key,
            fuzzy_enabled = recommendation.fuzzy_active(),
            "artifacts loaded"
        );

        let recommender = Recommender::new(catalog, similarity).with_top_k(recommendation.top_k);
        let segments = SegmentService::new(model, config.segment_labels());
        Ok(Self::new(recommender, segments))
    }
}

/// How many distinct catalog identities the similarity source knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Coverage {
    pub identities: usize,
    pub missing: usize,
}

impl Coverage {
    /// True when no catalog identity has a similarity row, usually a key mismatch.
    pub fn is_disjoint(&self) -> bool {
        self.identities > 0 && self.missing == self.identities
    }
}

pub fn catalog_coverage<S: SimilaritySource>(catalog: &Catalog, similarity: &S) -> Coverage {
    let identities: HashSet<&str> = catalog
        .records()
        .iter()
        .map(|record| match catalog.key() {
            IdentityKey::Description => record.description.as_str(),
            IdentityKey::StockCode => record.stock_code.0.as_str(),
        })
        .collect();

    let missing = identities
        .iter()
        .filter(|identity| !similarity.contains(&ProductIdentity((**identity).to_owned())))
        .count();
    Coverage { identities: identities.len(), missing }
}
