//! Free text in, ordered list of similar product descriptions out.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{Catalog, Substitution};
use crate::domain::product::{IdentityKey, ProductIdentity};
use crate::errors::RecommendationError;
use crate::similarity::{SimilaritySource, DEFAULT_TOP_K};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendedProduct {
    /// 1-based display rank.
    pub rank: usize,
    pub description: String,
    pub identity: ProductIdentity,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub matched: String,
    pub identity: ProductIdentity,
    pub substitution: Option<Substitution>,
    pub items: Vec<RecommendedProduct>,
}

impl Recommendation {
    pub fn descriptions(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.description.as_str()).collect()
    }
}

pub struct Recommender<S> {
    catalog: Catalog,
    similarity: S,
    top_k: usize,
}

impl<S: SimilaritySource> Recommender<S> {
    pub fn new(catalog: Catalog, similarity: S) -> Self {
        Self { catalog, similarity, top_k: DEFAULT_TOP_K }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn similarity(&self) -> &S {
        &self.similarity
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn recommend(&self, raw_text: &str) -> Result<Recommendation, RecommendationError> {
        let resolution = self.catalog.resolve(raw_text)?;
        let neighbors = self.similarity.top_neighbors(&resolution.identity, self.top_k)?;

        let mut items = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            let description = match self.catalog.key() {
                IdentityKey::Description => Some(neighbor.identity.0.clone()),
                IdentityKey::StockCode => {
                    self.catalog.description_for(&neighbor.identity).map(str::to_owned)
                }
            };
            let Some(description) = description else {
                warn!(
                    event_name = "recommend.neighbor.missing_description",
                    identity = %neighbor.identity,
                    "similar product has no catalog description, skipping"
                );
                continue;
            };
            items.push(RecommendedProduct {
                rank: items.len() + 1,
                description,
                identity: neighbor.identity,
                score: neighbor.score,
            });
        }

        debug!(
            event_name = "recommend.completed",
            identity = %resolution.identity,
            result_count = items.len(),
            "recommendations computed"
        );

        Ok(Recommendation {
            matched: resolution.description,
            identity: resolution.identity,
            substitution: resolution.substitution,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Recommender;
    use crate::catalog::Catalog;
    use crate::domain::product::{IdentityKey, ProductIdentity, ProductRecord};
    use crate::errors::RecommendationError;
    use crate::similarity::{Neighbor, SimilarityMatrix, SimilaritySource};

    fn widget_catalog(key: IdentityKey) -> Catalog {
        Catalog::new(
            vec![ProductRecord::new("Widget A", "W001"), ProductRecord::new("Widget B", "W002")],
            key,
        )
    }

    fn stock_code_matrix() -> SimilarityMatrix {
        SimilarityMatrix::new(
            vec!["W001".to_owned(), "W002".to_owned()],
            vec![vec![1.0, 0.9], vec![0.9, 1.0]],
        )
        .expect("valid matrix")
    }

    fn description_matrix() -> SimilarityMatrix {
        SimilarityMatrix::new(
            vec!["Widget A".to_owned(), "Widget B".to_owned()],
            vec![vec![1.0, 0.9], vec![0.9, 1.0]],
        )
        .expect("valid matrix")
    }

    /// Always answers with a fixed neighbor list.
    struct CannedSimilarity(Vec<Neighbor>);

    impl SimilaritySource for CannedSimilarity {
        fn top_neighbors(
            &self,
            _identity: &ProductIdentity,
            k: usize,
        ) -> Result<Vec<Neighbor>, RecommendationError> {
            Ok(self.0.iter().take(k).cloned().collect())
        }

        fn contains(&self, _identity: &ProductIdentity) -> bool {
            true
        }

        fn len(&self) -> usize {
            self.0.len()
        }
    }

    #[test]
    fn stock_code_variant_maps_neighbors_back_to_descriptions() {
        let recommender =
            Recommender::new(widget_catalog(IdentityKey::StockCode), stock_code_matrix());

        let recommendation = recommender.recommend("widget a").expect("should recommend");

        assert_eq!(recommendation.descriptions(), vec!["Widget B"]);
        assert_eq!(recommendation.items[0].rank, 1);
        assert_eq!(recommendation.matched, "Widget A");
        assert!(recommendation.substitution.is_none());
    }

    #[test]
    fn unknown_product_is_not_found_and_produces_no_list() {
        let catalog = widget_catalog(IdentityKey::Description).with_fuzzy_matching(80);
        let recommender = Recommender::new(catalog, description_matrix());

        let error = recommender.recommend("nonexistent product xyz").expect_err("no match");
        assert!(matches!(error, RecommendationError::NoFuzzyMatch { .. }));
    }

    #[test]
    fn typo_is_substituted_then_ranked() {
        let catalog = widget_catalog(IdentityKey::Description).with_fuzzy_matching(80);
        let recommender = Recommender::new(catalog, description_matrix());

        let recommendation = recommender.recommend("Widdget A").expect("typo resolves");

        let substitution = recommendation.substitution.as_ref().expect("substitution notice");
        assert_eq!(substitution.matched, "Widget A");
        assert!(substitution.score > 80);
        assert_eq!(recommendation.descriptions(), vec!["Widget B"]);
    }

    #[test]
    fn catalog_entry_missing_from_matrix_is_similarity_not_found() {
        let catalog = Catalog::new(
            vec![ProductRecord::new("Widget A", "W001"), ProductRecord::new("Gizmo", "G404")],
            IdentityKey::StockCode,
        );
        let recommender = Recommender::new(catalog, stock_code_matrix());

        let error = recommender.recommend("gizmo").expect_err("not in matrix");
        assert_eq!(error, RecommendationError::SimilarityNotFound { identity: "G404".to_owned() });
    }

    #[test]
    fn neighbors_without_description_are_skipped_and_ranks_stay_contiguous() {
        let canned = CannedSimilarity(vec![
            Neighbor { identity: ProductIdentity("X999".to_owned()), score: 0.95 },
            Neighbor { identity: ProductIdentity("W002".to_owned()), score: 0.9 },
        ]);
        let recommender = Recommender::new(widget_catalog(IdentityKey::StockCode), canned);

        let recommendation = recommender.recommend("Widget A").expect("should recommend");

        assert_eq!(recommendation.descriptions(), vec!["Widget B"]);
        assert_eq!(recommendation.items[0].rank, 1);
    }

    #[test]
    fn top_k_caps_result_length() {
        let canned = CannedSimilarity(
            (0..10)
                .map(|index| Neighbor {
                    identity: ProductIdentity(format!("Item {index}")),
                    score: 1.0 - f64::from(index) / 10.0,
                })
                .collect(),
        );
        let recommender =
            Recommender::new(widget_catalog(IdentityKey::Description), canned).with_top_k(5);

        let recommendation = recommender.recommend("widget a").expect("should recommend");
        assert_eq!(recommendation.items.len(), 5);
        assert_eq!(recommendation.items[4].rank, 5);
    }
}
