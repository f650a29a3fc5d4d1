//! Product catalog and free-text identity resolution.

pub mod fuzzy;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::product::{IdentityKey, ProductIdentity, ProductRecord};
use crate::errors::RecommendationError;

pub const DEFAULT_FUZZY_THRESHOLD: u8 = 80;

/// Reported when the query had no exact match and a fuzzy candidate was used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub input: String,
    pub matched: String,
    pub score: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub identity: ProductIdentity,
    /// Catalog description the query resolved to.
    pub description: String,
    pub substitution: Option<Substitution>,
}

#[derive(Clone, Debug)]
pub struct Catalog {
    records: Vec<ProductRecord>,
    lowered: Vec<String>,
    distinct_descriptions: Vec<String>,
    key: IdentityKey,
    fuzzy_threshold: Option<u8>,
}

impl Catalog {
    /// Builds a catalog keyed by `key`. Descriptions are trimmed, records with an
    /// empty description are dropped and repeated (description, stock code) pairs
    /// are collapsed, keeping first-seen order.
    pub fn new(records: Vec<ProductRecord>, key: IdentityKey) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            let description = record.description.trim();
            if description.is_empty() {
                continue;
            }
            let record = ProductRecord {
                description: description.to_owned(),
                stock_code: record.stock_code,
            };
            if seen.insert((record.description.clone(), record.stock_code.clone())) {
                kept.push(record);
            }
        }

        let lowered = kept.iter().map(|record| record.description.to_lowercase()).collect();
        let mut seen_descriptions = HashSet::new();
        let distinct_descriptions = kept
            .iter()
            .filter(|record| seen_descriptions.insert(record.description.as_str()))
            .map(|record| record.description.clone())
            .collect();

        Self { records: kept, lowered, distinct_descriptions, key, fuzzy_threshold: None }
    }

    /// Enables the fuzzy fallback. Candidates must score strictly above
    /// `threshold` (0-100) to be accepted.
    pub fn with_fuzzy_matching(mut self, threshold: u8) -> Self {
        self.fuzzy_threshold = Some(threshold.min(100));
        self
    }

    pub fn key(&self) -> IdentityKey {
        self.key
    }

    pub fn fuzzy_threshold(&self) -> Option<u8> {
        self.fuzzy_threshold
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn distinct_descriptions(&self) -> &[String] {
        &self.distinct_descriptions
    }

    pub fn resolve(&self, raw_text: &str) -> Result<Resolution, RecommendationError> {
        let query = raw_text.trim();
        if query.is_empty() {
            return Err(RecommendationError::EmptyQuery);
        }

        if let Some(record) = self.find_exact(query) {
            return Ok(Resolution {
                identity: self.identity_of(record),
                description: record.description.clone(),
                substitution: None,
            });
        }

        let Some(threshold) = self.fuzzy_threshold else {
            return Err(RecommendationError::ProductNotFound { query: query.to_owned() });
        };

        let candidates = self.distinct_descriptions.iter().map(String::as_str);
        let best = fuzzy::best_match(query, candidates);
        match best {
            Some(found) if found.score > threshold => {
                info!(
                    event_name = "recommend.catalog.fuzzy_substitution",
                    input = query,
                    matched = found.candidate,
                    score = found.score,
                    "no exact match, using closest catalog description"
                );
                let record = self.find_exact(found.candidate).ok_or_else(|| {
                    RecommendationError::ProductNotFound { query: query.to_owned() }
                })?;
                Ok(Resolution {
                    identity: self.identity_of(record),
                    description: record.description.clone(),
                    substitution: Some(Substitution {
                        input: query.to_owned(),
                        matched: found.candidate.to_owned(),
                        score: found.score,
                    }),
                })
            }
            Some(found) => Err(RecommendationError::NoFuzzyMatch {
                query: query.to_owned(),
                best_score: found.score,
            }),
            None => Err(RecommendationError::NoFuzzyMatch { query: query.to_owned(), best_score: 0 }),
        }
    }

    /// First non-empty description recorded for a stock code.
    pub fn description_for(&self, identity: &ProductIdentity) -> Option<&str> {
        match self.key {
            IdentityKey::Description => self
                .records
                .iter()
                .find(|record| record.description == identity.0)
                .map(|record| record.description.as_str()),
            IdentityKey::StockCode => self
                .records
                .iter()
                .find(|record| record.stock_code.0 == identity.0)
                .map(|record| record.description.as_str()),
        }
    }

    fn find_exact(&self, query: &str) -> Option<&ProductRecord> {
        let needle = query.to_lowercase();
        self.lowered
            .iter()
            .position(|description| *description == needle)
            .and_then(|index| self.records.get(index))
    }

    fn identity_of(&self, record: &ProductRecord) -> ProductIdentity {
        match self.key {
            IdentityKey::Description => ProductIdentity(record.description.clone()),
            IdentityKey::StockCode => ProductIdentity(record.stock_code.0.clone()),
        }
    }
}
