//! Precomputed product-to-product similarity and neighbor ranking.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::product::ProductIdentity;
use crate::errors::{ArtifactError, RecommendationError};

pub const DEFAULT_TOP_K: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub identity: ProductIdentity,
    pub score: f64,
}

/// Read-only access to pairwise product similarity.
pub trait SimilaritySource: Send + Sync {
    /// Up to `k` identities most similar to `identity`, best first, never
    /// including `identity` itself.
    fn top_neighbors(
        &self,
        identity: &ProductIdentity,
        k: usize,
    ) -> Result<Vec<Neighbor>, RecommendationError>;

    fn contains(&self, identity: &ProductIdentity) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dense square matrix labelled on both axes by the same identities.
#[derive(Clone, Debug)]
pub struct SimilarityMatrix {
    labels: Vec<ProductIdentity>,
    positions: HashMap<String, usize>,
    scores: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn new(labels: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, ArtifactError> {
        let size = labels.len();
        if rows.len() != size {
            return Err(ArtifactError::MalformedMatrix(format!(
                "expected {size} rows to match {size} labels, got {}",
                rows.len()
            )));
        }

        let mut positions = HashMap::with_capacity(size);
        for (index, label) in labels.iter().enumerate() {
            if positions.insert(label.clone(), index).is_some() {
                return Err(ArtifactError::MalformedMatrix(format!("duplicate label `{label}`")));
            }
        }

        let mut scores = Vec::with_capacity(size * size);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(ArtifactError::MalformedMatrix(format!(
                    "row `{}` has {} columns, expected {size}",
                    labels[index],
                    row.len()
                )));
            }
            scores.extend(row);
        }

        Ok(Self { labels: labels.into_iter().map(ProductIdentity).collect(), positions, scores })
    }

    pub fn labels(&self) -> &[ProductIdentity] {
        &self.labels
    }

    pub fn score(&self, left: &ProductIdentity, right: &ProductIdentity) -> Option<f64> {
        let row = *self.positions.get(left.as_str())?;
        let column = *self.positions.get(right.as_str())?;
        self.scores.get(row * self.labels.len() + column).copied()
    }

    fn row(&self, index: usize) -> &[f64] {
        let size = self.labels.len();
        &self.scores[index * size..(index + 1) * size]
    }
}

impl SimilaritySource for SimilarityMatrix {
    fn top_neighbors(
        &self,
        identity: &ProductIdentity,
        k: usize,
    ) -> Result<Vec<Neighbor>, RecommendationError> {
        let Some(&position) = self.positions.get(identity.as_str()) else {
            return Err(RecommendationError::SimilarityNotFound { identity: identity.0.clone() });
        };

        let row = self.row(position);
        let mut ranked: Vec<usize> = (0..row.len()).collect();
        // Stable: equal scores keep matrix order.
        ranked.sort_by(|left, right| descending(row[*left], row[*right]));

        Ok(ranked
            .into_iter()
            .filter(|index| *index != position)
            .take(k)
            .map(|index| Neighbor { identity: self.labels[index].clone(), score: row[index] })
            .collect())
    }

    fn contains(&self, identity: &ProductIdentity) -> bool {
        self.positions.contains_key(identity.as_str())
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}

/// Descending order with NaN last.
fn descending(left: f64, right: f64) -> Ordering {
    match (left.is_nan(), right.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
    }
}
