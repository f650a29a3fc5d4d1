//! Customer segmentation over RFM features.
//!
//! The trained model is an external artifact: a feature scaler followed by a
//! set of cluster centroids. This module only scores against it and maps the
//! resulting cluster index to a label.

use serde::{Deserialize, Serialize};

use crate::domain::segment::{RfmFeatures, Segment, UNKNOWN_SEGMENT};
use crate::errors::SegmentError;

pub const FEATURE_DIM: usize = 3;

impl RfmFeatures {
    /// Validates that every feature is finite and non-negative.
    pub fn new(recency: f64, frequency: f64, monetary: f64) -> Result<Self, SegmentError> {
        for (name, value) in [("recency", recency), ("frequency", frequency), ("monetary", monetary)]
        {
            if !value.is_finite() || value < 0.0 {
                return Err(SegmentError::InvalidFeature { name, value });
            }
        }
        Ok(Self { recency, frequency, monetary })
    }
}

/// Assigns a cluster index to a customer.
pub trait SegmentClassifier: Send + Sync {
    fn classify(&self, features: &RfmFeatures) -> Result<usize, SegmentError>;
}

/// Per-feature standardization: `(x - mean) / scale`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn identity() -> Self {
        Self { mean: vec![0.0; FEATURE_DIM], scale: vec![1.0; FEATURE_DIM] }
    }

    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, SegmentError> {
        if self.mean.len() != values.len() || self.scale.len() != values.len() {
            return Err(SegmentError::DimensionMismatch {
                expected: self.mean.len(),
                actual: values.len(),
            });
        }

        Ok(values
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(value, (mean, scale))| {
                // Zero-variance features were constant during training.
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (value - mean) / scale
            })
            .collect())
    }
}

/// Nearest-centroid classifier over scaled features.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KMeansClassifier {
    pub scaler: StandardScaler,
    pub centroids: Vec<Vec<f64>>,
}

impl KMeansClassifier {
    pub fn new(scaler: StandardScaler, centroids: Vec<Vec<f64>>) -> Result<Self, SegmentError> {
        if centroids.is_empty() {
            return Err(SegmentError::EmptyModel);
        }
        for vector in std::iter::once(&scaler.mean)
            .chain(std::iter::once(&scaler.scale))
            .chain(centroids.iter())
        {
            if vector.len() != FEATURE_DIM {
                return Err(SegmentError::DimensionMismatch {
                    expected: FEATURE_DIM,
                    actual: vector.len(),
                });
            }
        }
        Ok(Self { scaler, centroids })
    }

    pub fn cluster_count(&self) -> usize {
        self.centroids.len()
    }
}

impl SegmentClassifier for KMeansClassifier {
    fn classify(&self, features: &RfmFeatures) -> Result<usize, SegmentError> {
        let scaled = self.scaler.transform(&features.as_array())?;

        let mut best: Option<(usize, f64)> = None;
        for (index, centroid) in self.centroids.iter().enumerate() {
            let distance: f64 =
                centroid.iter().zip(scaled.iter()).map(|(c, x)| (c - x) * (c - x)).sum();
            match best {
                Some((_, current)) if distance >= current => {}
                _ => best = Some((index, distance)),
            }
        }

        best.map(|(index, _)| index).ok_or(SegmentError::EmptyModel)
    }
}

/// Fixed mapping from cluster index to segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentLabels {
    segments: [Segment; 4],
}

impl Default for SegmentLabels {
    fn default() -> Self {
        Self {
            segments: [
                Segment::RegularBuyer,
                Segment::AtRiskCustomer,
                Segment::HighValueCustomer,
                Segment::OccasionalShopper,
            ],
        }
    }
}

impl SegmentLabels {
    pub fn new(segments: [Segment; 4]) -> Self {
        Self { segments }
    }

    pub fn segment_for(&self, index: usize) -> Option<Segment> {
        self.segments.get(index).copied()
    }

    pub fn label_for(&self, index: usize) -> &'static str {
        self.segment_for(index).map(|segment| segment.label()).unwrap_or(UNKNOWN_SEGMENT)
    }

    pub fn segments(&self) -> &[Segment; 4] {
        &self.segments
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentPrediction {
    pub cluster: usize,
    pub segment: Option<Segment>,
    pub label: String,
}

pub struct SegmentService<C> {
    classifier: C,
    labels: SegmentLabels,
}

impl<C: SegmentClassifier> SegmentService<C> {
    pub fn new(classifier: C, labels: SegmentLabels) -> Self {
        Self { classifier, labels }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn labels(&self) -> &SegmentLabels {
        &self.labels
    }

    pub fn predict(&self, features: &RfmFeatures) -> Result<SegmentPrediction, SegmentError> {
        let cluster = self.classifier.classify(features)?;
        Ok(SegmentPrediction {
            cluster,
            segment: self.labels.segment_for(cluster),
            label: self.labels.label_for(cluster).to_owned(),
        })
    }
}
