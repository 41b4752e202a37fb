use serde::Serialize;

use crate::recognition::domain::face_embedding::FaceEmbedding;
use crate::shared::constants::DEFAULT_MATCH_THRESHOLD;
use crate::shared::region::FaceRegion;

/// How two embeddings are compared. Smaller distances mean more alike.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cos θ`, in `[0, 2]`.
    #[default]
    Cosine,
    /// Straight-line distance between the raw vectors.
    Euclidean,
}

/// Outcome of comparing one detected face against the reference.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    pub region: FaceRegion,
    pub distance: f64,
    pub is_match: bool,
}

/// Accepts a candidate when its distance to the reference is strictly below
/// the threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceMatcher {
    threshold: f64,
    metric: DistanceMetric,
}

impl FaceMatcher {
    pub fn new(threshold: f64, metric: DistanceMetric) -> Self {
        Self { threshold, metric }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Distance under the configured metric, or `+∞` when the embeddings come
    /// from models with different output sizes.
    pub fn distance(&self, candidate: &FaceEmbedding, reference: &FaceEmbedding) -> f64 {
        if candidate.dim() != reference.dim() {
            log::warn!(
                "Embedding dimension mismatch ({} vs {}), treating as no match",
                candidate.dim(),
                reference.dim()
            );
            return f64::INFINITY;
        }
        let (a, b) = (candidate.values(), reference.values());
        match self.metric {
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::Euclidean => euclidean_distance(a, b),
        }
    }

    pub fn is_match(&self, distance: f64) -> bool {
        distance < self.threshold
    }

    pub fn compare(
        &self,
        region: FaceRegion,
        candidate: &FaceEmbedding,
        reference: &FaceEmbedding,
    ) -> MatchResult {
        let distance = self.distance(candidate, reference);
        MatchResult {
            region,
            distance,
            is_match: self.is_match(distance),
        }
    }
}

impl Default for FaceMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD, DistanceMetric::default())
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        // A zero vector carries no identity.
        return f64::INFINITY;
    }
    1.0 - dot / denom
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
