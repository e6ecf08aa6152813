use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face embedding vector (512-dimensional for the bundled ArcFace model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }

    /// Euclidean distance between two embeddings. Lower = more similar.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// A known identity: one embedding stored under a label.
///
/// Several entries may share a label (re-enrollment) and several labels may
/// share an identical embedding.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub embedding: Embedding,
    pub label: String,
}

/// Closest enrolled identity for a single probe embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Label of the closest enrollment.
    #[serde(rename = "id")]
    pub label: String,
    /// Euclidean distance to that enrollment.
    #[serde(rename = "dist")]
    pub distance: f32,
}

/// Faces found in one uploaded image and their closest identities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Number of faces the extractor found, matched or not.
    pub count: usize,
    pub faces: Vec<MatchResult>,
}

/// Strategy for comparing a probe embedding against a gallery of enrolled faces.
pub trait Matcher {
    /// Return the closest gallery entry, or `None` when the gallery is empty.
    fn best_match(&self, probe: &Embedding, gallery: &[Enrollment]) -> Option<MatchResult>;
}

/// Linear-scan Euclidean matcher.
///
/// Visits every gallery entry. Ties keep the entry found first: a candidate
/// replaces the current best only when strictly closer.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn best_match(&self, probe: &Embedding, gallery: &[Enrollment]) -> Option<MatchResult> {
        let mut best: Option<(usize, f32)> = None;

        for (i, entry) in gallery.iter().enumerate() {
            let dist = probe.euclidean_distance(&entry.embedding);
            let closer = match best {
                None => true,
                Some((_, best_dist)) => dist < best_dist,
            };
            if closer {
                best = Some((i, dist));
            }
        }

        best.map(|(idx, distance)| MatchResult {
            label: gallery[idx].label.clone(),
            distance,
        })
    }
}
