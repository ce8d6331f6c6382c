//! Prediction and health types shared by the gateway and its clients.

use serde::{Deserialize, Serialize};

/// A single ranked class: the label, its index in the label table and the
/// probability reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedClass {
    pub index: usize,
    pub label: String,
    pub score: f64,
}

impl RankedClass {
    pub fn new(index: usize, label: impl Into<String>, score: f64) -> Self {
        Self {
            index,
            label: label.into(),
            score,
        }
    }
}

/// Highest-scoring classes, sorted by score descending.
///
/// Equal scores are ordered by ascending class index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopKResult {
    entries: Vec<RankedClass>,
}

impl TopKResult {
    pub fn new(entries: Vec<RankedClass>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RankedClass] {
        &self.entries
    }

    /// The best class, if any.
    pub fn best(&self) -> Option<&RankedClass> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(label, score)` pairs in rank order.
    pub fn pairs(&self) -> Vec<(&str, f64)> {
        self.entries
            .iter()
            .map(|e| (e.label.as_str(), e.score))
            .collect()
    }

    pub fn into_entries(self) -> Vec<RankedClass> {
        self.entries
    }
}

impl IntoIterator for TopKResult {
    type Item = RankedClass;
    type IntoIter = std::vec::IntoIter<RankedClass>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Health of the model backend as seen by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Backend reported the model as available.
    Healthy,
    /// Backend unreachable, timed out, or reported the model as not ready.
    Unavailable,
    /// No probe has completed yet.
    Unknown,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unavailable => write!(f, "unavailable"),
            HealthStatus::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// Public API bodies
// ============================================================================

/// One class in an API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassConfidence {
    pub class: String,
    pub confidence: f64,
}

impl From<&RankedClass> for ClassConfidence {
    fn from(entry: &RankedClass) -> Self {
        Self {
            class: entry.label.clone(),
            confidence: entry.score,
        }
    }
}

/// Body returned by `POST /predict-image`.
///
/// A single requested class is returned flat; more than one is returned as a
/// `topK` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictResponse {
    TopK {
        #[serde(rename = "topK")]
        top_k: Vec<ClassConfidence>,
    },
    Single(ClassConfidence),
}

impl PredictResponse {
    /// Build the response body for a ranking produced with `requested_k`.
    pub fn from_ranking(result: &TopKResult, requested_k: usize) -> Self {
        match (requested_k, result.best()) {
            (1, Some(best)) => PredictResponse::Single(best.into()),
            _ => PredictResponse::TopK {
                top_k: result.entries().iter().map(ClassConfidence::from).collect(),
            },
        }
    }
}

/// Body returned by `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl From<HealthStatus> for HealthResponse {
    fn from(status: HealthStatus) -> Self {
        let status = match status {
            HealthStatus::Healthy => "ok".to_string(),
            other => other.to_string(),
        };
        Self { status }
    }
}
