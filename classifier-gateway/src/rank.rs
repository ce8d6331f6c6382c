//! Top-k ranking of class probabilities.

use std::cmp::Ordering;

use classifier_common::{RankedClass, TopKResult};

use crate::error::{Error, Result};
use crate::labels::LabelTable;
use crate::validate::PredictionResponse;

/// Ranks validated predictions against a label table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopKRanker;

impl TopKRanker {
    /// Return the `k` highest-scoring classes, best first.
    ///
    /// `k` larger than the number of classes yields a full ranking. Equal
    /// scores keep ascending class-index order; NaN ranks last.
    pub fn rank(
        &self,
        response: &PredictionResponse,
        labels: &LabelTable,
        k: usize,
    ) -> Result<TopKResult> {
        if k == 0 {
            return Err(Error::InvalidRequest("top_k must be at least 1".to_string()));
        }
        if response.len() != labels.len() {
            return Err(Error::LabelMismatch {
                expected: labels.len(),
                actual: response.len(),
            });
        }

        let scores = response.probabilities();
        let mut order: Vec<usize> = (0..scores.len()).collect();
        // Stable sort: ties stay in index order.
        order.sort_by(|&a, &b| compare_desc(scores[a], scores[b]));

        let entries = order
            .into_iter()
            .take(k)
            .filter_map(|i| labels.get(i).map(|label| RankedClass::new(i, label, scores[i])))
            .collect();

        Ok(TopKResult::new(entries))
    }
}

fn compare_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
