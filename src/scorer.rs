//! Scorer: rank edge detectors by how many pixels they mark.
//!
//! Every candidate runs on the same gray plane; candidates are independent
//! so they are evaluated in parallel. Results come back in candidate order,
//! which keeps the table identical to a sequential evaluation.

use std::cmp::Reverse;

use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::{EdgeError, Result};
use crate::ops::Method;
use crate::pipeline::CannyThresholds;

/// One row of a score table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreEntry {
    pub method: Method,
    pub count: u64,
}

/// Non-zero pixel counts per method for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreTable {
    entries: Vec<ScoreEntry>,
}

impl ScoreTable {
    pub fn get(&self, method: Method) -> Option<u64> {
        self.entries.iter().find(|e| e.method == method).map(|e| e.count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the order the candidates were given.
    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    /// Entries by count descending, ties by display name ascending.
    pub fn ranked(&self) -> Vec<ScoreEntry> {
        let mut ranked = self.entries.clone();
        ranked.sort_by_key(|e| (Reverse(e.count), e.method.name()));
        ranked
    }

    /// Method with the highest count.
    ///
    /// # Errors
    /// [`EdgeError::EmptyScore`] when nothing was scored.
    pub fn best(&self) -> Result<ScoreEntry> {
        self.ranked().into_iter().next().ok_or(EdgeError::EmptyScore)
    }
}

/// Score every edge detector.
pub fn score(gray: ArrayView2<u8>, thresholds: CannyThresholds) -> ScoreTable {
    score_with(gray, thresholds, &Method::EDGE_DETECTORS)
}

/// Score an explicit list of methods.
pub fn score_with(gray: ArrayView2<u8>, thresholds: CannyThresholds, candidates: &[Method]) -> ScoreTable {
    let entries: Vec<ScoreEntry> = candidates
        .par_iter()
        .map(|&method| {
            let output = method.apply_gray(gray, thresholds);
            let count = output.iter().filter(|&&v| v != 0).count() as u64;
            ScoreEntry { method, count }
        })
        .collect();

    debug!(candidates = candidates.len(), low = thresholds.low, high = thresholds.high, "scored methods");

    ScoreTable { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn checkerboard() -> Array2<u8> {
        Array2::from_shape_fn((24, 24), |(y, x)| if (x / 6 + y / 6) % 2 == 0 { 20 } else { 230 })
    }

    #[test]
    fn test_solid_image_scores_zero_everywhere() {
        let gray = Array2::<u8>::from_elem((30, 40), 128);

        let table = score(gray.view(), CannyThresholds::default());

        assert_eq!(table.len(), Method::EDGE_DETECTORS.len());
        assert!(table.entries().iter().all(|e| e.count == 0));
    }

    #[test]
    fn test_excludes_non_edge_methods() {
        let table = score(checkerboard().view(), CannyThresholds::default());
        assert_eq!(table.get(Method::Equalization), None);
        assert_eq!(table.get(Method::None), None);
        assert!(table.get(Method::Canny).is_some());
    }

    #[test]
    fn test_counts_match_direct_application() {
        let gray = checkerboard();
        let t = CannyThresholds::new(40, 120);

        let table = score(gray.view(), t);

        for m in Method::EDGE_DETECTORS {
            let direct = m.apply_gray(gray.view(), t).iter().filter(|&&v| v != 0).count() as u64;
            assert_eq!(table.get(m), Some(direct), "{m}");
        }
    }

    #[test]
    fn test_parallel_scoring_is_stable() {
        let gray = checkerboard();
        let t = CannyThresholds::default();
        assert_eq!(score(gray.view(), t), score(gray.view(), t));
    }

    #[test]
    fn test_ties_break_by_name() {
        let table = ScoreTable {
            entries: vec![
                ScoreEntry { method: Method::SobelY, count: 5 },
                ScoreEntry { method: Method::Roberts, count: 9 },
                ScoreEntry { method: Method::Canny, count: 5 },
                ScoreEntry { method: Method::Laplacian, count: 5 },
            ],
        };

        let names: Vec<&str> = table.ranked().iter().map(|e| e.method.name()).collect();

        assert_eq!(names, ["Roberts", "Canny", "Laplacian", "Sobel Y"]);
        assert_eq!(table.best().unwrap().method, Method::Roberts);
    }

    #[test]
    fn test_all_zero_best_is_first_by_name() {
        let gray = Array2::<u8>::zeros((8, 8));
        let best = score(gray.view(), CannyThresholds::default()).best().unwrap();
        assert_eq!(best.method, Method::Canny);
        assert_eq!(best.count, 0);
    }

    #[test]
    fn test_empty_table_has_no_best() {
        let gray = checkerboard();
        let table = score_with(gray.view(), CannyThresholds::default(), &[]);
        assert!(table.is_empty());
        assert!(matches!(table.best(), Err(EdgeError::EmptyScore)));
    }
}
