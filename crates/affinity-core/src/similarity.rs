//! Pairwise cosine similarity
//!
//! Computes dense, symmetric similarity matrices from sparse row vectors.
//! The same routine serves user-user, item-item (collaborative) and
//! item-item (content) similarity.

use crate::{
    aggregator::SparseRow,
    types::{rank, Scored},
};
use ndarray::{Array2, ArrayView1};
use std::collections::HashMap;
use std::hash::Hash;

/// Dot product of two sparse rows sorted by column
pub fn sparse_dot(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut dot = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot
}

fn sparse_norm(row: &[(usize, f64)]) -> f64 {
    row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt()
}

/// Cosine similarity of two sparse rows; 0 when either is all-zero
pub fn cosine_similarity(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let norm_a = sparse_norm(a);
    let norm_b = sparse_norm(b);
    if norm_a > 0.0 && norm_b > 0.0 {
        sparse_dot(a, b) / (norm_a * norm_b)
    } else {
        0.0
    }
}

/// Symmetric similarity matrix indexed by subject id
#[derive(Debug, Clone)]
pub struct SimilarityMatrix<K> {
    ids: Vec<K>,
    index: HashMap<K, usize>,
    values: Array2<f64>,
}

impl<K: Copy + Eq + Hash + Ord> SimilarityMatrix<K> {
    /// Matrix with no subjects
    pub fn empty() -> Self {
        Self {
            ids: Vec::new(),
            index: HashMap::new(),
            values: Array2::zeros((0, 0)),
        }
    }

    /// Cosine similarity between every pair of rows
    ///
    /// `ids[i]` names `rows[i]`. Rows are expected to be non-negative, so
    /// results are clamped into [0, 1] to absorb rounding. The diagonal is 1.0,
    /// or 0.0 for an all-zero row.
    pub fn cosine(ids: Vec<K>, rows: &[SparseRow]) -> Self {
        debug_assert_eq!(ids.len(), rows.len(), "one id per row");

        let n = rows.len();
        let norms: Vec<f64> = rows.iter().map(|r| sparse_norm(r)).collect();
        let mut values = Array2::<f64>::zeros((n, n));

        for i in 0..n {
            if norms[i] == 0.0 {
                continue;
            }
            values[[i, i]] = 1.0;
            for j in (i + 1)..n {
                if norms[j] == 0.0 {
                    continue;
                }
                let sim = (sparse_dot(&rows[i], &rows[j]) / (norms[i] * norms[j])).clamp(0.0, 1.0);
                values[[i, j]] = sim;
                values[[j, i]] = sim;
            }
        }

        let index = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        Self { ids, index, values }
    }

    /// Subject ids in row order
    pub fn ids(&self) -> &[K] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: K) -> bool {
        self.index.contains_key(&id)
    }

    pub fn position(&self, id: K) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Similarity of two subjects
    pub fn get(&self, a: K, b: K) -> Option<f64> {
        Some(self.values[[self.position(a)?, self.position(b)?]])
    }

    /// Full similarity row of a subject
    pub fn row(&self, id: K) -> Option<ArrayView1<'_, f64>> {
        self.position(id).map(|i| self.values.row(i))
    }

    /// Underlying dense matrix
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Most similar subjects, excluding `id` itself and anything below
    /// `threshold`, in ranking order, at most `limit`
    pub fn most_similar(&self, id: K, threshold: f64, limit: usize) -> Vec<Scored<K>> {
        let Some(row) = self.row(id) else {
            return Vec::new();
        };

        let mut scored: Vec<Scored<K>> = row
            .iter()
            .zip(self.ids.iter())
            .filter(|(sim, other)| **other != id && **sim >= threshold && **sim > 0.0)
            .map(|(sim, other)| Scored::new(*other, *sim))
            .collect();

        rank(&mut scored);
        scored.truncate(limit);
        scored
    }
}

impl<K: Copy + Eq + Hash + Ord> Default for SimilarityMatrix<K> {
    fn default() -> Self {
        Self::empty()
    }
}
