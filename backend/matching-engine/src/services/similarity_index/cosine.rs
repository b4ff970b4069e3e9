//! Brute-force cosine k-NN over a dense row matrix, shared by the learner,
//! resource and interaction indexes.

use super::{sort_neighbors, Neighbor};
use crate::error::{MatchingError, Result};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, Axis};
use std::collections::{BTreeSet, HashMap};

pub(crate) struct CosineIndex {
    pub(crate) ids: Vec<String>,
    positions: HashMap<String, usize>,
    vectors: Array2<f64>,
    row_norms: Array1<f64>,
    mean: Array1<f64>,
    scale: Array1<f64>,
    pub(crate) trained_at: DateTime<Utc>,
}

impl CosineIndex {
    /// `rows` are `(id, vector)` pairs of equal length `dim`; the first
    /// occurrence of an id wins. With `standardize`, columns are centered and
    /// scaled by their population std (zero std scales by 1).
    pub(crate) fn build<I>(rows: I, dim: usize, standardize: bool) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vec<f64>)>,
    {
        let mut ids = Vec::new();
        let mut positions = HashMap::new();
        let mut flat = Vec::new();

        for (id, vector) in rows {
            if positions.contains_key(&id) {
                continue;
            }
            if vector.len() != dim {
                return Err(MatchingError::InvalidInput(format!(
                    "row {id} has {} columns, expected {dim}",
                    vector.len()
                )));
            }
            positions.insert(id.clone(), ids.len());
            ids.push(id);
            flat.extend(vector);
        }

        let raw = Array2::from_shape_vec((ids.len(), dim), flat)?;

        let (mean, scale) = if standardize {
            let mean = raw
                .mean_axis(Axis(0))
                .ok_or_else(|| MatchingError::InvalidInput("empty feature matrix".to_string()))?;
            let scale = raw
                .std_axis(Axis(0), 0.0)
                .mapv(|std| if std > 0.0 { std } else { 1.0 });
            (mean, scale)
        } else {
            (Array1::zeros(dim), Array1::ones(dim))
        };

        let vectors = (&raw - &mean) / &scale;
        let row_norms = vectors.map_axis(Axis(1), |row| row.dot(&row).sqrt());

        Ok(Self {
            ids,
            positions,
            vectors,
            row_norms,
            mean,
            scale,
            trained_at: Utc::now(),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Raw (unprojected) row stored for `id`.
    pub(crate) fn row(&self, id: &str) -> Option<Array1<f64>> {
        self.positions
            .get(id)
            .map(|&i| &self.vectors.row(i) * &self.scale + &self.mean)
    }

    pub(crate) fn similarities(&self, query: &Array1<f64>) -> Array1<f64> {
        let standardized = (query - &self.mean) / &self.scale;
        let query_norm = standardized.dot(&standardized).sqrt();
        let dots = self.vectors.dot(&standardized);

        let mut sims = Array1::zeros(self.ids.len());
        for (i, dot) in dots.iter().enumerate() {
            let denom = self.row_norms[i] * query_norm;
            // zero vectors are treated as orthogonal to everything
            sims[i] = if denom > 0.0 { dot / denom } else { 0.0 };
        }
        sims
    }

    /// Top `k` rows by similarity to `query`, skipping `exclude`.
    pub(crate) fn nearest(&self, query: &Array1<f64>, k: usize, exclude: &BTreeSet<&str>) -> Vec<Neighbor> {
        let sims = self.similarities(query);
        let mut neighbors: Vec<Neighbor> = self
            .ids
            .iter()
            .zip(sims.iter())
            .filter(|(id, _)| !exclude.contains(id.as_str()))
            .map(|(id, sim)| Neighbor {
                id: id.clone(),
                similarity: *sim,
            })
            .collect();

        sort_neighbors(&mut neighbors);
        neighbors.truncate(k);
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<(String, Vec<f64>)> {
        vec![
            ("a".to_string(), vec![1.0, 0.0]),
            ("b".to_string(), vec![2.0, 0.1]),
            ("c".to_string(), vec![0.0, 1.0]),
            ("a".to_string(), vec![9.0, 9.0]),
        ]
    }

    #[test]
    fn test_raw_cosine_without_standardizing() {
        let index = CosineIndex::build(rows(), 2, false).unwrap();
        assert_eq!(index.len(), 3);

        let query = Array1::from_vec(vec![1.0, 0.0]);
        let nearest = index.nearest(&query, 2, &BTreeSet::from(["a"]));
        assert_eq!(nearest[0].id, "b");
        assert_eq!(nearest.len(), 2);
        assert_eq!(index.row("a").unwrap().to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_zero_query_scores_zero() {
        let index = CosineIndex::build(rows(), 2, false).unwrap();
        let sims = index.similarities(&Array1::zeros(2));
        assert!(sims.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let ragged = vec![("a".to_string(), vec![1.0])];
        assert!(matches!(
            CosineIndex::build(ragged, 2, true),
            Err(MatchingError::InvalidInput(_))
        ));
    }
}
