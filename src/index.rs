use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::feature::FeatureVector;

/// Location of a dataset image relative to the dataset root
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageId {
    pub folder_name: String,
    pub filename: String,
}

impl ImageId {
    pub fn new(folder_name: impl Into<String>, filename: impl Into<String>) -> Self {
        Self { folder_name: folder_name.into(), filename: filename.into() }
    }

    /// Resolve against the dataset root
    pub fn path(&self, root: impl AsRef<Path>) -> PathBuf {
        let mut path = root.as_ref().to_path_buf();
        if !self.folder_name.is_empty() {
            path.push(&self.folder_name);
        }
        path.push(&self.filename);
        path
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub id: ImageId,
    pub features: FeatureVector,
}

impl DatasetRow {
    pub fn new(id: ImageId, features: FeatureVector) -> Self {
        Self { id, features }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedResult<'a> {
    pub row: &'a DatasetRow,
    pub distance: f64,
}

/// Exact nearest neighbor search over a fixed set of feature vectors
#[derive(Debug, Clone, Default)]
pub struct SimilarityIndex {
    rows: Vec<DatasetRow>,
    dim: usize,
}

impl SimilarityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<DatasetRow>) -> Result<Self> {
        let mut index = Self::new();
        index.load(rows)?;
        Ok(index)
    }

    /// Replace the whole dataset.
    ///
    /// All rows must share the same vector length. On error the previous
    /// dataset is kept.
    pub fn load(&mut self, rows: Vec<DatasetRow>) -> Result<()> {
        let dim = rows.first().map(|row| row.features.len()).unwrap_or(0);
        if let Some(row) = rows.iter().find(|row| row.features.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, actual: row.features.len() });
        }
        self.rows = rows;
        self.dim = dim;
        Ok(())
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    /// Vector length of the loaded rows, 0 when empty
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Return the `k` rows closest to `vector` by Euclidean distance.
    ///
    /// Results are sorted by ascending distance, ties keep dataset order.
    /// Returns fewer than `k` results only when the dataset is smaller.
    pub fn query(&self, vector: &[f64], k: usize) -> Result<Vec<RankedResult<'_>>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be positive".to_string()));
        }
        if self.rows.is_empty() {
            return Err(Error::EmptyDataset);
        }
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }

        let mut scored: Vec<(f64, usize)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (euclidean(vector, &row.features), i))
            .collect();

        let k = k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_distance_then_order);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_distance_then_order);

        Ok(scored
            .into_iter()
            .map(|(distance, i)| RankedResult { row: &self.rows[i], distance })
            .collect())
    }
}

fn by_distance_then_order(a: &(f64, usize), b: &(f64, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

/// L2 distance, summed in dimension order
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, features: Vec<f64>) -> DatasetRow {
        DatasetRow::new(ImageId::new("leaf", name), features)
    }

    fn names(results: &[RankedResult]) -> Vec<String> {
        results.iter().map(|r| r.row.id.filename.clone()).collect()
    }

    #[test]
    fn three_row_scenario() {
        let index = SimilarityIndex::from_rows(vec![
            row("v1", vec![3.0, 0.0]),
            row("v2", vec![1.0, 0.0]),
            row("v3", vec![10.0, 0.0]),
        ])
        .unwrap();
        let result = index.query(&[0.0, 0.0], 2).unwrap();
        assert_eq!(names(&result), ["v2", "v1"]);
        assert_eq!(result[0].distance, 1.0);
        assert_eq!(result[1].distance, 3.0);
    }

    #[test]
    fn ties_keep_dataset_order() {
        let index = SimilarityIndex::from_rows(vec![
            row("far", vec![9.0]),
            row("a", vec![1.0]),
            row("b", vec![-1.0]),
            row("c", vec![1.0]),
        ])
        .unwrap();
        let result = index.query(&[0.0], 3).unwrap();
        assert_eq!(names(&result), ["a", "b", "c"]);
        let result = index.query(&[0.0], 2).unwrap();
        assert_eq!(names(&result), ["a", "b"]);
    }

    #[test]
    fn k_larger_than_dataset() {
        let index =
            SimilarityIndex::from_rows(vec![row("a", vec![2.0]), row("b", vec![1.0])]).unwrap();
        let result = index.query(&[0.0], 10).unwrap();
        assert_eq!(names(&result), ["b", "a"]);
    }

    #[test]
    fn errors() {
        let empty = SimilarityIndex::new();
        assert_eq!(empty.query(&[0.0], 1).unwrap_err(), Error::EmptyDataset);

        let index = SimilarityIndex::from_rows(vec![row("a", vec![0.0, 0.0])]).unwrap();
        assert!(matches!(index.query(&[0.0, 0.0], 0), Err(Error::InvalidArgument(_))));
        assert_eq!(
            index.query(&[0.0], 1).unwrap_err(),
            Error::DimensionMismatch { expected: 2, actual: 1 }
        );
    }

    #[test]
    fn load_rejects_ragged_rows_and_keeps_old_data() {
        let mut index = SimilarityIndex::from_rows(vec![row("a", vec![0.0])]).unwrap();
        let err = index.load(vec![row("b", vec![0.0, 1.0]), row("c", vec![0.0])]).unwrap_err();
        assert_eq!(err, Error::DimensionMismatch { expected: 2, actual: 1 });
        assert_eq!(index.len(), 1);
        assert_eq!(index.dim(), 1);
    }

    #[test]
    fn load_replaces_dataset() {
        let mut index = SimilarityIndex::from_rows(vec![row("a", vec![0.0])]).unwrap();
        index.load(vec![row("b", vec![5.0, 5.0]), row("c", vec![1.0, 1.0])]).unwrap();
        assert_eq!(index.dim(), 2);
        assert_eq!(names(&index.query(&[0.0, 0.0], 5).unwrap()), ["c", "b"]);
    }

    #[test]
    fn image_id_path() {
        let id = ImageId::new("Apple___scab", "0001.jpg");
        assert_eq!(id.path("/data"), PathBuf::from("/data/Apple___scab/0001.jpg"));
        assert_eq!(ImageId::new("", "x.png").path("/data"), PathBuf::from("/data/x.png"));
    }
}
