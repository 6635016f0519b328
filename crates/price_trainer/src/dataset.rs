//! In-memory training dataset
//!
//! Holds fixed-point feature rows and targets and provides the seeded
//! train/test split.

use crate::deterministic::{shuffle, LcgRng};
use crate::errors::TrainerError;

/// Training dataset with integer features and targets
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub features: Vec<Vec<i64>>,
    pub targets: Vec<i64>,
    pub feature_count: usize,
}

impl Dataset {
    /// Build a dataset, checking that every row has the same width and a target.
    pub fn new(features: Vec<Vec<i64>>, targets: Vec<i64>) -> Result<Self, TrainerError> {
        if features.len() != targets.len() {
            return Err(TrainerError::Dataset(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }

        let feature_count = features.first().map_or(0, Vec::len);
        if let Some((idx, row)) = features
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != feature_count)
        {
            return Err(TrainerError::Dataset(format!(
                "Row {}: expected {} features, got {}",
                idx,
                feature_count,
                row.len()
            )));
        }

        Ok(Self {
            features,
            targets,
            feature_count,
        })
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Rows at `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
            feature_count: self.feature_count,
        }
    }

    /// Seeded train/test partition.
    ///
    /// Row order is shuffled with an LCG seeded by `seed`; the first
    /// `ceil(n * test_fraction)` rows (at least one, leaving at least one
    /// training row) become the test partition.
    pub fn split(&self, test_fraction: f64, seed: u64) -> Result<(Dataset, Dataset), TrainerError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(TrainerError::InvalidParams(format!(
                "test_fraction must be in (0, 1), got {test_fraction}"
            )));
        }
        let n = self.len();
        if n < 2 {
            return Err(TrainerError::Dataset(format!(
                "need at least 2 rows to split, got {n}"
            )));
        }

        let n_test = ((n as f64 * test_fraction).ceil() as usize).clamp(1, n - 1);
        let mut order: Vec<usize> = (0..n).collect();
        shuffle(&mut order, &mut LcgRng::new(seed));

        let (test, train) = order.split_at(n_test);
        Ok((self.subset(train), self.subset(test)))
    }

    /// Per-feature (min, max)
    pub fn feature_stats(&self) -> Vec<(i64, i64)> {
        let mut stats = vec![(i64::MAX, i64::MIN); self.feature_count];

        for row in &self.features {
            for (i, &val) in row.iter().enumerate() {
                stats[i].0 = stats[i].0.min(val);
                stats[i].1 = stats[i].1.max(val);
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: i64) -> Dataset {
        Dataset::new(
            (0..n).map(|i| vec![i * 100, 1_000 - i]).collect(),
            (0..n).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = Dataset::new(vec![vec![1, 2], vec![3]], vec![1, 2]).unwrap_err();
        assert!(matches!(err, TrainerError::Dataset(_)));

        let err = Dataset::new(vec![vec![1]], vec![1, 2]).unwrap_err();
        assert!(matches!(err, TrainerError::Dataset(_)));
    }

    #[test]
    fn test_split_sizes() {
        let data = dataset(10);
        let (train, test) = data.split(0.2, 42).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);

        // ceil(7 * 0.2) = 2
        let (train, test) = dataset(7).split(0.2, 42).unwrap();
        assert_eq!((train.len(), test.len()), (5, 2));

        // clamped so both sides are non-empty
        let (train, test) = dataset(2).split(0.01, 42).unwrap();
        assert_eq!((train.len(), test.len()), (1, 1));
        let (train, test) = dataset(3).split(0.99, 42).unwrap();
        assert_eq!((train.len(), test.len()), (1, 2));
    }

    #[test]
    fn test_split_is_seeded_partition() {
        let data = dataset(50);
        let (train1, test1) = data.split(0.2, 42).unwrap();
        let (train2, test2) = data.split(0.2, 42).unwrap();
        assert_eq!(train1, train2);
        assert_eq!(test1, test2);

        let (_, test3) = data.split(0.2, 7).unwrap();
        assert_ne!(test1.targets, test3.targets);

        let mut all: Vec<i64> = train1.targets.iter().chain(&test1.targets).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rejects_bad_input() {
        assert!(matches!(
            dataset(10).split(0.0, 42),
            Err(TrainerError::InvalidParams(_))
        ));
        assert!(matches!(
            dataset(10).split(1.0, 42),
            Err(TrainerError::InvalidParams(_))
        ));
        assert!(matches!(
            dataset(1).split(0.2, 42),
            Err(TrainerError::Dataset(_))
        ));
    }

    #[test]
    fn test_feature_stats() {
        let stats = dataset(3).feature_stats();
        assert_eq!(stats, vec![(0, 200), (998, 1_000)]);
    }
}
