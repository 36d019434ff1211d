//! Bagged regression forest
//!
//! Every tree sees a bootstrap sample of the training rows and all features.
//! Tree `i` draws its sample from a generator seeded with `seed + i`, so the
//! fitted forest does not depend on how rayon schedules the trees.

use super::tree::{BinMapper, BinnedMatrix, RegressionTree, TreeParams};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn fit(
        data: &BinnedMatrix,
        mapper: &BinMapper,
        targets: &[f64],
        n_trees: usize,
        params: TreeParams,
        seed: u64,
    ) -> Self {
        let n = data.n_rows();
        let trees: Vec<RegressionTree> = (0..n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(data, mapper, targets, sample, params)
            })
            .collect();

        let feature_importances = mean_normalized_importance(&trees, data.n_features());
        tracing::debug!("Fitted random forest: {} trees", trees.len());

        Self { trees, feature_importances }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Normalised impurity decrease per feature, summing to 1 unless no tree split
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Per-tree importances normalised, averaged, then renormalised
fn mean_normalized_importance(trees: &[RegressionTree], n_features: usize) -> Vec<f64> {
    let mut total = vec![0.0; n_features];
    for tree in trees {
        let decrease = tree.impurity_decrease();
        let sum: f64 = decrease.iter().sum();
        if sum > 0.0 {
            for (t, d) in total.iter_mut().zip(decrease) {
                *t += d / sum;
            }
        }
    }

    let grand: f64 = total.iter().sum();
    if grand > 0.0 {
        total.iter_mut().for_each(|t| *t /= grand);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linear_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..200)
            .map(|i| vec![(i % 10) as f64, (i / 10) as f64, ((i * 7) % 13) as f64])
            .collect();
        let y = rows.iter().map(|r| 3.0 * r[1] + 0.1 * r[0]).collect();
        (rows, y)
    }

    fn params() -> TreeParams {
        TreeParams { max_depth: 6, min_samples_split: 4, min_samples_leaf: 2 }
    }

    #[test]
    fn test_forest_deterministic_and_accurate() {
        let (rows, y) = linear_data();
        let mapper = BinMapper::fit(&rows, 3, 64);
        let data = mapper.transform(&rows);

        let a = RandomForest::fit(&data, &mapper, &y, 20, params(), 7);
        let b = RandomForest::fit(&data, &mapper, &y, 20, params(), 7);
        assert_eq!(a, b);
        assert_eq!(a.n_trees(), 20);

        let pred = a.predict(&[5.0, 10.0, 3.0]);
        assert!((pred - 30.5).abs() < 3.0, "prediction {}", pred);
    }

    #[test]
    fn test_importances_normalized() {
        let (rows, y) = linear_data();
        let mapper = BinMapper::fit(&rows, 3, 64);
        let data = mapper.transform(&rows);
        let forest = RandomForest::fit(&data, &mapper, &y, 10, params(), 1);

        let imp = forest.feature_importances();
        assert_relative_eq!(imp.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(imp[1] > imp[0]);
        assert!(imp[1] > imp[2]);
    }
}
