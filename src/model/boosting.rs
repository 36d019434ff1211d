//! Gradient-boosted regression trees
//!
//! Squared-error boosting: start from the target mean, then fit each tree to
//! the current residuals and add it scaled by the learning rate.

use super::tree::{BinMapper, BinnedMatrix, RegressionTree, TreeParams};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn fit(
        data: &BinnedMatrix,
        mapper: &BinMapper,
        targets: &[f64],
        n_trees: usize,
        learning_rate: f64,
        params: TreeParams,
    ) -> Self {
        let n = data.n_rows();
        let init = if n == 0 { 0.0 } else { targets.iter().sum::<f64>() / n as f64 };
        let mut current = vec![init; n];
        let mut trees = Vec::with_capacity(n_trees);

        for _ in 0..n_trees {
            let residuals: Vec<f64> = targets.iter().zip(&current).map(|(y, p)| y - p).collect();
            let tree = RegressionTree::fit(data, mapper, &residuals, (0..n).collect(), params);
            for (row, p) in current.iter_mut().enumerate() {
                *p += learning_rate * tree.predict_binned(data, row);
            }
            trees.push(tree);
        }

        tracing::debug!("Fitted gradient boosting: {} trees, lr {}", trees.len(), learning_rate);
        Self { init, learning_rate, trees }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.init + self.learning_rate * self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
