//! Histogram Regression Trees
//!
//! CART regression trees grown on quantile-binned features. Each feature is
//! cut into at most `max_bins` bins once, before any tree is grown; split
//! search then scans per-bin (count, sum) histograms instead of sorted
//! values.
//!
//! A split on bin `b` sends a row left when its bin is `<= b`, which for raw
//! values means `x <= threshold(b)`. Trees store both, so they predict from
//! either binned training rows or raw rows.

use serde::{Deserialize, Serialize};

/// Minimum squared-error reduction accepted for a split
const MIN_GAIN: f64 = 1e-12;

// ============================================================================
// Binning
// ============================================================================

/// Per-feature bin thresholds fitted on the training rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinMapper {
    /// `thresholds[f]` is sorted; bin `b` covers `(t[b-1], t[b]]`
    thresholds: Vec<Vec<f64>>,
}

impl BinMapper {
    /// Fit cut points; `max_bins` must lie in [2, 256]
    pub fn fit(rows: &[Vec<f64>], n_features: usize, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, 256);
        let thresholds = (0..n_features)
            .map(|f| {
                let mut values: Vec<f64> = rows.iter().map(|r| r[f]).collect();
                values.sort_by(|a, b| a.total_cmp(b));
                values.dedup();
                Self::cut_points(&values, max_bins)
            })
            .collect();
        Self { thresholds }
    }

    fn cut_points(unique: &[f64], max_bins: usize) -> Vec<f64> {
        if unique.len() <= 1 {
            return Vec::new();
        }
        let midpoint = |i: usize| 0.5 * (unique[i - 1] + unique[i]);

        if unique.len() <= max_bins {
            return (1..unique.len()).map(midpoint).collect();
        }

        let mut cuts: Vec<f64> = (1..max_bins)
            .map(|k| midpoint((k * unique.len() / max_bins).max(1)))
            .collect();
        cuts.dedup();
        cuts
    }

    pub fn n_features(&self) -> usize {
        self.thresholds.len()
    }

    pub fn n_bins(&self, feature: usize) -> usize {
        self.thresholds[feature].len() + 1
    }

    #[inline]
    pub fn bin(&self, feature: usize, value: f64) -> u8 {
        self.thresholds[feature].partition_point(|t| *t < value) as u8
    }

    pub fn threshold(&self, feature: usize, bin: u8) -> f64 {
        self.thresholds[feature][bin as usize]
    }

    /// Bin every row, column-major
    pub fn transform(&self, rows: &[Vec<f64>]) -> BinnedMatrix {
        let columns = (0..self.n_features())
            .map(|f| rows.iter().map(|r| self.bin(f, r[f])).collect())
            .collect();
        let n_bins = (0..self.n_features()).map(|f| self.n_bins(f)).collect();
        BinnedMatrix { columns, n_bins, n_rows: rows.len() }
    }
}

/// Training rows as bin indices, one column per feature
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    columns: Vec<Vec<u8>>,
    n_bins: Vec<usize>,
    n_rows: usize,
}

impl BinnedMatrix {
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn get(&self, row: usize, feature: usize) -> u8 {
        self.columns[feature][row]
    }
}

// ============================================================================
// Tree
// ============================================================================

/// Growth limits for one tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        bin: u8,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Fitted regression tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    /// Squared-error reduction attributed to each feature
    impurity_decrease: Vec<f64>,
}

struct SplitCandidate {
    feature: usize,
    bin: u8,
    gain: f64,
}

struct Builder<'a> {
    data: &'a BinnedMatrix,
    mapper: &'a BinMapper,
    targets: &'a [f64],
    params: TreeParams,
    nodes: Vec<Node>,
    impurity_decrease: Vec<f64>,
}

impl<'a> Builder<'a> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let n = rows.len();
        let sum: f64 = rows.iter().map(|&r| self.targets[r]).sum();
        let mean = if n == 0 { 0.0 } else { sum / n as f64 };

        let can_split = depth < self.params.max_depth
            && n >= self.params.min_samples_split
            && n >= 2 * self.params.min_samples_leaf;

        let split = if can_split { self.best_split(&rows, sum) } else { None };
        let Some(split) = split else {
            self.nodes.push(Node::Leaf(mean));
            return self.nodes.len() - 1;
        };

        self.impurity_decrease[split.feature] += split.gain;

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| self.data.get(r, split.feature) <= split.bin);

        // Reserve the slot so children land after their parent
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf(mean));
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);

        self.nodes[index] = Node::Split {
            feature: split.feature,
            bin: split.bin,
            threshold: self.mapper.threshold(split.feature, split.bin),
            left,
            right,
        };
        index
    }

    fn best_split(&self, rows: &[usize], total: f64) -> Option<SplitCandidate> {
        let n = rows.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent = total * total / n as f64;
        let mut best: Option<SplitCandidate> = None;

        for feature in 0..self.data.n_features() {
            let n_bins = self.data.n_bins[feature];
            if n_bins < 2 {
                continue;
            }

            let mut counts = vec![0usize; n_bins];
            let mut sums = vec![0.0f64; n_bins];
            for &r in rows {
                let b = self.data.get(r, feature) as usize;
                counts[b] += 1;
                sums[b] += self.targets[r];
            }

            let (mut n_left, mut s_left) = (0usize, 0.0f64);
            for b in 0..n_bins - 1 {
                n_left += counts[b];
                s_left += sums[b];
                if counts[b] == 0 || n_left < min_leaf {
                    continue;
                }
                let n_right = n - n_left;
                if n_right < min_leaf {
                    break;
                }
                let s_right = total - s_left;
                let gain = s_left * s_left / n_left as f64 + s_right * s_right / n_right as f64 - parent;

                if gain > MIN_GAIN && best.as_ref().map_or(true, |c| gain > c.gain) {
                    best = Some(SplitCandidate { feature, bin: b as u8, gain });
                }
            }
        }

        best
    }
}

impl RegressionTree {
    /// Grow a tree on the given training rows (duplicates allowed)
    pub fn fit(
        data: &BinnedMatrix,
        mapper: &BinMapper,
        targets: &[f64],
        rows: Vec<usize>,
        params: TreeParams,
    ) -> Self {
        let mut builder = Builder {
            data,
            mapper,
            targets,
            params,
            nodes: Vec::new(),
            impurity_decrease: vec![0.0; data.n_features()],
        };
        builder.grow(rows, 0);
        Self {
            nodes: builder.nodes,
            impurity_decrease: builder.impurity_decrease,
        }
    }

    /// Predict a raw (unbinned) row
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf(value) => return *value,
                Node::Split { feature, threshold, left, right, .. } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Predict a training row by its bins
    pub fn predict_binned(&self, data: &BinnedMatrix, row: usize) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf(value) => return *value,
                Node::Split { feature, bin, left, right, .. } => {
                    index = if data.get(row, *feature) <= *bin { *left } else { *right };
                }
            }
        }
    }

    pub fn impurity_decrease(&self) -> &[f64] {
        &self.impurity_decrease
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y depends on feature 1 only
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![(i % 7) as f64, i as f64]).collect();
        let y = rows.iter().map(|r| if r[1] < 20.0 { 10.0 } else { 30.0 }).collect();
        (rows, y)
    }

    #[test]
    fn test_bin_mapper_thresholds() {
        let rows: Vec<Vec<f64>> = vec![vec![1.0], vec![2.0], vec![2.0], vec![4.0]];
        let mapper = BinMapper::fit(&rows, 1, 64);
        assert_eq!(mapper.n_bins(0), 3);
        assert_eq!(mapper.bin(0, 1.0), 0);
        assert_eq!(mapper.bin(0, 2.0), 1);
        assert_eq!(mapper.bin(0, 3.5), 2);
        assert_relative_eq!(mapper.threshold(0, 0), 1.5);
    }

    #[test]
    fn test_bin_mapper_caps_bins() {
        let rows: Vec<Vec<f64>> = (0..1000).map(|i| vec![i as f64]).collect();
        let mapper = BinMapper::fit(&rows, 1, 16);
        assert!(mapper.n_bins(0) <= 16);
        assert!(mapper.n_bins(0) > 8);
    }

    #[test]
    fn test_tree_learns_step() {
        let (rows, y) = step_data();
        let mapper = BinMapper::fit(&rows, 2, 64);
        let data = mapper.transform(&rows);
        let params = TreeParams { max_depth: 3, min_samples_split: 2, min_samples_leaf: 1 };
        let tree = RegressionTree::fit(&data, &mapper, &y, (0..rows.len()).collect(), params);

        assert_relative_eq!(tree.predict(&[3.0, 5.0]), 10.0);
        assert_relative_eq!(tree.predict(&[3.0, 35.0]), 30.0);
        assert_relative_eq!(tree.predict_binned(&data, 25), 30.0);
        // All reduction goes to the informative feature
        assert_relative_eq!(tree.impurity_decrease()[0], 0.0);
        assert!(tree.impurity_decrease()[1] > 0.0);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_depth_and_leaf_limits() {
        let rows: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..64).map(|i| (i * i) as f64).collect();
        let mapper = BinMapper::fit(&rows, 1, 64);
        let data = mapper.transform(&rows);

        let params = TreeParams { max_depth: 2, min_samples_split: 2, min_samples_leaf: 1 };
        let tree = RegressionTree::fit(&data, &mapper, &y, (0..64).collect(), params);
        assert_eq!(tree.depth(), 2);

        let params = TreeParams { max_depth: 10, min_samples_split: 2, min_samples_leaf: 40 };
        let tree = RegressionTree::fit(&data, &mapper, &y, (0..64).collect(), params);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y = vec![5.0; 10];
        let mapper = BinMapper::fit(&rows, 1, 8);
        let data = mapper.transform(&rows);
        let params = TreeParams { max_depth: 5, min_samples_split: 2, min_samples_leaf: 1 };
        let tree = RegressionTree::fit(&data, &mapper, &y, (0..10).collect(), params);
        assert_eq!(tree.node_count(), 1);
        assert_relative_eq!(tree.predict(&[100.0]), 5.0);
    }
}
