//! CART (Classification and Regression Tree) builder
//!
//! Deterministic exact-greedy regression trees in fixed-point arithmetic.
//! Rows are presorted once per feature; each tree filters the presorted
//! order down to its bootstrap rows and partitions it in place as it splits,
//! so a node is searched in linear time per feature.

use carprice_core::fixed::SCALE;
use carprice_core::forest::{Node, Tree};

use crate::deterministic::SplitTieBreaker;

/// Training parameters for a single tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: u64,
    pub min_samples_leaf: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Column-major copy of the training matrix with a per-feature sort order.
#[derive(Debug, Clone)]
pub struct PresortedFeatures {
    columns: Vec<Vec<i64>>,
    order: Vec<Vec<u32>>,
    rows: usize,
}

impl PresortedFeatures {
    pub fn new(features: &[Vec<i64>], feature_count: usize) -> Self {
        let columns: Vec<Vec<i64>> = (0..feature_count)
            .map(|f| features.iter().map(|row| row[f]).collect())
            .collect();

        let order = columns
            .iter()
            .map(|column| {
                let mut idx: Vec<u32> = (0..features.len() as u32).collect();
                // stable: equal values keep row order
                idx.sort_by_key(|&r| column[r as usize]);
                idx
            })
            .collect();

        Self {
            columns,
            order,
            rows: features.len(),
        }
    }

    pub fn feature_count(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// Split candidate with its score and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: i64,
    /// Entries of the node's sorted range going left
    left_len: usize,
    /// `sl^2/nl + sr^2/nr`; maximizing it minimizes the children's squared error
    score: i128,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn beats(&self, other: &SplitCandidate) -> bool {
        self.score > other.score
            || (self.score == other.score && self.tie_breaker < other.tie_breaker)
    }
}

/// Node awaiting construction: a range of the sorted lists plus where to
/// link it into its parent.
struct Pending {
    lo: usize,
    hi: usize,
    depth: usize,
    parent: Option<(usize, bool)>,
}

/// Weighted count, target sum and target range of a node
struct NodeStats {
    count: u64,
    sum: i128,
    min: i64,
    max: i64,
}

/// Build a regression tree using the exact-greedy CART algorithm
pub struct CartBuilder<'a> {
    data: &'a PresortedFeatures,
    targets: &'a [i64],
    config: TreeConfig,
}

impl<'a> CartBuilder<'a> {
    pub fn new(data: &'a PresortedFeatures, targets: &'a [i64], config: TreeConfig) -> Self {
        Self {
            data,
            targets,
            config,
        }
    }

    /// Grow a tree on rows weighted by `weights` (bootstrap counts).
    ///
    /// Rows with weight 0 are left out. Nodes are numbered in preorder, so
    /// every child index is greater than its parent's.
    pub fn build(&self, weights: &[u32]) -> Tree {
        let mut sorted: Vec<Vec<u32>> = self
            .data
            .order
            .iter()
            .map(|order| {
                order
                    .iter()
                    .copied()
                    .filter(|&r| weights[r as usize] > 0)
                    .collect()
            })
            .collect();

        let Some(len) = sorted.first().map(Vec::len) else {
            let all: Vec<u32> = (0..self.data.rows() as u32)
                .filter(|&r| weights[r as usize] > 0)
                .collect();
            let stats = self.node_stats(&all, weights);
            return Tree::new(vec![Node::leaf(0, leaf_value(&stats))]);
        };

        let mut mask = vec![false; self.data.rows()];
        let mut scratch = Vec::new();
        let mut nodes: Vec<Node> = Vec::new();
        let mut stack = vec![Pending {
            lo: 0,
            hi: len,
            depth: 0,
            parent: None,
        }];

        while let Some(Pending {
            lo,
            hi,
            depth,
            parent,
        }) = stack.pop()
        {
            let idx = nodes.len();
            if let Some((parent_idx, is_left)) = parent {
                let link = &mut nodes[parent_idx];
                if is_left {
                    link.left = idx as i32;
                } else {
                    link.right = idx as i32;
                }
            }

            let stats = self.node_stats(&sorted[0][lo..hi], weights);
            let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
            if depth_reached
                || stats.count < self.config.min_samples_split
                || stats.min == stats.max
            {
                nodes.push(Node::leaf(idx as i32, leaf_value(&stats)));
                continue;
            }

            let Some(split) = self.find_best_split(&sorted, lo, hi, weights, &stats, idx) else {
                nodes.push(Node::leaf(idx as i32, leaf_value(&stats)));
                continue;
            };

            let parent_score = stats.sum.saturating_mul(stats.sum) / stats.count as i128;
            nodes.push(Node::internal(
                idx as i32,
                split.feature_idx as i32,
                split.threshold,
                -1,
                -1,
                gain_in_cents_squared(split.score - parent_score),
            ));

            let mid = lo + split.left_len;
            partition(&mut sorted, &mut mask, &mut scratch, lo, hi, mid, split.feature_idx);

            // right is pushed first so the left subtree is numbered first
            stack.push(Pending {
                lo: mid,
                hi,
                depth: depth + 1,
                parent: Some((idx, false)),
            });
            stack.push(Pending {
                lo,
                hi: mid,
                depth: depth + 1,
                parent: Some((idx, true)),
            });
        }

        Tree::new(nodes)
    }

    fn node_stats(&self, rows: &[u32], weights: &[u32]) -> NodeStats {
        let mut stats = NodeStats {
            count: 0,
            sum: 0,
            min: i64::MAX,
            max: i64::MIN,
        };
        for &row in rows {
            let w = weights[row as usize];
            let y = self.targets[row as usize];
            stats.count += w as u64;
            stats.sum += w as i128 * y as i128;
            stats.min = stats.min.min(y);
            stats.max = stats.max.max(y);
        }
        stats
    }

    /// Best split over all features, scanning each feature's sorted range once.
    fn find_best_split(
        &self,
        sorted: &[Vec<u32>],
        lo: usize,
        hi: usize,
        weights: &[u32],
        stats: &NodeStats,
        node_id: usize,
    ) -> Option<SplitCandidate> {
        let mut best: Option<SplitCandidate> = None;

        for (feature_idx, list) in sorted.iter().enumerate() {
            let column = &self.data.columns[feature_idx];
            let range = &list[lo..hi];

            let mut nl = 0u64;
            let mut sl = 0i128;
            for (i, pair) in range.windows(2).enumerate() {
                let row = pair[0] as usize;
                let w = weights[row];
                nl += w as u64;
                sl += w as i128 * self.targets[row] as i128;

                let x = column[row];
                let next = column[pair[1] as usize];
                if x == next {
                    continue;
                }

                let nr = stats.count - nl;
                if nl < self.config.min_samples_leaf || nr < self.config.min_samples_leaf {
                    continue;
                }

                let sr = stats.sum - sl;
                let score =
                    sl.saturating_mul(sl) / nl as i128 + sr.saturating_mul(sr) / nr as i128;
                let threshold = x + ((next as i128 - x as i128) / 2) as i64;

                let candidate = SplitCandidate {
                    feature_idx,
                    threshold,
                    left_len: i + 1,
                    score,
                    tie_breaker: SplitTieBreaker::new(feature_idx, threshold, node_id),
                };
                if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }
}

/// Weighted mean target (fixed-point)
fn leaf_value(stats: &NodeStats) -> i64 {
    if stats.count == 0 {
        return 0;
    }
    (stats.sum / stats.count as i128) as i64
}

/// Fixed-point units per cent
const UNITS_PER_CENT: i128 = SCALE as i128 / 100;

/// Squared-error reduction converted from scale^2 units to cents^2,
/// saturating at `i64::MAX`.
fn gain_in_cents_squared(raw: i128) -> i64 {
    let scaled = raw.max(0) / (UNITS_PER_CENT * UNITS_PER_CENT);
    i64::try_from(scaled).unwrap_or(i64::MAX)
}

/// Stable in-place partition of `[lo, hi)` in every feature list: rows going
/// left (the first `mid - lo` entries of the split feature's list) come first.
fn partition(
    sorted: &mut [Vec<u32>],
    mask: &mut [bool],
    scratch: &mut Vec<u32>,
    lo: usize,
    hi: usize,
    mid: usize,
    split_feature: usize,
) {
    for &row in &sorted[split_feature][lo..mid] {
        mask[row as usize] = true;
    }

    for (f, list) in sorted.iter_mut().enumerate() {
        if f == split_feature {
            continue;
        }
        scratch.clear();
        let segment = &mut list[lo..hi];
        let mut write = 0;
        for i in 0..segment.len() {
            let row = segment[i];
            if mask[row as usize] {
                segment[write] = row;
                write += 1;
            } else {
                scratch.push(row);
            }
        }
        segment[write..].copy_from_slice(&scratch[..]);
    }

    for &row in &sorted[split_feature][lo..mid] {
        mask[row as usize] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(features: &[Vec<i64>], targets: &[i64], config: TreeConfig) -> Tree {
        let width = features.first().map_or(0, Vec::len);
        let data = PresortedFeatures::new(features, width);
        let weights = vec![1; features.len()];
        CartBuilder::new(&data, targets, config).build(&weights)
    }

    #[test]
    fn test_single_split_on_informative_feature() {
        // feature 1 is noise, feature 0 separates the targets
        let features = vec![
            vec![1 * SCALE, 9 * SCALE],
            vec![2 * SCALE, 1 * SCALE],
            vec![3 * SCALE, 8 * SCALE],
            vec![4 * SCALE, 2 * SCALE],
        ];
        let targets = vec![100 * SCALE, 100 * SCALE, 300 * SCALE, 300 * SCALE];

        let tree = build(&features, &targets, TreeConfig::default());
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.nodes[0].feature_idx, 0);
        assert_eq!(tree.nodes[0].threshold, 2 * SCALE + SCALE / 2);
        // SSE drops from 4 * $100^2 (4 * 10_000^2 cents^2) to 0
        assert_eq!(tree.nodes[0].gain, 400_000_000);
        assert!(tree.validate(2).is_ok());

        assert_eq!(tree.evaluate(&[2 * SCALE, 0]), 100 * SCALE);
        assert_eq!(tree.evaluate(&[3 * SCALE, 0]), 300 * SCALE);
    }

    #[test]
    fn test_sub_dollar_split_keeps_its_gain() {
        let features = vec![vec![SCALE], vec![2 * SCALE]];
        let targets = vec![SCALE / 2, 6 * SCALE / 10];

        let tree = build(&features, &targets, TreeConfig::default());
        assert_eq!(tree.split_count(), 1);
        // SSE drops from 2 * 5^2 cents^2 to 0
        assert_eq!(tree.nodes[0].gain, 50);
    }

    #[test]
    fn test_full_depth_fits_training_data() {
        let features: Vec<Vec<i64>> = (0..16).map(|i| vec![i * SCALE, (i % 3) * SCALE]).collect();
        let targets: Vec<i64> = (0..16).map(|i| ((i * 7) % 5) * 1_000 * SCALE).collect();

        let tree = build(&features, &targets, TreeConfig::default());
        assert!(tree.validate(2).is_ok());
        for (row, &target) in features.iter().zip(&targets) {
            assert_eq!(tree.evaluate(row), target);
        }
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let features: Vec<Vec<i64>> = (0..16).map(|i| vec![i * SCALE]).collect();
        let targets: Vec<i64> = (0..16).map(|i| i * SCALE).collect();
        let config = TreeConfig {
            max_depth: Some(1),
            ..TreeConfig::default()
        };

        let tree = build(&features, &targets, config);
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.split_count(), 1);
    }

    #[test]
    fn test_constant_features_yield_leaf() {
        let features = vec![vec![5 * SCALE]; 4];
        let targets = vec![1 * SCALE, 2 * SCALE, 3 * SCALE, 6 * SCALE];

        let tree = build(&features, &targets, TreeConfig::default());
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].leaf, Some(3 * SCALE));
    }

    #[test]
    fn test_weights_act_as_repeated_rows() {
        let features = vec![vec![0], vec![SCALE], vec![2 * SCALE]];
        let targets = vec![10 * SCALE, 20 * SCALE, 60 * SCALE];
        let data = PresortedFeatures::new(&features, 1);

        // row 2 left out, row 0 drawn three times
        let tree = CartBuilder::new(&data, &targets, TreeConfig {
            max_depth: Some(0),
            ..TreeConfig::default()
        })
        .build(&[3, 1, 0]);
        assert_eq!(tree.nodes, vec![Node::leaf(0, 12_500_000)]);
    }

    #[test]
    fn test_tie_prefers_lower_feature() {
        // both features separate the targets identically
        let features = vec![vec![0, 0], vec![SCALE, SCALE]];
        let targets = vec![0, 10 * SCALE];

        let tree = build(&features, &targets, TreeConfig::default());
        assert_eq!(tree.nodes[0].feature_idx, 0);
    }

    #[test]
    fn test_leaf_only_tree_without_features() {
        let features = vec![vec![], vec![]];
        let targets = vec![2 * SCALE, 4 * SCALE];
        let tree = build(&features, &targets, TreeConfig::default());
        assert_eq!(tree.nodes, vec![Node::leaf(0, 3 * SCALE)]);
    }
}
