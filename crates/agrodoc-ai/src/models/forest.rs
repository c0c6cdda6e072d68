//! Random forest of Gini CART trees grown on bootstrap samples.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

const N_TREES: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<Tree>,
    importances: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum Node {
    Leaf {
        /// Fraction of `valid` samples that reached this leaf.
        p_valid: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

impl RandomForest {
    /// Grow 100 fully-developed trees. Each split considers `⌊√features⌋`
    /// randomly chosen features.
    pub fn fit(rows: &[Vec<f64>], labels: &[bool], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        let max_features = ((dim as f64).sqrt() as usize).max(1);
        let n = rows.len();

        let mut trees = Vec::with_capacity(N_TREES);
        let mut importances = vec![0.0; dim];

        for _ in 0..N_TREES {
            let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
            let mut tree_importance = vec![0.0; dim];
            let tree = grow_tree(rows, labels, sample, max_features, &mut rng, &mut tree_importance);

            let total: f64 = tree_importance.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&tree_importance) {
                    *acc += v / total;
                }
            }
            trees.push(tree);
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for v in &mut importances {
                *v /= total;
            }
        }

        debug!(
            trees = trees.len(),
            nodes = trees.iter().map(|t| t.nodes.len()).sum::<usize>(),
            "fitted random forest"
        );
        Self { trees, importances }
    }

    /// Mean of the per-tree leaf probabilities.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Normalized mean impurity decrease per feature. Sums to 1 unless no
    /// tree ever split.
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }
}

impl Tree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { p_valid } => return *p_valid,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

// ── Tree growth ──

struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Weighted child impurity.
    impurity: f64,
}

fn grow_tree(
    rows: &[Vec<f64>],
    labels: &[bool],
    sample: Vec<usize>,
    max_features: usize,
    rng: &mut StdRng,
    importance: &mut [f64],
) -> Tree {
    let total = sample.len().max(1) as f64;
    let dim = importance.len();
    let mut nodes = vec![Node::Leaf { p_valid: 0.5 }];
    // (node index, samples reaching it)
    let mut pending = vec![(0usize, sample)];
    let mut features: Vec<usize> = (0..dim).collect();

    while let Some((node_idx, idx)) = pending.pop() {
        let positives = idx.iter().filter(|&&i| labels[i]).count();
        let p_valid = if idx.is_empty() {
            0.5
        } else {
            positives as f64 / idx.len() as f64
        };
        let impurity = gini(positives, idx.len());

        if idx.len() < 2 || impurity <= f64::EPSILON {
            nodes[node_idx] = Node::Leaf { p_valid };
            continue;
        }

        features.shuffle(rng);
        let Some(best) = best_split(rows, labels, &idx, &features, max_features) else {
            nodes[node_idx] = Node::Leaf { p_valid };
            continue;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
            .iter()
            .partition(|&&i| rows[i][best.feature] <= best.threshold);

        let n_node = idx.len() as f64;
        importance[best.feature] += n_node / total * (impurity - best.impurity);

        let left = nodes.len();
        nodes.push(Node::Leaf { p_valid });
        let right = nodes.len();
        nodes.push(Node::Leaf { p_valid });
        nodes[node_idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        pending.push((left, left_idx));
        pending.push((right, right_idx));
    }

    Tree { nodes }
}

/// Scan features in the given order until `max_features` non-constant ones
/// have been evaluated; return the lowest-impurity threshold among them.
fn best_split(
    rows: &[Vec<f64>],
    labels: &[bool],
    idx: &[usize],
    features: &[usize],
    max_features: usize,
) -> Option<BestSplit> {
    let n = idx.len();
    let total_pos = idx.iter().filter(|&&i| labels[i]).count();
    let mut best: Option<BestSplit> = None;
    let mut evaluated = 0;

    let mut values: Vec<(f64, bool)> = Vec::with_capacity(n);
    for &feature in features {
        if evaluated >= max_features {
            break;
        }
        values.clear();
        values.extend(idx.iter().map(|&i| (rows[i][feature], labels[i])));
        values.sort_by(|a, b| a.0.total_cmp(&b.0));
        if values[0].0 == values[n - 1].0 {
            continue;
        }
        evaluated += 1;

        let mut left_pos = 0;
        for k in 0..n - 1 {
            if values[k].1 {
                left_pos += 1;
            }
            if values[k].0 == values[k + 1].0 {
                continue;
            }
            let n_left = k + 1;
            let n_right = n - n_left;
            let weighted = (n_left as f64 * gini(left_pos, n_left)
                + n_right as f64 * gini(total_pos - left_pos, n_right))
                / n as f64;
            if best.as_ref().is_none_or(|b| weighted < b.impurity) {
                let (lo, hi) = (values[k].0, values[k + 1].0);
                let mut threshold = lo + (hi - lo) / 2.0;
                // Adjacent floats: the midpoint rounds up to `hi`.
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    impurity: weighted,
                });
            }
        }
    }

    best
}

fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}
