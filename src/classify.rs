use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PloidyError, Result};
use crate::utils::argmax;

/// Fit/predict contract for per-sample condition classifiers.
pub trait Classifier: Sized {
    type Params;

    fn fit(features: ArrayView2<f64>, labels: &[String], params: &Self::Params) -> Result<Self>;

    fn predict(&self, features: ArrayView2<f64>) -> Result<Vec<String>>;
}

/// Aggregate per-sample features and the label they predict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSet {
    /// Summaries of the 2-state read-count decode.
    TwoState,
    /// Summaries of the 7-state decodes, with a paternal-trisomy share.
    SevenState,
}

impl FeatureSet {
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            FeatureSet::TwoState => &["coverage", "fetal_fraction", "euploidy", "trisomy"],
            FeatureSet::SevenState => &[
                "coverage",
                "fetal_fraction",
                "euploidy",
                "trisomy",
                "paternal_trisomy",
            ],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FeatureSet::TwoState => "condition",
            FeatureSet::SevenState => "genotype",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Seeds the order in which features are tried at each node.
    pub random_state: u64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_split: 2,
            random_state: 123,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// CART classification tree with Gini impurity.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    classes: Vec<String>,
    n_features: usize,
    nodes: Vec<Node>,
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct Grower<'a, 'p> {
    x: ArrayView2<'a, f64>,
    y: Vec<usize>,
    n_classes: usize,
    params: &'p TreeParams,
    rng: SmallRng,
    nodes: Vec<Node>,
}

impl Grower<'_, '_> {
    fn class_counts(&self, idx: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in idx {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn best_split(&mut self, idx: &[usize], parent: &[usize]) -> Option<SplitCandidate> {
        let n = idx.len();
        let mut order: Vec<usize> = (0..self.x.ncols()).collect();
        order.shuffle(&mut self.rng);

        // Zero-gain splits are accepted; only a missing threshold makes a leaf.
        let mut best: Option<SplitCandidate> = None;
        let mut best_impurity = f64::INFINITY;
        for f in order {
            let mut sorted = idx.to_vec();
            sorted.sort_by(|&a, &b| self.x[(a, f)].total_cmp(&self.x[(b, f)]));

            let mut left = vec![0usize; self.n_classes];
            let mut right = parent.to_vec();
            for pos in 1..n {
                let moved = self.y[sorted[pos - 1]];
                left[moved] += 1;
                right[moved] -= 1;

                let lo = self.x[(sorted[pos - 1], f)];
                let hi = self.x[(sorted[pos], f)];
                if lo == hi {
                    continue;
                }
                let impurity =
                    (pos as f64 * gini(&left, pos) + (n - pos) as f64 * gini(&right, n - pos))
                        / n as f64;
                if impurity < best_impurity - 1e-12 {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best_impurity = impurity;
                    best = Some(SplitCandidate {
                        feature: f,
                        threshold,
                        impurity,
                    });
                }
            }
        }
        best
    }

    fn grow(&mut self, idx: Vec<usize>, depth: usize) -> usize {
        let counts = self.class_counts(&idx);
        let majority = argmax(&counts.iter().map(|&c| c as f64).collect::<Vec<_>>());
        let pure = counts[majority] == idx.len();
        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf { class: majority });
        if pure || depth >= self.params.max_depth || idx.len() < self.params.min_samples_split {
            return node_id;
        }

        let Some(split) = self.best_split(&idx, &counts) else {
            return node_id;
        };
        log::debug!(
            "node {node_id}: split feature {} at {} (gini {:.4})",
            split.feature,
            split.threshold,
            split.impurity
        );
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
            .into_iter()
            .partition(|&i| self.x[(i, split.feature)] <= split.threshold);
        let left = self.grow(left_idx, depth + 1);
        let right = self.grow(right_idx, depth + 1);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }
}

impl DecisionTree {
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        walk(&self.nodes, 0)
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> usize {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf { class } => return class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

impl Classifier for DecisionTree {
    type Params = TreeParams;

    fn fit(features: ArrayView2<f64>, labels: &[String], params: &TreeParams) -> Result<Self> {
        let n_rows = features.nrows();
        if n_rows == 0 {
            return Err(PloidyError::classifier("training set is empty"));
        }
        if labels.len() != n_rows {
            return Err(PloidyError::classifier(format!(
                "{} labels for {n_rows} training rows",
                labels.len()
            )));
        }
        if features.ncols() == 0 {
            return Err(PloidyError::classifier("training set has no feature columns"));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(PloidyError::classifier("training features must be finite"));
        }

        let mut classes = labels.to_vec();
        classes.sort();
        classes.dedup();
        let y = labels
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or_default())
            .collect();

        let mut grower = Grower {
            x: features,
            y,
            n_classes: classes.len(),
            params,
            rng: SmallRng::seed_from_u64(params.random_state),
            nodes: Vec::new(),
        };
        grower.grow((0..n_rows).collect(), 0);
        let tree = Self {
            classes,
            n_features: features.ncols(),
            nodes: grower.nodes,
        };
        log::info!(
            "fitted decision tree: {} classes, depth {}, {} leaves",
            tree.classes.len(),
            tree.depth(),
            tree.n_leaves()
        );
        Ok(tree)
    }

    fn predict(&self, features: ArrayView2<f64>) -> Result<Vec<String>> {
        if features.ncols() != self.n_features {
            return Err(PloidyError::classifier(format!(
                "expected {} feature columns, got {}",
                self.n_features,
                features.ncols()
            )));
        }
        Ok(features
            .rows()
            .into_iter()
            .map(|row| self.classes[self.predict_row(row)].clone())
            .collect())
    }
}
