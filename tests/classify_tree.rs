use ndarray::{Array2, array};
use ploidy_hmm::PloidyError;
use ploidy_hmm::classify::{Classifier, DecisionTree, FeatureSet, TreeParams};

fn labels(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

// coverage, fetal_fraction, euploidy, trisomy
fn two_state_training() -> (Array2<f64>, Vec<String>) {
    let x = array![
        [1000.0, 0.10, 0.95, 0.05],
        [1000.0, 0.05, 0.90, 0.10],
        [2000.0, 0.10, 0.97, 0.03],
        [500.0, 0.15, 0.88, 0.12],
        [1000.0, 0.10, 0.20, 0.80],
        [2000.0, 0.05, 0.35, 0.65],
        [500.0, 0.10, 0.10, 0.90],
        [1000.0, 0.15, 0.30, 0.70],
    ];
    let y = labels(&[
        "euploid", "euploid", "euploid", "euploid", "trisomy", "trisomy", "trisomy", "trisomy",
    ]);
    (x, y)
}

#[test]
fn separable_training_set_is_learned_exactly() {
    let (x, y) = two_state_training();
    let tree = DecisionTree::fit(x.view(), &y, &TreeParams::default()).expect("fit failed");
    assert_eq!(tree.classes(), &labels(&["euploid", "trisomy"])[..]);
    assert_eq!(tree.n_features(), 4);
    assert_eq!(tree.depth(), 1);
    assert_eq!(tree.n_leaves(), 2);
    assert_eq!(tree.predict(x.view()).expect("predict failed"), y);

    let test = array![[1500.0, 0.12, 0.85, 0.15], [1500.0, 0.12, 0.25, 0.75]];
    assert_eq!(
        tree.predict(test.view()).expect("predict failed"),
        labels(&["euploid", "trisomy"])
    );
}

#[test]
fn depth_is_bounded_and_fit_is_deterministic() {
    let mut rows = Vec::new();
    let mut y = Vec::new();
    for i in 0..64 {
        let a = (i % 8) as f64;
        let b = (i / 8) as f64;
        rows.extend([a, b, (i % 3) as f64, (i % 5) as f64]);
        y.push(if ((i % 8) + (i / 8)) % 2 == 0 { "even" } else { "odd" }.to_string());
    }
    let x = Array2::from_shape_vec((64, 4), rows).expect("shape");
    let params = TreeParams {
        max_depth: 2,
        ..TreeParams::default()
    };
    let first = DecisionTree::fit(x.view(), &y, &params).expect("fit failed");
    let second = DecisionTree::fit(x.view(), &y, &params).expect("fit failed");
    assert!(first.depth() <= 2);
    assert!(first.n_leaves() <= 4);
    assert_eq!(
        first.predict(x.view()).expect("predict failed"),
        second.predict(x.view()).expect("predict failed")
    );
}

#[test]
fn unsplittable_node_predicts_lowest_majority_class() {
    let x = array![[1.0, 2.0], [1.0, 2.0], [1.0, 2.0], [1.0, 2.0]];
    let y = labels(&["b", "a", "b", "a"]);
    let tree = DecisionTree::fit(x.view(), &y, &TreeParams::default()).expect("fit failed");
    assert_eq!(tree.depth(), 0);
    assert_eq!(
        tree.predict(array![[5.0, 5.0]].view()).expect("predict failed"),
        labels(&["a"])
    );
}

#[test]
fn zero_gain_root_split_still_grows_xor_tree() {
    let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
    let y = labels(&["a", "b", "b", "a"]);
    let tree = DecisionTree::fit(x.view(), &y, &TreeParams::default()).expect("fit failed");
    assert_eq!(tree.depth(), 2);
    assert_eq!(tree.n_leaves(), 4);
    assert_eq!(tree.predict(x.view()).expect("predict failed"), y);
}

#[test]
fn invalid_inputs_are_rejected() {
    let empty = Array2::<f64>::zeros((0, 4));
    let err = DecisionTree::fit(empty.view(), &[], &TreeParams::default()).expect_err("empty");
    assert!(matches!(err, PloidyError::Classifier { .. }));

    let (x, y) = two_state_training();
    let err = DecisionTree::fit(x.view(), &y[..3], &TreeParams::default()).expect_err("mismatch");
    assert!(err.to_string().contains("labels"));

    let tree = DecisionTree::fit(x.view(), &y, &TreeParams::default()).expect("fit failed");
    let narrow = array![[1.0, 2.0, 3.0]];
    assert!(tree.predict(narrow.view()).is_err());
}

#[test]
fn feature_sets_name_their_columns() {
    assert_eq!(FeatureSet::TwoState.columns().len(), 4);
    assert_eq!(FeatureSet::TwoState.label(), "condition");
    assert_eq!(FeatureSet::SevenState.columns()[4], "paternal_trisomy");
    assert_eq!(FeatureSet::SevenState.label(), "genotype");
}
