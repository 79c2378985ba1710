use ndarray::{Array2, array};
use ploidy_hmm::GaussianHmm;
use ploidy_hmm::decode::{decode_with_model, label_column};
use ploidy_hmm::io::SegmentRow;
use ploidy_hmm::model::{References, build_model};
use ploidy_hmm::states::ModelKind;
use ploidy_hmm::utils::ln_normal_pdf;
use ploidy_hmm::{
    DecodeConfig, DecodedState, PloidyError, ReferenceRecord, ReferenceTable,
    decode_allelic_ratio, decode_joint, decode_read_count, decode_read_count_fixed_fraction,
};

fn approx_eq(a: f64, b: f64, eps: f64) {
    assert!(
        (a - b).abs() <= eps,
        "expected {a} ~= {b} within eps={eps}, got diff={}",
        (a - b).abs()
    );
}

fn rec(coverage: f64, fetal_fraction: f64, state: u8, mean: f64, variance: f64) -> ReferenceRecord {
    ReferenceRecord {
        coverage,
        fetal_fraction,
        state,
        mean,
        variance,
    }
}

fn rc_table(fetal_fraction: f64) -> ReferenceTable {
    ReferenceTable::from_records(
        "read-count",
        vec![
            rec(1000.0, fetal_fraction, 1, 1.0, 0.01),
            rec(1000.0, fetal_fraction, 2, 2.0, 0.01),
        ],
    )
    .expect("failed to index read-count reference")
}

// State s (1..=7) has mean s / 10.
fn ar_table() -> ReferenceTable {
    ReferenceTable::from_records(
        "allelic-ratio",
        (1..=7u8).map(|s| rec(1000.0, 0.1, s, s as f64 / 10.0, 0.001 * s as f64)),
    )
    .expect("failed to index allelic-ratio reference")
}

fn rc_row(sample: &str, total_count: f64) -> SegmentRow {
    SegmentRow::new(sample, Some(total_count), None)
}

fn ar_row(sample: &str, allelic_ratio: f64) -> SegmentRow {
    SegmentRow::new(sample, None, Some(allelic_ratio))
}

fn states(decoded: &[DecodedState]) -> Vec<u8> {
    decoded.iter().map(|d| d.state).collect()
}

fn indices(decoded: &[DecodedState]) -> Vec<usize> {
    decoded.iter().map(|d| d.index).collect()
}

#[test]
fn read_count_single_sample_scenario() {
    let rows: Vec<SegmentRow> = [1.02, 0.98, 1.95, 2.05]
        .iter()
        .map(|v| rc_row("s1", *v))
        .collect();
    let decoded = decode_read_count(&rows, 1000.0, 0.1, &rc_table(0.1), &DecodeConfig::default())
        .expect("decode failed");
    assert_eq!(states(&decoded), vec![1, 1, 2, 2]);
    assert_eq!(indices(&decoded), vec![0, 1, 2, 3]);
}

#[test]
fn groups_decode_independently() {
    let a = vec![rc_row("a", 1.01), rc_row("a", 1.9), rc_row("a", 2.1)];
    let b = vec![rc_row("b", 2.02), rc_row("b", 0.99), rc_row("b", 1.03)];
    let config = DecodeConfig::default();
    let table = rc_table(0.1);

    let alone_a = decode_read_count(&a, 1000.0, 0.1, &table, &config).expect("decode failed");
    let alone_b = decode_read_count(&b, 1000.0, 0.1, &table, &config).expect("decode failed");
    let both: Vec<SegmentRow> = a.iter().chain(b.iter()).cloned().collect();
    let together = decode_read_count(&both, 1000.0, 0.1, &table, &config).expect("decode failed");

    let mut expected = states(&alone_a);
    expected.extend(states(&alone_b));
    assert_eq!(states(&together), expected);
    assert_eq!(indices(&together), (0..6).collect::<Vec<_>>());
}

#[test]
fn reappearing_sample_starts_a_fresh_group() {
    // A run of "a" interrupted by "b" must not be chained across the gap.
    let rows = vec![
        rc_row("a", 1.0),
        rc_row("a", 1.0),
        rc_row("b", 2.0),
        rc_row("a", 1.51),
    ];
    let config = DecodeConfig::default();
    let table = rc_table(0.1);
    let decoded = decode_read_count(&rows, 1000.0, 0.1, &table, &config).expect("decode failed");
    let last_alone =
        decode_read_count(&rows[3..], 1000.0, 0.1, &table, &config).expect("decode failed");
    assert_eq!(decoded.len(), 4);
    assert_eq!(decoded[3].state, last_alone[0].state);
    assert_eq!(decoded[3].state, 2);
}

#[test]
fn parallel_and_serial_decoding_agree() {
    let mut rows = Vec::new();
    for s in 0..20 {
        let sample = format!("s{s}");
        for t in 0..15 {
            let v = if (t + s) % 7 < 3 { 2.0 } else { 1.0 } + 0.03 * ((t * s) % 5) as f64;
            rows.push(rc_row(&sample, v));
        }
    }
    let table = rc_table(0.1);
    let parallel = DecodeConfig::default();
    let serial = DecodeConfig {
        parallel: false,
        ..DecodeConfig::default()
    };
    let a = decode_read_count(&rows, 1000.0, 0.1, &table, &parallel).expect("decode failed");
    let b = decode_read_count(&rows, 1000.0, 0.1, &table, &serial).expect("decode failed");
    assert_eq!(a, b);
    assert_eq!(a.len(), rows.len());
}

#[test]
fn fixed_fraction_variant_looks_up_the_pinned_fraction() {
    let rows = vec![rc_row("s1", 1.0), rc_row("s1", 2.0), rc_row("s1", 2.0)];
    let decoded = decode_read_count_fixed_fraction(&rows, 1000.0, &rc_table(0.1), &DecodeConfig::default())
        .expect("decode failed");
    assert_eq!(states(&decoded), vec![1, 2, 2]);

    let err = decode_read_count_fixed_fraction(&rows, 1000.0, &rc_table(0.2), &DecodeConfig::default())
        .expect_err("expected lookup failure at pinned fraction");
    assert!(
        matches!(err, PloidyError::MissingReference { fetal_fraction, .. } if fetal_fraction == 0.1),
        "unexpected error: {err}"
    );

    let config = DecodeConfig {
        fixed_fetal_fraction: 0.2,
        ..DecodeConfig::default()
    };
    assert!(decode_read_count_fixed_fraction(&rows, 1000.0, &rc_table(0.2), &config).is_ok());
}

#[test]
fn missing_reference_aborts_decode() {
    let rows = vec![rc_row("s1", 1.0)];
    let err = decode_read_count(&rows, 500.0, 0.1, &rc_table(0.1), &DecodeConfig::default())
        .expect_err("expected lookup failure");
    assert!(matches!(err, PloidyError::MissingReference { coverage, state: 1, .. } if coverage == 500.0));
}

#[test]
fn invalid_ratio_is_reported_before_decoding() {
    let rows = vec![SegmentRow::new("s1", None, None)];
    let config = DecodeConfig {
        stay_switch_ratio: 0.0,
        ..DecodeConfig::default()
    };
    let err = decode_read_count(&rows, 1000.0, 0.1, &rc_table(0.1), &config)
        .expect_err("expected invalid parameter");
    assert!(matches!(err, PloidyError::InvalidParameter { .. }));
}

#[test]
fn read_count_rejects_missing_or_non_finite_values() {
    for bad in [None, Some(f64::NAN), Some(f64::INFINITY)] {
        let rows = vec![rc_row("s1", 1.0), SegmentRow::new("s1", bad, None)];
        let err = decode_read_count(&rows, 1000.0, 0.1, &rc_table(0.1), &DecodeConfig::default())
            .expect_err("expected malformed row");
        assert!(
            matches!(err, PloidyError::MalformedRow { index: 1, .. }),
            "unexpected error: {err}"
        );
    }
}

#[test]
fn allelic_ratio_drops_non_finite_rows_before_grouping() {
    let rows = vec![
        ar_row("s1", 0.1),
        ar_row("s1", f64::INFINITY),
        ar_row("s1", 0.11),
        SegmentRow::new("s1", Some(1.0), None),
        ar_row("s2", f64::NAN),
        ar_row("s2", 0.69),
        ar_row("s2", f64::NEG_INFINITY),
        ar_row("s2", 0.7),
    ];
    let decoded = decode_allelic_ratio(&rows, 1000.0, 0.1, &ar_table(), &DecodeConfig::default())
        .expect("decode failed");
    assert_eq!(indices(&decoded), vec![0, 2, 5, 7]);
    assert_eq!(states(&decoded), vec![1, 1, 7, 7]);

    let column = label_column(&decoded, rows.len());
    assert_eq!(
        column,
        vec![Some(1), None, Some(1), None, None, Some(7), None, Some(7)]
    );
}

#[test]
fn allelic_ratio_labels_stay_in_range() {
    let rows: Vec<SegmentRow> = (0..40)
        .map(|i| ar_row(if i < 20 { "x" } else { "y" }, 0.05 + 0.017 * i as f64))
        .collect();
    let decoded = decode_allelic_ratio(&rows, 1000.0, 0.1, &ar_table(), &DecodeConfig::default())
        .expect("decode failed");
    assert_eq!(decoded.len(), rows.len());
    assert!(decoded.iter().all(|d| (1..=7).contains(&d.state)));
}

#[test]
fn fully_filtered_input_yields_no_labels() {
    let rows = vec![ar_row("s1", f64::NAN), ar_row("s2", f64::INFINITY)];
    let decoded = decode_allelic_ratio(&rows, 1000.0, 0.1, &ar_table(), &DecodeConfig::default())
        .expect("decode failed");
    assert!(decoded.is_empty());
}

#[test]
fn joint_model_uses_diagonal_covariance_per_class() {
    let rc = rc_table(0.1);
    let ar = ar_table();
    let refs = References {
        read_count: Some(&rc),
        allelic_ratio: Some(&ar),
    };
    let model = build_model(ModelKind::Joint, &refs, 1000.0, 0.1, 10.0).expect("model build failed");
    assert_eq!(model.n_states(), 7);
    assert_eq!(model.n_dims(), 2);
    for p in model.initial() {
        approx_eq(*p, 1.0 / 7.0, 1e-15);
    }

    let rc_class = [1usize, 2, 1, 2, 2, 1, 2];
    for s in 0..7 {
        let ar_mean = (s + 1) as f64 / 10.0;
        let ar_var = 0.001 * (s + 1) as f64;
        let (rc_mean, rc_var) = if rc_class[s] == 1 { (1.0, 0.01) } else { (2.0, 0.01) };
        assert_eq!(model.means().row(s).to_vec(), vec![ar_mean, rc_mean]);
        assert_eq!(model.covariance(s), &array![[ar_var, 0.0], [0.0, rc_var]]);

        let x = array![0.33, 1.4];
        let expected = ln_normal_pdf(0.33, ar_mean, ar_var) + ln_normal_pdf(1.4, rc_mean, rc_var);
        approx_eq(model.ln_emission(s, x.view()), expected, 1e-10);
    }
}

#[test]
fn joint_decode_drops_rows_missing_either_feature() {
    let rows = vec![
        SegmentRow::new("s1", Some(1.0), Some(0.1)),
        SegmentRow::new("s1", None, Some(0.1)),
        SegmentRow::new("s1", Some(2.0), Some(f64::NAN)),
        SegmentRow::new("s1", Some(1.01), Some(0.3)),
        SegmentRow::new("s2", Some(2.0), Some(0.4)),
    ];
    let decoded = decode_joint(&rows, 1000.0, 0.1, &rc_table(0.1), &ar_table(), &DecodeConfig::default())
        .expect("decode failed");
    assert_eq!(indices(&decoded), vec![0, 3, 4]);
    assert!(decoded.iter().all(|d| (1..=7).contains(&d.state)));
    assert_eq!(decoded[0].state, 1);
}

#[test]
fn joint_decode_fails_on_unknown_fraction() {
    let rows = vec![SegmentRow::new("s1", Some(1.0), Some(0.1))];
    let err = decode_joint(
        &rows,
        1000.0,
        0.2,
        &rc_table(0.1),
        &ar_table(),
        &DecodeConfig::default(),
    )
    .expect_err("expected lookup failure");
    assert!(matches!(err, PloidyError::MissingReference { .. }));
}

#[test]
fn model_width_must_match_kind() {
    let rc = rc_table(0.1);
    let refs = References {
        read_count: Some(&rc),
        allelic_ratio: None,
    };
    let model = build_model(ModelKind::ReadCount, &refs, 1000.0, 0.1, 10.0).expect("model build failed");
    let rows = vec![SegmentRow::new("s1", Some(1.0), Some(0.1))];
    let err = decode_with_model(ModelKind::Joint, &model, &rows, &DecodeConfig::default())
        .expect_err("expected width mismatch");
    assert!(matches!(err, PloidyError::InvalidParameter { .. }));
}

#[test]
fn model_state_count_must_match_kind() {
    let n = 300;
    let model = GaussianHmm::new(
        vec![1.0 / n as f64; n],
        Array2::from_elem((n, n), 1.0 / n as f64),
        Array2::from_shape_fn((n, 1), |(s, _)| s as f64),
        vec![array![[1.0]]; n],
    )
    .expect("model build failed");
    let rows = vec![SegmentRow::new("s1", Some(1.0), None)];
    let err = decode_with_model(ModelKind::ReadCount, &model, &rows, &DecodeConfig::default())
        .expect_err("expected state-count mismatch");
    assert!(matches!(err, PloidyError::InvalidParameter { .. }));
    assert!(err.to_string().contains("2-state"), "unexpected error: {err}");
}
