use ploidy_hmm::{PloidyError, ReferenceRecord, ReferenceTable};

fn rec(coverage: f64, fetal_fraction: f64, state: u8, mean: f64, variance: f64) -> ReferenceRecord {
    ReferenceRecord {
        coverage,
        fetal_fraction,
        state,
        mean,
        variance,
    }
}

#[test]
fn lookup_returns_the_matching_row() {
    let table = ReferenceTable::from_records(
        "read-count",
        vec![
            rec(1000.0, 0.1, 1, 1.0, 0.01),
            rec(1000.0, 0.1, 2, 2.0, 0.02),
            rec(1000.0, 0.2, 1, 1.5, 0.03),
            rec(500.0, 0.1, 1, 0.5, 0.04),
        ],
    )
    .expect("failed to index reference");
    assert_eq!(table.len(), 4);
    assert_eq!(table.name(), "read-count");

    let p = table.lookup(1000.0, 0.1, 2).expect("lookup failed");
    assert_eq!(p.mean, 2.0);
    assert_eq!(p.variance, 0.02);
    let p = table.lookup(1000.0, 0.2, 1).expect("lookup failed");
    assert_eq!(p.mean, 1.5);
    let p = table.lookup(500.0, 0.1, 1).expect("lookup failed");
    assert_eq!(p.variance, 0.04);
}

#[test]
fn missing_key_reports_the_triple() {
    let table = ReferenceTable::from_records("allelic-ratio", vec![rec(1000.0, 0.1, 1, 0.5, 0.01)])
        .expect("failed to index reference");
    let err = table.lookup(1000.0, 0.1, 4).expect_err("expected missing row");
    assert_eq!(
        err,
        PloidyError::MissingReference {
            table: "allelic-ratio".to_string(),
            coverage: 1000.0,
            fetal_fraction: 0.1,
            state: 4,
        }
    );
    assert!(err.to_string().contains("coverage=1000"));
    assert!(err.to_string().contains("state=4"));
}

#[test]
fn duplicate_rows_are_rejected() {
    let err = ReferenceTable::from_records(
        "read-count",
        vec![rec(1000.0, 0.1, 1, 1.0, 0.01), rec(1000.0, 0.1, 1, 1.1, 0.01)],
    )
    .expect_err("expected duplicate error");
    assert!(matches!(err, PloidyError::DuplicateReference { state: 1, .. }));
}

#[test]
fn negative_zero_matches_zero() {
    let table = ReferenceTable::from_records("read-count", vec![rec(1000.0, 0.0, 1, 1.0, 0.01)])
        .expect("failed to index reference");
    assert!(table.lookup(1000.0, -0.0, 1).is_ok());
}
