use anyhow::Result;
use ironknn::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn config_field(err: KnnError) -> String {
    match err {
        KnnError::Config(e) => e.field,
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn valid_config_yields_query_point() -> Result<()> {
    let q = KnnConfig::new("points.txt", 1.5, -2.0, 3).validate()?;
    assert_eq!(q.coords(), Coordinates::new(1.5, -2.0));
    assert_eq!(q.k(), 3);
    Ok(())
}

#[test]
fn non_positive_k_fails_validation() {
    for k in [0, -5] {
        let err = KnnConfig::new("points.txt", 0.0, 0.0, k).validate().unwrap_err();
        assert_eq!(config_field(err), "k");
    }
}

#[test]
fn non_finite_query_fails_validation() {
    let err = KnnConfig::new("points.txt", f64::NAN, 0.0, 1).validate().unwrap_err();
    assert_eq!(config_field(err), "query_x");
    let err = KnnConfig::new("points.txt", 0.0, f64::INFINITY, 1).validate().unwrap_err();
    assert_eq!(config_field(err), "query_y");
}

#[test]
fn empty_source_and_zero_parallelism_fail_validation() {
    let err = KnnConfig::new("  ", 0.0, 0.0, 1).validate().unwrap_err();
    assert_eq!(config_field(err), "points_source");

    let mut cfg = KnnConfig::new("points.txt", 0.0, 0.0, 1);
    cfg.exec = ExecMode::Parallel {
        threads: Some(0),
        partitions: None,
    };
    assert_eq!(config_field(cfg.validate().unwrap_err()), "exec.threads");

    cfg.exec = ExecMode::Parallel {
        threads: None,
        partitions: Some(0),
    };
    assert_eq!(config_field(cfg.validate().unwrap_err()), "exec.partitions");

    cfg.exec = ExecMode::Sequential;
    cfg.output_destination = PathBuf::new();
    assert_eq!(config_field(cfg.validate().unwrap_err()), "output_destination");
}

#[test]
fn config_errors_surface_before_reading_input() {
    // The source does not exist; validation must fail first.
    let err = run_knn(&KnnConfig::new("/definitely/not/here/*", 0.0, 0.0, 0)).unwrap_err();
    assert!(matches!(err.downcast_ref::<KnnError>(), Some(KnnError::Config(_))));
}

#[test]
fn config_error_chain_states_the_problem_once() {
    let err = run_knn(&KnnConfig::new("points.txt", 0.0, 0.0, 0)).unwrap_err();
    let chain = format!("{err:#}");
    assert_eq!(chain.matches("must be a positive integer, got 0").count(), 1, "{chain}");
    assert_eq!(chain, "config error: [k] must be a positive integer, got 0");
}

#[test]
fn json_config_fills_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("knn.json");
    fs::write(&path, r#"{"points_source": "pts", "query_x": 1.5, "query_y": -2, "k": 3}"#)?;

    let cfg = KnnConfig::from_json_file(&path)?;
    assert_eq!(cfg, KnnConfig::new("pts", 1.5, -2.0, 3));
    assert_eq!(cfg.output_destination, PathBuf::from(DEFAULT_OUTPUT_DESTINATION));
    assert_eq!(cfg.reduction, Reduction::SingleInstance);
    assert_eq!(cfg.on_malformed, MalformedPolicy::Abort);
    Ok(())
}

#[test]
fn json_config_reads_every_option() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("knn.json");
    fs::write(
        &path,
        r#"{
            "points_source": "data/part-*",
            "query_x": 0,
            "query_y": 0,
            "k": 10,
            "output_destination": "out",
            "exec": {"parallel": {"threads": 2, "partitions": 8}},
            "reduction": "partitioned_merge",
            "on_malformed": "skip"
        }"#,
    )?;

    let cfg = KnnConfig::from_json_file(&path)?;
    assert_eq!(cfg.output_destination, PathBuf::from("out"));
    assert_eq!(
        cfg.exec,
        ExecMode::Parallel {
            threads: Some(2),
            partitions: Some(8)
        }
    );
    assert_eq!(cfg.reduction, Reduction::PartitionedMerge);
    assert_eq!(cfg.on_malformed, MalformedPolicy::Skip);

    fs::write(&path, r#"{"points_source": "p", "query_x": 0, "query_y": 0, "k": 1, "exec": "sequential"}"#)?;
    assert_eq!(KnnConfig::from_json_file(&path)?.exec, ExecMode::Sequential);
    Ok(())
}

#[test]
fn json_config_requires_k() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("knn.json");
    fs::write(&path, r#"{"points_source": "pts", "query_x": 0, "query_y": 0}"#)?;

    let err = KnnConfig::from_json_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("missing field `k`"));
    Ok(())
}
