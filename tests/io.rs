//! Points sources, report output and whole runs over files.

use anyhow::Result;
use ironknn::io::{read_lines, resolve_source};
use ironknn::*;
use std::fs::{self, create_dir_all};
use tempfile::TempDir;

fn names(paths: &[std::path::PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
        .collect()
}

#[test]
fn directory_source_skips_marker_files() -> Result<()> {
    let dir = TempDir::new()?;
    let base = dir.path();
    fs::write(base.join("part-00001"), "b,1,1\n")?;
    fs::write(base.join("part-00000"), "a,0,0\n")?;
    fs::write(base.join("_SUCCESS"), "")?;
    fs::write(base.join(".part-00000.crc"), "junk")?;
    create_dir_all(base.join("nested"))?;

    let files = resolve_source(&base.display().to_string())?;
    assert_eq!(names(&files), vec!["part-00000", "part-00001"]);
    Ok(())
}

#[test]
fn glob_and_single_file_sources() -> Result<()> {
    let dir = TempDir::new()?;
    let base = dir.path();
    fs::write(base.join("points-2.txt"), "b,1,1\n")?;
    fs::write(base.join("points-1.txt"), "a,0,0\n")?;
    fs::write(base.join("other.csv"), "c,0,0\n")?;

    let pattern = format!("{}/points-*.txt", base.display());
    assert_eq!(names(&resolve_source(&pattern)?), vec!["points-1.txt", "points-2.txt"]);

    let single = base.join("other.csv");
    assert_eq!(resolve_source(&single.display().to_string())?, vec![single]);
    Ok(())
}

#[test]
fn missing_source_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let missing = format!("{}/nothing-*", dir.path().display());
    let err = resolve_source(&missing).unwrap_err();
    assert!(err.to_string().contains("no input files found"));
    Ok(())
}

#[test]
fn read_lines_skips_blanks_and_keeps_line_numbers() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("points.txt");
    fs::write(&path, "a,0,0\n\n   \nb,1,1\r\nc,2,2")?;

    let lines = read_lines(&path)?;
    let got: Vec<(usize, &str)> = lines
        .iter()
        .map(|l| (l.location.line_no, l.text.as_str()))
        .collect();
    assert_eq!(got, vec![(1, "a,0,0"), (4, "b,1,1"), (5, "c,2,2")]);
    assert!(lines.iter().all(|l| l.location.source == path));
    Ok(())
}

#[test]
fn report_format_matches_header_and_rows() -> Result<()> {
    let report = KnnReport {
        query: QueryPoint::new(0.0, 0.0, 2)?,
        neighbors: vec![Candidate::new("A", 0.0), Candidate::new("C", 2f64.sqrt())],
    };
    assert_eq!(
        report.to_string(),
        "The 2 nearest points to query point (0.0, 0.0) are:\nA\t0.0\nC\t1.4142135623730951\n"
    );

    let negative = KnnReport {
        query: QueryPoint::new(-1.25, 3.0, 1)?,
        neighbors: vec![],
    };
    assert_eq!(negative.header(), "The 1 nearest points to query point (-1.25, 3.0) are:");
    Ok(())
}

#[test]
fn reals_never_switch_to_exponent_form() -> Result<()> {
    assert_eq!(format_real(0.0), "0.0");
    assert_eq!(format_real(-3.0), "-3.0");
    assert_eq!(format_real(1e20), "100000000000000000000.0");
    assert_eq!(format_real(1e-5), "0.00001");
    assert_eq!(format_real(2f64.sqrt()), "1.4142135623730951");

    let far = KnnReport {
        query: QueryPoint::new(1e20, 1e-5, 1)?,
        neighbors: vec![Candidate::new("A", 1e20)],
    };
    assert_eq!(
        far.to_string(),
        "The 1 nearest points to query point (100000000000000000000.0, 0.00001) are:\nA\t100000000000000000000.0\n"
    );
    Ok(())
}

#[test]
fn write_report_refuses_to_overwrite() -> Result<()> {
    let dir = TempDir::new()?;
    let dest = dir.path().join("out");
    let report = KnnReport {
        query: QueryPoint::new(0.0, 0.0, 1)?,
        neighbors: vec![Candidate::new("A", 1.0)],
    };

    let path = write_report(&dest, &report)?;
    assert_eq!(path, dest.join(REPORT_FILE_NAME));
    assert_eq!(fs::read_to_string(&path)?, report.to_string());

    let err = write_report(&dest, &report).unwrap_err();
    assert!(err.to_string().contains("already exists"));
    assert_eq!(fs::read_to_string(&path)?, report.to_string());
    Ok(())
}

#[test]
fn write_report_leaves_a_foreign_report_alone() -> Result<()> {
    let dir = TempDir::new()?;
    let dest = dir.path().join("out");
    create_dir_all(&dest)?;
    fs::write(dest.join(REPORT_FILE_NAME), "written by another job\n")?;

    let report = KnnReport {
        query: QueryPoint::new(0.0, 0.0, 1)?,
        neighbors: vec![],
    };
    let err = write_report(&dest, &report).unwrap_err();
    assert!(err.to_string().starts_with("output already exists"));
    assert_eq!(fs::read_to_string(dest.join(REPORT_FILE_NAME))?, "written by another job\n");
    Ok(())
}

#[test]
fn run_knn_over_a_directory_of_parts() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("points");
    create_dir_all(&input)?;
    fs::write(input.join("part-00000"), "A,0,0\nB,3,4\n")?;
    fs::write(input.join("part-00001"), "C,1,1\n")?;
    fs::write(input.join("_SUCCESS"), "")?;

    let mut config = KnnConfig::new(input.display().to_string(), 0.0, 0.0, 2);
    config.output_destination = dir.path().join("knn_output");

    let run = run_knn(&config)?;
    assert_eq!(run.stats.records, 3);
    let path = write_report(&config.output_destination, &run.report)?;
    assert_eq!(
        fs::read_to_string(path)?,
        "The 2 nearest points to query point (0.0, 0.0) are:\nA\t0.0\nC\t1.4142135623730951\n"
    );
    Ok(())
}

#[test]
fn malformed_file_record_names_its_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("points.txt");
    fs::write(&path, "A,0,0\nB;3;4\n")?;

    let config = KnnConfig::new(path.display().to_string(), 0.0, 0.0, 1);
    let err = run_knn(&config).unwrap_err();
    assert!(err.to_string().contains(&format!("{}:2", path.display())));
    Ok(())
}
