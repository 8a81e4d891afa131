//! Reading point records and writing reports.
//!
//! A points source is one of
//! - a regular file,
//! - a directory, whose regular files are all read (hidden files and
//!   `_`-prefixed marker files such as `_SUCCESS` are skipped),
//! - a glob pattern such as `points/part-*`.
//!
//! Files are read in sorted path order; records keep their file and line
//! number so malformed ones can be reported precisely.

use crate::error::RecordLocation;
use crate::finalizer::KnnReport;
use anyhow::{Context, Result, bail};
use glob::glob;
use log::debug;
use std::fs::{File, OpenOptions, create_dir_all, read_dir};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Name of the report file inside the output destination.
pub const REPORT_FILE_NAME: &str = "part-r-00000";

/// One raw record and where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLine {
    pub location: RecordLocation,
    pub text: String,
}

/// Resolve a points source into the files it names.
///
/// # Errors
/// Fails on an invalid glob pattern, an unreadable directory, or when the
/// source matches no file at all.
pub fn resolve_source(source: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(source);
    let mut files = if path.is_dir() {
        let mut files = Vec::new();
        for entry in read_dir(path).with_context(|| format!("list {}", path.display()))? {
            let p = entry.with_context(|| format!("list {}", path.display()))?.path();
            if p.is_file() && !is_marker_file(&p) {
                files.push(p);
            }
        }
        files
    } else if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        let mut files = Vec::new();
        for entry in glob(source).with_context(|| format!("invalid glob pattern: {source}"))? {
            let p = entry.with_context(|| format!("error reading glob entry for pattern: {source}"))?;
            if p.is_file() {
                files.push(p);
            }
        }
        files
    };

    if files.is_empty() {
        bail!("no input files found for points source: {source}");
    }
    files.sort();
    Ok(files)
}

fn is_marker_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') || n.starts_with('_'))
}

/// Read every non-blank line of `path`.
///
/// # Errors
/// Fails if the file cannot be opened or read.
pub fn read_lines(path: &Path) -> Result<Vec<SourceLine>> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for (idx, line) in BufReader::new(f).lines().enumerate() {
        let line = line.with_context(|| format!("read line {} in {}", idx + 1, path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(SourceLine {
            location: RecordLocation {
                source: path.to_path_buf(),
                line_no: idx + 1,
            },
            text: line,
        });
    }
    Ok(out)
}

/// Read every record of a points source.
///
/// # Errors
/// See [`resolve_source`] and [`read_lines`].
pub fn read_records(source: &str) -> Result<Vec<SourceLine>> {
    let mut records = Vec::new();
    for file in resolve_source(source)? {
        let lines = read_lines(&file)?;
        debug!("read {} record(s) from {}", lines.len(), file.display());
        records.extend(lines);
    }
    Ok(records)
}

/// Write `report` to `<destination>/part-r-00000`, creating the directory.
///
/// An existing report is never overwritten.
///
/// # Errors
/// Fails if a report already exists at the destination or on I/O errors.
pub fn write_report(destination: &Path, report: &KnnReport) -> Result<PathBuf> {
    create_dir_all(destination).with_context(|| format!("mkdir -p {}", destination.display()))?;
    let path = destination.join(REPORT_FILE_NAME);
    let f = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            bail!("output already exists: {}", path.display())
        }
        Err(e) => return Err(e).with_context(|| format!("create {}", path.display())),
    };
    let mut w = BufWriter::new(f);
    write!(w, "{report}").with_context(|| format!("write {}", path.display()))?;
    w.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(path)
}
