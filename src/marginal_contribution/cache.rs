use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    data_table::read_records,
    datastructures::*,
    error::{EvaluationError, Result},
};

/// Stored next to a cache file: what it was computed from and which
/// contributions were flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CacheMeta {
    pub fingerprint: String,
    #[serde(default)]
    pub dubious: Vec<Solver>,
}

/// A ranking read back from disk with its metadata, if any was stored.
#[derive(Debug)]
pub(crate) struct CachedRanking {
    pub records: Vec<MarginalContribution>,
    pub meta: Option<CacheMeta>,
}

/// `<cache>.meta.json`
pub(crate) fn meta_path(path: &Path) -> PathBuf {
    let mut meta: OsString = path.as_os_str().to_owned();
    meta.push(".meta.json");
    PathBuf::from(meta)
}

/// Write `records` as headerless `solver,value` rows in rank order.
pub(crate) fn store(
    path: &Path,
    records: &[MarginalContribution],
    fingerprint: &str,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut df = DataFrame::new(vec![
        Series::new(
            "solver",
            records.iter().map(|r| r.solver.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "value",
            records.iter().map(|r| r.value).collect::<Vec<f64>>(),
        ),
    ])?;
    let mut file = fs::File::create(path)?;
    CsvWriter::new(&mut file).has_header(false).finish(&mut df)?;
    let meta = CacheMeta {
        fingerprint: fingerprint.to_string(),
        dubious: records
            .iter()
            .filter(|r| r.dubious)
            .map(|r| r.solver.clone())
            .collect(),
    };
    serde_json::to_writer_pretty(fs::File::create(meta_path(path))?, &meta)?;
    Ok(())
}

/// Read a cache file written by [`store`], `None` if there is none.
pub(crate) fn load(path: &Path) -> Result<Option<CachedRanking>> {
    if !path.is_file() {
        return Ok(None);
    }
    let meta_file = meta_path(path);
    let meta = if meta_file.is_file() {
        Some(serde_json::from_str::<CacheMeta>(&fs::read_to_string(
            meta_file,
        )?)?)
    } else {
        None
    };
    let records = read_records(path)?
        .into_iter()
        .enumerate()
        .map(|(line, record)| -> Result<MarginalContribution> {
            let malformed = |what: &str| {
                EvaluationError::DataIntegrity(format!(
                    "{} line {}: {what}",
                    path.display(),
                    line + 1
                ))
            };
            let [Some(solver), Some(value)] = record.as_slice() else {
                return Err(malformed("expected a solver and a value"));
            };
            let value = value
                .trim()
                .parse::<f64>()
                .map_err(|_| malformed(&format!("'{value}' is not a number")))?;
            let mut contribution = MarginalContribution::new(solver.as_str(), value);
            contribution.dubious = meta
                .as_ref()
                .map_or(false, |m| m.dubious.contains(solver));
            Ok(contribution)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(CachedRanking { records, meta }))
}
