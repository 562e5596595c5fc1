use std::{fs, path::Path};

use itertools::Itertools;
use ndarray::Array2;
use polars::prelude::*;

use super::DataTable;
use crate::error::{EvaluationError, Result};

/// Raw cells of a headerless csv file, row-major. Blank cells are `None`.
///
/// Every column is read as text, identifiers such as `001` are kept as they
/// are written.
pub(crate) fn read_records(path: &Path) -> Result<Vec<Vec<Option<String>>>> {
    if fs::read_to_string(path)?.trim().is_empty() {
        return Ok(Vec::new());
    }
    let df = CsvReader::from_path(path)?
        .has_header(false)
        .infer_schema(Some(0))
        .finish()
        .map_err(|e| EvaluationError::DataIntegrity(e.to_string()))?;
    let columns = df
        .get_columns()
        .iter()
        .map(|series| -> Result<Vec<Option<String>>> {
            let series = series.cast(&DataType::Utf8)?;
            Ok(series
                .utf8()?
                .into_iter()
                .map(|cell| {
                    cell.filter(|s| !s.trim().is_empty()).map(str::to_string)
                })
                .collect())
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((0..df.height())
        .map(|i| columns.iter().map(|column| column[i].clone()).collect())
        .collect())
}

fn parse_cell(raw: &str, row: &str, column: &str) -> Result<Option<f64>> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_nan() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(EvaluationError::DataIntegrity(format!(
            "instance '{row}', column '{column}': '{raw}' is not a number"
        ))),
    }
}

pub(crate) fn read_table(path: &Path) -> Result<DataTable> {
    let records = read_records(path)?;
    let Some((header, body)) = records.split_first() else {
        return Ok(DataTable::new());
    };
    let columns = header
        .iter()
        .skip(1)
        .enumerate()
        .map(|(j, name)| {
            name.clone().ok_or_else(|| {
                EvaluationError::DataIntegrity(format!(
                    "header cell {} is blank",
                    j + 2
                ))
            })
        })
        .collect::<Result<Vec<String>>>()?;
    let mut rows = Vec::with_capacity(body.len());
    let mut cells = Vec::with_capacity(body.len() * columns.len());
    for (i, record) in body.iter().enumerate() {
        let row = record.first().cloned().flatten().ok_or_else(|| {
            EvaluationError::DataIntegrity(format!(
                "line {} has no instance identifier",
                i + 2
            ))
        })?;
        for (j, column) in columns.iter().enumerate() {
            let cell = match record.get(j + 1).and_then(Option::as_deref) {
                Some(raw) => parse_cell(raw, &row, column)?,
                None => None,
            };
            cells.push(cell);
        }
        rows.push(row);
    }
    let values = Array2::from_shape_vec((rows.len(), columns.len()), cells)
        .map_err(|e| EvaluationError::DataIntegrity(e.to_string()))?;
    DataTable::from_parts(rows, columns, values)
}

pub(crate) fn write_table(table: &DataTable, path: &Path) -> Result<()> {
    let mut series = vec![Series::new("", table.list_rows())];
    series.extend(table.list_columns().iter().enumerate().map(|(j, name)| {
        Series::new(name, table.column_values(j).iter().copied().collect_vec())
    }));
    let mut df = DataFrame::new(series)?;
    let mut file = fs::File::create(path)?;
    CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;
    Ok(())
}
