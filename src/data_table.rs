use std::{collections::HashMap, path::Path};

use itertools::Itertools;
use ndarray::{Array2, ArrayView1, Axis};
use sha2::{Digest, Sha256};

use crate::error::{EvaluationError, Result};

mod io;
pub(crate) use io::read_records;

/// Instances x solvers table of performance values.
pub type PerformanceTable = DataTable;

/// Instances x features table of feature values.
pub type FeatureTable = DataTable;

/// A 2D table keyed by row and column identifiers holding optional numbers.
///
/// A missing cell means "not computed yet", never zero. Row and column order
/// is insertion order and removals keep the relative order of what is left.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    rows: Vec<String>,
    columns: Vec<String>,
    row_index: HashMap<String, usize>,
    column_index: HashMap<String, usize>,
    values: Array2<Option<f64>>,
}

fn build_index(keys: &[String], what: &str) -> Result<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(keys.len());
    for (position, key) in keys.iter().enumerate() {
        if key.is_empty() {
            return Err(EvaluationError::DataIntegrity(format!(
                "empty {what} identifier at position {position}"
            )));
        }
        if index.insert(key.clone(), position).is_some() {
            return Err(EvaluationError::DataIntegrity(format!(
                "duplicate {what} identifier '{key}'"
            )));
        }
    }
    Ok(index)
}

fn check_value(value: f64) -> Result<f64> {
    if value.is_nan() {
        Err(EvaluationError::DataIntegrity(
            "NaN is not a valid cell value, leave the cell empty instead"
                .to_string(),
        ))
    } else {
        Ok(value)
    }
}

impl DataTable {
    /// An empty table without rows or columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from its keys and a `rows x columns` value matrix.
    pub fn from_parts(
        rows: Vec<String>,
        columns: Vec<String>,
        values: Array2<Option<f64>>,
    ) -> Result<Self> {
        if values.dim() != (rows.len(), columns.len()) {
            return Err(EvaluationError::DataIntegrity(format!(
                "value matrix has shape {:?} but there are {} rows and {} columns",
                values.dim(),
                rows.len(),
                columns.len()
            )));
        }
        let row_index = build_index(&rows, "row")?;
        let column_index = build_index(&columns, "column")?;
        let values = values.mapv(|v| v.filter(|x| !x.is_nan()));
        Ok(Self {
            rows,
            columns,
            row_index,
            column_index,
            values,
        })
    }

    /// Build a table from row-major nested vectors.
    pub fn from_rows(
        rows: &[&str],
        columns: &[&str],
        values: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        if values.len() != rows.len()
            || values.iter().any(|row| row.len() != columns.len())
        {
            return Err(EvaluationError::DataIntegrity(
                "row values do not match the table dimensions".to_string(),
            ));
        }
        let matrix = Array2::from_shape_vec(
            (rows.len(), columns.len()),
            values.into_iter().flatten().collect_vec(),
        )
        .map_err(|e| EvaluationError::DataIntegrity(e.to_string()))?;
        Self::from_parts(
            rows.iter().map(|r| r.to_string()).collect(),
            columns.iter().map(|c| c.to_string()).collect(),
            matrix,
        )
    }

    /// Read a delimited file: header row of column identifiers, first column
    /// holds the row identifiers, blank cells are missing values.
    pub fn load(path: &Path) -> Result<Self> {
        io::read_table(path)
            .map_err(|e| e.context(format!("loading {}", path.display())))
    }

    /// Write the table in the format [`DataTable::load`] reads.
    pub fn save(&self, path: &Path) -> Result<()> {
        io::write_table(self, path)
    }

    /// Value of a cell, `None` while it is pending.
    ///
    /// Unknown row or column identifiers are an error, not a pending cell.
    pub fn get(&self, row: &str, column: &str) -> Result<Option<f64>> {
        let i = self.require_row(row)?;
        let j = self.require_column(column)?;
        Ok(self.values[(i, j)])
    }

    /// Value of a cell by position.
    pub fn value_at(&self, row: usize, column: usize) -> Option<f64> {
        self.values.get((row, column)).copied().flatten()
    }

    /// Set a cell, adding the row and column when they do not exist yet.
    pub fn set(&mut self, row: &str, column: &str, value: f64) -> Result<()> {
        let value = check_value(value)?;
        if !self.row_index.contains_key(row) {
            self.add_row(row)?;
        }
        if !self.column_index.contains_key(column) {
            self.add_column(column)?;
        }
        let i = self.row_index[row];
        let j = self.column_index[column];
        self.values[(i, j)] = Some(value);
        Ok(())
    }

    /// Append an empty row.
    pub fn add_row(&mut self, row: &str) -> Result<()> {
        if row.is_empty() || self.row_index.contains_key(row) {
            return Err(EvaluationError::DataIntegrity(format!(
                "cannot add row '{row}': empty or duplicate identifier"
            )));
        }
        let (n, m) = self.values.dim();
        let old = &self.values;
        self.values =
            Array2::from_shape_fn((n + 1, m), |(i, j)| if i < n { old[(i, j)] } else { None });
        self.row_index.insert(row.to_string(), n);
        self.rows.push(row.to_string());
        Ok(())
    }

    /// Append an empty column.
    pub fn add_column(&mut self, column: &str) -> Result<()> {
        if column.is_empty() || self.column_index.contains_key(column) {
            return Err(EvaluationError::DataIntegrity(format!(
                "cannot add column '{column}': empty or duplicate identifier"
            )));
        }
        let (n, m) = self.values.dim();
        let old = &self.values;
        self.values =
            Array2::from_shape_fn((n, m + 1), |(i, j)| if j < m { old[(i, j)] } else { None });
        self.column_index.insert(column.to_string(), m);
        self.columns.push(column.to_string());
        Ok(())
    }

    /// Drop a row; the remaining rows keep their relative order.
    pub fn remove_row(&mut self, row: &str) -> Result<()> {
        let position = self.require_row(row)?;
        let keep = (0..self.rows.len()).filter(|&i| i != position).collect_vec();
        self.values = self.values.select(Axis(0), &keep);
        self.rows.remove(position);
        self.row_index = build_index(&self.rows, "row")?;
        Ok(())
    }

    /// Drop a column; the remaining columns keep their relative order.
    pub fn remove_column(&mut self, column: &str) -> Result<()> {
        let position = self.require_column(column)?;
        let keep = (0..self.columns.len())
            .filter(|&j| j != position)
            .collect_vec();
        self.values = self.values.select(Axis(1), &keep);
        self.columns.remove(position);
        self.column_index = build_index(&self.columns, "column")?;
        Ok(())
    }

    /// Independent copy of the table without `column`.
    pub fn without_column(&self, column: &str) -> Result<Self> {
        let mut copy = self.clone();
        copy.remove_column(column)?;
        Ok(copy)
    }

    /// Instance identifiers in insertion order.
    pub fn list_rows(&self) -> &[String] {
        &self.rows
    }

    /// Column identifiers in insertion order.
    pub fn list_columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of instances.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of `row` in [`DataTable::list_rows`].
    pub fn row_position(&self, row: &str) -> Option<usize> {
        self.row_index.get(row).copied()
    }

    /// Position of `column` in [`DataTable::list_columns`].
    pub fn column_position(&self, column: &str) -> Option<usize> {
        self.column_index.get(column).copied()
    }

    /// All cells of the row at `position`, in column order.
    pub fn row_values(&self, position: usize) -> ArrayView1<Option<f64>> {
        self.values.row(position)
    }

    /// All cells of the column at `position`, in row order.
    pub fn column_values(&self, position: usize) -> ArrayView1<Option<f64>> {
        self.values.column(position)
    }

    /// Whether any cell is still pending.
    pub fn has_missing_values(&self) -> bool {
        self.values.iter().any(Option::is_none)
    }

    /// SHA-256 over identifiers and values, hex encoded.
    ///
    /// Two tables with the same keys in the same order and the same cells
    /// share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.rows.len() as u64).to_le_bytes());
        hasher.update((self.columns.len() as u64).to_le_bytes());
        for key in self.rows.iter().chain(self.columns.iter()) {
            hasher.update(key.as_bytes());
            hasher.update([0x1f_u8]);
        }
        for value in self.values.iter() {
            match value {
                Some(v) => {
                    hasher.update([1_u8]);
                    hasher.update(v.to_bits().to_le_bytes());
                }
                None => hasher.update([0_u8]),
            }
        }
        format!("{:x}", hasher.finalize())
    }

    fn require_row(&self, row: &str) -> Result<usize> {
        self.row_position(row).ok_or_else(|| {
            EvaluationError::DataIntegrity(format!("unknown instance '{row}'"))
        })
    }

    fn require_column(&self, column: &str) -> Result<usize> {
        self.column_position(column).ok_or_else(|| {
            EvaluationError::DataIntegrity(format!("unknown column '{column}'"))
        })
    }
}
