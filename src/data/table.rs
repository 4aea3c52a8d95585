//! Generic column-oriented text table, as produced by the IPAC/ECSV readers.
//!
//! Cells are kept as trimmed strings and only interpreted when a typed view is
//! requested (`floats`, `bools`), so the readers stay format-only.

use std::collections::BTreeMap;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub unit: Option<String>,
    pub cells: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, unit: Option<String>) -> Self {
        Self {
            name: name.into(),
            unit,
            cells: Vec::new(),
        }
    }

    /// Interpret the column as floats. Null markers (`nan`, `null`, `--`,
    /// empty) become NaN.
    pub fn floats(&self) -> Result<Vec<f64>, AppError> {
        self.cells
            .iter()
            .enumerate()
            .map(|(row, cell)| {
                if is_null(cell) {
                    return Ok(f64::NAN);
                }
                cell.parse::<f64>().map_err(|_| {
                    AppError::input(format!(
                        "Column '{}' row {}: '{}' is not a number",
                        self.name,
                        row + 1,
                        cell
                    ))
                })
            })
            .collect()
    }

    /// Interpret the column as booleans (`0/1`, `True/False`, `T/F`).
    pub fn bools(&self) -> Result<Vec<bool>, AppError> {
        self.cells
            .iter()
            .enumerate()
            .map(|(row, cell)| match cell.to_ascii_lowercase().as_str() {
                "1" | "1.0" | "true" | "t" | "yes" => Ok(true),
                "0" | "0.0" | "false" | "f" | "no" | "" => Ok(false),
                _ => Err(AppError::input(format!(
                    "Column '{}' row {}: '{}' is not a boolean",
                    self.name,
                    row + 1,
                    cell
                ))),
            })
            .collect()
    }
}

fn is_null(cell: &str) -> bool {
    matches!(
        cell.to_ascii_lowercase().as_str(),
        "" | "nan" | "null" | "none" | "--"
    )
}

/// A named set of equally long columns plus free-form metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
    pub meta: BTreeMap<String, String>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.cells.len()).unwrap_or(0)
    }

    /// Append one row of cells. The row must have one cell per column.
    pub fn push_row(&mut self, cells: Vec<String>, line: usize) -> Result<(), AppError> {
        if cells.len() != self.columns.len() {
            return Err(AppError::input(format!(
                "Line {line}: expected {} values, found {}",
                self.columns.len(),
                cells.len()
            )));
        }
        for (column, cell) in self.columns.iter_mut().zip(cells) {
            column.cells.push(cell);
        }
        Ok(())
    }

    pub fn meta_f64(&self, key: &str) -> Result<Option<f64>, AppError> {
        match self.meta.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| AppError::input(format!("Metadata '{key}' = '{raw}' is not a number"))),
        }
    }
}
