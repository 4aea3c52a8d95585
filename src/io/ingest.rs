//! Text table readers (IPAC and ECSV).
//!
//! Both formats are self-describing: column names, units and table metadata
//! live in a header, followed by whitespace- (or, for ECSV, delimiter-)
//! separated rows. Readers produce a generic [`Table`]; turning it into
//! spectral data (and validating units) is `SpectralTable::from_table`'s job.
//!
//! Any malformed header or row is a hard error with exit code 2.

use std::collections::BTreeMap;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::data::{Column, SpectralTable, Table};
use crate::error::AppError;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Ipac,
    Ecsv,
}

/// Read a table file, detecting the format from its first line.
pub fn read_table(path: &Path) -> Result<Table, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::input(format!("Failed to read table '{}': {e}", path.display())))?;
    let table = parse_table(&text).map_err(|e| e.context(path.display()))?;
    debug!(
        "Read {} rows x {} columns from {}",
        table.n_rows(),
        table.columns.len(),
        path.display()
    );
    Ok(table)
}

/// Read a table file and validate it as spectral data.
pub fn read_spectral_table(path: &Path) -> Result<SpectralTable, AppError> {
    let table = read_table(path)?;
    SpectralTable::from_table(&table).map_err(|e| e.context(path.display()))
}

pub fn detect_format(text: &str) -> Option<TableFormat> {
    let first = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    if first.starts_with("# %ECSV") {
        Some(TableFormat::Ecsv)
    } else if first.starts_with('\\') || first.starts_with('|') {
        Some(TableFormat::Ipac)
    } else {
        None
    }
}

pub fn parse_table(text: &str) -> Result<Table, AppError> {
    match detect_format(text) {
        Some(TableFormat::Ecsv) => parse_ecsv(text),
        Some(TableFormat::Ipac) => parse_ipac(text),
        None => Err(AppError::input(
            "Unrecognized table format (expected an IPAC or ECSV table)",
        )),
    }
}

// ---------------------------------------------------------------------------
// IPAC
// ---------------------------------------------------------------------------

fn split_ipac_header(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|s| s.trim().to_string()).collect()
}

fn unquote(value: &str) -> String {
    let v = value.trim();
    let stripped = v
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| v.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
    stripped.unwrap_or(v).to_string()
}

pub fn parse_ipac(text: &str) -> Result<Table, AppError> {
    let mut meta = BTreeMap::new();
    let mut header_rows: Vec<Vec<String>> = Vec::new();
    let mut table: Option<Table> = None;
    let mut nulls: Vec<String> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('\\') {
            if table.is_some() {
                return Err(AppError::input(format!(
                    "Line {line_no}: keyword after the data section"
                )));
            }
            // `\key = value` is a keyword, `\ text` a comment.
            if let Some((key, value)) = rest.split_once('=') {
                let key = key.trim();
                if !key.is_empty() && !key.contains(char::is_whitespace) {
                    meta.insert(key.to_string(), unquote(value));
                }
            }
            continue;
        }

        if line.trim_start().starts_with('|') {
            if table.is_some() {
                return Err(AppError::input(format!(
                    "Line {line_no}: header row after the data section"
                )));
            }
            header_rows.push(split_ipac_header(line));
            continue;
        }

        if table.is_none() {
            table = Some(ipac_columns(&header_rows, &mut nulls)?);
        }
        if let Some(t) = table.as_mut() {
            let cells = line
                .split_whitespace()
                .zip(nulls.iter().map(String::as_str).chain(std::iter::repeat("")))
                .map(|(cell, null)| {
                    if !null.is_empty() && cell == null {
                        "nan".to_string()
                    } else {
                        cell.to_string()
                    }
                })
                .collect();
            t.push_row(cells, line_no)?;
        }
    }

    let mut table = match table {
        Some(t) => t,
        None => ipac_columns(&header_rows, &mut nulls)?,
    };
    table.meta = meta;
    Ok(table)
}

fn ipac_columns(header_rows: &[Vec<String>], nulls: &mut Vec<String>) -> Result<Table, AppError> {
    let names = header_rows
        .first()
        .ok_or_else(|| AppError::input("IPAC table has no '|name|' header row"))?;
    for (i, row) in header_rows.iter().enumerate().skip(1) {
        if row.len() != names.len() {
            return Err(AppError::input(format!(
                "IPAC header row {} has {} fields, expected {}",
                i + 1,
                row.len(),
                names.len()
            )));
        }
    }
    let units = header_rows.get(2);
    *nulls = header_rows.get(3).cloned().unwrap_or_default();

    let columns = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let unit = units
                .and_then(|u| u.get(i))
                .filter(|u| !u.is_empty())
                .cloned();
            Column::new(name.clone(), unit)
        })
        .collect();
    Ok(Table {
        columns,
        meta: BTreeMap::new(),
    })
}

// ---------------------------------------------------------------------------
// ECSV
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EcsvHeader {
    datatype: Vec<EcsvColumn>,
    #[serde(default)]
    delimiter: Option<String>,
    #[serde(default)]
    meta: Option<serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct EcsvColumn {
    name: String,
    #[serde(default)]
    unit: Option<String>,
}

pub fn parse_ecsv(text: &str) -> Result<Table, AppError> {
    let mut yaml = String::new();
    let mut body = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_end();
        if let Some(rest) = line.strip_prefix('#') {
            if rest.trim_start().starts_with("%ECSV") {
                continue;
            }
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            if rest.trim() == "---" {
                continue;
            }
            yaml.push_str(rest);
            yaml.push('\n');
        } else if !line.trim().is_empty() {
            body.push((idx + 1, line));
        }
    }

    let header: EcsvHeader = serde_yaml::from_str(&yaml)
        .map_err(|e| AppError::input(format!("Invalid ECSV header: {e}")))?;
    let delimiter = match header.delimiter.as_deref() {
        None | Some(" ") => None,
        Some(",") => Some(','),
        Some(other) => {
            return Err(AppError::input(format!("Unsupported ECSV delimiter '{other}'")));
        }
    };
    let split = |line: &str| -> Vec<String> {
        match delimiter {
            Some(d) => line.split(d).map(|s| s.trim().to_string()).collect(),
            None => line.split_whitespace().map(str::to_string).collect(),
        }
    };

    let mut lines = body.into_iter();
    let (names_line, names) = match lines.next() {
        Some((n, l)) => (n, split(l)),
        None => return Err(AppError::input("ECSV table has no column-name line")),
    };
    let declared: Vec<&str> = header.datatype.iter().map(|c| c.name.as_str()).collect();
    if names != declared {
        return Err(AppError::input(format!(
            "Line {names_line}: column names {names:?} do not match the ECSV header {declared:?}"
        )));
    }

    let mut table = Table {
        columns: header
            .datatype
            .into_iter()
            .map(|c| Column::new(c.name, c.unit.filter(|u| !u.trim().is_empty())))
            .collect(),
        meta: ecsv_meta(header.meta),
    };
    for (line_no, line) in lines {
        table.push_row(split(line), line_no)?;
    }
    Ok(table)
}

/// Flatten ECSV `meta` (a mapping, or an `!!omap` list of one-key mappings)
/// into string key/value pairs. Non-scalar values are skipped.
fn ecsv_meta(meta: Option<serde_yaml::Value>) -> BTreeMap<String, String> {
    use serde_yaml::Value;

    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Tagged(t) => scalar(&t.value),
            _ => None,
        }
    }

    fn collect(value: &Value, out: &mut BTreeMap<String, String>) {
        match value {
            Value::Mapping(map) => {
                for (k, v) in map {
                    if let (Some(k), Some(v)) = (scalar(k), scalar(v)) {
                        out.insert(k, v);
                    }
                }
            }
            Value::Sequence(items) => items.iter().for_each(|item| collect(item, out)),
            Value::Tagged(t) => collect(&t.value, out),
            _ => {}
        }
    }

    let mut out = BTreeMap::new();
    if let Some(meta) = meta {
        collect(&meta, &mut out);
    }
    out
}
