//! Table loading and saving for CSV and XLSX files.
//!
//! Readers check existence and extension before touching the file. Savers
//! never overwrite: an existing destination is left as-is and reported as
//! skipped.

use calamine::{open_workbook_auto, Data, Reader};
use rfq_core::{Error, Result, Table};
use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Outcome of a save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The table was written to this path.
    Written(PathBuf),
    /// The path already existed; nothing was written.
    Skipped(PathBuf),
}

impl SaveOutcome {
    /// Destination path.
    pub fn path(&self) -> &Path {
        match self {
            SaveOutcome::Written(p) | SaveOutcome::Skipped(p) => p,
        }
    }

    /// Whether the table was written.
    pub fn was_written(&self) -> bool {
        matches!(self, SaveOutcome::Written(_))
    }
}

/// File kinds understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Xlsx,
}

impl TableFormat {
    /// Extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Xlsx => "xlsx",
        }
    }

    /// Detect the format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(TableFormat::Csv),
            "xlsx" => Some(TableFormat::Xlsx),
            _ => None,
        }
    }
}

/// Read a table, choosing the reader by extension.
pub fn read_table(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    match TableFormat::from_path(path) {
        Some(TableFormat::Csv) => read_csv_table(path),
        Some(TableFormat::Xlsx) => read_xlsx_table(path),
        None => Err(unsupported(path, "csv or .xlsx")),
    }
}

/// Read a CSV file with a header row.
pub fn read_csv_table(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    check_input(path, TableFormat::Csv)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::format(format!("{}: {e}", path.display())))?;

    let columns = header_names(
        reader
            .headers()
            .map_err(|e| Error::format(format!("{}: {e}", path.display())))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string()),
    );

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| Error::format(format!("{} row {}: {e}", path.display(), idx + 1)))?;
        let row = record.iter().map(str::to_string).collect();
        rows.push(fit_row(row, columns.len(), path, idx + 1)?);
    }

    let table = Table::new(columns, rows)?;
    info!(path = %path.display(), rows = table.len(), cols = table.columns().len(), "loaded CSV");
    Ok(table)
}

/// Read the first worksheet of an XLSX file; the first row is the header.
pub fn read_xlsx_table(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    check_input(path, TableFormat::Xlsx)?;

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::format(format!("failed to open {}: {e}", path.display())))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::format(format!("{} contains no sheets", path.display())))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| Error::format(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut iter = range.rows();
    let columns = match iter.next() {
        Some(header) => header_names(header.iter().map(cell_text)),
        None => Vec::new(),
    };

    let rows = iter
        .enumerate()
        .map(|(idx, row)| {
            let cells = row.iter().map(cell_text).collect();
            fit_row(cells, columns.len(), path, idx + 1)
        })
        .collect::<Result<Vec<_>>>()?;

    let table = Table::new(columns, rows)?;
    info!(path = %path.display(), sheet = %sheet_name, rows = table.len(), "loaded XLSX");
    Ok(table)
}

/// Write a table as CSV into `dir`, unless the file already exists.
pub fn save_csv_table(
    table: &Table,
    dir: impl AsRef<Path>,
    filename: &str,
) -> Result<SaveOutcome> {
    let path = prepare_output(dir.as_ref(), filename)?;
    if path.exists() {
        info!(path = %path.display(), "file already exists, skipping save");
        return Ok(SaveOutcome::Skipped(path));
    }

    let mut writer = csv::Writer::from_path(&path)
        .map_err(|e| Error::format(format!("{}: {e}", path.display())))?;
    writer
        .write_record(table.columns())
        .map_err(|e| Error::format(e.to_string()))?;
    for row in table.rows() {
        writer
            .write_record(row)
            .map_err(|e| Error::format(e.to_string()))?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = table.len(), "saved CSV");
    Ok(SaveOutcome::Written(path))
}

/// Write a table as a single-sheet XLSX workbook into `dir`, unless the file
/// already exists.
pub fn save_xlsx_table(
    table: &Table,
    dir: impl AsRef<Path>,
    filename: &str,
) -> Result<SaveOutcome> {
    let path = prepare_output(dir.as_ref(), filename)?;
    if path.exists() {
        info!(path = %path.display(), "file already exists, skipping save");
        return Ok(SaveOutcome::Skipped(path));
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in table.columns().iter().enumerate() {
        worksheet
            .write_string(0, xlsx_col(col)?, name)
            .map_err(|e| Error::format(e.to_string()))?;
    }
    for (r, row) in table.rows().iter().enumerate() {
        let r = u32::try_from(r + 1)
            .map_err(|_| Error::format(format!("too many rows for XLSX: {}", table.len())))?;
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            worksheet
                .write_string(r, xlsx_col(col)?, value)
                .map_err(|e| Error::format(e.to_string()))?;
        }
    }

    workbook
        .save(&path)
        .map_err(|e| Error::format(format!("failed to save {}: {e}", path.display())))?;

    info!(path = %path.display(), rows = table.len(), "saved XLSX");
    Ok(SaveOutcome::Written(path))
}

/// Save by the filename's extension.
pub fn save_table(table: &Table, dir: impl AsRef<Path>, filename: &str) -> Result<SaveOutcome> {
    match TableFormat::from_path(Path::new(filename)) {
        Some(TableFormat::Csv) => save_csv_table(table, dir, filename),
        Some(TableFormat::Xlsx) => save_xlsx_table(table, dir, filename),
        None => Err(unsupported(Path::new(filename), "csv or .xlsx")),
    }
}

fn check_input(path: &Path, format: TableFormat) -> Result<()> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }
    if TableFormat::from_path(path) != Some(format) {
        return Err(unsupported(path, format.extension()));
    }
    Ok(())
}

fn unsupported(path: &Path, expected: &str) -> Error {
    Error::UnsupportedExtension {
        path: path.to_path_buf(),
        expected: expected.to_string(),
        found: path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default(),
    }
}

fn prepare_output(dir: &Path, filename: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    Ok(dir.join(filename))
}

/// Pad short rows with empty cells. A row wider than the header is an error.
fn fit_row(mut row: Vec<String>, width: usize, path: &Path, line: usize) -> Result<Vec<String>> {
    if row.len() > width {
        return Err(Error::format(format!(
            "{} row {line}: {} cells, header has {width}",
            path.display(),
            row.len()
        )));
    }
    row.resize(width, String::new());
    Ok(row)
}

/// Blank header cells are named `Unnamed: <position>`.
fn header_names(cells: impl Iterator<Item = String>) -> Vec<String> {
    cells
        .enumerate()
        .map(|(idx, name)| {
            if name.trim().is_empty() {
                format!("Unnamed: {idx}")
            } else {
                name
            }
        })
        .collect()
}

fn xlsx_col(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| Error::format(format!("too many columns for XLSX: {col}")))
}

/// Render a worksheet cell as text. Whole floats print without decimals.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{e:?}"),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
    }
}
