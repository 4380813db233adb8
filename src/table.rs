//! Headerless tabular reading of delimited text and spreadsheets.

use crate::config::encoding_candidates;
use crate::error::{PipelineError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode `bytes` with the first candidate encoding that accepts them
/// without replacement characters.
pub fn decode_text(path: &Path, bytes: &[u8]) -> Result<String> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let candidates = encoding_candidates();
    for encoding in candidates {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(body) {
            debug!("Decoded {} as {}", path.display(), encoding.name());
            return Ok(text.into_owned());
        }
    }
    Err(PipelineError::Encoding {
        path: path.display().to_string(),
        tried: candidates
            .iter()
            .map(|e| e.name())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Read a delimited text file, trying each candidate encoding.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    decode_text(path, &bytes)
}

/// Every record of a headerless CSV text, fields untouched.
pub fn csv_grid(text: &str) -> Result<Vec<Vec<String>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }
    Ok(rows)
}

/// Convert a calamine cell to a string
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERROR: {:?}", e),
        Data::DateTime(dt) => format!("{}", dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Cells of the first sheet, positioned as in the file.
///
/// calamine ranges start at the first used cell; leading blank rows and
/// columns are restored so row and column indices match the sheet.
pub fn workbook_grid(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names().to_vec();
    let Some(first) = sheet_names.first() else {
        return Err(PipelineError::NoSheets(path.display().to_string()));
    };
    let range = workbook.worksheet_range(first)?;

    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    let mut rows: Vec<Vec<String>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![String::new(); col_offset];
        cells.extend(row.iter().map(cell_to_string));
        rows.push(cells);
    }
    Ok(rows)
}

/// A table split into its decorative header rows and data body, every row
/// padded to the same width.
///
/// `body_lens` keeps the width each body row had in the file before padding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub header: Vec<Vec<String>>,
    pub body: Vec<Vec<String>>,
    pub body_lens: Vec<usize>,
    pub width: usize,
}

impl RawTable {
    pub fn from_grid(mut grid: Vec<Vec<String>>, header_rows: usize) -> Self {
        let width = grid.iter().map(|r| r.len()).max().unwrap_or(0);
        let split = header_rows.min(grid.len());
        let body_lens = grid[split..].iter().map(|r| r.len()).collect();
        for row in &mut grid {
            row.resize(width, String::new());
        }
        let body = grid.split_off(split);
        Self {
            header: grid,
            body,
            body_lens,
            width,
        }
    }
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            e == "xlsx" || e == "xlsm" || e == "xls" || e == "xlsb" || e == "ods"
        })
        .unwrap_or(false)
}

/// Read `path` (CSV or first spreadsheet sheet) and split off `header_rows`.
pub fn read_table(path: &Path, header_rows: usize) -> Result<RawTable> {
    let grid = if is_spreadsheet(path) {
        workbook_grid(path)?
    } else {
        csv_grid(&read_text(path)?)?
    };
    Ok(RawTable::from_grid(grid, header_rows))
}
