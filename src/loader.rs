use crate::config::{PortOptions, SUBTOTAL_MARKER};
use crate::discovery::SourceFile;
use crate::error::{PipelineError, Result};
use crate::table::{read_table, read_text, RawTable};
use crate::types::{Continent, CountryRecord, PortYearRecord, RawCountryRow, Year};
use crate::util::{clean_text, coerce_number, normalize_id, parse_flag};
use csv::ReaderBuilder;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CountryDataset {
    pub records: Vec<CountryRecord>,
    pub total_rows: usize,
    pub parse_errors: usize,
}

/// Attach a continent to every raw row.
///
/// Continent rows map their id to their name; every other row looks its
/// parent id up in that map. Continent rows themselves get the category
/// label instead of a looked-up name. Rows without an id are dropped.
pub fn resolve_continents(rows: Vec<RawCountryRow>) -> Vec<CountryRecord> {
    let parsed: Vec<CountryRecord> = rows
        .into_iter()
        .filter_map(|row| {
            let country_id = normalize_id(row.country_id.as_deref())?;
            Some(CountryRecord {
                country_id,
                country_code: clean_text(row.country_code),
                name: clean_text(row.name),
                english_name: clean_text(row.english_name),
                is_continent_marker: parse_flag(row.is_continent_marker.as_deref()),
                parent_category_id: normalize_id(row.parent_category_id.as_deref()),
                in_use: parse_flag(row.in_use.as_deref()),
                continent: Continent::Unmapped,
            })
        })
        .collect();

    let continents: HashMap<String, String> = parsed
        .iter()
        .filter(|r| r.is_continent_marker)
        .filter_map(|r| Some((r.country_id.clone(), r.name.clone()?)))
        .collect();

    parsed
        .into_iter()
        .map(|mut r| {
            r.continent = if r.is_continent_marker {
                Continent::Category
            } else {
                r.parent_category_id
                    .as_ref()
                    .and_then(|p| continents.get(p))
                    .map(|n| Continent::Named(n.clone()))
                    .unwrap_or(Continent::Unmapped)
            };
            r
        })
        .collect()
}

/// Parse the country master CSV text (with header row).
pub fn parse_countries(text: &str) -> Result<CountryDataset> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut rows = Vec::new();

    for result in rdr.deserialize::<RawCountryRow>() {
        total_rows += 1;
        match result {
            Ok(r) => rows.push(r),
            Err(e) => {
                warn!("Skipping malformed country row: {}", e);
                parse_errors += 1;
            }
        }
    }

    let with_id = rows.len();
    let records = resolve_continents(rows);
    parse_errors += with_id - records.len();
    Ok(CountryDataset {
        records,
        total_rows,
        parse_errors,
    })
}

/// Load and resolve the country master file.
pub fn load_countries(path: &Path) -> Result<CountryDataset> {
    info!("Loading country reference: {}", path.display());
    let text = read_text(path)?;
    parse_countries(&text)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPortFile {
    pub records: Vec<PortYearRecord>,
    pub excluded_rows: usize,
    pub coercion_failures: usize,
}

fn cell_at(row: &[String], col: usize) -> &str {
    row.get(col).map(|c| c.trim()).unwrap_or("")
}

fn is_excluded_name(name: &str, header_labels: &HashSet<&str>) -> bool {
    name.contains(SUBTOTAL_MARKER) || header_labels.contains(name)
}

/// Turn the body of one statistics table into records.
///
/// Code, name, count and amount come from fixed positions; rows with an
/// empty name, a subtotal label or a repeated header label are dropped.
/// Trailing positions are taken from the width of the data rows, which must
/// all agree; a ragged data row fails the whole file.
pub fn parse_port_table(
    path: &Path,
    table: &RawTable,
    year: Year,
    options: &PortOptions,
) -> Result<ParsedPortFile> {
    let layout = &options.layout;
    let header_labels: HashSet<&str> = table
        .header
        .iter()
        .map(|row| cell_at(row, layout.name_col))
        .filter(|label| !label.is_empty())
        .collect();

    let mut excluded_rows = 0usize;
    let mut data_rows = Vec::new();
    for (index, (row, &len)) in table.body.iter().zip(&table.body_lens).enumerate() {
        let name = cell_at(row, layout.name_col);
        if name.is_empty() || is_excluded_name(name, &header_labels) {
            excluded_rows += 1;
            continue;
        }
        data_rows.push((index, row, name, len));
    }

    let width = data_rows.first().map(|&(_, _, _, len)| len).unwrap_or(table.width);
    if let Some(&(index, _, _, found)) = data_rows.iter().find(|&&(_, _, _, len)| len != width) {
        return Err(PipelineError::RaggedRow {
            path: path.display().to_string(),
            line: table.header.len() + index + 1,
            expected: width,
            found,
        });
    }
    let (code_col, _, count_col, amount_col) =
        layout.resolve(width).ok_or_else(|| PipelineError::Layout {
            path: path.display().to_string(),
            expected: layout.min_columns(),
            found: width,
        })?;

    let mut records = Vec::with_capacity(data_rows.len());
    let mut coercion_failures = 0usize;
    for (_, row, name, _) in data_rows {
        let (count, count_failed) = coerce_number(Some(&row[count_col]), options.number_policy);
        let (amount, amount_failed) =
            coerce_number(Some(&row[amount_col]), options.number_policy);
        coercion_failures += count_failed as usize + amount_failed as usize;

        records.push(PortYearRecord {
            port_code: clean_text(Some(row[code_col].clone())),
            port_name: name.to_string(),
            year,
            count,
            amount,
        });
    }

    Ok(ParsedPortFile {
        records,
        excluded_rows,
        coercion_failures,
    })
}

/// Read and parse one yearly statistics file.
pub fn load_port_file(source: &SourceFile, options: &PortOptions) -> Result<ParsedPortFile> {
    let table = read_table(&source.path, options.layout.header_rows)?;
    parse_port_table(&source.path, &table, source.year, options)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct PortLoadReport {
    pub files_found: usize,
    pub files_loaded: usize,
    pub skipped: Vec<SkippedFile>,
    pub excluded_rows: usize,
    pub coercion_failures: usize,
    /// Years contributed by more than one file; their totals double count.
    pub duplicate_years: Vec<Year>,
}

#[derive(Debug, Clone, Default)]
pub struct PortDataset {
    pub records: Vec<PortYearRecord>,
    pub report: PortLoadReport,
}

/// Concatenate every parseable file, tagging rows with the file's year.
///
/// A file that fails to read or does not fit the layout is skipped with a
/// warning; the remaining files still load.
pub fn concat_port_files(files: &[SourceFile], options: &PortOptions) -> PortDataset {
    let mut records = Vec::new();
    let mut report = PortLoadReport {
        files_found: files.len(),
        ..PortLoadReport::default()
    };
    let mut files_per_year: BTreeMap<Year, usize> = BTreeMap::new();

    for source in files {
        match load_port_file(source, options) {
            Ok(parsed) => {
                info!(
                    "Loaded {} rows from {} (year {})",
                    parsed.records.len(),
                    source.path.display(),
                    source.year
                );
                report.files_loaded += 1;
                report.excluded_rows += parsed.excluded_rows;
                report.coercion_failures += parsed.coercion_failures;
                *files_per_year.entry(source.year).or_default() += 1;
                records.extend(parsed.records);
            }
            Err(e) => {
                warn!("Skipping {}: {}", source.path.display(), e);
                report.skipped.push(SkippedFile {
                    path: source.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report.duplicate_years = files_per_year
        .into_iter()
        .filter(|(year, n)| *n > 1 && *year != Year::Unknown)
        .map(|(year, _)| year)
        .collect();
    for year in &report.duplicate_years {
        warn!("Year {} appears in more than one file; totals include both", year);
    }

    PortDataset { records, report }
}
