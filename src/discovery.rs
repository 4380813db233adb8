//! Source file discovery by file name convention.

use crate::config::{COUNTRY_FILE_MARKER, PORT_FILE_EXTENSIONS};
use crate::types::Year;
use crate::util::extract_year;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A yearly statistics file and the year token in its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub year: Year,
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Files directly inside `dir` whose name contains `marker` and carries one
/// of `extensions`, sorted by file name.
///
/// Subdirectories are not searched. A missing or unreadable directory yields
/// an empty list.
pub fn matching_files(dir: &Path, marker: &str, extensions: &[&str]) -> Vec<PathBuf> {
    if !dir.is_dir() {
        warn!("Cannot list {}: not a directory", dir.display());
        return Vec::new();
    }

    WalkDir::new(dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.contains(marker))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .filter(|p| has_extension(p, extensions))
        .collect()
}

/// Yearly port statistics files with their extracted year.
pub fn discover_port_files(dir: &Path, marker: &str) -> Vec<SourceFile> {
    let files: Vec<SourceFile> = matching_files(dir, marker, PORT_FILE_EXTENSIONS)
        .into_iter()
        .map(|path| {
            let year = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(extract_year)
                .unwrap_or(Year::Unknown);
            SourceFile { path, year }
        })
        .collect();
    debug!("Discovered {} port statistics files in {}", files.len(), dir.display());
    files
}

/// Most recent country reference file in `dir`.
///
/// File names end in a date stamp, so the last one in name order is the
/// newest export.
pub fn find_country_file(dir: &Path) -> Option<PathBuf> {
    matching_files(dir, COUNTRY_FILE_MARKER, &["csv"]).pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_filters_by_marker_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("관세환급_2022.csv"), "x").unwrap();
        fs::write(dir.path().join("관세환급_2021.XLSX"), "x").unwrap();
        fs::write(dir.path().join("관세환급_통계.csv"), "x").unwrap();
        fs::write(dir.path().join("관세환급_2020.txt"), "x").unwrap();
        fs::write(dir.path().join("other_2020.csv"), "x").unwrap();

        let files = discover_port_files(dir.path(), "관세환급");
        let years: Vec<Year> = files.iter().map(|f| f.year).collect();
        assert_eq!(files.len(), 3);
        assert!(years.contains(&Year::Known(2021)));
        assert!(years.contains(&Year::Known(2022)));
        assert!(years.contains(&Year::Unknown));
    }

    #[test]
    fn test_subdirectories_are_not_searched() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("관세환급_archive");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("관세환급_2019.csv"), "x").unwrap();
        fs::write(dir.path().join("관세환급_2022.csv"), "x").unwrap();
        fs::write(dir.path().join("관세환급_2020.csv"), "x").unwrap();

        let files = discover_port_files(dir.path(), "관세환급");
        let years: Vec<Year> = files.iter().map(|f| f.year).collect();
        assert_eq!(years, vec![Year::Known(2020), Year::Known(2022)]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = discover_port_files(&dir.path().join("nope"), "관세환급");
        assert!(files.is_empty());
    }

    #[test]
    fn test_find_country_file_picks_latest_stamp() {
        let dir = tempfile::tempdir().unwrap();
        for stamp in ["20240101", "20251211"] {
            let name = format!("산업통상부_무역구제 국가 기준정보_{}.csv", stamp);
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let found = find_country_file(dir.path()).unwrap();
        assert!(found.to_string_lossy().ends_with("20251211.csv"));
    }
}
