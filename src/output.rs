use crate::error::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Write `rows` as CSV prefixed with a UTF-8 byte order mark so spreadsheet
/// tools in a CP949 locale open it as UTF-8.
pub fn write_export_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(b"\xEF\xBB\xBF")?;
    let mut wtr = csv::Writer::from_writer(out);
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}", table_str);
    if rows.len() > max_rows {
        println!("... {} more rows", rows.len() - max_rows);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CountryExportRow;

    #[test]
    fn test_export_starts_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        let rows = vec![CountryExportRow {
            country_id: "10".to_string(),
            name: "대한민국".to_string(),
            english_name: "Korea, Republic of".to_string(),
            country_code: "KOR".to_string(),
            is_continent_marker: "N".to_string(),
            parent_category_id: "1".to_string(),
            in_use: "Y".to_string(),
            continent: "아시아".to_string(),
        }];
        write_export_csv(&path, &rows).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("국가아이디,국가명,국가영문명,국가코드,대륙구분여부,상위국가분류아이디,사용여부,대륙명")
        );
        assert_eq!(
            lines.next(),
            Some("10,대한민국,\"Korea, Republic of\",KOR,N,1,Y,아시아")
        );
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_json(&path, &serde_json::json!({ "total_records": 3 })).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total_records"], 3);
    }
}
