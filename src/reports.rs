use crate::config::CONTINENT_CATEGORY_LABEL;
use crate::loader::PortLoadReport;
use crate::types::{
    Continent, ContinentCountRow, CountryExportRow, CountryKpis, CountryRecord, CountryRow,
    PortRankingRow, PortRow, PortSummary, PortYearRecord, UsageShareRow, Year, YearTotalRow,
};
use crate::util::{format_number, format_opt, percent};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

fn flag(b: bool) -> String {
    let s = if b { "Y" } else { "N" };
    s.to_string()
}

pub fn country_rows(records: &[&CountryRecord]) -> Vec<CountryRow> {
    records
        .iter()
        .map(|r| CountryRow {
            country_code: r.country_code.clone().unwrap_or_default(),
            name: r.name.clone().unwrap_or_default(),
            english_name: r.english_name.clone().unwrap_or_default(),
            continent: r.continent.name().unwrap_or_default().to_string(),
            in_use: flag(r.in_use),
        })
        .collect()
}

/// Export rows keep the id, marker and parent columns the preview leaves out.
pub fn country_export_rows(records: &[&CountryRecord]) -> Vec<CountryExportRow> {
    records
        .iter()
        .map(|r| CountryExportRow {
            country_id: r.country_id.clone(),
            name: r.name.clone().unwrap_or_default(),
            english_name: r.english_name.clone().unwrap_or_default(),
            country_code: r.country_code.clone().unwrap_or_default(),
            is_continent_marker: flag(r.is_continent_marker),
            parent_category_id: r.parent_category_id.clone().unwrap_or_default(),
            in_use: flag(r.in_use),
            continent: r.continent.name().unwrap_or_default().to_string(),
        })
        .collect()
}

pub fn country_kpis(all: &[CountryRecord], filtered: usize) -> CountryKpis {
    let continent_markers = all.iter().filter(|r| r.is_continent_marker).count();
    CountryKpis {
        total_entries: all.len(),
        countries: all.len() - continent_markers,
        continent_markers,
        unmapped: all
            .iter()
            .filter(|r| r.continent == Continent::Unmapped)
            .count(),
        filtered,
    }
}

/// Number of countries per continent. Continent rows and unmapped countries
/// are left out.
pub fn continent_distribution(records: &[CountryRecord]) -> Vec<ContinentCountRow> {
    let mut map: BTreeMap<&str, usize> = BTreeMap::new();
    for r in records {
        if let Continent::Named(name) = &r.continent {
            if name != CONTINENT_CATEGORY_LABEL {
                *map.entry(name.as_str()).or_default() += 1;
            }
        }
    }
    let mut rows: Vec<ContinentCountRow> = map
        .into_iter()
        .map(|(continent, countries)| ContinentCountRow {
            continent: continent.to_string(),
            countries,
        })
        .collect();
    rows.sort_by(|a, b| b.countries.cmp(&a.countries));
    rows
}

pub fn usage_share(records: &[CountryRecord]) -> Vec<UsageShareRow> {
    let in_use = records.iter().filter(|r| r.in_use).count();
    let total = records.len();
    [(true, in_use), (false, total - in_use)]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(flag_value, entries)| UsageShareRow {
            in_use: flag(flag_value),
            entries,
            share_pct: format_number(percent(entries as f64, total as f64), 2),
        })
        .collect()
}

pub fn port_rows(records: &[&PortYearRecord]) -> Vec<PortRow> {
    records
        .iter()
        .map(|r| PortRow {
            port_code: r.port_code.clone().unwrap_or_default(),
            port_name: r.port_name.clone(),
            year: r.year.to_string(),
            count: format_opt(r.count, 0),
            amount: format_opt(r.amount, 0),
        })
        .collect()
}

/// Sum of the present values; `None` cells are skipped.
fn sum_present(values: impl Iterator<Item = Option<f64>>) -> f64 {
    values.flatten().sum()
}

/// Totals per year, known years ascending and unknown last.
pub fn yearly_totals(records: &[&PortYearRecord]) -> Vec<YearTotalRow> {
    #[derive(Default)]
    struct Acc<'a> {
        ports: BTreeSet<&'a str>,
        count: f64,
        amount: f64,
        missing: usize,
    }
    let mut map: BTreeMap<Year, Acc> = BTreeMap::new();
    for r in records {
        let e = map.entry(r.year).or_default();
        e.ports.insert(r.port_name.as_str());
        e.count += r.count.unwrap_or(0.0);
        e.amount += r.amount.unwrap_or(0.0);
        e.missing += r.count.is_none() as usize + r.amount.is_none() as usize;
    }
    map.into_iter()
        .map(|(year, acc)| YearTotalRow {
            year: year.to_string(),
            ports: acc.ports.len(),
            total_count: format_number(acc.count, 0),
            total_amount: format_number(acc.amount, 0),
            missing_values: acc.missing,
        })
        .collect()
}

/// Ports ranked by total amount across the selected years.
pub fn port_ranking(records: &[&PortYearRecord], top: usize) -> Vec<PortRankingRow> {
    #[derive(Default)]
    struct Acc {
        code: Option<String>,
        years: BTreeSet<Year>,
        count: f64,
        amount: f64,
    }
    let mut map: HashMap<&str, Acc> = HashMap::new();
    for r in records {
        let e = map.entry(r.port_name.as_str()).or_default();
        if e.code.is_none() {
            e.code = r.port_code.clone();
        }
        e.years.insert(r.year);
        e.count += r.count.unwrap_or(0.0);
        e.amount += r.amount.unwrap_or(0.0);
    }
    let grand_total = sum_present(records.iter().map(|r| r.amount));

    let mut tmp: Vec<(&str, Acc)> = map.into_iter().collect();
    tmp.sort_by(|a, b| {
        b.1.amount
            .partial_cmp(&a.1.amount)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    tmp.into_iter()
        .take(top)
        .enumerate()
        .map(|(idx, (name, acc))| PortRankingRow {
            rank: idx + 1,
            port_code: acc.code.unwrap_or_default(),
            port_name: name.to_string(),
            years: acc.years.len(),
            total_count: format_number(acc.count, 0),
            total_amount: format_number(acc.amount, 0),
            share_pct: format_number(percent(acc.amount, grand_total), 2),
        })
        .collect()
}

pub fn port_summary(records: &[&PortYearRecord], report: &PortLoadReport) -> PortSummary {
    let years: BTreeSet<Year> = records.iter().map(|r| r.year).collect();
    PortSummary {
        files_found: report.files_found,
        files_loaded: report.files_loaded,
        files_skipped: report
            .skipped
            .iter()
            .map(|s| s.path.display().to_string())
            .collect(),
        total_records: records.len(),
        years: years.into_iter().collect(),
        duplicate_years: report.duplicate_years.clone(),
        total_count: sum_present(records.iter().map(|r| r.count)),
        total_amount: sum_present(records.iter().map(|r| r.amount)),
        coercion_failures: report.coercion_failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(name: &str, year: Year, count: Option<f64>, amount: Option<f64>) -> PortYearRecord {
        PortYearRecord {
            port_code: Some(format!("C-{}", name)),
            port_name: name.to_string(),
            year,
            count,
            amount,
        }
    }

    fn country(name: &str, continent: Continent, marker: bool, in_use: bool) -> CountryRecord {
        CountryRecord {
            country_id: name.to_string(),
            country_code: None,
            name: Some(name.to_string()),
            english_name: None,
            is_continent_marker: marker,
            parent_category_id: None,
            in_use,
            continent,
        }
    }

    #[test]
    fn test_export_rows_keep_id_and_parent_columns() {
        let mut korea = country("Korea", Continent::Named("Asia".to_string()), false, true);
        korea.country_id = "10".to_string();
        korea.parent_category_id = Some("1".to_string());
        let asia = country("Asia", Continent::Category, true, true);

        let rows = country_export_rows(&[&korea, &asia]);
        assert_eq!(rows[0].country_id, "10");
        assert_eq!(rows[0].parent_category_id, "1");
        assert_eq!(rows[0].is_continent_marker, "N");
        assert_eq!(rows[0].continent, "Asia");
        assert_eq!(rows[1].is_continent_marker, "Y");
        assert_eq!(rows[1].parent_category_id, "");
        assert_eq!(rows[1].continent, CONTINENT_CATEGORY_LABEL);
    }

    #[test]
    fn test_yearly_totals_groups_unknown_last() {
        let records = vec![
            port("부산", Year::Unknown, Some(1.0), Some(10.0)),
            port("부산", Year::Known(2022), Some(2.0), Some(1000.0)),
            port("인천", Year::Known(2022), None, Some(500.0)),
            port("부산", Year::Known(2021), Some(3.0), Some(30.0)),
        ];
        let refs: Vec<&PortYearRecord> = records.iter().collect();
        let rows = yearly_totals(&refs);
        let years: Vec<&str> = rows.iter().map(|r| r.year.as_str()).collect();
        assert_eq!(years, vec!["2021", "2022", "unknown"]);
        assert_eq!(rows[1].ports, 2);
        assert_eq!(rows[1].total_amount, "1,500");
        assert_eq!(rows[1].total_count, "2");
        assert_eq!(rows[1].missing_values, 1);
    }

    #[test]
    fn test_port_ranking_orders_by_amount() {
        let records = vec![
            port("부산", Year::Known(2021), Some(1.0), Some(100.0)),
            port("부산", Year::Known(2022), Some(1.0), Some(200.0)),
            port("인천", Year::Known(2022), Some(1.0), Some(700.0)),
            port("평택", Year::Known(2022), Some(1.0), None),
        ];
        let refs: Vec<&PortYearRecord> = records.iter().collect();
        let rows = port_ranking(&refs, 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].port_name, "인천");
        assert_eq!(rows[0].share_pct, "70.00");
        assert_eq!(rows[1].port_name, "부산");
        assert_eq!(rows[1].years, 2);
    }

    #[test]
    fn test_port_summary_counts_present_values() {
        let records = vec![
            port("부산", Year::Known(2021), Some(1.0), Some(100.0)),
            port("부산", Year::Unknown, None, Some(50.0)),
        ];
        let refs: Vec<&PortYearRecord> = records.iter().collect();
        let summary = port_summary(&refs, &PortLoadReport::default());
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.total_count, 1.0);
        assert_eq!(summary.total_amount, 150.0);
        assert_eq!(summary.years, vec![Year::Known(2021), Year::Unknown]);
    }

    #[test]
    fn test_continent_distribution_and_kpis() {
        let records = vec![
            country("Asia", Continent::Category, true, true),
            country("Korea", Continent::Named("Asia".into()), false, true),
            country("Japan", Continent::Named("Asia".into()), false, true),
            country("France", Continent::Named("Europe".into()), false, false),
            country("Atlantis", Continent::Unmapped, false, false),
        ];
        let dist = continent_distribution(&records);
        assert_eq!(dist.len(), 2);
        assert_eq!(dist[0].continent, "Asia");
        assert_eq!(dist[0].countries, 2);

        let kpis = country_kpis(&records, 3);
        assert_eq!(kpis.total_entries, 5);
        assert_eq!(kpis.countries, 4);
        assert_eq!(kpis.continent_markers, 1);
        assert_eq!(kpis.unmapped, 1);

        let usage = usage_share(&records);
        assert_eq!(usage[0].in_use, "Y");
        assert_eq!(usage[0].entries, 3);
        assert_eq!(usage[0].share_pct, "60.00");
    }

    #[test]
    fn test_country_rows_leave_unmapped_blank() {
        let records = vec![
            country("Asia", Continent::Category, true, true),
            country("Atlantis", Continent::Unmapped, false, false),
        ];
        let refs: Vec<&CountryRecord> = records.iter().collect();
        let rows = country_rows(&refs);
        assert_eq!(rows[0].continent, CONTINENT_CATEGORY_LABEL);
        assert_eq!(rows[1].continent, "");
        assert_eq!(rows[1].in_use, "N");
    }
}
