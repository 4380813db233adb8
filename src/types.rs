use crate::config::CONTINENT_CATEGORY_LABEL;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use tabled::Tabled;

/// One row of the country master file, as written by the ministry export.
#[derive(Debug, Deserialize)]
pub struct RawCountryRow {
    #[serde(rename = "국가아이디", alias = "country_id")]
    pub country_id: Option<String>,
    #[serde(rename = "국가명", alias = "name")]
    pub name: Option<String>,
    #[serde(rename = "국가영문명", alias = "english_name")]
    pub english_name: Option<String>,
    #[serde(rename = "국가코드", alias = "country_code", alias = "code")]
    pub country_code: Option<String>,
    #[serde(rename = "대륙구분여부", alias = "is_continent_marker")]
    pub is_continent_marker: Option<String>,
    #[serde(rename = "상위국가분류아이디", alias = "parent_category_id")]
    pub parent_category_id: Option<String>,
    #[serde(rename = "사용여부", alias = "in_use")]
    pub in_use: Option<String>,
}

/// Continent membership derived from the parent category id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Continent {
    /// Name of the continent row the parent id points at
    Named(String),
    /// The record is itself a continent row
    Category,
    /// Parent id missing or not a continent row
    Unmapped,
}

impl Continent {
    pub fn name(&self) -> Option<&str> {
        match self {
            Continent::Named(n) => Some(n.as_str()),
            Continent::Category => Some(CONTINENT_CATEGORY_LABEL),
            Continent::Unmapped => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryRecord {
    pub country_id: String,
    pub country_code: Option<String>,
    pub name: Option<String>,
    pub english_name: Option<String>,
    pub is_continent_marker: bool,
    pub parent_category_id: Option<String>,
    pub in_use: bool,
    pub continent: Continent,
}

/// Year token taken from a source file name.
///
/// `Unknown` sorts after every known year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Year {
    Known(u16),
    Unknown,
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Year::Known(y) => write!(f, "{}", y),
            Year::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for Year {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortYearRecord {
    pub port_code: Option<String>,
    pub port_name: String,
    pub year: Year,
    pub count: Option<f64>,
    pub amount: Option<f64>,
}

/// Country row as shown in the preview; headers follow the source file.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CountryRow {
    #[serde(rename = "국가코드")]
    #[tabled(rename = "국가코드")]
    pub country_code: String,
    #[serde(rename = "국가명")]
    #[tabled(rename = "국가명")]
    pub name: String,
    #[serde(rename = "국가영문명")]
    #[tabled(rename = "국가영문명")]
    pub english_name: String,
    #[serde(rename = "대륙명")]
    #[tabled(rename = "대륙명")]
    pub continent: String,
    #[serde(rename = "사용여부")]
    #[tabled(rename = "사용여부")]
    pub in_use: String,
}

/// Country row as exported: every source column plus the resolved continent.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CountryExportRow {
    #[serde(rename = "국가아이디")]
    pub country_id: String,
    #[serde(rename = "국가명")]
    pub name: String,
    #[serde(rename = "국가영문명")]
    pub english_name: String,
    #[serde(rename = "국가코드")]
    pub country_code: String,
    #[serde(rename = "대륙구분여부")]
    pub is_continent_marker: String,
    #[serde(rename = "상위국가분류아이디")]
    pub parent_category_id: String,
    #[serde(rename = "사용여부")]
    pub in_use: String,
    #[serde(rename = "대륙명")]
    pub continent: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ContinentCountRow {
    #[serde(rename = "Continent")]
    #[tabled(rename = "Continent")]
    pub continent: String,
    #[serde(rename = "Countries")]
    #[tabled(rename = "Countries")]
    pub countries: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct UsageShareRow {
    #[serde(rename = "InUse")]
    #[tabled(rename = "InUse")]
    pub in_use: String,
    #[serde(rename = "Entries")]
    #[tabled(rename = "Entries")]
    pub entries: usize,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct")]
    pub share_pct: String,
}

#[derive(Debug, Serialize)]
pub struct CountryKpis {
    pub total_entries: usize,
    pub countries: usize,
    pub continent_markers: usize,
    pub unmapped: usize,
    pub filtered: usize,
}

/// Port record as shown and exported.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PortRow {
    #[serde(rename = "PortCode")]
    #[tabled(rename = "PortCode")]
    pub port_code: String,
    #[serde(rename = "PortName")]
    #[tabled(rename = "PortName")]
    pub port_name: String,
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: String,
    #[serde(rename = "Amount")]
    #[tabled(rename = "Amount")]
    pub amount: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct YearTotalRow {
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: String,
    #[serde(rename = "Ports")]
    #[tabled(rename = "Ports")]
    pub ports: usize,
    #[serde(rename = "TotalCount")]
    #[tabled(rename = "TotalCount")]
    pub total_count: String,
    #[serde(rename = "TotalAmount")]
    #[tabled(rename = "TotalAmount")]
    pub total_amount: String,
    #[serde(rename = "MissingValues")]
    #[tabled(rename = "MissingValues")]
    pub missing_values: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PortRankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "PortCode")]
    #[tabled(rename = "PortCode")]
    pub port_code: String,
    #[serde(rename = "PortName")]
    #[tabled(rename = "PortName")]
    pub port_name: String,
    #[serde(rename = "Years")]
    #[tabled(rename = "Years")]
    pub years: usize,
    #[serde(rename = "TotalCount")]
    #[tabled(rename = "TotalCount")]
    pub total_count: String,
    #[serde(rename = "TotalAmount")]
    #[tabled(rename = "TotalAmount")]
    pub total_amount: String,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct")]
    pub share_pct: String,
}

#[derive(Debug, Serialize)]
pub struct PortSummary {
    pub files_found: usize,
    pub files_loaded: usize,
    pub files_skipped: Vec<String>,
    pub total_records: usize,
    pub years: Vec<Year>,
    pub duplicate_years: Vec<Year>,
    pub total_count: f64,
    pub total_amount: f64,
    pub coercion_failures: usize,
}
