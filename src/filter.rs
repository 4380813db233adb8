//! User-driven filters over the loaded tables.

use crate::types::{Continent, CountryRecord, PortYearRecord, Year};
use crate::util::contains_ci;
use clap::ValueEnum;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum UsageFilter {
    #[default]
    All,
    #[value(name = "y")]
    InUse,
    #[value(name = "n")]
    NotInUse,
}

#[derive(Debug, Clone, Default)]
pub struct CountryFilter {
    pub search: Option<String>,
    pub continent: Option<String>,
    pub usage: UsageFilter,
}

impl CountryFilter {
    pub fn matches(&self, record: &CountryRecord) -> bool {
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            let hit = contains_ci(record.name.as_deref(), &term)
                || contains_ci(record.english_name.as_deref(), &term)
                || contains_ci(record.country_code.as_deref(), &term);
            if !hit {
                return false;
            }
        }
        if let Some(continent) = self.continent.as_deref() {
            if record.continent != Continent::Named(continent.to_string()) {
                return false;
            }
        }
        match self.usage {
            UsageFilter::All => true,
            UsageFilter::InUse => record.in_use,
            UsageFilter::NotInUse => !record.in_use,
        }
    }

    pub fn apply<'a>(&self, records: &'a [CountryRecord]) -> Vec<&'a CountryRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Continent names that can be filtered on, sorted.
pub fn available_continents(records: &[CountryRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| match &r.continent {
            Continent::Named(n) => Some(n.clone()),
            _ => None,
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct port names, sorted.
pub fn available_ports(records: &[PortYearRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.port_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct PortFilter {
    /// `None` keeps every port.
    pub ports: Option<Vec<String>>,
    pub from_year: Option<u16>,
    pub to_year: Option<u16>,
}

#[derive(Debug, PartialEq)]
pub enum PortSelection<'a> {
    /// A port selection was requested but none of the names exist.
    NothingSelected,
    Rows(Vec<&'a PortYearRecord>),
}

impl PortFilter {
    fn year_matches(&self, year: Year) -> bool {
        if self.from_year.is_none() && self.to_year.is_none() {
            return true;
        }
        match year {
            Year::Known(y) => {
                self.from_year.map_or(true, |from| y >= from)
                    && self.to_year.map_or(true, |to| y <= to)
            }
            Year::Unknown => false,
        }
    }

    pub fn apply<'a>(&self, records: &'a [PortYearRecord]) -> PortSelection<'a> {
        let selected: Option<BTreeSet<&str>> = match &self.ports {
            None => None,
            Some(names) => {
                let known = available_ports(records);
                let chosen: BTreeSet<&str> = names
                    .iter()
                    .map(|n| n.trim())
                    .filter(|n| known.iter().any(|k| k == n))
                    .collect();
                if chosen.is_empty() {
                    return PortSelection::NothingSelected;
                }
                Some(chosen)
            }
        };

        PortSelection::Rows(
            records
                .iter()
                .filter(|r| {
                    selected
                        .as_ref()
                        .map_or(true, |s| s.contains(r.port_name.as_str()))
                })
                .filter(|r| self.year_matches(r.year))
                .collect(),
        )
    }
}
