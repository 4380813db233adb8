//! Configuration and constants for the trade statistics pipelines.

use clap::ValueEnum;
use encoding_rs::{Encoding, EUC_KR, UTF_8};
use serde::Serialize;

/// File name marker of the country master file (trade remedy country reference)
pub const COUNTRY_FILE_MARKER: &str = "무역구제 국가 기준정보";

/// File name marker of the yearly port statistics (duty refund)
pub const PORT_FILE_MARKER: &str = "관세환급";

/// Extensions accepted for yearly port statistics
pub const PORT_FILE_EXTENSIONS: &[&str] = &["csv", "xlsx", "xlsm", "xls"];

/// Decorative rows above the data body of every port statistics file
pub const PORT_HEADER_ROWS: usize = 3;

/// Label token marking subtotal rows
pub const SUBTOTAL_MARKER: &str = "합계";

/// Continent label given to the continent rows themselves
pub const CONTINENT_CATEGORY_LABEL: &str = "대륙분류";

/// Encodings tried in order when decoding delimited text
pub fn encoding_candidates() -> [&'static Encoding; 2] {
    [UTF_8, EUC_KR]
}

/// What a numeric cell that fails to parse turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberPolicy {
    /// Keep the cell as missing; sums skip it
    #[default]
    Missing,
    /// Count the cell as zero
    Zero,
}

/// Positional column layout of a port statistics file.
///
/// Columns are addressed by position because header labels change from
/// year to year. `from_end` offsets count back from the table width, so
/// `1` is the last column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnLayout {
    pub header_rows: usize,
    pub code_col: usize,
    pub name_col: usize,
    pub count_from_end: usize,
    pub amount_from_end: usize,
}

impl ColumnLayout {
    /// Layout shared by every duty refund statistics year.
    pub const DUTY_REFUND: ColumnLayout = ColumnLayout {
        header_rows: PORT_HEADER_ROWS,
        code_col: 0,
        name_col: 1,
        count_from_end: 2,
        amount_from_end: 1,
    };

    /// Narrowest table the layout can be applied to without columns overlapping.
    pub fn min_columns(&self) -> usize {
        let leading = self.code_col.max(self.name_col) + 1;
        leading + self.count_from_end.max(self.amount_from_end)
    }

    /// Resolve (code, name, count, amount) indices for a table `width` columns wide.
    pub fn resolve(&self, width: usize) -> Option<(usize, usize, usize, usize)> {
        if width < self.min_columns() {
            return None;
        }
        Some((
            self.code_col,
            self.name_col,
            width - self.count_from_end,
            width - self.amount_from_end,
        ))
    }
}

/// Options that shape the port statistics dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortOptions {
    pub marker: String,
    pub layout: ColumnLayout,
    pub number_policy: NumberPolicy,
}

impl Default for PortOptions {
    fn default() -> Self {
        Self {
            marker: PORT_FILE_MARKER.to_string(),
            layout: ColumnLayout::DUTY_REFUND,
            number_policy: NumberPolicy::default(),
        }
    }
}
