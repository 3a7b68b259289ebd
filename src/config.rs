use chrono::{NaiveDate, Utc};

/// Tunables for validation and preview output.
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    /// Sale dates older than this many days before `today` get a warning.
    pub stale_after_days: i64,
    pub preview_rows: usize,
    pub min_phone_digits: usize,
    /// Reference date used for the stale-date check.
    pub today: NaiveDate,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            stale_after_days: 90,
            preview_rows: 10,
            min_phone_digits: 10,
            today: Utc::now().date_naive(),
        }
    }
}

impl ImporterConfig {
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn with_stale_after_days(mut self, days: i64) -> Self {
        self.stale_after_days = days;
        self
    }

    pub fn with_min_phone_digits(mut self, digits: usize) -> Self {
        self.min_phone_digits = digits;
        self
    }

    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }
}
