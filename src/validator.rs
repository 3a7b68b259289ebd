use crate::config::ImporterConfig;
use crate::row::{normalize_phone, parse_amount, parse_quantity, CsvSaleRow, DATE_FORMAT, MAX_AMOUNT};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2}):(\d{2})$").expect("valid time regex"));

/// A problem found in the input. Row 0 means the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub row: usize,
    pub column: String,
    pub value: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(row: usize, column: &str, value: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            row,
            column: column.to_string(),
            value: value.unwrap_or_default().to_string(),
            message: message.into(),
        }
    }
}

/// Outcome of one rule: `Err` blocks the import, `Ok(Some(_))` is a warning.
pub type Check = Result<Option<ValidationIssue>, ValidationIssue>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Files the outcome of a check and returns whether it passed.
    pub fn record(&mut self, check: Check) -> bool {
        match check {
            Ok(None) => true,
            Ok(Some(warning)) => {
                self.warnings.push(warning);
                true
            }
            Err(error) => {
                self.errors.push(error);
                false
            }
        }
    }

    pub fn error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_decimal(value: &str) -> Option<Decimal> {
    Decimal::from_str(value).ok()
}

/// Magnitude above `MAX_AMOUNT`.
fn out_of_range(value: Option<&str>, row: usize, column: &str) -> ValidationIssue {
    ValidationIssue::new(
        row,
        column,
        value,
        format!("{} is out of range (limit {})", column, MAX_AMOUNT),
    )
}

pub fn required(value: Option<&str>, row: usize, column: &str) -> Check {
    match present(value) {
        Some(_) => Ok(None),
        None => Err(ValidationIssue::new(
            row,
            column,
            value,
            format!("{} is required", column),
        )),
    }
}

pub fn email(value: Option<&str>, row: usize, column: &str, is_required: bool) -> Check {
    let Some(v) = present(value) else {
        return if is_required {
            required(value, row, column)
        } else {
            Ok(None)
        };
    };

    if EMAIL_RE.is_match(v) {
        Ok(None)
    } else {
        Err(ValidationIssue::new(row, column, value, "Invalid email format"))
    }
}

pub fn time(value: Option<&str>, row: usize, column: &str) -> Check {
    required(value, row, column)?;
    let v = present(value).unwrap_or_default();

    let valid = TIME_RE.captures(v).is_some_and(|caps| {
        let hour = caps[1].parse::<u32>().unwrap_or(u32::MAX);
        let minute = caps[2].parse::<u32>().unwrap_or(u32::MAX);
        hour <= 23 && minute <= 59
    });

    if valid {
        Ok(None)
    } else {
        Err(ValidationIssue::new(
            row,
            column,
            value,
            "Invalid time format (expected HH:MM, 24-hour)",
        ))
    }
}

pub fn positive_number(value: Option<&str>, row: usize, column: &str) -> Check {
    required(value, row, column)?;

    let v = present(value).unwrap_or_default();
    match parse_decimal(v) {
        Some(n) if n >= Decimal::ZERO => match parse_amount(v) {
            Some(_) => Ok(None),
            None => Err(out_of_range(value, row, column)),
        },
        _ => Err(ValidationIssue::new(
            row,
            column,
            value,
            format!("{} must be a positive number", column),
        )),
    }
}

pub fn positive_integer(value: Option<&str>, row: usize, column: &str) -> Check {
    required(value, row, column)?;

    match present(value).and_then(parse_quantity) {
        Some(_) => Ok(None),
        None => Err(ValidationIssue::new(
            row,
            column,
            value,
            format!("{} must be a positive integer", column),
        )),
    }
}

pub fn decimal(value: Option<&str>, row: usize, column: &str, is_required: bool) -> Check {
    let Some(v) = present(value) else {
        return if is_required {
            required(value, row, column)
        } else {
            Ok(None)
        };
    };

    match parse_decimal(v) {
        Some(_) if parse_amount(v).is_none() => Err(out_of_range(value, row, column)),
        Some(_) => Ok(None),
        None => Err(ValidationIssue::new(
            row,
            column,
            value,
            format!("{} must be a valid number", column),
        )),
    }
}

/// Warns when the cost exceeds the price. Never an error; skipped unless both
/// values parse.
pub fn margin(cost: Option<&str>, price: Option<&str>, row: usize) -> Check {
    let cost_value = present(cost).and_then(parse_decimal);
    let price_value = present(price).and_then(parse_decimal);

    match (cost_value, price_value) {
        (Some(c), Some(p)) if c > p => Ok(Some(ValidationIssue::new(
            row,
            "cost_price",
            cost,
            format!("Cost price {} exceeds unit price {} (negative margin)", c, p),
        ))),
        _ => Ok(None),
    }
}

/// Rules that depend on configuration.
#[derive(Debug, Clone)]
pub struct FieldValidator {
    today: NaiveDate,
    stale_after_days: i64,
    min_phone_digits: usize,
}

impl FieldValidator {
    pub fn new(config: &ImporterConfig) -> Self {
        Self {
            today: config.today,
            stale_after_days: config.stale_after_days,
            min_phone_digits: config.min_phone_digits,
        }
    }

    pub fn phone(&self, value: Option<&str>, row: usize, column: &str) -> Check {
        required(value, row, column)?;
        let digits = normalize_phone(present(value).unwrap_or_default());

        if digits.len() >= self.min_phone_digits {
            Ok(None)
        } else {
            Err(ValidationIssue::new(
                row,
                column,
                value,
                format!(
                    "Phone number must have at least {} digits",
                    self.min_phone_digits
                ),
            ))
        }
    }

    pub fn date(&self, value: Option<&str>, row: usize, column: &str) -> Check {
        required(value, row, column)?;
        let v = present(value).unwrap_or_default();

        if !DATE_RE.is_match(v) {
            return Err(ValidationIssue::new(
                row,
                column,
                value,
                "Invalid date format (expected YYYY-MM-DD)",
            ));
        }

        let Ok(date) = NaiveDate::parse_from_str(v, DATE_FORMAT) else {
            return Err(ValidationIssue::new(row, column, value, "Invalid date"));
        };

        if (self.today - date).num_days() > self.stale_after_days {
            return Ok(Some(ValidationIssue::new(
                row,
                column,
                value,
                format!(
                    "Date is more than {} days in the past",
                    self.stale_after_days
                ),
            )));
        }

        Ok(None)
    }

    /// Runs every rule relevant to a sales import against one row.
    pub fn validate_row(&self, row: usize, csv: &CsvSaleRow) -> ValidationReport {
        let mut report = ValidationReport::default();

        for column in [
            "transaction_number",
            "customer_first_name",
            "customer_last_name",
            "product_name",
            "product_category",
        ] {
            report.record(required(csv.get(column), row, column));
        }

        report.record(self.date(csv.get("sale_date"), row, "sale_date"));
        report.record(time(csv.get("sale_time"), row, "sale_time"));
        report.record(email(
            csv.get("salesperson_email"),
            row,
            "salesperson_email",
            true,
        ));
        report.record(self.phone(csv.get("customer_phone"), row, "customer_phone"));
        report.record(email(csv.get("customer_email"), row, "customer_email", false));
        report.record(positive_integer(csv.get("quantity"), row, "quantity"));
        let price_ok = report.record(positive_number(csv.get("unit_price"), row, "unit_price"));
        let cost_ok = report.record(decimal(csv.get("cost_price"), row, "cost_price", false));
        report.record(decimal(csv.get("fcp_amount"), row, "fcp_amount", false));
        report.record(decimal(csv.get("hours_worked"), row, "hours_worked", false));

        if price_ok && cost_ok {
            report.record(margin(csv.get("cost_price"), csv.get("unit_price"), row));
        }

        report
    }
}
