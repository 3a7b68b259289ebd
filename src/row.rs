use crate::error::{ImportError, LineError};

use chrono::{NaiveDate, NaiveTime};
use csv::{ReaderBuilder, Trim};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

pub const REQUIRED_COLUMNS: [&str; 11] = [
    "transaction_number",
    "sale_date",
    "sale_time",
    "salesperson_email",
    "customer_first_name",
    "customer_last_name",
    "customer_phone",
    "product_name",
    "product_category",
    "quantity",
    "unit_price",
];

pub const OPTIONAL_COLUMNS: [&str; 5] = [
    "customer_email",
    "cost_price",
    "fcp_amount",
    "hours_worked",
    "notes",
];

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// One line of the import file as it appears on disk, trimmed, with empty
/// cells read as `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CsvSaleRow {
    pub transaction_number: Option<String>,
    pub sale_date: Option<String>,
    pub sale_time: Option<String>,
    pub salesperson_email: Option<String>,
    pub customer_first_name: Option<String>,
    pub customer_last_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub product_name: Option<String>,
    pub product_category: Option<String>,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    pub cost_price: Option<String>,
    pub fcp_amount: Option<String>,
    pub hours_worked: Option<String>,
    pub notes: Option<String>,
}

impl CsvSaleRow {
    /// Looks a cell up by its header name.
    pub fn get(&self, column: &str) -> Option<&str> {
        let cell = match column {
            "transaction_number" => &self.transaction_number,
            "sale_date" => &self.sale_date,
            "sale_time" => &self.sale_time,
            "salesperson_email" => &self.salesperson_email,
            "customer_first_name" => &self.customer_first_name,
            "customer_last_name" => &self.customer_last_name,
            "customer_phone" => &self.customer_phone,
            "customer_email" => &self.customer_email,
            "product_name" => &self.product_name,
            "product_category" => &self.product_category,
            "quantity" => &self.quantity,
            "unit_price" => &self.unit_price,
            "cost_price" => &self.cost_price,
            "fcp_amount" => &self.fcp_amount,
            "hours_worked" => &self.hours_worked,
            "notes" => &self.notes,
            _ => return None,
        };

        cell.as_deref().filter(|s| !s.is_empty())
    }
}

/// A row that passed validation, with every field in its typed form.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleLine {
    pub row: usize,
    pub transaction_number: String,
    pub sale_date: NaiveDate,
    pub sale_time: NaiveTime,
    pub salesperson_email: String,
    pub customer_first_name: String,
    pub customer_last_name: String,
    /// Digits only.
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub product_name: String,
    pub product_category: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub cost_price: Option<Decimal>,
    pub fcp_amount: Option<Decimal>,
    pub hours_worked: Option<Decimal>,
    pub notes: Option<String>,
}

impl SaleLine {
    /// `None` when quantity times unit price leaves the `Decimal` range.
    pub fn subtotal(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_price)
    }

    pub fn customer_name(&self) -> String {
        format!("{} {}", self.customer_first_name, self.customer_last_name)
    }
}

/// Converts a parsed row into its typed form. The `usize` is the display row
/// number carried into errors.
impl TryFrom<(usize, &CsvSaleRow)> for SaleLine {
    type Error = LineError;

    fn try_from((row, csv): (usize, &CsvSaleRow)) -> Result<Self, Self::Error> {
        let text = |column: &'static str| csv.get(column).ok_or(LineError::Missing { row, column });
        let invalid = |column: &'static str, value: &str| LineError::Invalid {
            row,
            column,
            value: value.to_string(),
        };
        let amount = |column: &'static str| -> Result<Option<Decimal>, LineError> {
            csv.get(column)
                .map(|v| parse_amount(v).ok_or_else(|| invalid(column, v)))
                .transpose()
        };

        let date = text("sale_date")?;
        let sale_date =
            NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| invalid("sale_date", date))?;
        let time = text("sale_time")?;
        let sale_time =
            NaiveTime::parse_from_str(time, TIME_FORMAT).map_err(|_| invalid("sale_time", time))?;
        let quantity = text("quantity")?;
        let quantity = parse_quantity(quantity).ok_or_else(|| invalid("quantity", quantity))?;
        let unit_price = amount("unit_price")?.ok_or(LineError::Missing {
            row,
            column: "unit_price",
        })?;

        Ok(SaleLine {
            row,
            transaction_number: text("transaction_number")?.to_string(),
            sale_date,
            sale_time,
            salesperson_email: text("salesperson_email")?.to_lowercase(),
            customer_first_name: text("customer_first_name")?.to_string(),
            customer_last_name: text("customer_last_name")?.to_string(),
            customer_phone: normalize_phone(text("customer_phone")?),
            customer_email: csv.get("customer_email").map(str::to_string),
            product_name: text("product_name")?.to_string(),
            product_category: text("product_category")?.to_string(),
            quantity,
            unit_price,
            cost_price: amount("cost_price")?,
            fcp_amount: amount("fcp_amount")?,
            hours_worked: amount("hours_worked")?,
            notes: csv.get("notes").map(str::to_string),
        })
    }
}

/// Largest magnitude accepted for a unit price, cost price, FCP amount or
/// hours worked.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Parses a money-like cell. Anything that is not a decimal, or whose
/// magnitude is above `MAX_AMOUNT`, is `None`.
pub fn parse_amount(value: &str) -> Option<Decimal> {
    Decimal::from_str(value)
        .ok()
        .filter(|amount| amount.abs() <= MAX_AMOUNT)
}

/// Parses a quantity cell: an integral value from 1 up to `u32::MAX`.
/// `"2.0"` is accepted.
pub fn parse_quantity(value: &str) -> Option<u32> {
    Decimal::from_str(value)
        .ok()
        .filter(|q| q.fract().is_zero())
        .and_then(|q| q.to_u32())
        .filter(|q| *q >= 1)
}

/// Strips everything but ASCII digits.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Header row is 1, so the first data row is 2.
pub fn display_row(index: usize) -> usize {
    index + 2
}

/// Parses delimited text into rows keyed by header name. A row that cannot be
/// decoded is returned as an `Err` with its display row so the caller can
/// report it without dropping the rest of the file.
pub fn parse_rows(text: &str) -> Result<Vec<Result<CsvSaleRow, (usize, csv::Error)>>, ImportError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    // Fails early on unreadable headers.
    rdr.headers()?;

    Ok(rdr
        .into_deserialize::<CsvSaleRow>()
        .enumerate()
        .map(|(i, result)| result.map_err(|e| (display_row(i), e)))
        .collect())
}

pub fn read_sales_file<P: AsRef<Path>>(path: P) -> Result<String, ImportError> {
    Ok(std::fs::read_to_string(path)?)
}

/// Header line plus one example row.
pub fn template() -> String {
    let header = REQUIRED_COLUMNS
        .iter()
        .chain(OPTIONAL_COLUMNS.iter())
        .copied()
        .collect::<Vec<_>>()
        .join(",");
    let example = [
        "TXN-1001",
        "2025-01-15",
        "14:30",
        "john@demo.com",
        "Jane",
        "Doe",
        "555-555-0100",
        "Sofa",
        "Living Room",
        "1",
        "1000.00",
        "jane@example.com",
        "600.00",
        "100.00",
        "8",
        "Delivered Friday",
    ]
    .join(",");

    format!("{}\n{}\n", header, example)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_trims_fields_and_headers() {
        let text = " transaction_number , sale_date ,notes\n  TXN-1 , 2025-01-15 ,\n";
        let rows = parse_rows(text).unwrap();

        assert_eq!(rows.len(), 1);
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.get("transaction_number"), Some("TXN-1"));
        assert_eq!(row.get("sale_date"), Some("2025-01-15"));
        assert_eq!(row.get("notes"), None);
        assert_eq!(row.get("quantity"), None);
    }

    #[test]
    fn test_parse_rows_skips_empty_lines() {
        let text = "transaction_number,quantity\nTXN-1,1\n\n\nTXN-2,2\n";
        let rows = parse_rows(text).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].as_ref().unwrap().get("transaction_number"), Some("TXN-2"));
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(555) 555-0100"), "5555550100");
        assert_eq!(normalize_phone("+1 555.555.0100"), "15555550100");
        assert_eq!(normalize_phone("n/a"), "");
    }

    #[test]
    fn test_template_has_all_columns() {
        let template = template();
        let rows = parse_rows(&template).unwrap();

        assert_eq!(rows.len(), 1);
        let row = rows[0].as_ref().unwrap();
        for column in REQUIRED_COLUMNS {
            assert!(row.get(column).is_some(), "Missing: {}", column);
        }
    }

    #[test]
    fn test_sale_line_from_row() {
        let csv = CsvSaleRow {
            transaction_number: Some("TXN-1".into()),
            sale_date: Some("2025-01-15".into()),
            sale_time: Some("09:05".into()),
            salesperson_email: Some("John@Demo.com".into()),
            customer_first_name: Some("A".into()),
            customer_last_name: Some("B".into()),
            customer_phone: Some("(555) 555-0100".into()),
            product_name: Some("Sofa".into()),
            product_category: Some("Living Room".into()),
            quantity: Some("2".into()),
            unit_price: Some("499.50".into()),
            fcp_amount: Some("25".into()),
            ..Default::default()
        };

        let line = SaleLine::try_from((2, &csv)).unwrap();
        assert_eq!(line.salesperson_email, "john@demo.com");
        assert_eq!(line.customer_phone, "5555550100");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.subtotal(), Some(Decimal::from(999)));
        assert_eq!(line.fcp_amount, Some(Decimal::from(25)));
        assert_eq!(line.cost_price, None);
        assert_eq!(line.customer_name(), "A B");
    }

    #[test]
    fn test_sale_line_missing_field() {
        let csv = CsvSaleRow::default();
        let err = SaleLine::try_from((5, &csv)).unwrap_err();
        assert_eq!(
            err,
            LineError::Missing {
                row: 5,
                column: "sale_date"
            }
        );
        assert_eq!(err.row(), 5);
        assert_eq!(err.to_string(), "Row 5: sale_date is required");
    }

    #[test]
    fn test_sale_line_rejects_quantity_beyond_u32() {
        let csv = CsvSaleRow {
            transaction_number: Some("TXN-1".into()),
            sale_date: Some("2025-01-15".into()),
            sale_time: Some("09:05".into()),
            salesperson_email: Some("john@demo.com".into()),
            customer_first_name: Some("A".into()),
            customer_last_name: Some("B".into()),
            customer_phone: Some("5555550100".into()),
            product_name: Some("Sofa".into()),
            product_category: Some("Living Room".into()),
            quantity: Some("5000000000".into()),
            unit_price: Some("10".into()),
            ..Default::default()
        };

        let err = SaleLine::try_from((3, &csv)).unwrap_err();
        assert_eq!(
            err,
            LineError::Invalid {
                row: 3,
                column: "quantity",
                value: "5000000000".into()
            }
        );
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("2"), Some(2));
        assert_eq!(parse_quantity("2.0"), Some(2));
        assert_eq!(parse_quantity("4294967295"), Some(u32::MAX));
        assert_eq!(parse_quantity("4294967296"), None);
        assert_eq!(parse_quantity("0"), None);
        assert_eq!(parse_quantity("1.5"), None);
        assert_eq!(parse_quantity("-3"), None);
    }

    #[test]
    fn test_parse_amount_is_bounded() {
        assert_eq!(parse_amount("1000000000"), Some(MAX_AMOUNT));
        assert_eq!(parse_amount("-25.50"), Some(Decimal::from_str("-25.50").unwrap()));
        assert_eq!(parse_amount("1000000000.01"), None);
        assert_eq!(parse_amount("79228162514264337593543950335"), None);
        assert_eq!(parse_amount("n/a"), None);
    }
}
