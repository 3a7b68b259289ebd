use crate::error::GroupFailure;
use crate::row::CsvSaleRow;
use crate::validator::ValidationIssue;

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub valid: bool,
    pub total_rows: usize,
    pub estimated_sales: usize,
    pub estimated_customers: usize,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub preview: Vec<CsvSaleRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalespersonTotal {
    pub salesperson: String,
    pub total_sales: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_sales_amount: Decimal,
    #[serde(rename = "totalFCP")]
    pub total_fcp: Decimal,
    pub sales_by_salesperson: Vec<SalespersonTotal>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ImportSummary {
    /// Running totals saturate at the `Decimal` bounds.
    pub fn add_sale(&mut self, salesperson: &str, total: Decimal, fcp: Decimal) {
        self.total_sales_amount = self.total_sales_amount.saturating_add(total);
        self.total_fcp = self.total_fcp.saturating_add(fcp);

        match self.index.get(salesperson) {
            Some(&i) => {
                let entry = &mut self.sales_by_salesperson[i];
                entry.total_sales = entry.total_sales.saturating_add(total);
            }
            None => {
                self.index
                    .insert(salesperson.to_string(), self.sales_by_salesperson.len());
                self.sales_by_salesperson.push(SalespersonTotal {
                    salesperson: salesperson.to_string(),
                    total_sales: total,
                });
            }
        }
    }
}

/// A transaction group that could not be committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupError {
    pub transaction_number: String,
    pub kind: &'static str,
    pub message: String,
    #[serde(skip)]
    pub reason: GroupFailure,
}

impl GroupError {
    pub fn new(transaction_number: &str, reason: GroupFailure) -> Self {
        Self {
            transaction_number: transaction_number.to_string(),
            kind: reason.kind(),
            message: reason.to_string(),
            reason,
        }
    }

    pub fn to_issue(&self) -> ValidationIssue {
        ValidationIssue::new(
            0,
            "transaction_number",
            Some(self.transaction_number.as_str()),
            format!("Transaction {}: {}", self.transaction_number, self.message),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub sales_created: usize,
    pub customers_created: usize,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub failures: Vec<GroupError>,
    pub summary: ImportSummary,
}

impl ImportResult {
    /// Result for a file that failed validation; nothing was written.
    pub fn rejected(preview: PreviewResult) -> Self {
        Self {
            success: false,
            total_rows: preview.total_rows,
            processed_rows: 0,
            sales_created: 0,
            customers_created: 0,
            errors: preview.errors,
            warnings: preview.warnings,
            failures: Vec::new(),
            summary: ImportSummary::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_groups_by_salesperson_in_order() {
        let mut summary = ImportSummary::default();
        summary.add_sale("John Smith", Decimal::from(1100), Decimal::from(100));
        summary.add_sale("Ann Lee", Decimal::from(500), Decimal::ZERO);
        summary.add_sale("John Smith", Decimal::from(250), Decimal::from(50));

        assert_eq!(summary.total_sales_amount, Decimal::from(1850));
        assert_eq!(summary.total_fcp, Decimal::from(150));
        assert_eq!(
            summary.sales_by_salesperson,
            vec![
                SalespersonTotal {
                    salesperson: "John Smith".into(),
                    total_sales: Decimal::from(1350),
                },
                SalespersonTotal {
                    salesperson: "Ann Lee".into(),
                    total_sales: Decimal::from(500),
                },
            ]
        );
    }

    #[test]
    fn test_summary_saturates_instead_of_overflowing() {
        let mut summary = ImportSummary::default();
        summary.add_sale("John Smith", Decimal::MAX, Decimal::MAX);
        summary.add_sale("John Smith", Decimal::ONE, Decimal::ONE);

        assert_eq!(summary.total_sales_amount, Decimal::MAX);
        assert_eq!(summary.total_fcp, Decimal::MAX);
        assert_eq!(summary.sales_by_salesperson[0].total_sales, Decimal::MAX);
    }

    #[test]
    fn test_overflow_group_error() {
        let error = GroupError::new(
            "TXN-7",
            GroupFailure::AmountOverflow {
                transaction_number: "TXN-7".into(),
            },
        );

        assert_eq!(error.kind, "amount_overflow");
        assert_eq!(
            error.message,
            "Amounts in transaction TXN-7 exceed the supported range"
        );
    }

    #[test]
    fn test_group_error_issue() {
        let error = GroupError::new(
            "TXN-9",
            GroupFailure::SalespersonNotFound {
                email: "ghost@demo.com".into(),
            },
        );

        assert_eq!(error.kind, "salesperson_not_found");
        let issue = error.to_issue();
        assert_eq!(issue.row, 0);
        assert_eq!(issue.value, "TXN-9");
        assert_eq!(
            issue.message,
            "Transaction TXN-9: Salesperson not found: ghost@demo.com"
        );
    }

    #[test]
    fn test_summary_serializes_fcp_key() {
        let json = serde_json::to_value(ImportSummary::default()).unwrap();
        assert!(json.get("totalFCP").is_some());
        assert!(json.get("salesBySalesperson").is_some());
        assert!(json.get("index").is_none());
    }
}
