use crate::row::{normalize_phone, CsvSaleRow, SaleLine};
use crate::validator::ValidationIssue;

use rust_decimal::Decimal;
use std::collections::HashMap;

/// Rows sharing one transaction number, committed as a single sale.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionGroup {
    pub transaction_number: String,
    pub lines: Vec<SaleLine>,
}

impl TransactionGroup {
    /// Groups are never empty.
    pub fn first(&self) -> &SaleLine {
        &self.lines[0]
    }

    // Totals are `None` once they leave the `Decimal` range.

    pub fn subtotal(&self) -> Option<Decimal> {
        self.lines
            .iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.subtotal()?))
    }

    pub fn fcp_total(&self) -> Option<Decimal> {
        self.lines
            .iter()
            .filter_map(|l| l.fcp_amount)
            .try_fold(Decimal::ZERO, Decimal::checked_add)
    }

    pub fn total_amount(&self) -> Option<Decimal> {
        self.subtotal()?.checked_add(self.fcp_total()?)
    }

    pub fn hours_worked(&self) -> Decimal {
        self.first().hours_worked.unwrap_or(Decimal::ZERO)
    }
}

/// Groups lines by transaction number. Groups come out in order of first
/// appearance; lines keep file order.
pub fn group_by_transaction(lines: Vec<SaleLine>) -> Vec<TransactionGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<TransactionGroup> = Vec::new();

    for line in lines {
        match index.get(&line.transaction_number) {
            Some(&i) => groups[i].lines.push(line),
            None => {
                index.insert(line.transaction_number.clone(), groups.len());
                groups.push(TransactionGroup {
                    transaction_number: line.transaction_number.clone(),
                    lines: vec![line],
                });
            }
        }
    }

    groups
}

/// Tracks the salesperson and customer each transaction number was first seen
/// with, and flags later rows that disagree.
#[derive(Debug, Default)]
pub struct GroupConsistency {
    first_seen: HashMap<String, (Option<String>, Option<String>)>,
}

impl GroupConsistency {
    pub fn check(&mut self, row: usize, csv: &CsvSaleRow) -> Vec<ValidationIssue> {
        let Some(txn) = csv.get("transaction_number") else {
            return Vec::new();
        };
        let email = csv.get("salesperson_email").map(str::to_lowercase);
        let phone = csv.get("customer_phone").map(normalize_phone);

        let Some((first_email, first_phone)) = self.first_seen.get(txn) else {
            self.first_seen.insert(txn.to_string(), (email, phone));
            return Vec::new();
        };

        let mut issues = Vec::new();
        if email.is_some() && first_email.is_some() && email != *first_email {
            issues.push(ValidationIssue::new(
                row,
                "salesperson_email",
                csv.get("salesperson_email"),
                format!("Transaction {} has rows with different salespeople", txn),
            ));
        }
        if phone.is_some() && first_phone.is_some() && phone != *first_phone {
            issues.push(ValidationIssue::new(
                row,
                "customer_phone",
                csv.get("customer_phone"),
                format!("Transaction {} has rows with different customers", txn),
            ));
        }

        issues
    }
}
