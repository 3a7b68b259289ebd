use crate::config::ImporterConfig;
use crate::error::{GroupFailure, ImportError, LineError, StoreError};
use crate::importer::group::{group_by_transaction, GroupConsistency, TransactionGroup};
use crate::importer::result::{GroupError, ImportResult, ImportSummary, PreviewResult};
use crate::models::{CustomerStats, NewCustomer, ProductCategory, Sale, SaleItem};
use crate::row::{display_row, normalize_phone, parse_rows, SaleLine};
use crate::store::SalesStore;
use crate::validator::{FieldValidator, ValidationIssue, ValidationReport};

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What a successfully committed group produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedSale {
    pub sale: Sale,
    pub items: usize,
    pub customer_created: bool,
    pub salesperson: String,
}

pub struct Importer<S> {
    store: Arc<S>,
    config: ImporterConfig,
    validator: FieldValidator,
}

impl<S: SalesStore> Importer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, ImporterConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: ImporterConfig) -> Self {
        let validator = FieldValidator::new(&config);
        Self {
            store,
            config,
            validator,
        }
    }

    /// Checks a file without writing anything.
    pub async fn validate(
        &self,
        text: &str,
        organization_id: Uuid,
    ) -> Result<PreviewResult, ImportError> {
        let rows = parse_rows(text)?;
        let mut report = ValidationReport::default();
        let mut consistency = GroupConsistency::default();

        let mut transactions: Vec<String> = Vec::new();
        let mut seen_transactions: HashSet<String> = HashSet::new();
        let mut phones: HashSet<String> = HashSet::new();
        let mut salespeople: Vec<String> = Vec::new();
        let mut preview = Vec::new();

        for (i, parsed) in rows.iter().enumerate() {
            let row = display_row(i);
            let csv = match parsed {
                Ok(csv) => csv,
                Err((row, e)) => {
                    report.error(ValidationIssue::new(
                        *row,
                        "row",
                        None,
                        format!("Unreadable row: {}", e),
                    ));
                    continue;
                }
            };

            report.merge(self.validator.validate_row(row, csv));
            for issue in consistency.check(row, csv) {
                report.error(issue);
            }

            if let Some(txn) = csv.get("transaction_number") {
                if seen_transactions.insert(txn.to_string()) {
                    transactions.push(txn.to_string());
                }
            }
            if let Some(phone) = csv.get("customer_phone") {
                let phone = normalize_phone(phone);
                if !phone.is_empty() {
                    phones.insert(phone);
                }
            }
            if let Some(email) = csv.get("salesperson_email") {
                let email = email.to_lowercase();
                if !salespeople.contains(&email) {
                    salespeople.push(email);
                }
            }

            if preview.len() < self.config.preview_rows {
                preview.push(csv.clone());
            }
        }

        for email in &salespeople {
            let user = self
                .store
                .find_active_user_by_email(organization_id, email)
                .await?;
            if user.is_none() {
                report.error(ValidationIssue::new(
                    0,
                    "salesperson_email",
                    Some(email.as_str()),
                    format!("Salesperson not found: {}", email),
                ));
            }
        }

        for txn in &transactions {
            if self.store.transaction_exists(txn).await? {
                report.error(ValidationIssue::new(
                    0,
                    "transaction_number",
                    Some(txn.as_str()),
                    format!("Transaction number already exists: {}", txn),
                ));
            }
        }

        let result = PreviewResult {
            valid: report.is_valid(),
            total_rows: rows.len(),
            estimated_sales: transactions.len(),
            estimated_customers: phones.len(),
            errors: report.errors,
            warnings: report.warnings,
            preview,
        };

        info!(
            organization_id = %organization_id,
            total_rows = result.total_rows,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Validated sales import"
        );

        Ok(result)
    }

    /// Validates and then commits a file. An invalid file is rejected before
    /// any write; past that gate each transaction group succeeds or fails on
    /// its own.
    pub async fn import(
        &self,
        text: &str,
        organization_id: Uuid,
        location_id: Uuid,
    ) -> Result<ImportResult, ImportError> {
        let preview = self.validate(text, organization_id).await?;
        if !preview.valid {
            warn!(
                organization_id = %organization_id,
                errors = preview.errors.len(),
                "Rejected sales import"
            );
            return Ok(ImportResult::rejected(preview));
        }

        let mut failures: Vec<GroupError> = Vec::new();
        let mut lines = Vec::new();

        for (i, parsed) in parse_rows(text)?.into_iter().enumerate() {
            let row = display_row(i);
            let converted = parsed
                .map_err(|(row, e)| {
                    let error = LineError::Unreadable {
                        row,
                        message: e.to_string(),
                    };
                    (String::new(), error)
                })
                .and_then(|csv| {
                    SaleLine::try_from((row, &csv)).map_err(|error| {
                        let txn = csv.get("transaction_number").unwrap_or_default();
                        (txn.to_string(), error)
                    })
                });

            match converted {
                Ok(line) => lines.push(line),
                Err((txn, error)) => failures.push(GroupError::new(&txn, error.into())),
            }
        }

        let rejected: HashSet<String> = failures
            .iter()
            .map(|f| f.transaction_number.clone())
            .collect();

        let mut result = ImportResult {
            success: true,
            total_rows: preview.total_rows,
            processed_rows: 0,
            sales_created: 0,
            customers_created: 0,
            errors: Vec::new(),
            warnings: preview.warnings,
            failures: Vec::new(),
            summary: ImportSummary::default(),
        };

        for group in group_by_transaction(lines) {
            if rejected.contains(&group.transaction_number) {
                continue;
            }

            match self
                .commit_group(&group, organization_id, location_id)
                .await
            {
                Ok(committed) => {
                    debug!(
                        transaction_number = %group.transaction_number,
                        items = committed.items,
                        total = %committed.sale.total_amount,
                        "Committed sale"
                    );
                    result.sales_created += 1;
                    result.processed_rows += group.lines.len();
                    if committed.customer_created {
                        result.customers_created += 1;
                    }
                    result.summary.add_sale(
                        &committed.salesperson,
                        committed.sale.total_amount,
                        committed.sale.fcp_amount,
                    );
                }
                Err(reason) => {
                    warn!(
                        transaction_number = %group.transaction_number,
                        error = %reason,
                        "Failed to commit sale"
                    );
                    failures.push(GroupError::new(&group.transaction_number, reason));
                }
            }
        }

        result.errors = failures.iter().map(GroupError::to_issue).collect();
        result.failures = failures;

        info!(
            organization_id = %organization_id,
            sales_created = result.sales_created,
            customers_created = result.customers_created,
            failed_groups = result.failures.len(),
            "Imported sales"
        );

        Ok(result)
    }

    /// Writes one transaction group as a sale with its items. Nothing about
    /// the sale is written unless every lookup before it succeeds, and
    /// nothing at all when its amounts leave the `Decimal` range.
    pub async fn commit_group(
        &self,
        group: &TransactionGroup,
        organization_id: Uuid,
        location_id: Uuid,
    ) -> Result<CommittedSale, GroupFailure> {
        let first = group.first();

        let salesperson = self
            .store
            .find_active_user_by_email(organization_id, &first.salesperson_email)
            .await?
            .ok_or_else(|| GroupFailure::SalespersonNotFound {
                email: first.salesperson_email.clone(),
            })?;

        if self
            .store
            .transaction_exists(&group.transaction_number)
            .await?
        {
            return Err(GroupFailure::DuplicateTransaction {
                transaction_number: group.transaction_number.clone(),
            });
        }

        let overflow = || GroupFailure::AmountOverflow {
            transaction_number: group.transaction_number.clone(),
        };
        let total_amount = group.total_amount().ok_or_else(overflow)?;
        let fcp_amount = group.fcp_total().ok_or_else(overflow)?;

        let sale_id = Uuid::new_v4();
        let mut items = Vec::with_capacity(group.lines.len());
        for line in &group.lines {
            let category = self
                .resolve_category(organization_id, &line.product_category)
                .await?;
            let item = SaleItem::new(
                sale_id,
                category.id,
                &line.product_name,
                line.quantity,
                line.unit_price,
                line.cost_price,
            )
            .ok_or_else(overflow)?;
            items.push(item);
        }

        let (customer, customer_created) = match self
            .store
            .find_customer_by_phone(organization_id, &first.customer_phone)
            .await?
        {
            Some(customer) => (customer, false),
            None => {
                let customer = self
                    .store
                    .create_customer(NewCustomer {
                        organization_id,
                        first_name: first.customer_first_name.clone(),
                        last_name: first.customer_last_name.clone(),
                        phone: first.customer_phone.clone(),
                        email: first.customer_email.clone(),
                    })
                    .await?;
                (customer, true)
            }
        };

        let sale = Sale {
            id: sale_id,
            organization_id,
            location_id,
            salesperson_id: salesperson.id,
            customer_id: customer.id,
            transaction_number: group.transaction_number.clone(),
            sale_date: first.sale_date,
            sale_time: first.sale_time,
            total_amount,
            fcp_amount,
            hours_worked: group.hours_worked(),
            customer_name: customer.display_name(),
            notes: first.notes.clone(),
        };
        let previous = self.store.sales_for_customer(customer.id).await?;
        let stats = CustomerStats::from_sales(previous.iter().chain([&sale]))
            .ok_or_else(overflow)?;

        let item_count = items.len();
        let sale = self.store.create_sale(sale, items).await?;
        self.store.update_customer_stats(customer.id, stats).await?;

        Ok(CommittedSale {
            sale,
            items: item_count,
            customer_created,
            salesperson: salesperson.display_name(),
        })
    }

    async fn resolve_category(
        &self,
        organization_id: Uuid,
        name: &str,
    ) -> Result<ProductCategory, GroupFailure> {
        if let Some(category) = self.store.find_category(organization_id, name).await? {
            return Ok(category);
        }

        match self
            .store
            .create_category(ProductCategory::new(organization_id, name))
            .await
        {
            Ok(category) => {
                debug!(category = name, code = %category.code, "Created product category");
                Ok(category)
            }
            // Created by someone else since the lookup.
            Err(StoreError::UniqueViolation { .. }) => self
                .store
                .find_category(organization_id, name)
                .await?
                .ok_or_else(|| GroupFailure::CategoryCreation {
                    name: name.to_string(),
                    source: StoreError::NotFound {
                        entity: "ProductCategory",
                        key: name.to_string(),
                    },
                }),
            Err(source) => Err(GroupFailure::CategoryCreation {
                name: name.to_string(),
                source,
            }),
        }
    }
}
