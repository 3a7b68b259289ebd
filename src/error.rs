use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("{entity} already exists: {key}")]
    UniqueViolation { entity: &'static str, key: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
}

/// Failures that abort a whole validate/import call.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a row could not be turned into a typed sale line.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LineError {
    #[error("Row {row}: {column} is required")]
    Missing { row: usize, column: &'static str },

    #[error("Row {row}: invalid {column} '{value}'")]
    Invalid {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("Row {row}: unreadable row: {message}")]
    Unreadable { row: usize, message: String },
}

impl LineError {
    pub fn row(&self) -> usize {
        match self {
            LineError::Missing { row, .. }
            | LineError::Invalid { row, .. }
            | LineError::Unreadable { row, .. } => *row,
        }
    }
}

/// Why a single transaction group could not be committed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GroupFailure {
    #[error("Salesperson not found: {email}")]
    SalespersonNotFound { email: String },

    #[error("Transaction number already exists: {transaction_number}")]
    DuplicateTransaction { transaction_number: String },

    #[error("Failed to create product category '{name}': {source}")]
    CategoryCreation { name: String, source: StoreError },

    #[error("Invalid line: {0}")]
    InvalidLine(#[from] LineError),

    #[error("Amounts in transaction {transaction_number} exceed the supported range")]
    AmountOverflow { transaction_number: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GroupFailure {
    /// Stable machine-readable tag for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GroupFailure::SalespersonNotFound { .. } => "salesperson_not_found",
            GroupFailure::DuplicateTransaction { .. } => "duplicate_transaction",
            GroupFailure::CategoryCreation { .. } => "category_creation",
            GroupFailure::InvalidLine(_) => "invalid_line",
            GroupFailure::AmountOverflow { .. } => "amount_overflow",
            GroupFailure::Store(_) => "store",
        }
    }
}
