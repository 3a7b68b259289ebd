pub mod config;
pub mod error;
pub mod importer;
pub mod models;
pub mod row;
pub mod store;
pub mod validator;

pub use config::ImporterConfig;
pub use error::{GroupFailure, ImportError, LineError, StoreError};
pub use importer::{ImportResult, Importer, PreviewResult};
pub use row::{read_sales_file, template};
pub use store::{MemoryStore, SalesStore};
