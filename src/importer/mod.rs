pub mod group;
pub mod importer;
pub mod result;


pub use importer::{CommittedSale, Importer};
pub use result::{GroupError, ImportResult, ImportSummary, PreviewResult, SalespersonTotal};
