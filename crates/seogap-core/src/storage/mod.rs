pub mod report_store;
pub mod schema;

pub use report_store::{ReportStore, ReportSummary, StoreError, UserReportPage};
