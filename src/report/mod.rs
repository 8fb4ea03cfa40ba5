//! Report module - metrics tables, coefficient exports and run summaries

pub mod features_export;
pub mod metrics_report;
pub mod summary;

pub use features_export::*;
pub use metrics_report::*;
pub use summary::*;
