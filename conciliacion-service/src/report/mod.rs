//! Reconciliation reporting: matrix aggregation and indicators.

pub mod detailed;
pub mod global;
pub mod indicators;
pub mod matrix;

pub use detailed::{detailed_report, DetailedReport};
pub use global::{global_report, CompanyReport, GlobalReport};
pub use indicators::{compute_indicators, BucketTotals, Indicators};
pub use matrix::{build_matrix, Matrix, StatusCounts};
