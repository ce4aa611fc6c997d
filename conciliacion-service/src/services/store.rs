//! Collaborator seams: persistence, dictionary reads and the PNC view.
//!
//! The engine consumes these through trait objects so report and ingestion
//! logic stays testable without a live database.

use crate::dictionary::RuleSnapshot;
use crate::models::{Category, IngestionError, IngestionLog, Movement, Source};
use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::error::AppError;
use std::collections::HashMap;
use uuid::Uuid;

/// Movement persistence and scoped queries.
#[async_trait]
pub trait MovementStore: Send + Sync {
    /// Persist one run's accepted movements as a single atomic unit.
    /// A failure here is run-fatal; nothing may be partially visible.
    async fn insert_movements(&self, movements: &[Movement]) -> Result<(), AppError>;

    /// Write the run log, after the movement batch committed.
    async fn insert_log(&self, log: &IngestionLog) -> Result<(), AppError>;

    /// Persist the run's row-level errors for audit and replay.
    async fn insert_errors(
        &self,
        company_id: Uuid,
        source: Source,
        file_name: &str,
        errors: &[IngestionError],
    ) -> Result<(), AppError>;

    /// Movements within `[start, end)`, optionally scoped to one company,
    /// in ingestion order (ledger dedup depends on that order).
    async fn movements_in_scope(
        &self,
        company_id: Option<Uuid>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Movement>, AppError>;

    /// Companies that have movements within `[start, end)`.
    async fn companies_in_scope(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Uuid>, AppError>;
}

/// Read-only access to the classification dictionaries. The snapshot is
/// loaded once per ingestion run; rule administration lives elsewhere.
#[async_trait]
pub trait DictionarySource: Send + Sync {
    async fn load_snapshot(&self, company_id: Uuid) -> Result<RuleSnapshot, AppError>;
}

/// Pending-not-booked counts per category, produced by an external
/// precomputed view. This core only consumes the numbers.
#[async_trait]
pub trait PncSource: Send + Sync {
    async fn pnc_counts(
        &self,
        company_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<Category, i64>, AppError>;
}
